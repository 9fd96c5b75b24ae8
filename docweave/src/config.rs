//! Layered configuration for the import and synthesis tooling.
//!
//! Values are merged with `figment` in increasing precedence:
//!
//! 1. built-in defaults;
//! 2. `docweave.toml` in the working directory, or an explicit file;
//! 3. environment variables prefixed with `DOCWEAVE_`;
//! 4. caller overrides, typically command-line flags.

use camino::{Utf8Path, Utf8PathBuf};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compose::ComposeOptions;
use crate::decompose::DecomposeOptions;
use crate::serialize::{OutputFormat, SourceOptions};
use crate::shape::DEFAULT_METADATA_MARKER;
use crate::result_ext::FileResultExt;
use crate::{WeaveResult, WeaveResultExt};

/// File consulted when no explicit configuration path is given.
pub const CONFIG_FILE: &str = "docweave.toml";

/// Prefix of environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "DOCWEAVE_";

/// Settings shared by the command-line collaborators.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeaveConfig {
    /// Schema catalog to load.
    pub catalog: Option<Utf8PathBuf>,
    /// Format of composed documents.
    pub output: OutputFormat,
    /// Directory receiving generated source files.
    pub out_dir: Utf8PathBuf,
    /// Module path under which type constants live.
    pub module_root: String,
    /// Prefix of properties hoisted into `metadata`.
    pub metadata_marker: String,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            catalog: None,
            output: OutputFormat::default(),
            out_dir: Utf8PathBuf::from("imports"),
            module_root: String::from("crate::imports"),
            metadata_marker: DEFAULT_METADATA_MARKER.to_owned(),
        }
    }
}

impl WeaveConfig {
    /// Build the provider stack without extracting it.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::File`](crate::WeaveError::File) when `file` is given but does not exist.
    pub fn figment(file: Option<&Utf8Path>) -> WeaveResult<Figment> {
        let toml = match file {
            Some(path) if !path.is_file() => {
                return Err(std::io::Error::from(std::io::ErrorKind::NotFound)).for_file(path);
            }
            Some(path) => Toml::file(path.as_std_path()),
            None => Toml::file(CONFIG_FILE),
        };
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(toml)
            .merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load configuration from defaults, file and environment.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::Config`](crate::WeaveError::Config) when a layer holds invalid values.
    pub fn load(file: Option<&Utf8Path>) -> WeaveResult<Self> {
        Self::load_with(file, &Overrides::default())
    }

    /// Load configuration and merge `overrides` on top.
    ///
    /// Fields of `overrides` serialised as absent leave lower layers intact,
    /// so override structs should skip `None` values.
    ///
    /// # Errors
    ///
    /// Returns [`WeaveError::Config`](crate::WeaveError::Config) when a layer holds invalid values.
    pub fn load_with<T: Serialize>(file: Option<&Utf8Path>, overrides: &T) -> WeaveResult<Self> {
        let config: Self = Self::figment(file)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .into_weave()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Options for the composer.
    #[must_use]
    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            metadata_marker: self.metadata_marker.clone(),
        }
    }

    /// Options for the decomposer.
    #[must_use]
    pub fn decompose_options(&self) -> DecomposeOptions {
        DecomposeOptions {
            metadata_marker: self.metadata_marker.clone(),
        }
    }

    /// Options for source rendering.
    #[must_use]
    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            module_root: self.module_root.clone(),
            ..SourceOptions::default()
        }
    }
}

/// Empty override set.
#[derive(Default, Serialize)]
struct Overrides {}

#[cfg(test)]
mod tests {
    use camino::Utf8Path;
    use rstest::rstest;
    use serde::Serialize;

    use super::WeaveConfig;
    use crate::serialize::OutputFormat;
    use crate::WeaveError;

    #[derive(Serialize)]
    struct Flags {
        #[serde(skip_serializing_if = "Option::is_none")]
        out_dir: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<OutputFormat>,
    }

    #[rstest]
    fn defaults_apply_without_layers() {
        figment::Jail::expect_with(|_| {
            let config = WeaveConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, WeaveConfig::default());
            assert_eq!(config.metadata_marker, "@");
            Ok(())
        });
    }

    #[rstest]
    fn layers_override_in_order() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "docweave.toml",
                "out_dir = \"from-file\"\nmodule_root = \"crate::k8s\"\noutput = \"json\"\n",
            )?;
            jail.set_env("DOCWEAVE_OUT_DIR", "from-env");
            jail.set_env("DOCWEAVE_METADATA_MARKER", "%");

            let config = WeaveConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.out_dir.as_str(), "from-env");
            assert_eq!(config.module_root, "crate::k8s");
            assert_eq!(config.output, OutputFormat::Json);
            assert_eq!(config.decompose_options().metadata_marker, "%");

            let flags = Flags {
                out_dir: Some("from-cli".into()),
                output: None,
            };
            let overridden = WeaveConfig::load_with(None, &flags).map_err(|e| e.to_string())?;
            assert_eq!(overridden.out_dir.as_str(), "from-cli");
            assert_eq!(overridden.output, OutputFormat::Json);
            Ok(())
        });
    }

    #[rstest]
    fn explicit_file_must_exist() {
        figment::Jail::expect_with(|_| {
            let err = WeaveConfig::load(Some(Utf8Path::new("missing.toml"))).expect_err("missing file");
            assert!(matches!(&*err, WeaveError::File { .. }));
            Ok(())
        });
    }

    #[rstest]
    fn invalid_values_are_config_errors() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DOCWEAVE_OUTPUT", "xml");
            let err = WeaveConfig::load(None).expect_err("invalid format");
            assert!(matches!(&*err, WeaveError::Config(_)));
            Ok(())
        });
    }
}
