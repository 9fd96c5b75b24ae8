//! Trait-based conversions between external error types and `WeaveError`.

use super::WeaveError;

impl From<serde_json::Error> for WeaveError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<serde_yaml::Error> for WeaveError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

impl From<toml::de::Error> for WeaveError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

impl From<figment::Error> for WeaveError {
    fn from(e: figment::Error) -> Self {
        Self::config(e)
    }
}
