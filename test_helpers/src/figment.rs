//! Helpers for running configuration tests inside a [`figment::Jail`].
//!
//! The jail gives each test a private working directory and restores the
//! environment afterwards, which keeps `docweave.toml` discovery and
//! `DOCWEAVE_*` variables from leaking between tests.

use anyhow::{Result, anyhow};

/// Runs `f` inside a jail and returns its output as an `anyhow::Result`.
///
/// # Errors
///
/// Returns an error if the jail cannot be set up or `f` fails.
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|jail| {
        output = Some(f(jail)?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure produced no value"))
}

/// Converts a displayable error, such as a shared `WeaveError`, into a
/// [`figment::Error`] so it can cross the jail boundary with `?`.
pub fn jail_error(err: &impl std::fmt::Display) -> figment::Error {
    figment::Error::from(err.to_string())
}
