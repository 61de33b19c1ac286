//! `config show`: prints the effective configuration as JSON.

use crate::error::{CliResult, CliResultExt};
use abop_core::Config;

/// # Errors
///
/// Returns an error if the config file can't be read or parsed.
pub fn show() -> CliResult<String> {
    let config = Config::load().with_engine_context("load config")?;
    Ok(serde_json::to_string_pretty(&config)?)
}
