pub mod init;
pub mod run;
pub mod status;

use anyhow::Context;
use std::path::Path;
use sweep_core::AppConfig;

/// Load, env-override and validate the configuration.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = AppConfig::load_with_env(path).context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
