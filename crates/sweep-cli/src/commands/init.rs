use anyhow::bail;
use std::path::Path;
use std::process::ExitCode;
use sweep_core::AppConfig;

/// Write the default configuration to `path` or the XDG config location.
pub fn execute(config_path: Option<&Path>, force: bool) -> anyhow::Result<ExitCode> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_path()?,
    };

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    AppConfig::default().save_to(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}
