use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info};

use super::settings::AppConfig;

pub const ENV_PREFIX: &str = "FORECAST";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Defaults, then the optional TOML file, then `FORECAST_*` variables
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if dotenvy::dotenv().is_ok() {
        debug!("Loaded environment from .env");
    }
    build(path, environment())
}

fn build(path: Option<&Path>, env: Environment) -> Result<AppConfig> {
    let mut builder = Config::builder().add_source(
        Config::try_from(&AppConfig::default()).context("failed to encode default config")?,
    );

    if let Some(path) = path {
        if !path.exists() {
            bail!("config file not found: {}", path.display());
        }
        let path_str = path
            .to_str()
            .with_context(|| format!("config path is not valid UTF-8: {}", path.display()))?;
        builder = builder.add_source(File::new(path_str, FileFormat::Toml));
        info!("Using config file {}", path.display());
    }

    let config: AppConfig = builder
        .add_source(env)
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    if let Err(errors) = config.validate() {
        bail!("invalid configuration: {}", errors.join(", "));
    }
    Ok(config)
}

/// Write the default configuration as TOML
pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let contents = toml::to_string_pretty(&AppConfig::default()).context("failed to encode config")?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
