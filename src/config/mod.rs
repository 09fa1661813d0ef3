mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./carton.toml",
        "~/.config/carton/config.toml",
        "/etc/carton/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.processor.max_concurrent == 0 {
        anyhow::bail!("processor.max_concurrent cannot be 0");
    }

    if config.processor.queue_capacity == 0 {
        anyhow::bail!("processor.queue_capacity cannot be 0");
    }

    if config.defaults.provider.trim().is_empty() {
        anyhow::bail!("defaults.provider cannot be empty");
    }

    if config.defaults.image.is_empty() {
        tracing::warn!("No default image configured; create requests need an image");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.processor.max_concurrent, 4);
        assert_eq!(config.processor.queue_capacity, 64);
        assert_eq!(config.defaults.provider, "one");
        assert_eq!(config.defaults.compute.hdd, "10");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: Config = toml::from_str(
            r#"
            [processor]
            dry_run = true

            [defaults.compute]
            cpushare = "2"
            "#,
        )
        .unwrap();
        assert!(config.processor.dry_run);
        assert_eq!(config.processor.max_concurrent, 4);
        assert_eq!(config.defaults.compute.cpushare, "2");
        assert_eq!(config.defaults.compute.hdd, "10");
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = Config::default();
        config.processor.max_concurrent = 0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("max_concurrent"), "got: {err}");
    }

    #[test]
    fn empty_provider_rejected() {
        let mut config = Config::default();
        config.defaults.provider = "  ".into();
        assert!(validate_config(&config).is_err());
    }
}
