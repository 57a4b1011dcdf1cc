//! Configuration loading from disk.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::validation::{Validate, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load from `path` when given, otherwise start from defaults.
///
/// Defaults are not validated here; callers validate after applying CLI
/// overrides.
pub fn load_or_default<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate + Default,
{
    match path {
        Some(path) => {
            let config = load_config(path)?;
            tracing::info!(path = %path.display(), "Configuration file loaded");
            Ok(config)
        }
        None => Ok(T::default()),
    }
}

/// Validate a configuration after overrides were applied.
pub fn ensure_valid<T: Validate>(config: &T) -> Result<(), ConfigError> {
    config.validate().map_err(ConfigError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{GatekeeperConfig, KeyManConfig};
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[store]\nkey_file = \"/tmp/keys.json\"\n[listener]\nbind_address = \"127.0.0.1:7000\""
        )
        .unwrap();

        let config: KeyManConfig = load_config(file.path()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");
        assert_eq!(config.store.key_file, std::path::PathBuf::from("/tmp/keys.json"));
    }

    #[test]
    fn test_parse_and_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gate\nlocked_ip = 1").unwrap();
        let err = load_config::<GatekeeperConfig>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gate]\nlocked_ip = \"nope\"").unwrap();
        let err = load_config::<GatekeeperConfig>(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("gate.locked_ip"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config::<KeyManConfig>(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));

        let config: KeyManConfig = load_or_default(None).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9902");
    }
}
