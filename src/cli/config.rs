// FILE: src/cli/config.rs

use crate::config::OutputStyle;
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub load_paths: Option<Vec<String>>,
    pub hook_name: Option<String>,
    pub style: Option<OutputStyle>,
    pub quiet: Option<bool>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| ExtractError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| ExtractError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| ExtractError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(ExtractError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };
    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sass-vars.toml");
        fs::write(&path, "load_paths = [\"styles\"]\nhook_name = \"collect\"\nstyle = \"compressed\"\n").unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.load_paths, Some(vec!["styles".to_string()]));
        assert_eq!(config.hook_name.as_deref(), Some("collect"));
        assert_eq!(config.style, Some(OutputStyle::Compressed));
        assert_eq!(config.quiet, None);
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sass-vars.json");
        fs::write(&path, r#"{"quiet": true, "style": "expanded"}"#).unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.quiet, Some(true));
        assert_eq!(config.style, Some(OutputStyle::Expanded));
    }

    #[test]
    fn test_rejected_configs() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("config.yaml");
        fs::write(&yaml, "quiet: true").unwrap();
        assert!(matches!(
            load(yaml.to_str().unwrap()),
            Err(ExtractError::InvalidFormat { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        assert!(matches!(
            load(broken.to_str().unwrap()),
            Err(ExtractError::InvalidFormat { .. })
        ));

        assert!(matches!(
            load(dir.path().join("missing.toml").to_str().unwrap()),
            Err(ExtractError::FileNotFound { .. })
        ));
    }
}
