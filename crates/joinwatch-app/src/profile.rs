use std::fs;
use std::path::Path;

use anyhow::Context;
use joinwatch_config::Config;
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "joinwatch.json";

/// A named config, e.g. one per game client layout
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Profile(Profile),
    Plain(Config),
}

/// Reads a plain config or a profile, then applies environment overrides.
///
/// An explicit path must exist. Without one, `joinwatch.json` is used when
/// present and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => read_config(Path::new(DEFAULT_CONFIG_FILE))?,
        None => {
            tracing::info!("No config file found, using defaults");
            Config::default()
        }
    };

    config.apply_env_overrides();
    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let parsed: ConfigFile = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;

    Ok(match parsed {
        ConfigFile::Profile(profile) => {
            tracing::info!("Loaded profile '{}' from {}", profile.name, path.display());
            profile.value
        }
        ConfigFile::Plain(config) => {
            tracing::info!("Loaded config from {}", path.display());
            config
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_reads_profile_and_plain_config() {
        let mut profile = tempfile::NamedTempFile::new().unwrap();
        write!(
            profile,
            r#"{{ "name": "lobby", "value": {{ "grid": {{ "rows": 2, "cols": 3 }} }} }}"#
        )
        .unwrap();
        let config = read_config(profile.path()).unwrap();
        assert_eq!((config.grid.rows, config.grid.cols), (2, 3));

        let mut plain = tempfile::NamedTempFile::new().unwrap();
        write!(plain, r#"{{ "scan": {{ "cells_per_cycle": 7 }} }}"#).unwrap();
        let config = read_config(plain.path()).unwrap();
        assert_eq!(config.scan.cells_per_cycle, 7);
        assert_eq!(config.grid.rows, 3);
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_malformed_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(read_config(file.path()).is_err());
    }
}
