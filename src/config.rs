//! Process-wide configuration: loaded from a TOML file, then overridden
//! field-by-field by CLI flags (flags win).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub trait PersistentConfig: Serialize + for<'de> Deserialize<'de> + Default {
    fn read_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&data)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    fn write_to_file(&self, path: &Path) -> Result<()> {
        let data = toml::to_string(self).context("failed to serialize config to TOML")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub source_object_root: PathBuf,
    pub output_object_root: PathBuf,
    pub skip_binary_staging: bool,
    pub binary_staging_root: Option<PathBuf>,
    pub max_commits: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_object_root: PathBuf::from("."),
            output_object_root: PathBuf::from("./split"),
            skip_binary_staging: true,
            binary_staging_root: None,
            max_commits: None,
        }
    }
}

impl PersistentConfig for Config {}

/// CLI-supplied overrides; any `Some` field wins over whatever was loaded
/// from the TOML file.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub source_object_root: Option<PathBuf>,
    pub output_object_root: Option<PathBuf>,
    pub skip_binary_staging: Option<bool>,
    pub binary_staging_root: Option<PathBuf>,
    pub max_commits: Option<usize>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.source_object_root {
            self.source_object_root = v;
        }
        if let Some(v) = overrides.output_object_root {
            self.output_object_root = v;
        }
        if let Some(v) = overrides.skip_binary_staging {
            self.skip_binary_staging = v;
        }
        if overrides.binary_staging_root.is_some() {
            self.binary_staging_root = overrides.binary_staging_root;
        }
        if overrides.max_commits.is_some() {
            self.max_commits = overrides.max_commits;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("histcarve.toml");
        let config = Config::read_from_file(&path).unwrap();
        assert!(config.skip_binary_staging);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("histcarve.toml");
        let mut config = Config::default();
        config.source_object_root = PathBuf::from("/tmp/src");
        config.write_to_file(&path).unwrap();

        let loaded = Config::read_from_file(&path).unwrap();
        assert_eq!(loaded.source_object_root, PathBuf::from("/tmp/src"));
    }

    #[test]
    fn cli_overrides_win_over_file_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            max_commits: Some(10),
            ..Default::default()
        });
        assert_eq!(config.max_commits, Some(10));
    }
}
