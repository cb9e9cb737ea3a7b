use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::controller::TickPreset;
use crate::net::io::SnapshotFormat;
use crate::options::Options;

/// Default location looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pn-sim.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SimConfig {
    /// Auto-run speed preset.
    pub speed: TickPreset,
    /// Auto-run ticks; 0 disables auto-run.
    pub ticks: usize,
    pub seed: Option<u64>,
    pub stop_when_dead: bool,
    pub format: SnapshotFormat,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            speed: TickPreset::Normal,
            ticks: 0,
            seed: None,
            stop_when_dead: false,
            format: SnapshotFormat::Json,
        }
    }
}

impl SimConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: SimConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Command-line values win over file values.
    pub fn apply(&mut self, options: &Options) {
        if let Some(speed) = options.speed {
            self.speed = speed;
        }
        if let Some(ticks) = options.ticks {
            self.ticks = ticks;
        }
        if options.seed.is_some() {
            self.seed = options.seed;
        }
        if options.stop_when_dead {
            self.stop_when_dead = true;
        }
        if let Some(format) = options.format {
            self.format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pn-sim.toml");
        fs::write(&path, "speed = \"very-fast\"\nseed = 42\nformat = \"ron\"\n").unwrap();

        let config = SimConfig::load_from_file(&path).unwrap();
        assert_eq!(config.speed, TickPreset::VeryFast);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.format, SnapshotFormat::Ron);
        assert_eq!(config.ticks, 0);
        assert!(!config.stop_when_dead);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "speed = \"ludicrous\"").unwrap();
        let err = SimConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn options_override_file_values() {
        let mut config = SimConfig {
            seed: Some(1),
            ticks: 5,
            ..SimConfig::default()
        };
        let options = Options::parse_from_str("--ticks 12 --speed slow").unwrap();
        config.apply(&options);
        assert_eq!(config.ticks, 12);
        assert_eq!(config.speed, TickPreset::Slow);
        assert_eq!(config.seed, Some(1));
    }
}
