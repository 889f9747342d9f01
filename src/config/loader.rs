// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::core::Core;
use crate::engine::MeshConfig;
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A complete mesh description: scheduler settings plus the wires to run.
///
/// # Fields
/// * `mesh` - Scheduler settings (optional, every field has a default)
/// * `wires` - The wires to build and schedule, in scheduling order
///
/// # Example
/// ```yaml
/// mesh:
///   tick_quantum: iteration
///   warmup: eager
///   clock: logical
///   time_step: 1.0
/// wires:
///   - name: counter
///     shards:
///       - shard: Const
///         params: { Value: 0 }
///       - shard: Math.Add
///         params: { Operand: 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mesh: MeshConfig,
    pub wires: Vec<WireConfig>,
}

/// One wire of the mesh.
///
/// # Fields
/// * `name` - Unique wire name, used in logs and reports
/// * `looped` - Restart from the first shard after every iteration
/// * `unsafe_loop` - (`unsafe` in files) run several iterations per tick
/// * `input` - Value fed to the first shard (optional)
/// * `shards` - The shard chain, in activation order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WireConfig {
    pub name: String,
    #[serde(default)]
    pub looped: bool,
    #[serde(default, rename = "unsafe")]
    pub unsafe_loop: bool,
    #[serde(default)]
    pub input: Option<serde_yaml::Value>,
    pub shards: Vec<ShardConfig>,
}

/// A shard entry: the registered name and its named parameters.
///
/// Parameter values may themselves be shard lists (for `Repeat`'s `Action`),
/// written with the same `shard`/`params` layout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShardConfig {
    pub shard: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

/// Supported file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse configuration text in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let cfg = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(cfg)
}

/// Load a config from a YAML or TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

/// Load a config and validate it against the shards registered in `core`.
///
/// Every validation problem is reported at once in [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P, core: &Core) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg, core).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClockKind, TickQuantum, WarmupPolicy};

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
wires:
  - name: main
    looped: true
    shards:
      - shard: Const
        params: { Value: 3 }
      - shard: Log
"#;

        let cfg = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg.mesh, MeshConfig::default());
        assert_eq!(cfg.wires.len(), 1);
        assert!(cfg.wires[0].looped);
        assert!(!cfg.wires[0].unsafe_loop);
        assert_eq!(cfg.wires[0].shards[0].shard, "Const");
        assert!(cfg.wires[0].shards[1].params.is_empty());
    }

    #[test]
    fn mesh_settings_override_defaults() {
        let yaml = r#"
mesh:
  tick_quantum: shard
  warmup: deferred
  clock: system
  time_step: 0.5
  tick_interval_ms: 20
wires: []
"#;

        let cfg = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg.mesh.tick_quantum, TickQuantum::Shard);
        assert_eq!(cfg.mesh.warmup, WarmupPolicy::Deferred);
        assert_eq!(cfg.mesh.clock, ClockKind::System);
        assert_eq!(cfg.mesh.time_step, 0.5);
        assert_eq!(cfg.mesh.tick_interval_ms, 20);
    }

    #[test]
    fn toml_configs_parse_to_the_same_shape() {
        let toml = r#"
[mesh]
time_step = 2.0

[[wires]]
name = "main"
unsafe = true

[[wires.shards]]
shard = "Const"
params = { Value = 1 }
"#;

        let cfg = parse_config(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.mesh.time_step, 2.0);
        assert!(cfg.wires[0].unsafe_loop);
        assert_eq!(
            cfg.wires[0].shards[0].params.get("Value").and_then(|v| v.as_i64()),
            Some(1)
        );
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YAML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.json")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let result = load_config("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
