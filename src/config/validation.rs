// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Checks run before anything is built, and every problem found is
//! reported at once:
//!
//! 1. **Mesh settings**: `time_step` positive and finite, `tick_interval_ms`
//!    within [`MAX_TICK_INTERVAL_MS`]
//! 2. **Wire names**: unique across the config
//! 3. **Shard lists**: non-empty, every shard name registered in the core,
//!    including shards nested inside parameter values
//!
//! Type and parameter checks are left to the runtime builder and to
//! composition, which know the shards' declared types.
//!
//! # Example
//! ```rust
//! use shardmesh::config::{parse_config, validate_config, ConfigFormat};
//! use shardmesh::core::Core;
//! use shardmesh::errors::ValidationError;
//!
//! let yaml = "wires: [{name: main, shards: [{shard: Nope}]}]";
//! let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();
//! let errors = validate_config(&config, &Core::new()).unwrap_err();
//! assert!(matches!(errors[0], ValidationError::UnknownShard { .. }));
//! ```

use crate::config::consts::MAX_TICK_INTERVAL_MS;
use crate::config::values::shard_list;
use crate::config::{Config, ShardConfig};
use crate::core::Core;
use crate::engine::MeshConfig;
use crate::errors::ValidationError;
use std::collections::HashSet;

/// Validate a configuration against the shards registered in `core`.
pub fn validate_config(config: &Config, core: &Core) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_mesh(&config.mesh);
    errors.extend(validate_unique_wire_names(config));

    for wire in &config.wires {
        if wire.shards.is_empty() {
            errors.push(ValidationError::EmptyWire {
                wire: wire.name.clone(),
            });
        }
        validate_shards(&wire.name, "", &wire.shards, core, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_mesh(mesh: &MeshConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !(mesh.time_step.is_finite() && mesh.time_step > 0.0) {
        errors.push(ValidationError::InvalidTimeStep {
            time_step: mesh.time_step,
        });
    }
    if mesh.tick_interval_ms > MAX_TICK_INTERVAL_MS {
        errors.push(ValidationError::TickIntervalTooLarge {
            tick_interval_ms: mesh.tick_interval_ms,
            maximum: MAX_TICK_INTERVAL_MS,
        });
    }
    errors
}

fn validate_unique_wire_names(config: &Config) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    config
        .wires
        .iter()
        .filter(|wire| !seen.insert(wire.name.as_str()))
        .map(|wire| ValidationError::DuplicateWireName {
            wire: wire.name.clone(),
        })
        .collect()
}

/// Walk a shard list depth-first. Paths are dotted: `2.Action.0`.
fn validate_shards(
    wire: &str,
    prefix: &str,
    shards: &[ShardConfig],
    core: &Core,
    errors: &mut Vec<ValidationError>,
) {
    for (index, entry) in shards.iter().enumerate() {
        let path = format!("{}{}", prefix, index);
        if !core.is_registered(&entry.shard) {
            errors.push(ValidationError::UnknownShard {
                wire: wire.to_string(),
                path: path.clone(),
                shard: entry.shard.clone(),
            });
        }
        for (param, value) in &entry.params {
            if let Some(nested) = shard_list(value) {
                let nested_prefix = format!("{}.{}.", path, param);
                validate_shards(wire, &nested_prefix, &nested, core, errors);
            }
        }
    }
}
