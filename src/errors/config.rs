// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ParamError, RegistryError, WireError};
use std::fmt;
use thiserror::Error;

/// Problems found while validating a mesh configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two wires share a name
    DuplicateWireName {
        /// The duplicated wire name
        wire: String,
    },
    /// A wire lists no shards
    EmptyWire {
        /// The wire with nothing to run
        wire: String,
    },
    /// A shard name is not known to the registry
    UnknownShard {
        /// The wire containing the shard
        wire: String,
        /// Dotted path of the shard inside the wire, e.g. `2.Action.0`
        path: String,
        /// The unknown shard name
        shard: String,
    },
    /// The logical clock step must be positive and finite
    InvalidTimeStep {
        /// The configured step
        time_step: f64,
    },
    /// The pause between ticks exceeds the allowed maximum
    TickIntervalTooLarge {
        /// The configured interval in milliseconds
        tick_interval_ms: u64,
        /// The allowed maximum
        maximum: u64,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateWireName { wire } => {
                write!(f, "Duplicate wire name: '{}'", wire)
            }
            ValidationError::EmptyWire { wire } => {
                write!(f, "Wire '{}' has no shards", wire)
            }
            ValidationError::UnknownShard { wire, path, shard } => {
                write!(
                    f,
                    "Wire '{}' references unknown shard '{}' at {}",
                    wire, shard, path
                )
            }
            ValidationError::InvalidTimeStep { time_step } => {
                write!(f, "time_step must be a positive number, got {}", time_step)
            }
            ValidationError::TickIntervalTooLarge {
                tick_interval_ms,
                maximum,
            } => {
                write!(
                    f,
                    "tick_interval_ms {} exceeds the maximum of {}",
                    tick_interval_ms, maximum
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    messages.join("\n")
}

/// Errors raised while turning a configuration into a running mesh.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("Invalid value for {context}: {reason}")]
    Value { context: String, reason: String },
}
