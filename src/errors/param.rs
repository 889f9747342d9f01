// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::types::{types_to_string, TypeInfo, Types};
use thiserror::Error;

/// Parameter get/set failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("Parameter index {index} out of range for shard {shard} ({count} parameters)")]
    IndexOutOfRange {
        shard: String,
        index: usize,
        count: usize,
    },

    #[error("Parameter {parameter} of shard {shard} expects {} but got {found}", types_to_string(.expected))]
    TypeMismatch {
        shard: String,
        parameter: String,
        expected: Types,
        found: TypeInfo,
    },

    #[error("Unknown parameter {parameter} on shard {shard}")]
    UnknownName { shard: String, parameter: String },

    #[error("Shard {shard} rejected parameter {parameter}: {reason}")]
    Rejected {
        shard: String,
        parameter: String,
        reason: String,
    },
}
