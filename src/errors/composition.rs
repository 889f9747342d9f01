// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compose-time failures.
//!
//! Composition is all-or-nothing: when any of these is returned the wire
//! keeps whatever composed state it had before the attempt.

use crate::types::{types_to_string, TypeInfo, Types};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    /// The running output type is not accepted by the shard's input types.
    #[error("Could not find a matching input type, shard: {shard} (index {index}) expected: {} found: {found}", types_to_string(.expected))]
    TypeMismatch {
        shard: String,
        index: usize,
        expected: Types,
        found: TypeInfo,
    },

    /// A required variable is not exposed by any earlier shard or the host.
    #[error("Required variable not found: {name} (shard: {shard}, expected type: {expected})")]
    MissingRequiredVariable {
        shard: String,
        name: String,
        expected: TypeInfo,
    },

    /// A required variable exists but with an incompatible type.
    #[error("Required variable {name} has type {found} but shard {shard} expects {expected}")]
    RequiredVariableMismatch {
        shard: String,
        name: String,
        expected: TypeInfo,
        found: TypeInfo,
    },

    /// A non-table variable is exposed twice with different types.
    #[error("Variable {name} exposed by {shard} as {found} was already exposed as {existing}")]
    ExposedVariableConflict {
        shard: String,
        name: String,
        existing: TypeInfo,
        found: TypeInfo,
    },

    /// A parameter value cannot work with the composed input.
    #[error("Invalid parameter {parameter} on shard {shard}: {reason}")]
    InvalidParameter {
        shard: String,
        parameter: String,
        reason: String,
    },

    /// The shard refused to compose for its own reasons (foreign compose errors land here).
    #[error("Shard {shard} rejected composition (code {code}): {message}")]
    ShardRejected {
        shard: String,
        code: i32,
        message: String,
    },
}

impl CompositionError {
    /// Stable numeric code, mirrored by the C interface error struct.
    pub fn code(&self) -> i32 {
        match self {
            CompositionError::TypeMismatch { .. } => 1,
            CompositionError::MissingRequiredVariable { .. } => 2,
            CompositionError::RequiredVariableMismatch { .. } => 3,
            CompositionError::ExposedVariableConflict { .. } => 4,
            CompositionError::InvalidParameter { .. } => 5,
            CompositionError::ShardRejected { code, .. } => *code,
        }
    }
}
