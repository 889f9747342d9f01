// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Failure raised while a shard warms up or activates.
///
/// Recoverable at the wire boundary: the owning wire is aborted and cleaned
/// up, every other wire on the mesh keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (code {code})")]
pub struct ActivationError {
    pub code: i32,
    pub message: String,
}

impl ActivationError {
    pub const GENERIC: i32 = 1;
    pub const ASSERTION: i32 = 2;
    pub const ABORTED: i32 = 3;
    pub const INVALID_INPUT: i32 = 4;

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: Self::GENERIC,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
