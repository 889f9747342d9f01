// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::types::VarKind;
use thiserror::Error;

/// A `Var` could not be read as the requested Rust type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Expected a {expected} value, found {found}")]
pub struct ConversionError {
    pub expected: VarKind,
    pub found: VarKind,
}

impl ConversionError {
    pub fn new(expected: VarKind, found: VarKind) -> Self {
        Self { expected, found }
    }
}
