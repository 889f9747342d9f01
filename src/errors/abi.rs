// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    /// Callers must reject a mismatched interface outright.
    #[error("ABI version mismatch: core provides {expected:#010x}, caller requested {found:#010x}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Foreign shard constructor for {name} returned null")]
    NullShard { name: String },
}
