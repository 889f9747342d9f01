// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::AbiError;
use thiserror::Error;

/// Errors from the shard registry held by `Core`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Unknown shard: {0}")]
    UnknownShard(String),

    #[error("Shard {0} is already registered")]
    DuplicateShard(String),

    #[error(transparent)]
    Abi(#[from] AbiError),
}
