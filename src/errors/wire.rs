// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ActivationError, CompositionError};
use thiserror::Error;

/// Wire and mesh lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("Wire {0} is already scheduled on a mesh")]
    AlreadyScheduled(String),

    #[error("Wire {0} is not scheduled on this mesh")]
    NotScheduled(String),

    #[error("Wire {0} cannot be modified while scheduled")]
    Locked(String),

    /// A wire-handle call made by a shard of the wire being ticked.
    #[error("Wire is ticking on this thread; {operation} is not available from inside its shards")]
    Busy { operation: String },

    #[error("Shard {shard} is already owned by another wire")]
    ShardAlreadyOwned { shard: String },

    #[error("Shard index {index} out of range for wire {wire} ({len} shards)")]
    ShardIndexOutOfRange {
        wire: String,
        index: usize,
        len: usize,
    },

    #[error("Wire {wire} still has {count} outstanding variable reference(s)")]
    OutstandingReferences { wire: String, count: usize },

    #[error("External variable {name} is not allocated on wire {wire}")]
    UnknownExternalVariable { wire: String, name: String },

    #[error("Composition of wire {wire} failed: {source}")]
    Composition {
        wire: String,
        #[source]
        source: CompositionError,
    },

    #[error("Warmup of wire {wire} failed at shard {shard}: {source}")]
    Warmup {
        wire: String,
        shard: String,
        #[source]
        source: ActivationError,
    },
}
