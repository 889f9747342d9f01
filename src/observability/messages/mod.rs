// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Every log line the runtime emits is a small struct with a `Display`
//! implementation and a [`StructuredLog`] implementation that attaches the
//! struct's fields to the tracing event.
//!
//! # Organization
//!
//! * `mesh` - scheduling, ticking and the async runner
//! * `wire` - wire lifecycle: warmup, suspension, completion, teardown
//! * `shard` - shard creation, parameters and shard-emitted lines
//! * `compose` - compose-time negotiation
//! * `abi` - the C interface table and foreign shards
//!
//! # Usage Pattern
//!
//! ```rust
//! use shardmesh::observability::messages::StructuredLog;
//! use shardmesh::observability::messages::mesh::WireScheduled;
//!
//! let msg = WireScheduled {
//!     wire: "main",
//!     shard_count: 3,
//!     looped: true,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod abi;
pub mod compose;
pub mod mesh;
pub mod shard;
pub mod wire;

/// A message that knows how to emit itself as a structured tracing event.
pub trait StructuredLog {
    /// Emit the message at its documented level with its fields attached.
    fn log(&self);

    /// Open a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
