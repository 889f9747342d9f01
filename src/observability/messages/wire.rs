// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the wire lifecycle.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Every shard of a wire finished warmup.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct WireWarmedUp<'a> {
    pub wire: &'a str,
    pub shard_count: usize,
}

impl Display for WireWarmedUp<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Warmed up {} shards of wire '{}'", self.shard_count, self.wire)
    }
}

impl StructuredLog for WireWarmedUp<'_> {
    fn log(&self) {
        tracing::debug!(wire = self.wire, shard_count = self.shard_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("wire_warmup", span_name = name, wire = self.wire)
    }
}

/// A shard asked the wire to suspend.
///
/// # Log Level
/// `debug!` - Scheduling detail
pub struct WireSuspended<'a> {
    pub wire: &'a str,
    pub shard: &'a str,
    pub index: usize,
    pub resume_at: f64,
}

impl Display for WireSuspended<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wire '{}' suspended at shard '{}' (#{}) until t={:.3}",
            self.wire, self.shard, self.index, self.resume_at
        )
    }
}

impl StructuredLog for WireSuspended<'_> {
    fn log(&self) {
        tracing::debug!(
            wire = self.wire,
            shard = self.shard,
            index = self.index,
            resume_at = self.resume_at,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "wire_suspended",
            span_name = name,
            wire = self.wire,
            index = self.index,
        )
    }
}

/// A non-looped wire ran to completion, or a shard stopped it.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardmesh::observability::messages::wire::WireCompleted;
///
/// let msg = WireCompleted {
///     wire: "main",
///     iterations: 1,
///     output: "5",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct WireCompleted<'a> {
    pub wire: &'a str,
    pub iterations: u64,
    pub output: &'a str,
}

impl Display for WireCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wire '{}' completed after {} iteration(s), output: {}",
            self.wire, self.iterations, self.output
        )
    }
}

impl StructuredLog for WireCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            wire = self.wire,
            iterations = self.iterations,
            output = self.output,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("wire_completed", span_name = name, wire = self.wire)
    }
}

/// The host stopped a wire explicitly.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct WireStopped<'a> {
    pub wire: &'a str,
    pub was_running: bool,
}

impl Display for WireStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stopped wire '{}' (was_running={})", self.wire, self.was_running)
    }
}

impl StructuredLog for WireStopped<'_> {
    fn log(&self) {
        tracing::debug!(wire = self.wire, was_running = self.was_running, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("wire_stopped", span_name = name, wire = self.wire)
    }
}

/// Teardown found variable references that were never released.
///
/// The affected slots are leaked instead of freed.
///
/// # Log Level
/// `warn!` - Host contract violation, recoverable
pub struct OutstandingVariableReferences<'a> {
    pub wire: &'a str,
    pub count: usize,
}

impl Display for OutstandingVariableReferences<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wire '{}' destroyed with {} unreleased variable reference(s); leaking those slots",
            self.wire, self.count
        )
    }
}

impl StructuredLog for OutstandingVariableReferences<'_> {
    fn log(&self) {
        tracing::warn!(wire = self.wire, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("outstanding_references", span_name = name, wire = self.wire)
    }
}

/// Wire destroyed and its owned shards released.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct WireDestroyed<'a> {
    pub wire: &'a str,
    pub destroyed_shards: usize,
}

impl Display for WireDestroyed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Destroyed wire '{}' and {} owned shard(s)",
            self.wire, self.destroyed_shards
        )
    }
}

impl StructuredLog for WireDestroyed<'_> {
    fn log(&self) {
        tracing::debug!(
            wire = self.wire,
            destroyed_shards = self.destroyed_shards,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("wire_destroyed", span_name = name, wire = self.wire)
    }
}
