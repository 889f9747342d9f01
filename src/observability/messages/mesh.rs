// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for mesh scheduling and the async runner.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A wire was registered on a mesh.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardmesh::observability::messages::mesh::WireScheduled;
///
/// let msg = WireScheduled {
///     wire: "main",
///     shard_count: 3,
///     looped: false,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct WireScheduled<'a> {
    pub wire: &'a str,
    pub shard_count: usize,
    pub looped: bool,
}

impl Display for WireScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduled wire '{}' with {} shards (looped={})",
            self.wire, self.shard_count, self.looped
        )
    }
}

impl StructuredLog for WireScheduled<'_> {
    fn log(&self) {
        tracing::info!(
            wire = self.wire,
            shard_count = self.shard_count,
            looped = self.looped,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "wire_scheduled",
            span_name = name,
            wire = self.wire,
            shard_count = self.shard_count,
            looped = self.looped,
        )
    }
}

/// A wire was removed from a mesh. Any saved resume point is dropped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WireUnscheduled<'a> {
    pub wire: &'a str,
    pub discarded_resume_point: bool,
}

impl Display for WireUnscheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.discarded_resume_point {
            write!(f, "Unscheduled wire '{}' (pending resume point discarded)", self.wire)
        } else {
            write!(f, "Unscheduled wire '{}'", self.wire)
        }
    }
}

impl StructuredLog for WireUnscheduled<'_> {
    fn log(&self) {
        tracing::info!(
            wire = self.wire,
            discarded_resume_point = self.discarded_resume_point,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("wire_unscheduled", span_name = name, wire = self.wire)
    }
}

/// One scheduling quantum finished.
///
/// # Log Level
/// `trace!` - Emitted every tick
pub struct TickCompleted {
    pub tick: u64,
    pub now: f64,
    pub wire_count: usize,
    pub healthy: bool,
}

impl Display for TickCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Tick {} at t={:.3} over {} wires (healthy={})",
            self.tick, self.now, self.wire_count, self.healthy
        )
    }
}

impl StructuredLog for TickCompleted {
    fn log(&self) {
        tracing::trace!(
            tick = self.tick,
            now = self.now,
            wire_count = self.wire_count,
            healthy = self.healthy,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("tick", span_name = name, tick = self.tick, now = self.now)
    }
}

/// A wire failed during a tick and was aborted.
///
/// # Log Level
/// `error!` - The wire stopped running
///
/// # Example
/// ```
/// use shardmesh::observability::messages::mesh::WireFailed;
///
/// let msg = WireFailed {
///     wire: "main",
///     shard: "Assert.Is",
///     error: "Failed assertion Is",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct WireFailed<'a> {
    pub wire: &'a str,
    pub shard: &'a str,
    pub error: &'a str,
}

impl Display for WireFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wire '{}' aborted at shard '{}': {}",
            self.wire, self.shard, self.error
        )
    }
}

impl StructuredLog for WireFailed<'_> {
    fn log(&self) {
        tracing::error!(
            wire = self.wire,
            shard = self.shard,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "wire_failed",
            span_name = name,
            wire = self.wire,
            shard = self.shard,
        )
    }
}

/// The async runner started driving a mesh.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunStarted {
    pub wire_count: usize,
    pub max_ticks: Option<u64>,
    pub tick_interval: std::time::Duration,
}

impl Display for RunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.max_ticks {
            Some(limit) => write!(
                f,
                "Running mesh with {} wires for at most {} ticks (interval {:?})",
                self.wire_count, limit, self.tick_interval
            ),
            None => write!(
                f,
                "Running mesh with {} wires until idle (interval {:?})",
                self.wire_count, self.tick_interval
            ),
        }
    }
}

impl StructuredLog for RunStarted {
    fn log(&self) {
        tracing::info!(
            wire_count = self.wire_count,
            max_ticks = ?self.max_ticks,
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("run", span_name = name, wire_count = self.wire_count)
    }
}

/// The async runner stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunFinished {
    pub ticks: u64,
    pub healthy: bool,
    pub idle: bool,
    pub duration: std::time::Duration,
}

impl Display for RunFinished {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Mesh run finished after {} ticks in {:?} (healthy={}, idle={})",
            self.ticks, self.duration, self.healthy, self.idle
        )
    }
}

impl StructuredLog for RunFinished {
    fn log(&self) {
        tracing::info!(
            ticks = self.ticks,
            healthy = self.healthy,
            idle = self.idle,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_finished",
            span_name = name,
            ticks = self.ticks,
            duration = ?self.duration,
        )
    }
}
