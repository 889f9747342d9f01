// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types emitted by or about individual shards.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A shard instance was created from the registry.
///
/// # Log Level
/// `trace!` - High volume while building wires
pub struct ShardCreated<'a> {
    pub shard: &'a str,
    pub foreign: bool,
}

impl Display for ShardCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.foreign {
            write!(f, "Created foreign shard '{}'", self.shard)
        } else {
            write!(f, "Created shard '{}'", self.shard)
        }
    }
}

impl StructuredLog for ShardCreated<'_> {
    fn log(&self) {
        tracing::trace!(shard = self.shard, foreign = self.foreign, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("shard_created", span_name = name, shard = self.shard)
    }
}

/// A parameter value was rejected.
///
/// # Log Level
/// `warn!` - Configuration problem
pub struct ParamRejected<'a> {
    pub shard: &'a str,
    pub parameter: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ParamRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Shard '{}' rejected parameter '{}': {}",
            self.shard, self.parameter, self.error
        )
    }
}

impl StructuredLog for ParamRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            shard = self.shard,
            parameter = self.parameter,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "param_rejected",
            span_name = name,
            shard = self.shard,
            parameter = self.parameter,
        )
    }
}

/// A value printed by the `Log` shard.
///
/// # Log Level
/// `info!` - Requested explicitly by the wire author
///
/// # Example
/// ```
/// use shardmesh::observability::messages::shard::ShardLogged;
///
/// let msg = ShardLogged {
///     wire: "main",
///     prefix: "counter",
///     value: "5",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ShardLogged<'a> {
    pub wire: &'a str,
    pub prefix: &'a str,
    pub value: &'a str,
}

impl Display for ShardLogged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "[{}] {}", self.wire, self.value)
        } else {
            write!(f, "[{}] {}: {}", self.wire, self.prefix, self.value)
        }
    }
}

impl StructuredLog for ShardLogged<'_> {
    fn log(&self) {
        tracing::info!(
            wire = self.wire,
            prefix = self.prefix,
            value = self.value,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("shard_log", span_name = name, wire = self.wire)
    }
}

/// Cleanup of a shard reported an error. Cleanup continues with the next shard.
///
/// # Log Level
/// `warn!` - Resource may not have been released
pub struct ShardCleanupFailed<'a> {
    pub shard: &'a str,
    pub code: i32,
    pub message: &'a str,
}

impl Display for ShardCleanupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cleanup of shard '{}' failed (code {}): {}",
            self.shard, self.code, self.message
        )
    }
}

impl StructuredLog for ShardCleanupFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            shard = self.shard,
            code = self.code,
            message = self.message,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("shard_cleanup_failed", span_name = name, shard = self.shard)
    }
}
