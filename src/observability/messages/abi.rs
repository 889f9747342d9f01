// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the C interface table and foreign shards.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A caller asked for an interface table with the wrong ABI version.
///
/// # Log Level
/// `error!` - The caller cannot use this core
pub struct AbiVersionRejected {
    pub expected: u32,
    pub requested: u32,
}

impl Display for AbiVersionRejected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected interface request: ABI {:#010x} requested, core provides {:#010x}",
            self.requested, self.expected
        )
    }
}

impl StructuredLog for AbiVersionRejected {
    fn log(&self) {
        tracing::error!(expected = self.expected, requested = self.requested, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("abi_rejected", span_name = name, requested = self.requested)
    }
}

/// A shard constructor was added to the registry.
///
/// # Log Level
/// `debug!` - Registry detail
pub struct ShardRegistered<'a> {
    pub shard: &'a str,
    pub foreign: bool,
}

impl Display for ShardRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let origin = if self.foreign { "foreign" } else { "native" };
        write!(f, "Registered {} shard '{}'", origin, self.shard)
    }
}

impl StructuredLog for ShardRegistered<'_> {
    fn log(&self) {
        tracing::debug!(shard = self.shard, foreign = self.foreign, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("shard_registered", span_name = name, shard = self.shard)
    }
}

/// Severity passed through the C `log` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl ForeignLevel {
    /// Map the integer level used by the C slot: 0 trace up to 4 error.
    pub fn from_raw(level: i32) -> Self {
        match level {
            i32::MIN..=0 => ForeignLevel::Trace,
            1 => ForeignLevel::Debug,
            2 => ForeignLevel::Info,
            3 => ForeignLevel::Warn,
            _ => ForeignLevel::Error,
        }
    }
}

/// A line logged by foreign code through the interface table.
///
/// # Log Level
/// As requested by the caller
pub struct ForeignLogLine<'a> {
    pub level: ForeignLevel,
    pub message: &'a str,
}

impl Display for ForeignLogLine<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "[foreign] {}", self.message)
    }
}

impl StructuredLog for ForeignLogLine<'_> {
    fn log(&self) {
        match self.level {
            ForeignLevel::Trace => tracing::trace!(foreign = true, "{}", self),
            ForeignLevel::Debug => tracing::debug!(foreign = true, "{}", self),
            ForeignLevel::Info => tracing::info!(foreign = true, "{}", self),
            ForeignLevel::Warn => tracing::warn!(foreign = true, "{}", self),
            ForeignLevel::Error => tracing::error!(foreign = true, "{}", self),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("foreign_log", span_name = name)
    }
}

/// A shard called a wire-handle slot on the wire that is running it.
///
/// # Log Level
/// `warn!` - The call is refused or deferred instead of deadlocking
pub struct WireSlotBusy<'a> {
    pub slot: &'a str,
    pub deferred: bool,
}

impl Display for WireSlotBusy<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.deferred {
            write!(f, "Slot {} called on the running wire; deferred until its tick returns", self.slot)
        } else {
            write!(f, "Slot {} called on the running wire; refused", self.slot)
        }
    }
}

impl StructuredLog for WireSlotBusy<'_> {
    fn log(&self) {
        tracing::warn!(slot = self.slot, deferred = self.deferred, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("wire_slot_busy", span_name = name, slot = self.slot)
    }
}
