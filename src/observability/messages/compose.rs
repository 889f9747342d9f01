// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for compose-time negotiation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Composition finished.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct CompositionCompleted<'a> {
    pub wire: &'a str,
    pub output_type: &'a str,
    pub exposed: usize,
    pub required: usize,
}

impl Display for CompositionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Composed wire '{}': output {}, {} exposed, {} required from outside",
            self.wire, self.output_type, self.exposed, self.required
        )
    }
}

impl StructuredLog for CompositionCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            wire = self.wire,
            output_type = self.output_type,
            exposed = self.exposed,
            required = self.required,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("compose", span_name = name, wire = self.wire)
    }
}

/// Composition failed; nothing was committed.
///
/// # Log Level
/// `warn!` - The wire cannot be scheduled
pub struct CompositionFailed<'a> {
    pub wire: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for CompositionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Composition of wire '{}' failed: {}", self.wire, self.error)
    }
}

impl StructuredLog for CompositionFailed<'_> {
    fn log(&self) {
        tracing::warn!(wire = self.wire, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("compose_failed", span_name = name, wire = self.wire)
    }
}
