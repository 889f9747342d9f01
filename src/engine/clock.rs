// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Mesh time sources.

use serde::Deserialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    /// Advances by a fixed step per tick. Deterministic; used by tests.
    #[default]
    Logical,
    /// Seconds elapsed since the mesh was created.
    System,
}

#[derive(Debug, Clone)]
pub enum Clock {
    Logical { now: f64, step: f64 },
    System { started: Instant },
}

impl Clock {
    pub fn new(kind: ClockKind, step: f64) -> Self {
        match kind {
            ClockKind::Logical => Clock::Logical { now: 0.0, step },
            ClockKind::System => Clock::System {
                started: Instant::now(),
            },
        }
    }

    pub fn now(&self) -> f64 {
        match self {
            Clock::Logical { now, .. } => *now,
            Clock::System { started } => started.elapsed().as_secs_f64(),
        }
    }

    /// Move a logical clock forward one step. System clocks ignore this.
    pub fn advance(&mut self) {
        if let Clock::Logical { now, step } = self {
            *now += *step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_clock_steps_deterministically() {
        let mut clock = Clock::new(ClockKind::Logical, 0.5);
        assert_eq!(clock.now(), 0.0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), 1.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = Clock::new(ClockKind::System, 1.0);
        let first = clock.now();
        clock.advance();
        assert!(clock.now() >= first);
    }
}
