// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cooperative scheduler for wires.
//!
//! A mesh owns nothing but handles: wires are shared through [`WireRef`] and
//! are destroyed when the last handle goes away, never by the mesh. Each
//! [`Mesh::tick`] gives every scheduled wire one quantum in registration
//! order on the caller's thread.

use crate::engine::clock::{Clock, ClockKind};
use crate::engine::wire::{lock_wire, RunningWire, TickOutcome, WireRef};
use crate::errors::{ActivationError, WireError};
use crate::observability::messages::mesh::{
    TickCompleted, WireFailed, WireScheduled, WireUnscheduled,
};
use crate::observability::messages::StructuredLog;
use serde::Deserialize;
use std::sync::Arc;

/// How much work a wire gets per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickQuantum {
    /// Run until the iteration ends, a shard suspends, or the wire fails.
    #[default]
    Iteration,
    /// At most one shard activation (step mode).
    Shard,
}

/// When scheduled wires warm up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPolicy {
    /// Inside `schedule`; a failing warmup rejects the wire.
    #[default]
    Eager,
    /// On the wire's first tick; a failing warmup fails the wire.
    Deferred,
}

pub const DEFAULT_UNSAFE_ITERATION_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub tick_quantum: TickQuantum,
    pub warmup: WarmupPolicy,
    pub clock: ClockKind,
    /// Seconds a logical clock advances per tick.
    pub time_step: f64,
    /// Pause between ticks for the async runner.
    pub tick_interval_ms: u64,
    pub max_ticks: Option<u64>,
    /// Cap on iterations an unsafe looped wire runs within one tick.
    pub unsafe_iteration_limit: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            tick_quantum: TickQuantum::Iteration,
            warmup: WarmupPolicy::Eager,
            clock: ClockKind::Logical,
            time_step: 1.0,
            tick_interval_ms: 0,
            max_ticks: None,
            unsafe_iteration_limit: DEFAULT_UNSAFE_ITERATION_LIMIT,
        }
    }
}

/// A wire that failed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WireFailure {
    pub wire: String,
    pub shard: String,
    pub error: ActivationError,
}

pub struct Mesh {
    config: MeshConfig,
    clock: Clock,
    wires: Vec<WireRef>,
    failures: Vec<WireFailure>,
    ticks: u64,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(MeshConfig::default())
    }
}

impl Mesh {
    pub fn new(config: MeshConfig) -> Self {
        let clock = Clock::new(config.clock, config.time_step);
        Self {
            config,
            clock,
            wires: Vec::new(),
            failures: Vec::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Current mesh time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn wires(&self) -> &[WireRef] {
        &self.wires
    }

    /// Compose the wire and add it to the tick list.
    ///
    /// With eager warmup the wire is also warmed here. Ended or stopped
    /// wires start over.
    pub fn schedule(&mut self, wire: &WireRef) -> Result<(), WireError> {
        let mut guard = lock_wire(wire);
        if guard.is_scheduled() {
            return Err(WireError::AlreadyScheduled(guard.name().to_string()));
        }
        guard.reset();
        guard.compose()?;
        if self.config.warmup == WarmupPolicy::Eager {
            guard.warmup(self.clock.now())?;
        }
        guard.set_scheduled(true);
        WireScheduled {
            wire: guard.name(),
            shard_count: guard.len(),
            looped: guard.is_looped(),
        }
        .log();
        drop(guard);
        self.wires.push(Arc::clone(wire));
        Ok(())
    }

    /// Remove a wire without destroying it. Its resume point is discarded;
    /// no cleanup is forced.
    pub fn unschedule(&mut self, wire: &WireRef) -> Result<(), WireError> {
        let Some(position) = self.wires.iter().position(|w| Arc::ptr_eq(w, wire)) else {
            return Err(WireError::NotScheduled(lock_wire(wire).name().to_string()));
        };
        let removed = self.wires.remove(position);
        let mut guard = lock_wire(&removed);
        guard.set_scheduled(false);
        let discarded = guard.discard_resume_point();
        WireUnscheduled {
            wire: guard.name(),
            discarded_resume_point: discarded,
        }
        .log();
        Ok(())
    }

    /// Give every wire one quantum, then advance the clock.
    ///
    /// Returns `false` when a wire failed during this tick; the details are
    /// kept until [`Mesh::take_failures`].
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.ticks += 1;
        let mut healthy = true;

        for wire in &self.wires {
            let mut guard = lock_wire(wire);
            let running = RunningWire::enter(wire);
            let outcome = guard.tick(
                now,
                self.config.tick_quantum,
                self.config.unsafe_iteration_limit,
            );
            if running.stop_requested() {
                guard.stop();
            }
            drop(running);
            if let TickOutcome::Failed { shard, error } = outcome {
                healthy = false;
                WireFailed {
                    wire: guard.name(),
                    shard: &shard,
                    error: &error.to_string(),
                }
                .log();
                self.failures.push(WireFailure {
                    wire: guard.name().to_string(),
                    shard,
                    error,
                });
            }
        }

        self.clock.advance();
        TickCompleted {
            tick: self.ticks,
            now,
            wire_count: self.wires.len(),
            healthy,
        }
        .log();
        healthy
    }

    pub fn take_failures(&mut self) -> Vec<WireFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    /// True when no scheduled wire has work left.
    pub fn is_idle(&self) -> bool {
        self.wires
            .iter()
            .all(|wire| !lock_wire(wire).state().is_active())
    }

    /// Stop every wire and unschedule it.
    pub fn terminate(&mut self) {
        for wire in self.wires.drain(..) {
            let mut guard = lock_wire(&wire);
            guard.stop();
            guard.set_scheduled(false);
        }
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        for wire in self.wires.drain(..) {
            let mut guard = lock_wire(&wire);
            guard.set_scheduled(false);
            guard.discard_resume_point();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{CountingShard, FailAt, FailingShard, ShardCounters};
    use crate::engine::wire::{Wire, WireState};

    fn counting_wire(name: &str, count: usize, counters: &ShardCounters) -> WireRef {
        let mut wire = Wire::new(name);
        for i in 0..count {
            let shard = CountingShard::new(&format!("{}{}", name, i), counters);
            assert!(wire.add_shard(Box::new(shard)).is_ok());
        }
        wire.into_ref()
    }

    #[test]
    fn step_mode_looped_wire_returns_to_the_first_shard_every_third_tick() {
        let first = ShardCounters::default();
        let rest = ShardCounters::default();
        let mut wire = Wire::new("looped");
        wire.set_looped(true);
        assert!(wire
            .add_shard(Box::new(CountingShard::new("first", &first)))
            .is_ok());
        for name in ["second", "third"] {
            assert!(wire
                .add_shard(Box::new(CountingShard::new(name, &rest)))
                .is_ok());
        }
        let wire = wire.into_ref();

        let mut mesh = Mesh::new(MeshConfig {
            tick_quantum: TickQuantum::Shard,
            ..MeshConfig::default()
        });
        assert!(mesh.schedule(&wire).is_ok());
        for _ in 0..9 {
            assert!(mesh.tick());
        }
        assert_eq!(first.activations(), 3);
        assert_eq!(rest.activations(), 6);
        assert_eq!(lock_wire(&wire).iterations(), 3);
        assert!(!mesh.is_idle());
    }

    #[test]
    fn non_looped_wire_runs_at_most_once() {
        let counters = ShardCounters::default();
        let wire = counting_wire("once", 2, &counters);
        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());
        for _ in 0..5 {
            assert!(mesh.tick());
        }
        assert_eq!(counters.activations(), 2);
        assert!(mesh.is_idle());
        assert!(!mesh.is_empty());
        assert_eq!(lock_wire(&wire).state(), WireState::Ended);
    }

    #[test]
    fn scheduling_twice_is_rejected() {
        let counters = ShardCounters::default();
        let wire = counting_wire("dup", 1, &counters);
        let mut mesh = Mesh::default();
        let mut other = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());
        assert!(matches!(
            other.schedule(&wire),
            Err(WireError::AlreadyScheduled(_))
        ));
        assert!(matches!(
            lock_wire(&wire).add_shard(Box::new(CountingShard::new("late", &counters))),
            Err(WireError::Locked(_))
        ));
    }

    #[test]
    fn unschedule_then_drop_destroys_shards_exactly_once() {
        let counters = ShardCounters::default();
        let wire = counting_wire("w", 3, &counters);
        let mut mesh = Mesh::new(MeshConfig {
            tick_quantum: TickQuantum::Shard,
            ..MeshConfig::default()
        });
        assert!(mesh.schedule(&wire).is_ok());
        assert!(mesh.tick());
        assert!(mesh.unschedule(&wire).is_ok());
        assert!(matches!(
            mesh.unschedule(&wire),
            Err(WireError::NotScheduled(_))
        ));
        drop(mesh);
        assert_eq!(counters.destroyed(), 0);

        drop(wire);
        assert_eq!(counters.destroyed(), 3);
        assert_eq!(counters.cleanups(), 3);
    }

    #[test]
    fn failing_wire_is_reported_and_others_keep_running() {
        let counters = ShardCounters::default();
        let mut broken = Wire::new("broken");
        assert!(broken
            .add_shard(Box::new(FailingShard::new(FailAt::Activate, &counters)))
            .is_ok());
        let broken = broken.into_ref();
        let healthy_counters = ShardCounters::default();
        let healthy = counting_wire("healthy", 1, &healthy_counters);
        lock_wire(&healthy).set_looped(true);

        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&broken).is_ok());
        assert!(mesh.schedule(&healthy).is_ok());

        assert!(!mesh.tick());
        let failures = mesh.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].wire, "broken");
        assert_eq!(failures[0].shard, "Failing");

        assert!(mesh.tick());
        assert_eq!(healthy_counters.activations(), 2);
        assert!(mesh.take_failures().is_empty());
    }

    #[test]
    fn eager_warmup_failure_rejects_the_wire() {
        let counters = ShardCounters::default();
        let mut wire = Wire::new("cold");
        assert!(wire
            .add_shard(Box::new(FailingShard::new(FailAt::Warmup, &counters)))
            .is_ok());
        let wire = wire.into_ref();
        let mut mesh = Mesh::default();
        assert!(matches!(
            mesh.schedule(&wire),
            Err(WireError::Warmup { .. })
        ));
        assert!(mesh.is_empty());
        assert!(!lock_wire(&wire).is_scheduled());
    }

    #[test]
    fn terminate_stops_running_wires() {
        let counters = ShardCounters::default();
        let wire = counting_wire("t", 2, &counters);
        lock_wire(&wire).set_looped(true);
        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());
        assert!(mesh.tick());
        mesh.terminate();
        assert!(mesh.is_empty());
        assert_eq!(lock_wire(&wire).state(), WireState::Stopped);
        assert_eq!(counters.cleanups(), 2);
    }
}
