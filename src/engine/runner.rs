// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Async driver that ticks a mesh until it has nothing left to do.

use crate::engine::mesh::{Mesh, MeshConfig, WireFailure};
use crate::observability::messages::mesh::{RunFinished, RunStarted};
use crate::observability::messages::StructuredLog;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Stop after this many ticks even if wires are still active.
    pub max_ticks: Option<u64>,
    /// Sleep between ticks. Zero only yields to the runtime.
    pub tick_interval: Duration,
    pub stop_on_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: None,
            tick_interval: Duration::ZERO,
            stop_on_failure: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &MeshConfig) -> Self {
        Self {
            max_ticks: config.max_ticks,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            stop_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// No wire failed during the run.
    pub healthy: bool,
    /// Every wire finished.
    pub idle: bool,
    pub failures: Vec<WireFailure>,
    pub duration: Duration,
}

pub async fn run_until_idle(mesh: &mut Mesh, options: &RunOptions) -> RunSummary {
    let started = Instant::now();
    RunStarted {
        wire_count: mesh.wires().len(),
        max_ticks: options.max_ticks,
        tick_interval: options.tick_interval,
    }
    .log();

    let mut ticks = 0u64;
    let mut healthy = true;
    let mut failures = Vec::new();

    while !mesh.is_idle() && options.max_ticks.map_or(true, |max| ticks < max) {
        let ok = mesh.tick();
        ticks += 1;
        failures.extend(mesh.take_failures());
        if !ok {
            healthy = false;
            if options.stop_on_failure {
                break;
            }
        }
        if options.tick_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(options.tick_interval).await;
        }
    }

    let summary = RunSummary {
        ticks,
        healthy,
        idle: mesh.is_idle(),
        failures,
        duration: started.elapsed(),
    };
    RunFinished {
        ticks: summary.ticks,
        healthy: summary.healthy,
        idle: summary.idle,
        duration: summary.duration,
    }
    .log();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{CountingShard, FailAt, FailingShard, ShardCounters};
    use crate::engine::wire::Wire;

    #[tokio::test]
    async fn runs_until_every_wire_has_ended() {
        let counters = ShardCounters::default();
        let mut wire = Wire::new("once");
        assert!(wire
            .add_shard(Box::new(CountingShard::new("c", &counters)))
            .is_ok());
        let wire = wire.into_ref();
        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());

        let summary = run_until_idle(&mut mesh, &RunOptions::default()).await;
        assert_eq!(summary.ticks, 1);
        assert!(summary.healthy);
        assert!(summary.idle);
    }

    #[tokio::test]
    async fn max_ticks_bounds_looped_wires() {
        let counters = ShardCounters::default();
        let mut wire = Wire::new("forever");
        wire.set_looped(true);
        assert!(wire
            .add_shard(Box::new(CountingShard::new("c", &counters)))
            .is_ok());
        let wire = wire.into_ref();
        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());

        let options = RunOptions {
            max_ticks: Some(4),
            ..RunOptions::default()
        };
        let summary = run_until_idle(&mut mesh, &options).await;
        assert_eq!(summary.ticks, 4);
        assert!(!summary.idle);
        assert_eq!(counters.activations(), 4);
    }

    #[tokio::test]
    async fn failures_are_collected() {
        let counters = ShardCounters::default();
        let mut wire = Wire::new("broken");
        assert!(wire
            .add_shard(Box::new(FailingShard::new(FailAt::Activate, &counters)))
            .is_ok());
        let wire = wire.into_ref();
        let mut mesh = Mesh::default();
        assert!(mesh.schedule(&wire).is_ok());

        let summary = run_until_idle(&mut mesh, &RunOptions::default()).await;
        assert!(!summary.healthy);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.idle);
    }
}
