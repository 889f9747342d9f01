// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod clock;
pub mod compose;
pub mod context;
pub mod mesh;
pub mod runner;
pub mod sequence;
pub mod slot;
pub mod variables;
pub mod wire;

pub use clock::{Clock, ClockKind};
pub use compose::{compose_shards, ComposeResult};
pub use context::{Context, FlowState};
pub use mesh::{Mesh, MeshConfig, TickQuantum, WarmupPolicy, WireFailure};
pub use runner::{run_until_idle, RunOptions, RunSummary};
pub use slot::{ShardSlot, SharedShard};
pub use variables::{release_variable, ExternalVariables, VariableRef, VariableStore};
pub use wire::{lock_wire, Wire, WireInfo, WireRef, WireState};
