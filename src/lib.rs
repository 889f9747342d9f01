// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod abi;        // C-compatible core interface
pub mod backends;   // builtin and foreign shards
pub mod config;     // mesh files + runtime builder
pub mod core;       // shard registry
pub mod engine;     // wires, mesh, scheduling
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // the Shard trait
pub mod types;      // Var and type descriptors
