// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shard implementations.
//!
//! # Available Backends
//!
//! ## Builtin
//! Shards written in Rust and registered in every [`Core`](crate::core::Core):
//! - **Values**: `Const`, `Set`, `Get`
//! - **Arithmetic**: `Math.Add`, `Math.Subtract`, `Math.Multiply`
//! - **Checks**: `Assert.Is`, `Assert.IsNot`
//! - **Control**: `Repeat`, `Pause`, `Stop`, `Return`, `Restart`
//! - **Diagnostics**: `Log`
//!
//! ## Foreign
//! Shards implemented behind the C function table in [`foreign::ShardVTable`].
//! A constructor registered with
//! [`Core::register_foreign_shard`](crate::core::Core::register_foreign_shard)
//! hands back an instance that [`foreign::ForeignShard`] drives like any
//! other shard.
//!
//! ## Stub Backend (Test-Only)
//! Counting and failing shards for lifecycle tests. Not available in
//! production builds.
//!
//! # Example
//!
//! ```rust
//! use shardmesh::core::Core;
//! use shardmesh::traits::set_param_by_name;
//! use shardmesh::types::Var;
//!
//! let core = Core::new();
//! let mut add = core.create_shard("Math.Add")?;
//! set_param_by_name(add.as_mut(), "Operand", &Var::from(2i64))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builtin;
pub mod foreign;
#[cfg(test)]
pub mod stub;
