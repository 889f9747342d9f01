// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shards implemented natively in Rust.

mod assert;
mod constant;
mod factory;
mod flow;
mod log;
mod math;
mod pause;
mod repeat;
mod variables;

pub use assert::AssertShard;
pub use constant::ConstShard;
pub use factory::{BuiltinShards, ShardConstructor};
pub use flow::FlowShard;
pub use log::LogShard;
pub use math::{MathOp, MathShard};
pub use pause::PauseShard;
pub use repeat::RepeatShard;
pub use variables::{GetShard, SetShard};
