// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::*;
use crate::errors::RegistryError;
use crate::traits::Shard;

/// Constructor signature for natively implemented shards.
pub type ShardConstructor = fn() -> Box<dyn Shard>;

const BUILTIN_COUNT: usize = 14;

fn builtin_table() -> [(&'static str, ShardConstructor); BUILTIN_COUNT] {
    [
        ("Const", || Box::new(ConstShard::new())),
        ("Math.Add", || Box::new(MathShard::new(MathOp::Add))),
        ("Math.Subtract", || Box::new(MathShard::new(MathOp::Subtract))),
        ("Math.Multiply", || Box::new(MathShard::new(MathOp::Multiply))),
        ("Assert.Is", || Box::new(AssertShard::is())),
        ("Assert.IsNot", || Box::new(AssertShard::is_not())),
        ("Repeat", || Box::new(RepeatShard::new())),
        ("Pause", || Box::new(PauseShard::new())),
        ("Set", || Box::new(SetShard::new())),
        ("Get", || Box::new(GetShard::new())),
        ("Log", || Box::new(LogShard::new())),
        ("Stop", || Box::new(FlowShard::stop())),
        ("Return", || Box::new(FlowShard::return_())),
        ("Restart", || Box::new(FlowShard::restart())),
    ]
}

/// Factory for the shards that ship with the runtime.
pub struct BuiltinShards;

impl BuiltinShards {
    /// Every builtin shard with its constructor, in registration order.
    pub fn constructors() -> Vec<(&'static str, ShardConstructor)> {
        builtin_table().to_vec()
    }

    /// Create a builtin shard by its registered name.
    pub fn create(name: &str) -> Result<Box<dyn Shard>, RegistryError> {
        Self::constructors()
            .into_iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, constructor)| constructor())
            .ok_or_else(|| RegistryError::UnknownShard(name.to_string()))
    }

    pub fn list_available() -> Vec<&'static str> {
        Self::constructors().into_iter().map(|(name, _)| name).collect()
    }

    pub fn is_available(name: &str) -> bool {
        Self::list_available().contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_shards_report_their_registered_name() {
        for name in BuiltinShards::list_available() {
            let shard = BuiltinShards::create(name).unwrap();
            assert_eq!(shard.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            BuiltinShards::create("Nope").err(),
            Some(RegistryError::UnknownShard("Nope".to_string()))
        );
        assert!(!BuiltinShards::is_available("Nope"));
        assert!(BuiltinShards::is_available("Repeat"));
    }
}
