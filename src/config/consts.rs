// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Upper bound for `mesh.tick_interval_ms` (one minute)
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;
/// Tick limit the binary applies when neither the config nor the command line sets one
pub const DEFAULT_MAX_TICKS: u64 = 10_000;
/// Key marking a mapping as a shard entry inside a parameter value
pub const SHARD_KEY: &str = "shard";
/// Key holding the parameters of a shard entry
pub const PARAMS_KEY: &str = "params";
