// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod shard;

pub use shard::{
    default_output_type, set_param_by_name, set_param_checked, shard_hash, validate_param,
    ExposedPool, InstanceData, Shard,
};
