// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compose-time negotiation of types and variables.
//!
//! A single forward pass over the shards threads the running output type,
//! and keeps a pool of the variables exposed so far. For each shard, in
//! order:
//!
//! 1. the running type must match one of its input types (a lone `None`
//!    input accepts anything);
//! 2. each required variable must already be in the pool with a compatible
//!    type;
//! 3. the shard composes and reports its output type;
//! 4. its exposed variables join the pool. Tables merge their value types,
//!    any other type change is a conflict.
//!
//! The pool is a private copy, so a failure leaves nothing half-committed.

use crate::engine::slot::ShardSlot;
use crate::errors::CompositionError;
use crate::traits::{ExposedPool, InstanceData, Shard};
use crate::types::{match_types, ExposedTypeInfo, ExposedTypes, TypeInfo};

/// The outcome of composing a shard list.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeResult {
    pub output_type: TypeInfo,
    /// Variables exposed by the shards themselves.
    pub exposed: ExposedTypes,
    /// Variables the shards took from the inherited pool.
    pub required: ExposedTypes,
}

pub fn compose_shards(
    slots: &mut [ShardSlot],
    wire_name: &str,
    input_type: &TypeInfo,
    inherited: &ExposedPool,
) -> Result<ComposeResult, CompositionError> {
    let mut pool = inherited.clone();
    let mut current = input_type.clone();
    let mut exposed: ExposedTypes = Vec::new();
    let mut required: ExposedTypes = Vec::new();

    for (index, slot) in slots.iter_mut().enumerate() {
        current = slot.with(|shard| {
            compose_one(
                shard,
                wire_name,
                index,
                &current,
                &mut pool,
                &mut exposed,
                &mut required,
            )
        })?;
    }

    Ok(ComposeResult {
        output_type: current,
        exposed,
        required,
    })
}

fn compose_one(
    shard: &mut dyn Shard,
    wire_name: &str,
    index: usize,
    current: &TypeInfo,
    pool: &mut ExposedPool,
    exposed: &mut ExposedTypes,
    required: &mut ExposedTypes,
) -> Result<TypeInfo, CompositionError> {
    let inputs = shard.input_types();
    let accepts_anything = matches!(inputs.as_slice(), [TypeInfo::None]);
    if !accepts_anything && !inputs.iter().any(|t| match_types(current, t, false, true)) {
        return Err(CompositionError::TypeMismatch {
            shard: shard.name().to_string(),
            index,
            expected: inputs,
            found: current.clone(),
        });
    }

    for wanted in shard.required_variables() {
        let Some(available) = pool.get(&wanted.name) else {
            return Err(CompositionError::MissingRequiredVariable {
                shard: shard.name().to_string(),
                name: wanted.name,
                expected: wanted.exposed_type,
            });
        };
        if !match_types(&available.exposed_type, &wanted.exposed_type, false, false) {
            return Err(CompositionError::RequiredVariableMismatch {
                shard: shard.name().to_string(),
                name: wanted.name,
                expected: wanted.exposed_type,
                found: available.exposed_type.clone(),
            });
        }
        let from_outside = !exposed.iter().any(|e| e.name == wanted.name);
        if from_outside && !required.iter().any(|r| r.name == wanted.name) {
            required.push(wanted);
        }
    }

    let output = shard.compose(&InstanceData {
        wire_name,
        input_type: current,
        shared: pool,
        shard_index: index,
    })?;

    for offered in shard.exposed_variables() {
        let merged = merge_exposed(shard.name(), pool.get(&offered.name), offered)?;
        match exposed.iter_mut().find(|e| e.name == merged.name) {
            Some(entry) => *entry = merged.clone(),
            None => exposed.push(merged.clone()),
        }
        pool.insert(merged.name.clone(), merged);
    }

    Ok(output)
}

fn merge_exposed(
    shard: &str,
    existing: Option<&ExposedTypeInfo>,
    offered: ExposedTypeInfo,
) -> Result<ExposedTypeInfo, CompositionError> {
    let Some(existing) = existing else {
        return Ok(offered);
    };
    match (&existing.exposed_type, &offered.exposed_type) {
        (
            TypeInfo::Table {
                keys: old_keys,
                types: old_types,
            },
            TypeInfo::Table {
                keys: new_keys,
                types: new_types,
            },
        ) => {
            let mut keys = old_keys.clone();
            let mut types = old_types.clone();
            if new_keys.is_empty() {
                for t in new_types {
                    if !types.contains(t) {
                        types.push(t.clone());
                    }
                }
            } else {
                for (key, t) in new_keys.iter().zip(new_types) {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                        types.push(t.clone());
                    }
                }
            }
            Ok(ExposedTypeInfo {
                exposed_type: TypeInfo::Table { keys, types },
                ..offered
            })
        }
        (old, new) if old == new => Ok(offered),
        (old, new) => Err(CompositionError::ExposedVariableConflict {
            shard: shard.to_string(),
            name: offered.name.clone(),
            existing: old.clone(),
            found: new.clone(),
        }),
    }
}
