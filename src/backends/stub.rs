// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles that record how the scheduler drives them.

use crate::engine::Context;
use crate::errors::ActivationError;
use crate::traits::Shard;
use crate::types::{ExposedTypeInfo, ExposedTypes, TypeInfo, Types, Var};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counts {
    warmups: AtomicUsize,
    activations: AtomicUsize,
    cleanups: AtomicUsize,
    destroyed: AtomicUsize,
}

/// Lifecycle counters shared between a test and the shards it creates.
#[derive(Clone, Default)]
pub struct ShardCounters(Arc<Counts>);

impl ShardCounters {
    pub fn warmups(&self) -> usize {
        self.0.warmups.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.0.activations.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.0.cleanups.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.0.destroyed.load(Ordering::SeqCst)
    }
}

/// A pass-through shard that counts lifecycle calls.
pub struct CountingShard {
    name: String,
    counters: ShardCounters,
    exposed: ExposedTypes,
    required: ExposedTypes,
}

impl CountingShard {
    pub fn new(name: &str, counters: &ShardCounters) -> Self {
        Self {
            name: name.to_string(),
            counters: counters.clone(),
            exposed: Vec::new(),
            required: Vec::new(),
        }
    }

    pub fn exposing(mut self, name: &str, exposed_type: TypeInfo) -> Self {
        self.exposed.push(ExposedTypeInfo::new(name, exposed_type));
        self
    }

    pub fn requiring(mut self, name: &str, required_type: TypeInfo) -> Self {
        self.required.push(ExposedTypeInfo::new(name, required_type));
        self
    }
}

impl Shard for CountingShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn exposed_variables(&self) -> ExposedTypes {
        self.exposed.clone()
    }

    fn required_variables(&self) -> ExposedTypes {
        self.required.clone()
    }

    fn warmup(&mut self, _ctx: &mut Context) -> Result<(), ActivationError> {
        self.counters.0.warmups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn activate(&mut self, _ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        self.counters.0.activations.fetch_add(1, Ordering::SeqCst);
        Ok(input.borrowed())
    }

    fn cleanup(&mut self, _ctx: &mut Context) {
        self.counters.0.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        self.counters.0.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Where a [`FailingShard`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Warmup,
    Activate,
}

/// A shard that always fails, for exercising abort paths.
pub struct FailingShard {
    at: FailAt,
    counters: ShardCounters,
}

impl FailingShard {
    pub fn new(at: FailAt, counters: &ShardCounters) -> Self {
        Self {
            at,
            counters: counters.clone(),
        }
    }
}

impl Shard for FailingShard {
    fn name(&self) -> &str {
        "Failing"
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn warmup(&mut self, _ctx: &mut Context) -> Result<(), ActivationError> {
        self.counters.0.warmups.fetch_add(1, Ordering::SeqCst);
        match self.at {
            FailAt::Warmup => Err(ActivationError::new("Simulated warmup failure")),
            FailAt::Activate => Ok(()),
        }
    }

    fn activate(&mut self, _ctx: &mut Context, _input: &Var) -> Result<Var, ActivationError> {
        self.counters.0.activations.fetch_add(1, Ordering::SeqCst);
        Err(ActivationError::new("Simulated shard failure"))
    }

    fn cleanup(&mut self, _ctx: &mut Context) {
        self.counters.0.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        self.counters.0.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}
