// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wires: ordered shard lists with their own variables and run state.
//!
//! A wire owns the shards added to it, its local variables and the slots of
//! the external variables the host allocated on it. It is driven one quantum
//! at a time by a [`Mesh`](crate::engine::Mesh); between quanta a suspended
//! or step-mode wire keeps an explicit resume point.
//!
//! Lifecycle: `Idle → Warmed → Running ⇄ Suspended → Ended | Failed |
//! Stopped`. Cleanup runs on every transition into one of the final states,
//! and [`Wire::destroy`] destroys owned shards exactly once.

use crate::engine::compose::{compose_shards, ComposeResult};
use crate::engine::context::{Context, FlowState};
use crate::engine::mesh::TickQuantum;
use crate::engine::sequence::{self, SequenceOutcome};
use crate::engine::slot::{ShardSlot, SharedShard};
use crate::engine::variables::{ExternalVariables, VariableRef, VariableStore};
use crate::errors::{ActivationError, WireError};
use crate::observability::messages::compose::{CompositionCompleted, CompositionFailed};
use crate::observability::messages::wire::{
    OutstandingVariableReferences, WireCompleted, WireDestroyed, WireStopped, WireSuspended,
    WireWarmedUp,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ExposedPool, Shard};
use crate::types::{derive_type_info, ClonedVar, TypeInfo, Var};
use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard};

/// How wires are shared between a mesh and the host.
pub type WireRef = Arc<Mutex<Wire>>;

/// Lock a shared wire. A panic inside a shard poisons the mutex; the wire
/// state is still consistent, so the poison is ignored.
pub fn lock_wire(wire: &WireRef) -> MutexGuard<'_, Wire> {
    wire.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

thread_local! {
    /// Wires whose tick is in progress on this thread, each with a pending
    /// stop request. Their mutex is held for the whole tick.
    static RUNNING: RefCell<Vec<(usize, bool)>> = const { RefCell::new(Vec::new()) };
}

fn wire_key(wire: &WireRef) -> usize {
    Arc::as_ptr(wire) as usize
}

/// Marks a wire as ticking on the current thread until dropped.
pub(crate) struct RunningWire {
    key: usize,
}

impl RunningWire {
    pub(crate) fn enter(wire: &WireRef) -> Self {
        let key = wire_key(wire);
        RUNNING.with(|running| running.borrow_mut().push((key, false)));
        Self { key }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        RUNNING.with(|running| {
            running
                .borrow()
                .iter()
                .rev()
                .find(|(key, _)| *key == self.key)
                .is_some_and(|(_, stop)| *stop)
        })
    }
}

impl Drop for RunningWire {
    fn drop(&mut self) {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(position) = running.iter().rposition(|(key, _)| *key == self.key) {
                running.remove(position);
            }
        });
    }
}

/// True while `wire` is being ticked by this thread, i.e. when the caller is
/// one of its shards. Locking it from here would deadlock.
pub(crate) fn is_running_here(wire: &WireRef) -> bool {
    let key = wire_key(wire);
    RUNNING.with(|running| running.borrow().iter().any(|(k, _)| *k == key))
}

/// Ask a wire ticking on this thread to stop once its current quantum
/// returns. Returns false when the wire is not running here.
pub(crate) fn request_stop(wire: &WireRef) -> bool {
    let key = wire_key(wire);
    RUNNING.with(|running| {
        match running.borrow_mut().iter_mut().rev().find(|(k, _)| *k == key) {
            Some(entry) => {
                entry.1 = true;
                true
            }
            None => false,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireState {
    Idle,
    Warmed,
    Running,
    Suspended,
    Ended,
    Failed,
    Stopped,
}

impl WireState {
    /// Running, suspended or waiting for its first quantum.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            WireState::Idle | WireState::Warmed | WireState::Running | WireState::Suspended
        )
    }
}

/// Where the next quantum picks up.
#[derive(Debug)]
struct ResumePoint {
    index: usize,
    input: ClonedVar,
    resume_at: f64,
    /// Set when the shard at `index` suspended itself and must see `is_resuming`.
    suspended: bool,
}

/// Result of giving a wire one quantum.
#[derive(Debug)]
pub(crate) enum TickOutcome {
    /// Already finished; nothing ran.
    Inactive,
    /// Suspended and not due yet.
    Waiting,
    /// Ran part of an iteration.
    Yielded,
    Suspended,
    /// A looped wire finished an iteration.
    IterationEnded,
    Ended,
    Failed {
        shard: String,
        error: ActivationError,
    },
}

/// Snapshot of a wire for hosts and the binary.
#[derive(Debug, Clone)]
pub struct WireInfo {
    pub name: String,
    pub looped: bool,
    pub unsafe_loop: bool,
    pub state: WireState,
    pub running: bool,
    pub failed: bool,
    pub failure: Option<String>,
    pub iterations: u64,
    pub output: ClonedVar,
}

pub struct Wire {
    name: String,
    looped: bool,
    unsafe_loop: bool,
    slots: Vec<ShardSlot>,
    variables: VariableStore,
    externals: ExternalVariables,
    root_input: ClonedVar,
    composed: Option<ComposeResult>,
    state: WireState,
    resume: Option<ResumePoint>,
    last_output: ClonedVar,
    failure: Option<String>,
    iterations: u64,
    scheduled: bool,
    destroyed: bool,
}

impl Wire {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            looped: false,
            unsafe_loop: false,
            slots: Vec::new(),
            variables: VariableStore::new(),
            externals: ExternalVariables::default(),
            root_input: ClonedVar::default(),
            composed: None,
            state: WireState::Idle,
            resume: None,
            last_output: ClonedVar::default(),
            failure: None,
            iterations: 0,
            scheduled: false,
            destroyed: false,
        }
    }

    /// Wrap the wire for scheduling.
    pub fn into_ref(self) -> WireRef {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn is_unsafe(&self) -> bool {
        self.unsafe_loop
    }

    pub fn state(&self) -> WireState {
        self.state
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn last_output(&self) -> &Var {
        self.last_output.var()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn composed(&self) -> Option<&ComposeResult> {
        self.composed.as_ref()
    }

    fn ensure_unlocked(&self) -> Result<(), WireError> {
        if self.scheduled {
            Err(WireError::Locked(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Append a shard; the wire takes ownership and destroys it on teardown.
    pub fn add_shard(&mut self, shard: Box<dyn Shard>) -> Result<(), WireError> {
        self.ensure_unlocked()?;
        self.slots.push(ShardSlot::owned(shard));
        self.composed = None;
        Ok(())
    }

    /// Append a host-owned shard. It is cleaned up but never destroyed here.
    pub fn add_external_shard(&mut self, shard: &SharedShard) -> Result<(), WireError> {
        self.ensure_unlocked()?;
        if !shard.claim() {
            return Err(WireError::ShardAlreadyOwned {
                shard: shard.name(),
            });
        }
        self.slots.push(ShardSlot::external(shard.clone()));
        self.composed = None;
        Ok(())
    }

    /// Take a shard out of the wire. Owned shards are handed back to the
    /// caller; external shards are released to their host (`None`).
    ///
    /// The returned shard has been cleaned up but not destroyed: the caller
    /// owns it and must call [`Shard::destroy`] before dropping it, or hand
    /// it to another wire.
    pub fn remove_shard(&mut self, index: usize) -> Result<Option<Box<dyn Shard>>, WireError> {
        self.ensure_unlocked()?;
        if index >= self.slots.len() {
            return Err(WireError::ShardIndexOutOfRange {
                wire: self.name.clone(),
                index,
                len: self.slots.len(),
            });
        }
        let mut slot = self.slots.remove(index);
        if slot.warmed {
            let mut ctx = Context::new(&self.name, &mut self.variables, &self.externals, 0.0, 0);
            slot.with(|shard| shard.cleanup(&mut ctx));
            slot.warmed = false;
        }
        self.composed = None;
        Ok(slot.into_owned().ok())
    }

    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    /// Let a looped wire run further iterations within the same tick.
    pub fn set_unsafe(&mut self, unsafe_loop: bool) {
        self.unsafe_loop = unsafe_loop;
    }

    /// Input given to the first shard of every iteration.
    pub fn set_input(&mut self, input: &Var) {
        self.root_input.assign(input);
        self.composed = None;
    }

    /// Allocate an external variable and return the host's counted handle.
    pub fn alloc_external_variable(&mut self, name: &str, type_info: TypeInfo) -> VariableRef {
        self.composed = None;
        self.externals.allocate(name, type_info)
    }

    /// Free an external variable. Shards must have released it first.
    pub fn free_external_variable(&mut self, name: &str) -> Result<(), WireError> {
        match self.externals.free(name) {
            Ok(()) => {
                self.composed = None;
                Ok(())
            }
            Err(Some(count)) => Err(WireError::OutstandingReferences {
                wire: self.name.clone(),
                count: count - 1,
            }),
            Err(None) => Err(WireError::UnknownExternalVariable {
                wire: self.name.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Map a slot the host holds a reference to (for example another wire's
    /// variable). Returns the handle previously mapped under `name`.
    pub fn set_external_variable(&mut self, name: &str, reference: VariableRef) -> Option<VariableRef> {
        self.composed = None;
        self.externals.insert_borrowed(name, reference)
    }

    pub fn remove_external_variable(&mut self, name: &str) -> Option<VariableRef> {
        self.composed = None;
        self.externals.remove_borrowed(name)
    }

    /// Counted reference to a variable of this wire, created when missing.
    pub fn reference_variable(&mut self, name: &str) -> VariableRef {
        match self.externals.reference(name) {
            Some(reference) => reference,
            None => self.variables.reference(name),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Var> {
        self.externals
            .get(name)
            .or_else(|| self.variables.get(name))
    }

    /// Negotiate types and variables. Nothing changes on failure.
    pub fn compose(&mut self) -> Result<&ComposeResult, WireError> {
        let mut pool = ExposedPool::new();
        for exposed in self.externals.exposed() {
            pool.insert(exposed.name.clone(), exposed);
        }
        let input_type = if self.root_input.is_none() {
            TypeInfo::None
        } else {
            derive_type_info(self.root_input.var())
        };

        match compose_shards(&mut self.slots, &self.name, &input_type, &pool) {
            Ok(result) => {
                CompositionCompleted {
                    wire: &self.name,
                    output_type: &result.output_type.to_string(),
                    exposed: result.exposed.len(),
                    required: result.required.len(),
                }
                .log();
                Ok(self.composed.insert(result))
            }
            Err(source) => {
                CompositionFailed {
                    wire: &self.name,
                    error: &source,
                }
                .log();
                Err(WireError::Composition {
                    wire: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Warm up every shard. A failure cleans up what was warmed and leaves
    /// the wire `Failed`.
    pub fn warmup(&mut self, now: f64) -> Result<(), WireError> {
        if self.composed.is_none() {
            self.compose()?;
        }
        let result = {
            let mut ctx = Context::new(
                &self.name,
                &mut self.variables,
                &self.externals,
                now,
                self.iterations,
            );
            sequence::warmup_all(&mut self.slots, &mut ctx)
        };
        match result {
            Ok(()) => {
                self.state = WireState::Warmed;
                self.failure = None;
                WireWarmedUp {
                    wire: &self.name,
                    shard_count: self.slots.len(),
                }
                .log();
                Ok(())
            }
            Err((index, source)) => {
                let shard = self.slots[index].name();
                self.state = WireState::Failed;
                self.failure = Some(source.to_string());
                Err(WireError::Warmup {
                    wire: self.name.clone(),
                    shard,
                    source,
                })
            }
        }
    }

    /// Give the wire one quantum at time `now`.
    pub(crate) fn tick(&mut self, now: f64, quantum: TickQuantum, unsafe_limit: u32) -> TickOutcome {
        match self.state {
            WireState::Ended | WireState::Failed | WireState::Stopped => {
                return TickOutcome::Inactive
            }
            WireState::Idle => {
                if let Err(error) = self.warmup(now) {
                    return match error {
                        WireError::Warmup { shard, source, .. } => TickOutcome::Failed {
                            shard,
                            error: source,
                        },
                        other => {
                            let message = other.to_string();
                            self.state = WireState::Failed;
                            self.failure = Some(message.clone());
                            TickOutcome::Failed {
                                shard: String::new(),
                                error: ActivationError::new(message),
                            }
                        }
                    };
                }
            }
            _ => {}
        }
        if self.resume.as_ref().is_some_and(|point| now < point.resume_at) {
            return TickOutcome::Waiting;
        }

        self.state = WireState::Running;
        let budget = match quantum {
            TickQuantum::Shard => Some(1),
            TickQuantum::Iteration => None,
        };
        let mut rounds = 0u32;

        loop {
            let (from, input, resuming) = match self.resume.take() {
                Some(point) => (point.index, point.input, point.suspended),
                None => (0, self.root_input.clone(), false),
            };
            let outcome = {
                let mut ctx = Context::new(
                    &self.name,
                    &mut self.variables,
                    &self.externals,
                    now,
                    self.iterations,
                );
                ctx.set_resuming(resuming);
                sequence::run(&mut self.slots, from, input.var(), &mut ctx, budget)
            };

            match outcome {
                SequenceOutcome::Completed(output)
                | SequenceOutcome::Flow {
                    state: FlowState::Return,
                    output,
                    ..
                } => {
                    self.iterations += 1;
                    self.last_output = output;
                    if !self.looped {
                        self.finish(WireState::Ended, now);
                        return TickOutcome::Ended;
                    }
                    rounds += 1;
                    let again = self.unsafe_loop
                        && quantum == TickQuantum::Iteration
                        && rounds < unsafe_limit.max(1);
                    if !again {
                        return TickOutcome::IterationEnded;
                    }
                }
                SequenceOutcome::Yielded { next, input } => {
                    self.resume = Some(ResumePoint {
                        index: next,
                        input,
                        resume_at: now,
                        suspended: false,
                    });
                    return TickOutcome::Yielded;
                }
                SequenceOutcome::Suspended {
                    index,
                    input,
                    seconds,
                } => {
                    let resume_at = now + seconds;
                    let shard = self.slots[index].name();
                    WireSuspended {
                        wire: &self.name,
                        shard: &shard,
                        index,
                        resume_at,
                    }
                    .log();
                    self.resume = Some(ResumePoint {
                        index,
                        input,
                        resume_at,
                        suspended: true,
                    });
                    self.state = WireState::Suspended;
                    return TickOutcome::Suspended;
                }
                SequenceOutcome::Flow {
                    state: FlowState::Stop,
                    output,
                    ..
                } => {
                    self.iterations += 1;
                    self.last_output = output;
                    self.finish(WireState::Ended, now);
                    return TickOutcome::Ended;
                }
                SequenceOutcome::Flow { .. } => {
                    // Restart: the next quantum begins at shard 0.
                    return TickOutcome::Yielded;
                }
                SequenceOutcome::Failed { index, error } => {
                    let shard = self.slots[index].name();
                    self.failure = Some(error.to_string());
                    self.finish(WireState::Failed, now);
                    return TickOutcome::Failed { shard, error };
                }
            }
        }
    }

    fn finish(&mut self, state: WireState, now: f64) {
        self.resume = None;
        self.cleanup(now);
        self.state = state;
        if state == WireState::Ended {
            WireCompleted {
                wire: &self.name,
                iterations: self.iterations,
                output: &self.last_output.to_string(),
            }
            .log();
        }
    }

    fn cleanup(&mut self, now: f64) {
        let mut ctx = Context::new(
            &self.name,
            &mut self.variables,
            &self.externals,
            now,
            self.iterations,
        );
        sequence::cleanup_all(&mut self.slots, &mut ctx);
    }

    /// Stop a running or suspended wire: clean up, forget the resume point
    /// and return the last output.
    pub fn stop(&mut self) -> ClonedVar {
        let was_running = self.state.is_active();
        self.resume = None;
        self.cleanup(0.0);
        if was_running {
            self.state = WireState::Stopped;
        }
        WireStopped {
            wire: &self.name,
            was_running,
        }
        .log();
        self.last_output.clone()
    }

    /// Forget where a suspended or step-mode wire was. Returns whether there
    /// was anything to forget.
    pub(crate) fn discard_resume_point(&mut self) -> bool {
        self.resume.take().is_some()
    }

    pub(crate) fn set_scheduled(&mut self, scheduled: bool) {
        self.scheduled = scheduled;
    }

    /// Mark an ended or failed wire runnable again from shard 0.
    pub fn reset(&mut self) {
        if !self.state.is_active() {
            self.state = WireState::Idle;
            self.failure = None;
        }
    }

    pub fn info(&self) -> WireInfo {
        WireInfo {
            name: self.name.clone(),
            looped: self.looped,
            unsafe_loop: self.unsafe_loop,
            state: self.state,
            running: matches!(self.state, WireState::Running | WireState::Suspended),
            failed: self.state == WireState::Failed,
            failure: self.failure.clone(),
            iterations: self.iterations,
            output: self.last_output.clone(),
        }
    }

    /// Clean up, destroy owned shards and free the variable slots.
    ///
    /// Slots still referenced are leaked instead of freed so that stale
    /// handles never point at released memory; that case is reported as
    /// [`WireError::OutstandingReferences`]. Calling this twice is a no-op.
    pub fn destroy(&mut self) -> Result<(), WireError> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        self.resume = None;
        self.cleanup(0.0);

        let mut destroyed_shards = 0;
        for slot in self.slots.drain(..) {
            if slot.dispose() {
                destroyed_shards += 1;
            }
        }

        let leaked = self.variables.clear() + self.externals.clear();
        WireDestroyed {
            wire: &self.name,
            destroyed_shards,
        }
        .log();
        if leaked > 0 {
            OutstandingVariableReferences {
                wire: &self.name,
                count: leaked,
            }
            .log();
            return Err(WireError::OutstandingReferences {
                wire: self.name.clone(),
                count: leaked,
            });
        }
        Ok(())
    }
}

impl Drop for Wire {
    fn drop(&mut self) {
        // Failures are already logged; the leaked slots stay valid.
        let _ = self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{CountingShard, FailAt, FailingShard, ShardCounters};
    use crate::engine::variables::release_variable;

    fn counting_wire(count: usize, counters: &ShardCounters) -> Wire {
        let mut wire = Wire::new("test");
        for i in 0..count {
            let shard = CountingShard::new(&format!("c{}", i), counters);
            assert!(wire.add_shard(Box::new(shard)).is_ok());
        }
        wire
    }

    #[test]
    fn removed_shards_are_left_for_the_caller_to_destroy() {
        let counters = ShardCounters::default();
        let mut wire = counting_wire(2, &counters);
        let removed = wire.remove_shard(0);
        let Ok(Some(mut shard)) = removed else {
            panic!("owned shard not handed back");
        };
        assert_eq!(wire.len(), 1);
        assert_eq!(counters.destroyed(), 0);

        shard.destroy();
        assert_eq!(counters.destroyed(), 1);
        assert!(wire.destroy().is_ok());
        assert_eq!(counters.destroyed(), 2);
    }

    #[test]
    fn non_looped_wire_runs_once_and_cleans_up() {
        let counters = ShardCounters::default();
        let mut wire = counting_wire(2, &counters);
        wire.set_input(&Var::from(3i64));

        assert!(matches!(
            wire.tick(0.0, TickQuantum::Iteration, 1),
            TickOutcome::Ended
        ));
        assert!(matches!(
            wire.tick(1.0, TickQuantum::Iteration, 1),
            TickOutcome::Inactive
        ));
        assert_eq!(counters.activations(), 2);
        assert_eq!(counters.cleanups(), 2);
        assert_eq!(wire.last_output().as_int(), 3);
        assert_eq!(wire.state(), WireState::Ended);
    }

    #[test]
    fn failure_cleans_up_and_records_the_message() {
        let counters = ShardCounters::default();
        let mut wire = counting_wire(1, &counters);
        assert!(wire
            .add_shard(Box::new(FailingShard::new(FailAt::Activate, &counters)))
            .is_ok());

        match wire.tick(0.0, TickQuantum::Iteration, 1) {
            TickOutcome::Failed { shard, .. } => assert_eq!(shard, "Failing"),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(counters.cleanups(), 2);
        let info = wire.info();
        assert!(info.failed);
        assert!(info.failure.is_some());
    }

    #[test]
    fn destroy_reports_outstanding_references_once() {
        let counters = ShardCounters::default();
        let mut wire = counting_wire(2, &counters);
        let held = wire.reference_variable("leaky");
        assert!(matches!(
            wire.destroy(),
            Err(WireError::OutstandingReferences { count: 1, .. })
        ));
        assert_eq!(counters.destroyed(), 2);
        assert!(wire.destroy().is_ok());
        // The leaked slot is still readable.
        release_variable(held);
    }

    #[test]
    fn external_shard_cannot_join_two_wires() {
        let counters = ShardCounters::default();
        let shared = SharedShard::new(Box::new(CountingShard::new("shared", &counters)));
        let mut first = Wire::new("first");
        let mut second = Wire::new("second");
        assert!(first.add_external_shard(&shared).is_ok());
        assert!(matches!(
            second.add_external_shard(&shared),
            Err(WireError::ShardAlreadyOwned { .. })
        ));

        drop(first);
        assert_eq!(counters.destroyed(), 0);
        assert!(second.add_external_shard(&shared).is_ok());
        drop(second);
        drop(shared);
        assert_eq!(counters.destroyed(), 1);
    }

    #[test]
    fn freeing_an_external_variable_requires_released_references() {
        let mut wire = Wire::new("ext");
        let host = wire.alloc_external_variable("speed", TypeInfo::Float);
        let shard = wire.reference_variable("speed");
        assert!(matches!(
            wire.free_external_variable("speed"),
            Err(WireError::OutstandingReferences { count: 1, .. })
        ));
        release_variable(shard);
        drop(host);
        assert!(wire.free_external_variable("speed").is_ok());
        assert!(matches!(
            wire.free_external_variable("speed"),
            Err(WireError::UnknownExternalVariable { .. })
        ));
    }
}
