// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-activation view of the running wire handed to every shard.

use crate::engine::variables::{release_variable, ExternalVariables, VariableRef, VariableStore};
use crate::errors::ActivationError;
use crate::types::Var;

/// What the wire should do once the current shard returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Continue,
    /// End the iteration; the shard's input becomes the iteration output.
    Return,
    /// Start over at shard 0 on the next quantum.
    Restart,
    /// End the wire; the shard's output becomes the final output.
    Stop,
}

pub struct Context<'a> {
    wire: &'a str,
    variables: &'a mut VariableStore,
    externals: &'a ExternalVariables,
    now: f64,
    iteration: u64,
    resuming: bool,
    suspend: Option<f64>,
    flow: FlowState,
    abort: Option<ActivationError>,
}

impl<'a> Context<'a> {
    pub fn new(
        wire: &'a str,
        variables: &'a mut VariableStore,
        externals: &'a ExternalVariables,
        now: f64,
        iteration: u64,
    ) -> Self {
        Self {
            wire,
            variables,
            externals,
            now,
            iteration,
            resuming: false,
            suspend: None,
            flow: FlowState::Continue,
            abort: None,
        }
    }

    pub fn wire_name(&self) -> &str {
        self.wire
    }

    /// Current mesh time in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Completed iterations of the wire before this one.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// True while re-activating the shard that suspended the wire.
    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    pub(crate) fn set_resuming(&mut self, resuming: bool) {
        self.resuming = resuming;
    }

    /// Ask the scheduler to park the wire for `seconds` after this activation.
    /// The same shard is activated again, with [`Context::is_resuming`] set,
    /// once the time has passed. Zero yields until the next tick.
    pub fn suspend(&mut self, seconds: f64) {
        self.suspend = Some(if seconds.is_finite() { seconds.max(0.0) } else { 0.0 });
    }

    pub(crate) fn take_suspend(&mut self) -> Option<f64> {
        self.suspend.take()
    }

    pub fn stop_flow(&mut self) {
        self.flow = FlowState::Stop;
    }

    pub fn return_flow(&mut self) {
        self.flow = FlowState::Return;
    }

    pub fn restart_flow(&mut self) {
        self.flow = FlowState::Restart;
    }

    pub fn flow(&self) -> FlowState {
        self.flow
    }

    pub(crate) fn take_flow(&mut self) -> FlowState {
        std::mem::take(&mut self.flow)
    }

    /// Fail the wire after this activation returns, whatever it returns.
    pub fn abort(&mut self, message: impl Into<String>) {
        self.abort = Some(ActivationError::with_code(
            ActivationError::ABORTED,
            message,
        ));
    }

    pub(crate) fn take_abort(&mut self) -> Option<ActivationError> {
        self.abort.take()
    }

    /// Reference a variable by name. Externals shadow locals; a local is
    /// created on first reference.
    pub fn reference_variable(&mut self, name: &str) -> VariableRef {
        match self.externals.reference(name) {
            Some(reference) => reference,
            None => self.variables.reference(name),
        }
    }

    pub fn release_variable(&mut self, reference: VariableRef) {
        release_variable(reference);
    }

    /// Current value of a variable without taking a reference.
    pub fn variable(&self, name: &str) -> Option<&Var> {
        self.externals
            .get(name)
            .or_else(|| self.variables.get(name))
    }

    /// Deep-copy `value` into a local variable.
    pub fn set_variable(&mut self, name: &str, value: &Var) {
        self.variables.set(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{clone_var, TypeInfo};

    #[test]
    fn externals_shadow_local_variables() {
        let mut locals = VariableStore::new();
        locals.set("x", &Var::from(1i64));
        let mut externals = ExternalVariables::default();
        let host = externals.allocate("x", TypeInfo::Int);
        unsafe { clone_var(host.get_mut(), &Var::from(2i64)) };

        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
        assert_eq!(ctx.variable("x").map(|v| v.as_int()), Some(2));
        let reference = ctx.reference_variable("x");
        assert_eq!(unsafe { reference.get() }.as_int(), 2);
        ctx.release_variable(reference);
    }

    #[test]
    fn suspend_clamps_negative_and_non_finite_durations() {
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
        ctx.suspend(-3.0);
        assert_eq!(ctx.take_suspend(), Some(0.0));
        ctx.suspend(f64::NAN);
        assert_eq!(ctx.take_suspend(), Some(0.0));
        assert_eq!(ctx.take_suspend(), None);
    }

    #[test]
    fn flow_and_abort_are_consumed_once() {
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
        ctx.restart_flow();
        ctx.abort("boom");
        assert_eq!(ctx.take_flow(), FlowState::Restart);
        assert_eq!(ctx.take_flow(), FlowState::Continue);
        let error = ctx.take_abort();
        assert_eq!(error.map(|e| e.code), Some(ActivationError::ABORTED));
        assert!(ctx.take_abort().is_none());
    }
}
