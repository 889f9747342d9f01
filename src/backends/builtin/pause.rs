// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Context;
use crate::errors::{ActivationError, ParamError};
use crate::traits::Shard;
use crate::types::{ClonedVar, ParameterInfo, Parameters, TypeInfo, Types, Var, VarKind};

/// Suspends the wire for `Time` seconds, then passes its input on.
///
/// The wire re-activates this shard once the delay has elapsed; that second
/// activation sees `Context::is_resuming` and simply continues.
#[derive(Default)]
pub struct PauseShard {
    seconds: f64,
}

impl PauseShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seconds(seconds: f64) -> Self {
        Self { seconds }
    }
}

impl Shard for PauseShard {
    fn name(&self) -> &str {
        "Pause"
    }

    fn help(&self) -> &str {
        "Suspends the wire for the given number of seconds."
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![ParameterInfo::new(
            "Time",
            "Seconds to wait; zero yields until the next tick.",
            vec![TypeInfo::Float, TypeInfo::Int],
        )]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match (index, value.kind) {
            (0, VarKind::Float) => self.seconds = value.as_float(),
            (0, VarKind::Int) => self.seconds = value.as_int() as f64,
            (0, _) => {
                return Err(ParamError::Rejected {
                    shard: self.name().to_string(),
                    parameter: "Time".to_string(),
                    reason: format!("expected a number, got {}", value.kind),
                })
            }
            _ => {
                return Err(ParamError::IndexOutOfRange {
                    shard: self.name().to_string(),
                    index,
                    count: 1,
                })
            }
        }
        Ok(())
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => Ok(ClonedVar::from(self.seconds)),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 1,
            }),
        }
    }

    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        if !ctx.is_resuming() {
            ctx.suspend(self.seconds);
        }
        Ok(input.borrowed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExternalVariables, VariableStore};

    #[test]
    fn suspends_once_then_passes_through() {
        let mut shard = PauseShard::with_seconds(2.0);
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);

        let out = shard.activate(&mut ctx, &Var::from(4i64));
        assert_eq!(out.map(|v| v.as_int()), Ok(4));
        assert_eq!(ctx.take_suspend(), Some(2.0));

        ctx.set_resuming(true);
        let out = shard.activate(&mut ctx, &Var::from(4i64));
        assert_eq!(out.map(|v| v.as_int()), Ok(4));
        assert_eq!(ctx.take_suspend(), None);
    }

    #[test]
    fn integer_time_is_accepted() {
        let mut shard = PauseShard::new();
        assert!(shard.set_param(0, &Var::from(3i64)).is_ok());
        assert_eq!(shard.get_param(0).map(|v| v.as_float()), Ok(3.0));
        assert!(shard.set_param(0, &Var::from(true)).is_err());
    }
}
