// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Context;
use crate::errors::{ActivationError, ParamError};
use crate::traits::Shard;
use crate::types::{ClonedVar, ParameterInfo, Parameters, TypeInfo, Types, Var, VarKind};

/// Fails the wire unless the input equals (`Assert.Is`) or differs from
/// (`Assert.IsNot`) the Value parameter. Passes the input through.
pub struct AssertShard {
    expect_equal: bool,
    value: ClonedVar,
    abort: bool,
}

impl AssertShard {
    pub fn is() -> Self {
        Self {
            expect_equal: true,
            value: ClonedVar::default(),
            abort: false,
        }
    }

    pub fn is_not() -> Self {
        Self {
            expect_equal: false,
            ..Self::is()
        }
    }
}

impl Shard for AssertShard {
    fn name(&self) -> &str {
        if self.expect_equal {
            "Assert.Is"
        } else {
            "Assert.IsNot"
        }
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![
            ParameterInfo::new("Value", "The value to test against.", vec![TypeInfo::Any]),
            ParameterInfo::new(
                "Abort",
                "Abort the wire instead of raising an assertion error.",
                vec![TypeInfo::Bool],
            ),
        ]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => self.value.assign(value),
            1 if value.kind == VarKind::Bool => self.abort = value.as_bool(),
            1 => {
                return Err(ParamError::Rejected {
                    shard: self.name().to_string(),
                    parameter: "Abort".to_string(),
                    reason: format!("expected a bool, got {}", value.kind),
                })
            }
            _ => {
                return Err(ParamError::IndexOutOfRange {
                    shard: self.name().to_string(),
                    index,
                    count: 2,
                })
            }
        }
        Ok(())
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => Ok(self.value.clone()),
            1 => Ok(ClonedVar::from(self.abort)),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 2,
            }),
        }
    }

    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        let equal = input == self.value.var();
        if equal == self.expect_equal {
            return Ok(input.borrowed());
        }
        let message = format!(
            "{} failed: input {} {} {}",
            self.name(),
            input,
            if self.expect_equal { "!=" } else { "==" },
            self.value
        );
        if self.abort {
            ctx.abort(message);
            Ok(input.borrowed())
        } else {
            Err(ActivationError::with_code(ActivationError::ASSERTION, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExternalVariables, VariableStore};

    #[test]
    fn abort_rejects_non_bool_values() {
        let mut shard = AssertShard::is();
        assert!(shard.set_param(1, &Var::from(true)).is_ok());
        match shard.set_param(1, &Var::from(1i64)) {
            Err(ParamError::Rejected { parameter, .. }) => assert_eq!(parameter, "Abort"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            shard.set_param(2, &Var::from(true)),
            Err(ParamError::IndexOutOfRange { count: 2, .. })
        ));
    }

    #[test]
    fn passing_assertion_returns_a_borrowed_view() {
        let mut shard = AssertShard::is_not();
        assert!(shard.set_param(0, &Var::from(1i64)).is_ok());
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);

        let input = ClonedVar::from("owned text");
        assert!(input.is_owned());
        let out = shard.activate(&mut ctx, input.var()).unwrap();
        assert_eq!(out.as_str(), "owned text");
        assert!(!out.is_owned());
        assert_eq!(out.refcount, 0);
    }
}
