// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Context;
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::traits::{InstanceData, Shard};
use crate::types::{derive_type_info, ClonedVar, ParameterInfo, Parameters, TypeInfo, Types, Var};

/// Ignores its input and outputs a fixed value.
#[derive(Default)]
pub struct ConstShard {
    value: ClonedVar,
}

impl ConstShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &Var) -> Self {
        Self {
            value: ClonedVar::new(value),
        }
    }
}

impl Shard for ConstShard {
    fn name(&self) -> &str {
        "Const"
    }

    fn help(&self) -> &str {
        "Outputs the value of its Value parameter."
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![ParameterInfo::new(
            "Value",
            "The value to output.",
            vec![TypeInfo::Any],
        )]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => {
                self.value.assign(value);
                Ok(())
            }
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 1,
            }),
        }
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => Ok(self.value.clone()),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 1,
            }),
        }
    }

    fn compose(&mut self, _data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        Ok(derive_type_info(self.value.var()))
    }

    fn activate(&mut self, _ctx: &mut Context, _input: &Var) -> Result<Var, ActivationError> {
        Ok(self.value.borrowed())
    }
}
