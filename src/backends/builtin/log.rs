// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Context;
use crate::errors::{ActivationError, ParamError};
use crate::observability::messages::shard::ShardLogged;
use crate::observability::messages::StructuredLog;
use crate::traits::Shard;
use crate::types::{ClonedVar, ParameterInfo, Parameters, TypeInfo, Types, Var};

/// Logs its input through `tracing` and passes it on.
#[derive(Default)]
pub struct LogShard {
    prefix: String,
}

impl LogShard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Shard for LogShard {
    fn name(&self) -> &str {
        "Log"
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![ParameterInfo::new(
            "Prefix",
            "Text printed before the value.",
            vec![TypeInfo::String],
        )]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => {
                self.prefix = value.as_str().to_string();
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
            0 => Ok(ClonedVar::from(self.prefix.as_str())),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 1,
            }),
        }
    }

    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        ShardLogged {
            wire: ctx.wire_name(),
            prefix: &self.prefix,
            value: &input.to_string(),
        }
        .log();
        Ok(input.borrowed())
    }
}
