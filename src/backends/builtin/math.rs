// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binary arithmetic between the input and an operand.
//!
//! The operand is either a constant or a variable (`ContextVar`) resolved at
//! warmup. Integer math wraps; vector kinds work per lane.

use crate::engine::{Context, VariableRef};
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::traits::{InstanceData, Shard};
use crate::types::{
    derive_type_info, match_types, ClonedVar, ExposedTypeInfo, ExposedTypes, ParameterInfo,
    Parameters, TypeInfo, Types, Var, VarKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
}

impl MathOp {
    fn shard_name(self) -> &'static str {
        match self {
            MathOp::Add => "Math.Add",
            MathOp::Subtract => "Math.Subtract",
            MathOp::Multiply => "Math.Multiply",
        }
    }

    fn int(self, a: i64, b: i64) -> i64 {
        match self {
            MathOp::Add => a.wrapping_add(b),
            MathOp::Subtract => a.wrapping_sub(b),
            MathOp::Multiply => a.wrapping_mul(b),
        }
    }

    fn int32(self, a: i32, b: i32) -> i32 {
        match self {
            MathOp::Add => a.wrapping_add(b),
            MathOp::Subtract => a.wrapping_sub(b),
            MathOp::Multiply => a.wrapping_mul(b),
        }
    }

    fn byte(self, a: u8, b: u8) -> u8 {
        match self {
            MathOp::Add => a.wrapping_add(b),
            MathOp::Subtract => a.wrapping_sub(b),
            MathOp::Multiply => a.wrapping_mul(b),
        }
    }

    fn float(self, a: f64, b: f64) -> f64 {
        match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
        }
    }

    fn float32(self, a: f32, b: f32) -> f32 {
        match self {
            MathOp::Add => a + b,
            MathOp::Subtract => a - b,
            MathOp::Multiply => a * b,
        }
    }

    /// Combine two values of the same numeric kind.
    pub fn apply(self, a: &Var, b: &Var) -> Result<Var, ActivationError> {
        if a.kind != b.kind {
            return Err(ActivationError::with_code(
                ActivationError::INVALID_INPUT,
                format!(
                    "{}: operand is {} but input is {}",
                    self.shard_name(),
                    b.kind,
                    a.kind
                ),
            ));
        }
        let out = match a.kind {
            VarKind::Int => Var::from(self.int(a.as_int(), b.as_int())),
            VarKind::Int2 => {
                let (x, y) = (a.as_int2(), b.as_int2());
                Var::int2(self.int(x[0], y[0]), self.int(x[1], y[1]))
            }
            VarKind::Int3 => {
                let (x, y) = (a.as_int3(), b.as_int3());
                Var::int3(
                    self.int32(x[0], y[0]),
                    self.int32(x[1], y[1]),
                    self.int32(x[2], y[2]),
                )
            }
            VarKind::Int4 => {
                let (x, y) = (a.as_int4(), b.as_int4());
                Var::int4(
                    self.int32(x[0], y[0]),
                    self.int32(x[1], y[1]),
                    self.int32(x[2], y[2]),
                    self.int32(x[3], y[3]),
                )
            }
            VarKind::Float => Var::from(self.float(a.as_float(), b.as_float())),
            VarKind::Float2 => {
                let (x, y) = (a.as_float2(), b.as_float2());
                Var::float2(self.float(x[0], y[0]), self.float(x[1], y[1]))
            }
            VarKind::Float3 => {
                let (x, y) = (a.as_float3(), b.as_float3());
                Var::float3(
                    self.float32(x[0], y[0]),
                    self.float32(x[1], y[1]),
                    self.float32(x[2], y[2]),
                )
            }
            VarKind::Float4 => {
                let (x, y) = (a.as_float4(), b.as_float4());
                Var::float4(
                    self.float32(x[0], y[0]),
                    self.float32(x[1], y[1]),
                    self.float32(x[2], y[2]),
                    self.float32(x[3], y[3]),
                )
            }
            VarKind::Color => {
                let (x, y) = (a.as_color(), b.as_color());
                Var::color(
                    self.byte(x[0], y[0]),
                    self.byte(x[1], y[1]),
                    self.byte(x[2], y[2]),
                    self.byte(x[3], y[3]),
                )
            }
            other => {
                return Err(ActivationError::with_code(
                    ActivationError::INVALID_INPUT,
                    format!("{}: cannot operate on {}", self.shard_name(), other),
                ))
            }
        };
        Ok(out)
    }
}

fn numeric_types() -> Types {
    vec![
        TypeInfo::Int,
        TypeInfo::Int2,
        TypeInfo::Int3,
        TypeInfo::Int4,
        TypeInfo::Float,
        TypeInfo::Float2,
        TypeInfo::Float3,
        TypeInfo::Float4,
        TypeInfo::Color,
    ]
}

pub struct MathShard {
    op: MathOp,
    operand: ClonedVar,
    variable: Option<VariableRef>,
}

impl MathShard {
    pub fn new(op: MathOp) -> Self {
        Self {
            op,
            operand: ClonedVar::default(),
            variable: None,
        }
    }

    fn operand_variable(&self) -> Option<&str> {
        (self.operand.kind == VarKind::ContextVar).then(|| self.operand.as_str())
    }
}

impl Shard for MathShard {
    fn name(&self) -> &str {
        self.op.shard_name()
    }

    fn help(&self) -> &str {
        "Applies the operation to the input and the Operand parameter."
    }

    fn input_types(&self) -> Types {
        numeric_types()
    }

    fn output_types(&self) -> Types {
        numeric_types()
    }

    fn parameters(&self) -> Parameters {
        let mut types = numeric_types();
        types.push(TypeInfo::context_var_of(numeric_types()));
        vec![ParameterInfo::new(
            "Operand",
            "The right-hand side, a value or a variable.",
            types,
        )]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => {
                self.operand.assign(value);
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
            0 => Ok(self.operand.clone()),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 1,
            }),
        }
    }

    fn required_variables(&self) -> ExposedTypes {
        match self.operand_variable() {
            Some(name) => vec![ExposedTypeInfo::new(name, TypeInfo::Any)],
            None => Vec::new(),
        }
    }

    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        let operand_type = match self.operand_variable() {
            Some(name) => match data.shared.get(name) {
                Some(exposed) => exposed.exposed_type.clone(),
                None => TypeInfo::Any,
            },
            None => derive_type_info(self.operand.var()),
        };
        let known = !matches!(operand_type, TypeInfo::Any);
        if known && !match_types(&operand_type, data.input_type, false, true) {
            return Err(CompositionError::InvalidParameter {
                shard: self.name().to_string(),
                parameter: "Operand".to_string(),
                reason: format!(
                    "operand of type {} does not fit input {}",
                    operand_type, data.input_type
                ),
            });
        }
        Ok(data.input_type.clone())
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), ActivationError> {
        if let Some(name) = self.operand_variable() {
            let name = name.to_string();
            self.variable = Some(ctx.reference_variable(&name));
        }
        Ok(())
    }

    fn activate(&mut self, _ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        match &self.variable {
            // SAFETY: the reference is held from warmup to cleanup.
            Some(reference) => self.op.apply(input, unsafe { reference.get() }),
            None => self.op.apply(input, self.operand.var()),
        }
    }

    fn cleanup(&mut self, ctx: &mut Context) {
        if let Some(reference) = self.variable.take() {
            ctx.release_variable(reference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_math_wraps() {
        let out = MathOp::Add.apply(&Var::from(i64::MAX), &Var::from(1i64));
        assert_eq!(out.map(|v| v.as_int()), Ok(i64::MIN));
    }

    #[test]
    fn vectors_operate_per_lane() {
        let out = MathOp::Multiply.apply(&Var::float2(1.5, -2.0), &Var::float2(2.0, 3.0));
        assert_eq!(out.map(|v| v.as_float2()), Ok([3.0, -6.0]));
    }

    #[test]
    fn mismatched_kinds_are_invalid_input() {
        let out = MathOp::Subtract.apply(&Var::from(1i64), &Var::from(1.0));
        assert_eq!(
            out.map_err(|e| e.code),
            Err(ActivationError::INVALID_INPUT)
        );
    }
}
