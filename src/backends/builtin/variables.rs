// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `Set` and `Get`: wire variables as seen from the shard list.
//!
//! Both take a counted reference to the slot at warmup and release it at
//! cleanup, so the slot outlives every activation in between.

use crate::engine::{Context, VariableRef};
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::traits::{InstanceData, Shard};
use crate::types::{
    clone_var, derive_type_info, ClonedVar, ExposedTypeInfo, ExposedTypes, ParameterInfo,
    Parameters, TypeInfo, Types, Var,
};

fn name_parameter() -> ParameterInfo {
    ParameterInfo::new("Name", "The variable name.", vec![TypeInfo::String])
}

fn out_of_range(shard: &str, index: usize, count: usize) -> ParamError {
    ParamError::IndexOutOfRange {
        shard: shard.to_string(),
        index,
        count,
    }
}

/// Copies its input into a variable and passes the input on.
#[derive(Default)]
pub struct SetShard {
    name: String,
    exposed_type: Option<TypeInfo>,
    reference: Option<VariableRef>,
}

impl SetShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Shard for SetShard {
    fn name(&self) -> &str {
        "Set"
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![name_parameter()]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => {
                self.name = value.as_str().to_string();
                self.exposed_type = None;
                Ok(())
            }
            _ => Err(out_of_range(self.name(), index, 1)),
        }
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => Ok(ClonedVar::from(self.name.as_str())),
            _ => Err(out_of_range(self.name(), index, 1)),
        }
    }

    fn exposed_variables(&self) -> ExposedTypes {
        if self.name.is_empty() {
            return Vec::new();
        }
        let exposed_type = self.exposed_type.clone().unwrap_or(TypeInfo::Any);
        vec![ExposedTypeInfo::new(self.name.clone(), exposed_type)]
    }

    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        if self.name.is_empty() {
            return Err(CompositionError::InvalidParameter {
                shard: self.name().to_string(),
                parameter: "Name".to_string(),
                reason: "a variable name is required".to_string(),
            });
        }
        self.exposed_type = Some(data.input_type.clone());
        Ok(data.input_type.clone())
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), ActivationError> {
        self.reference = Some(ctx.reference_variable(&self.name));
        Ok(())
    }

    fn activate(&mut self, _ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        if let Some(reference) = &self.reference {
            // SAFETY: held from warmup to cleanup; nothing else borrows the slot during activate.
            unsafe { clone_var(reference.get_mut(), input) };
        }
        Ok(input.borrowed())
    }

    fn cleanup(&mut self, ctx: &mut Context) {
        if let Some(reference) = self.reference.take() {
            ctx.release_variable(reference);
        }
    }
}

/// Outputs the current value of a variable, or `Default` while it is unset.
///
/// The value is copied into a buffer the shard owns, so the output stays
/// valid when a later `Set` replaces the variable.
#[derive(Default)]
pub struct GetShard {
    name: String,
    default: ClonedVar,
    reference: Option<VariableRef>,
    output: ClonedVar,
}

impl GetShard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Shard for GetShard {
    fn name(&self) -> &str {
        "Get"
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![
            name_parameter(),
            ParameterInfo::new(
                "Default",
                "Output used while the variable is unset.",
                vec![TypeInfo::Any],
            ),
        ]
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => self.name = value.as_str().to_string(),
            1 => self.default.assign(value),
            _ => return Err(out_of_range(self.name(), index, 2)),
        }
        Ok(())
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => Ok(ClonedVar::from(self.name.as_str())),
            1 => Ok(self.default.clone()),
            _ => Err(out_of_range(self.name(), index, 2)),
        }
    }

    /// Without a default the variable must have been exposed upstream.
    fn required_variables(&self) -> ExposedTypes {
        if self.name.is_empty() || !self.default.is_none() {
            return Vec::new();
        }
        vec![ExposedTypeInfo::new(self.name.clone(), TypeInfo::Any)]
    }

    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        if self.name.is_empty() {
            return Err(CompositionError::InvalidParameter {
                shard: self.name().to_string(),
                parameter: "Name".to_string(),
                reason: "a variable name is required".to_string(),
            });
        }
        Ok(match data.shared.get(&self.name) {
            Some(exposed) => exposed.exposed_type.clone(),
            None if !self.default.is_none() => derive_type_info(self.default.var()),
            None => TypeInfo::Any,
        })
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), ActivationError> {
        self.reference = Some(ctx.reference_variable(&self.name));
        Ok(())
    }

    fn activate(&mut self, _ctx: &mut Context, _input: &Var) -> Result<Var, ActivationError> {
        let value = match &self.reference {
            // SAFETY: held from warmup to cleanup.
            Some(reference) => unsafe { reference.get() },
            None => &Var::NONE,
        };
        if value.is_none() {
            return Ok(self.default.borrowed());
        }
        self.output.assign(value);
        Ok(self.output.borrowed())
    }

    fn cleanup(&mut self, ctx: &mut Context) {
        if let Some(reference) = self.reference.take() {
            ctx.release_variable(reference);
        }
        self.output.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExternalVariables, VariableStore};
    use crate::traits::ExposedPool;

    #[test]
    fn set_then_get_round_trips_through_the_slot() {
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut set = SetShard::named("x");
        let mut get = GetShard::named("x");
        {
            let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
            assert!(set.warmup(&mut ctx).is_ok());
            assert!(get.warmup(&mut ctx).is_ok());

            let text = Var::new_string("hello");
            assert!(set.activate(&mut ctx, &text).is_ok());
            let out = get.activate(&mut ctx, &Var::NONE);
            assert_eq!(out.map(|v| v.as_str().to_string()), Ok("hello".to_string()));

            set.cleanup(&mut ctx);
            get.cleanup(&mut ctx);
            let mut text = text;
            crate::types::destroy_var(&mut text);
        }
        assert_eq!(locals.outstanding_references(), 0);
    }

    #[test]
    fn reassigning_from_get_keeps_the_value_alive() {
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut first = SetShard::named("s");
        let mut get = GetShard::named("s");
        let mut second = SetShard::named("s");
        {
            let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
            assert!(first.warmup(&mut ctx).is_ok());
            assert!(get.warmup(&mut ctx).is_ok());
            assert!(second.warmup(&mut ctx).is_ok());

            let hello = ClonedVar::from("hello");
            assert!(first.activate(&mut ctx, hello.var()).is_ok());
            let view = get.activate(&mut ctx, &Var::NONE).unwrap();
            let out = second.activate(&mut ctx, &view).unwrap();

            assert_eq!(out.as_str(), "hello");
            let stored = ctx.reference_variable("s");
            // SAFETY: released right below.
            let slot = unsafe { stored.get() };
            assert_eq!(slot.as_str(), "hello");
            assert_ne!(slot.as_str().as_ptr(), out.as_str().as_ptr());
            ctx.release_variable(stored);

            first.cleanup(&mut ctx);
            get.cleanup(&mut ctx);
            second.cleanup(&mut ctx);
        }
        assert_eq!(locals.outstanding_references(), 0);
    }

    #[test]
    fn get_falls_back_to_default_while_unset() {
        let mut locals = VariableStore::new();
        let externals = ExternalVariables::default();
        let mut get = GetShard::named("missing");
        assert!(get.set_param(1, &Var::from(7i64)).is_ok());
        assert!(get.required_variables().is_empty());

        let mut ctx = Context::new("w", &mut locals, &externals, 0.0, 0);
        assert!(get.warmup(&mut ctx).is_ok());
        assert_eq!(get.activate(&mut ctx, &Var::NONE).map(|v| v.as_int()), Ok(7));
        get.cleanup(&mut ctx);
    }

    #[test]
    fn get_composes_to_the_exposed_type() {
        let mut pool = ExposedPool::new();
        pool.insert("n".to_string(), ExposedTypeInfo::new("n", TypeInfo::Int));
        let mut get = GetShard::named("n");
        let data = InstanceData {
            wire_name: "w",
            input_type: &TypeInfo::None,
            shared: &pool,
            shard_index: 0,
        };
        assert_eq!(get.compose(&data), Ok(TypeInfo::Int));
        assert_eq!(get.required_variables().len(), 1);
    }

    #[test]
    fn set_without_a_name_fails_composition() {
        let pool = ExposedPool::new();
        let mut set = SetShard::new();
        let data = InstanceData {
            wire_name: "w",
            input_type: &TypeInfo::Int,
            shared: &pool,
            shard_index: 0,
        };
        assert!(matches!(
            set.compose(&data),
            Err(CompositionError::InvalidParameter { .. })
        ));
    }
}
