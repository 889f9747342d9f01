// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The shard lifecycle contract.
//!
//! A shard moves through *constructed → composed → warmed → activated
//! (repeatedly) → cleaned up → destroyed*. The wire that owns the shard
//! drives every transition; a shard never calls its own lifecycle methods.
//!
//! Builtin shards implement [`Shard`] directly. Shards written in other
//! languages are driven through a C vtable by
//! [`ForeignShard`](crate::backends::foreign::ForeignShard), which implements
//! the same trait.

use crate::engine::Context;
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::types::{
    derive_type_info, match_types, ClonedVar, ExposedTypeInfo, ExposedTypes, Parameters,
    TypeInfo, Types, Var, VarKind,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Variables visible at a point of composition, by name.
pub type ExposedPool = BTreeMap<String, ExposedTypeInfo>;

/// What a shard learns about its position when composed.
pub struct InstanceData<'a> {
    pub wire_name: &'a str,
    /// Output type of the previous shard (or the wire input).
    pub input_type: &'a TypeInfo,
    /// Everything exposed so far, including host externals.
    pub shared: &'a ExposedPool,
    pub shard_index: usize,
}

/// Stable identifier derived from a shard name.
pub fn shard_hash(name: &str) -> u32 {
    let digest = Sha256::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// The single concrete declared output type, or the input type.
pub fn default_output_type(outputs: &[TypeInfo], input_type: &TypeInfo) -> TypeInfo {
    match outputs {
        [single] if !matches!(single, TypeInfo::Any) => single.clone(),
        _ => input_type.clone(),
    }
}

pub trait Shard: Send {
    fn name(&self) -> &str;

    fn hash(&self) -> u32 {
        shard_hash(self.name())
    }

    fn help(&self) -> &str {
        ""
    }

    fn input_types(&self) -> Types;

    fn output_types(&self) -> Types;

    fn parameters(&self) -> Parameters {
        Vec::new()
    }

    /// Store a parameter. Callers normally go through [`set_param_checked`].
    fn set_param(&mut self, index: usize, _value: &Var) -> Result<(), ParamError> {
        Err(ParamError::IndexOutOfRange {
            shard: self.name().to_string(),
            index,
            count: self.parameters().len(),
        })
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        Err(ParamError::IndexOutOfRange {
            shard: self.name().to_string(),
            index,
            count: self.parameters().len(),
        })
    }

    /// Variables this shard makes available to later shards. Read after compose.
    fn exposed_variables(&self) -> ExposedTypes {
        Vec::new()
    }

    /// Variables that must be exposed before this shard. Read before compose.
    fn required_variables(&self) -> ExposedTypes {
        Vec::new()
    }

    /// Decide the output type for the given position.
    ///
    /// The default produces the single declared output type when it is
    /// concrete, and passes the input type through otherwise.
    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        Ok(default_output_type(&self.output_types(), data.input_type))
    }

    fn warmup(&mut self, _ctx: &mut Context) -> Result<(), ActivationError> {
        Ok(())
    }

    /// Process one input. The returned value may borrow memory owned by the
    /// shard; it stays valid until the next call on this shard.
    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError>;

    fn cleanup(&mut self, _ctx: &mut Context) {}

    /// Release everything the shard holds. Called exactly once.
    fn destroy(&mut self) {}
}

/// Check a value against a parameter declaration.
///
/// An empty sequence is accepted by any sequence parameter, and a sequence
/// value passes when any of its elements matches.
pub fn validate_param(declared: &Types, value: &Var) -> bool {
    let provided = derive_type_info(value);
    if value.kind == VarKind::Seq && value.as_seq().is_empty() {
        return declared.iter().any(|t| matches!(t, TypeInfo::Seq(_)));
    }
    if declared
        .iter()
        .any(|t| match_types(&provided, t, true, true))
    {
        return true;
    }
    value.kind == VarKind::Seq
        && value.as_seq().iter().any(|item| {
            let element = derive_type_info(item);
            declared
                .iter()
                .any(|t| match_types(&element, t, true, true))
        })
}

/// Range- and type-check a parameter before handing it to the shard.
pub fn set_param_checked(
    shard: &mut dyn Shard,
    index: usize,
    value: &Var,
) -> Result<(), ParamError> {
    let parameters = shard.parameters();
    let Some(info) = parameters.get(index) else {
        return Err(ParamError::IndexOutOfRange {
            shard: shard.name().to_string(),
            index,
            count: parameters.len(),
        });
    };
    if !validate_param(&info.types, value) {
        return Err(ParamError::TypeMismatch {
            shard: shard.name().to_string(),
            parameter: info.name.clone(),
            expected: info.types.clone(),
            found: derive_type_info(value),
        });
    }
    shard.set_param(index, value)
}

/// Set a parameter by its declared name.
pub fn set_param_by_name(
    shard: &mut dyn Shard,
    name: &str,
    value: &Var,
) -> Result<(), ParamError> {
    let index = shard
        .parameters()
        .iter()
        .position(|p| p.name == name)
        .ok_or_else(|| ParamError::UnknownName {
            shard: shard.name().to_string(),
            parameter: name.to_string(),
        })?;
    set_param_checked(shard, index, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{destroy_var, ParameterInfo};

    struct Echo {
        value: ClonedVar,
    }

    impl Shard for Echo {
        fn name(&self) -> &str {
            "Echo"
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
                "",
                vec![TypeInfo::Int, TypeInfo::seq_of(TypeInfo::Int)],
            )]
        }

        fn set_param(&mut self, _index: usize, value: &Var) -> Result<(), ParamError> {
            self.value.assign(value);
            Ok(())
        }

        fn activate(&mut self, _ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
            Ok(input.borrowed())
        }
    }

    #[test]
    fn hash_is_stable_for_a_name() {
        assert_eq!(shard_hash("Const"), shard_hash("Const"));
        assert_ne!(shard_hash("Const"), shard_hash("Math.Add"));
    }

    #[test]
    fn checked_set_rejects_out_of_range_and_wrong_types() {
        let mut echo = Echo {
            value: ClonedVar::default(),
        };
        assert!(matches!(
            set_param_checked(&mut echo, 3, &Var::from(1i64)),
            Err(ParamError::IndexOutOfRange { count: 1, .. })
        ));
        assert!(matches!(
            set_param_checked(&mut echo, 0, &Var::from(true)),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert!(set_param_checked(&mut echo, 0, &Var::from(7i64)).is_ok());
        assert_eq!(echo.value.as_int(), 7);
    }

    #[test]
    fn empty_seq_passes_any_seq_parameter() {
        let declared = vec![TypeInfo::seq_of(TypeInfo::String)];
        let mut empty = Var::new_seq(&[]);
        assert!(validate_param(&declared, &empty));
        destroy_var(&mut empty);
    }

    #[test]
    fn unknown_parameter_names_are_reported() {
        let mut echo = Echo {
            value: ClonedVar::default(),
        };
        assert!(matches!(
            set_param_by_name(&mut echo, "Missing", &Var::from(1i64)),
            Err(ParamError::UnknownName { .. })
        ));
    }

    #[test]
    fn default_compose_passes_input_through_for_any_output() {
        let mut echo = Echo {
            value: ClonedVar::default(),
        };
        let pool = ExposedPool::new();
        let data = InstanceData {
            wire_name: "w",
            input_type: &TypeInfo::Float,
            shared: &pool,
            shard_index: 0,
        };
        assert_eq!(echo.compose(&data), Ok(TypeInfo::Float));
    }
}
