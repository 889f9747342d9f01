// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod alloc;
pub mod array;
mod cloned;
mod json;
mod ops;
pub mod table;
mod type_info;
pub mod var;

pub use array::CArray;
pub use cloned::ClonedVar;
pub use json::to_json;
pub use ops::{
    clone_var, compare_var, destroy_var, hash_var, is_equal_var, seq_free, seq_insert, seq_push,
    seq_resize,
};
pub use type_info::{
    derive_type_info, match_types, types_to_string, ExposedTypeInfo, ExposedTypes, ParameterInfo,
    Parameters, TypeInfo, Types,
};
pub use var::{flags, Var, VarKind};
