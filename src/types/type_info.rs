// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compose-time type descriptors.
//!
//! `TypeInfo` describes what a shard accepts or produces. It is consulted
//! while composing a wire and while validating parameters, never on the hot
//! activation path. The C mirror used across the ABI lives in `abi::types`.

use crate::types::var::{Var, VarKind};
use std::fmt;

pub type Types = Vec<TypeInfo>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeInfo {
    #[default]
    None,
    Any,
    Enum { vendor_id: i32, type_id: i32 },
    Bool,
    Int,
    Int2,
    Int3,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
    Color,
    Bytes,
    String,
    Path,
    /// A variable reference whose value is one of the listed types.
    ContextVar(Types),
    Image,
    /// Element types; empty means any element.
    Seq(Types),
    /// With keys, `types[i]` is the type under `keys[i]`. Without keys,
    /// `types` lists the value types allowed under any key.
    Table { keys: Vec<String>, types: Types },
    Wire,
    ShardRef,
    Object { vendor_id: i32, type_id: i32 },
    Array(VarKind),
}

impl TypeInfo {
    pub fn kind(&self) -> VarKind {
        match self {
            TypeInfo::None => VarKind::None,
            TypeInfo::Any => VarKind::Any,
            TypeInfo::Enum { .. } => VarKind::Enum,
            TypeInfo::Bool => VarKind::Bool,
            TypeInfo::Int => VarKind::Int,
            TypeInfo::Int2 => VarKind::Int2,
            TypeInfo::Int3 => VarKind::Int3,
            TypeInfo::Int4 => VarKind::Int4,
            TypeInfo::Float => VarKind::Float,
            TypeInfo::Float2 => VarKind::Float2,
            TypeInfo::Float3 => VarKind::Float3,
            TypeInfo::Float4 => VarKind::Float4,
            TypeInfo::Color => VarKind::Color,
            TypeInfo::Bytes => VarKind::Bytes,
            TypeInfo::String => VarKind::String,
            TypeInfo::Path => VarKind::Path,
            TypeInfo::ContextVar(_) => VarKind::ContextVar,
            TypeInfo::Image => VarKind::Image,
            TypeInfo::Seq(_) => VarKind::Seq,
            TypeInfo::Table { .. } => VarKind::Table,
            TypeInfo::Wire => VarKind::Wire,
            TypeInfo::ShardRef => VarKind::ShardRef,
            TypeInfo::Object { .. } => VarKind::Object,
            TypeInfo::Array(_) => VarKind::Array,
        }
    }

    /// Descriptor for a bare kind with no nested information.
    pub fn from_kind(kind: VarKind) -> TypeInfo {
        match kind {
            VarKind::None | VarKind::EndOfBlittableTypes => TypeInfo::None,
            VarKind::Any => TypeInfo::Any,
            VarKind::Enum => TypeInfo::Enum {
                vendor_id: 0,
                type_id: 0,
            },
            VarKind::Bool => TypeInfo::Bool,
            VarKind::Int => TypeInfo::Int,
            VarKind::Int2 => TypeInfo::Int2,
            VarKind::Int3 => TypeInfo::Int3,
            VarKind::Int4 => TypeInfo::Int4,
            VarKind::Float => TypeInfo::Float,
            VarKind::Float2 => TypeInfo::Float2,
            VarKind::Float3 => TypeInfo::Float3,
            VarKind::Float4 => TypeInfo::Float4,
            VarKind::Color => TypeInfo::Color,
            VarKind::Bytes => TypeInfo::Bytes,
            VarKind::String => TypeInfo::String,
            VarKind::Path => TypeInfo::Path,
            VarKind::ContextVar => TypeInfo::ContextVar(Vec::new()),
            VarKind::Image => TypeInfo::Image,
            VarKind::Seq => TypeInfo::Seq(Vec::new()),
            VarKind::Table => TypeInfo::Table {
                keys: Vec::new(),
                types: Vec::new(),
            },
            VarKind::Wire => TypeInfo::Wire,
            VarKind::ShardRef => TypeInfo::ShardRef,
            VarKind::Object => TypeInfo::Object {
                vendor_id: 0,
                type_id: 0,
            },
            VarKind::Array => TypeInfo::Array(VarKind::None),
        }
    }

    pub fn seq_of(element: TypeInfo) -> TypeInfo {
        TypeInfo::Seq(vec![element])
    }

    pub fn table_of(types: Types) -> TypeInfo {
        TypeInfo::Table {
            keys: Vec::new(),
            types,
        }
    }

    pub fn context_var_of(types: Types) -> TypeInfo {
        TypeInfo::ContextVar(types)
    }

    /// Whether a value described by `provided` may flow into `self`.
    ///
    /// Shorthand for [`match_types`] with strict nested checks.
    pub fn accepts(&self, provided: &TypeInfo, is_parameter: bool) -> bool {
        match_types(provided, self, is_parameter, true)
    }
}

/// Decide whether `provided` satisfies `consumed`.
///
/// * A consumed `Any` matches everything. Outside parameter checks a
///   consumed `None` does too.
/// * Otherwise basic kinds must be equal.
/// * Objects and enums compare vendor and type ids; a consumed enum with
///   both ids zero stands for any enum.
/// * In strict mode every provided sequence element type must match some
///   consumed element type, and every provided table value type must match
///   some consumed table type. Keyed consumers also require every provided
///   key to be declared unless they declare an empty key.
pub fn match_types(
    provided: &TypeInfo,
    consumed: &TypeInfo,
    is_parameter: bool,
    strict: bool,
) -> bool {
    if matches!(consumed, TypeInfo::Any) || (!is_parameter && matches!(consumed, TypeInfo::None))
    {
        return true;
    }
    if provided.kind() != consumed.kind() {
        return false;
    }

    match (provided, consumed) {
        (
            TypeInfo::Object {
                vendor_id: pv,
                type_id: pt,
            },
            TypeInfo::Object {
                vendor_id: cv,
                type_id: ct,
            },
        ) => pv == cv && pt == ct,
        (
            TypeInfo::Enum {
                vendor_id: pv,
                type_id: pt,
            },
            TypeInfo::Enum {
                vendor_id: cv,
                type_id: ct,
            },
        ) => (*cv == 0 && *ct == 0) || (pv == cv && pt == ct),
        (TypeInfo::Seq(provided_types), TypeInfo::Seq(consumed_types)) => {
            !strict || match_element_types(provided_types, consumed_types, is_parameter)
        }
        // A bare variable reference is checked later against the variable itself.
        (TypeInfo::ContextVar(provided_types), TypeInfo::ContextVar(consumed_types)) => {
            provided_types.is_empty()
                || !strict
                || match_element_types(provided_types, consumed_types, is_parameter)
        }
        (
            TypeInfo::Table {
                keys: provided_keys,
                types: provided_types,
            },
            TypeInfo::Table {
                keys: consumed_keys,
                types: consumed_types,
            },
        ) => {
            !strict
                || match_tables(
                    provided_keys,
                    provided_types,
                    consumed_keys,
                    consumed_types,
                    is_parameter,
                )
        }
        (TypeInfo::Array(provided_inner), TypeInfo::Array(consumed_inner)) => {
            !strict || *consumed_inner == VarKind::None || provided_inner == consumed_inner
        }
        _ => true,
    }
}

fn match_element_types(provided: &[TypeInfo], consumed: &[TypeInfo], is_parameter: bool) -> bool {
    match (provided.is_empty(), consumed.is_empty()) {
        (true, true) => true,
        // An empty consumer list stands for any element.
        (_, true) => true,
        // An empty provided list stands for [Any]; the consumer must allow Any.
        (true, false) => consumed.iter().any(|c| matches!(c, TypeInfo::Any)),
        (false, false) => provided.iter().all(|p| {
            consumed
                .iter()
                .any(|c| matches!(c, TypeInfo::Any) || match_types(p, c, is_parameter, true))
        }),
    }
}

fn match_tables(
    provided_keys: &[String],
    provided_types: &[TypeInfo],
    consumed_keys: &[String],
    consumed_types: &[TypeInfo],
    is_parameter: bool,
) -> bool {
    if consumed_keys.is_empty() {
        if consumed_types.is_empty() {
            return true;
        }
        if provided_types.is_empty() {
            return consumed_types.iter().any(|c| matches!(c, TypeInfo::Any));
        }
        return provided_types.iter().all(|p| {
            consumed_types
                .iter()
                .any(|c| match_types(p, c, is_parameter, true))
        });
    }

    let open_ended = consumed_keys.iter().any(|k| k.is_empty());
    for (index, key) in provided_keys.iter().enumerate() {
        let provided_type = provided_types.get(index).unwrap_or(&TypeInfo::Any);
        match consumed_keys.iter().position(|k| k == key) {
            Some(at) => {
                let consumed_type = consumed_types.get(at).unwrap_or(&TypeInfo::Any);
                if !match_types(provided_type, consumed_type, is_parameter, true) {
                    return false;
                }
            }
            None if open_ended => {}
            None => return false,
        }
    }
    true
}

/// Describe a concrete value, recursing into sequences and tables.
pub fn derive_type_info(var: &Var) -> TypeInfo {
    match var.kind {
        VarKind::Enum => {
            let e = var.as_enum();
            TypeInfo::Enum {
                vendor_id: e.vendor_id,
                type_id: e.type_id,
            }
        }
        VarKind::Object => {
            let o = var.as_object();
            TypeInfo::Object {
                vendor_id: o.vendor_id,
                type_id: o.type_id,
            }
        }
        VarKind::Seq => {
            let mut types: Types = Vec::new();
            for item in var.as_seq() {
                let element = derive_type_info(item);
                if !types.contains(&element) {
                    types.push(element);
                }
            }
            TypeInfo::Seq(types)
        }
        VarKind::Table => {
            let mut keys = Vec::new();
            let mut types = Vec::new();
            for (key, value) in var.as_table() {
                keys.push(key.clone());
                types.push(derive_type_info(value));
            }
            TypeInfo::Table { keys, types }
        }
        VarKind::Array => TypeInfo::Array(var.inner_kind),
        kind => TypeInfo::from_kind(kind),
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, types: &[TypeInfo]) -> fmt::Result {
            for (i, t) in types.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", t)?;
            }
            Ok(())
        }

        match self {
            TypeInfo::Seq(types) => {
                f.write_str("[")?;
                list(f, types)?;
                f.write_str("]")
            }
            TypeInfo::ContextVar(types) => {
                f.write_str("&[")?;
                list(f, types)?;
                f.write_str("]")
            }
            TypeInfo::Table { keys, types } => {
                f.write_str("{")?;
                if keys.is_empty() {
                    list(f, types)?;
                } else {
                    for (i, key) in keys.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}: {}", key, types.get(i).unwrap_or(&TypeInfo::Any))?;
                    }
                }
                f.write_str("}")
            }
            TypeInfo::Object { vendor_id, type_id } => {
                write!(f, "Object({}:{})", vendor_id, type_id)
            }
            TypeInfo::Enum { vendor_id, type_id } => write!(f, "Enum({}:{})", vendor_id, type_id),
            TypeInfo::Array(inner) => write!(f, "Array<{}>", inner),
            other => f.write_str(other.kind().name()),
        }
    }
}

/// Render a list of types the way error messages show them.
pub fn types_to_string(types: &[TypeInfo]) -> String {
    let parts: Vec<String> = types.iter().map(|t| t.to_string()).collect();
    format!("[{}]", parts.join(" "))
}

/// A named variable a shard exposes or requires.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedTypeInfo {
    pub name: String,
    pub help: String,
    pub exposed_type: TypeInfo,
    pub is_mutable: bool,
}

impl ExposedTypeInfo {
    pub fn new(name: impl Into<String>, exposed_type: TypeInfo) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            exposed_type,
            is_mutable: true,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }
}

pub type ExposedTypes = Vec<ExposedTypeInfo>;

/// One entry of a shard's parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub help: String,
    pub types: Types,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, help: impl Into<String>, types: Types) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            types,
        }
    }
}

pub type Parameters = Vec<ParameterInfo>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ops::destroy_var;
    use crate::types::table::table_set;

    #[test]
    fn any_consumer_accepts_everything() {
        assert!(match_types(&TypeInfo::Int, &TypeInfo::Any, true, true));
        assert!(match_types(&TypeInfo::seq_of(TypeInfo::String), &TypeInfo::Any, false, true));
    }

    #[test]
    fn none_consumer_only_matches_outside_parameters() {
        assert!(match_types(&TypeInfo::Int, &TypeInfo::None, false, true));
        assert!(!match_types(&TypeInfo::Int, &TypeInfo::None, true, true));
    }

    #[test]
    fn basic_kinds_must_be_equal() {
        assert!(match_types(&TypeInfo::Int, &TypeInfo::Int, false, true));
        assert!(!match_types(&TypeInfo::Int, &TypeInfo::Float, false, true));
    }

    #[test]
    fn object_ids_must_match() {
        let a = TypeInfo::Object { vendor_id: 1, type_id: 2 };
        let b = TypeInfo::Object { vendor_id: 1, type_id: 3 };
        assert!(match_types(&a, &a.clone(), false, true));
        assert!(!match_types(&a, &b, false, true));
    }

    #[test]
    fn zero_enum_consumer_accepts_any_enum() {
        let any_enum = TypeInfo::Enum { vendor_id: 0, type_id: 0 };
        let concrete = TypeInfo::Enum { vendor_id: 7, type_id: 9 };
        assert!(match_types(&concrete, &any_enum, false, true));
        assert!(!match_types(&any_enum, &concrete, false, true));
    }

    #[test]
    fn strict_seq_checks_element_types() {
        let ints = TypeInfo::seq_of(TypeInfo::Int);
        let floats = TypeInfo::seq_of(TypeInfo::Float);
        let either = TypeInfo::Seq(vec![TypeInfo::Int, TypeInfo::Float]);
        assert!(match_types(&ints, &either, false, true));
        assert!(!match_types(&ints, &floats, false, true));
        assert!(match_types(&ints, &floats, false, false));
        assert!(match_types(&ints, &TypeInfo::Seq(vec![]), false, true));
    }

    #[test]
    fn table_types_must_each_find_a_consumer() {
        let provided = TypeInfo::table_of(vec![TypeInfo::Int, TypeInfo::String]);
        let narrow = TypeInfo::table_of(vec![TypeInfo::Int]);
        let wide = TypeInfo::table_of(vec![TypeInfo::String, TypeInfo::Int]);
        assert!(!match_types(&provided, &narrow, false, true));
        assert!(match_types(&provided, &wide, false, true));
    }

    #[test]
    fn keyed_tables_reject_undeclared_keys() {
        let provided = TypeInfo::Table {
            keys: vec!["x".into(), "y".into()],
            types: vec![TypeInfo::Int, TypeInfo::Int],
        };
        let only_x = TypeInfo::Table {
            keys: vec!["x".into()],
            types: vec![TypeInfo::Int],
        };
        let open = TypeInfo::Table {
            keys: vec!["x".into(), "".into()],
            types: vec![TypeInfo::Int, TypeInfo::Any],
        };
        assert!(!match_types(&provided, &only_x, false, true));
        assert!(match_types(&provided, &open, false, true));
    }

    #[test]
    fn derive_type_info_recurses_into_containers() {
        let items = [Var::from(1i64), Var::from(2i64), Var::from("x")];
        let seq = unsafe { Var::seq_view(&items) };
        assert_eq!(
            derive_type_info(&seq),
            TypeInfo::Seq(vec![TypeInfo::Int, TypeInfo::String])
        );

        let mut table = Var::new_table();
        table_set(&mut table, "a", &Var::from(1.0));
        assert_eq!(
            derive_type_info(&table),
            TypeInfo::Table {
                keys: vec!["a".into()],
                types: vec![TypeInfo::Float]
            }
        );
        destroy_var(&mut table);
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(TypeInfo::seq_of(TypeInfo::Int).to_string(), "[Int]");
        assert_eq!(types_to_string(&[TypeInfo::Int, TypeInfo::Float]), "[Int Float]");
    }
}
