// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! C-layout mirrors of the compose-time descriptors.
//!
//! Values cross the interface as plain `Var`s; only type information needs
//! a separate representation. Mirrors built here borrow from a Rust-side
//! owner (`TypesMirror`, `ExposedMirror`) that must outlive the call they
//! are passed to.

use crate::types::{
    CArray, ExposedTypeInfo, ExposedTypes, ParameterInfo, Parameters, TypeInfo, Types, VarKind,
};
use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result of a fallible slot. `code == 0` means success.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ErrorC {
    pub code: i32,
    /// NUL-terminated, owned by the callee, valid until its next call.
    pub message: *const c_char,
}

impl ErrorC {
    pub const OK: ErrorC = ErrorC {
        code: 0,
        message: ptr::null(),
    };

    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Read the message, if any.
    ///
    /// # Safety
    /// `message` must be null or a valid C string.
    pub unsafe fn message(&self) -> String {
        read_c_str(self.message)
    }
}

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

/// Build an error whose message stays valid until the next error raised on
/// this thread.
pub fn error_c(code: i32, message: &str) -> ErrorC {
    let text = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|last| {
        *last.borrow_mut() = text;
        ErrorC {
            code: if code == 0 { -1 } else { code },
            message: last.borrow().as_ptr(),
        }
    })
}

/// # Safety
/// `text` must be null or a valid NUL-terminated string.
pub unsafe fn read_c_str(text: *const c_char) -> String {
    if text.is_null() {
        String::new()
    } else {
        CStr::from_ptr(text).to_string_lossy().into_owned()
    }
}

/// Opaque handle for the activation context handed to foreign shards.
#[repr(C)]
pub struct ContextC {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TypeInfoC {
    /// A `VarKind` discriminant.
    pub basic_type: u8,
    /// Element kind of `Array` types.
    pub inner_kind: u8,
    pub vendor_id: i32,
    pub type_id: i32,
    /// Nested types of Seq, ContextVar and Table descriptors.
    pub types: CArray<TypeInfoC>,
    /// Table keys, parallel to `types`.
    pub keys: CArray<*const c_char>,
}

impl TypeInfoC {
    pub fn basic(kind: VarKind) -> Self {
        Self {
            basic_type: kind as u8,
            inner_kind: VarKind::None as u8,
            vendor_id: 0,
            type_id: 0,
            types: CArray::empty(),
            keys: CArray::empty(),
        }
    }

    /// Convert back into the Rust descriptor.
    ///
    /// # Safety
    /// Nested arrays and keys must be valid for the duration of the call.
    pub unsafe fn to_type_info(&self) -> TypeInfo {
        let kind = match VarKind::from_u8(self.basic_type) {
            Some(kind) => kind,
            None => panic!("invalid type kind {} received over the C interface", self.basic_type),
        };
        match kind {
            VarKind::Enum => TypeInfo::Enum {
                vendor_id: self.vendor_id,
                type_id: self.type_id,
            },
            VarKind::Object => TypeInfo::Object {
                vendor_id: self.vendor_id,
                type_id: self.type_id,
            },
            VarKind::Array => TypeInfo::Array(VarKind::from_u8(self.inner_kind).unwrap_or_default()),
            VarKind::Seq => TypeInfo::Seq(types_from_c(&self.types)),
            VarKind::ContextVar => TypeInfo::ContextVar(types_from_c(&self.types)),
            VarKind::Table => TypeInfo::Table {
                keys: self.keys.as_slice().iter().map(|k| read_c_str(*k)).collect(),
                types: types_from_c(&self.types),
            },
            other => TypeInfo::from_kind(other),
        }
    }
}

/// # Safety
/// See [`TypeInfoC::to_type_info`].
pub unsafe fn types_from_c(types: &CArray<TypeInfoC>) -> Types {
    types.as_slice().iter().map(|t| t.to_type_info()).collect()
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExposedTypeInfoC {
    pub name: *const c_char,
    pub help: *const c_char,
    pub exposed_type: TypeInfoC,
    pub is_mutable: bool,
}

/// # Safety
/// Every name, help text and nested type must be valid for the call.
pub unsafe fn exposed_from_c(items: &CArray<ExposedTypeInfoC>) -> ExposedTypes {
    items
        .as_slice()
        .iter()
        .map(|item| {
            let mut info = ExposedTypeInfo::new(read_c_str(item.name), item.exposed_type.to_type_info())
                .with_help(read_c_str(item.help));
            info.is_mutable = item.is_mutable;
            info
        })
        .collect()
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ParameterInfoC {
    pub name: *const c_char,
    pub help: *const c_char,
    pub types: CArray<TypeInfoC>,
}

/// # Safety
/// As for [`exposed_from_c`].
pub unsafe fn parameters_from_c(items: &CArray<ParameterInfoC>) -> Parameters {
    items
        .as_slice()
        .iter()
        .map(|item| {
            ParameterInfo::new(
                read_c_str(item.name),
                read_c_str(item.help),
                types_from_c(&item.types),
            )
        })
        .collect()
}

/// What a foreign shard sees while composing.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InstanceDataC {
    pub wire_name: *const c_char,
    pub input_type: TypeInfoC,
    pub shared: CArray<ExposedTypeInfoC>,
    pub shard_index: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ComposeResultC {
    pub output_type: TypeInfoC,
    pub error: ErrorC,
}

fn c_string(text: &str) -> CString {
    CString::new(text.replace('\0', " ")).unwrap_or_default()
}

/// Owner of a C view over a list of Rust type descriptors.
#[derive(Default)]
pub struct TypesMirror {
    nodes: Vec<TypeInfoC>,
    children: Vec<TypesMirror>,
    keys: Vec<CString>,
    key_lists: Vec<Vec<*const c_char>>,
}

impl TypesMirror {
    pub fn new(types: &[TypeInfo]) -> Self {
        let mut mirror = TypesMirror::default();
        let nodes: Vec<TypeInfoC> = types.iter().map(|t| mirror.node_for(t)).collect();
        mirror.nodes = nodes;
        mirror
    }

    fn node_for(&mut self, info: &TypeInfo) -> TypeInfoC {
        let mut node = TypeInfoC::basic(info.kind());
        match info {
            TypeInfo::Enum { vendor_id, type_id } | TypeInfo::Object { vendor_id, type_id } => {
                node.vendor_id = *vendor_id;
                node.type_id = *type_id;
            }
            TypeInfo::Array(inner) => node.inner_kind = *inner as u8,
            TypeInfo::Seq(types) | TypeInfo::ContextVar(types) => {
                node.types = self.child(types);
            }
            TypeInfo::Table { keys, types } => {
                node.types = self.child(types);
                let pointers: Vec<*const c_char> = keys
                    .iter()
                    .map(|key| {
                        let owned = c_string(key);
                        let pointer = owned.as_ptr();
                        self.keys.push(owned);
                        pointer
                    })
                    .collect();
                node.keys = CArray::view(&pointers);
                self.key_lists.push(pointers);
            }
            _ => {}
        }
        node
    }

    fn child(&mut self, types: &[TypeInfo]) -> CArray<TypeInfoC> {
        let child = TypesMirror::new(types);
        let view = child.as_c();
        // Moving the child keeps its heap buffers where the view points.
        self.children.push(child);
        view
    }

    pub fn as_c(&self) -> CArray<TypeInfoC> {
        CArray::view(&self.nodes)
    }

    pub fn first(&self) -> TypeInfoC {
        self.nodes
            .first()
            .copied()
            .unwrap_or_else(|| TypeInfoC::basic(VarKind::None))
    }
}

/// Owner of a C view over exposed variables.
pub struct ExposedMirror {
    items: Vec<ExposedTypeInfoC>,
    _names: Vec<CString>,
    _types: Vec<TypesMirror>,
}

impl ExposedMirror {
    pub fn new<'a>(exposed: impl IntoIterator<Item = &'a ExposedTypeInfo>) -> Self {
        let mut names = Vec::new();
        let mut types = Vec::new();
        let mut items = Vec::new();
        for info in exposed {
            let name = c_string(&info.name);
            let help = c_string(&info.help);
            let mirror = TypesMirror::new(std::slice::from_ref(&info.exposed_type));
            items.push(ExposedTypeInfoC {
                name: name.as_ptr(),
                help: help.as_ptr(),
                exposed_type: mirror.first(),
                is_mutable: info.is_mutable,
            });
            names.push(name);
            names.push(help);
            types.push(mirror);
        }
        Self {
            items,
            _names: names,
            _types: types,
        }
    }

    pub fn as_c(&self) -> CArray<ExposedTypeInfoC> {
        CArray::view(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_descriptors_survive_the_mirror() {
        let types = vec![
            TypeInfo::seq_of(TypeInfo::Int),
            TypeInfo::Table {
                keys: vec!["a".to_string(), "b".to_string()],
                types: vec![TypeInfo::Float, TypeInfo::context_var_of(vec![TypeInfo::String])],
            },
            TypeInfo::Object {
                vendor_id: 7,
                type_id: 9,
            },
            TypeInfo::Array(VarKind::Float2),
        ];
        let mirror = TypesMirror::new(&types);
        let back = unsafe { types_from_c(&mirror.as_c()) };
        assert_eq!(back, types);
    }

    #[test]
    fn exposed_mirror_keeps_names_and_types() {
        let exposed = vec![ExposedTypeInfo::new("x", TypeInfo::Int).with_help("counter")];
        let mirror = ExposedMirror::new(&exposed);
        let back = unsafe { exposed_from_c(&mirror.as_c()) };
        assert_eq!(back, exposed);
    }

    #[test]
    fn error_messages_are_readable_until_replaced() {
        let error = error_c(5, "bad things");
        assert_eq!(error.code, 5);
        assert_eq!(unsafe { error.message() }, "bad things");
        assert!(ErrorC::OK.is_ok());
    }
}
