// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The C interface table.
//!
//! Foreign code receives a [`CoreInterface`] and reaches the runtime only
//! through its slots. The table is tied to one [`Core`]: shards created or
//! registered through it use that core's registry.
//!
//! Handles crossing the interface:
//! * shards are `Box<Box<dyn Shard>>` turned into raw pointers; the same
//!   pointer is what `ShardRef` values carry,
//! * wires are boxed [`WireRef`](crate::engine::WireRef)s,
//! * meshes are boxed [`Mesh`](crate::engine::Mesh)es,
//! * variables are counted slot pointers released with `release_variable`.

mod slots;
pub mod types;

use crate::backends::foreign::ForeignConstructor;
use crate::core::Core;
use crate::types::{CArray, Var};
use std::ffi::{c_char, c_void};
use types::{ContextC, ErrorC, TypeInfoC};

pub(crate) use slots::{from_shard_handle, into_shard_handle};

/// Version of the slot layout below.
pub const CURRENT_ABI: u32 = 0x20200102;

/// Opaque shard handle, see the module docs.
#[repr(C)]
pub struct ShardHandle {
    _private: [u8; 0],
}

#[repr(C)]
pub struct WireHandle {
    _private: [u8; 0],
}

#[repr(C)]
pub struct MeshHandle {
    _private: [u8; 0],
}

#[repr(C)]
pub struct CoreInterface {
    pub abi_version: u32,
    pub core: *const Core,

    pub alloc: extern "C" fn(size: u32) -> *mut c_void,
    pub free: extern "C" fn(ptr: *mut c_void),
    /// Levels 0 (trace) to 4 (error).
    pub log: extern "C" fn(level: i32, message: *const c_char),

    pub clone_var: extern "C" fn(dst: *mut Var, src: *const Var),
    pub destroy_var: extern "C" fn(var: *mut Var),
    pub is_equal_var: extern "C" fn(a: *const Var, b: *const Var) -> bool,
    pub is_equal_type: extern "C" fn(a: *const TypeInfoC, b: *const TypeInfoC) -> bool,

    pub seq_push: extern "C" fn(seq: *mut CArray<Var>, value: *const Var),
    pub seq_insert: extern "C" fn(seq: *mut CArray<Var>, index: u32, value: *const Var),
    /// The popped value is owned by the caller.
    pub seq_pop: extern "C" fn(seq: *mut CArray<Var>) -> Var,
    pub seq_resize: extern "C" fn(seq: *mut CArray<Var>, len: u32),
    pub seq_fast_delete: extern "C" fn(seq: *mut CArray<Var>, index: u32),
    pub seq_slow_delete: extern "C" fn(seq: *mut CArray<Var>, index: u32),
    pub seq_free: extern "C" fn(seq: *mut CArray<Var>),

    pub types_push: extern "C" fn(types: *mut CArray<TypeInfoC>, value: *const TypeInfoC),
    pub types_insert:
        extern "C" fn(types: *mut CArray<TypeInfoC>, index: u32, value: *const TypeInfoC),
    pub types_pop: extern "C" fn(types: *mut CArray<TypeInfoC>) -> TypeInfoC,
    pub types_resize: extern "C" fn(types: *mut CArray<TypeInfoC>, len: u32),
    pub types_fast_delete: extern "C" fn(types: *mut CArray<TypeInfoC>, index: u32),
    pub types_slow_delete: extern "C" fn(types: *mut CArray<TypeInfoC>, index: u32),
    pub types_free: extern "C" fn(types: *mut CArray<TypeInfoC>),

    pub table_new: extern "C" fn() -> Var,
    pub table_set: extern "C" fn(table: *mut Var, key: *const c_char, value: *const Var),
    /// Null when the key is missing.
    pub table_get: extern "C" fn(table: *mut Var, key: *const c_char) -> *mut Var,
    pub table_remove: extern "C" fn(table: *mut Var, key: *const c_char) -> bool,
    pub table_len: extern "C" fn(table: *const Var) -> u64,

    /// Null when the name is unknown.
    pub create_shard:
        extern "C" fn(core: *const CoreInterface, name: *const c_char) -> *mut ShardHandle,
    pub register_shard: extern "C" fn(
        core: *const CoreInterface,
        name: *const c_char,
        constructor: ForeignConstructor,
    ) -> ErrorC,
    /// Destroy a shard that was never added to a wire.
    pub release_shard: extern "C" fn(shard: *mut ShardHandle),
    /// Range- and type-check a parameter, then set it.
    pub validate_set_param:
        extern "C" fn(shard: *mut ShardHandle, index: i32, value: *const Var) -> ErrorC,

    pub create_wire: extern "C" fn(name: *const c_char) -> *mut WireHandle,
    /// Takes ownership of the shard, also on failure.
    pub add_shard: extern "C" fn(wire: *mut WireHandle, shard: *mut ShardHandle) -> ErrorC,
    /// Hands the shard back to the caller; null when out of range.
    pub remove_shard: extern "C" fn(wire: *mut WireHandle, index: u32) -> *mut ShardHandle,
    pub set_wire_looped: extern "C" fn(wire: *mut WireHandle, looped: bool),
    pub set_wire_unsafe: extern "C" fn(wire: *mut WireHandle, unsafe_loop: bool),
    /// Stop the wire and copy its last output into `output` when non-null.
    pub stop_wire: extern "C" fn(wire: *mut WireHandle, output: *mut Var),
    /// Drop this handle. The wire is destroyed with its last handle.
    pub destroy_wire: extern "C" fn(wire: *mut WireHandle),

    pub create_mesh: extern "C" fn() -> *mut MeshHandle,
    pub schedule: extern "C" fn(mesh: *mut MeshHandle, wire: *mut WireHandle) -> ErrorC,
    pub unschedule: extern "C" fn(mesh: *mut MeshHandle, wire: *mut WireHandle) -> ErrorC,
    /// False when a wire failed during this tick.
    pub tick: extern "C" fn(mesh: *mut MeshHandle) -> bool,
    pub is_empty: extern "C" fn(mesh: *mut MeshHandle) -> bool,
    pub destroy_mesh: extern "C" fn(mesh: *mut MeshHandle),

    pub reference_variable: extern "C" fn(ctx: *mut ContextC, name: *const c_char) -> *mut Var,
    pub reference_wire_variable:
        extern "C" fn(wire: *mut WireHandle, name: *const c_char) -> *mut Var,
    pub release_variable: extern "C" fn(variable: *mut Var),
    pub alloc_external_variable:
        extern "C" fn(wire: *mut WireHandle, name: *const c_char) -> *mut Var,
    pub free_external_variable: extern "C" fn(wire: *mut WireHandle, name: *const c_char) -> ErrorC,

    pub suspend: extern "C" fn(ctx: *mut ContextC, seconds: f64),
    pub is_resuming: extern "C" fn(ctx: *mut ContextC) -> bool,
    pub abort_wire: extern "C" fn(ctx: *mut ContextC, message: *const c_char),
}

// The table is immutable and `Core` is Sync.
unsafe impl Send for CoreInterface {}
unsafe impl Sync for CoreInterface {}

impl CoreInterface {
    pub(crate) fn new(core: *const Core) -> Self {
        slots::table(core)
    }
}

/// Obtain the interface table of `core`, or null when `abi_version` does
/// not match [`CURRENT_ABI`].
///
/// # Safety
/// `core` must be null or point at a live `Core` (for example from
/// `Arc::as_ptr`). The table lives as long as that core.
#[no_mangle]
pub unsafe extern "C" fn shardmesh_interface(abi_version: u32, core: *const Core) -> *const CoreInterface {
    match core.as_ref() {
        Some(core) => match core.interface(abi_version) {
            Ok(table) => table as *const CoreInterface,
            Err(_) => std::ptr::null(),
        },
        None => std::ptr::null(),
    }
}
