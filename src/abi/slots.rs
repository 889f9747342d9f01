// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `extern "C"` implementations behind every [`CoreInterface`] slot.
//!
//! Null handles are ignored (or answered with null / an error); any other
//! invalid pointer is undefined behavior, as for any C API.
//!
//! # Calls from inside a running shard
//!
//! A wire is locked for the whole of its tick. From inside `activate`,
//! `warmup` or `cleanup` a shard may use the value, sequence, table, type,
//! registry and context slots (`reference_variable`, `suspend`,
//! `is_resuming`, `abort_wire`). The wire-handle slots behave as follows
//! when given the wire that is running the caller:
//!
//! * `stop_wire` is deferred: the wire stops when its current quantum
//!   returns, and `output` is set to None
//! * `add_shard`, `remove_shard`, `set_wire_looped`, `set_wire_unsafe`,
//!   `reference_wire_variable`, `alloc_external_variable` and
//!   `free_external_variable` are refused (null, no-op or an error)
//!
//! Mesh-handle slots (`schedule`, `unschedule`, `tick`, `destroy_mesh`) must
//! not be called on the mesh that is ticking the caller.

use super::types::{error_c, read_c_str, ContextC, ErrorC, TypeInfoC};
use super::{CoreInterface, MeshHandle, ShardHandle, WireHandle, CURRENT_ABI};
use crate::backends::foreign::ForeignConstructor;
use crate::core::Core;
use crate::engine::wire::{is_running_here, request_stop};
use crate::engine::{
    lock_wire, release_variable, Context, Mesh, MeshConfig, VariableRef, Wire, WireRef,
};
use crate::errors::WireError;
use crate::observability::messages::abi::{ForeignLevel, ForeignLogLine, WireSlotBusy};
use crate::observability::messages::StructuredLog;
use crate::traits::{set_param_checked, Shard};
use crate::types::table::{table_get_mut, table_len as map_len, table_remove as map_remove, table_set as map_set};
use crate::types::{
    alloc, clone_var, destroy_var, is_equal_var as vars_equal, seq_free as free_seq,
    seq_insert as insert_seq, seq_push as push_seq, seq_resize as resize_seq, CArray, TypeInfo,
    Var,
};
use std::ffi::{c_char, c_void};
use std::ptr;

pub(super) fn table(core: *const Core) -> CoreInterface {
    CoreInterface {
        abi_version: CURRENT_ABI,
        core,
        alloc: core_alloc,
        free: core_free,
        log,
        clone_var: slot_clone_var,
        destroy_var: slot_destroy_var,
        is_equal_var,
        is_equal_type,
        seq_push,
        seq_insert,
        seq_pop,
        seq_resize,
        seq_fast_delete,
        seq_slow_delete,
        seq_free,
        types_push,
        types_insert,
        types_pop,
        types_resize,
        types_fast_delete,
        types_slow_delete,
        types_free,
        table_new,
        table_set,
        table_get,
        table_remove,
        table_len,
        create_shard,
        register_shard,
        release_shard,
        validate_set_param,
        create_wire,
        add_shard,
        remove_shard,
        set_wire_looped,
        set_wire_unsafe,
        stop_wire,
        destroy_wire,
        create_mesh,
        schedule,
        unschedule,
        tick,
        is_empty,
        destroy_mesh,
        reference_variable,
        reference_wire_variable,
        release_variable: slot_release_variable,
        alloc_external_variable,
        free_external_variable,
        suspend,
        is_resuming,
        abort_wire,
    }
}

unsafe fn context<'a>(ctx: *mut ContextC) -> Option<&'a mut Context<'a>> {
    ctx.cast::<Context<'a>>().as_mut()
}

unsafe fn wire<'a>(handle: *mut WireHandle) -> Option<&'a WireRef> {
    handle.cast::<WireRef>().as_ref()
}

unsafe fn mesh<'a>(handle: *mut MeshHandle) -> Option<&'a mut Mesh> {
    handle.cast::<Mesh>().as_mut()
}

unsafe fn shard<'a>(handle: *mut ShardHandle) -> Option<&'a mut Box<dyn Shard>> {
    handle.cast::<Box<dyn Shard>>().as_mut()
}

pub(crate) fn into_shard_handle(shard: Box<dyn Shard>) -> *mut ShardHandle {
    Box::into_raw(Box::new(shard)).cast()
}

/// # Safety
/// `handle` must come from [`into_shard_handle`] and not have been reclaimed.
pub(crate) unsafe fn from_shard_handle(handle: *mut ShardHandle) -> Option<Box<dyn Shard>> {
    if handle.is_null() {
        None
    } else {
        Some(*Box::from_raw(handle.cast::<Box<dyn Shard>>()))
    }
}

fn result_c<E: std::fmt::Display>(result: Result<(), E>, code: i32) -> ErrorC {
    match result {
        Ok(()) => ErrorC::OK,
        Err(error) => error_c(code, &error.to_string()),
    }
}

const ERR_NULL: i32 = 1;
const ERR_PARAM: i32 = 2;
const ERR_WIRE: i32 = 3;
const ERR_REGISTRY: i32 = 4;

fn null_handle(what: &str) -> ErrorC {
    error_c(ERR_NULL, &format!("null {} handle", what))
}

/// True (and logged) when `wire` is ticking on this thread, so `slot` must
/// not lock it.
fn refuse_running(wire: &WireRef, slot: &str) -> bool {
    if !is_running_here(wire) {
        return false;
    }
    WireSlotBusy {
        slot,
        deferred: false,
    }
    .log();
    true
}

fn busy(slot: &str) -> ErrorC {
    error_c(
        ERR_WIRE,
        &WireError::Busy {
            operation: slot.to_string(),
        }
        .to_string(),
    )
}

extern "C" fn core_alloc(size: u32) -> *mut c_void {
    alloc::allocate(size as usize).cast()
}

extern "C" fn core_free(ptr: *mut c_void) {
    // SAFETY: the slot contract requires a pointer from `alloc`.
    unsafe { alloc::release(ptr.cast()) }
}

extern "C" fn log(level: i32, message: *const c_char) {
    let message = unsafe { read_c_str(message) };
    ForeignLogLine {
        level: ForeignLevel::from_raw(level),
        message: &message,
    }
    .log();
}

extern "C" fn slot_clone_var(dst: *mut Var, src: *const Var) {
    if let (Some(dst), Some(src)) = unsafe { (dst.as_mut(), src.as_ref()) } {
        clone_var(dst, src);
    }
}

extern "C" fn slot_destroy_var(var: *mut Var) {
    if let Some(var) = unsafe { var.as_mut() } {
        destroy_var(var);
    }
}

extern "C" fn is_equal_var(a: *const Var, b: *const Var) -> bool {
    match unsafe { (a.as_ref(), b.as_ref()) } {
        (Some(a), Some(b)) => vars_equal(a, b),
        _ => false,
    }
}

extern "C" fn is_equal_type(a: *const TypeInfoC, b: *const TypeInfoC) -> bool {
    match unsafe { (a.as_ref(), b.as_ref()) } {
        (Some(a), Some(b)) => unsafe { a.to_type_info() == b.to_type_info() },
        _ => false,
    }
}

extern "C" fn seq_push(seq: *mut CArray<Var>, value: *const Var) {
    if let (Some(seq), Some(value)) = unsafe { (seq.as_mut(), value.as_ref()) } {
        push_seq(seq, value);
    }
}

extern "C" fn seq_insert(seq: *mut CArray<Var>, index: u32, value: *const Var) {
    if let (Some(seq), Some(value)) = unsafe { (seq.as_mut(), value.as_ref()) } {
        if index <= seq.len {
            insert_seq(seq, index as usize, value);
        }
    }
}

extern "C" fn seq_pop(seq: *mut CArray<Var>) -> Var {
    unsafe { seq.as_mut() }
        .and_then(|seq| seq.pop())
        .unwrap_or(Var::NONE)
}

extern "C" fn seq_resize(seq: *mut CArray<Var>, len: u32) {
    if let Some(seq) = unsafe { seq.as_mut() } {
        resize_seq(seq, len);
    }
}

extern "C" fn seq_fast_delete(seq: *mut CArray<Var>, index: u32) {
    if let Some(seq) = unsafe { seq.as_mut() } {
        if index < seq.len {
            destroy_var(&mut seq.fast_delete(index as usize));
        }
    }
}

extern "C" fn seq_slow_delete(seq: *mut CArray<Var>, index: u32) {
    if let Some(seq) = unsafe { seq.as_mut() } {
        if index < seq.len {
            destroy_var(&mut seq.slow_delete(index as usize));
        }
    }
}

extern "C" fn seq_free(seq: *mut CArray<Var>) {
    if let Some(seq) = unsafe { seq.as_mut() } {
        free_seq(seq);
    }
}

extern "C" fn types_push(types: *mut CArray<TypeInfoC>, value: *const TypeInfoC) {
    if let (Some(types), Some(value)) = unsafe { (types.as_mut(), value.as_ref()) } {
        types.push(*value);
    }
}

extern "C" fn types_insert(types: *mut CArray<TypeInfoC>, index: u32, value: *const TypeInfoC) {
    if let (Some(types), Some(value)) = unsafe { (types.as_mut(), value.as_ref()) } {
        if index <= types.len {
            types.insert(index as usize, *value);
        }
    }
}

extern "C" fn types_pop(types: *mut CArray<TypeInfoC>) -> TypeInfoC {
    unsafe { types.as_mut() }
        .and_then(|types| types.pop())
        .unwrap_or_else(|| TypeInfoC::basic(crate::types::VarKind::None))
}

extern "C" fn types_resize(types: *mut CArray<TypeInfoC>, len: u32) {
    if let Some(types) = unsafe { types.as_mut() } {
        types.resize(len);
    }
}

extern "C" fn types_fast_delete(types: *mut CArray<TypeInfoC>, index: u32) {
    if let Some(types) = unsafe { types.as_mut() } {
        if index < types.len {
            types.fast_delete(index as usize);
        }
    }
}

extern "C" fn types_slow_delete(types: *mut CArray<TypeInfoC>, index: u32) {
    if let Some(types) = unsafe { types.as_mut() } {
        if index < types.len {
            types.slow_delete(index as usize);
        }
    }
}

extern "C" fn types_free(types: *mut CArray<TypeInfoC>) {
    if let Some(types) = unsafe { types.as_mut() } {
        types.free();
    }
}

extern "C" fn table_new() -> Var {
    Var::new_table()
}

extern "C" fn table_set(table: *mut Var, key: *const c_char, value: *const Var) {
    if let (Some(table), Some(value)) = unsafe { (table.as_mut(), value.as_ref()) } {
        let key = unsafe { read_c_str(key) };
        map_set(table, &key, value);
    }
}

extern "C" fn table_get(table: *mut Var, key: *const c_char) -> *mut Var {
    let Some(table) = (unsafe { table.as_mut() }) else {
        return ptr::null_mut();
    };
    let key = unsafe { read_c_str(key) };
    match table_get_mut(table, &key) {
        Some(value) => value as *mut Var,
        None => ptr::null_mut(),
    }
}

extern "C" fn table_remove(table: *mut Var, key: *const c_char) -> bool {
    match unsafe { table.as_mut() } {
        Some(table) => map_remove(table, &unsafe { read_c_str(key) }),
        None => false,
    }
}

extern "C" fn table_len(table: *const Var) -> u64 {
    match unsafe { table.as_ref() } {
        Some(table) => map_len(table) as u64,
        None => 0,
    }
}

extern "C" fn create_shard(core: *const CoreInterface, name: *const c_char) -> *mut ShardHandle {
    let Some(core) = (unsafe { core.as_ref().and_then(|iface| iface.core.as_ref()) }) else {
        return ptr::null_mut();
    };
    match core.create_shard(&unsafe { read_c_str(name) }) {
        Ok(shard) => into_shard_handle(shard),
        Err(_) => ptr::null_mut(),
    }
}

extern "C" fn register_shard(
    core: *const CoreInterface,
    name: *const c_char,
    constructor: ForeignConstructor,
) -> ErrorC {
    let Some(core) = (unsafe { core.as_ref().and_then(|iface| iface.core.as_ref()) }) else {
        return null_handle("core");
    };
    let name = unsafe { read_c_str(name) };
    result_c(core.register_foreign_shard(&name, constructor), ERR_REGISTRY)
}

extern "C" fn release_shard(handle: *mut ShardHandle) {
    if let Some(mut shard) = unsafe { from_shard_handle(handle) } {
        shard.destroy();
    }
}

extern "C" fn validate_set_param(handle: *mut ShardHandle, index: i32, value: *const Var) -> ErrorC {
    let (Some(shard), Some(value)) = (unsafe { shard(handle) }, unsafe { value.as_ref() }) else {
        return null_handle("shard");
    };
    if index < 0 {
        return error_c(ERR_PARAM, &format!("negative parameter index {}", index));
    }
    result_c(set_param_checked(shard.as_mut(), index as usize, value), ERR_PARAM)
}

extern "C" fn create_wire(name: *const c_char) -> *mut WireHandle {
    let name = unsafe { read_c_str(name) };
    Box::into_raw(Box::new(Wire::new(name).into_ref())).cast()
}

extern "C" fn add_shard(handle: *mut WireHandle, shard: *mut ShardHandle) -> ErrorC {
    let Some(shard) = (unsafe { from_shard_handle(shard) }) else {
        return null_handle("shard");
    };
    let mut shard = shard;
    match unsafe { wire(handle) } {
        Some(wire) if refuse_running(wire, "add_shard") => {
            shard.destroy();
            busy("add_shard")
        }
        Some(wire) => result_c(lock_wire(wire).add_shard(shard), ERR_WIRE),
        None => null_handle("wire"),
    }
}

extern "C" fn remove_shard(handle: *mut WireHandle, index: u32) -> *mut ShardHandle {
    let Some(wire) = (unsafe { wire(handle) }) else {
        return ptr::null_mut();
    };
    if refuse_running(wire, "remove_shard") {
        return ptr::null_mut();
    }
    match lock_wire(wire).remove_shard(index as usize) {
        Ok(Some(shard)) => into_shard_handle(shard),
        _ => ptr::null_mut(),
    }
}

extern "C" fn set_wire_looped(handle: *mut WireHandle, looped: bool) {
    if let Some(wire) = unsafe { wire(handle) } {
        if !refuse_running(wire, "set_wire_looped") {
            lock_wire(wire).set_looped(looped);
        }
    }
}

extern "C" fn set_wire_unsafe(handle: *mut WireHandle, unsafe_loop: bool) {
    if let Some(wire) = unsafe { wire(handle) } {
        if !refuse_running(wire, "set_wire_unsafe") {
            lock_wire(wire).set_unsafe(unsafe_loop);
        }
    }
}

extern "C" fn stop_wire(handle: *mut WireHandle, output: *mut Var) {
    let Some(wire) = (unsafe { wire(handle) }) else {
        return;
    };
    if request_stop(wire) {
        WireSlotBusy {
            slot: "stop_wire",
            deferred: true,
        }
        .log();
        if let Some(output) = unsafe { output.as_mut() } {
            destroy_var(output);
        }
        return;
    }
    let last = lock_wire(wire).stop();
    if let Some(output) = unsafe { output.as_mut() } {
        clone_var(output, last.var());
    }
}

extern "C" fn destroy_wire(handle: *mut WireHandle) {
    if !handle.is_null() {
        // SAFETY: handles come from create_wire and are dropped once.
        drop(unsafe { Box::from_raw(handle.cast::<WireRef>()) });
    }
}

extern "C" fn create_mesh() -> *mut MeshHandle {
    Box::into_raw(Box::new(Mesh::new(MeshConfig::default()))).cast()
}

extern "C" fn schedule(mesh_handle: *mut MeshHandle, wire_handle: *mut WireHandle) -> ErrorC {
    match unsafe { (mesh(mesh_handle), wire(wire_handle)) } {
        (Some(mesh), Some(wire)) => result_c(mesh.schedule(wire), ERR_WIRE),
        (None, _) => null_handle("mesh"),
        (_, None) => null_handle("wire"),
    }
}

extern "C" fn unschedule(mesh_handle: *mut MeshHandle, wire_handle: *mut WireHandle) -> ErrorC {
    match unsafe { (mesh(mesh_handle), wire(wire_handle)) } {
        (Some(mesh), Some(wire)) => result_c(mesh.unschedule(wire), ERR_WIRE),
        (None, _) => null_handle("mesh"),
        (_, None) => null_handle("wire"),
    }
}

extern "C" fn tick(handle: *mut MeshHandle) -> bool {
    match unsafe { mesh(handle) } {
        Some(mesh) => mesh.tick(),
        None => false,
    }
}

extern "C" fn is_empty(handle: *mut MeshHandle) -> bool {
    match unsafe { mesh(handle) } {
        Some(mesh) => mesh.is_empty(),
        None => true,
    }
}

extern "C" fn destroy_mesh(handle: *mut MeshHandle) {
    if !handle.is_null() {
        // SAFETY: handles come from create_mesh and are dropped once.
        drop(unsafe { Box::from_raw(handle.cast::<Mesh>()) });
    }
}

extern "C" fn reference_variable(ctx: *mut ContextC, name: *const c_char) -> *mut Var {
    match unsafe { context(ctx) } {
        Some(ctx) => ctx.reference_variable(&unsafe { read_c_str(name) }).into_raw(),
        None => ptr::null_mut(),
    }
}

extern "C" fn reference_wire_variable(handle: *mut WireHandle, name: *const c_char) -> *mut Var {
    match unsafe { wire(handle) } {
        Some(wire) if refuse_running(wire, "reference_wire_variable") => ptr::null_mut(),
        Some(wire) => lock_wire(wire)
            .reference_variable(&unsafe { read_c_str(name) })
            .into_raw(),
        None => ptr::null_mut(),
    }
}

extern "C" fn slot_release_variable(variable: *mut Var) {
    // SAFETY: the slot contract requires a pointer from one of the reference slots.
    if let Some(reference) = unsafe { VariableRef::from_raw(variable) } {
        release_variable(reference);
    }
}

extern "C" fn alloc_external_variable(handle: *mut WireHandle, name: *const c_char) -> *mut Var {
    match unsafe { wire(handle) } {
        Some(wire) if refuse_running(wire, "alloc_external_variable") => ptr::null_mut(),
        Some(wire) => lock_wire(wire)
            .alloc_external_variable(&unsafe { read_c_str(name) }, TypeInfo::Any)
            .into_raw(),
        None => ptr::null_mut(),
    }
}

extern "C" fn free_external_variable(handle: *mut WireHandle, name: *const c_char) -> ErrorC {
    match unsafe { wire(handle) } {
        Some(wire) if refuse_running(wire, "free_external_variable") => busy("free_external_variable"),
        Some(wire) => {
            let name = unsafe { read_c_str(name) };
            result_c(lock_wire(wire).free_external_variable(&name), ERR_WIRE)
        }
        None => null_handle("wire"),
    }
}

extern "C" fn suspend(ctx: *mut ContextC, seconds: f64) {
    if let Some(ctx) = unsafe { context(ctx) } {
        ctx.suspend(seconds);
    }
}

extern "C" fn is_resuming(ctx: *mut ContextC) -> bool {
    match unsafe { context(ctx) } {
        Some(ctx) => ctx.is_resuming(),
        None => false,
    }
}

extern "C" fn abort_wire(ctx: *mut ContextC, message: *const c_char) {
    if let Some(ctx) = unsafe { context(ctx) } {
        ctx.abort(unsafe { read_c_str(message) });
    }
}

#[cfg(test)]
mod tests {
    use super::super::shardmesh_interface;
    use super::*;
    use crate::engine::WireState;
    use crate::errors::ActivationError;
    use crate::types::{ClonedVar, Types};
    use std::ffi::CString;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Calls wire-handle slots on the wire that is running it.
    struct SelfStopping {
        iface: usize,
        wire: usize,
        activations: Arc<AtomicUsize>,
        reference_refused: Arc<AtomicBool>,
        output_cleared: Arc<AtomicBool>,
    }

    impl Shard for SelfStopping {
        fn name(&self) -> &str {
            "Test.SelfStop"
        }

        fn input_types(&self) -> Types {
            vec![TypeInfo::Any]
        }

        fn output_types(&self) -> Types {
            vec![TypeInfo::Any]
        }

        fn activate(&mut self, _ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            let iface = unsafe { &*(self.iface as *const CoreInterface) };
            let handle = self.wire as *mut WireHandle;

            let name = CString::new("x").expect("name");
            let reference = (iface.reference_wire_variable)(handle, name.as_ptr());
            self.reference_refused.store(reference.is_null(), Ordering::SeqCst);

            let mut output = Var::from(1i64);
            (iface.stop_wire)(handle, &mut output);
            self.output_cleared.store(output.is_none(), Ordering::SeqCst);
            Ok(input.borrowed())
        }
    }

    #[test]
    fn mismatched_version_yields_null() {
        let core = Core::new();
        let table = unsafe { shardmesh_interface(CURRENT_ABI + 1, Arc::as_ptr(&core)) };
        assert!(table.is_null());
        let table = unsafe { shardmesh_interface(CURRENT_ABI, ptr::null()) };
        assert!(table.is_null());
        let table = unsafe { shardmesh_interface(CURRENT_ABI, Arc::as_ptr(&core)) };
        assert!(!table.is_null());
    }

    #[test]
    fn wire_built_through_the_table_runs() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");

        let name = CString::new("Const").expect("name");
        let shard = (iface.create_shard)(iface, name.as_ptr());
        assert!(!shard.is_null());
        let value = Var::from(42i64);
        assert!((iface.validate_set_param)(shard, 0, &value).is_ok());
        let rejected = (iface.validate_set_param)(shard, 3, &value);
        assert!(!rejected.is_ok());

        let wire_name = CString::new("abi").expect("name");
        let wire = (iface.create_wire)(wire_name.as_ptr());
        assert!((iface.add_shard)(wire, shard).is_ok());

        let mesh = (iface.create_mesh)();
        assert!((iface.schedule)(mesh, wire).is_ok());
        assert!(!(iface.is_empty)(mesh));
        assert!((iface.tick)(mesh));

        let mut output = Var::NONE;
        (iface.stop_wire)(wire, &mut output);
        let output = ClonedVar::adopt(output);
        assert_eq!(output.as_int(), 42);

        assert!((iface.unschedule)(mesh, wire).is_ok());
        (iface.destroy_mesh)(mesh);
        (iface.destroy_wire)(wire);
    }

    #[test]
    fn unknown_shard_names_yield_null() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");
        let name = CString::new("NoSuchShard").expect("name");
        assert!((iface.create_shard)(iface, name.as_ptr()).is_null());
    }

    #[test]
    fn sequence_slots_destroy_removed_values() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");
        let mut seq = Var::new_seq(&[]);
        {
            let items = seq.as_seq_mut();
            let text = Var::new_string("owned");
            (iface.seq_push)(items, &text);
            (iface.seq_push)(items, &Var::from(1i64));
            (iface.seq_insert)(items, 0, &Var::from(2i64));
            assert_eq!(items.len(), 3);
            (iface.seq_slow_delete)(items, 1);
            assert_eq!(items.as_slice()[0].as_int(), 2);
            assert_eq!(items.as_slice()[1].as_int(), 1);
            let popped = (iface.seq_pop)(items);
            assert_eq!(popped.as_int(), 1);
            (iface.seq_fast_delete)(items, 7);
            assert_eq!(items.len(), 1);
            drop(ClonedVar::adopt(text));
        }
        destroy_var(&mut seq);
    }

    #[test]
    fn table_slots_round_trip() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");
        let mut table = (iface.table_new)();
        let key = CString::new("speed").expect("key");
        let missing = CString::new("missing").expect("key");

        (iface.table_set)(&mut table, key.as_ptr(), &Var::from(3.5));
        assert_eq!((iface.table_len)(&table), 1);
        let found = (iface.table_get)(&mut table, key.as_ptr());
        assert_eq!(unsafe { (*found).as_float() }, 3.5);
        assert!((iface.table_get)(&mut table, missing.as_ptr()).is_null());
        assert!((iface.table_remove)(&mut table, key.as_ptr()));
        assert!(!(iface.table_remove)(&mut table, key.as_ptr()));
        destroy_var(&mut table);
    }

    #[test]
    fn external_variables_are_shared_with_the_host() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");
        let wire_name = CString::new("ext").expect("name");
        let wire = (iface.create_wire)(wire_name.as_ptr());
        let var_name = CString::new("speed").expect("name");

        let slot = (iface.alloc_external_variable)(wire, var_name.as_ptr());
        assert!(!slot.is_null());
        let seen = (iface.reference_wire_variable)(wire, var_name.as_ptr());
        assert_eq!(seen, slot);
        (iface.clone_var)(slot, &Var::from(9i64));
        assert_eq!(unsafe { (*seen).as_int() }, 9);

        (iface.release_variable)(seen);
        (iface.release_variable)(slot);
        assert!((iface.free_external_variable)(wire, var_name.as_ptr()).is_ok());
        (iface.destroy_wire)(wire);
    }

    #[test]
    fn shard_stops_its_own_wire_without_deadlocking() {
        let core = Core::new();
        let iface = core.interface(CURRENT_ABI).expect("interface");
        let wire_name = CString::new("self-stop").expect("name");
        let handle = (iface.create_wire)(wire_name.as_ptr());
        (iface.set_wire_looped)(handle, true);

        let activations = Arc::new(AtomicUsize::new(0));
        let reference_refused = Arc::new(AtomicBool::new(false));
        let output_cleared = Arc::new(AtomicBool::new(false));
        let shard = into_shard_handle(Box::new(SelfStopping {
            iface: iface as *const CoreInterface as usize,
            wire: handle as usize,
            activations: Arc::clone(&activations),
            reference_refused: Arc::clone(&reference_refused),
            output_cleared: Arc::clone(&output_cleared),
        }));
        assert!((iface.add_shard)(handle, shard).is_ok());

        let mesh = (iface.create_mesh)();
        assert!((iface.schedule)(mesh, handle).is_ok());
        assert!((iface.tick)(mesh));
        assert!((iface.tick)(mesh));

        assert_eq!(activations.load(Ordering::SeqCst), 1);
        assert!(reference_refused.load(Ordering::SeqCst));
        assert!(output_cleared.load(Ordering::SeqCst));
        let state = lock_wire(unsafe { &*handle.cast::<WireRef>() }).state();
        assert_eq!(state, WireState::Stopped);

        // Outside the tick the same slots work again.
        let var_name = CString::new("x").expect("name");
        let reference = (iface.reference_wire_variable)(handle, var_name.as_ptr());
        assert!(!reference.is_null());
        (iface.release_variable)(reference);

        assert!((iface.unschedule)(mesh, handle).is_ok());
        (iface.destroy_mesh)(mesh);
        (iface.destroy_wire)(handle);
    }
}
