// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::*;
use crate::abi::types::error_c;
use crate::core::Core;
use crate::engine::{lock_wire, ExternalVariables, Mesh, MeshConfig, VariableStore, Wire};
use crate::traits::{set_param_checked, ExposedPool};
use crate::types::{ExposedTypeInfo, ParameterInfo, VarKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shard laid out the way a C implementation would be: the table first,
/// private state after it.
#[repr(C)]
struct Offset {
    table: ShardVTable,
    core: *const CoreInterface,
    step: i64,
    warmups: usize,
    destroys: Arc<AtomicUsize>,
    outputs: TypesMirror,
    param_types: TypesMirror,
    param_names: Vec<CString>,
    params: Vec<ParameterInfoC>,
}

fn state<'a>(ptr: *mut ShardVTable) -> &'a mut Offset {
    unsafe { &mut *ptr.cast::<Offset>() }
}

extern "C" fn offset_name(_ptr: *mut ShardVTable) -> *const c_char {
    b"Test.Offset\0".as_ptr().cast()
}

extern "C" fn offset_help(_ptr: *mut ShardVTable) -> *const c_char {
    b"Adds Step to its input.\0".as_ptr().cast()
}

extern "C" fn offset_destroy(ptr: *mut ShardVTable) {
    let instance = unsafe { Box::from_raw(ptr.cast::<Offset>()) };
    instance.destroys.fetch_add(1, Ordering::SeqCst);
}

extern "C" fn offset_activate(ptr: *mut ShardVTable, ctx: *mut ContextC, input: *const Var) -> Var {
    let instance = state(ptr);
    let input = unsafe { &*input };
    if input.as_int() < 0 {
        if let Some(core) = unsafe { instance.core.as_ref() } {
            (core.abort_wire)(ctx, b"negative input\0".as_ptr().cast());
        }
        return Var::NONE;
    }
    Var::from(input.as_int() + instance.step)
}

extern "C" fn offset_parameters(ptr: *mut ShardVTable) -> CArray<ParameterInfoC> {
    CArray::view(&state(ptr).params)
}

extern "C" fn offset_set_param(ptr: *mut ShardVTable, _index: i32, value: *const Var) -> ErrorC {
    let value = unsafe { &*value };
    if value.as_int() == 0 {
        return error_c(7, "Step must not be zero");
    }
    state(ptr).step = value.as_int();
    ErrorC::OK
}

extern "C" fn offset_get_param(ptr: *mut ShardVTable, _index: i32) -> Var {
    Var::from(state(ptr).step)
}

extern "C" fn offset_output_types(ptr: *mut ShardVTable) -> CArray<TypeInfoC> {
    state(ptr).outputs.as_c()
}

extern "C" fn offset_warmup(ptr: *mut ShardVTable, _ctx: *mut ContextC) -> ErrorC {
    state(ptr).warmups += 1;
    ErrorC::OK
}

extern "C" fn offset_reject_compose(_ptr: *mut ShardVTable, data: *const InstanceDataC) -> ComposeResultC {
    let data = unsafe { &*data };
    let seen = data.shared.len;
    ComposeResultC {
        output_type: TypeInfoC::basic(VarKind::None),
        error: error_c(9, &format!("refusing with {} shared", seen)),
    }
}

fn offset_instance(core: *const CoreInterface, destroys: Arc<AtomicUsize>) -> *mut ShardVTable {
    let param_types = TypesMirror::new(&[TypeInfo::Int]);
    let param_names = vec![
        CString::new("Step").unwrap_or_default(),
        CString::new("Amount added to the input.").unwrap_or_default(),
    ];
    let params = vec![ParameterInfoC {
        name: param_names[0].as_ptr(),
        help: param_names[1].as_ptr(),
        types: param_types.as_c(),
    }];
    let instance = Box::new(Offset {
        table: ShardVTable {
            name: offset_name,
            hash: None,
            help: Some(offset_help),
            setup: None,
            destroy: offset_destroy,
            activate: offset_activate,
            parameters: Some(offset_parameters),
            set_param: Some(offset_set_param),
            get_param: Some(offset_get_param),
            input_types: None,
            output_types: Some(offset_output_types),
            warmup: Some(offset_warmup),
            cleanup: None,
            compose: None,
            exposed_variables: None,
            required_variables: None,
        },
        core,
        step: 1,
        warmups: 0,
        destroys,
        outputs: TypesMirror::new(&[TypeInfo::Int]),
        param_types,
        param_names,
        params,
    });
    Box::into_raw(instance).cast()
}

extern "C" fn construct_offset(core: *const CoreInterface) -> *mut ShardVTable {
    offset_instance(core, Arc::new(AtomicUsize::new(0)))
}

fn adapter(destroys: &Arc<AtomicUsize>) -> ForeignShard {
    let raw = offset_instance(std::ptr::null(), Arc::clone(destroys));
    unsafe { ForeignShard::from_raw(raw) }.expect("instance")
}

#[test]
fn metadata_comes_from_the_table() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let shard = adapter(&destroys);
    assert_eq!(shard.name(), "Test.Offset");
    assert_eq!(shard.help(), "Adds Step to its input.");
    assert_eq!(shard.hash(), shard_hash("Test.Offset"));
    assert_eq!(shard.input_types(), vec![TypeInfo::Any]);
    assert_eq!(shard.output_types(), vec![TypeInfo::Int]);
    assert_eq!(
        shard.parameters(),
        vec![ParameterInfo::new("Step", "Amount added to the input.", vec![TypeInfo::Int])]
    );
    assert!(shard.exposed_variables().is_empty());
}

#[test]
fn parameters_round_trip_and_rejections_carry_the_message() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let mut shard = adapter(&destroys);
    set_param_checked(&mut shard, 0, &Var::from(5i64)).expect("accepted");
    assert_eq!(shard.get_param(0).expect("readable").as_int(), 5);

    match set_param_checked(&mut shard, 0, &Var::from(0i64)) {
        Err(ParamError::Rejected { parameter, reason, .. }) => {
            assert_eq!(parameter, "Step");
            assert_eq!(reason, "Step must not be zero");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        shard.set_param(4, &Var::from(1i64)),
        Err(ParamError::IndexOutOfRange { index: 4, count: 1, .. })
    ));
    assert!(shard.get_param(1).is_err());
}

#[test]
fn destroy_runs_once() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let mut shard = adapter(&destroys);
    shard.destroy();
    shard.destroy();
    drop(shard);
    assert_eq!(destroys.load(Ordering::SeqCst), 1);

    let dropped = adapter(&destroys);
    drop(dropped);
    assert_eq!(destroys.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_compose_slot_uses_the_declared_output() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let mut shard = adapter(&destroys);
    let pool = ExposedPool::new();
    let data = InstanceData {
        wire_name: "w",
        input_type: &TypeInfo::Int,
        shared: &pool,
        shard_index: 0,
    };
    assert_eq!(shard.compose(&data), Ok(TypeInfo::Int));
}

#[test]
fn compose_errors_become_rejections() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let mut shard = adapter(&destroys);
    state(shard.ptr()).table.compose = Some(offset_reject_compose);

    let mut pool = ExposedPool::new();
    pool.insert("x".to_string(), ExposedTypeInfo::new("x", TypeInfo::Float));
    let data = InstanceData {
        wire_name: "w",
        input_type: &TypeInfo::Int,
        shared: &pool,
        shard_index: 2,
    };
    assert_eq!(
        shard.compose(&data),
        Err(CompositionError::ShardRejected {
            shard: "Test.Offset".to_string(),
            code: 9,
            message: "refusing with 1 shared".to_string(),
        })
    );
}

#[test]
fn warmup_and_activate_go_through_the_context() {
    let destroys = Arc::new(AtomicUsize::new(0));
    let mut shard = adapter(&destroys);
    let mut variables = VariableStore::new();
    let externals = ExternalVariables::default();
    let mut ctx = Context::new("w", &mut variables, &externals, 0.0, 0);

    shard.warmup(&mut ctx).expect("warmup");
    assert_eq!(state(shard.ptr()).warmups, 1);
    let output = shard.activate(&mut ctx, &Var::from(41i64)).expect("activate");
    assert_eq!(output.as_int(), 42);
    shard.cleanup(&mut ctx);
}

#[test]
fn registered_foreign_shards_run_in_a_wire_and_can_abort_it() {
    let core = Core::new();
    core.register_foreign_shard("Test.Offset", construct_offset)
        .expect("registration");

    let mut constant = core.create_shard("Const").expect("const");
    set_param_checked(constant.as_mut(), 0, &Var::from(-3i64)).expect("value");
    let offset = core.create_shard("Test.Offset").expect("foreign");
    assert_eq!(offset.name(), "Test.Offset");

    let mut wire = Wire::new("foreign");
    wire.add_shard(constant).expect("add const");
    wire.add_shard(offset).expect("add foreign");
    let wire = wire.into_ref();

    let mut mesh = Mesh::new(MeshConfig::default());
    mesh.schedule(&wire).expect("schedule");
    assert!(!mesh.tick());
    let failures = mesh.take_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].shard, "Test.Offset");
    assert!(lock_wire(&wire).failure().is_some());
}
