// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shards implemented outside Rust, driven through a C function table.
//!
//! A foreign shard instance starts with a [`ShardVTable`]; the foreign side
//! keeps its own state after it in the same allocation. Every slot receives
//! the instance pointer back. Optional slots may be null, in which case the
//! behavior of the [`Shard`] trait defaults applies.

use crate::abi::types::{
    exposed_from_c, parameters_from_c, read_c_str, types_from_c, ComposeResultC, ContextC,
    ErrorC, ExposedMirror, ExposedTypeInfoC, InstanceDataC, ParameterInfoC, TypeInfoC,
    TypesMirror,
};
use crate::abi::CoreInterface;
use crate::engine::Context;
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::observability::messages::shard::ShardCleanupFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::{default_output_type, shard_hash, InstanceData, Shard};
use crate::types::{CArray, ClonedVar, ExposedTypes, Parameters, TypeInfo, Types, Var};
use std::ffi::{c_char, CString};
use std::ptr::NonNull;

/// Constructor registered for a foreign shard name.
pub type ForeignConstructor = extern "C" fn(core: *const CoreInterface) -> *mut ShardVTable;

#[repr(C)]
pub struct ShardVTable {
    pub name: extern "C" fn(*mut ShardVTable) -> *const c_char,
    pub hash: Option<extern "C" fn(*mut ShardVTable) -> u32>,
    pub help: Option<extern "C" fn(*mut ShardVTable) -> *const c_char>,
    /// Called once right after construction.
    pub setup: Option<extern "C" fn(*mut ShardVTable)>,
    /// Frees the instance. Called exactly once.
    pub destroy: extern "C" fn(*mut ShardVTable),
    pub activate: extern "C" fn(*mut ShardVTable, *mut ContextC, *const Var) -> Var,
    pub parameters: Option<extern "C" fn(*mut ShardVTable) -> CArray<ParameterInfoC>>,
    pub set_param: Option<extern "C" fn(*mut ShardVTable, i32, *const Var) -> ErrorC>,
    /// The returned value stays owned by the shard.
    pub get_param: Option<extern "C" fn(*mut ShardVTable, i32) -> Var>,
    pub input_types: Option<extern "C" fn(*mut ShardVTable) -> CArray<TypeInfoC>>,
    pub output_types: Option<extern "C" fn(*mut ShardVTable) -> CArray<TypeInfoC>>,
    pub warmup: Option<extern "C" fn(*mut ShardVTable, *mut ContextC) -> ErrorC>,
    pub cleanup: Option<extern "C" fn(*mut ShardVTable) -> ErrorC>,
    pub compose: Option<extern "C" fn(*mut ShardVTable, *const InstanceDataC) -> ComposeResultC>,
    pub exposed_variables: Option<extern "C" fn(*mut ShardVTable) -> CArray<ExposedTypeInfoC>>,
    pub required_variables: Option<extern "C" fn(*mut ShardVTable) -> CArray<ExposedTypeInfoC>>,
}

pub(crate) fn context_handle(ctx: &mut Context) -> *mut ContextC {
    (ctx as *mut Context<'_>).cast::<ContextC>()
}

/// Adapter presenting a foreign instance as a [`Shard`].
pub struct ForeignShard {
    raw: NonNull<ShardVTable>,
    name: String,
    help: String,
    destroyed: bool,
}

// The instance is only ever driven by the thread that owns the wire.
unsafe impl Send for ForeignShard {}

impl ForeignShard {
    /// Take ownership of a constructed instance and run its `setup` slot.
    ///
    /// # Safety
    /// `raw` must be null or point at a live instance whose table stays
    /// valid until `destroy`.
    pub unsafe fn from_raw(raw: *mut ShardVTable) -> Option<Self> {
        let raw = NonNull::new(raw)?;
        let table = raw.as_ref();
        if let Some(setup) = table.setup {
            setup(raw.as_ptr());
        }
        let name = read_c_str((table.name)(raw.as_ptr()));
        let help = match table.help {
            Some(help) => read_c_str(help(raw.as_ptr())),
            None => String::new(),
        };
        Some(Self {
            raw,
            name,
            help,
            destroyed: false,
        })
    }

    fn table(&self) -> &ShardVTable {
        // SAFETY: valid until destroy, and no slot is reachable afterwards.
        unsafe { self.raw.as_ref() }
    }

    fn ptr(&self) -> *mut ShardVTable {
        self.raw.as_ptr()
    }
}

impl Shard for ForeignShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn hash(&self) -> u32 {
        match self.table().hash {
            Some(hash) => hash(self.ptr()),
            None => shard_hash(&self.name),
        }
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn input_types(&self) -> Types {
        match self.table().input_types {
            Some(slot) => unsafe { types_from_c(&slot(self.ptr())) },
            None => vec![TypeInfo::Any],
        }
    }

    fn output_types(&self) -> Types {
        match self.table().output_types {
            Some(slot) => unsafe { types_from_c(&slot(self.ptr())) },
            None => vec![TypeInfo::Any],
        }
    }

    fn parameters(&self) -> Parameters {
        match self.table().parameters {
            Some(slot) => unsafe { parameters_from_c(&slot(self.ptr())) },
            None => Vec::new(),
        }
    }

    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        let count = self.parameters().len();
        let slot = match self.table().set_param {
            Some(slot) if index < count => slot,
            _ => {
                return Err(ParamError::IndexOutOfRange {
                    shard: self.name.clone(),
                    index,
                    count,
                })
            }
        };
        let result = slot(self.ptr(), index as i32, value);
        if result.is_ok() {
            return Ok(());
        }
        let parameter = self
            .parameters()
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        Err(ParamError::Rejected {
            shard: self.name.clone(),
            parameter,
            reason: unsafe { result.message() },
        })
    }

    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        let count = self.parameters().len();
        match self.table().get_param {
            Some(slot) if index < count => Ok(ClonedVar::new(&slot(self.ptr(), index as i32))),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name.clone(),
                index,
                count,
            }),
        }
    }

    fn exposed_variables(&self) -> ExposedTypes {
        match self.table().exposed_variables {
            Some(slot) => unsafe { exposed_from_c(&slot(self.ptr())) },
            None => Vec::new(),
        }
    }

    fn required_variables(&self) -> ExposedTypes {
        match self.table().required_variables {
            Some(slot) => unsafe { exposed_from_c(&slot(self.ptr())) },
            None => Vec::new(),
        }
    }

    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        let Some(slot) = self.table().compose else {
            return Ok(default_output_type(&self.output_types(), data.input_type));
        };
        let wire_name = CString::new(data.wire_name).unwrap_or_default();
        let input = TypesMirror::new(std::slice::from_ref(data.input_type));
        let shared = ExposedMirror::new(data.shared.values());
        let instance = InstanceDataC {
            wire_name: wire_name.as_ptr(),
            input_type: input.first(),
            shared: shared.as_c(),
            shard_index: data.shard_index as u32,
        };
        let result = slot(self.ptr(), &instance);
        if !result.error.is_ok() {
            return Err(CompositionError::ShardRejected {
                shard: self.name.clone(),
                code: result.error.code,
                message: unsafe { result.error.message() },
            });
        }
        Ok(unsafe { result.output_type.to_type_info() })
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), ActivationError> {
        let Some(slot) = self.table().warmup else {
            return Ok(());
        };
        let result = slot(self.ptr(), context_handle(ctx));
        if result.is_ok() {
            Ok(())
        } else {
            Err(ActivationError::with_code(result.code, unsafe { result.message() }))
        }
    }

    /// Foreign shards fail by calling the `abort_wire` slot on the context.
    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        Ok((self.table().activate)(self.ptr(), context_handle(ctx), input))
    }

    fn cleanup(&mut self, _ctx: &mut Context) {
        let Some(slot) = self.table().cleanup else {
            return;
        };
        let result = slot(self.ptr());
        if !result.is_ok() {
            ShardCleanupFailed {
                shard: &self.name,
                code: result.code,
                message: &unsafe { result.message() },
            }
            .log();
        }
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            (self.table().destroy)(self.ptr());
        }
    }
}

impl Drop for ForeignShard {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests;
