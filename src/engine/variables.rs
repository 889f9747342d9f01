// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named, reference-counted variable slots.
//!
//! Each slot is a heap-pinned [`Var`] whose `refcount` field counts the
//! outstanding [`VariableRef`]s. Slots never move while referenced, so a
//! reference stays valid until it is released, even across ticks.
//!
//! * Local variables live in a wire's [`VariableStore`] and are created on
//!   first reference. When the last reference is released the value is
//!   destroyed but the slot stays.
//! * External variables live in [`ExternalVariables`]. They are allocated
//!   and freed explicitly by the host; releasing a reference never destroys
//!   their value.

use crate::types::{clone_var, derive_type_info, destroy_var, flags, ExposedTypeInfo, TypeInfo, Var};
use std::collections::HashMap;
use std::ptr::NonNull;

/// A counted handle to a variable slot.
///
/// Not `Clone`: every handle corresponds to exactly one count and must be
/// handed back with [`release_variable`].
#[derive(Debug, PartialEq, Eq)]
pub struct VariableRef(NonNull<Var>);

// The slot is heap-pinned and only touched by the thread driving its wire.
unsafe impl Send for VariableRef {}

impl VariableRef {
    pub fn as_ptr(&self) -> *mut Var {
        self.0.as_ptr()
    }

    /// Rebuild a handle from a pointer previously obtained with [`VariableRef::into_raw`].
    ///
    /// # Safety
    /// `ptr` must be a live variable slot whose count includes this handle.
    pub unsafe fn from_raw(ptr: *mut Var) -> Option<Self> {
        NonNull::new(ptr).map(VariableRef)
    }

    /// Give the counted handle away as a raw pointer (C interface).
    pub fn into_raw(self) -> *mut Var {
        self.0.as_ptr()
    }

    /// Read the slot.
    ///
    /// # Safety
    /// The slot must still be alive: its wire has not been destroyed and, for
    /// external slots, the variable has not been freed.
    pub unsafe fn get(&self) -> &Var {
        self.0.as_ref()
    }

    /// Mutate the slot.
    ///
    /// # Safety
    /// Same as [`VariableRef::get`], and no other borrow of the slot is live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut Var {
        &mut *self.0.as_ptr()
    }

    fn acquire(slot: NonNull<Var>) -> VariableRef {
        // SAFETY: callers pass slots owned by a live store.
        unsafe {
            let var = &mut *slot.as_ptr();
            var.refcount += 1;
            var.flags |= flags::REF_COUNTED;
        }
        VariableRef(slot)
    }
}

/// Drop one count. When a local slot reaches zero its value is destroyed.
pub fn release_variable(reference: VariableRef) {
    // SAFETY: a VariableRef keeps its slot alive until this call.
    let var = unsafe { &mut *reference.as_ptr() };
    assert!(var.refcount > 0, "variable released more often than referenced");
    var.refcount -= 1;
    if var.refcount == 0 && var.flags & flags::EXTERNAL == 0 {
        destroy_var(var);
    }
}

fn new_slot(slot_flags: u16) -> NonNull<Var> {
    let mut var = Var::NONE;
    var.flags = slot_flags;
    NonNull::from(Box::leak(Box::new(var)))
}

/// Free a slot nobody references anymore.
///
/// # Safety
/// `slot` came from `new_slot` and has no outstanding references.
unsafe fn free_slot(slot: NonNull<Var>) {
    let mut boxed = Box::from_raw(slot.as_ptr());
    destroy_var(&mut boxed);
}

/// Local variables of one wire.
#[derive(Default)]
pub struct VariableStore {
    slots: HashMap<String, NonNull<Var>>,
}

unsafe impl Send for VariableStore {}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference `name`, creating an empty slot on first use.
    pub fn reference(&mut self, name: &str) -> VariableRef {
        let slot = *self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| new_slot(flags::NONE));
        VariableRef::acquire(slot)
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        // SAFETY: slots live as long as the store.
        self.slots.get(name).map(|slot| unsafe { slot.as_ref() })
    }

    /// Store a deep copy of `value`, creating the slot when missing.
    pub fn set(&mut self, name: &str, value: &Var) {
        let slot = *self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| new_slot(flags::NONE));
        // SAFETY: slot is live; no other borrow exists while we hold &mut self.
        unsafe { clone_var(&mut *slot.as_ptr(), value) };
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Sum of all outstanding reference counts.
    pub fn outstanding_references(&self) -> usize {
        self.slots
            .values()
            // SAFETY: slots live as long as the store.
            .map(|slot| unsafe { slot.as_ref() }.refcount as usize)
            .sum()
    }

    /// Free every unreferenced slot. Referenced slots are leaked so that the
    /// pointers handed out stay valid; returns how many were leaked.
    pub(crate) fn clear(&mut self) -> usize {
        let mut leaked = 0;
        for (_, slot) in self.slots.drain() {
            // SAFETY: slot is live and owned by this store.
            if unsafe { slot.as_ref() }.refcount > 0 {
                leaked += 1;
            } else {
                unsafe { free_slot(slot) };
            }
        }
        leaked
    }
}

impl Drop for VariableStore {
    fn drop(&mut self) {
        self.clear();
    }
}

struct ExternalSlot {
    slot: NonNull<Var>,
    type_info: TypeInfo,
    /// Allocated by this wire (freed here) or mapped in by the host (a held count).
    allocated: bool,
}

/// Variables provided from outside a wire.
#[derive(Default)]
pub struct ExternalVariables {
    slots: HashMap<String, ExternalSlot>,
}

unsafe impl Send for ExternalVariables {}

impl ExternalVariables {
    /// Allocate a fresh external slot and return the host's counted handle.
    ///
    /// Allocating a name that is already allocated returns another handle to
    /// the same slot.
    pub fn allocate(&mut self, name: &str, type_info: TypeInfo) -> VariableRef {
        let entry = self
            .slots
            .entry(name.to_string())
            .or_insert_with(|| ExternalSlot {
                slot: new_slot(flags::EXTERNAL),
                type_info,
                allocated: true,
            });
        VariableRef::acquire(entry.slot)
    }

    /// Free an allocated slot. Fails with the outstanding count when anything
    /// besides the host's own handle still references it.
    pub fn free(&mut self, name: &str) -> Result<(), Option<usize>> {
        let outstanding = match self.slots.get(name) {
            Some(entry) if entry.allocated => unsafe { entry.slot.as_ref() }.refcount as usize,
            _ => return Err(None),
        };
        if outstanding > 1 {
            return Err(Some(outstanding));
        }
        if let Some(entry) = self.slots.remove(name) {
            // SAFETY: at most the host's handle remains and the host gives it up by freeing.
            unsafe { free_slot(entry.slot) };
        }
        Ok(())
    }

    /// Map a slot owned elsewhere (for example another wire's variable).
    /// The wire keeps `reference` until the mapping is removed.
    pub fn insert_borrowed(&mut self, name: &str, reference: VariableRef) -> Option<VariableRef> {
        // SAFETY: the caller's handle keeps the slot alive.
        let type_info = derive_type_info(unsafe { reference.get() });
        let entry = ExternalSlot {
            slot: reference.0,
            type_info,
            allocated: false,
        };
        self.slots
            .insert(name.to_string(), entry)
            .and_then(Self::into_handle)
    }

    /// Remove a borrowed mapping, handing its counted reference back.
    pub fn remove_borrowed(&mut self, name: &str) -> Option<VariableRef> {
        let borrowed = matches!(self.slots.get(name), Some(entry) if !entry.allocated);
        if borrowed {
            self.slots.remove(name).and_then(Self::into_handle)
        } else {
            None
        }
    }

    fn into_handle(entry: ExternalSlot) -> Option<VariableRef> {
        if entry.allocated {
            // SAFETY: allocated slots are owned here; nothing else may free them.
            unsafe { free_slot(entry.slot) };
            None
        } else {
            Some(VariableRef(entry.slot))
        }
    }

    pub fn reference(&self, name: &str) -> Option<VariableRef> {
        self.slots.get(name).map(|entry| VariableRef::acquire(entry.slot))
    }

    pub fn get(&self, name: &str) -> Option<&Var> {
        // SAFETY: slots live until freed or removed through &mut self.
        self.slots.get(name).map(|entry| unsafe { entry.slot.as_ref() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Compose-time view: allocated slots use their declared type, borrowed
    /// slots the type of their current value.
    pub fn exposed(&self) -> Vec<ExposedTypeInfo> {
        let mut exposed: Vec<ExposedTypeInfo> = self
            .slots
            .iter()
            .map(|(name, entry)| {
                let exposed_type = if entry.allocated {
                    entry.type_info.clone()
                } else {
                    derive_type_info(unsafe { entry.slot.as_ref() })
                };
                ExposedTypeInfo::new(name.clone(), exposed_type)
            })
            .collect();
        exposed.sort_by(|a, b| a.name.cmp(&b.name));
        exposed
    }

    /// Give back borrowed handles and free allocated slots nothing else
    /// references. Returns how many allocated slots had to be leaked.
    pub(crate) fn clear(&mut self) -> usize {
        let mut leaked = 0;
        for (_, entry) in self.slots.drain() {
            if entry.allocated {
                // SAFETY: owned slot; leak it when a shard still points at it.
                if unsafe { entry.slot.as_ref() }.refcount > 1 {
                    leaked += 1;
                } else {
                    unsafe { free_slot(entry.slot) };
                }
            } else {
                release_variable(VariableRef(entry.slot));
            }
        }
        leaked
    }
}

impl Drop for ExternalVariables {
    fn drop(&mut self) {
        self.clear();
    }
}
