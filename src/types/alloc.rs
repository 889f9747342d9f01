// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Core allocator used for every payload a `Var` owns.
//!
//! Foreign code and the core exchange memory through this single indirection
//! so that a buffer allocated on one side of the ABI can be released on the
//! other. Each block carries a 16-byte size header in front of the pointer
//! handed out, which keeps the returned pointer 16-byte aligned and lets
//! `release` work from the pointer alone.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cell::Cell;

const HEADER: usize = 16;
const ALIGN: usize = 16;

thread_local! {
    static LIVE_ALLOCATIONS: Cell<isize> = const { Cell::new(0) };
}

fn layout_for(size: usize) -> Layout {
    match size
        .checked_add(HEADER)
        .and_then(|total| Layout::from_size_align(total, ALIGN).ok())
    {
        Some(layout) => layout,
        None => panic!("allocation of {} bytes overflows the address space", size),
    }
}

/// Allocate `size` zeroed bytes.
///
/// Zero-sized requests still return a unique, releasable pointer.
pub fn allocate(size: usize) -> *mut u8 {
    let layout = layout_for(size);
    // SAFETY: the layout is never zero-sized because of the header.
    unsafe {
        let base = alloc_zeroed(layout);
        if base.is_null() {
            handle_alloc_error(layout);
        }
        (base as *mut usize).write(size);
        LIVE_ALLOCATIONS.with(|live| live.set(live.get() + 1));
        base.add(HEADER)
    }
}

/// Release a block returned by [`allocate`]. Null is ignored.
///
/// # Safety
/// `ptr` must be null or come from [`allocate`] and not have been released.
pub unsafe fn release(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let base = ptr.sub(HEADER);
    let size = (base as *const usize).read();
    dealloc(base, layout_for(size));
    LIVE_ALLOCATIONS.with(|live| live.set(live.get() - 1));
}

/// Number of blocks allocated and not yet released on the calling thread.
pub fn live_allocations() -> isize {
    LIVE_ALLOCATIONS.with(|live| live.get())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_release_balance_the_counter() {
        let before = live_allocations();
        let ptr = allocate(40);
        assert_eq!(ptr as usize % ALIGN, 0);
        assert_eq!(live_allocations(), before + 1);
        unsafe { release(ptr) };
        assert_eq!(live_allocations(), before);
    }

    #[test]
    fn allocated_memory_is_zeroed() {
        let ptr = allocate(8);
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 8) };
        assert!(bytes.iter().all(|b| *b == 0));
        unsafe { release(ptr) };
    }

    #[test]
    fn releasing_null_is_a_no_op() {
        let before = live_allocations();
        unsafe { release(std::ptr::null_mut()) };
        assert_eq!(live_allocations(), before);
    }
}
