// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Growable C-layout array backed by the core allocator.
//!
//! `CArray` is the container behind sequences, type lists and parameter
//! lists on both sides of the ABI. It never runs element destructors: the
//! element kind decides what releasing an element means, so callers (for
//! example the `Var` sequence helpers in `types::ops`) handle that before
//! shrinking.
//!
//! An array with elements and zero capacity is a borrowed view. Growing a
//! view copies it into allocator memory and leaves the borrowed slice alone.

use crate::types::alloc;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr;

#[repr(C)]
pub struct CArray<T> {
    pub elements: *mut T,
    pub len: u32,
    pub cap: u32,
    _marker: PhantomData<T>,
}

impl<T> Clone for CArray<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CArray<T> {}

impl<T> Default for CArray<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> std::fmt::Debug for CArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CArray")
            .field("len", &self.len)
            .field("cap", &self.cap)
            .finish()
    }
}

impl<T> CArray<T> {
    pub const fn empty() -> Self {
        Self {
            elements: ptr::null_mut(),
            len: 0,
            cap: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> CArray<T> {
    /// Borrow `items` without copying. The slice must outlive every use of
    /// the returned array.
    pub fn view(items: &[T]) -> Self {
        Self {
            elements: items.as_ptr() as *mut T,
            len: items.len() as u32,
            cap: 0,
            _marker: PhantomData,
        }
    }

    /// Copy `items` into a freshly allocated array.
    pub fn from_slice(items: &[T]) -> Self {
        let mut array = Self::empty();
        array.reserve(items.len() as u32);
        for item in items {
            array.push(*item);
        }
        array
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_view(&self) -> bool {
        self.cap == 0 && self.len > 0
    }

    pub fn as_slice(&self) -> &[T] {
        if self.elements.is_null() || self.len == 0 {
            return &[];
        }
        // SAFETY: elements points at len initialized values while the array lives.
        unsafe { std::slice::from_raw_parts(self.elements, self.len as usize) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.elements.is_null() || self.len == 0 {
            return &mut [];
        }
        // SAFETY: as above, and we hold the only mutable handle.
        unsafe { std::slice::from_raw_parts_mut(self.elements, self.len as usize) }
    }

    /// Ensure room for at least `cap` elements.
    pub fn reserve(&mut self, cap: u32) {
        if cap <= self.cap {
            return;
        }
        let fresh = alloc::allocate(cap as usize * size_of::<T>()) as *mut T;
        if !self.elements.is_null() && self.len > 0 {
            // SAFETY: both regions hold at least len elements and do not overlap.
            unsafe { ptr::copy_nonoverlapping(self.elements, fresh, self.len as usize) };
        }
        if self.cap > 0 {
            // SAFETY: a non-zero capacity means we own the old buffer.
            unsafe { alloc::release(self.elements as *mut u8) };
        }
        self.elements = fresh;
        self.cap = cap;
    }

    fn grow_for(&mut self, len: u32) {
        if len > self.cap {
            self.reserve(len.max(self.cap.saturating_mul(2)).max(4));
        }
    }

    pub fn push(&mut self, value: T) {
        self.grow_for(self.len + 1);
        // SAFETY: grow_for guarantees room for one more element.
        unsafe { self.elements.add(self.len as usize).write(value) };
        self.len += 1;
    }

    pub fn insert(&mut self, index: usize, value: T) {
        assert!(
            index <= self.len as usize,
            "insert index {} out of bounds for length {}",
            index,
            self.len
        );
        self.grow_for(self.len + 1);
        // SAFETY: room for len + 1 elements; the shifted range stays in bounds.
        unsafe {
            let at = self.elements.add(index);
            ptr::copy(at, at.add(1), self.len as usize - index);
            at.write(value);
        }
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the element at the old last index is initialized.
        Some(unsafe { self.elements.add(self.len as usize).read() })
    }

    /// Set the length, zero-filling new slots.
    ///
    /// Shrinking forgets the trimmed elements; release them first if they own
    /// anything.
    pub fn resize(&mut self, len: u32) {
        if len > self.len {
            self.grow_for(len);
            // SAFETY: capacity covers len elements, zeroed bytes are a valid
            // empty value for every element type stored in a CArray.
            unsafe {
                ptr::write_bytes(
                    self.elements.add(self.len as usize),
                    0,
                    (len - self.len) as usize,
                )
            };
        }
        self.len = len;
    }

    /// Remove `index` by moving the last element into its place.
    pub fn fast_delete(&mut self, index: usize) -> T {
        assert!(index < self.len as usize, "delete index {} out of bounds", index);
        let last = self.len as usize - 1;
        let slice = self.as_mut_slice();
        let removed = slice[index];
        slice[index] = slice[last];
        self.len -= 1;
        removed
    }

    /// Remove `index` preserving the order of the remaining elements.
    pub fn slow_delete(&mut self, index: usize) -> T {
        assert!(index < self.len as usize, "delete index {} out of bounds", index);
        let removed = self.as_slice()[index];
        // SAFETY: the shifted tail is in bounds.
        unsafe {
            let at = self.elements.add(index);
            ptr::copy(at.add(1), at, self.len as usize - index - 1);
        }
        self.len -= 1;
        removed
    }

    /// Release the buffer (never the elements) and reset to empty.
    pub fn free(&mut self) {
        if self.cap > 0 {
            // SAFETY: owned buffer.
            unsafe { alloc::release(self.elements as *mut u8) };
        }
        *self = Self::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_insert_and_delete_keep_expected_order() {
        let mut array: CArray<i32> = CArray::empty();
        for value in [1, 2, 3, 4] {
            array.push(value);
        }
        array.insert(0, 0);
        assert_eq!(array.as_slice(), &[0, 1, 2, 3, 4]);

        assert_eq!(array.slow_delete(1), 1);
        assert_eq!(array.as_slice(), &[0, 2, 3, 4]);

        assert_eq!(array.fast_delete(0), 0);
        assert_eq!(array.as_slice(), &[4, 2, 3]);

        assert_eq!(array.pop(), Some(3));
        assert_eq!(array.len(), 2);
        array.free();
        assert!(array.is_empty());
    }

    #[test]
    fn resize_zero_fills_new_slots() {
        let mut array: CArray<u64> = CArray::empty();
        array.push(7);
        array.resize(3);
        assert_eq!(array.as_slice(), &[7, 0, 0]);
        array.resize(1);
        assert_eq!(array.as_slice(), &[7]);
        array.free();
    }

    #[test]
    fn growing_a_view_copies_instead_of_freeing_the_borrowed_slice() {
        let backing = [1u8, 2, 3];
        let mut array = CArray::view(&backing);
        assert!(array.is_view());
        array.push(4);
        assert!(!array.is_view());
        assert_eq!(array.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(backing, [1, 2, 3]);
        array.free();
    }

    #[test]
    fn free_balances_allocations() {
        let before = alloc::live_allocations();
        let mut array = CArray::from_slice(&[1u16, 2, 3, 4, 5, 6, 7, 8, 9]);
        array.free();
        assert_eq!(alloc::live_allocations(), before);
    }
}
