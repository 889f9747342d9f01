// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Value lifecycle: deep copy, destroy, equality, ordering and hashing.
//!
//! `clone_var` and `destroy_var` are the only two places that allocate or
//! release payload memory. Every other module, including the C interface
//! slots, routes through them.

use crate::errors::ConversionError;
use crate::types::alloc;
use crate::types::array::CArray;
use crate::types::table::TableMap;
use crate::types::var::{flags, BufferPayload, Payload, TablePayload, Var, VarKind};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// Deep-copy `src` into `dst`.
///
/// Whatever `dst` owned is released first. The slot bookkeeping of `dst`
/// (refcount, `REF_COUNTED`, `EXTERNAL`) survives so variables keep their
/// identity when reassigned.
pub fn clone_var(dst: &mut Var, src: &Var) {
    // Build the copy before releasing dst: src may live inside dst.
    let fresh = deep_copy(src);
    destroy_var(dst);
    let slot_flags = dst.flags & flags::SLOT;
    let refcount = dst.refcount;
    let version = dst.version.wrapping_add(1);
    *dst = fresh;
    dst.flags |= slot_flags;
    dst.refcount = refcount;
    dst.version = version;
}

fn deep_copy(src: &Var) -> Var {
    let mut copy = Var::NONE;
    copy.kind = src.kind;
    copy.inner_kind = src.inner_kind;
    copy.flags = src.flags & !(flags::SLOT | flags::OWNED | flags::EXPOSED);

    match src.kind {
        VarKind::Bytes | VarKind::String | VarKind::Path | VarKind::ContextVar => {
            let bytes = src.as_bytes();
            let is_text = src.kind != VarKind::Bytes;
            let ptr = alloc::allocate(bytes.len() + usize::from(is_text));
            // SAFETY: fresh block large enough for the bytes (plus NUL for text).
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
            copy.payload.buffer = BufferPayload {
                ptr,
                len: bytes.len() as u32,
                cap: bytes.len() as u32,
            };
            copy.flags |= flags::OWNED;
        }
        VarKind::Seq => {
            let items = src.as_seq();
            let mut seq = CArray::empty();
            seq.reserve(items.len() as u32);
            for item in items {
                seq.push(deep_copy(item));
            }
            copy.payload.seq = seq;
            copy.flags |= flags::OWNED;
        }
        VarKind::Table => {
            let mut map = TableMap::new();
            for (key, value) in src.as_table() {
                map.insert(key.clone(), deep_copy(value));
            }
            copy.payload.table = TablePayload {
                map: Box::into_raw(Box::new(map)),
                reserved: std::ptr::null_mut(),
            };
            copy.flags |= flags::OWNED;
        }
        VarKind::Image => {
            let mut image = src.as_image();
            let len = image.byte_len();
            let data = alloc::allocate(len);
            if !image.data.is_null() {
                // SAFETY: both buffers hold byte_len bytes.
                unsafe { std::ptr::copy_nonoverlapping(image.data, data, len) };
            }
            image.data = data;
            copy.payload.image = image;
            copy.flags |= flags::OWNED;
        }
        VarKind::Array => {
            // SAFETY: kind checked above.
            let source = unsafe { src.payload.array };
            copy.payload.array = CArray::from_slice(source.as_slice());
            copy.flags |= flags::OWNED;
        }
        _ => {
            // Blittables and weak references copy bitwise.
            copy.payload = src.payload;
        }
    }
    copy
}

/// Release everything `var` owns and reset it to None. Idempotent.
pub fn destroy_var(var: &mut Var) {
    if var.is_owned() {
        // SAFETY: OWNED guarantees every pointer below came from the core
        // allocator (or Box for tables) and is released exactly once here.
        unsafe {
            match var.kind {
                VarKind::Bytes | VarKind::String | VarKind::Path | VarKind::ContextVar => {
                    alloc::release(var.payload.buffer.ptr);
                }
                VarKind::Seq => {
                    let seq = &mut var.payload.seq;
                    for item in seq.as_mut_slice() {
                        destroy_var(item);
                    }
                    seq.free();
                }
                VarKind::Table => {
                    let map = var.payload.table.map;
                    if !map.is_null() {
                        let mut map = Box::from_raw(map);
                        for value in map.values_mut() {
                            destroy_var(value);
                        }
                    }
                }
                VarKind::Image => alloc::release(var.payload.image.data),
                VarKind::Array => var.payload.array.free(),
                _ => {}
            }
        }
    }
    let slot_flags = var.flags & flags::SLOT;
    let refcount = var.refcount;
    let version = var.version;
    *var = Var::NONE;
    var.flags = slot_flags;
    var.refcount = refcount;
    var.version = version;
}

/// Structural equality. Kinds must match; floats compare by value.
pub fn is_equal_var(a: &Var, b: &Var) -> bool {
    compare_var(a, b) == Ordering::Equal
}

/// Total order: first by kind, then by content within the kind.
pub fn compare_var(a: &Var, b: &Var) -> Ordering {
    if a.kind != b.kind {
        return a.kind.cmp(&b.kind);
    }
    match a.kind {
        VarKind::None | VarKind::Any | VarKind::EndOfBlittableTypes => Ordering::Equal,
        VarKind::Bool => a.as_bool().cmp(&b.as_bool()),
        VarKind::Int => a.as_int().cmp(&b.as_int()),
        VarKind::Int2 => a.as_int2().cmp(&b.as_int2()),
        VarKind::Int3 => a.as_int3().cmp(&b.as_int3()),
        VarKind::Int4 => a.as_int4().cmp(&b.as_int4()),
        VarKind::Float => a.as_float().total_cmp(&b.as_float()),
        VarKind::Float2 => cmp_floats(&a.as_float2(), &b.as_float2()),
        VarKind::Float3 => cmp_floats32(&a.as_float3(), &b.as_float3()),
        VarKind::Float4 => cmp_floats32(&a.as_float4(), &b.as_float4()),
        VarKind::Color => a.as_color().cmp(&b.as_color()),
        VarKind::Enum => {
            let (x, y) = (a.as_enum(), b.as_enum());
            (x.vendor_id, x.type_id, x.value).cmp(&(y.vendor_id, y.type_id, y.value))
        }
        VarKind::Bytes | VarKind::String | VarKind::Path | VarKind::ContextVar => {
            a.as_bytes().cmp(b.as_bytes())
        }
        VarKind::Image => {
            let (x, y) = (a.as_image(), b.as_image());
            (x.width, x.height, x.channels)
                .cmp(&(y.width, y.height, y.channels))
                .then_with(|| image_bytes(&x).cmp(&image_bytes(&y)))
        }
        VarKind::Seq => cmp_seqs(a.as_seq(), b.as_seq()),
        VarKind::Array => a
            .inner_kind
            .cmp(&b.inner_kind)
            .then_with(|| cmp_seqs(&a.array_elements(), &b.array_elements())),
        VarKind::Table => {
            let (x, y) = (a.as_table(), b.as_table());
            x.len().cmp(&y.len()).then_with(|| {
                for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                    let order = ka.cmp(kb).then_with(|| compare_var(va, vb));
                    if order != Ordering::Equal {
                        return order;
                    }
                }
                Ordering::Equal
            })
        }
        VarKind::Object => {
            let (x, y) = (a.as_object(), b.as_object());
            (x.vendor_id, x.type_id, x.ptr as usize).cmp(&(y.vendor_id, y.type_id, y.ptr as usize))
        }
        VarKind::Wire | VarKind::ShardRef => {
            (a.as_reference() as usize).cmp(&(b.as_reference() as usize))
        }
    }
}

fn cmp_floats(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let order = x.total_cmp(y);
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

fn cmp_floats32(a: &[f32], b: &[f32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let order = x.total_cmp(y);
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

fn cmp_seqs(a: &[Var], b: &[Var]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let order = compare_var(x, y);
        if order != Ordering::Equal {
            return order;
        }
    }
    a.len().cmp(&b.len())
}

fn image_bytes(image: &crate::types::var::ImagePayload) -> &[u8] {
    if image.data.is_null() {
        return &[];
    }
    // SAFETY: image payloads describe byte_len initialized bytes.
    unsafe { std::slice::from_raw_parts(image.data, image.byte_len()) }
}

/// Stable content hash, independent of ownership and slot flags.
pub fn hash_var(var: &Var) -> u64 {
    let mut hasher = Sha256::new();
    feed_hash(&mut hasher, var);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn feed_hash(hasher: &mut Sha256, var: &Var) {
    hasher.update([var.kind as u8]);
    match var.kind {
        VarKind::None | VarKind::Any | VarKind::EndOfBlittableTypes => {}
        VarKind::Bytes | VarKind::String | VarKind::Path | VarKind::ContextVar => {
            hasher.update((var.as_bytes().len() as u64).to_le_bytes());
            hasher.update(var.as_bytes());
        }
        VarKind::Image => {
            let image = var.as_image();
            hasher.update([image.channels]);
            hasher.update(image.width.to_le_bytes());
            hasher.update(image.height.to_le_bytes());
            hasher.update(image_bytes(&image));
        }
        VarKind::Seq => {
            hasher.update((var.as_seq().len() as u64).to_le_bytes());
            for item in var.as_seq() {
                feed_hash(hasher, item);
            }
        }
        VarKind::Array => {
            hasher.update([var.inner_kind as u8]);
            for item in var.array_elements() {
                feed_hash(hasher, &item);
            }
        }
        VarKind::Table => {
            hasher.update((var.as_table().len() as u64).to_le_bytes());
            for (key, value) in var.as_table() {
                hasher.update(key.as_bytes());
                feed_hash(hasher, value);
            }
        }
        _ => hasher.update(payload_bytes(var.kind, &var.payload)),
    }
}

fn payload_bytes(kind: VarKind, payload: &Payload) -> Vec<u8> {
    // SAFETY: reads only the bytes meaningful for the given blittable kind.
    unsafe {
        match kind {
            VarKind::Bool => vec![payload.bool_value as u8],
            VarKind::Int => payload.int_value.to_le_bytes().to_vec(),
            VarKind::Float => payload.float_value.to_bits().to_le_bytes().to_vec(),
            VarKind::Color => payload.color_value.to_vec(),
            VarKind::Int3 | VarKind::Float3 => {
                let raw = payload.int4_value;
                raw[..3].iter().flat_map(|x| x.to_le_bytes()).collect()
            }
            VarKind::Enum => {
                let e = payload.enum_value;
                [e.value, e.vendor_id, e.type_id]
                    .iter()
                    .flat_map(|x| x.to_le_bytes())
                    .collect()
            }
            VarKind::Object => {
                let o = payload.object;
                let mut bytes = (o.ptr as usize).to_le_bytes().to_vec();
                bytes.extend(o.vendor_id.to_le_bytes());
                bytes.extend(o.type_id.to_le_bytes());
                bytes
            }
            VarKind::Wire | VarKind::ShardRef => {
                (payload.reference.ptr as usize).to_le_bytes().to_vec()
            }
            _ => payload.int2_value.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

/// Append a deep copy of `value`.
pub fn seq_push(seq: &mut CArray<Var>, value: &Var) {
    let mut element = Var::NONE;
    clone_var(&mut element, value);
    seq.push(element);
}

/// Insert a deep copy of `value` at `index`.
pub fn seq_insert(seq: &mut CArray<Var>, index: usize, value: &Var) {
    let mut element = Var::NONE;
    clone_var(&mut element, value);
    seq.insert(index, element);
}

/// Resize, destroying trimmed elements and filling new slots with None.
pub fn seq_resize(seq: &mut CArray<Var>, len: u32) {
    if len < seq.len {
        for item in &mut seq.as_mut_slice()[len as usize..] {
            destroy_var(item);
        }
    }
    seq.resize(len);
}

/// Destroy every element and release the buffer.
pub fn seq_free(seq: &mut CArray<Var>) {
    for item in seq.as_mut_slice() {
        destroy_var(item);
    }
    seq.free();
}

impl TryFrom<&Var> for i64 {
    type Error = ConversionError;

    fn try_from(var: &Var) -> Result<Self, Self::Error> {
        match var.kind {
            VarKind::Int => Ok(var.as_int()),
            found => Err(ConversionError::new(VarKind::Int, found)),
        }
    }
}

impl TryFrom<&Var> for f64 {
    type Error = ConversionError;

    fn try_from(var: &Var) -> Result<Self, Self::Error> {
        match var.kind {
            VarKind::Float => Ok(var.as_float()),
            VarKind::Int => Ok(var.as_int() as f64),
            found => Err(ConversionError::new(VarKind::Float, found)),
        }
    }
}

impl TryFrom<&Var> for bool {
    type Error = ConversionError;

    fn try_from(var: &Var) -> Result<Self, Self::Error> {
        match var.kind {
            VarKind::Bool => Ok(var.as_bool()),
            found => Err(ConversionError::new(VarKind::Bool, found)),
        }
    }
}

impl<'a> TryFrom<&'a Var> for &'a str {
    type Error = ConversionError;

    fn try_from(var: &'a Var) -> Result<Self, Self::Error> {
        match var.kind {
            VarKind::String | VarKind::Path | VarKind::ContextVar => {
                std::str::from_utf8(var.as_bytes())
                    .map_err(|_| ConversionError::new(VarKind::String, var.kind))
            }
            found => Err(ConversionError::new(VarKind::String, found)),
        }
    }
}
