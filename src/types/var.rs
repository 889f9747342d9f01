// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The 32-byte tagged-union value exchanged across the shard ABI.
//!
//! A `Var` is plain old data: copying it with `Copy` duplicates the bits,
//! never the payload. Deep copies go through [`clone_var`](crate::types::clone_var)
//! and owned payloads are released with [`destroy_var`](crate::types::destroy_var).
//! Rust callers that want scope-based cleanup wrap a value in
//! [`ClonedVar`](crate::types::ClonedVar).
//!
//! # Ownership
//!
//! Only payloads carrying the [`flags::OWNED`] bit are released by destroy.
//! Views (`Var::string_view`, `Var::seq_view`, ...) point at memory owned by
//! somebody else. `Wire`, `ShardRef` and `Object` payloads are always weak.

use crate::types::array::CArray;
use crate::types::table::TableMap;
use std::ffi::c_void;
use std::fmt;

/// Discriminant of a [`Var`]. Kinds below `EndOfBlittableTypes` own no memory.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum VarKind {
    #[default]
    None = 0,
    Any = 1,
    Enum = 2,
    Bool = 3,
    Int = 4,
    Int2 = 5,
    Int3 = 6,
    Int4 = 7,
    Float = 8,
    Float2 = 9,
    Float3 = 10,
    Float4 = 11,
    Color = 12,
    EndOfBlittableTypes = 50,
    Bytes = 51,
    String = 52,
    Path = 53,
    ContextVar = 54,
    Image = 55,
    Seq = 56,
    Table = 57,
    Wire = 58,
    ShardRef = 59,
    Object = 60,
    Array = 61,
}

impl VarKind {
    pub fn is_blittable(self) -> bool {
        (self as u8) < (VarKind::EndOfBlittableTypes as u8)
    }

    /// Decode a discriminant received across the C interface.
    pub fn from_u8(value: u8) -> Option<VarKind> {
        let kind = match value {
            0 => VarKind::None,
            1 => VarKind::Any,
            2 => VarKind::Enum,
            3 => VarKind::Bool,
            4 => VarKind::Int,
            5 => VarKind::Int2,
            6 => VarKind::Int3,
            7 => VarKind::Int4,
            8 => VarKind::Float,
            9 => VarKind::Float2,
            10 => VarKind::Float3,
            11 => VarKind::Float4,
            12 => VarKind::Color,
            50 => VarKind::EndOfBlittableTypes,
            51 => VarKind::Bytes,
            52 => VarKind::String,
            53 => VarKind::Path,
            54 => VarKind::ContextVar,
            55 => VarKind::Image,
            56 => VarKind::Seq,
            57 => VarKind::Table,
            58 => VarKind::Wire,
            59 => VarKind::ShardRef,
            60 => VarKind::Object,
            61 => VarKind::Array,
            _ => return None,
        };
        Some(kind)
    }

    /// Kinds whose payload is a weak pointer that a `Var` never frees.
    pub fn is_weak_reference(self) -> bool {
        matches!(self, VarKind::Wire | VarKind::ShardRef | VarKind::Object)
    }

    pub fn name(self) -> &'static str {
        match self {
            VarKind::None => "None",
            VarKind::Any => "Any",
            VarKind::Enum => "Enum",
            VarKind::Bool => "Bool",
            VarKind::Int => "Int",
            VarKind::Int2 => "Int2",
            VarKind::Int3 => "Int3",
            VarKind::Int4 => "Int4",
            VarKind::Float => "Float",
            VarKind::Float2 => "Float2",
            VarKind::Float3 => "Float3",
            VarKind::Float4 => "Float4",
            VarKind::Color => "Color",
            VarKind::EndOfBlittableTypes => "EndOfBlittableTypes",
            VarKind::Bytes => "Bytes",
            VarKind::String => "String",
            VarKind::Path => "Path",
            VarKind::ContextVar => "ContextVar",
            VarKind::Image => "Image",
            VarKind::Seq => "Seq",
            VarKind::Table => "Table",
            VarKind::Wire => "Wire",
            VarKind::ShardRef => "ShardRef",
            VarKind::Object => "Object",
            VarKind::Array => "Array",
        }
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bits stored in [`Var::flags`].
pub mod flags {
    pub const NONE: u16 = 0;
    pub const USES_OBJINFO: u16 = 1 << 0;
    pub const REF_COUNTED: u16 = 1 << 1;
    pub const EXTERNAL: u16 = 1 << 2;
    pub const EXPOSED: u16 = 1 << 3;
    pub const FOREIGN: u16 = 1 << 4;
    pub const ABORT: u16 = 1 << 5;
    pub const CUSTOM_0: u16 = 1 << 6;
    pub const CUSTOM_1: u16 = 1 << 7;
    /// The payload was allocated by the core allocator for this value.
    pub const OWNED: u16 = 1 << 8;

    /// Bits describing the slot a value lives in rather than the value.
    pub const SLOT: u16 = REF_COUNTED | EXTERNAL;
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EnumPayload {
    pub value: i32,
    pub vendor_id: i32,
    pub type_id: i32,
}

/// Text and byte payloads. Owned text carries a trailing NUL not counted in `len`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferPayload {
    pub ptr: *mut u8,
    pub len: u32,
    pub cap: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ImagePayload {
    pub data: *mut u8,
    pub width: u16,
    pub height: u16,
    pub channels: u8,
    pub flags: u8,
}

impl ImagePayload {
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TablePayload {
    pub map: *mut TableMap,
    pub reserved: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObjectPayload {
    pub ptr: *mut c_void,
    pub vendor_id: i32,
    pub type_id: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RefPayload {
    pub ptr: *mut c_void,
    pub reserved: *mut c_void,
}

/// Raw 16-byte payload. Interpreted strictly according to [`Var::kind`].
#[repr(C)]
#[derive(Clone, Copy)]
pub union Payload {
    pub bool_value: bool,
    pub int_value: i64,
    pub int2_value: [i64; 2],
    pub int3_value: [i32; 3],
    pub int4_value: [i32; 4],
    pub float_value: f64,
    pub float2_value: [f64; 2],
    pub float3_value: [f32; 3],
    pub float4_value: [f32; 4],
    pub color_value: [u8; 4],
    pub enum_value: EnumPayload,
    pub buffer: BufferPayload,
    pub image: ImagePayload,
    pub seq: CArray<Var>,
    pub array: CArray<Payload>,
    pub table: TablePayload,
    pub object: ObjectPayload,
    pub reference: RefPayload,
    raw: [u64; 2],
}

impl Payload {
    pub const fn zeroed() -> Self {
        Payload { raw: [0, 0] }
    }
}

/// Tagged-union value. Exactly 32 bytes, 16-byte aligned.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct Var {
    pub payload: Payload,
    /// Bumped every time `clone_var` replaces the content of this slot.
    pub version: u64,
    pub kind: VarKind,
    pub inner_kind: VarKind,
    pub flags: u16,
    pub refcount: u32,
}

const _: () = assert!(std::mem::size_of::<Var>() == 32);
const _: () = assert!(std::mem::align_of::<Var>() == 16);
const _: () = assert!(std::mem::size_of::<Payload>() == 16);

// A Var is plain data; whatever it owns moves with it.
unsafe impl Send for Var {}

impl Default for Var {
    fn default() -> Self {
        Var::NONE
    }
}

impl Var {
    pub const NONE: Var = Var {
        payload: Payload::zeroed(),
        version: 0,
        kind: VarKind::None,
        inner_kind: VarKind::None,
        flags: flags::NONE,
        refcount: 0,
    };

    const fn with_payload(kind: VarKind, payload: Payload) -> Var {
        Var {
            payload,
            version: 0,
            kind,
            inner_kind: VarKind::None,
            flags: flags::NONE,
            refcount: 0,
        }
    }

    pub fn any() -> Var {
        Var::with_payload(VarKind::Any, Payload::zeroed())
    }

    pub fn int2(x: i64, y: i64) -> Var {
        Var::with_payload(VarKind::Int2, Payload { int2_value: [x, y] })
    }

    pub fn int3(x: i32, y: i32, z: i32) -> Var {
        let mut payload = Payload::zeroed();
        payload.int3_value = [x, y, z];
        Var::with_payload(VarKind::Int3, payload)
    }

    pub fn int4(x: i32, y: i32, z: i32, w: i32) -> Var {
        Var::with_payload(VarKind::Int4, Payload { int4_value: [x, y, z, w] })
    }

    pub fn float2(x: f64, y: f64) -> Var {
        Var::with_payload(VarKind::Float2, Payload { float2_value: [x, y] })
    }

    pub fn float3(x: f32, y: f32, z: f32) -> Var {
        let mut payload = Payload::zeroed();
        payload.float3_value = [x, y, z];
        Var::with_payload(VarKind::Float3, payload)
    }

    pub fn float4(x: f32, y: f32, z: f32, w: f32) -> Var {
        Var::with_payload(VarKind::Float4, Payload { float4_value: [x, y, z, w] })
    }

    pub fn color(r: u8, g: u8, b: u8, a: u8) -> Var {
        let mut payload = Payload::zeroed();
        payload.color_value = [r, g, b, a];
        Var::with_payload(VarKind::Color, payload)
    }

    pub fn enumeration(value: i32, vendor_id: i32, type_id: i32) -> Var {
        let mut payload = Payload::zeroed();
        payload.enum_value = EnumPayload {
            value,
            vendor_id,
            type_id,
        };
        Var::with_payload(VarKind::Enum, payload)
    }

    fn buffer_view(kind: VarKind, bytes: &[u8]) -> Var {
        Var::with_payload(
            kind,
            Payload {
                buffer: BufferPayload {
                    ptr: bytes.as_ptr() as *mut u8,
                    len: bytes.len() as u32,
                    cap: 0,
                },
            },
        )
    }

    /// Borrow `text` as a String value.
    ///
    /// # Safety
    /// `text` must outlive every use of the returned value.
    pub unsafe fn string_view(text: &str) -> Var {
        Var::buffer_view(VarKind::String, text.as_bytes())
    }

    /// Borrow `bytes` as a Bytes value.
    ///
    /// # Safety
    /// `bytes` must outlive every use of the returned value.
    pub unsafe fn bytes_view(bytes: &[u8]) -> Var {
        Var::buffer_view(VarKind::Bytes, bytes)
    }

    /// Borrow `items` as a Seq value. The elements stay owned by the caller.
    ///
    /// # Safety
    /// `items` must outlive every use of the returned value.
    pub unsafe fn seq_view(items: &[Var]) -> Var {
        let mut var = Var::with_payload(VarKind::Seq, Payload::zeroed());
        var.payload.seq = CArray::view(items);
        var
    }

    /// Take ownership of text previously allocated with the core allocator.
    ///
    /// # Safety
    /// `ptr` must come from `alloc::allocate` with room for `len + 1` bytes
    /// and must not be owned by anything else.
    pub unsafe fn adopt_string(ptr: *mut u8, len: u32) -> Var {
        Var::adopt_buffer(VarKind::String, ptr, len)
    }

    /// Take ownership of bytes previously allocated with the core allocator.
    ///
    /// # Safety
    /// Same contract as [`Var::adopt_string`], without the NUL requirement.
    pub unsafe fn adopt_bytes(ptr: *mut u8, len: u32) -> Var {
        Var::adopt_buffer(VarKind::Bytes, ptr, len)
    }

    unsafe fn adopt_buffer(kind: VarKind, ptr: *mut u8, len: u32) -> Var {
        let mut var = Var::with_payload(
            kind,
            Payload {
                buffer: BufferPayload { ptr, len, cap: len },
            },
        );
        var.flags |= flags::OWNED;
        var
    }

    /// Take ownership of an allocator-backed sequence and its elements.
    ///
    /// # Safety
    /// `seq` must own its buffer (non-zero capacity) and every element.
    pub unsafe fn adopt_seq(seq: CArray<Var>) -> Var {
        let mut var = Var::with_payload(VarKind::Seq, Payload::zeroed());
        var.payload.seq = seq;
        var.flags |= flags::OWNED;
        var
    }

    /// Copy `text` into allocator memory. Release with `destroy_var`.
    pub fn new_string(text: &str) -> Var {
        Var::new_text(VarKind::String, text)
    }

    pub fn new_path(path: &str) -> Var {
        Var::new_text(VarKind::Path, path)
    }

    /// A reference to a variable by name, resolved by shards at runtime.
    pub fn new_context_var(name: &str) -> Var {
        Var::new_text(VarKind::ContextVar, name)
    }

    fn new_text(kind: VarKind, text: &str) -> Var {
        let ptr = crate::types::alloc::allocate(text.len() + 1);
        // SAFETY: fresh block with room for len + 1 bytes, already zeroed.
        unsafe {
            std::ptr::copy_nonoverlapping(text.as_ptr(), ptr, text.len());
            Var::adopt_buffer(kind, ptr, text.len() as u32)
        }
    }

    pub fn new_bytes(bytes: &[u8]) -> Var {
        let ptr = crate::types::alloc::allocate(bytes.len());
        // SAFETY: fresh block of bytes.len() bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
            Var::adopt_bytes(ptr, bytes.len() as u32)
        }
    }

    /// Deep-copy `items` into an owned sequence.
    pub fn new_seq(items: &[Var]) -> Var {
        let mut seq = CArray::empty();
        seq.reserve(items.len() as u32);
        for item in items {
            let mut element = Var::NONE;
            crate::types::clone_var(&mut element, item);
            seq.push(element);
        }
        // SAFETY: buffer and elements were allocated just above.
        unsafe { Var::adopt_seq(seq) }
    }

    /// An empty owned table.
    pub fn new_table() -> Var {
        let map: Box<TableMap> = Box::default();
        let mut var = Var::with_payload(
            VarKind::Table,
            Payload {
                table: TablePayload {
                    map: Box::into_raw(map),
                    reserved: std::ptr::null_mut(),
                },
            },
        );
        var.flags |= flags::OWNED;
        var
    }

    /// Copy raw pixels into an owned image.
    pub fn new_image(width: u16, height: u16, channels: u8, pixels: &[u8]) -> Var {
        let mut image = ImagePayload {
            data: std::ptr::null_mut(),
            width,
            height,
            channels,
            flags: 0,
        };
        assert_eq!(
            pixels.len(),
            image.byte_len(),
            "image pixel buffer does not match its dimensions"
        );
        image.data = crate::types::alloc::allocate(pixels.len());
        // SAFETY: fresh block sized for the pixel data.
        unsafe { std::ptr::copy_nonoverlapping(pixels.as_ptr(), image.data, pixels.len()) };
        let mut var = Var::with_payload(VarKind::Image, Payload { image });
        var.flags |= flags::OWNED;
        var
    }

    /// A typed array of blittable `inner` payloads, copied into allocator memory.
    pub fn new_array(inner: VarKind, items: &[Var]) -> Var {
        assert!(inner.is_blittable(), "array elements must be blittable");
        let mut array = CArray::empty();
        array.reserve(items.len() as u32);
        for item in items {
            assert_eq!(item.kind, inner, "array element kind mismatch");
            array.push(item.payload);
        }
        let mut var = Var::with_payload(VarKind::Array, Payload { array });
        var.inner_kind = inner;
        var.flags |= flags::OWNED;
        var
    }

    /// Weak reference to an object owned elsewhere.
    pub fn object(ptr: *mut c_void, vendor_id: i32, type_id: i32) -> Var {
        Var::with_payload(
            VarKind::Object,
            Payload {
                object: ObjectPayload {
                    ptr,
                    vendor_id,
                    type_id,
                },
            },
        )
    }

    /// Weak reference carried by `Wire` and `ShardRef` values.
    pub fn reference(kind: VarKind, ptr: *mut c_void) -> Var {
        assert!(
            matches!(kind, VarKind::Wire | VarKind::ShardRef),
            "reference values must be Wire or ShardRef"
        );
        Var::with_payload(
            kind,
            Payload {
                reference: RefPayload {
                    ptr,
                    reserved: std::ptr::null_mut(),
                },
            },
        )
    }

    pub fn is_none(&self) -> bool {
        self.kind == VarKind::None
    }

    pub fn is_owned(&self) -> bool {
        self.flags & flags::OWNED != 0
    }

    /// A shallow view of this value: same payload, no ownership, no slot
    /// bookkeeping. Valid only while `self` is.
    pub fn borrowed(&self) -> Var {
        let mut view = *self;
        view.flags &= !(flags::OWNED | flags::SLOT);
        view.refcount = 0;
        view
    }

    fn expect_kind(&self, kind: VarKind) {
        assert!(
            self.kind == kind,
            "payload accessed as {} but value holds {}",
            kind,
            self.kind
        );
    }

    pub fn as_bool(&self) -> bool {
        self.expect_kind(VarKind::Bool);
        unsafe { self.payload.bool_value }
    }

    pub fn as_int(&self) -> i64 {
        self.expect_kind(VarKind::Int);
        unsafe { self.payload.int_value }
    }

    pub fn as_int2(&self) -> [i64; 2] {
        self.expect_kind(VarKind::Int2);
        unsafe { self.payload.int2_value }
    }

    pub fn as_int3(&self) -> [i32; 3] {
        self.expect_kind(VarKind::Int3);
        unsafe { self.payload.int3_value }
    }

    pub fn as_int4(&self) -> [i32; 4] {
        self.expect_kind(VarKind::Int4);
        unsafe { self.payload.int4_value }
    }

    pub fn as_float(&self) -> f64 {
        self.expect_kind(VarKind::Float);
        unsafe { self.payload.float_value }
    }

    pub fn as_float2(&self) -> [f64; 2] {
        self.expect_kind(VarKind::Float2);
        unsafe { self.payload.float2_value }
    }

    pub fn as_float3(&self) -> [f32; 3] {
        self.expect_kind(VarKind::Float3);
        unsafe { self.payload.float3_value }
    }

    pub fn as_float4(&self) -> [f32; 4] {
        self.expect_kind(VarKind::Float4);
        unsafe { self.payload.float4_value }
    }

    pub fn as_color(&self) -> [u8; 4] {
        self.expect_kind(VarKind::Color);
        unsafe { self.payload.color_value }
    }

    pub fn as_enum(&self) -> EnumPayload {
        self.expect_kind(VarKind::Enum);
        unsafe { self.payload.enum_value }
    }

    /// Raw bytes of a Bytes, String, Path or ContextVar value.
    pub fn as_bytes(&self) -> &[u8] {
        assert!(
            matches!(
                self.kind,
                VarKind::Bytes | VarKind::String | VarKind::Path | VarKind::ContextVar
            ),
            "payload accessed as buffer but value holds {}",
            self.kind
        );
        // SAFETY: buffer kinds hold ptr/len describing initialized bytes.
        unsafe {
            let buffer = self.payload.buffer;
            if buffer.ptr.is_null() || buffer.len == 0 {
                return &[];
            }
            std::slice::from_raw_parts(buffer.ptr, buffer.len as usize)
        }
    }

    /// Text of a String, Path or ContextVar value.
    pub fn as_str(&self) -> &str {
        assert!(
            matches!(
                self.kind,
                VarKind::String | VarKind::Path | VarKind::ContextVar
            ),
            "payload accessed as text but value holds {}",
            self.kind
        );
        match std::str::from_utf8(self.as_bytes()) {
            Ok(text) => text,
            Err(_) => panic!("text payload is not valid UTF-8"),
        }
    }

    pub fn as_seq(&self) -> &[Var] {
        self.expect_kind(VarKind::Seq);
        unsafe { self.payload.seq.as_slice() }
    }

    pub fn as_seq_mut(&mut self) -> &mut CArray<Var> {
        self.expect_kind(VarKind::Seq);
        unsafe { &mut self.payload.seq }
    }

    pub fn as_table(&self) -> &TableMap {
        self.expect_kind(VarKind::Table);
        // SAFETY: table values always point at a live boxed map.
        unsafe { &*self.payload.table.map }
    }

    pub fn as_table_mut(&mut self) -> &mut TableMap {
        self.expect_kind(VarKind::Table);
        // SAFETY: as above, and we hold the only mutable handle.
        unsafe { &mut *self.payload.table.map }
    }

    pub fn as_image(&self) -> ImagePayload {
        self.expect_kind(VarKind::Image);
        unsafe { self.payload.image }
    }

    /// Elements of an Array value, each rebuilt as a blittable `Var`.
    pub fn array_elements(&self) -> Vec<Var> {
        self.expect_kind(VarKind::Array);
        let inner = self.inner_kind;
        unsafe { self.payload.array.as_slice() }
            .iter()
            .map(|payload| Var::with_payload(inner, *payload))
            .collect()
    }

    pub fn as_object(&self) -> ObjectPayload {
        self.expect_kind(VarKind::Object);
        unsafe { self.payload.object }
    }

    /// Pointer held by a Wire or ShardRef value.
    pub fn as_reference(&self) -> *mut c_void {
        assert!(
            matches!(self.kind, VarKind::Wire | VarKind::ShardRef),
            "payload accessed as reference but value holds {}",
            self.kind
        );
        unsafe { self.payload.reference.ptr }
    }
}

impl From<bool> for Var {
    fn from(value: bool) -> Self {
        let mut payload = Payload::zeroed();
        payload.bool_value = value;
        Var::with_payload(VarKind::Bool, payload)
    }
}

impl From<i64> for Var {
    fn from(value: i64) -> Self {
        Var::with_payload(VarKind::Int, Payload { int_value: value })
    }
}

impl From<i32> for Var {
    fn from(value: i32) -> Self {
        Var::from(value as i64)
    }
}

impl From<f64> for Var {
    fn from(value: f64) -> Self {
        Var::with_payload(VarKind::Float, Payload { float_value: value })
    }
}

impl From<&'static str> for Var {
    fn from(value: &'static str) -> Self {
        // SAFETY: static text outlives any value.
        unsafe { Var::string_view(value) }
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        crate::types::is_equal_var(self, other)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var<{}>({})", self.kind, self)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VarKind::None => f.write_str("None"),
            VarKind::Any => f.write_str("Any"),
            VarKind::Enum => {
                let e = self.as_enum();
                write!(f, "Enum({}:{}:{})", e.vendor_id, e.type_id, e.value)
            }
            VarKind::Bool => write!(f, "{}", self.as_bool()),
            VarKind::Int => write!(f, "{}", self.as_int()),
            VarKind::Int2 => write!(f, "{:?}", self.as_int2()),
            VarKind::Int3 => write!(f, "{:?}", self.as_int3()),
            VarKind::Int4 => write!(f, "{:?}", self.as_int4()),
            VarKind::Float => write!(f, "{}", self.as_float()),
            VarKind::Float2 => write!(f, "{:?}", self.as_float2()),
            VarKind::Float3 => write!(f, "{:?}", self.as_float3()),
            VarKind::Float4 => write!(f, "{:?}", self.as_float4()),
            VarKind::Color => write!(f, "Color{:?}", self.as_color()),
            VarKind::EndOfBlittableTypes => f.write_str("<invalid>"),
            VarKind::Bytes => write!(f, "Bytes({})", self.as_bytes().len()),
            VarKind::String => write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes())),
            VarKind::Path => write!(f, "Path({})", String::from_utf8_lossy(self.as_bytes())),
            VarKind::ContextVar => {
                write!(f, "${}", String::from_utf8_lossy(self.as_bytes()))
            }
            VarKind::Image => {
                let image = self.as_image();
                write!(f, "Image({}x{}x{})", image.width, image.height, image.channels)
            }
            VarKind::Seq => {
                f.write_str("[")?;
                for (i, item) in self.as_seq().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            VarKind::Table => {
                f.write_str("{")?;
                for (i, (key, value)) in self.as_table().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            VarKind::Wire => write!(f, "Wire({:p})", self.as_reference()),
            VarKind::ShardRef => write!(f, "ShardRef({:p})", self.as_reference()),
            VarKind::Object => {
                let object = self.as_object();
                write!(f, "Object({}:{})", object.vendor_id, object.type_id)
            }
            VarKind::Array => write!(f, "Array<{}>({})", self.inner_kind, unsafe {
                self.payload.array.len
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_is_thirty_two_bytes() {
        assert_eq!(std::mem::size_of::<Var>(), 32);
        assert_eq!(std::mem::align_of::<Var>(), 16);
    }

    #[test]
    fn blittable_constructors_set_kind_and_payload() {
        assert_eq!(Var::from(42i64).as_int(), 42);
        assert_eq!(Var::from(1.5).as_float(), 1.5);
        assert!(Var::from(true).as_bool());
        assert_eq!(Var::int2(1, 2).as_int2(), [1, 2]);
        assert_eq!(Var::float3(1.0, 2.0, 3.0).as_float3(), [1.0, 2.0, 3.0]);
        assert_eq!(Var::color(1, 2, 3, 4).as_color(), [1, 2, 3, 4]);
        assert!(Var::from(1i64).kind.is_blittable());
        assert!(!Var::from(1i64).is_owned());
    }

    #[test]
    #[should_panic(expected = "payload accessed as Int but value holds Float")]
    fn wrong_kind_access_is_a_contract_violation() {
        Var::from(1.0).as_int();
    }

    #[test]
    fn static_strings_are_views() {
        let v = Var::from("hello");
        assert_eq!(v.as_str(), "hello");
        assert!(!v.is_owned());
    }

    #[test]
    fn display_renders_nested_values() {
        let items = [Var::from(1i64), Var::from("x")];
        let seq = unsafe { Var::seq_view(&items) };
        assert_eq!(seq.to_string(), "[1, \"x\"]");
    }
}
