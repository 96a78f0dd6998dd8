//! Heap object model (spec §3 "Obj (heap object)").
//!
//! Every object kind is a `#[repr(C)]` struct whose first field is a
//! [`GcHeader`]. Because `repr(C)` fixes field order and offset, a pointer to
//! any of these structs can be reinterpreted as a `*mut GcHeader` and back —
//! the same "common header, kind-specific tail" trick the reference
//! implementation does in C, just expressed with Rust's layout guarantees
//! instead of a cast between struct pointers of unrelated C types.
//!
//! The heap holds objects behind raw pointers (`NonNull`) rather than an
//! index-based arena: upvalues need to alias live stack slots, and instances
//! need shared, independently-mutable identity (two `Value`s that reference
//! the same instance must observe each other's field writes) exactly as
//! spec §3's invariants require. [`crate::Heap`] is the sole owner of these
//! allocations and is the only thing permitted to free them.

use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;

use crate::chunk::Chunk;
use crate::value::Value;

/// Discriminant stored in every [`GcHeader`], used to recover the concrete
/// type behind an [`ObjRef`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjKind {
    String,
    Function,
    Native,
    Closure,
    Upvalue,
    Class,
    Instance,
    BoundMethod,
}

/// Common header shared by every heap object (spec §3).
#[repr(C)]
pub struct GcHeader {
    pub kind: ObjKind,
    pub marked: Cell<bool>,
    pub next: Cell<Option<NonNull<GcHeader>>>,
}

impl GcHeader {
    pub fn new(kind: ObjKind) -> Self {
        Self {
            kind,
            marked: Cell::new(false),
            next: Cell::new(None),
        }
    }
}

/// A type-erased handle to any heap object.
pub type ObjRef = NonNull<GcHeader>;

pub fn kind_of(obj: ObjRef) -> ObjKind {
    unsafe { obj.as_ref().kind }
}

/// # Safety
/// `obj` must point at a live `GcHeader` whose `kind` is `T::KIND`.
unsafe fn cast<T>(obj: ObjRef) -> NonNull<T> {
    obj.cast()
}

/// Common trait implemented by every concrete object payload, giving the
/// heap a uniform way to upcast/downcast between `ObjRef` and `NonNull<T>`.
pub trait Obj: Sized {
    const KIND: ObjKind;

    fn header(&self) -> &GcHeader;

    fn as_ref(obj: ObjRef) -> NonNull<Self> {
        debug_assert_eq!(kind_of(obj), Self::KIND);
        unsafe { cast(obj) }
    }

    fn upcast(this: NonNull<Self>) -> ObjRef {
        this.cast()
    }
}

#[repr(C)]
pub struct ObjString {
    pub header: GcHeader,
    pub hash: u32,
    pub chars: Box<str>,
}

impl Obj for ObjString {
    const KIND: ObjKind = ObjKind::String;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

/// FNV-1a, 32-bit (spec §3 "precomputed 32-bit FNV-1a hash").
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[repr(C)]
pub struct ObjFunction {
    pub header: GcHeader,
    pub arity: u8,
    pub upvalue_count: u8,
    pub chunk: Chunk,
    pub name: Option<NonNull<ObjString>>,
}

impl Obj for ObjFunction {
    const KIND: ObjKind = ObjKind::Function;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

pub type NativeFn = fn(&[Value]) -> Value;

#[repr(C)]
pub struct ObjNative {
    pub header: GcHeader,
    pub function: NativeFn,
}

impl Obj for ObjNative {
    const KIND: ObjKind = ObjKind::Native;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

#[repr(C)]
pub struct ObjUpvalue {
    pub header: GcHeader,
    /// Index into the VM value stack while open; ignored once closed.
    pub location: Cell<usize>,
    pub closed: Cell<Value>,
    pub is_open: Cell<bool>,
}

impl Obj for ObjUpvalue {
    const KIND: ObjKind = ObjKind::Upvalue;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

#[repr(C)]
pub struct ObjClosure {
    pub header: GcHeader,
    pub function: NonNull<ObjFunction>,
    pub upvalues: Vec<NonNull<ObjUpvalue>>,
}

impl Obj for ObjClosure {
    const KIND: ObjKind = ObjKind::Closure;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

#[repr(C)]
pub struct ObjClass {
    pub header: GcHeader,
    pub name: NonNull<ObjString>,
    pub methods: crate::table::Table,
}

impl Obj for ObjClass {
    const KIND: ObjKind = ObjKind::Class;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

#[repr(C)]
pub struct ObjInstance {
    pub header: GcHeader,
    pub class: NonNull<ObjClass>,
    pub fields: crate::table::Table,
}

impl Obj for ObjInstance {
    const KIND: ObjKind = ObjKind::Instance;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

#[repr(C)]
pub struct ObjBoundMethod {
    pub header: GcHeader,
    pub receiver: Value,
    pub method: NonNull<ObjClosure>,
}

impl Obj for ObjBoundMethod {
    const KIND: ObjKind = ObjKind::BoundMethod;
    fn header(&self) -> &GcHeader {
        &self.header
    }
}

/// `<fn NAME>` / `<script>` formatting shared by bare functions, closures
/// and bound methods (spec §4.1 "print").
pub fn function_name(f: &ObjFunction) -> &str {
    match f.name {
        Some(name) => unsafe { &name.as_ref().chars },
        None => "script",
    }
}

impl fmt::Display for ObjString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chars)
    }
}
