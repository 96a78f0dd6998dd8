//! Value representation, heap object model and a single-threaded
//! mark-sweep collector for the fax bytecode VM.
//!
//! This crate also owns [`Chunk`]/[`OpCode`] even though emitting bytecode
//! is the compiler's job: `ObjFunction` is a heap object that embeds a
//! `Chunk`, and a heap object can't live in a crate that depends on the
//! crate defining the heap. Keeping chunk and heap together here avoids
//! that cycle; `faxc-compile` only ever sees `Chunk`'s public API.

mod chunk;
mod error;
mod heap;
mod object;
mod table;
mod value;

pub use chunk::{Chunk, OpCode};
pub use error::FgcError;
pub use heap::Heap;
pub use object::{
    fnv1a, function_name, kind_of, GcHeader, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure,
    ObjFunction, ObjInstance, ObjKind, ObjNative, ObjRef, ObjString, ObjUpvalue,
};
pub use table::Table;
pub use value::Value;
