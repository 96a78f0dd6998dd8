//! Stack VM interpreter for already-compiled fax bytecode (spec §4.6).
//!
//! This crate never touches source text: it walks the `Chunk` a
//! `faxc-compile::compile` call produced, using the same `Heap`/`Value`
//! object model `fgc` defines for the compiler. The driver is responsible
//! for wiring scanner → compiler → this crate together and for mapping
//! [`InterpretError`] to a process exit code (spec §6).

mod natives;
mod vm;

pub use vm::{InterpretError, Vm};
