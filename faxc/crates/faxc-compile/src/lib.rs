//! Compiles source text straight to bytecode: a single-pass Pratt parser
//! with no intermediate AST, following the structure of the reference
//! `compiler.c`/`value.h` pairing rather than building a separate tree-walk
//! front end.

mod compiler;
mod debug;

pub use compiler::compile;
pub use debug::{disassemble_chunk, disassemble_instruction};
