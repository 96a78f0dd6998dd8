//! Scanner for the fax language: turns a source buffer into a token stream.
//!
//! This stage is deliberately thin (spec §4.3): no diagnostic handler, no
//! lookahead beyond one character, no token buffering. It hands the compiler
//! raw `{kind, lexeme, line}` tuples and lets the compiler decide what to do
//! with an `Error` token.

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
