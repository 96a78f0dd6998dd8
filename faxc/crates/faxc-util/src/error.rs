//! Error types shared by the VM and the driver.
//!
//! Compile-time failures are reported as [`Diagnostic`](crate::Diagnostic)s
//! collected by a [`Handler`](crate::Handler) rather than through `Result`,
//! since the compiler keeps going after the first error (spec §7). Runtime
//! failures and driver-level I/O failures do use `Result`, via the two enums
//! below.

use thiserror::Error;

/// A runtime fault raised by the interpreter loop (spec §7 "Runtime errors").
///
/// Every variant corresponds to one of the listed runtime error conditions;
/// the VM prints `message` followed by a frame-by-frame stack trace and
/// aborts the current `interpret` call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Only instances have properties.")]
    NotAnInstance,

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Superclass must be a class.")]
    SuperclassMustBeAClass,
}

/// Top-level failure reported by the `faxc-drv` CLI, mapped to the exit
/// codes of spec §6.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("could not read '{path}': {source}")]
    ReadSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed")]
    CompileFailed,

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
