//! Shared diagnostics and error plumbing used by every stage of the fax
//! pipeline (scanner, compiler, VM, driver).
//!
//! Kept deliberately small: the rest of the workspace only needs a way to
//! collect compile-time diagnostics and a couple of `thiserror` error enums
//! for the failure modes that cross crate boundaries.

pub mod diagnostic;
pub mod error;

pub use diagnostic::{Diagnostic, DiagnosticAt, Handler, Level};
pub use error::{DriverError, RuntimeError};
