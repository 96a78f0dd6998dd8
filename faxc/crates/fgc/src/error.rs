use thiserror::Error;

/// Failure modes of the heap/GC layer itself (not VM runtime errors — those
/// live in `faxc-util::RuntimeError` since they're about program semantics,
/// not memory management).
#[derive(Debug, Error)]
pub enum FgcError {
    #[error("chunk holds more than 256 constants")]
    TooManyConstants,
}
