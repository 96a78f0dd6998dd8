//! Built-in native functions registered as globals at VM construction.
//!
//! `fgc::NativeFn` is a plain function pointer (no captured state), so
//! `clock` approximates "seconds since process start" (spec §4.6) with a
//! lazily-initialized start instant rather than a value threaded through
//! the call: the first call anywhere in the process anchors the epoch.

use std::sync::OnceLock;
use std::time::Instant;

use fgc::Value;

static START: OnceLock<Instant> = OnceLock::new();

pub fn clock(_args: &[Value]) -> Value {
    let start = START.get_or_init(Instant::now);
    Value::Number(start.elapsed().as_secs_f64())
}
