//! The fax CLI: REPL / file mode, exit codes, diagnostic printing (spec §6).
//!
//! Kept out of `main.rs` so `tests/` (and the teacher's usual `assert_cmd`
//! end-to-end style) can also exercise `run` directly without going through
//! a subprocess where that's more convenient than spawning the binary.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use faxc_util::Handler;
use faxc_runtime::{InterpretError, Vm};

/// Matches spec §6's exit code table.
pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 64;
pub const EXIT_COMPILE_ERROR: i32 = 65;
pub const EXIT_RUNTIME_ERROR: i32 = 70;
pub const EXIT_IO_ERROR: i32 = 74;

const REPL_LINE_MAX: usize = 1023;

/// Compiles `source` against `vm`'s heap and runs it, printing diagnostics
/// to stderr on a compile failure. Returns the exit code the caller's mode
/// (REPL vs file) should use for this run.
fn interpret_and_report(vm: &mut Vm, source: &str) -> i32 {
    let handler = Handler::new();
    let function = match faxc_compile::compile(source, vm.heap_mut(), &handler) {
        Some(function) => function,
        None => {
            for diag in handler.diagnostics() {
                eprintln!("{diag}");
            }
            return EXIT_COMPILE_ERROR;
        }
    };

    match vm.interpret(function) {
        Ok(()) => EXIT_OK,
        Err(InterpretError::Runtime(_)) => EXIT_RUNTIME_ERROR,
        Err(InterpretError::CompileError) => EXIT_COMPILE_ERROR,
    }
}

/// Reads lines from stdin, prompting with `"> "`, until EOF. Each line is
/// interpreted independently against one persistent `Vm` (spec §6): globals
/// and interned strings survive between lines, but a failed line never
/// aborts the session.
pub fn run_repl() -> anyhow::Result<i32> {
    let mut vm = Vm::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().context("flushing REPL prompt")?;

        let mut line = String::new();
        let bytes_read = stdin
            .read_line(&mut line)
            .context("reading a line from stdin")?;
        if bytes_read == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        let truncated = if trimmed.len() > REPL_LINE_MAX {
            &trimmed[..floor_char_boundary(trimmed, REPL_LINE_MAX)]
        } else {
            trimmed
        };
        interpret_and_report(&mut vm, truncated);
    }

    Ok(EXIT_OK)
}

/// Reads the whole file at `path` and interprets it once (spec §6 "one
/// argument → treat as a file path"). I/O failures map to exit 74.
pub fn run_file(path: &Path) -> anyhow::Result<i32> {
    let source = match std::fs::read_to_string(path)
        .with_context(|| format!("could not read '{}'", path.display()))
    {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{err:#}");
            return Ok(EXIT_IO_ERROR);
        }
    };

    let mut vm = Vm::new();
    Ok(interpret_and_report(&mut vm, &source))
}

/// Prints the usage message of spec §6 to stderr.
pub fn print_usage(prog: &str) {
    eprintln!("Usage: {prog} [path]");
}

/// The largest byte index `<= max` that lands on a UTF-8 char boundary of
/// `s`, so a REPL line can be truncated without splitting a multi-byte
/// character.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::floor_char_boundary;

    #[test]
    fn floor_char_boundary_backs_off_a_split_multibyte_char() {
        let s = "é".repeat(600); // 1200 bytes, 2 bytes per char, none at byte 1023
        let idx = floor_char_boundary(s.as_str(), 1023);
        assert!(s.is_char_boundary(idx));
        assert_eq!(idx, 1022);
    }

    #[test]
    fn floor_char_boundary_is_a_no_op_on_ascii() {
        let s = "a".repeat(2000);
        assert_eq!(floor_char_boundary(&s, 1023), 1023);
    }
}
