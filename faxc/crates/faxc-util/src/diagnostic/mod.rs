//! Compile-time diagnostic collection.
//!
//! The compiler (spec §4.4/§7) runs to the end of the token stream even
//! after an error, so it can report more than one independent mistake per
//! compile. A [`Handler`] is the place those diagnostics accumulate; the
//! driver formats and prints them once compilation finishes.

mod level;

pub use level::Level;

use std::cell::RefCell;
use std::fmt;

/// Where, within a line, a diagnostic should point — mirrors the three
/// shapes the reference scanner/parser can report (spec §6 "Diagnostics").
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticAt {
    /// `Error (at 'lexeme')`
    Lexeme(String),
    /// `Error (at end)`
    End,
    /// `Error (<scanner message>)` — the scanner already produced text.
    Scanner(String),
}

impl fmt::Display for DiagnosticAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticAt::Lexeme(lexeme) => write!(f, "at '{lexeme}'"),
            DiagnosticAt::End => write!(f, "at end"),
            DiagnosticAt::Scanner(msg) => write!(f, "{msg}"),
        }
    }
}

/// A single compile diagnostic: `[line N] Error (...): message`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub line: u32,
    pub at: DiagnosticAt,
    pub message: String,
}

impl Diagnostic {
    pub fn error(line: u32, at: DiagnosticAt, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            line,
            at,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}] {} ({}): {}",
            self.line, self.level, self.at, self.message
        )
    }
}

/// Accumulates diagnostics across one compile.
///
/// `panic_mode` implements the suppression half of spec §4.4's panic-mode
/// recovery: once set, further `report` calls are dropped until the parser
/// calls [`Handler::resynchronize`].
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    panic_mode: RefCell<bool>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error unless we're already recovering from one.
    pub fn report(&self, diag: Diagnostic) {
        if *self.panic_mode.borrow() {
            return;
        }
        *self.panic_mode.borrow_mut() = true;
        self.diagnostics.borrow_mut().push(diag);
    }

    /// Called once `synchronize()` finds a statement boundary.
    pub fn resynchronize(&self) {
        *self.panic_mode.borrow_mut() = false;
    }

    pub fn in_panic_mode(&self) -> bool {
        *self.panic_mode.borrow()
    }

    pub fn had_error(&self) -> bool {
        !self.diagnostics.borrow().is_empty()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_enters_panic_mode_and_suppresses_the_next() {
        let handler = Handler::new();
        handler.report(Diagnostic::error(1, DiagnosticAt::End, "first"));
        handler.report(Diagnostic::error(2, DiagnosticAt::End, "second"));

        assert!(handler.had_error());
        assert_eq!(handler.diagnostics().len(), 1);
        assert!(handler.in_panic_mode());
    }

    #[test]
    fn resynchronize_allows_further_reports() {
        let handler = Handler::new();
        handler.report(Diagnostic::error(1, DiagnosticAt::End, "first"));
        handler.resynchronize();
        handler.report(Diagnostic::error(2, DiagnosticAt::End, "second"));

        assert_eq!(handler.diagnostics().len(), 2);
    }

    #[test]
    fn formats_like_the_reference_cli() {
        let diag = Diagnostic::error(3, DiagnosticAt::Lexeme("+".into()), "Expect expression.");
        assert_eq!(
            diag.to_string(),
            "[line 3] Error (at '+'): Expect expression."
        );
    }
}
