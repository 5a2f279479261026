//! Diagnostics: source locations, errors, warnings, and the echoed-line /
//! caret output format.
//!
//! Every error carries a location within the current input line and an
//! optional one-line hint. Rendering produces:
//!
//! ```text
//! int x[void]
//!       ^
//! 7: error: array of void; hint: array of pointer to void
//! ```
//!
//! Warnings render the same way with a `warning:` prefix and never stop
//! processing.

use std::fmt;

/// Position of a token or construct within the current input line.
///
/// Lines and columns are stored 0-based; rendering is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Loc {
    pub line: usize,
    /// Column of the first character.
    pub first_col: usize,
    /// Column of the last character, inclusive.
    pub last_col: usize,
}

impl Loc {
    pub fn new(line: usize, first_col: usize, last_col: usize) -> Self {
        Loc {
            line,
            first_col,
            last_col,
        }
    }

    pub fn col(line: usize, col: usize) -> Self {
        Loc::new(line, col, col)
    }

    /// Span covering both locations.
    pub fn to(self, other: Loc) -> Loc {
        Loc {
            line: self.line,
            first_col: self.first_col.min(other.first_col),
            last_col: self.last_col.max(other.last_col),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single error or warning with optional location and hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub loc: Option<Loc>,
    pub message: String,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn error(loc: Loc, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            loc: Some(loc),
            message: message.into(),
            hint: None,
        }
    }

    /// An error with no usable location (e.g. unexpected end of input).
    pub fn error_no_loc(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            loc: None,
            message: message.into(),
            hint: None,
        }
    }

    pub fn warning(loc: Loc, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            loc: Some(loc),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Render with the echoed input line and a caret pointing at the
    /// offending column. `echo_input` is false while printing macro
    /// expansion errors, whose carets align with the printed trace instead.
    pub fn render(&self, input_line: Option<&str>, echo_input: bool) -> String {
        let mut out = String::new();
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match self.loc {
            Some(loc) => {
                if echo_input
                    && let Some(line) = input_line
                {
                    out.push_str(line);
                    out.push('\n');
                }
                for _ in 0..loc.first_col {
                    out.push(' ');
                }
                out.push_str("^\n");
                out.push_str(&format!("{}: {}: {}", loc.first_col + 1, sev, self.message));
            }
            None => {
                out.push_str(&format!("{}: {}", sev, self.message));
            }
        }
        if let Some(hint) = &self.hint {
            out.push_str("; hint: ");
            out.push_str(hint);
        }
        out
    }
}

/// `Display` shows just the `error: message; hint: ...` line; the REPL uses
/// [`Diagnostic::render`] for the full caret form.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", sev, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {}", hint)?;
        }
        Ok(())
    }
}
