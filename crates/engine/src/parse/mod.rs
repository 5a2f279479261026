//! Parsers for the two declaration grammars.
//!
//! `gibberish` parses C/C++ declaration syntax (the `explain` command and
//! C-syntax casts); `english` parses the pseudo-English phrase language
//! (`declare`, `cast ... into`, `define`). Both build ASTs in a fresh
//! arena owned by the parse and hand the finished roots to the caller;
//! on error the arena is simply dropped.

pub mod english;
pub mod gibberish;

use crate::ast::{Arena, AstId};
use crate::diag::{Diagnostic, Loc};
use crate::lexer::Token;

/// A finished parse: the arena owning all nodes, and the root of each
/// declarator (a comma declaration like `int x, *y` has several).
#[derive(Debug)]
pub struct Parsed {
    pub arena: Arena,
    pub roots: Vec<AstId>,
    /// True when the specifier had no base type at all and `int` was
    /// assumed; the checker rejects or warns depending on dialect.
    pub implicit_int: bool,
}

/// Cursor over the token stream shared by both grammars.
pub struct Tokens<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(toks: &'a [Token]) -> Self {
        Tokens { toks, pos: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }

    pub fn peek_at(&self, n: usize) -> Option<&'a Token> {
        self.toks.get(self.pos + n)
    }

    pub fn peek_is(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    pub fn next(&mut self) -> Option<&'a Token> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Consumes the next token if it matches.
    pub fn eat(&mut self, text: &str) -> bool {
        if self.peek_is(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Requires the next token to match.
    pub fn expect(&mut self, text: &str) -> Result<&'a Token, Diagnostic> {
        match self.peek() {
            Some(t) if t.is(text) => {
                self.pos += 1;
                Ok(t)
            }
            Some(t) => Err(Diagnostic::error(
                t.loc,
                format!("\"{}\": expected \"{}\"", t.text, text),
            )),
            None => Err(Diagnostic::error(
                self.last_loc(),
                format!("expected \"{}\"", text),
            )),
        }
    }

    /// Location of the current token, or of the end of input.
    pub fn loc(&self) -> Loc {
        match self.peek() {
            Some(t) => t.loc,
            None => self.last_loc(),
        }
    }

    /// Location just past the final token.
    pub fn last_loc(&self) -> Loc {
        match self.toks.last() {
            Some(t) => Loc::col(t.loc.line, t.loc.last_col + 1),
            None => Loc::col(0, 0),
        }
    }

    /// The backing token slice, for span extraction.
    pub fn backing(&self) -> &'a [Token] {
        self.toks
    }

    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }
}

/// "unexpected token" / "name expected" helpers shared by the grammars.
pub fn unexpected(tok: Option<&Token>, last: Loc) -> Diagnostic {
    match tok {
        Some(t) => Diagnostic::error(t.loc, format!("\"{}\": unexpected token", t.text)),
        None => Diagnostic::error(last, "unexpected end of input"),
    }
}

pub fn name_expected(tok: Option<&Token>, last: Loc) -> Diagnostic {
    match tok {
        Some(t) => Diagnostic::error(t.loc, format!("\"{}\": name expected", t.text)),
        None => Diagnostic::error(last, "name expected"),
    }
}
