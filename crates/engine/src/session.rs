//! One interactive session: the persistent tables, the options record,
//! and the command dispatcher.
//!
//! `eval` takes one line of input and produces the text to print plus any
//! diagnostics, leaving rendering (colors, carets, echo) to the caller.
//! All state a command can touch lives on the session, so an embedder can
//! run several sessions independently.

use crate::check::{self, CheckMode};
use crate::diag::{Diagnostic, Loc};
use crate::english::to_english;
use crate::gibberish::{to_gibberish, type_to_gibberish};
use crate::lexer::{self, Token};
use crate::options::Options;
use crate::parse::{self, Parsed};
use crate::preproc::token::{plex, tokens_to_string};
use crate::preproc::{MacroTable, Param};
use crate::typedefs::TypedefTable;
use crate::types::{TS_TYPEDEF, minus};
use tracing::debug;

/// The result of evaluating one command.
#[derive(Debug, Default)]
pub struct EvalOutput {
    /// Text to print, already newline-joined (may be empty).
    pub text: String,
    /// Errors and warnings, in emission order.
    pub diags: Vec<Diagnostic>,
    /// False while printing macro-expansion errors, whose carets align
    /// with the printed trace rather than the input line.
    pub echo_input: bool,
    /// The user asked to leave.
    pub quit: bool,
    /// The user asked for help; the payload is the topic.
    pub help: Option<String>,
}

impl EvalOutput {
    fn new() -> Self {
        EvalOutput {
            echo_input: true,
            ..EvalOutput::default()
        }
    }

    fn error(mut self, d: Diagnostic) -> Self {
        self.diags.push(d);
        self
    }

    pub fn ok(&self) -> bool {
        !self
            .diags
            .iter()
            .any(|d| d.severity == crate::diag::Severity::Error)
    }
}

/// Process-wide state, bundled so it is not actually process-wide.
#[derive(Debug, Default)]
pub struct Session {
    pub opts: Options,
    pub typedefs: TypedefTable,
    pub macros: MacroTable,
}

impl Session {
    pub fn new() -> Self {
        Session {
            opts: Options::default(),
            typedefs: TypedefTable::with_predefined(),
            macros: MacroTable::with_predefined(),
        }
    }

    /// Evaluates one line of input.
    pub fn eval(&mut self, input: &str) -> EvalOutput {
        let line = input.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return EvalOutput::new();
        }
        debug!(command = %trimmed, "eval");

        if let Some(directive) = trimmed.strip_prefix('#') {
            return self.eval_directive(directive, line.len() - trimmed.len() + 1);
        }
        if trimmed.starts_with('(') {
            return self.eval_c_cast(line);
        }

        let first: String = trimmed
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '?')
            .collect();
        let tail_start = line.len() - trimmed.len() + first.len();
        let tail = &line[tail_start..];

        match first.as_str() {
            "declare" => self.eval_declare(tail, tail_start, false),
            "define" => self.eval_declare(tail, tail_start, true),
            "explain" => self.eval_explain(tail, tail_start),
            "cast" => self.eval_cast_english(tail, tail_start),
            "set" => self.eval_set(tail, tail_start),
            "show" => self.eval_show(tail, tail_start),
            "expand" => self.eval_expand(tail, tail_start),
            "typedef" => self.eval_explain(line, 0),
            "help" | "?" => {
                let mut out = EvalOutput::new();
                out.help = Some(tail.trim().to_string());
                out
            }
            "quit" | "exit" | "q" => {
                let mut out = EvalOutput::new();
                out.quit = true;
                out
            }
            _ if self.opts.explain_by_default => self.eval_explain(line, 0),
            _ => EvalOutput::new().error(Diagnostic::error(
                Loc::new(0, 0, first.len().saturating_sub(1)),
                format!("\"{}\": unknown command", first),
            )),
        }
    }

    // ----------------------------------------------------------------
    // declare / define
    // ----------------------------------------------------------------

    fn eval_declare(&mut self, tail: &str, offset: usize, is_define: bool) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_english(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let parsed = match parse::english::parse_declare(&toks, self.opts.lang, &self.typedefs) {
            Ok(p) => p,
            Err(d) => return out.error(d),
        };
        let mut lines = Vec::new();
        for root in &parsed.roots {
            match check::check(
                &parsed.arena,
                *root,
                self.opts.lang,
                CheckMode::Declaration,
                parsed.implicit_int,
                true,
            ) {
                Ok(warns) => out.diags.extend(warns),
                Err(e) => return out.error(e),
            }
            let node = parsed.arena.node(*root);
            if is_define || node.bits.has(TS_TYPEDEF) {
                let name = node.sname.to_string();
                if let Err(e) = self.define_typedef(&parsed, *root, &name) {
                    return out.error(e);
                }
                continue;
            }
            lines.push(to_gibberish(&parsed.arena, *root, self.opts.style()));
            if self.opts.debug {
                let mut dump = String::new();
                parsed.arena.dump(*root, &mut dump, 0);
                lines.push(dump.trim_end().to_string());
            }
        }
        out.text = lines.join("\n");
        out
    }

    fn define_typedef(
        &mut self,
        parsed: &Parsed,
        root: crate::ast::AstId,
        name: &str,
    ) -> Result<(), Diagnostic> {
        if name.is_empty() {
            return Err(Diagnostic::error_no_loc("name expected"));
        }
        self.typedefs.define(name, &parsed.arena, root, parsed.arena.node(root).loc)
    }

    // ----------------------------------------------------------------
    // explain
    // ----------------------------------------------------------------

    fn eval_explain(&mut self, tail: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_c(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        if toks.is_empty() {
            return out.error(Diagnostic::error_no_loc("declaration expected"));
        }
        let parsed = match parse::gibberish::parse_decl(&toks, self.opts.lang, &self.typedefs) {
            Ok(p) => p,
            Err(d) => return out.error(d),
        };
        let mut lines = Vec::new();
        for root in &parsed.roots {
            match check::check(
                &parsed.arena,
                *root,
                self.opts.lang,
                CheckMode::Declaration,
                parsed.implicit_int,
                false,
            ) {
                Ok(warns) => out.diags.extend(warns),
                Err(e) => return out.error(e),
            }
            let node = parsed.arena.node(*root);
            let name = node.sname.to_string();
            if node.bits.has(TS_TYPEDEF) {
                // A typedef declaration: record it and phrase it as a
                // definition.
                if let Err(e) = self.define_typedef(&parsed, *root, &name) {
                    return out.error(e);
                }
                let shown = self.english_without_typedef(&parsed, *root);
                lines.push(format!("define {} as {}", name, shown));
                continue;
            }
            if name.is_empty() {
                return out.error(Diagnostic::error_no_loc("name expected"));
            }
            lines.push(format!("declare {} as {}", name, to_english(&parsed.arena, *root)));
            if self.opts.debug {
                let mut dump = String::new();
                parsed.arena.dump(*root, &mut dump, 0);
                lines.push(dump.trim_end().to_string());
            }
        }
        out.text = lines.join("\n");
        out
    }

    /// English rendering with the `typedef` storage word suppressed.
    fn english_without_typedef(&self, parsed: &Parsed, root: crate::ast::AstId) -> String {
        let mut copy = crate::ast::Arena::new();
        let new_root = parsed.arena.deep_copy_into(root, &mut copy);
        let bits = &mut copy.node_mut(new_root).bits;
        bits.store = minus(bits.store, TS_TYPEDEF);
        if bits.store & crate::types::VALUE_MASK == 0 {
            bits.store = 0;
        }
        to_english(&copy, new_root)
    }

    // ----------------------------------------------------------------
    // cast
    // ----------------------------------------------------------------

    fn eval_cast_english(&mut self, tail: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_english(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let (parsed, castee) =
            match parse::english::parse_cast_into(&toks, self.opts.lang, &self.typedefs) {
                Ok(r) => r,
                Err(d) => return out.error(d),
            };
        match check::check(
            &parsed.arena,
            parsed.roots[0],
            self.opts.lang,
            CheckMode::Cast,
            false,
            true,
        ) {
            Ok(warns) => out.diags.extend(warns),
            Err(e) => return out.error(e),
        }
        let ty = type_to_gibberish(&parsed.arena, parsed.roots[0], self.opts.style());
        out.text = format!("({}){}", ty, castee.unwrap_or_default());
        out
    }

    fn eval_c_cast(&mut self, line: &str) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_c(line, 0) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let (parsed, castee) =
            match parse::gibberish::parse_cast(&toks, self.opts.lang, &self.typedefs) {
                Ok(r) => r,
                Err(d) => return out.error(d),
            };
        match check::check(
            &parsed.arena,
            parsed.roots[0],
            self.opts.lang,
            CheckMode::Cast,
            parsed.implicit_int,
            false,
        ) {
            Ok(warns) => out.diags.extend(warns),
            Err(e) => return out.error(e),
        }
        let english = to_english(&parsed.arena, parsed.roots[0]);
        out.text = match castee {
            Some(name) => format!("cast {} into {}", name, english),
            None => format!("cast into {}", english),
        };
        out
    }

    // ----------------------------------------------------------------
    // set / show
    // ----------------------------------------------------------------

    fn eval_set(&mut self, tail: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_english(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        match self.opts.set(&toks) {
            Ok(Some(text)) => out.text = text,
            Ok(None) => {}
            Err(d) => return out.error(d),
        }
        out
    }

    fn eval_show(&mut self, tail: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match self.lex_english(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let what = toks.first().map(|t| t.text.as_str()).unwrap_or("all");
        let mut lines = Vec::new();
        match what {
            "all" | "predefined" | "user" => {
                let user_only = what == "user";
                let predefined_only = what == "predefined";
                for td in self.typedefs.iter() {
                    if (user_only && !td.user_defined) || (predefined_only && td.user_defined) {
                        continue;
                    }
                    lines.push(format!(
                        "define {} as {}",
                        td.name,
                        to_english(&td.arena, td.root)
                    ));
                }
                for m in self.macros.iter() {
                    let predefined = m.dynamic.is_some();
                    if (user_only && predefined) || (predefined_only && !predefined) {
                        continue;
                    }
                    lines.push(show_macro(m));
                }
            }
            name => {
                if let Some(td) = self.typedefs.lookup(name) {
                    lines.push(format!(
                        "define {} as {}",
                        td.name,
                        to_english(&td.arena, td.root)
                    ));
                } else if let Some(m) = self.macros.lookup(name) {
                    lines.push(show_macro(m));
                } else {
                    return out.error(Diagnostic::error(
                        toks[0].loc,
                        format!("\"{}\": not defined as a type or macro", name),
                    ));
                }
            }
        }
        out.text = lines.join("\n");
        out
    }

    // ----------------------------------------------------------------
    // preprocessor commands
    // ----------------------------------------------------------------

    fn eval_directive(&mut self, directive: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let trimmed = directive.trim_start();
        let extra = directive.len() - trimmed.len();
        if let Some(rest) = trimmed.strip_prefix("define") {
            return self.eval_define_macro(rest, offset + extra + "define".len());
        }
        if let Some(rest) = trimmed.strip_prefix("undef") {
            let name = rest.trim();
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return out.error(Diagnostic::error(
                    Loc::col(0, offset),
                    "macro name expected",
                ));
            }
            let col = offset + extra + "undef".len() + (rest.len() - rest.trim_start().len());
            if let Err(e) = self
                .macros
                .undef(name, Loc::new(0, col, col + name.len() - 1))
            {
                return out.error(e);
            }
            return out;
        }
        out.error(Diagnostic::error(
            Loc::col(0, offset),
            "expected \"define\" or \"undef\"",
        ))
    }

    fn eval_define_macro(&mut self, rest: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        let toks = match plex(rest, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let mut i = 0;
        while toks.get(i).is_some_and(|t| t.is_space()) {
            i += 1;
        }
        let Some(name_tok) = toks.get(i) else {
            return out.error(Diagnostic::error(Loc::col(0, offset), "macro name expected"));
        };
        if name_tok.kind != crate::preproc::token::PTokKind::Ident {
            return out.error(Diagnostic::error(name_tok.loc, "macro name expected"));
        }
        let name = name_tok.text.clone();
        let name_loc = name_tok.loc;
        i += 1;

        // Function-like only when `(` immediately follows the name.
        let mut params = None;
        if toks.get(i).is_some_and(|t| t.text == "(" && !t.is_space()) {
            i += 1;
            let mut ps: Vec<Param> = Vec::new();
            loop {
                while toks.get(i).is_some_and(|t| t.is_space()) {
                    i += 1;
                }
                let Some(t) = toks.get(i) else {
                    return out.error(Diagnostic::error(name_loc, "\")\" expected"));
                };
                match t.text.as_str() {
                    ")" => {
                        i += 1;
                        break;
                    }
                    "," => {
                        i += 1;
                    }
                    _ => {
                        let is_ident = t.kind == crate::preproc::token::PTokKind::Ident;
                        let is_ellipsis = t.text == "."
                            && toks.get(i + 1).is_some_and(|a| a.text == ".")
                            && toks.get(i + 2).is_some_and(|a| a.text == ".");
                        if is_ellipsis {
                            ps.push(Param {
                                name: "...".to_string(),
                                loc: t.loc,
                            });
                            i += 3;
                        } else if is_ident {
                            ps.push(Param {
                                name: t.text.clone(),
                                loc: t.loc,
                            });
                            i += 1;
                        } else {
                            return out.error(Diagnostic::error(
                                t.loc,
                                format!("\"{}\": macro parameter expected", t.text),
                            ));
                        }
                    }
                }
            }
            params = Some(ps);
        }

        let repl = toks[i..].to_vec();
        match self
            .macros
            .define(&name, name_loc, params, repl, self.opts.lang)
        {
            Ok(Some(warning)) => out.diags.push(warning),
            Ok(None) => {}
            Err(e) => return out.error(e),
        }
        out
    }

    fn eval_expand(&mut self, tail: &str, offset: usize) -> EvalOutput {
        let mut out = EvalOutput::new();
        // Carets for expansion diagnostics point into the printed trace,
        // not the echoed input.
        out.echo_input = false;
        let toks = match plex(tail, offset) {
            Ok(t) => t,
            Err(d) => return out.error(d),
        };
        let mut i = 0;
        while toks.get(i).is_some_and(|t| t.is_space()) {
            i += 1;
        }
        let Some(name_tok) = toks.get(i) else {
            return out.error(Diagnostic::error(Loc::col(0, offset), "macro name expected"));
        };
        if name_tok.kind != crate::preproc::token::PTokKind::Ident {
            return out.error(Diagnostic::error(name_tok.loc, "macro name expected"));
        }
        match crate::preproc::expand::expand_command(
            &self.macros,
            self.opts.lang,
            &name_tok.text,
            name_tok.loc,
            &toks[i + 1..],
        ) {
            Ok(expansion) => {
                out.text = expansion.trace.trim_end().to_string();
                out.diags.extend(expansion.warnings);
            }
            Err(e) => return out.error(e),
        }
        out
    }

    // ----------------------------------------------------------------
    // lexing helpers
    // ----------------------------------------------------------------

    fn lex_c(&self, text: &str, offset: usize) -> Result<Vec<Token>, Diagnostic> {
        match lexer::tokenize(text, self.opts.lex_opts()) {
            Ok(toks) => Ok(shift(toks, offset)),
            Err(d) => Err(shift_diag(d, offset)),
        }
    }

    fn lex_english(&self, text: &str, offset: usize) -> Result<Vec<Token>, Diagnostic> {
        match lexer::tokenize(text, self.opts.lex_opts().english()) {
            Ok(toks) => Ok(shift(toks, offset)),
            Err(d) => Err(shift_diag(d, offset)),
        }
    }
}

fn shift_diag(mut d: Diagnostic, offset: usize) -> Diagnostic {
    if let Some(loc) = &mut d.loc {
        loc.first_col += offset;
        loc.last_col += offset;
    }
    d
}

fn shift(mut toks: Vec<Token>, offset: usize) -> Vec<Token> {
    for t in &mut toks {
        t.loc.first_col += offset;
        t.loc.last_col += offset;
    }
    toks
}

/// `show`'s rendering of one macro definition.
fn show_macro(m: &crate::preproc::Macro) -> String {
    let mut line = format!("#define {}", m.name);
    if let Some(params) = &m.params {
        line.push('(');
        line.push_str(
            &params
                .iter()
                .map(|p| p.name.clone())
                .collect::<Vec<_>>()
                .join(", "),
        );
        line.push(')');
    }
    if m.dynamic.is_some() {
        line.push_str(" /* dynamic */");
    } else if !m.repl.is_empty() {
        line.push(' ');
        line.push_str(&tokens_to_string(&m.repl));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(session: &mut Session, input: &str) -> EvalOutput {
        session.eval(input)
    }

    #[test]
    fn test_explain_pointer_to_array() {
        let mut s = Session::new();
        let out = eval(&mut s, "explain int (*x)[5]");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "declare x as pointer to array 5 of int");
    }

    #[test]
    fn test_declare_function() {
        let mut s = Session::new();
        let out = eval(
            &mut s,
            "declare f as function (int, char const *) returning pointer to int",
        );
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "int *f(int, char const *)");
    }

    #[test]
    fn test_explain_array_of_pointer() {
        let mut s = Session::new();
        let out = eval(&mut s, "explain int *a[5]");
        assert_eq!(out.text, "declare a as array 5 of pointer to int");
    }

    #[test]
    fn test_set_then_declare_variadic() {
        let mut s = Session::new();
        assert!(eval(&mut s, "set c99").ok());
        let out = eval(
            &mut s,
            "declare p as pointer to function (int, ...) returning void",
        );
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "void (*p)(int, ...)");
    }

    #[test]
    fn test_cpp_reference_function() {
        let mut s = Session::new();
        assert!(eval(&mut s, "set c++11").ok());
        let out = eval(
            &mut s,
            "declare f as function (int) returning reference to int",
        );
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "int &f(int)");
    }

    #[test]
    fn test_explain_static_array() {
        let mut s = Session::new();
        let out = eval(&mut s, "explain static int x[4]");
        assert_eq!(out.text, "declare x as static array 4 of int");
    }

    #[test]
    fn test_macro_round() {
        let mut s = Session::new();
        assert!(eval(&mut s, "#define SQ(x) ((x)*(x))").ok());
        let out = eval(&mut s, "expand SQ(a+b)");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert!(out.text.contains("SQ(a+b) => ((x)*(x))"));
        assert!(out.text.contains("SQ(a+b) => ((a+b)*(a+b))"));
        assert!(!out.echo_input);
    }

    #[test]
    fn test_array_of_void_hint() {
        let mut s = Session::new();
        let out = eval(&mut s, "declare x as array of void");
        assert!(!out.ok());
        let err = &out.diags[0];
        assert!(err.message.contains("array of void"));
        assert_eq!(err.hint.as_deref(), Some("array of pointer to void"));
    }

    #[test]
    fn test_cast_english() {
        let mut s = Session::new();
        let out = eval(&mut s, "cast p into pointer to function returning int");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "(int (*)())p");
    }

    #[test]
    fn test_c_cast_explained() {
        let mut s = Session::new();
        let out = eval(&mut s, "(int *)p");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "cast p into pointer to int");
    }

    #[test]
    fn test_define_typedef_and_use() {
        let mut s = Session::new();
        assert!(eval(&mut s, "define word as unsigned int").ok());
        let out = eval(&mut s, "explain word w");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "declare w as word");
    }

    #[test]
    fn test_explain_typedef_records() {
        let mut s = Session::new();
        let out = eval(&mut s, "explain typedef unsigned long ulong");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert!(out.text.contains("define ulong as unsigned long int"));
        assert!(s.typedefs.is_typedef("ulong"));
    }

    #[test]
    fn test_explain_by_default() {
        let mut s = Session::new();
        let out = eval(&mut s, "int *p");
        assert!(out.ok(), "diags: {:?}", out.diags);
        assert_eq!(out.text, "declare p as pointer to int");
    }

    #[test]
    fn test_undef_and_show() {
        let mut s = Session::new();
        assert!(eval(&mut s, "#define N 42").ok());
        let out = eval(&mut s, "show N");
        assert_eq!(out.text, "#define N 42");
        assert!(eval(&mut s, "#undef N").ok());
        assert!(!eval(&mut s, "show N").ok());
    }

    #[test]
    fn test_quit() {
        let mut s = Session::new();
        assert!(eval(&mut s, "quit").quit);
        assert!(eval(&mut s, "exit").quit);
    }

    #[test]
    fn test_blank_line() {
        let mut s = Session::new();
        let out = eval(&mut s, "   ");
        assert!(out.ok());
        assert!(out.text.is_empty());
    }

    #[test]
    fn test_language_gate() {
        let mut s = Session::new();
        assert!(eval(&mut s, "set c89").ok());
        let out = eval(&mut s, "explain _Bool b");
        assert!(!out.ok());
    }

    #[test]
    fn test_redefine_macro_warns() {
        let mut s = Session::new();
        assert!(eval(&mut s, "#define A 1").ok());
        let out = eval(&mut s, "#define A 2");
        assert!(out.ok());
        assert!(out.diags[0].message.contains("redefined"));
    }

    #[test]
    fn test_west_const_output() {
        let mut s = Session::new();
        assert!(eval(&mut s, "set west-const").ok());
        let out = eval(&mut s, "declare p as pointer to constant char");
        assert_eq!(out.text, "const char *p");
    }
}
