//! Macro expansion with a printed trace.
//!
//! One `Mex` exists per macro invocation being expanded. Within an
//! invocation the passes run in order: stringify (`#`), parameter
//! substitution (with per-parameter pre-expansion, cached), `__VA_ARGS__`
//! and `__VA_OPT__`, concatenation (`##`), then a rescan loop that expands
//! nested macros until a pass changes nothing. Each pass that changed the
//! token list prints a `name(args) => tokens` line; nested expansions are
//! indented one `| ` per level.
//!
//! The self-reference guard: every invocation carries the set of macro
//! names currently being expanded up the chain. An identifier naming a
//! member of that set is marked ineligible and warned about once, and is
//! never expanded again, which is what terminates `#define A B` /
//! `#define B A`.

use super::token::{self, PTokKind, PToken, tokens_to_string, trim_spaces};
use super::{Macro, MacroTable};
use crate::diag::{Diagnostic, Loc};
use crate::lang::Lang;
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Abort suspected infinite recursion past this nesting.
const DEPTH_MAX: usize = 50;

/// Result of an `expand` command.
#[derive(Debug)]
pub struct Expansion {
    /// The printed trace, one line per pass.
    pub trace: String,
    pub warnings: Vec<Diagnostic>,
    /// The fully expanded token list.
    pub tokens: Vec<PToken>,
}

/// Expands `name` (with `rest` holding everything after it: an optional
/// parenthesized argument list plus extra tokens) and renders the trace.
pub fn expand_command(
    table: &MacroTable,
    lang: Lang,
    name: &str,
    name_loc: Loc,
    rest: &[PToken],
) -> Result<Expansion, Diagnostic> {
    let Some(m) = table.lookup(name) else {
        return Err(Diagnostic::error(
            name_loc,
            format!("\"{}\": macro not defined", name),
        ));
    };

    let mut out = String::new();
    let mut warnings = Vec::new();
    let mut warned = HashSet::new();
    let mut mex = Mex {
        table,
        lang,
        expanding: HashSet::new(),
        warned: &mut warned,
        indent: 0,
        out: &mut out,
        warnings: &mut warnings,
        depth: 0,
    };

    let mut rest_idx = 0usize;
    let (tokens, label) = if let Some(value) = m.dynamic {
        let (value, valid_in) = value(lang);
        if !valid_in.contains(lang) || value.is_none() {
            mex.warnings.push(Diagnostic::warning(
                name_loc,
                format!("\"{}\" is not predefined in {}", name, lang),
            ));
        }
        let toks = match value {
            Some(v) => token::plex(&v, 0)?,
            None => vec![PToken::new(PTokKind::Ident, name, name_loc)],
        };
        mex.print_line(name, &toks);
        (toks, name.to_string())
    } else if m.is_function_like() {
        let open = skip_spaces(rest, 0);
        if rest.get(open).map(|t| t.text.as_str()) != Some("(") {
            return Err(Diagnostic::error(
                name_loc,
                format!("\"{}\": function-like macro requires arguments", name),
            ));
        }
        let (args, after) = parse_args(rest, open, name)?;
        check_arg_count(m, &args, name_loc)?;
        rest_idx = after;
        let label = format!("{}({})", name, args_label(&args));
        mex.expanding.insert(name.to_string());
        let toks = mex.expand_invocation(m, Some(&args), &label)?;
        (toks, label)
    } else {
        mex.expanding.insert(name.to_string());
        let toks = mex.expand_invocation(m, None, name)?;
        (toks, name.to_string())
    };

    // Extra tokens after the invocation ride along verbatim.
    let mut tokens = tokens;
    let leftover = &rest[skip_spaces(rest, rest_idx)..];
    if !leftover.is_empty() {
        tokens.push(PToken::space(name_loc));
        tokens.extend(leftover.iter().cloned());
        mex.print_line(&label, &tokens);
    }

    Ok(Expansion {
        trace: out,
        warnings,
        tokens,
    })
}

struct Mex<'a> {
    table: &'a MacroTable,
    lang: Lang,
    /// Macros being expanded by this invocation and its ancestors.
    expanding: HashSet<String>,
    /// Names already warned about as non-expanding, process-wide per
    /// command.
    warned: &'a mut HashSet<String>,
    indent: usize,
    out: &'a mut String,
    warnings: &'a mut Vec<Diagnostic>,
    depth: usize,
}

impl<'a> Mex<'a> {
    /// Prints one `label => tokens` trace line without relocating.
    fn print_line(&mut self, label: &str, toks: &[PToken]) {
        let mut line = String::new();
        for _ in 0..self.indent {
            line.push_str("| ");
        }
        line.push_str(label);
        line.push_str(" => ");
        line.push_str(tokens_to_string(toks).trim_end());
        self.out.push_str(&line);
        self.out.push('\n');
    }

    /// Like `print_line` but also rewrites each token's location to its
    /// printed column.
    fn print_and_relocate(&mut self, label: &str, toks: &mut [PToken]) {
        let mut prefix = String::new();
        for _ in 0..self.indent {
            prefix.push_str("| ");
        }
        prefix.push_str(label);
        prefix.push_str(" => ");
        let mut col = prefix.len();
        for t in toks.iter_mut() {
            let len = t.text.chars().count();
            t.loc = Loc::new(0, col, col + len.saturating_sub(1));
            col += len;
        }
        self.out.push_str(&prefix);
        self.out.push_str(tokens_to_string(toks).trim_end());
        self.out.push('\n');
    }

    fn child(&mut self) -> Mex<'_> {
        Mex {
            table: self.table,
            lang: self.lang,
            expanding: self.expanding.clone(),
            warned: &mut *self.warned,
            indent: self.indent + 1,
            out: &mut *self.out,
            warnings: &mut *self.warnings,
            depth: self.depth + 1,
        }
    }

    /// Runs every pass for one invocation and returns the final tokens.
    fn expand_invocation(
        &mut self,
        m: &Macro,
        args: Option<&[Vec<PToken>]>,
        label: &str,
    ) -> Result<Vec<PToken>, Diagnostic> {
        if self.depth > DEPTH_MAX {
            return Err(Diagnostic::error(
                m.loc,
                format!("\"{}\": suspected infinite recursion", m.name),
            ));
        }
        trace!(name = %m.name, depth = self.depth, "expand");

        let mut cur = m.repl.clone();
        self.print_and_relocate(label, &mut cur);

        if let Some(args) = args {
            let next = self.stringify_pass(m, args, &cur)?;
            if next != cur {
                cur = next;
                self.print_and_relocate(label, &mut cur);
            }
            let next = self.subst_pass(m, args, &cur)?;
            if next != cur {
                cur = next;
                self.print_and_relocate(label, &mut cur);
            }
        } else if cur.iter().any(|t| t.kind == PTokKind::Stringify)
            && self.warned.insert(format!("#:{}", m.name))
        {
            self.warnings.push(Diagnostic::warning(
                m.loc,
                "\"#\" in an object-like macro is not an operator",
            ));
        }

        let next = self.concat_pass(&cur)?;
        if next != cur {
            cur = next;
            self.print_and_relocate(label, &mut cur);
        }

        loop {
            let (next, changed) = self.rescan_pass(&cur)?;
            if !changed {
                break;
            }
            cur = next;
            self.print_and_relocate(label, &mut cur);
        }

        cur.retain(|t| !t.is_placemarker());
        cur.dedup_by(|b, a| a.is_space() && b.is_space());
        trim_spaces(&mut cur);
        Ok(cur)
    }

    // ----------------------------------------------------------------
    // Pass 1: stringify
    // ----------------------------------------------------------------

    fn stringify_pass(
        &mut self,
        m: &Macro,
        args: &[Vec<PToken>],
        toks: &[PToken],
    ) -> Result<Vec<PToken>, Diagnostic> {
        let mut out: Vec<PToken> = Vec::with_capacity(toks.len());
        let mut i = 0;
        while i < toks.len() {
            let t = &toks[i];
            if t.kind != PTokKind::Stringify {
                out.push(t.clone());
                i += 1;
                continue;
            }
            let j = skip_spaces(toks, i + 1);
            let operand = &toks[j];
            let content = match operand.kind {
                PTokKind::Ident => {
                    let idx = param_index(m, &operand.text)
                        .expect("definition check guarantees a parameter");
                    token::stringify(&args[idx])
                }
                PTokKind::VaArgs => token::stringify(&self.va_args_tokens(m, args)),
                PTokKind::VaOpt => {
                    let (content, after) = va_opt_content(toks, j)?;
                    let text = if self.va_args_tokens(m, args).is_empty() {
                        "\"\"".to_string()
                    } else {
                        token::stringify(&self.substitute_raw(m, args, &content))
                    };
                    let mut tok = PToken::new(PTokKind::StrLit, text, t.loc);
                    tok.is_substituted = true;
                    out.push(tok);
                    i = after;
                    continue;
                }
                _ => unreachable!("definition check rejects other operands"),
            };
            let mut tok = PToken::new(PTokKind::StrLit, content, t.loc);
            tok.is_substituted = true;
            out.push(tok);
            i = j + 1;
        }
        Ok(out)
    }

    // ----------------------------------------------------------------
    // Pass 2: parameter / __VA_ARGS__ / __VA_OPT__ substitution
    // ----------------------------------------------------------------

    fn subst_pass(
        &mut self,
        m: &Macro,
        args: &[Vec<PToken>],
        toks: &[PToken],
    ) -> Result<Vec<PToken>, Diagnostic> {
        let mut cache: HashMap<usize, Vec<PToken>> = HashMap::new();
        let mut printed_va = false;
        let mut out: Vec<PToken> = Vec::with_capacity(toks.len());
        let mut i = 0;
        while i < toks.len() {
            let t = &toks[i];
            match t.kind {
                PTokKind::Ident => {
                    if let Some(idx) = param_index(m, &t.text) {
                        let replacement = if adjacent_to_operator(toks, i) {
                            args[idx].clone()
                        } else {
                            self.pre_expanded(m, args, idx, &mut cache)?
                        };
                        push_substituted(&mut out, replacement, t.loc);
                        i += 1;
                        continue;
                    }
                    out.push(t.clone());
                }
                PTokKind::VaArgs => {
                    let va = self.va_args_tokens(m, args);
                    if !printed_va {
                        let mut shown = va.clone();
                        let mut sub = self.child();
                        sub.print_and_relocate("__VA_ARGS__", &mut shown);
                        printed_va = true;
                    }
                    let replacement = if adjacent_to_operator(toks, i) {
                        va
                    } else {
                        let mut sub = self.child();
                        sub.expand_list(va)?
                    };
                    push_substituted(&mut out, replacement, t.loc);
                }
                PTokKind::VaOpt => {
                    let (content, after) = va_opt_content(toks, i)?;
                    if self.va_args_tokens(m, args).is_empty() {
                        out.push(PToken::placemarker(t.loc));
                    } else {
                        // The content is substituted under the same rules;
                        // splice it into the stream and keep scanning.
                        let rest = toks[after..].to_vec();
                        let mut rescanned = content;
                        rescanned.extend(rest);
                        let sub = self.subst_pass(m, args, &rescanned)?;
                        out.extend(sub);
                        return Ok(out);
                    }
                    i = after;
                    continue;
                }
                _ => out.push(t.clone()),
            }
            i += 1;
        }
        Ok(out)
    }

    /// Parameter substitution with no pre-expansion and no `__VA_OPT__`
    /// recursion; used for the `#__VA_OPT__(...)` content.
    fn substitute_raw(&self, m: &Macro, args: &[Vec<PToken>], toks: &[PToken]) -> Vec<PToken> {
        let mut out = Vec::with_capacity(toks.len());
        for t in toks {
            if t.kind == PTokKind::Ident
                && let Some(idx) = param_index(m, &t.text)
            {
                out.extend(args[idx].iter().cloned());
            } else if t.kind == PTokKind::VaArgs {
                out.extend(self.va_args_tokens(m, args));
            } else {
                out.push(t.clone());
            }
        }
        out
    }

    /// The trailing arguments bound to `...`, comma-joined.
    fn va_args_tokens(&self, m: &Macro, args: &[Vec<PToken>]) -> Vec<PToken> {
        let fixed = m.fixed_param_count();
        let mut out = Vec::new();
        for (n, arg) in args.iter().skip(fixed).enumerate() {
            if n > 0 {
                out.push(PToken::new(PTokKind::Punct, ",", Loc::col(0, 0)));
            }
            out.extend(arg.iter().filter(|t| !t.is_placemarker()).cloned());
        }
        out
    }

    /// Pre-expands argument `idx` once per invocation, printing the
    /// pre-expansion as a sub-tree when it changed anything.
    fn pre_expanded(
        &mut self,
        m: &Macro,
        args: &[Vec<PToken>],
        idx: usize,
        cache: &mut HashMap<usize, Vec<PToken>>,
    ) -> Result<Vec<PToken>, Diagnostic> {
        if let Some(hit) = cache.get(&idx) {
            return Ok(hit.clone());
        }
        let raw = args[idx].clone();
        let mut sub = self.child();
        let expanded = sub.expand_list(raw.clone())?;
        if tokens_to_string(&expanded) != tokens_to_string(&raw) {
            let name = m
                .params
                .as_ref()
                .and_then(|ps| ps.get(idx))
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let mut shown = expanded.clone();
            let mut sub = self.child();
            sub.print_and_relocate(&name, &mut shown);
        }
        cache.insert(idx, expanded.clone());
        Ok(expanded)
    }

    /// Fully expands a free-standing token list (an argument); just the
    /// rescan loop, since there is no enclosing macro.
    fn expand_list(&mut self, mut toks: Vec<PToken>) -> Result<Vec<PToken>, Diagnostic> {
        if self.depth > DEPTH_MAX {
            return Err(Diagnostic::error_no_loc("suspected infinite recursion"));
        }
        loop {
            let (next, changed) = self.rescan_pass(&toks)?;
            if !changed {
                break;
            }
            toks = next;
        }
        Ok(toks)
    }

    // ----------------------------------------------------------------
    // Pass 3: concatenation
    // ----------------------------------------------------------------

    fn concat_pass(&mut self, toks: &[PToken]) -> Result<Vec<PToken>, Diagnostic> {
        let mut out: Vec<PToken> = Vec::with_capacity(toks.len());
        let mut i = 0;
        while i < toks.len() {
            let t = &toks[i];
            if t.kind != PTokKind::Concat {
                out.push(t.clone());
                i += 1;
                continue;
            }
            // Left operand: last non-space token already emitted.
            while out.last().is_some_and(|l| l.is_space()) {
                out.pop();
            }
            let lhs = out.pop().ok_or_else(|| {
                Diagnostic::error(t.loc, "\"##\" has no left-hand operand")
            })?;
            let j = skip_spaces(toks, i + 1);
            let rhs = toks
                .get(j)
                .ok_or_else(|| Diagnostic::error(t.loc, "\"##\" has no right-hand operand"))?;

            if self.table.lookup(&lhs.text).is_some() || self.table.lookup(&rhs.text).is_some() {
                let key = format!("##:{}:{}", lhs.text, rhs.text);
                if self.warned.insert(key) {
                    self.warnings.push(Diagnostic::warning(
                        t.loc,
                        "\"##\" doesn't expand macro arguments",
                    ));
                }
            }

            let glued = glue(&lhs, rhs, t.loc)?;
            out.extend(glued);
            i = j + 1;
        }
        Ok(out)
    }

    // ----------------------------------------------------------------
    // Pass 4+: rescan
    // ----------------------------------------------------------------

    fn rescan_pass(&mut self, toks: &[PToken]) -> Result<(Vec<PToken>, bool), Diagnostic> {
        let mut out: Vec<PToken> = Vec::with_capacity(toks.len());
        let mut changed = false;
        let mut i = 0;
        while i < toks.len() {
            let t = &toks[i];
            if t.kind != PTokKind::Ident || t.ineligible {
                out.push(t.clone());
                i += 1;
                continue;
            }
            let Some(m) = self.table.lookup(&t.text) else {
                out.push(t.clone());
                i += 1;
                continue;
            };

            if self.expanding.contains(&t.text) {
                let mut marked = t.clone();
                marked.ineligible = true;
                if self.warned.insert(t.text.clone()) {
                    self.warnings.push(Diagnostic::warning(
                        t.loc,
                        format!("\"{}\": recursive macro will not expand", t.text),
                    ));
                }
                out.push(marked);
                changed = true;
                i += 1;
                continue;
            }

            if let Some(f) = m.dynamic {
                let (value, valid_in) = f(self.lang);
                if !valid_in.contains(self.lang) || value.is_none() {
                    if self.warned.insert(t.text.clone()) {
                        self.warnings.push(Diagnostic::warning(
                            t.loc,
                            format!("\"{}\" is not predefined in {}", t.text, self.lang),
                        ));
                    }
                    let mut marked = t.clone();
                    marked.ineligible = true;
                    out.push(marked);
                    changed = true;
                    i += 1;
                    continue;
                }
                let mut value_toks = token::plex(&value.unwrap(), 0)?;
                let mut sub = self.child();
                sub.print_and_relocate(&t.text, &mut value_toks);
                push_substituted(&mut out, value_toks, t.loc);
                changed = true;
                i += 1;
                continue;
            }

            if m.is_function_like() {
                let open = skip_spaces(toks, i + 1);
                if toks.get(open).map(|x| x.text.as_str()) != Some("(") {
                    // Not an invocation; the name stays as plain text.
                    out.push(t.clone());
                    i += 1;
                    continue;
                }
                let (args, after) = parse_args(toks, open, &t.text)?;
                check_arg_count(m, &args, t.loc)?;
                let label = format!("{}({})", t.text, args_label(&args));
                let mut sub = self.child();
                sub.expanding.insert(t.text.clone());
                let result = sub.expand_invocation(m, Some(&args), &label)?;
                push_substituted(&mut out, result, t.loc);
                changed = true;
                i = after;
                continue;
            }

            // Object-like.
            let mut sub = self.child();
            sub.expanding.insert(t.text.clone());
            let result = sub.expand_invocation(m, None, &t.text)?;
            push_substituted(&mut out, result, t.loc);
            changed = true;
            i += 1;
        }
        Ok((out, changed))
    }
}

// ------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------

fn skip_spaces(toks: &[PToken], mut i: usize) -> usize {
    while toks.get(i).is_some_and(|t| t.is_space()) {
        i += 1;
    }
    i
}

fn param_index(m: &Macro, name: &str) -> Option<usize> {
    m.params
        .as_ref()?
        .iter()
        .position(|p| p.name == name && p.name != "...")
}

/// A parameter adjacent to `#` or `##` (ignoring whitespace) is
/// substituted without pre-expansion.
fn adjacent_to_operator(toks: &[PToken], i: usize) -> bool {
    let mut j = i;
    while j > 0 {
        j -= 1;
        if toks[j].is_space() {
            continue;
        }
        if matches!(toks[j].kind, PTokKind::Stringify | PTokKind::Concat) {
            return true;
        }
        break;
    }
    let k = skip_spaces(toks, i + 1);
    matches!(toks.get(k).map(|t| t.kind), Some(PTokKind::Concat))
}

fn push_substituted(out: &mut Vec<PToken>, toks: Vec<PToken>, fallback_loc: Loc) {
    if toks.is_empty() {
        out.push(PToken::placemarker(fallback_loc));
        return;
    }
    for mut t in toks {
        t.is_substituted = true;
        out.push(t);
    }
}

/// Content between the parentheses of `__VA_OPT__(...)`, and the index
/// just past the closing parenthesis.
fn va_opt_content(toks: &[PToken], va_opt_idx: usize) -> Result<(Vec<PToken>, usize), Diagnostic> {
    let open = skip_spaces(toks, va_opt_idx + 1);
    let mut depth = 0usize;
    let mut content = Vec::new();
    for (n, t) in toks.iter().enumerate().skip(open) {
        if t.text == "(" {
            depth += 1;
            if depth == 1 {
                continue;
            }
        } else if t.text == ")" {
            depth -= 1;
            if depth == 0 {
                return Ok((content, n + 1));
            }
        }
        content.push(t.clone());
    }
    Err(Diagnostic::error(
        toks[va_opt_idx].loc,
        "\"__VA_OPT__\" is missing \")\"",
    ))
}

/// Joins two tokens into one by re-lexing their concatenated spellings.
/// A placemarker concatenated with anything yields the other side.
fn glue(lhs: &PToken, rhs: &PToken, loc: Loc) -> Result<Vec<PToken>, Diagnostic> {
    if lhs.is_placemarker() {
        return Ok(vec![rhs.clone()]);
    }
    if rhs.is_placemarker() {
        return Ok(vec![lhs.clone()]);
    }
    let text = format!("{}{}", lhs.text, rhs.text);
    let mut toks = token::plex(&text, loc.first_col)?;
    if toks.len() != 1 {
        // Not a single valid token; real preprocessors make this
        // undefined. Keep the pieces rather than losing them.
        return Ok(toks);
    }
    let mut tok = toks.remove(0);
    tok.loc = loc;
    tok.is_substituted = true;
    Ok(vec![tok])
}

/// Splits a parenthesized argument list on top-level commas. `open` must
/// index the `(`. Returns the arguments and the index just past `)`.
fn parse_args(
    toks: &[PToken],
    open: usize,
    name: &str,
) -> Result<(Vec<Vec<PToken>>, usize), Diagnostic> {
    let mut args: Vec<Vec<PToken>> = vec![Vec::new()];
    let mut depth = 1usize;
    let mut i = open + 1;
    loop {
        let Some(t) = toks.get(i) else {
            return Err(Diagnostic::error(
                toks[open].loc,
                format!("\"{}\": unterminated macro invocation", name),
            ));
        };
        match t.text.as_str() {
            "(" => {
                depth += 1;
                args.last_mut().unwrap().push(t.clone());
            }
            ")" => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                args.last_mut().unwrap().push(t.clone());
            }
            "," if depth == 1 => args.push(Vec::new()),
            _ => args.last_mut().unwrap().push(t.clone()),
        }
        i += 1;
    }
    for arg in &mut args {
        trim_spaces(arg);
        if arg.is_empty() {
            arg.push(PToken::placemarker(toks[open].loc));
        }
    }
    Ok((args, i + 1))
}

/// Validates the argument count; variadic macros accept any count at or
/// above their fixed parameters.
fn check_arg_count(m: &Macro, args: &[Vec<PToken>], loc: Loc) -> Result<(), Diagnostic> {
    let declared = m.params.as_ref().map(|p| p.len()).unwrap_or(0);
    let fixed = m.fixed_param_count();
    let mut actual = args.len();
    // `F()` on a zero-parameter macro parses as one empty argument.
    if declared == 0 && actual == 1 && args[0].iter().all(|t| t.is_placemarker()) {
        actual = 0;
    }
    if m.is_variadic() {
        if actual < fixed {
            return Err(Diagnostic::error(
                loc,
                format!(
                    "\"{}\" requires at least {} argument{}, but {} given",
                    m.name,
                    fixed,
                    if fixed == 1 { "" } else { "s" },
                    actual
                ),
            ));
        }
        return Ok(());
    }
    if actual != declared {
        return Err(Diagnostic::error(
            loc,
            format!(
                "\"{}\" requires {} argument{}, but {} given",
                m.name,
                declared,
                if declared == 1 { "" } else { "s" },
                actual
            ),
        ));
    }
    Ok(())
}

/// Arguments as they appear in the trace's invocation label.
fn args_label(args: &[Vec<PToken>]) -> String {
    args.iter()
        .map(|a| tokens_to_string(a))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preproc::Param;
    use crate::preproc::token::plex;

    fn table_with(defs: &[(&str, Option<&[&str]>, &str)]) -> MacroTable {
        let mut t = MacroTable::new();
        for (name, params, body) in defs {
            let params = params.map(|ps| {
                ps.iter()
                    .map(|p| Param {
                        name: (*p).to_string(),
                        loc: Loc::col(0, 0),
                    })
                    .collect()
            });
            let repl = plex(body, 0).unwrap();
            t.define(name, Loc::col(0, 0), params, repl, Lang::C23)
                .unwrap();
        }
        t
    }

    fn run(t: &MacroTable, name: &str, rest: &str) -> Expansion {
        let rest = plex(rest, 0).unwrap();
        expand_command(t, Lang::C23, name, Loc::col(0, 0), &rest).unwrap()
    }

    fn final_text(e: &Expansion) -> String {
        tokens_to_string(&e.tokens)
    }

    #[test]
    fn test_object_like() {
        let t = table_with(&[("N", None, "42")]);
        let e = run(&t, "N", "");
        assert_eq!(final_text(&e), "42");
        assert!(e.trace.contains("N => 42"));
    }

    #[test]
    fn test_square_trace() {
        let t = table_with(&[("SQ", Some(&["x"]), "((x)*(x))")]);
        let e = run(&t, "SQ", "(a+b)");
        assert!(e.trace.contains("SQ(a+b) => ((x)*(x))"));
        assert!(e.trace.contains("SQ(a+b) => ((a+b)*(a+b))"));
        assert_eq!(final_text(&e), "((a+b)*(a+b))");
    }

    #[test]
    fn test_stringify() {
        let t = table_with(&[("STR", Some(&["x"]), "#x")]);
        let e = run(&t, "STR", "(hello world)");
        assert!(final_text(&e).ends_with("\"hello world\""));
    }

    #[test]
    fn test_concat() {
        let t = table_with(&[("CAT", Some(&["a", "b"]), "a##b")]);
        let e = run(&t, "CAT", "(foo, bar)");
        assert_eq!(final_text(&e), "foobar");
        assert_eq!(e.tokens.len(), 1);
    }

    #[test]
    fn test_nested_rescan() {
        let t = table_with(&[
            ("ONE", None, "TWO"),
            ("TWO", None, "THREE"),
            ("THREE", None, "21"),
        ]);
        let e = run(&t, "ONE", "");
        assert_eq!(final_text(&e), "21");
        assert!(e.trace.contains("| TWO => THREE"));
    }

    #[test]
    fn test_self_reference_guard() {
        let t = table_with(&[("A", None, "B"), ("B", None, "A")]);
        let e = run(&t, "A", "");
        assert_eq!(final_text(&e), "A");
        assert!(
            e.warnings
                .iter()
                .any(|w| w.message.contains("recursive macro"))
        );
    }

    #[test]
    fn test_direct_recursion() {
        let t = table_with(&[("FOO", Some(&["x"]), "FOO()")]);
        let e = run(&t, "FOO", "(y)");
        assert_eq!(final_text(&e), "FOO()");
    }

    #[test]
    fn test_arg_pre_expansion() {
        let t = table_with(&[("ID", Some(&["x"]), "x"), ("N", None, "9")]);
        let e = run(&t, "ID", "(N)");
        assert_eq!(final_text(&e), "9");
    }

    #[test]
    fn test_no_pre_expansion_next_to_stringify() {
        let t = table_with(&[("STR", Some(&["x"]), "#x"), ("N", None, "9")]);
        let e = run(&t, "STR", "(N)");
        assert_eq!(final_text(&e), "\"N\"");
    }

    #[test]
    fn test_arg_count_mismatch() {
        let t = table_with(&[("ADD", Some(&["a", "b"]), "a+b")]);
        let rest = plex("(1)", 0).unwrap();
        let err = expand_command(&t, Lang::C23, "ADD", Loc::col(0, 0), &rest).unwrap_err();
        assert!(err.message.contains("requires 2 arguments"));
    }

    #[test]
    fn test_empty_arg_placemarker() {
        let t = table_with(&[("CAT", Some(&["a", "b"]), "a##b")]);
        let e = run(&t, "CAT", "(, x)");
        assert_eq!(final_text(&e), "x");
    }

    #[test]
    fn test_variadic_args() {
        let t = table_with(&[("V", Some(&["f", "..."]), "f(__VA_ARGS__)")]);
        let e = run(&t, "V", "(g, 1, 2)");
        assert_eq!(final_text(&e), "g(1,2)");
    }

    #[test]
    fn test_va_opt() {
        let t = table_with(&[(
            "LOG",
            Some(&["f", "..."]),
            "printf(f __VA_OPT__(,) __VA_ARGS__)",
        )]);
        let e = run(&t, "LOG", "(fmt, 1)");
        assert_eq!(final_text(&e), "printf(fmt , 1)");
        let e = run(&t, "LOG", "(fmt)");
        assert_eq!(final_text(&e), "printf(fmt )");
    }

    #[test]
    fn test_undefined_macro() {
        let t = MacroTable::new();
        let rest = plex("", 0).unwrap();
        let err = expand_command(&t, Lang::C23, "NOPE", Loc::col(0, 0), &rest).unwrap_err();
        assert!(err.message.contains("not defined"));
    }

    #[test]
    fn test_unterminated_invocation() {
        let t = table_with(&[("F", Some(&["x"]), "x")]);
        let rest = plex("(1", 0).unwrap();
        let err = expand_command(&t, Lang::C23, "F", Loc::col(0, 0), &rest).unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_extra_tokens_ride_along() {
        let t = table_with(&[("N", None, "42")]);
        let e = run(&t, "N", " + 1");
        assert_eq!(final_text(&e), "42 + 1");
    }

    #[test]
    fn test_predefined_dynamic() {
        let t = MacroTable::with_predefined();
        let e = run(&t, "__STDC_VERSION__", "");
        assert_eq!(final_text(&e), "202311L");
    }

    #[test]
    fn test_function_like_in_rescan() {
        let t = table_with(&[
            ("ADD", Some(&["x", "y"]), "x+y"),
            ("MUL", Some(&["x", "y"]), "x*y"),
        ]);
        let e = run(&t, "ADD", "(MUL(1,2), 3)");
        assert_eq!(final_text(&e), "1*2+3");
    }
}
