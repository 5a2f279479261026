//! The C preprocessor macro engine: table, definition, expansion.
//!
//! `#define` stores a replacement token list after validating it the way a
//! real preprocessor would (`##` placement, `#` operands, `__VA_OPT__`
//! shape); `expand` runs the engine in `expand.rs` and prints a trace of
//! every pass. Predefined macros (`__DATE__`, `__STDC_VERSION__`, ...)
//! are dynamic: their replacement is computed from the selected dialect
//! and the clock at expansion time, and they can be neither redefined nor
//! undefined.

pub mod expand;
pub mod token;

use crate::diag::{Diagnostic, Loc};
use crate::lang::{Lang, LangSet};
use std::collections::BTreeMap;
use token::{PTokKind, PToken, trim_spaces};

/// Computes a dynamic macro's replacement text for the current dialect,
/// plus the set of dialects the macro exists in.
pub type DynFn = fn(Lang) -> (Option<String>, LangSet);

/// One macro definition. `params` is `None` for object-like macros, which
/// is not the same as `Some(vec![])` (a function-like macro of zero
/// parameters).
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub params: Option<Vec<Param>>,
    pub repl: Vec<PToken>,
    pub dynamic: Option<DynFn>,
    pub loc: Loc,
}

impl Macro {
    pub fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    pub fn is_variadic(&self) -> bool {
        self.params
            .as_ref()
            .is_some_and(|ps| ps.last().is_some_and(|p| p.name == "..."))
    }

    /// Number of named (non-`...`) parameters.
    pub fn fixed_param_count(&self) -> usize {
        self.params
            .as_ref()
            .map(|ps| ps.iter().filter(|p| p.name != "...").count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub loc: Loc,
}

/// Insert/replace/delete/lookup/visit, iterable in name order.
#[derive(Debug, Default)]
pub struct MacroTable {
    map: BTreeMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        MacroTable::default()
    }

    pub fn with_predefined() -> Self {
        let mut t = MacroTable::new();
        for (name, f) in PREDEFINED {
            t.map.insert(
                (*name).to_string(),
                Macro {
                    name: (*name).to_string(),
                    params: None,
                    repl: Vec::new(),
                    dynamic: Some(*f),
                    loc: Loc::col(0, 0),
                },
            );
        }
        t
    }

    pub fn lookup(&self, name: &str) -> Option<&Macro> {
        self.map.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Macro> {
        self.map.values()
    }

    /// `#define`. Returns an optional redefinition warning.
    pub fn define(
        &mut self,
        name: &str,
        name_loc: Loc,
        params: Option<Vec<Param>>,
        mut repl: Vec<PToken>,
        lang: Lang,
    ) -> Result<Option<Diagnostic>, Diagnostic> {
        if self.map.get(name).is_some_and(|m| m.dynamic.is_some()) {
            return Err(Diagnostic::error(
                name_loc,
                format!("\"{}\": predefined macro may not be redefined", name),
            ));
        }
        let mut warning = None;
        if name.starts_with("__STDC_") && lang.is_c() {
            warning = Some(Diagnostic::warning(
                name_loc,
                format!("\"{}\": identifiers beginning with \"__STDC_\" are reserved", name),
            ));
        }
        if let Some(ps) = &params {
            check_params(ps, lang)?;
        }
        trim_spaces(&mut repl);
        check_replacement(&repl, params.as_deref())?;
        let replaced = self
            .map
            .insert(
                name.to_string(),
                Macro {
                    name: name.to_string(),
                    params,
                    repl,
                    dynamic: None,
                    loc: name_loc,
                },
            )
            .is_some();
        if replaced {
            warning = Some(Diagnostic::warning(
                name_loc,
                format!("\"{}\" already exists; redefined", name),
            ));
        }
        Ok(warning)
    }

    /// `#undef`.
    pub fn undef(&mut self, name: &str, loc: Loc) -> Result<(), Diagnostic> {
        match self.map.get(name) {
            Some(m) if m.dynamic.is_some() => Err(Diagnostic::error(
                loc,
                format!("\"{}\": predefined macro may not be undefined", name),
            )),
            Some(_) => {
                self.map.remove(name);
                Ok(())
            }
            None => Err(Diagnostic::error(
                loc,
                format!("\"{}\": macro not defined", name),
            )),
        }
    }
}

fn check_params(params: &[Param], lang: Lang) -> Result<(), Diagnostic> {
    for (i, p) in params.iter().enumerate() {
        if p.name == "..." {
            if i + 1 != params.len() {
                return Err(Diagnostic::error(
                    p.loc,
                    "\"...\" must be the last macro parameter",
                ));
            }
            let ok = LangSet::c_cpp_min(Lang::C99, Lang::Cpp11).contains(lang);
            if !ok {
                return Err(Diagnostic::error(
                    p.loc,
                    format!("variadic macros are not supported in {}", lang),
                ));
            }
            continue;
        }
        if params[..i].iter().any(|q| q.name == p.name) {
            return Err(Diagnostic::error(
                p.loc,
                format!("\"{}\": duplicate macro parameter", p.name),
            ));
        }
    }
    Ok(())
}

/// Replacement-list well-formedness: `##` position, `#` operand,
/// `__VA_OPT__` shape, `__VA_ARGS__` only in variadic macros.
fn check_replacement(repl: &[PToken], params: Option<&[Param]>) -> Result<(), Diagnostic> {
    let non_space: Vec<usize> = repl
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_space())
        .map(|(i, _)| i)
        .collect();
    let variadic = params.is_some_and(|ps| ps.last().is_some_and(|p| p.name == "..."));
    let is_param = |text: &str| params.is_some_and(|ps| ps.iter().any(|p| p.name == text));

    for (pos, &i) in non_space.iter().enumerate() {
        let tok = &repl[i];
        match tok.kind {
            PTokKind::Concat => {
                if pos == 0 || pos + 1 == non_space.len() {
                    return Err(Diagnostic::error(
                        tok.loc,
                        "\"##\" may neither begin nor end a macro",
                    ));
                }
            }
            PTokKind::Stringify if params.is_some() => {
                let next = non_space.get(pos + 1).map(|&j| &repl[j]);
                let ok = match next {
                    Some(n) => match n.kind {
                        PTokKind::VaArgs | PTokKind::VaOpt => true,
                        PTokKind::Ident => is_param(&n.text),
                        _ => false,
                    },
                    None => false,
                };
                if !ok {
                    return Err(Diagnostic::error(
                        tok.loc,
                        "\"#\" must be followed by a macro parameter",
                    ));
                }
            }
            PTokKind::VaArgs => {
                if !variadic {
                    return Err(Diagnostic::error(
                        tok.loc,
                        "\"__VA_ARGS__\" is only allowed in variadic macros",
                    ));
                }
            }
            PTokKind::VaOpt => {
                if !variadic {
                    return Err(Diagnostic::error(
                        tok.loc,
                        "\"__VA_OPT__\" is only allowed in variadic macros",
                    ));
                }
                check_va_opt(repl, &non_space, pos)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// `__VA_OPT__` must be followed by `(`, with matched parentheses and no
/// nested `__VA_OPT__`.
fn check_va_opt(repl: &[PToken], non_space: &[usize], pos: usize) -> Result<(), Diagnostic> {
    let opener = non_space
        .get(pos + 1)
        .map(|&j| &repl[j])
        .filter(|t| t.text == "(")
        .ok_or_else(|| {
            Diagnostic::error(
                repl[non_space[pos]].loc,
                "\"__VA_OPT__\" must be followed by \"(\"",
            )
        })?;
    let _ = opener;
    let mut depth = 0usize;
    for &j in &non_space[pos + 1..] {
        let t = &repl[j];
        if t.text == "(" {
            depth += 1;
        } else if t.text == ")" {
            depth -= 1;
            if depth == 0 {
                return Ok(());
            }
        } else if t.kind == PTokKind::VaOpt && depth > 0 {
            return Err(Diagnostic::error(t.loc, "\"__VA_OPT__\" may not nest"));
        }
    }
    Err(Diagnostic::error(
        repl[non_space[pos]].loc,
        "\"__VA_OPT__\" is missing \")\"",
    ))
}

// ------------------------------------------------------------------
// Predefined dynamic macros
// ------------------------------------------------------------------

const PREDEFINED: &[(&str, DynFn)] = &[
    ("__DATE__", dyn_date),
    ("__TIME__", dyn_time),
    ("__STDC__", dyn_stdc),
    ("__STDC_VERSION__", dyn_stdc_version),
    ("__cplusplus", dyn_cplusplus),
];

fn dyn_date(_lang: Lang) -> (Option<String>, LangSet) {
    let (y, m, d, _, _, _) = now_civil();
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    (
        Some(format!("\"{} {:2} {}\"", MONTHS[(m - 1) as usize], d, y)),
        LangSet::ALL,
    )
}

fn dyn_time(_lang: Lang) -> (Option<String>, LangSet) {
    let (_, _, _, h, min, s) = now_civil();
    (Some(format!("\"{:02}:{:02}:{:02}\"", h, min, s)), LangSet::ALL)
}

fn dyn_stdc(_lang: Lang) -> (Option<String>, LangSet) {
    (Some("1".to_string()), LangSet::C)
}

fn dyn_stdc_version(lang: Lang) -> (Option<String>, LangSet) {
    (
        lang.stdc_version().map(|v| v.to_string()),
        LangSet::c_min(Lang::C99),
    )
}

fn dyn_cplusplus(lang: Lang) -> (Option<String>, LangSet) {
    (lang.cplusplus().map(|v| v.to_string()), LangSet::CPP)
}

/// Current UTC time as (year, month, day, hour, minute, second), via the
/// days-from-epoch civil-date conversion.
fn now_civil() -> (i64, u32, u32, u32, u32, u32) {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (h, min, s) = (
        (rem / 3600) as u32,
        ((rem % 3600) / 60) as u32,
        (rem % 60) as u32,
    );

    // Civil-from-days, Gregorian calendar.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d, h, min, s)
}
