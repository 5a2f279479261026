//! Semantic validation of declaration ASTs.
//!
//! Runs after parsing, before printing. Two cooperating passes walk the
//! whole tree (parameters and enum bases included): the structural pass
//! rejects impossible shapes (`array of function`, `pointer to
//! reference`), the typing pass rejects bit combinations and features the
//! selected dialect does not have. Both stop at the first error; a final
//! warnings pass never stops and collects everything it finds.
//!
//! Errors carry hints where an obvious fix exists (`array of void` hints
//! `array of pointer to void`).

use crate::ast::{Alignment, Arena, ArraySize, AstId, Kind, MemberKind};
use crate::diag::Diagnostic;
use crate::lang::{Lang, LangSet};
use crate::oper::{self, OpId, OpPlace};
use crate::types::*;

/// Whether the AST came from a declaration or a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Declaration,
    Cast,
}

/// Per-check context.
struct Checker<'a> {
    arena: &'a Arena,
    lang: Lang,
    mode: CheckMode,
    /// The specifier had no base type and `int` was assumed.
    implicit_int: bool,
    /// Errors phrase type names in pseudo-English.
    in_english: bool,
    warnings: Vec<Diagnostic>,
}

/// Validates the AST rooted at `root`. On success returns the collected
/// warnings; on failure the first error.
pub fn check(
    arena: &Arena,
    root: AstId,
    lang: Lang,
    mode: CheckMode,
    implicit_int: bool,
    in_english: bool,
) -> Result<Vec<Diagnostic>, Diagnostic> {
    let mut c = Checker {
        arena,
        lang,
        mode,
        implicit_int,
        in_english,
        warnings: Vec::new(),
    };
    c.check_root(root)?;
    Ok(c.warnings)
}

impl<'a> Checker<'a> {
    fn err(&self, id: AstId, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::error(self.arena.node(id).loc, msg)
    }

    fn name_of(&self, bits: u64) -> String {
        names_of(bits, self.in_english).join(" ")
    }

    fn check_root(&mut self, root: AstId) -> Result<(), Diagnostic> {
        // Cast-specific shape rules come first, with their own hints.
        if self.mode == CheckMode::Cast {
            self.check_cast_shape(root)?;
        }
        if self.implicit_int {
            let langs_ok = LangSet::c_max(Lang::C89);
            if !langs_ok.contains(self.lang) {
                return Err(self
                    .err(root, format!("implicit \"int\" is illegal in {}", self.lang)));
            }
            self.warnings.push(Diagnostic::warning(
                self.arena.node(root).loc,
                "implicit \"int\" is deprecated",
            ));
        }
        self.visit(root, &Ctx::default())?;
        self.warn_pass(root);
        Ok(())
    }

    fn check_cast_shape(&self, root: AstId) -> Result<(), Diagnostic> {
        match self.arena.kind(root) {
            Kind::Array { .. } => {
                return Err(self
                    .err(root, "cast into array is illegal")
                    .with_hint("cast into pointer"));
            }
            k if k.is_function_like() => {
                return Err(self
                    .err(root, "cast into function is illegal")
                    .with_hint("cast into pointer to function"));
            }
            _ => {}
        }
        let storage = self.arena.node(root).bits.get_part(TS_ANY_STORAGE);
        if storage & VALUE_MASK != 0 {
            return Err(self.err(
                root,
                format!("cast into \"{}\" is illegal", self.name_of(storage)),
            ));
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Traversal
    // ----------------------------------------------------------------

    fn visit(&mut self, id: AstId, ctx: &Ctx) -> Result<(), Diagnostic> {
        self.structural(id, ctx)?;
        self.typing(id)?;

        let child_ctx = Ctx {
            in_param: ctx.in_param,
        };
        if let Some(c) = self.arena.primary_child(id) {
            self.visit(c, &child_ctx)?;
        }
        if let Some(params) = self.arena.node(id).kind.params() {
            let param_ctx = Ctx { in_param: true };
            for p in params {
                self.visit(*p, &param_ctx)?;
            }
            self.check_params(id, params)?;
        }
        if let Kind::Ecsu { of: Some(of), .. } = self.arena.kind(id) {
            self.visit(*of, &child_ctx)?;
        }
        if let Kind::Function { .. } | Kind::Operator { .. } = self.arena.kind(id) {
            self.check_function(id, ctx)?;
        }
        if let Kind::Operator { .. } = self.arena.kind(id) {
            self.check_operator(id)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Structural pass
    // ----------------------------------------------------------------

    fn structural(&mut self, id: AstId, ctx: &Ctx) -> Result<(), Diagnostic> {
        let node = self.arena.node(id);
        node.sname
            .check_order()
            .map_err(|m| self.err(id, m))?;

        match &node.kind {
            Kind::Array { of, size } => {
                let of = *of;
                let elem = self.arena.untypedef(of);
                let elem_node = self.arena.node(elem);
                if elem_node.bits.has(TB_VOID)
                    && matches!(self.arena.kind(elem), Kind::Builtin { .. })
                {
                    return Err(self
                        .err(id, "array of void")
                        .with_hint("array of pointer to void"));
                }
                if self.arena.kind(elem).is_function_like() {
                    return Err(self
                        .err(id, "array of function")
                        .with_hint("array of pointer to function"));
                }
                if elem_node.bits.has(TS_REGISTER) {
                    return Err(self.err(id, "array of register"));
                }
                match size {
                    ArraySize::Variable => {
                        if !ctx.in_param {
                            return Err(self.err(
                                id,
                                "variable length arrays are illegal outside of function parameters",
                            ));
                        }
                        if !LangSet::c_min(Lang::C99).contains(self.lang) {
                            return Err(self.err(
                                id,
                                format!("variable length arrays are not supported in {}", self.lang),
                            ));
                        }
                    }
                    ArraySize::NonEmpty(_) => {
                        if !ctx.in_param {
                            return Err(self.err(
                                id,
                                "\"static\" arrays are illegal outside of function parameters",
                            ));
                        }
                    }
                    _ => {}
                }
            }
            Kind::Reference { to } | Kind::RvalueReference { to } => {
                if !self.lang.is_cpp() {
                    return Err(self.err(
                        id,
                        format!("references are not supported in {}", self.lang),
                    ));
                }
                if matches!(node.kind, Kind::RvalueReference { .. })
                    && !LangSet::cpp_min(Lang::Cpp11).contains(self.lang)
                {
                    return Err(self.err(
                        id,
                        format!("rvalue references are not supported in {}", self.lang),
                    ));
                }
                let to = *to;
                let refd = self.arena.node(to);
                if refd.bits.has(TB_VOID) && matches!(self.arena.kind(to), Kind::Builtin { .. }) {
                    return Err(self
                        .err(id, "reference to void")
                        .with_hint("pointer to void"));
                }
                if self.arena.kind(to).is_reference_like() {
                    return Err(self.err(id, "reference to reference"));
                }
                if refd.bits.has(TS_REGISTER) {
                    return Err(self.err(id, "reference to register"));
                }
            }
            Kind::Pointer { to } => {
                let to = *to;
                if self.arena.kind(to).is_reference_like() {
                    return Err(self.err(id, "pointer to reference"));
                }
                if self.arena.node(to).bits.has(TS_REGISTER) {
                    return Err(self.err(id, "pointer to register"));
                }
            }
            Kind::PointerToMember { .. } => {
                if !self.lang.is_cpp() {
                    return Err(self.err(
                        id,
                        format!("pointers to member are not supported in {}", self.lang),
                    ));
                }
            }
            Kind::Constructor { .. } | Kind::Destructor => {
                self.check_special_member_name(id)?;
            }
            _ => {}
        }

        // restrict binds to pointers only.
        if node.bits.has(TS_RESTRICT)
            && !node.kind.is_pointer_like()
            && !matches!(node.kind, Kind::Array { .. } | Kind::Typedef { .. })
        {
            return Err(self.err(
                id,
                format!(
                    "\"{}\" may only apply to pointers",
                    if self.in_english { "restricted" } else { "restrict" }
                ),
            ));
        }

        // inline on something that is not a function.
        if node.bits.has(TS_INLINE) && !node.kind.is_function_like() {
            if !LangSet::cpp_min(Lang::Cpp17).contains(self.lang) {
                return Err(self.err(
                    id,
                    format!("inline variables are not supported in {}", self.lang),
                ));
            }
        }

        // alignas restrictions.
        match node.align {
            Alignment::None => {}
            Alignment::Bytes(n) => {
                if node.bits.has(TS_REGISTER) {
                    return Err(self.err(id, "\"alignas\" combined with \"register\" is illegal"));
                }
                if node.kind.is_function_like() {
                    return Err(self.err(id, "functions may not be aligned"));
                }
                if n == 0 || !n.is_power_of_two() {
                    return Err(self.err(
                        id,
                        format!("\"{}\": alignment must be a power of 2", n),
                    ));
                }
            }
            Alignment::Type(_) => {
                if node.kind.is_function_like() {
                    return Err(self.err(id, "functions may not be aligned"));
                }
            }
        }

        Ok(())
    }

    /// Constructors and destructors must be named after their class.
    fn check_special_member_name(&self, id: AstId) -> Result<(), Diagnostic> {
        let node = self.arena.node(id);
        if !self.lang.is_cpp() {
            return Err(self.err(
                id,
                format!("{}s are not supported in {}", node.kind.name(), self.lang),
            ));
        }
        let sname = &node.sname;
        if sname.len() < 2 {
            return Ok(());
        }
        let local = sname.local_name().unwrap_or("");
        let class = sname.scope_name().unwrap_or("");
        let member = local.trim_start_matches('~');
        if member != class {
            return Err(self.err(
                id,
                format!(
                    "\"{}\", \"{}\": scope and {} names don't match",
                    class,
                    member,
                    node.kind.name()
                ),
            ));
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Typing pass
    // ----------------------------------------------------------------

    fn typing(&mut self, id: AstId) -> Result<(), Diagnostic> {
        let node = self.arena.node(id);
        let bits = node.bits;
        if bits.is_none() {
            return Ok(());
        }
        let langs = bits.check();
        if langs.is_empty() {
            let mut names = names_of(bits.base, self.in_english);
            names.extend(names_of(bits.store, self.in_english));
            names.extend(names_of(bits.attr, self.in_english));
            return Err(self.err(
                id,
                format!("\"{}\" is an illegal combination", names.join(" ")),
            ));
        }
        if !langs.contains(self.lang) {
            let mut names = names_of(bits.base, self.in_english);
            names.extend(names_of(bits.store, self.in_english));
            names.extend(names_of(bits.attr, self.in_english));
            return Err(self.err(
                id,
                format!(
                    "\"{}\" is not supported in {} (supported in {})",
                    names.join(" "),
                    self.lang,
                    langs
                ),
            ));
        }
        if let Kind::Builtin { bit_width } = node.kind
            && bits.has(TB_BITINT)
            && (bit_width == 0 || bit_width > 128)
        {
            return Err(self.err(
                id,
                format!("\"{}\": invalid _BitInt width; must be 1..128", bit_width),
            ));
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Function-like rules
    // ----------------------------------------------------------------

    fn check_params(&mut self, func: AstId, params: &[AstId]) -> Result<(), Diagnostic> {
        let n = params.len();
        for (i, p) in params.iter().enumerate() {
            let pnode = self.arena.node(*p);
            match self.arena.kind(*p) {
                Kind::Variadic => {
                    if i + 1 != n {
                        return Err(self.err(*p, "\"...\" must be the last parameter"));
                    }
                    if n == 1 {
                        return Err(self.err(*p, "\"...\" may not be the only parameter"));
                    }
                }
                Kind::Builtin { .. } if pnode.bits.has(TB_VOID) => {
                    if !pnode.sname.is_empty() {
                        return Err(self.err(*p, "a \"void\" parameter may not have a name"));
                    }
                    if n > 1 {
                        return Err(self.err(*p, "\"void\" must be the only parameter"));
                    }
                }
                Kind::Builtin { .. } if pnode.bits.has(TB_AUTO) => {
                    return Err(self.err(*p, "parameters may not be \"auto\""));
                }
                _ => {}
            }
        }
        // `main` has a fixed menu of signatures in C.
        let fname = self.arena.node(func).sname.to_string();
        if fname == "main" && self.lang.is_c() && matches!(self.arena.kind(func), Kind::Function { .. })
        {
            self.check_main(func, params)?;
        }
        Ok(())
    }

    fn check_main(&self, func: AstId, params: &[AstId]) -> Result<(), Diagnostic> {
        let node = self.arena.node(func);
        if node
            .bits
            .get_part(TS_ANY_STORAGE)
            & VALUE_MASK
            != 0
        {
            return Err(self.err(
                func,
                format!(
                    "main may not be \"{}\"",
                    self.name_of(node.bits.get_part(TS_ANY_STORAGE))
                ),
            ));
        }
        if let Kind::Function { ret, .. } = self.arena.kind(func) {
            let ret_node = self.arena.node(self.arena.untypedef(*ret));
            let int_only = ret_node.bits.has(TB_INT)
                && !ret_node.bits.has(TB_UNSIGNED)
                && !ret_node.bits.has(TB_SHORT)
                && !ret_node.bits.has(TB_LONG | TB_LONG_LONG);
            if !int_only || !matches!(self.arena.kind(self.arena.untypedef(*ret)), Kind::Builtin { .. }) {
                return Err(self.err(func, "main must return int"));
            }
        }
        let ok = match params.len() {
            0 => true,
            1 => {
                let p = self.arena.node(params[0]);
                p.bits.has(TB_VOID) && matches!(self.arena.kind(params[0]), Kind::Builtin { .. })
            }
            2 => {
                let argc = self.arena.node(self.arena.untypedef(params[0]));
                let argc_ok = argc.bits.has(TB_INT) && !argc.bits.has(TB_UNSIGNED);
                let argv_ok = self.is_char_pointer_pointer(params[1]);
                argc_ok && argv_ok
            }
            _ => false,
        };
        if !ok {
            return Err(self.err(func, "illegal signature for main"));
        }
        Ok(())
    }

    /// `char *argv[]` or `char **argv`, with the inner char optionally
    /// const.
    fn is_char_pointer_pointer(&self, id: AstId) -> bool {
        let outer = self.arena.untypedef(id);
        let inner = match self.arena.kind(outer) {
            Kind::Array { of, .. } | Kind::Pointer { to: of } => *of,
            _ => return false,
        };
        let inner = self.arena.untypedef(inner);
        let Kind::Pointer { to } = self.arena.kind(inner) else {
            return false;
        };
        let ch = self.arena.node(self.arena.untypedef(*to));
        ch.bits.has(TB_CHAR) && !ch.bits.has(TB_UNSIGNED) && !ch.bits.has(TB_SIGNED)
    }

    fn check_function(&mut self, func: AstId, _ctx: &Ctx) -> Result<(), Diagnostic> {
        if !self.lang.is_cpp() {
            let bits = self.arena.node(func).bits;
            let member_only = bits.get_part(TS_MEMBER_FUNC_ONLY);
            if member_only & VALUE_MASK != 0 {
                return Err(self.err(
                    func,
                    format!(
                        "\"{}\" is not supported in {}",
                        self.name_of(member_only),
                        self.lang
                    ),
                ));
            }
            return Ok(());
        }
        let node = self.arena.node(func);
        let bits = node.bits;
        let is_member = node.sname.len() >= 2;

        if bits.has(TS_REFERENCE | TS_RVALUE_REFERENCE) && bits.has(TS_STATIC) {
            return Err(self.err(
                func,
                "reference-qualified functions may not be \"static\"",
            ));
        }
        if bits.has(TS_REFERENCE | TS_RVALUE_REFERENCE) && bits.has(TS_EXTERN) {
            return Err(self.err(
                func,
                "reference-qualified functions may not be \"extern\"",
            ));
        }
        if bits.has(TS_FRIEND) {
            let member_only = bits.get_part(TS_MEMBER_FUNC_ONLY);
            if member_only & VALUE_MASK != 0 {
                return Err(self.err(
                    func,
                    format!(
                        "\"friend\" combined with \"{}\" is illegal",
                        self.name_of(member_only)
                    ),
                ));
            }
        }
        if bits.has(TS_VIRTUAL) && !is_member {
            return Err(self.err(
                func,
                "\"virtual\" is illegal for file-scope functions",
            ));
        }
        if bits.has(TS_PURE_VIRTUAL) && !bits.has(TS_VIRTUAL) {
            return Err(self
                .err(func, "\"= 0\" requires \"virtual\"")
                .with_hint("add \"virtual\""));
        }
        if bits.has(TS_DEFAULT | TS_DELETE) {
            self.check_defaultable(func)?;
        }
        Ok(())
    }

    /// `= default` / `= delete` are for special member functions only.
    fn check_defaultable(&self, func: AstId) -> Result<(), Diagnostic> {
        match self.arena.kind(func) {
            Kind::Constructor { .. } | Kind::Destructor => Ok(()),
            Kind::Operator {
                op: OpId::Assign,
                ret,
                params,
                ..
            } => {
                let which = if self.arena.node(func).bits.has(TS_DEFAULT) {
                    "= default"
                } else {
                    "= delete"
                };
                if params.len() != 1
                    || !self.arena.kind(self.arena.untypedef(params[0])).is_reference_like()
                {
                    return Err(self.err(
                        func,
                        format!(
                            "\"{}\" requires a single reference parameter",
                            which
                        ),
                    ));
                }
                if !self.arena.kind(self.arena.untypedef(*ret)).is_reference_like() {
                    return Err(self.err(
                        func,
                        format!("\"{}\" requires a reference return type", which),
                    ));
                }
                Ok(())
            }
            _ => Err(self.err(
                func,
                "only special member functions may be \"= default\" or \"= delete\"",
            )),
        }
    }

    // ----------------------------------------------------------------
    // Operator rules
    // ----------------------------------------------------------------

    fn check_operator(&self, id: AstId) -> Result<(), Diagnostic> {
        let Kind::Operator {
            op,
            params,
            ret,
            member,
        } = self.arena.kind(id)
        else {
            return Ok(());
        };
        let (op, ret) = (*op, *ret);
        let info = oper::info(op);
        let node = self.arena.node(id);
        let is_member = match member {
            MemberKind::Member => true,
            MemberKind::NonMember => false,
            MemberKind::Unspecified => node.sname.len() >= 2,
        };
        let display = format!("operator{}", info.literal);

        if info.place == OpPlace::MemberOnly && !is_member && node.sname.len() == 1 {
            return Err(self.err(
                id,
                format!("\"{}\" must be a member function", display),
            ));
        }

        let (min, max) = if node.sname.len() >= 2 || *member == MemberKind::Member {
            info.member_params
        } else if *member == MemberKind::NonMember {
            info.nonmember_params
        } else {
            // Member-ness unknown: accept the union of both ranges.
            (
                info.member_params.0.min(info.nonmember_params.0),
                info.member_params.1.max(info.nonmember_params.1),
            )
        };
        let n = params.len();
        if n < min as usize || n > max as usize {
            let msg = if min == max {
                format!(
                    "\"{}\" must have exactly {} parameter{}",
                    display,
                    min,
                    if min == 1 { "" } else { "s" }
                )
            } else {
                format!(
                    "\"{}\" must have between {} and {} parameters",
                    display, min, max
                )
            };
            return Err(self.err(id, msg));
        }

        // Postfix ++/-- take a dummy int.
        if matches!(op, OpId::PlusPlus | OpId::MinusMinus) && is_member && n == 1 {
            let p = self.arena.node(self.arena.untypedef(params[0]));
            if !(p.bits.has(TB_INT) && matches!(self.arena.kind(self.arena.untypedef(params[0])), Kind::Builtin { .. })) {
                return Err(self.err(
                    id,
                    format!("parameter of postfix \"{}\" must be int", display),
                ));
            }
        }

        match op {
            OpId::Arrow => {
                let r = self.arena.untypedef(ret);
                let ok = match self.arena.kind(r) {
                    Kind::Pointer { to } => {
                        let pointee = self.arena.untypedef(*to);
                        matches!(self.arena.kind(pointee), Kind::Ecsu { .. })
                    }
                    _ => false,
                };
                if !ok {
                    return Err(self.err(
                        id,
                        "\"operator->\" must return a pointer to class, struct, or union",
                    ));
                }
            }
            OpId::New | OpId::NewArray => {
                let r = self.arena.untypedef(ret);
                let is_void_ptr = match self.arena.kind(r) {
                    Kind::Pointer { to } => self.arena.node(self.arena.untypedef(*to)).bits.has(TB_VOID),
                    _ => false,
                };
                if !is_void_ptr {
                    return Err(self.err(
                        id,
                        format!("\"{}\" must return pointer to void", display),
                    ));
                }
                let first_ok = params.first().is_some_and(|p| {
                    let pn = self.arena.node(*p);
                    if let Kind::Typedef { tname, .. } = self.arena.kind(*p) {
                        return tname.to_string() == "size_t";
                    }
                    // size_t is unsigned long at the bit level.
                    pn.bits.has(TB_UNSIGNED) && pn.bits.has(TB_LONG)
                });
                if !first_ok {
                    return Err(self.err(
                        id,
                        format!("first parameter of \"{}\" must be size_t", display),
                    ));
                }
            }
            OpId::Delete | OpId::DeleteArray => {
                let r = self.arena.node(self.arena.untypedef(ret));
                if !(r.bits.has(TB_VOID)
                    && matches!(self.arena.kind(self.arena.untypedef(ret)), Kind::Builtin { .. }))
                {
                    return Err(self.err(
                        id,
                        format!("\"{}\" must return void", display),
                    ));
                }
                let first_ok = params.first().is_some_and(|p| {
                    let u = self.arena.untypedef(*p);
                    match self.arena.kind(u) {
                        Kind::Pointer { to } => {
                            let pointee = self.arena.untypedef(*to);
                            self.arena.node(pointee).bits.has(TB_VOID)
                                || matches!(self.arena.kind(pointee), Kind::Ecsu { .. })
                        }
                        _ => false,
                    }
                });
                if !first_ok {
                    return Err(self.err(
                        id,
                        format!(
                            "first parameter of \"{}\" must be a pointer to void or to a class",
                            display
                        ),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Warnings
    // ----------------------------------------------------------------

    fn warn_pass(&mut self, root: AstId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.arena.node(id);
            if node.bits.has(TS_REGISTER)
                && (LangSet::cpp_min(Lang::Cpp11).contains(self.lang)
                    || LangSet::c_min(Lang::C23).contains(self.lang))
            {
                self.warnings.push(Diagnostic::warning(
                    node.loc,
                    format!("\"register\" is deprecated in {}", self.lang),
                ));
            }
            if node.bits.has(TS_THROW) && LangSet::cpp_min(Lang::Cpp11).contains(self.lang) {
                self.warnings.push(
                    Diagnostic::warning(
                        node.loc,
                        format!("dynamic exception specifications are deprecated in {}", self.lang),
                    )
                    .with_hint("use \"noexcept\""),
                );
            }
            if let Some(c) = self.arena.primary_child(id) {
                stack.push(c);
            }
            if let Some(params) = node.kind.params() {
                stack.extend(params.iter().copied());
            }
        }
    }
}

/// Traversal context.
#[derive(Default, Clone, Copy)]
struct Ctx {
    in_param: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{LexOpts, tokenize};
    use crate::parse::gibberish::parse_decl;
    use crate::parse::english::parse_declare;
    use crate::typedefs::TypedefTable;

    fn check_c(input: &str, lang: Lang) -> Result<Vec<Diagnostic>, Diagnostic> {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let p = parse_decl(&toks, lang, &table)?;
        check(&p.arena, p.roots[0], lang, CheckMode::Declaration, p.implicit_int, false)
    }

    fn check_english(input: &str, lang: Lang) -> Result<Vec<Diagnostic>, Diagnostic> {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let p = parse_declare(&toks, lang, &table)?;
        check(&p.arena, p.roots[0], lang, CheckMode::Declaration, false, true)
    }

    #[test]
    fn test_array_of_void() {
        let err = check_english("x as array of void", Lang::C11).unwrap_err();
        assert!(err.message.contains("array of void"));
        assert_eq!(err.hint.as_deref(), Some("array of pointer to void"));
    }

    #[test]
    fn test_array_of_function() {
        let err = check_english(
            "x as array of function returning int",
            Lang::C11,
        )
        .unwrap_err();
        assert!(err.message.contains("array of function"));
        assert_eq!(err.hint.as_deref(), Some("array of pointer to function"));
    }

    #[test]
    fn test_pointer_to_reference() {
        let err =
            check_english("x as pointer to reference to int", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("pointer to reference"));
    }

    #[test]
    fn test_reference_illegal_in_c() {
        let err = check_english("x as reference to int", Lang::C11).unwrap_err();
        assert!(err.message.contains("references are not supported"));
    }

    #[test]
    fn test_rvalue_reference_needs_cpp11() {
        let err =
            check_english("x as rvalue reference to int", Lang::Cpp03).unwrap_err();
        assert!(err.message.contains("rvalue references"));
        assert!(check_english("x as rvalue reference to int", Lang::Cpp11).is_ok());
    }

    #[test]
    fn test_vla_only_in_params() {
        let err = check_c("int a[*]", Lang::C99).unwrap_err();
        assert!(err.message.contains("variable length"));
        assert!(check_c("void f(int a[*])", Lang::C99).is_ok());
        let err = check_c("void f(int a[*])", Lang::C89).unwrap_err();
        assert!(err.message.contains("not supported"));
    }

    #[test]
    fn test_nonempty_array_param_only() {
        assert!(check_c("void f(int a[static 5])", Lang::C99).is_ok());
        let err = check_c("int a[static 5]", Lang::C99).unwrap_err();
        assert!(err.message.contains("function parameters"));
    }

    #[test]
    fn test_void_param_rules() {
        assert!(check_c("int f(void)", Lang::C11).is_ok());
        let err = check_c("int f(void, int)", Lang::C11).unwrap_err();
        assert!(err.message.contains("only parameter"));
        let err = check_c("int f(void x)", Lang::C11).unwrap_err();
        assert!(err.message.contains("may not have a name"));
    }

    #[test]
    fn test_variadic_rules() {
        assert!(check_c("int f(int, ...)", Lang::C11).is_ok());
        let err = check_c("int f(...)", Lang::C11).unwrap_err();
        assert!(err.message.contains("only parameter"));
    }

    #[test]
    fn test_implicit_int() {
        let err = check_c("x", Lang::C11).unwrap_err();
        assert!(err.message.contains("implicit"));
        let warns = check_c("x", Lang::C89).unwrap();
        assert!(warns.iter().any(|w| w.message.contains("implicit")));
    }

    #[test]
    fn test_bool_not_in_c89() {
        let err = check_c("_Bool b", Lang::C89).unwrap_err();
        assert!(err.message.contains("not supported"));
        assert!(check_c("_Bool b", Lang::C99).is_ok());
    }

    #[test]
    fn test_pure_virtual_requires_virtual() {
        let err = check_c("int S::f() = 0", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("= 0"));
        assert!(check_c("virtual int S::f() = 0", Lang::Cpp17).is_ok());
    }

    #[test]
    fn test_virtual_file_scope() {
        let err = check_c("virtual int f()", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("file-scope"));
    }

    #[test]
    fn test_main_rules() {
        assert!(check_c("int main(void)", Lang::C11).is_ok());
        assert!(check_c("int main(int argc, char *argv[])", Lang::C11).is_ok());
        assert!(check_c("int main(int argc, char **argv)", Lang::C11).is_ok());
        let err = check_c("void main(void)", Lang::C11).unwrap_err();
        assert!(err.message.contains("main must return int"));
        let err = check_c("static int main(void)", Lang::C11).unwrap_err();
        assert!(err.message.contains("may not be"));
    }

    #[test]
    fn test_operator_param_counts() {
        assert!(check_c("int T::operator+(int)", Lang::Cpp17).is_ok());
        let err = check_c("int T::operator/(int, int)", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("exactly 1"));
    }

    #[test]
    fn test_operator_arrow_return() {
        assert!(check_c("struct S *T::operator->()", Lang::Cpp17).is_ok());
        let err = check_c("int T::operator->()", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("pointer to class"));
    }

    #[test]
    fn test_operator_new_signature() {
        assert!(check_c("void *T::operator new(size_t)", Lang::Cpp17).is_ok());
        let err = check_c("int T::operator new(size_t)", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("pointer to void"));
    }

    #[test]
    fn test_cast_rules() {
        use crate::parse::gibberish::parse_cast;
        let toks = tokenize("(int[5])x", LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let (p, _) = parse_cast(&toks, Lang::C11, &table).unwrap();
        let err = check(&p.arena, p.roots[0], Lang::C11, CheckMode::Cast, false, false)
            .unwrap_err();
        assert!(err.message.contains("cast into array"));
        assert_eq!(err.hint.as_deref(), Some("cast into pointer"));
    }

    #[test]
    fn test_ctor_name_mismatch() {
        let err = check_c("S::T(int)", Lang::Cpp17);
        // S::T parses as a plain function, not a constructor, so it passes;
        // the mismatch case is the destructor form.
        assert!(err.is_ok());
        let err = check_c("S::~T()", Lang::Cpp17).unwrap_err();
        assert!(err.message.contains("don't match"));
    }

    #[test]
    fn test_register_deprecated_warning() {
        let warns = check_c("register int x", Lang::C23).unwrap();
        assert!(warns.iter().any(|w| w.message.contains("deprecated")));
    }

    #[test]
    fn test_alignas_power_of_two() {
        assert!(check_c("alignas(8) int x", Lang::C11).is_ok());
        let err = check_c("alignas(6) int x", Lang::C11).unwrap_err();
        assert!(err.message.contains("power of 2"));
    }

    #[test]
    fn test_inline_variable() {
        let err = check_c("inline int x", Lang::Cpp14).unwrap_err();
        assert!(err.message.contains("inline variables"));
        assert!(check_c("inline int x", Lang::Cpp17).is_ok());
    }
}
