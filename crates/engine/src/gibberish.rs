//! The gibberish printer: AST to C/C++ surface syntax.
//!
//! Walks from the declared entity (the root) toward the base type,
//! building the declarator string outward: pointers prepend `*`, arrays
//! and functions append their suffixes, and parentheses are inserted
//! whenever a suffix would otherwise bind to a prefix glyph (`(*x)[5]`
//! rather than `*x[5]`). The base type and storage words are emitted last,
//! in front of the whole declarator.
//!
//! Qualifier placement honors the const style: east (`char const *`) or
//! west (`const char *`).

use crate::ast::{Arena, ArraySize, AstId, Kind};
use crate::types::*;

/// Storage words printed at the front of the specifier.
const PREFIX_STORAGE: u64 = TS_AUTO
    | TS_APPLE_BLOCK
    | TS_EXTERN
    | TS_EXTERN_C
    | TS_REGISTER
    | TS_STATIC
    | TS_MUTABLE
    | TS_TYPEDEF
    | TS_THREAD_LOCAL
    | TS_CONSTEVAL
    | TS_CONSTEXPR
    | TS_CONSTINIT
    | TS_EXPLICIT
    | TS_EXPORT
    | TS_FRIEND
    | TS_INLINE
    | TS_VIRTUAL;

/// Bits rendered after a function's parameter list.
const FUNC_SUFFIX: u64 = TS_CONST
    | TS_VOLATILE
    | TS_REFERENCE
    | TS_RVALUE_REFERENCE
    | TS_NOEXCEPT
    | TS_THROW
    | TS_FINAL
    | TS_OVERRIDE;

/// Rendering options; `east_const` places cv-qualifiers after the base.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub east_const: bool,
}

impl Default for Style {
    fn default() -> Self {
        Style { east_const: true }
    }
}

/// Renders the declaration rooted at `id` as C/C++ syntax.
pub fn to_gibberish(arena: &Arena, id: AstId, style: Style) -> String {
    let root = arena.node(id);
    let mut decl = root.sname.to_string();
    render(arena, id, style, true, &mut decl)
}

/// Renders a type with no declared name (casts, parameters).
pub fn type_to_gibberish(arena: &Arena, id: AstId, style: Style) -> String {
    let mut decl = String::new();
    render(arena, id, style, true, &mut decl)
}

fn render(arena: &Arena, start: AstId, style: Style, is_root: bool, decl: &mut String) -> String {
    // Storage and attributes were migrated to the root by composition.
    let mut prefix = String::new();
    if is_root {
        let root = arena.node(start);
        let plain_attrs = minus(root.bits.attr, TA_ANY_MSC_CALL);
        if plain_attrs & VALUE_MASK != 0 {
            prefix.push_str(&format!("[[{}]] ", names_of(plain_attrs, false).join(", ")));
        }
        for word in names_of(root.bits.get_part(PREFIX_STORAGE), false) {
            prefix.push_str(word);
            prefix.push(' ');
        }
        for word in names_of(root.bits.get_part(TA_ANY_MSC_CALL), false) {
            prefix.push_str(word);
            prefix.push(' ');
        }
    }

    let mut cur = start;
    loop {
        let node = arena.node(cur);
        match &node.kind {
            Kind::Pointer { to } => {
                let quals = names_of(node.bits.get_part(TS_ANY_QUALIFIER), false).join(" ");
                let mut glyph = "*".to_string();
                if !quals.is_empty() {
                    glyph.push_str(&quals);
                    if !decl.is_empty() {
                        glyph.push(' ');
                    }
                }
                *decl = format!("{}{}", glyph, decl);
                cur = *to;
            }
            Kind::Reference { to } => {
                *decl = format!("&{}", decl);
                cur = *to;
            }
            Kind::RvalueReference { to } => {
                *decl = format!("&&{}", decl);
                cur = *to;
            }
            Kind::PointerToMember { to, class_sname } => {
                let quals = names_of(node.bits.get_part(TS_ANY_QUALIFIER), false).join(" ");
                let mut glyph = format!("{}::*", class_sname);
                if !quals.is_empty() {
                    glyph.push_str(&quals);
                    if !decl.is_empty() {
                        glyph.push(' ');
                    }
                }
                *decl = format!("{}{}", glyph, decl);
                cur = *to;
            }
            Kind::Array { of, size } => {
                parenthesize_if_prefixed(decl);
                let quals = names_of(node.bits.get_part(TS_ANY_QUALIFIER), false).join(" ");
                let inner = match size {
                    ArraySize::Unspecified => quals.clone(),
                    ArraySize::Variable => join_nonempty(&quals, "*"),
                    ArraySize::NonEmpty(n) => join_nonempty(&quals, &format!("static {}", n)),
                    ArraySize::Explicit(n) => join_nonempty(&quals, &n.to_string()),
                };
                decl.push('[');
                decl.push_str(&inner);
                decl.push(']');
                cur = *of;
            }
            Kind::Function { ret, params }
            | Kind::Operator { ret, params, .. }
            | Kind::UserDefLiteral { ret, params } => {
                parenthesize_if_prefixed(decl);
                decl.push('(');
                decl.push_str(&render_params(arena, params, style));
                decl.push(')');
                push_func_suffix(arena, cur, decl);
                cur = *ret;
            }
            Kind::AppleBlock { ret, params } => {
                *decl = format!("(^{})", decl);
                decl.push('(');
                decl.push_str(&render_params(arena, params, style));
                decl.push(')');
                cur = *ret;
            }
            Kind::Constructor { params } => {
                decl.push('(');
                decl.push_str(&render_params(arena, params, style));
                decl.push(')');
                push_func_suffix(arena, cur, decl);
                return format!("{}{}", prefix, decl);
            }
            Kind::Destructor => {
                decl.push_str("()");
                push_func_suffix(arena, cur, decl);
                return format!("{}{}", prefix, decl);
            }
            Kind::UserDefConversion { to } => {
                let target = type_to_gibberish(arena, *to, style);
                let name = if node.sname.is_empty() {
                    format!("operator {}", target)
                } else {
                    format!("{} {}", node.sname, target)
                };
                let mut suffix = String::new();
                push_func_suffix(arena, cur, &mut suffix);
                return format!("{}{}(){}", prefix, name, suffix);
            }
            Kind::Builtin { bit_width } => {
                let base = if node.bits.has(TB_BITINT) {
                    let mods = names_of(minus(node.bits.base, TB_BITINT), false).join(" ");
                    let form = format!("_BitInt({})", bit_width);
                    join_nonempty(&mods, &form)
                } else {
                    node.bits.base_c_string()
                };
                return assemble(&prefix, &specifier(node, &base, style), decl);
            }
            Kind::Ecsu { tag, .. } => {
                let kind_words =
                    names_of(node.bits.get_part(TB_ENUM | TB_STRUCT | TB_CLASS | TB_UNION), false)
                        .join(" ");
                let base = format!("{} {}", kind_words, tag);
                return assemble(&prefix, &specifier(node, &base, style), decl);
            }
            Kind::Typedef { tname, .. } => {
                let base = tname.to_string();
                return assemble(&prefix, &specifier(node, &base, style), decl);
            }
            Kind::Name | Kind::Placeholder => {
                return assemble(&prefix, &node.sname.to_string(), decl);
            }
            Kind::Variadic => {
                return "...".to_string();
            }
        }
    }
}

/// Base plus cv-qualifiers in the configured style.
fn specifier(node: &crate::ast::Node, base: &str, style: Style) -> String {
    let quals = names_of(node.bits.get_part(TS_ANY_QUALIFIER), false).join(" ");
    if quals.is_empty() {
        base.to_string()
    } else if style.east_const {
        format!("{} {}", base, quals)
    } else {
        format!("{} {}", quals, base)
    }
}

fn assemble(prefix: &str, base: &str, decl: &str) -> String {
    let mut out = String::new();
    out.push_str(prefix);
    out.push_str(base);
    if !decl.is_empty() {
        // `int[5]` for an abstract array; everything else separates the
        // specifier from the declarator with one space.
        if !decl.starts_with('[') {
            out.push(' ');
        }
        out.push_str(decl);
    }
    out
}

/// Wraps the declarator in parentheses when it begins with a prefix glyph,
/// so a suffix about to be appended binds to the right level.
fn parenthesize_if_prefixed(decl: &mut String) {
    if decl.starts_with('*') || decl.starts_with('&') || decl.contains("::*") {
        *decl = format!("({})", decl);
    }
}

fn join_nonempty(a: &str, b: &str) -> String {
    if a.is_empty() {
        b.to_string()
    } else {
        format!("{} {}", a, b)
    }
}

fn push_func_suffix(arena: &Arena, func: AstId, decl: &mut String) {
    let bits = arena.node(func).bits;
    for word in names_of(bits.get_part(minus(FUNC_SUFFIX, TS_THROW | TS_NOEXCEPT)), false) {
        decl.push(' ');
        decl.push_str(word);
    }
    if bits.has(TS_NOEXCEPT) {
        decl.push_str(" noexcept");
    }
    if bits.has(TS_THROW) {
        decl.push_str(" throw()");
    }
    if bits.has(TS_PURE_VIRTUAL) {
        decl.push_str(" = 0");
    }
    if bits.has(TS_DEFAULT) {
        decl.push_str(" = default");
    }
    if bits.has(TS_DELETE) {
        decl.push_str(" = delete");
    }
}

fn render_params(arena: &Arena, params: &[AstId], style: Style) -> String {
    let mut rendered = Vec::new();
    for p in params {
        let node = arena.node(p.to_owned());
        match &node.kind {
            Kind::Variadic => rendered.push("...".to_string()),
            Kind::Name => rendered.push(node.sname.to_string()),
            _ => {
                let mut decl = node.sname.to_string();
                rendered.push(render(arena, *p, style, true, &mut decl));
            }
        }
    }
    rendered.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::lexer::{LexOpts, tokenize};
    use crate::parse::english::parse_declare;
    use crate::typedefs::TypedefTable;

    fn declare(input: &str, lang: Lang) -> String {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let p = parse_declare(&toks, lang, &table).unwrap();
        to_gibberish(&p.arena, p.roots[0], Style::default())
    }

    fn declare_west(input: &str, lang: Lang) -> String {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let p = parse_declare(&toks, lang, &table).unwrap();
        to_gibberish(&p.arena, p.roots[0], Style { east_const: false })
    }

    #[test]
    fn test_pointer_to_array() {
        assert_eq!(
            declare("x as pointer to array 5 of int", Lang::C11),
            "int (*x)[5]"
        );
    }

    #[test]
    fn test_array_of_pointer() {
        assert_eq!(
            declare("a as array 5 of pointer to int", Lang::C11),
            "int *a[5]"
        );
    }

    #[test]
    fn test_function_returning_pointer() {
        assert_eq!(
            declare(
                "f as function (int, char const *) returning pointer to int",
                Lang::C11
            ),
            "int *f(int, char const *)"
        );
    }

    #[test]
    fn test_west_const() {
        assert_eq!(
            declare_west(
                "f as function (int, char const *) returning pointer to int",
                Lang::C11
            ),
            "int *f(int, const char *)"
        );
    }

    #[test]
    fn test_pointer_to_function() {
        assert_eq!(
            declare(
                "p as pointer to function (int, ...) returning void",
                Lang::C99
            ),
            "void (*p)(int, ...)"
        );
    }

    #[test]
    fn test_reference_function() {
        assert_eq!(
            declare(
                "f as function (int) returning reference to int",
                Lang::Cpp11
            ),
            "int &f(int)"
        );
    }

    #[test]
    fn test_static_array() {
        assert_eq!(
            declare("x as static array 4 of int", Lang::C11),
            "static int x[4]"
        );
    }

    #[test]
    fn test_const_pointer() {
        assert_eq!(
            declare("p as constant pointer to char", Lang::C11),
            "char *const p"
        );
    }

    #[test]
    fn test_struct_pointer() {
        assert_eq!(
            declare("p as pointer to struct point", Lang::C11),
            "struct point *p"
        );
    }

    #[test]
    fn test_array_of_array() {
        assert_eq!(
            declare("m as array 2 of array 3 of double", Lang::C11),
            "double m[2][3]"
        );
    }

    #[test]
    fn test_pointer_to_member() {
        assert_eq!(
            declare("pm as pointer to member of class C int", Lang::Cpp17),
            "int C::*pm"
        );
    }

    #[test]
    fn test_block() {
        assert_eq!(
            declare("b as block (int) returning int", Lang::C11),
            "int (^b)(int)"
        );
    }

    #[test]
    fn test_typedef_base() {
        assert_eq!(declare("n as size_t", Lang::C11), "size_t n");
    }

    #[test]
    fn test_vla_param() {
        assert_eq!(
            declare(
                "f as function (a as variable array of int) returning void",
                Lang::C99
            ),
            "void f(int a[*])"
        );
    }
}
