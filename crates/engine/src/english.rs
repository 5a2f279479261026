//! The English printer: AST to pseudo-English.
//!
//! A single top-down traversal reading the tree left to right: for each
//! node emit its storage and qualifier words, then the phrase for its kind
//! (`pointer to`, `array 5 of`, `function (...) returning`), then recurse
//! into the child. The output of `explain int (*x)[5]` is the phrase after
//! `declare x as`: `pointer to array 5 of int`.

use crate::ast::{Alignment, Arena, ArraySize, AstId, Kind, MemberKind};
use crate::sname;
use crate::types::*;

/// Renders the type rooted at `id` as pseudo-English, without the
/// `declare <name> as` prefix (the command layer adds that).
pub fn to_english(arena: &Arena, id: AstId) -> String {
    let mut out = String::new();
    emit(arena, id, &mut out);
    out
}

fn push_word(out: &mut String, word: &str) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
    out.push_str(word);
}

/// Storage/qualifier/attribute words for one node, in canonical order.
fn emit_prefix_words(arena: &Arena, id: AstId, out: &mut String) {
    let node = arena.node(id);
    let mut store = node.bits.store;
    // The non-empty flag is folded into the array phrase itself.
    if matches!(node.kind, Kind::Array { .. }) {
        store = minus(store, TS_NON_EMPTY_ARRAY);
    }
    for word in names_of(node.bits.attr, true) {
        push_word(out, word);
    }
    for word in names_of(store, true) {
        push_word(out, word);
    }
    if let Alignment::Bytes(n) = node.align {
        push_word(out, &format!("aligned as {} bytes", n));
    }
}

fn emit(arena: &Arena, id: AstId, out: &mut String) {
    emit_prefix_words(arena, id, out);
    let node = arena.node(id);
    match &node.kind {
        Kind::Pointer { to } => {
            push_word(out, "pointer to");
            emit(arena, *to, out);
        }
        Kind::Reference { to } => {
            push_word(out, "reference to");
            emit(arena, *to, out);
        }
        Kind::RvalueReference { to } => {
            push_word(out, "rvalue reference to");
            emit(arena, *to, out);
        }
        Kind::PointerToMember { to, class_sname } => {
            push_word(out, "pointer to member of");
            let kind_word = class_sname
                .parts()
                .last()
                .map(|p| sname::kind_name(p.kind))
                .unwrap_or("class");
            push_word(out, kind_word);
            push_word(out, &class_sname.to_string());
            emit(arena, *to, out);
        }
        Kind::Array { of, size } => {
            match size {
                ArraySize::Unspecified => push_word(out, "array of"),
                ArraySize::Variable => push_word(out, "variable array of"),
                ArraySize::NonEmpty(n) => {
                    push_word(out, &format!("non-empty array {} of", n));
                }
                ArraySize::Explicit(n) => push_word(out, &format!("array {} of", n)),
            }
            emit(arena, *of, out);
        }
        Kind::Function { ret, params } => {
            push_word(out, "function");
            emit_params(arena, params, out);
            push_word(out, "returning");
            emit(arena, *ret, out);
        }
        Kind::AppleBlock { ret, params } => {
            push_word(out, "block");
            emit_params(arena, params, out);
            push_word(out, "returning");
            emit(arena, *ret, out);
        }
        Kind::Operator {
            ret,
            params,
            member,
            ..
        } => {
            match member {
                MemberKind::Member => push_word(out, "member"),
                MemberKind::NonMember => push_word(out, "non-member"),
                MemberKind::Unspecified => {
                    if node.sname.len() >= 2 {
                        push_word(out, "member");
                    }
                }
            }
            push_word(out, "operator");
            emit_params(arena, params, out);
            push_word(out, "returning");
            emit(arena, *ret, out);
        }
        Kind::Constructor { params } => {
            push_word(out, "constructor");
            emit_params(arena, params, out);
        }
        Kind::Destructor => {
            push_word(out, "destructor");
        }
        Kind::Builtin { bit_width } => {
            if node.bits.has(TB_BITINT) {
                // Modifiers (signed/unsigned) first, then the width form.
                let mods = names_of(minus(node.bits.base, TB_BITINT), true).join(" ");
                if !mods.is_empty() {
                    push_word(out, &mods);
                }
                push_word(out, &format!("_BitInt({})", bit_width));
            } else {
                push_word(out, &node.bits.base_english_string());
            }
        }
        Kind::Ecsu { tag, .. } => {
            let kind_bits = node.bits.get_part(TB_ENUM | TB_STRUCT | TB_CLASS | TB_UNION);
            for word in names_of(kind_bits, true) {
                push_word(out, word);
            }
            push_word(out, &tag.to_string());
        }
        Kind::Typedef { tname, .. } => {
            push_word(out, &tname.to_string());
        }
        Kind::Name => {
            push_word(out, &node.sname.to_string());
        }
        Kind::Placeholder => {
            push_word(out, "<placeholder>");
        }
        Kind::Variadic => {
            push_word(out, "...");
        }
        Kind::UserDefConversion { to } => {
            push_word(out, "user-defined conversion operator returning");
            emit(arena, *to, out);
        }
        Kind::UserDefLiteral { ret, params } => {
            push_word(out, "user-defined literal");
            emit_params(arena, params, out);
            push_word(out, "returning");
            emit(arena, *ret, out);
        }
    }
}

fn emit_params(arena: &Arena, params: &[AstId], out: &mut String) {
    if params.is_empty() {
        return;
    }
    let mut rendered = Vec::new();
    for p in params {
        let pnode = arena.node(*p);
        match &pnode.kind {
            Kind::Variadic => rendered.push("...".to_string()),
            Kind::Name => rendered.push(pnode.sname.to_string()),
            _ => {
                let ty = to_english(arena, *p);
                if pnode.sname.is_empty() {
                    rendered.push(ty);
                } else {
                    rendered.push(format!("{} as {}", pnode.sname, ty));
                }
            }
        }
    }
    push_word(out, &format!("({})", rendered.join(", ")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Lang;
    use crate::lexer::{LexOpts, tokenize};
    use crate::parse::gibberish::parse_decl;
    use crate::typedefs::TypedefTable;

    fn explain(input: &str, lang: Lang) -> String {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let p = parse_decl(&toks, lang, &table).unwrap();
        to_english(&p.arena, p.roots[0])
    }

    #[test]
    fn test_pointer_to_array() {
        assert_eq!(
            explain("int (*x)[5]", Lang::C11),
            "pointer to array 5 of int"
        );
    }

    #[test]
    fn test_array_of_pointer() {
        assert_eq!(
            explain("int *a[5]", Lang::C11),
            "array 5 of pointer to int"
        );
    }

    #[test]
    fn test_static_array() {
        assert_eq!(
            explain("static int x[4]", Lang::C11),
            "static array 4 of int"
        );
    }

    #[test]
    fn test_function() {
        assert_eq!(
            explain("int *f(int, char)", Lang::C11),
            "function (int, char) returning pointer to int"
        );
    }

    #[test]
    fn test_const_pointer_qual() {
        assert_eq!(
            explain("int *const p", Lang::C11),
            "constant pointer to int"
        );
    }

    #[test]
    fn test_pointer_to_const() {
        assert_eq!(
            explain("const int *p", Lang::C11),
            "pointer to constant int"
        );
    }

    #[test]
    fn test_unsigned_normalizes() {
        assert_eq!(explain("unsigned x", Lang::C11), "unsigned int");
    }

    #[test]
    fn test_named_params() {
        assert_eq!(
            explain("void f(int count)", Lang::C11),
            "function (count as int) returning void"
        );
    }

    #[test]
    fn test_variadic() {
        assert_eq!(
            explain("void (*p)(int, ...)", Lang::C99),
            "pointer to function (int, ...) returning void"
        );
    }

    #[test]
    fn test_struct_tag() {
        assert_eq!(
            explain("struct point *p", Lang::C11),
            "pointer to struct point"
        );
    }

    #[test]
    fn test_typedef_name() {
        assert_eq!(explain("size_t n", Lang::C11), "size_t");
    }

    #[test]
    fn test_reference() {
        assert_eq!(
            explain("int &r", Lang::Cpp17),
            "reference to int"
        );
    }

    #[test]
    fn test_pointer_to_member() {
        assert_eq!(
            explain("int C::*pm", Lang::Cpp17),
            "pointer to member of class C int"
        );
    }

    #[test]
    fn test_noreturn_alias() {
        assert_eq!(
            explain("[[noreturn]] void f(void)", Lang::Cpp17),
            "non-returning function (void) returning void"
        );
    }
}
