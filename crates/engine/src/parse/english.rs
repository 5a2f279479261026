//! Parser for the pseudo-English phrase language.
//!
//! Drives `declare`, `define`, and `cast ... into`. English is parsed
//! top-down: `pointer to array 5 of int` nests exactly as read, so the AST
//! is built directly without the placeholder machinery. Storage and
//! qualifier words collected before a kind word apply to the node that
//! word creates (`const pointer to int` puts `const` on the pointer).
//!
//! Function parameters may be written either in English (`count as int`,
//! `pointer to char`) or in C syntax (`int`, `char const *`); a parameter
//! slice that starts like a C declaration is handed to the gibberish
//! parser, anything else is parsed as English.

use crate::ast::{Arena, ArraySize, AstId, Kind, Node};
use crate::diag::{Diagnostic, Loc};
use crate::keyword::{self};
use crate::lang::Lang;
use crate::lexer::Token;
use crate::parse::{Parsed, Tokens, name_expected, unexpected};
use crate::sname::ScopedName;
use crate::typedefs::TypedefTable;
use crate::types::*;

pub struct EnglishParser<'a> {
    ts: Tokens<'a>,
    arena: Arena,
    lang: Lang,
    typedefs: &'a TypedefTable,
}

/// Parses the tail of a `declare` command: `<name>[, <name>...] as
/// <english-type>`. Returns one root per declared name.
pub fn parse_declare(
    toks: &[Token],
    lang: Lang,
    typedefs: &TypedefTable,
) -> Result<Parsed, Diagnostic> {
    let mut p = EnglishParser::new(toks, lang, typedefs);
    let mut names = vec![p.declared_name()?];
    while p.ts.eat(",") {
        names.push(p.declared_name()?);
    }
    p.ts.expect("as")?;
    let first = p.english_type()?;
    let mut roots = Vec::new();
    for (i, sname) in names.into_iter().enumerate() {
        let root = if i == 0 {
            first
        } else {
            p.arena.clone_subtree(first)
        };
        p.arena.node_mut(root).sname = sname;
        roots.push(root);
    }
    p.finish(roots)
}

/// Parses the tail of a `cast [name] into <english-type>`.
pub fn parse_cast_into(
    toks: &[Token],
    lang: Lang,
    typedefs: &TypedefTable,
) -> Result<(Parsed, Option<String>), Diagnostic> {
    let mut p = EnglishParser::new(toks, lang, typedefs);
    let castee = if p.ts.peek_is("into") {
        None
    } else {
        let sname = p.declared_name()?;
        Some(sname.to_string())
    };
    p.ts.expect("into")?;
    let root = p.english_type()?;
    let parsed = p.finish(vec![root])?;
    Ok((parsed, castee))
}

impl<'a> EnglishParser<'a> {
    fn new(toks: &'a [Token], lang: Lang, typedefs: &'a TypedefTable) -> Self {
        EnglishParser {
            ts: Tokens::new(toks),
            arena: Arena::new(),
            lang,
            typedefs,
        }
    }

    fn finish(&mut self, roots: Vec<AstId>) -> Result<Parsed, Diagnostic> {
        if let Some(t) = self.ts.peek() {
            return Err(unexpected(Some(t), self.ts.last_loc()));
        }
        Ok(Parsed {
            arena: std::mem::take(&mut self.arena),
            roots,
            implicit_int: false,
        })
    }

    fn node(&mut self, kind: Kind, loc: Loc) -> AstId {
        self.arena.alloc(Node::new(kind, loc, 0))
    }

    /// `ident` or `scope::ident`.
    fn declared_name(&mut self) -> Result<ScopedName, Diagnostic> {
        let mut sname = ScopedName::new();
        loop {
            let Some(t) = self.ts.peek() else {
                return Err(name_expected(None, self.ts.last_loc()));
            };
            if !t.is_ident() {
                return Err(name_expected(Some(t), self.ts.last_loc()));
            }
            let name = t.text.clone();
            self.ts.next();
            sname.push(name, TB_SCOPE);
            if !self.ts.eat("::") {
                return Ok(sname);
            }
        }
    }

    /// The heart of the grammar: one english-type phrase.
    fn english_type(&mut self) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        // Leading storage, qualifier, and attribute words.
        let mut pre = TypeBits::NONE;
        loop {
            let Some(t) = self.ts.peek() else { break };
            if !t.is_ident() {
                break;
            }
            // `auto` means the storage class here; the deduced type is
            // spelled `auto` only in C++11 gibberish.
            if t.is("automatic") || (t.is("auto") && !self.lang.is_cpp()) {
                let l = t.loc;
                self.ts.next();
                pre.add_bit(TS_AUTO, l, true)?;
                continue;
            }
            match keyword::lookup(&t.text, true) {
                Some(kw) if kw.bit & PART_MASK == PART_STORE || kw.bit & PART_MASK == PART_ATTR => {
                    let l = t.loc;
                    self.ts.next();
                    pre.add_bit(kw.bit, l, true)?;
                }
                _ => break,
            }
        }

        let Some(t) = self.ts.peek() else {
            return Err(unexpected(None, self.ts.last_loc()));
        };
        let kind_loc = t.loc;

        let id = match t.text.as_str() {
            "pointer" | "ptr" => {
                self.ts.next();
                self.ts.expect("to")?;
                if self.ts.peek_is("member") {
                    self.pointer_to_member(kind_loc)?
                } else {
                    let to = self.english_type()?;
                    let ptr = self.node(Kind::Pointer { to }, kind_loc);
                    self.arena.node_mut(to).parent = Some(ptr);
                    ptr
                }
            }
            "reference" | "ref" => {
                self.ts.next();
                self.ts.expect("to")?;
                let to = self.english_type()?;
                let r = self.node(Kind::Reference { to }, kind_loc);
                self.arena.node_mut(to).parent = Some(r);
                r
            }
            "rvalue" => {
                self.ts.next();
                self.ts.expect("reference")?;
                self.ts.expect("to")?;
                let to = self.english_type()?;
                let r = self.node(Kind::RvalueReference { to }, kind_loc);
                self.arena.node_mut(to).parent = Some(r);
                r
            }
            "array" | "vector" => {
                self.ts.next();
                let size = if self.ts.eat("*") {
                    ArraySize::Variable
                } else if let Some(n) = self.ts.peek().and_then(|t| t.value) {
                    self.ts.next();
                    ArraySize::Explicit(n)
                } else {
                    ArraySize::Unspecified
                };
                self.array_of(kind_loc, size)?
            }
            "variable" => {
                self.ts.next();
                self.ts.eat("length");
                self.ts.expect("array")?;
                self.array_of(kind_loc, ArraySize::Variable)?
            }
            "non-empty" => {
                self.ts.next();
                self.ts.expect("array")?;
                let n = match self.ts.peek().and_then(|t| t.value) {
                    Some(n) => {
                        self.ts.next();
                        n
                    }
                    None => return Err(unexpected(self.ts.peek(), self.ts.last_loc())),
                };
                self.array_of(kind_loc, ArraySize::NonEmpty(n))?
            }
            "function" | "func" => self.function_like(kind_loc, false)?,
            "block" => self.function_like(kind_loc, true)?,
            "enum" | "struct" | "class" | "union" => self.ecsu_english(&mut pre)?,
            _ => self.builtin_or_typedef(&mut pre)?,
        };

        // Apply the collected leading words to the node the phrase built.
        let node = self.arena.node_mut(id);
        let merged = pre;
        node.bits.union_with(merged);
        Ok(id)
    }

    /// `... of <type>` tail shared by the array forms.
    fn array_of(&mut self, loc: Loc, size: ArraySize) -> Result<AstId, Diagnostic> {
        self.ts.expect("of")?;
        let of = self.english_type()?;
        let arr = self.node(Kind::Array { of, size }, loc);
        if let ArraySize::NonEmpty(_) = size {
            self.arena.node_mut(arr).bits.store |= TS_NON_EMPTY_ARRAY;
        }
        self.arena.node_mut(of).parent = Some(arr);
        Ok(arr)
    }

    /// `pointer to member of class C <type>`
    fn pointer_to_member(&mut self, loc: Loc) -> Result<AstId, Diagnostic> {
        self.ts.expect("member")?;
        self.ts.expect("of")?;
        let kind_bit = match self.ts.peek() {
            Some(t) if t.is("class") => TB_CLASS,
            Some(t) if t.is("struct") => TB_STRUCT,
            Some(t) if t.is("union") => TB_UNION,
            other => return Err(unexpected(other, self.ts.last_loc())),
        };
        self.ts.next();
        let mut class_sname = self.declared_name()?;
        // The innermost component names the class itself.
        if let Some(last) = class_sname.parts().last() {
            let name = last.name.clone();
            let mut fixed = class_sname.scope();
            fixed.push(name, kind_bit);
            class_sname = fixed;
        }
        let to = self.english_type()?;
        let ptm = self.node(
            Kind::PointerToMember {
                to,
                class_sname,
            },
            loc,
        );
        self.arena.node_mut(to).parent = Some(ptm);
        Ok(ptm)
    }

    /// `function [( params )] returning <type>` or the block variant.
    fn function_like(&mut self, loc: Loc, block: bool) -> Result<AstId, Diagnostic> {
        self.ts.next(); // the `function` / `block` word
        let mut params = Vec::new();
        if self.ts.eat("(") {
            if !self.ts.peek_is(")") {
                loop {
                    params.push(self.parameter()?);
                    if !self.ts.eat(",") {
                        break;
                    }
                }
            }
            self.ts.expect(")")?;
        }
        self.ts.expect("returning")?;
        let ret = self.english_type()?;
        let kind = if block {
            Kind::AppleBlock { ret, params }
        } else {
            Kind::Function { ret, params }
        };
        let f = self.node(kind, loc);
        self.arena.node_mut(ret).parent = Some(f);
        if let Some(ps) = self.arena.node(f).kind.params() {
            for p in ps.to_vec() {
                self.arena.node_mut(p).parent = Some(f);
            }
        }
        Ok(f)
    }

    /// One function parameter: `...`, `name as <english>`, a C-syntax
    /// declaration, or a bare english-type.
    fn parameter(&mut self) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        if self.ts.eat("...") || self.ts.eat("varargs") || self.ts.eat("variadic") {
            return Ok(self.node(Kind::Variadic, loc));
        }
        // `name as <type>`
        if let Some(t) = self.ts.peek()
            && t.is_ident()
            && self.ts.peek_at(1).is_some_and(|n| n.is("as"))
        {
            let name = t.text.clone();
            self.ts.next();
            self.ts.next();
            let id = self.english_type()?;
            self.arena.node_mut(id).sname = ScopedName::from_name(name);
            return Ok(id);
        }
        // A parameter that reads like C is parsed as C; everything else as
        // English. Words like `const` are tried as C first, then English.
        let span = self.param_span();
        let starts_like_c = self
            .ts
            .peek()
            .is_some_and(|t| t.is_ident() && keyword::lookup(&t.text, false).is_some())
            || self
                .ts
                .peek()
                .is_some_and(|t| t.is_ident() && self.typedefs.is_typedef(&t.text));
        if starts_like_c {
            match crate::parse::gibberish::parse_decl(span, self.lang, self.typedefs) {
                Ok(parsed) => {
                    // Skip past the slice we just parsed.
                    for _ in 0..span.len() {
                        self.ts.next();
                    }
                    let root = parsed.roots[0];
                    let id = parsed.arena.deep_copy_into(root, &mut self.arena);
                    return Ok(id);
                }
                Err(_) => {
                    // Fall through to English.
                }
            }
        }
        self.english_type()
    }

    /// The token span of the current parameter: up to the matching
    /// top-level `,` or `)`.
    fn param_span(&self) -> &'a [Token] {
        let mut depth = 0usize;
        let mut n = 0usize;
        while let Some(t) = self.ts.peek_at(n) {
            if t.is("(") {
                depth += 1;
            } else if t.is(")") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if t.is(",") && depth == 0 {
                break;
            }
            n += 1;
        }
        let start = self.ts.save();
        &self.all_tokens()[start..start + n]
    }

    fn all_tokens(&self) -> &'a [Token] {
        // Tokens keeps the backing slice; expose it for span extraction.
        self.ts.backing()
    }

    /// `enum|struct|class|union <name>` as an English type.
    fn ecsu_english(&mut self, pre: &mut TypeBits) -> Result<AstId, Diagnostic> {
        let t = self.ts.next().expect("caller saw the keyword");
        let loc = t.loc;
        let bit = match t.text.as_str() {
            "enum" => TB_ENUM,
            "struct" => TB_STRUCT,
            "class" => TB_CLASS,
            _ => TB_UNION,
        };
        pre.add_bit(bit, loc, true)?;
        if bit == TB_ENUM
            && let Some(next) = self.ts.peek()
            && (next.is("class") || next.is("struct"))
        {
            let inner = if next.is("class") { TB_CLASS } else { TB_STRUCT };
            let l = next.loc;
            self.ts.next();
            pre.add_bit(inner, l, true)?;
        }
        let mut tag = self.declared_name()?;
        if let Some(last) = tag.parts().last() {
            let name = last.name.clone();
            let mut fixed = tag.scope();
            fixed.push(name, bit);
            tag = fixed;
        }
        Ok(self.node(Kind::Ecsu { tag, of: None }, loc))
    }

    /// Built-in type words (`unsigned long int`), `_BitInt(N)`, or a
    /// typedef name.
    fn builtin_or_typedef(&mut self, pre: &mut TypeBits) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        let mut saw_base = false;
        let mut bit_width: u32 = 0;

        loop {
            let Some(t) = self.ts.peek() else { break };
            if !t.is_ident() {
                break;
            }
            if t.is("_BitInt") {
                let l = t.loc;
                self.ts.next();
                pre.add_bit(TB_BITINT, l, true)?;
                self.ts.expect("(")?;
                let n = match self.ts.peek().and_then(|t| t.value) {
                    Some(v) => v,
                    None => return Err(unexpected(self.ts.peek(), self.ts.last_loc())),
                };
                self.ts.next();
                self.ts.expect(")")?;
                bit_width = n as u32;
                saw_base = true;
                continue;
            }
            match keyword::lookup(&t.text, true) {
                Some(kw) if kw.bit & PART_MASK == PART_BASE => {
                    let l = t.loc;
                    self.ts.next();
                    pre.add_bit(kw.bit, l, true)?;
                    saw_base = true;
                    continue;
                }
                _ => break,
            }
        }

        if saw_base {
            if pre.check().is_empty() {
                let names = names_of(pre.base, true).join(" ");
                return Err(Diagnostic::error(
                    loc,
                    format!("\"{}\" is an illegal combination", names),
                ));
            }
            *pre = pre.normalize();
            return Ok(self.node(Kind::Builtin { bit_width }, loc));
        }

        // A typedef name.
        if let Some(t) = self.ts.peek()
            && t.is_ident()
            && self.typedefs.is_typedef(&t.text)
        {
            let tname = t.text.clone();
            self.ts.next();
            let td = self.typedefs.lookup(&tname).expect("just checked");
            let for_id = td.arena.deep_copy_into(td.root, &mut self.arena);
            pre.add_bit(TB_TYPEDEF, loc, true)?;
            let id = self.node(
                Kind::Typedef {
                    for_id,
                    tname: ScopedName::from_name(tname),
                },
                loc,
            );
            self.arena.node_mut(for_id).parent = Some(id);
            return Ok(id);
        }

        Err(unexpected(self.ts.peek(), self.ts.last_loc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{LexOpts, tokenize};

    fn declare(input: &str) -> Parsed {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        parse_declare(&toks, Lang::C11, &table).unwrap()
    }

    fn declare_cpp(input: &str) -> Parsed {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        parse_declare(&toks, Lang::Cpp17, &table).unwrap()
    }

    #[test]
    fn test_pointer_to_array() {
        let p = declare("x as pointer to array 5 of int");
        let root = p.roots[0];
        assert_eq!(p.arena.node(root).sname.to_string(), "x");
        assert!(matches!(p.arena.kind(root), Kind::Pointer { .. }));
        let arr = p.arena.primary_child(root).unwrap();
        assert!(matches!(
            p.arena.kind(arr),
            Kind::Array {
                size: ArraySize::Explicit(5),
                ..
            }
        ));
    }

    #[test]
    fn test_function_with_c_params() {
        let p = declare("f as function (int, char const *) returning pointer to int");
        let root = p.roots[0];
        let Kind::Function { params, ret } = p.arena.kind(root) else {
            panic!("expected function");
        };
        let (params, ret) = (params.clone(), *ret);
        assert_eq!(params.len(), 2);
        assert!(p.arena.node(params[0]).bits.has(TB_INT));
        assert!(matches!(p.arena.kind(params[1]), Kind::Pointer { .. }));
        assert!(matches!(p.arena.kind(ret), Kind::Pointer { .. }));
    }

    #[test]
    fn test_named_english_param() {
        let p = declare("f as function (count as int) returning void");
        let Kind::Function { params, .. } = p.arena.kind(p.roots[0]) else {
            panic!("expected function");
        };
        let params = params.clone();
        assert_eq!(p.arena.node(params[0]).sname.to_string(), "count");
    }

    #[test]
    fn test_const_pointer() {
        let p = declare("p as const pointer to int");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Pointer { .. }));
        assert!(p.arena.node(root).bits.has(TS_CONST));
    }

    #[test]
    fn test_static_array() {
        let p = declare("x as static array 4 of int");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Array { .. }));
        assert!(p.arena.node(root).bits.has(TS_STATIC));
    }

    #[test]
    fn test_variadic_param() {
        let p = declare("p as pointer to function (int, ...) returning void");
        let ptr = p.roots[0];
        let func = p.arena.primary_child(ptr).unwrap();
        let Kind::Function { params, .. } = p.arena.kind(func) else {
            panic!("expected function");
        };
        let params = params.clone();
        assert!(matches!(p.arena.kind(params[1]), Kind::Variadic));
    }

    #[test]
    fn test_reference_english() {
        let p = declare_cpp("f as function (int) returning reference to int");
        let Kind::Function { ret, .. } = p.arena.kind(p.roots[0]) else {
            panic!("expected function");
        };
        assert!(matches!(p.arena.kind(*ret), Kind::Reference { .. }));
    }

    #[test]
    fn test_pointer_to_member_english() {
        let p = declare_cpp("pm as pointer to member of class C int");
        let root = p.roots[0];
        let Kind::PointerToMember { class_sname, .. } = p.arena.kind(root) else {
            panic!("expected pointer to member");
        };
        assert_eq!(class_sname.to_string(), "C");
    }

    #[test]
    fn test_multiple_names() {
        let p = declare("x, y as int");
        assert_eq!(p.roots.len(), 2);
        assert_eq!(p.arena.node(p.roots[0]).sname.to_string(), "x");
        assert_eq!(p.arena.node(p.roots[1]).sname.to_string(), "y");
    }

    #[test]
    fn test_unsigned_normalized() {
        let p = declare("x as unsigned");
        let root = p.roots[0];
        assert!(p.arena.node(root).bits.has(TB_UNSIGNED));
        assert!(p.arena.node(root).bits.has(TB_INT));
    }

    #[test]
    fn test_typedef_english() {
        let p = declare("n as size_t");
        let Kind::Typedef { tname, .. } = p.arena.kind(p.roots[0]) else {
            panic!("expected typedef reference");
        };
        assert_eq!(tname.to_string(), "size_t");
    }

    #[test]
    fn test_ecsu_english() {
        let p = declare("s as struct foo");
        let Kind::Ecsu { tag, .. } = p.arena.kind(p.roots[0]) else {
            panic!("expected ecsu");
        };
        assert_eq!(tag.to_string(), "foo");
    }

    #[test]
    fn test_cast_into() {
        let toks = tokenize("p into pointer to function returning int", LexOpts::default())
            .unwrap();
        let table = TypedefTable::with_predefined();
        let (parsed, castee) = parse_cast_into(&toks, Lang::C11, &table).unwrap();
        assert_eq!(castee.as_deref(), Some("p"));
        assert!(matches!(
            parsed.arena.kind(parsed.roots[0]),
            Kind::Pointer { .. }
        ));
    }

    #[test]
    fn test_array_of_void_parses() {
        // Structurally fine here; the checker rejects it.
        let p = declare("x as array of void");
        let root = p.roots[0];
        let Kind::Array { size, .. } = p.arena.kind(root) else {
            panic!("expected array");
        };
        assert_eq!(*size, ArraySize::Unspecified);
    }

    #[test]
    fn test_error_trailing_tokens() {
        let toks = tokenize("x as int stuff", LexOpts::default()).unwrap();
        let table = TypedefTable::new();
        assert!(parse_declare(&toks, Lang::C11, &table).is_err());
    }
}
