//! Parser for C/C++ declaration syntax ("gibberish").
//!
//! Drives the `explain` command and C-syntax casts. The grammar is
//! recursive descent: a specifier is parsed into a type AST, then each
//! declarator is parsed with the pending type threaded through an explicit
//! stack (prefix pointers push onto it, function suffixes peek it for
//! their return type), and the composition algorithms splice arrays and
//! functions at the right level by comparing parenthesization depths.

use crate::ast::{Alignment, Arena, ArraySize, AstId, Kind, MemberKind, Node};
use crate::compose::{add_array, add_function, patch_placeholder};
use crate::diag::{Diagnostic, Loc};
use crate::keyword::{self, KeywordCtx};
use crate::lang::Lang;
use crate::lexer::Token;
use crate::oper::{self, OpId};
use crate::parse::{Parsed, Tokens, name_expected, unexpected};
use crate::sname::ScopedName;
use crate::typedefs::TypedefTable;
use crate::types::*;

/// What the declared name turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    None,
    Operator(OpId),
    Destructor,
    /// Conversion operator; the payload is the target type.
    Conversion(AstId),
    /// `operator"" _suffix`
    Literal,
}

pub struct GibberishParser<'a> {
    ts: Tokens<'a>,
    arena: Arena,
    lang: Lang,
    typedefs: &'a TypedefTable,
    /// Count of currently-open declarator parentheses.
    depth: u32,
    special: Special,
}

/// Parses a complete declaration: specifier plus one or more declarators.
pub fn parse_decl(
    toks: &[Token],
    lang: Lang,
    typedefs: &TypedefTable,
) -> Result<Parsed, Diagnostic> {
    let mut p = GibberishParser::new(toks, lang, typedefs);
    p.run()
}

/// Parses a C-syntax cast `( type abstract-declarator ) name`; returns the
/// cast type and the optional name of the thing being cast.
pub fn parse_cast(
    toks: &[Token],
    lang: Lang,
    typedefs: &TypedefTable,
) -> Result<(Parsed, Option<String>), Diagnostic> {
    let mut p = GibberishParser::new(toks, lang, typedefs);
    p.ts.expect("(")?;
    let (type_id, implicit_int) = p.specifier()?;
    let root = p.parse_one_declarator(type_id)?;
    p.ts.expect(")")?;
    let castee = match p.ts.peek() {
        Some(t) if t.is_ident() => {
            let name = t.text.clone();
            p.ts.next();
            Some(name)
        }
        _ => None,
    };
    if let Some(t) = p.ts.peek() {
        return Err(unexpected(Some(t), p.ts.last_loc()));
    }
    Ok((
        Parsed {
            arena: p.arena,
            roots: vec![root],
            implicit_int,
        },
        castee,
    ))
}

impl<'a> GibberishParser<'a> {
    fn new(toks: &'a [Token], lang: Lang, typedefs: &'a TypedefTable) -> Self {
        GibberishParser {
            ts: Tokens::new(toks),
            arena: Arena::new(),
            lang,
            typedefs,
            depth: 0,
            special: Special::None,
        }
    }

    fn run(&mut self) -> Result<Parsed, Diagnostic> {
        let (type_id, mut implicit_int) = self.specifier()?;
        let mut roots = Vec::new();
        let mut first = true;
        loop {
            let tid = if first {
                type_id
            } else {
                self.arena.clone_subtree(type_id)
            };
            first = false;
            let root = self.parse_one_declarator(tid)?;
            if matches!(
                self.arena.kind(root),
                Kind::Constructor { .. } | Kind::Destructor | Kind::UserDefConversion { .. }
            ) {
                // These have no return type, so nothing was implicit.
                implicit_int = false;
            }
            roots.push(root);
            if !self.ts.eat(",") {
                break;
            }
        }
        self.ts.eat(";");
        if let Some(t) = self.ts.peek() {
            return Err(unexpected(Some(t), self.ts.last_loc()));
        }
        Ok(Parsed {
            arena: std::mem::take(&mut self.arena),
            roots,
            implicit_int,
        })
    }

    fn parse_one_declarator(&mut self, type_id: AstId) -> Result<AstId, Diagnostic> {
        self.special = Special::None;
        let mut pending = vec![type_id];
        let d = self.declarator(&mut pending)?;
        Ok(patch_placeholder(&mut self.arena, type_id, Some(d)))
    }

    fn node(&mut self, kind: Kind, loc: Loc) -> AstId {
        self.arena.alloc(Node::new(kind, loc, self.depth))
    }

    fn placeholder(&mut self, loc: Loc) -> AstId {
        self.node(Kind::Placeholder, loc)
    }

    // ----------------------------------------------------------------
    // Specifier
    // ----------------------------------------------------------------

    /// Parses the specifier sequence into a single type AST node, checking
    /// the bit combination after every addition. The bool is true when no
    /// base type appeared and `int` was assumed.
    fn specifier(&mut self) -> Result<(AstId, bool), Diagnostic> {
        let start_loc = self.ts.loc();
        let mut bits = TypeBits::NONE;
        let mut ecsu: Option<ScopedName> = None;
        let mut ecsu_of: Option<AstId> = None;
        let mut typedef_name: Option<String> = None;
        let mut bitint_width: u32 = 0;
        let mut align = Alignment::None;

        loop {
            let Some(tok) = self.ts.peek() else { break };
            let loc = tok.loc;

            if tok.is("[[") {
                self.parse_attr_list(&mut bits)?;
                continue;
            }
            if tok.is("alignas") || tok.is("_Alignas") {
                self.ts.next();
                align = self.parse_alignas()?;
                continue;
            }
            if !tok.is_ident() {
                break;
            }
            let word = tok.text.as_str();

            // `auto` is a storage class in C and pre-C++11, a deduced type
            // after; the two meanings share a literal but not a bit.
            if word == "auto" {
                self.ts.next();
                let bit = if self.lang.is_cpp() && self.lang != Lang::Cpp98 && self.lang != Lang::Cpp03
                {
                    TB_AUTO
                } else {
                    TS_AUTO
                };
                self.add_checked(&mut bits, bit, loc)?;
                continue;
            }

            if matches!(word, "enum" | "struct" | "class" | "union") && ecsu.is_none() {
                let (tag, of) = self.parse_ecsu(&mut bits)?;
                ecsu = Some(tag);
                ecsu_of = of;
                continue;
            }

            if word == "_BitInt" {
                self.ts.next();
                self.add_checked(&mut bits, TB_BITINT, loc)?;
                self.ts.expect("(")?;
                let n = self.expect_number()?;
                self.ts.expect(")")?;
                if n == 0 || n > 128 {
                    return Err(Diagnostic::error(
                        loc,
                        format!("\"{}\": invalid _BitInt width; must be 1..128", n),
                    ));
                }
                bitint_width = n as u32;
                continue;
            }

            if let Some(kw) = keyword::lookup(word, false) {
                if kw.bit == 0 {
                    break;
                }
                self.ts.next();
                self.add_checked(&mut bits, kw.bit, loc)?;
                continue;
            }

            // A typedef name acts as the base type when none has appeared.
            if self.typedefs.is_typedef(word)
                && typedef_name.is_none()
                && ecsu.is_none()
                && bits.base & VALUE_MASK == 0
            {
                typedef_name = Some(word.to_string());
                self.ts.next();
                self.add_checked(&mut bits, TB_TYPEDEF, loc)?;
                continue;
            }

            break;
        }

        let implicit_int =
            bits.base & VALUE_MASK == 0 && ecsu.is_none() && typedef_name.is_none();
        bits = bits.normalize();
        if implicit_int {
            // No base at all, not even a modifier: assume int.
            bits.add_bit(TB_INT, start_loc, false).ok();
        }

        let node_id = if let Some(tag) = ecsu {
            let mut n = Node::new(
                Kind::Ecsu {
                    tag,
                    of: ecsu_of,
                },
                start_loc,
                self.depth,
            );
            n.bits = bits;
            n.align = align;
            let id = self.arena.alloc(n);
            if let Some(of) = ecsu_of {
                self.arena.node_mut(of).parent = Some(id);
            }
            id
        } else if let Some(tname) = typedef_name {
            let td = self
                .typedefs
                .lookup(&tname)
                .expect("typedef presence just checked");
            let for_id = td.arena.deep_copy_into(td.root, &mut self.arena);
            let mut n = Node::new(
                Kind::Typedef {
                    for_id,
                    tname: ScopedName::from_name(tname),
                },
                start_loc,
                self.depth,
            );
            n.bits = bits;
            n.align = align;
            let id = self.arena.alloc(n);
            self.arena.node_mut(for_id).parent = Some(id);
            id
        } else {
            let mut n = Node::new(
                Kind::Builtin {
                    bit_width: bitint_width,
                },
                start_loc,
                self.depth,
            );
            n.bits = bits;
            n.align = align;
            self.arena.alloc(n)
        };
        Ok((node_id, implicit_int))
    }

    /// Adds a bit and verifies the combination is legal somewhere.
    fn add_checked(&mut self, bits: &mut TypeBits, bit: u64, loc: Loc) -> Result<(), Diagnostic> {
        bits.add_bit(bit, loc, false)?;
        if bits.check().is_empty() {
            let mut names = names_of(bits.base, false);
            names.extend(names_of(bits.store, false));
            return Err(Diagnostic::error(
                loc,
                format!("\"{}\" is an illegal combination", names.join(" ")),
            ));
        }
        Ok(())
    }

    /// `enum|struct|class|union [ident[::ident...]] [: base]`
    fn parse_ecsu(
        &mut self,
        bits: &mut TypeBits,
    ) -> Result<(ScopedName, Option<AstId>), Diagnostic> {
        let kw = self.ts.next().expect("caller saw the keyword");
        let kw_loc = kw.loc;
        let bit = match kw.text.as_str() {
            "enum" => TB_ENUM,
            "struct" => TB_STRUCT,
            "class" => TB_CLASS,
            _ => TB_UNION,
        };
        self.add_checked(bits, bit, kw_loc)?;
        // Scoped enums: `enum class` / `enum struct`.
        if bit == TB_ENUM
            && let Some(t) = self.ts.peek()
            && (t.is("class") || t.is("struct"))
        {
            let inner_bit = if t.is("class") { TB_CLASS } else { TB_STRUCT };
            let loc = t.loc;
            self.ts.next();
            self.add_checked(bits, inner_bit, loc)?;
        }
        let kind_bit = bit;
        let mut tag = ScopedName::new();
        while let Some(t) = self.ts.peek() {
            if !t.is_ident() || keyword::lookup(&t.text, false).is_some() {
                break;
            }
            let name = t.text.clone();
            self.ts.next();
            if self.ts.eat("::") {
                tag.push(name, TB_SCOPE);
            } else {
                tag.push(name, kind_bit);
                break;
            }
        }
        if tag.is_empty() {
            return Err(name_expected(self.ts.peek(), self.ts.last_loc()));
        }
        // C++11 enum base: `enum E : int`.
        let mut of = None;
        if bit == TB_ENUM && self.ts.eat(":") {
            let (base_id, _) = self.specifier()?;
            of = Some(base_id);
        }
        Ok((tag, of))
    }

    /// `[[attr, attr...]]`
    fn parse_attr_list(&mut self, bits: &mut TypeBits) -> Result<(), Diagnostic> {
        self.ts.expect("[[")?;
        loop {
            let Some(tok) = self.ts.peek() else {
                return Err(unexpected(None, self.ts.last_loc()));
            };
            if !tok.is_ident() {
                return Err(unexpected(Some(tok), self.ts.last_loc()));
            }
            let loc = tok.loc;
            match keyword::lookup(&tok.text, false) {
                Some(kw) if kw.bit & PART_MASK == PART_ATTR => {
                    self.ts.next();
                    self.add_checked(bits, kw.bit, loc)?;
                }
                _ => {
                    return Err(Diagnostic::error(
                        loc,
                        format!("\"{}\": unknown attribute", tok.text),
                    ));
                }
            }
            // Attributes may have argument lists we do not interpret.
            if self.ts.eat("(") {
                let mut depth = 1;
                while depth > 0 {
                    match self.ts.next() {
                        Some(t) if t.is("(") => depth += 1,
                        Some(t) if t.is(")") => depth -= 1,
                        Some(_) => {}
                        None => return Err(unexpected(None, self.ts.last_loc())),
                    }
                }
            }
            if self.ts.eat(",") {
                continue;
            }
            self.ts.expect("]]")?;
            return Ok(());
        }
    }

    /// `alignas(N)` or `alignas(type)`.
    fn parse_alignas(&mut self) -> Result<Alignment, Diagnostic> {
        self.ts.expect("(")?;
        let align = match self.ts.peek() {
            Some(t) if t.value.is_some() => {
                let n = t.value.unwrap();
                self.ts.next();
                Alignment::Bytes(n)
            }
            _ => {
                let (type_id, _) = self.specifier()?;
                Alignment::Type(type_id)
            }
        };
        self.ts.expect(")")?;
        Ok(align)
    }

    fn expect_number(&mut self) -> Result<u64, Diagnostic> {
        match self.ts.peek() {
            Some(t) if t.value.is_some() => {
                let v = t.value.unwrap();
                self.ts.next();
                Ok(v)
            }
            other => Err(unexpected(other, self.ts.last_loc())),
        }
    }

    // ----------------------------------------------------------------
    // Declarator
    // ----------------------------------------------------------------

    fn declarator(&mut self, pending: &mut Vec<AstId>) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();

        if self.ts.eat("*") {
            let quals = self.qualifier_bits()?;
            let ph = self.placeholder(loc);
            let mut n = Node::new(Kind::Pointer { to: ph }, loc, self.depth);
            n.bits.store = quals;
            let ptr = self.arena.alloc(n);
            self.arena.node_mut(ph).parent = Some(ptr);
            pending.push(ptr);
            let inner = self.declarator(pending)?;
            pending.pop();
            return Ok(patch_placeholder(&mut self.arena, ptr, Some(inner)));
        }
        if self.ts.eat("&") {
            return self.reference_declarator(pending, loc, false);
        }
        if self.ts.eat("&&") {
            return self.reference_declarator(pending, loc, true);
        }
        if let Some(class_sname) = self.try_pointer_to_member()? {
            let quals = self.qualifier_bits()?;
            let ph = self.placeholder(loc);
            let mut n = Node::new(
                Kind::PointerToMember {
                    to: ph,
                    class_sname,
                },
                loc,
                self.depth,
            );
            n.bits.store = quals;
            let ptm = self.arena.alloc(n);
            self.arena.node_mut(ph).parent = Some(ptm);
            pending.push(ptm);
            let inner = self.declarator(pending)?;
            pending.pop();
            return Ok(patch_placeholder(&mut self.arena, ptm, Some(inner)));
        }

        let mut cur = self.direct_declarator(pending)?;

        loop {
            if self.ts.peek_is("[") && !self.ts.peek_is("[[") {
                let arr = self.array_suffix()?;
                cur = add_array(&mut self.arena, Some(cur), arr);
                continue;
            }
            if self.ts.peek_is("(") {
                cur = self.function_suffix(cur, pending)?;
                continue;
            }
            break;
        }
        Ok(cur)
    }

    fn reference_declarator(
        &mut self,
        pending: &mut Vec<AstId>,
        loc: Loc,
        rvalue: bool,
    ) -> Result<AstId, Diagnostic> {
        let ph = self.placeholder(loc);
        let kind = if rvalue {
            Kind::RvalueReference { to: ph }
        } else {
            Kind::Reference { to: ph }
        };
        let r = self.arena.alloc(Node::new(kind, loc, self.depth));
        self.arena.node_mut(ph).parent = Some(r);
        pending.push(r);
        let inner = self.declarator(pending)?;
        pending.pop();
        Ok(patch_placeholder(&mut self.arena, r, Some(inner)))
    }

    /// Matches `ident:: [ident::]* *`, the pointer-to-member prefix.
    fn try_pointer_to_member(&mut self) -> Result<Option<ScopedName>, Diagnostic> {
        let mark = self.ts.save();
        let mut sname = ScopedName::new();
        while let Some(t) = self.ts.peek() {
            if t.is_ident()
                && keyword::lookup(&t.text, false).is_none()
                && self.ts.peek_at(1).is_some_and(|n| n.is("::"))
            {
                sname.push(t.text.clone(), TB_CLASS);
                self.ts.next();
                self.ts.next();
            } else {
                break;
            }
        }
        if !sname.is_empty() && self.ts.eat("*") {
            return Ok(Some(sname));
        }
        self.ts.restore(mark);
        Ok(None)
    }

    /// Collects pointer qualifiers: `const`, `volatile`, `restrict`,
    /// `_Atomic`.
    fn qualifier_bits(&mut self) -> Result<u64, Diagnostic> {
        let mut bits = TypeBits::NONE;
        while let Some(t) = self.ts.peek() {
            if !t.is_ident() {
                break;
            }
            match keyword::lookup(&t.text, false) {
                Some(kw) if kw.bit & TS_ANY_QUALIFIER & VALUE_MASK != 0 => {
                    let loc = t.loc;
                    self.ts.next();
                    bits.add_bit(kw.bit, loc, false)?;
                }
                _ => break,
            }
        }
        Ok(bits.store)
    }

    fn direct_declarator(&mut self, pending: &mut Vec<AstId>) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();

        if self.ts.peek_is("(") && self.paren_starts_declarator() {
            self.ts.next();
            self.depth += 1;
            let d = self.declarator(pending)?;
            self.depth -= 1;
            self.ts.expect(")")?;
            return Ok(d);
        }

        if self.ts.eat("~") {
            let Some(t) = self.ts.peek() else {
                return Err(name_expected(None, self.ts.last_loc()));
            };
            if !t.is_ident() {
                return Err(name_expected(Some(t), self.ts.last_loc()));
            }
            let name = t.text.clone();
            self.ts.next();
            self.special = Special::Destructor;
            let ph = self.placeholder(loc);
            self.arena.node_mut(ph).sname = ScopedName::from_name(format!("~{}", name));
            return Ok(ph);
        }

        if self.ts.peek().is_some_and(|t| t.is_ident()) {
            let sname = self.scoped_name()?;
            let ph = self.placeholder(loc);
            self.arena.node_mut(ph).sname = sname;
            return Ok(ph);
        }

        // Abstract declarator: no name at all.
        Ok(self.placeholder(loc))
    }

    /// After `(`: true if the parenthesis wraps a nested declarator rather
    /// than starting a parameter list.
    fn paren_starts_declarator(&self) -> bool {
        match self.ts.peek_at(1) {
            None => false,
            Some(t) => {
                if t.is("*") || t.is("&") || t.is("&&") || t.is("(") || t.is("~") {
                    return true;
                }
                if t.is(")") || t.is("...") {
                    return false;
                }
                if t.is_ident() {
                    // A type word or typedef name starts a parameter list;
                    // any other identifier is a parenthesized name (or a
                    // pointer-to-member prefix).
                    return keyword::lookup(&t.text, false).is_none()
                        && !self.typedefs.is_typedef(&t.text);
                }
                false
            }
        }
    }

    /// Parses a (possibly scoped) name, handling `operator`, conversion
    /// operators, destructors in scope (`S::~S`), and literal operators.
    fn scoped_name(&mut self) -> Result<ScopedName, Diagnostic> {
        let mut sname = ScopedName::new();
        loop {
            let Some(t) = self.ts.peek() else {
                return Err(name_expected(None, self.ts.last_loc()));
            };
            if t.is("~") {
                self.ts.next();
                let Some(n) = self.ts.peek() else {
                    return Err(name_expected(None, self.ts.last_loc()));
                };
                let name = n.text.clone();
                self.ts.next();
                self.special = Special::Destructor;
                sname.push(format!("~{}", name), TB_SCOPE);
                return Ok(sname);
            }
            if !t.is_ident() {
                return Err(name_expected(Some(t), self.ts.last_loc()));
            }
            if t.is("operator") && self.lang.is_cpp() {
                self.ts.next();
                return self.operator_name(sname);
            }
            let name = t.text.clone();
            self.ts.next();
            if self.ts.eat("::") {
                sname.push(name, TB_SCOPE);
            } else {
                sname.push(name, TB_SCOPE);
                return Ok(sname);
            }
        }
    }

    /// The part after the `operator` keyword.
    fn operator_name(&mut self, mut sname: ScopedName) -> Result<ScopedName, Diagnostic> {
        let loc = self.ts.loc();
        let Some(t) = self.ts.peek() else {
            return Err(unexpected(None, self.ts.last_loc()));
        };

        // Literal operator: `operator"" _suffix`.
        if t.text == "\"\"" {
            self.ts.next();
            let Some(n) = self.ts.peek() else {
                return Err(name_expected(None, self.ts.last_loc()));
            };
            let suffix = n.text.clone();
            self.ts.next();
            self.special = Special::Literal;
            sname.push(format!("operator\"\" {}", suffix), TB_SCOPE);
            return Ok(sname);
        }

        // `operator new`, `operator delete`, optionally with `[]`.
        if t.is("new") || t.is("delete") {
            let mut lit = t.text.clone();
            self.ts.next();
            if self.ts.eat("[") {
                self.ts.expect("]")?;
                lit.push_str("[]");
            }
            let op = oper::lookup(&lit).expect("new/delete are in the table");
            self.special = Special::Operator(op.id);
            sname.push(format!("operator {}", lit), TB_SCOPE);
            return Ok(sname);
        }

        // Conversion operator: `operator` followed by a type.
        if t.is_ident()
            && (keyword::lookup(&t.text, false).is_some_and(|k| k.bit & PART_MASK == PART_BASE)
                || self.typedefs.is_typedef(&t.text))
        {
            let (type_id, _) = self.specifier()?;
            let target = self.conversion_target(type_id)?;
            self.special = Special::Conversion(target);
            sname.push("operator", TB_SCOPE);
            return Ok(sname);
        }

        // Symbol operators: `()` and `[]` are two tokens, the rest one.
        let lit = if t.is("(") {
            self.ts.next();
            self.ts.expect(")")?;
            "()".to_string()
        } else if t.is("[") {
            self.ts.next();
            self.ts.expect("]")?;
            "[]".to_string()
        } else {
            let text = t.text.clone();
            self.ts.next();
            text
        };
        match oper::lookup(&lit) {
            Some(op) => {
                self.special = Special::Operator(op.id);
                sname.push(format!("operator{}", lit), TB_SCOPE);
                Ok(sname)
            }
            None => Err(Diagnostic::error(
                loc,
                format!("\"{}\": not an overloadable operator", lit),
            )),
        }
    }

    /// Wraps the conversion target type in any prefix pointers:
    /// `operator int*()`.
    fn conversion_target(&mut self, type_id: AstId) -> Result<AstId, Diagnostic> {
        let mut target = type_id;
        while self.ts.peek_is("*") {
            let loc = self.ts.loc();
            self.ts.next();
            let quals = self.qualifier_bits()?;
            let mut n = Node::new(Kind::Pointer { to: target }, loc, self.depth);
            n.bits.store = quals;
            let ptr = self.arena.alloc(n);
            self.arena.node_mut(target).parent = Some(ptr);
            target = ptr;
        }
        Ok(target)
    }

    // ----------------------------------------------------------------
    // Suffixes
    // ----------------------------------------------------------------

    /// `[ ]`, `[N]`, `[*]`, `[static N]`, `[qualifiers N]`.
    fn array_suffix(&mut self) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        self.ts.expect("[")?;
        let mut store = TypeBits::NONE;
        let mut non_empty = false;
        loop {
            let Some(t) = self.ts.peek() else {
                return Err(unexpected(None, self.ts.last_loc()));
            };
            if t.is("static") {
                let l = t.loc;
                self.ts.next();
                store.add_bit(TS_NON_EMPTY_ARRAY, l, false)?;
                non_empty = true;
                continue;
            }
            if t.is_ident()
                && let Some(kw) = keyword::lookup(&t.text, false)
                && kw.bit & TS_ANY_QUALIFIER & VALUE_MASK != 0
            {
                let l = t.loc;
                self.ts.next();
                store.add_bit(kw.bit, l, false)?;
                continue;
            }
            break;
        }
        let size = if self.ts.eat("]") {
            if non_empty {
                return Err(Diagnostic::error(
                    loc,
                    "\"static\" requires an array dimension",
                ));
            }
            ArraySize::Unspecified
        } else if self.ts.eat("*") {
            self.ts.expect("]")?;
            ArraySize::Variable
        } else {
            let n = self.expect_number()?;
            self.ts.expect("]")?;
            if non_empty {
                ArraySize::NonEmpty(n)
            } else {
                ArraySize::Explicit(n)
            }
        };
        let ph = self.placeholder(loc);
        let mut n = Node::new(Kind::Array { of: ph, size }, loc, self.depth);
        n.bits = store;
        let arr = self.arena.alloc(n);
        self.arena.node_mut(ph).parent = Some(arr);
        Ok(arr)
    }

    /// `( params ) [cv] [ref-qual] [noexcept|throw()] [final|override]
    /// [= 0 | = default | = delete]`
    fn function_suffix(
        &mut self,
        cur: AstId,
        pending: &mut Vec<AstId>,
    ) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        self.ts.expect("(")?;
        let special = std::mem::replace(&mut self.special, Special::None);
        let params = self.param_list()?;
        self.ts.expect(")")?;
        let store = self.function_qualifiers()?;

        // Constructors are spotted by their `S::S` name shape.
        let is_ctor = {
            let sname = &self.arena.node(cur).sname;
            sname.len() >= 2 && {
                let parts = sname.parts();
                parts[parts.len() - 1].name == parts[parts.len() - 2].name
            }
        };

        let kind = match special {
            Special::Destructor => {
                if !params.is_empty() {
                    return Err(Diagnostic::error(
                        loc,
                        "destructors may not have parameters",
                    ));
                }
                Kind::Destructor
            }
            Special::Conversion(target) => {
                if !params.is_empty() {
                    return Err(Diagnostic::error(
                        loc,
                        "user-defined conversions may not have parameters",
                    ));
                }
                Kind::UserDefConversion { to: target }
            }
            Special::Operator(op) => {
                let ph = self.placeholder(loc);
                Kind::Operator {
                    ret: ph,
                    params,
                    op,
                    member: MemberKind::Unspecified,
                }
            }
            Special::Literal => {
                let ph = self.placeholder(loc);
                Kind::UserDefLiteral { ret: ph, params }
            }
            Special::None if is_ctor => Kind::Constructor { params },
            Special::None => {
                let ph = self.placeholder(loc);
                Kind::Function { ret: ph, params }
            }
        };

        let mut n = Node::new(kind, loc, self.depth);
        n.bits.store = store;
        let func = self.arena.alloc(n);
        if let Some(ret_ph) = self.arena.primary_child(func) {
            self.arena.node_mut(ret_ph).parent = Some(func);
        }
        if let Some(ps) = self.arena.node(func).kind.params() {
            for p in ps.to_vec() {
                self.arena.node_mut(p).parent = Some(func);
            }
        }

        let has_ret_slot = matches!(
            self.arena.kind(func),
            Kind::Function { .. } | Kind::Operator { .. } | Kind::UserDefLiteral { .. }
        );
        if has_ret_slot {
            let ret = *pending.last().expect("specifier is always pending");
            Ok(add_function(&mut self.arena, cur, ret, func))
        } else {
            // Constructors, destructors, conversions: no return to adopt.
            self.arena.take_name(func, cur);
            Ok(func)
        }
    }

    fn function_qualifiers(&mut self) -> Result<u64, Diagnostic> {
        let mut bits = TypeBits::NONE;
        loop {
            let Some(t) = self.ts.peek() else { break };
            let loc = t.loc;
            if t.is("const") || t.is("volatile") {
                let kw = keyword::lookup(&t.text, false).expect("cv keywords exist");
                self.ts.next();
                bits.add_bit(kw.bit, loc, false)?;
                continue;
            }
            if t.is("&") {
                self.ts.next();
                bits.add_bit(TS_REFERENCE, loc, false)?;
                continue;
            }
            if t.is("&&") {
                self.ts.next();
                bits.add_bit(TS_RVALUE_REFERENCE, loc, false)?;
                continue;
            }
            if t.is("noexcept") {
                self.ts.next();
                bits.add_bit(TS_NOEXCEPT, loc, false)?;
                // noexcept(expr): skip the parenthesized operand.
                if self.ts.eat("(") {
                    let mut depth = 1;
                    while depth > 0 {
                        match self.ts.next() {
                            Some(t) if t.is("(") => depth += 1,
                            Some(t) if t.is(")") => depth -= 1,
                            Some(_) => {}
                            None => return Err(unexpected(None, self.ts.last_loc())),
                        }
                    }
                }
                continue;
            }
            if t.is("throw") {
                self.ts.next();
                bits.add_bit(TS_THROW, loc, false)?;
                self.ts.expect("(")?;
                self.ts.expect(")")?;
                continue;
            }
            if t.is("final") {
                self.ts.next();
                bits.add_bit(TS_FINAL, loc, false)?;
                continue;
            }
            if t.is("override") {
                self.ts.next();
                bits.add_bit(TS_OVERRIDE, loc, false)?;
                continue;
            }
            if t.is("=") {
                self.ts.next();
                let Some(what) = self.ts.next() else {
                    return Err(unexpected(None, self.ts.last_loc()));
                };
                let bit = match what.text.as_str() {
                    "0" => TS_PURE_VIRTUAL,
                    "default" => TS_DEFAULT,
                    "delete" => TS_DELETE,
                    _ => {
                        return Err(unexpected(Some(what), self.ts.last_loc()));
                    }
                };
                bits.add_bit(bit, what.loc, false)?;
                continue;
            }
            break;
        }
        Ok(bits.store)
    }

    // ----------------------------------------------------------------
    // Parameters
    // ----------------------------------------------------------------

    fn param_list(&mut self) -> Result<Vec<AstId>, Diagnostic> {
        let mut params = Vec::new();
        if self.ts.peek_is(")") {
            return Ok(params);
        }
        loop {
            if self.ts.peek_is("...") {
                let loc = self.ts.loc();
                self.ts.next();
                params.push(self.node(Kind::Variadic, loc));
            } else {
                params.push(self.param()?);
            }
            if !self.ts.eat(",") {
                break;
            }
        }
        Ok(params)
    }

    fn param(&mut self) -> Result<AstId, Diagnostic> {
        let loc = self.ts.loc();
        // K&R style: a bare name with no type at all.
        if let Some(t) = self.ts.peek()
            && t.is_ident()
            && keyword::lookup(&t.text, false).is_none()
            && !self.typedefs.is_typedef(&t.text)
            && self
                .ts
                .peek_at(1)
                .is_none_or(|n| n.is(",") || n.is(")"))
        {
            let name = t.text.clone();
            self.ts.next();
            let id = self.node(Kind::Name, loc);
            self.arena.node_mut(id).sname = ScopedName::from_name(name);
            return Ok(id);
        }
        let saved_special = self.special;
        let (type_id, _) = self.specifier()?;
        let mut pending = vec![type_id];
        let d = self.declarator(&mut pending)?;
        let root = patch_placeholder(&mut self.arena, type_id, Some(d));
        self.special = saved_special;
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{LexOpts, tokenize};

    fn parse(input: &str) -> Parsed {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        parse_decl(&toks, Lang::C11, &table).unwrap()
    }

    fn parse_cpp(input: &str) -> Parsed {
        let toks = tokenize(input, LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        parse_decl(&toks, Lang::Cpp17, &table).unwrap()
    }

    #[test]
    fn test_pointer_to_array() {
        let p = parse("int (*x)[5]");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Pointer { .. }));
        assert_eq!(p.arena.node(root).sname.to_string(), "x");
        let arr = p.arena.primary_child(root).unwrap();
        assert!(matches!(
            p.arena.kind(arr),
            Kind::Array {
                size: ArraySize::Explicit(5),
                ..
            }
        ));
        let int_id = p.arena.primary_child(arr).unwrap();
        assert!(p.arena.node(int_id).bits.has(TB_INT));
    }

    #[test]
    fn test_array_of_pointer() {
        let p = parse("int *a[5]");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Array { .. }));
        assert_eq!(p.arena.node(root).sname.to_string(), "a");
        let ptr = p.arena.primary_child(root).unwrap();
        assert!(matches!(p.arena.kind(ptr), Kind::Pointer { .. }));
    }

    #[test]
    fn test_function_returning_pointer() {
        let p = parse("int *f(char)");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Function { .. }));
        assert_eq!(p.arena.node(root).sname.to_string(), "f");
        let ret = p.arena.primary_child(root).unwrap();
        assert!(matches!(p.arena.kind(ret), Kind::Pointer { .. }));
    }

    #[test]
    fn test_pointer_to_function() {
        let p = parse("int (*f)(char, long)");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Pointer { .. }));
        let func = p.arena.primary_child(root).unwrap();
        match p.arena.kind(func) {
            Kind::Function { params, .. } => assert_eq!(params.len(), 2),
            other => panic!("expected function, got {}", other.name()),
        }
    }

    #[test]
    fn test_static_array() {
        let p = parse("static int x[4]");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Array { .. }));
        assert!(p.arena.node(root).bits.has(TS_STATIC));
    }

    #[test]
    fn test_multi_dimension() {
        let p = parse("int a[2][3]");
        let root = p.roots[0];
        let Kind::Array { size, .. } = p.arena.kind(root) else {
            panic!("expected array");
        };
        assert_eq!(*size, ArraySize::Explicit(2));
        let inner = p.arena.primary_child(root).unwrap();
        let Kind::Array { size, .. } = p.arena.kind(inner) else {
            panic!("expected inner array");
        };
        assert_eq!(*size, ArraySize::Explicit(3));
    }

    #[test]
    fn test_comma_declarators() {
        let p = parse("int x, *y");
        assert_eq!(p.roots.len(), 2);
        assert!(matches!(p.arena.kind(p.roots[0]), Kind::Builtin { .. }));
        assert!(matches!(p.arena.kind(p.roots[1]), Kind::Pointer { .. }));
    }

    #[test]
    fn test_typedef_reference() {
        let p = parse("size_t n");
        let root = p.roots[0];
        let Kind::Typedef { tname, .. } = p.arena.kind(root) else {
            panic!("expected typedef reference");
        };
        assert_eq!(tname.to_string(), "size_t");
    }

    #[test]
    fn test_implicit_int_flagged() {
        let p = parse("x");
        assert!(p.implicit_int);
        let p2 = parse("unsigned x");
        assert!(!p2.implicit_int);
    }

    #[test]
    fn test_vla_and_nonempty() {
        let p = parse("void f(int a[*], int b[static 5])");
        let root = p.roots[0];
        let Kind::Function { params, .. } = p.arena.kind(root) else {
            panic!("expected function");
        };
        let params = params.clone();
        let Kind::Array { size, .. } = p.arena.kind(params[0]) else {
            panic!("expected array param");
        };
        assert_eq!(*size, ArraySize::Variable);
        let Kind::Array { size, .. } = p.arena.kind(params[1]) else {
            panic!("expected array param");
        };
        assert_eq!(*size, ArraySize::NonEmpty(5));
    }

    #[test]
    fn test_reference_declarator() {
        let p = parse_cpp("int &r");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Reference { .. }));
    }

    #[test]
    fn test_pointer_to_member() {
        let p = parse_cpp("int C::*pm");
        let root = p.roots[0];
        let Kind::PointerToMember { class_sname, .. } = p.arena.kind(root) else {
            panic!("expected pointer to member");
        };
        assert_eq!(class_sname.to_string(), "C");
    }

    #[test]
    fn test_operator_parse() {
        let p = parse_cpp("int T::operator+(int)");
        let root = p.roots[0];
        let Kind::Operator { op, params, .. } = p.arena.kind(root) else {
            panic!("expected operator");
        };
        assert_eq!(*op, OpId::Plus);
        assert_eq!(params.len(), 1);
        assert_eq!(p.arena.node(root).sname.to_string(), "T::operator+");
    }

    #[test]
    fn test_constructor_shape() {
        let p = parse_cpp("S::S(int)");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Constructor { .. }));
        assert!(!p.implicit_int);
    }

    #[test]
    fn test_destructor_shape() {
        let p = parse_cpp("S::~S()");
        let root = p.roots[0];
        assert!(matches!(p.arena.kind(root), Kind::Destructor));
    }

    #[test]
    fn test_cast_parse() {
        let toks = tokenize("(int*)p", LexOpts::default()).unwrap();
        let table = TypedefTable::with_predefined();
        let (parsed, castee) = parse_cast(&toks, Lang::C11, &table).unwrap();
        assert_eq!(castee.as_deref(), Some("p"));
        assert!(matches!(
            parsed.arena.kind(parsed.roots[0]),
            Kind::Pointer { .. }
        ));
    }

    #[test]
    fn test_knr_params() {
        let toks = tokenize("f(a, b)", LexOpts::default()).unwrap();
        let table = TypedefTable::new();
        let p = parse_decl(&toks, Lang::Knr, &table).unwrap();
        let Kind::Function { params, .. } = p.arena.kind(p.roots[0]) else {
            panic!("expected function");
        };
        let params = params.clone();
        assert_eq!(params.len(), 2);
        assert!(matches!(p.arena.kind(params[0]), Kind::Name));
    }

    #[test]
    fn test_function_cv_ref_quals() {
        let p = parse_cpp("int S::f() const &&");
        let root = p.roots[0];
        assert!(p.arena.node(root).bits.has(TS_CONST));
        assert!(p.arena.node(root).bits.has(TS_RVALUE_REFERENCE));
    }

    #[test]
    fn test_enum_with_base() {
        let p = parse_cpp("enum E : unsigned x");
        let root = p.roots[0];
        let Kind::Ecsu { tag, of } = p.arena.kind(root) else {
            panic!("expected ecsu");
        };
        assert_eq!(tag.to_string(), "E");
        assert!(of.is_some());
    }

    #[test]
    fn test_attribute_specifier() {
        let p = parse_cpp("[[nodiscard]] int f(void)");
        let root = p.roots[0];
        assert!(p.arena.node(root).bits.has(TA_NODISCARD));
    }

    #[test]
    fn test_error_unexpected() {
        let toks = tokenize("int x y", LexOpts::default()).unwrap();
        let table = TypedefTable::new();
        assert!(parse_decl(&toks, Lang::C11, &table).is_err());
    }

    #[test]
    fn test_error_illegal_combo() {
        let toks = tokenize("short double x", LexOpts::default()).unwrap();
        let table = TypedefTable::new();
        let err = parse_decl(&toks, Lang::C11, &table).unwrap_err();
        assert!(err.message.contains("illegal"));
    }
}
