//! The keyword table.
//!
//! Maps surface literals to their type bits and the dialects they are valid
//! in. Both grammars consult it: the C/C++ grammar looks up gibberish
//! spellings (`_Atomic`, `wchar_t`), the pseudo-English grammar also
//! accepts the English aliases (`atomic`, `constant`, `non-returning`).
//! Non-type structure words of the English grammar (`pointer`, `array`,
//! `returning`, ...) are handled directly by the parser and do not appear
//! here.

use crate::lang::{Lang, LangSet};
use crate::types::*;

/// Which grammar(s) accept a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCtx {
    /// Valid in both the C/C++ grammar and the English grammar.
    All,
    /// Only meaningful as a C/C++ token (e.g. `_Bool`, `__restrict`).
    GibberishOnly,
    /// Only meaningful as an English word (e.g. `constant`, `automatic`).
    EnglishOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct Keyword {
    pub literal: &'static str,
    /// Part-tagged type bit this keyword contributes; 0 for keywords that
    /// are structure, not type (handled by the grammars directly).
    pub bit: u64,
    pub langs: LangSet,
    pub ctx: KeywordCtx,
}

const fn kw(literal: &'static str, bit: u64, langs: LangSet, ctx: KeywordCtx) -> Keyword {
    Keyword {
        literal,
        bit,
        langs,
        ctx,
    }
}

const NOT_KNR: LangSet = LangSet(LangSet::ALL.0 & !0x1);
const A: KeywordCtx = KeywordCtx::All;
const G: KeywordCtx = KeywordCtx::GibberishOnly;
const E: KeywordCtx = KeywordCtx::EnglishOnly;

/// Every type-bit keyword, including aliases. Multiple rows may map to the
/// same bit (e.g. `const`, `constant`, `__const`).
pub static KEYWORDS: &[Keyword] = &[
    // Base types.
    kw("void", TB_VOID, NOT_KNR, A),
    kw("auto", TB_AUTO, LangSet::cpp_min(Lang::Cpp11), G),
    kw("bool", TB_BOOL, LangSet::c_cpp_min(Lang::C23, Lang::Cpp98), A),
    kw("_Bool", TB_BOOL, LangSet::c_min(Lang::C99), G),
    kw("char", TB_CHAR, LangSet::ALL, A),
    kw("char8_t", TB_CHAR8, LangSet::c_cpp_min(Lang::C23, Lang::Cpp20), A),
    kw("char16_t", TB_CHAR16, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11), A),
    kw("char32_t", TB_CHAR32, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11), A),
    kw("wchar_t", TB_WCHAR, NOT_KNR, A),
    kw("short", TB_SHORT, LangSet::ALL, A),
    kw("int", TB_INT, LangSet::ALL, A),
    kw("long", TB_LONG, LangSet::ALL, A),
    kw("signed", TB_SIGNED, NOT_KNR, A),
    kw("__signed", TB_SIGNED, LangSet::ALL, G),
    kw("__signed__", TB_SIGNED, LangSet::ALL, G),
    kw("unsigned", TB_UNSIGNED, LangSet::ALL, A),
    kw("float", TB_FLOAT, LangSet::ALL, A),
    kw("double", TB_DOUBLE, LangSet::ALL, A),
    kw("_Complex", TB_COMPLEX, LangSet::c_min(Lang::C99), G),
    kw("complex", TB_COMPLEX, LangSet::c_min(Lang::C99), E),
    kw("_Imaginary", TB_IMAGINARY, LangSet::c_min(Lang::C99), G),
    kw("imaginary", TB_IMAGINARY, LangSet::c_min(Lang::C99), E),
    kw("_BitInt", TB_BITINT, LangSet::c_min(Lang::C23), A),
    kw("_Accum", TB_ACCUM, LangSet::c_min(Lang::C99), G),
    kw("_Fract", TB_FRACT, LangSet::c_min(Lang::C99), G),
    kw("_Sat", TB_SAT, LangSet::c_min(Lang::C99), G),
    kw("enum", TB_ENUM, NOT_KNR, A),
    kw("struct", TB_STRUCT, LangSet::ALL, A),
    kw("class", TB_CLASS, LangSet::CPP, A),
    kw("union", TB_UNION, LangSet::ALL, A),
    kw("namespace", TB_NAMESPACE, LangSet::CPP, A),
    kw("scope", TB_SCOPE, LangSet::CPP, E),
    // Storage classes and specifiers.
    kw("automatic", TS_AUTO, LangSet(LangSet::C.0 | LangSet::cpp_max(Lang::Cpp03).0), E),
    kw("__block", TS_APPLE_BLOCK, LangSet::ALL, G),
    kw("extern", TS_EXTERN, LangSet::ALL, A),
    kw("register", TS_REGISTER, LangSet(LangSet::C.0 | LangSet::cpp_max(Lang::Cpp14).0), A),
    kw("static", TS_STATIC, LangSet::ALL, A),
    kw("mutable", TS_MUTABLE, LangSet::CPP, A),
    kw("typedef", TS_TYPEDEF, LangSet::ALL, A),
    kw("thread_local", TS_THREAD_LOCAL, LangSet::c_cpp_min(Lang::C23, Lang::Cpp11), A),
    kw("_Thread_local", TS_THREAD_LOCAL, LangSet::c_min(Lang::C11), G),
    kw("consteval", TS_CONSTEVAL, LangSet::cpp_min(Lang::Cpp20), A),
    kw("constexpr", TS_CONSTEXPR, LangSet::c_cpp_min(Lang::C23, Lang::Cpp11), A),
    kw("constinit", TS_CONSTINIT, LangSet::cpp_min(Lang::Cpp20), A),
    kw("default", TS_DEFAULT, LangSet::cpp_min(Lang::Cpp11), A),
    kw("defaulted", TS_DEFAULT, LangSet::cpp_min(Lang::Cpp11), E),
    kw("delete", TS_DELETE, LangSet::cpp_min(Lang::Cpp11), A),
    kw("deleted", TS_DELETE, LangSet::cpp_min(Lang::Cpp11), E),
    kw("explicit", TS_EXPLICIT, LangSet::CPP, A),
    kw("export", TS_EXPORT, LangSet::CPP, A),
    kw("exported", TS_EXPORT, LangSet::CPP, E),
    kw("final", TS_FINAL, LangSet::cpp_min(Lang::Cpp11), A),
    kw("friend", TS_FRIEND, LangSet::CPP, A),
    kw("inline", TS_INLINE, LangSet::c_cpp_min(Lang::C99, Lang::Cpp98), A),
    kw("noexcept", TS_NOEXCEPT, LangSet::cpp_min(Lang::Cpp11), A),
    kw("no-exception", TS_NOEXCEPT, LangSet::cpp_min(Lang::Cpp11), E),
    kw("override", TS_OVERRIDE, LangSet::cpp_min(Lang::Cpp11), A),
    kw("overridden", TS_OVERRIDE, LangSet::cpp_min(Lang::Cpp11), E),
    kw("throw", TS_THROW, LangSet::cpp_max(Lang::Cpp14), A),
    kw("virtual", TS_VIRTUAL, LangSet::CPP, A),
    // Qualifiers.
    kw("_Atomic", TS_ATOMIC, LangSet::c_min(Lang::C11), G),
    kw("atomic", TS_ATOMIC, LangSet::c_min(Lang::C11), E),
    kw("const", TS_CONST, NOT_KNR, A),
    kw("constant", TS_CONST, NOT_KNR, E),
    kw("__const", TS_CONST, LangSet::ALL, G),
    kw("restrict", TS_RESTRICT, LangSet::c_min(Lang::C99), A),
    kw("restricted", TS_RESTRICT, LangSet::c_min(Lang::C99), E),
    kw("__restrict", TS_RESTRICT, LangSet::ALL, G),
    kw("volatile", TS_VOLATILE, NOT_KNR, A),
    kw("__volatile", TS_VOLATILE, LangSet::ALL, G),
    // UPC qualifiers.
    kw("relaxed", TS_UPC_RELAXED, LangSet::single(Lang::C99), E),
    kw("shared", TS_UPC_SHARED, LangSet::single(Lang::C99), E),
    kw("strict", TS_UPC_STRICT, LangSet::single(Lang::C99), E),
    // Attributes; the C/C++ grammar reaches these via `[[...]]`, the
    // English grammar as plain words.
    kw("carries_dependency", TA_CARRIES_DEPENDENCY, LangSet::cpp_min(Lang::Cpp11), A),
    kw("carries-dependency", TA_CARRIES_DEPENDENCY, LangSet::cpp_min(Lang::Cpp11), E),
    kw("deprecated", TA_DEPRECATED, LangSet::c_cpp_min(Lang::C23, Lang::Cpp14), A),
    kw("maybe_unused", TA_MAYBE_UNUSED, LangSet::c_cpp_min(Lang::C23, Lang::Cpp17), A),
    kw("maybe-unused", TA_MAYBE_UNUSED, LangSet::c_cpp_min(Lang::C23, Lang::Cpp17), E),
    kw("nodiscard", TA_NODISCARD, LangSet::c_cpp_min(Lang::C23, Lang::Cpp17), A),
    kw("no-discard", TA_NODISCARD, LangSet::c_cpp_min(Lang::C23, Lang::Cpp17), E),
    kw("noreturn", TA_NORETURN, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11), A),
    kw("_Noreturn", TA_NORETURN, LangSet::c_min(Lang::C11), G),
    kw("non-returning", TA_NORETURN, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11), E),
    kw("no_unique_address", TA_NO_UNIQUE_ADDRESS, LangSet::cpp_min(Lang::Cpp20), A),
    kw("non-unique-address", TA_NO_UNIQUE_ADDRESS, LangSet::cpp_min(Lang::Cpp20), E),
    kw("reproducible", TA_REPRODUCIBLE, LangSet::c_min(Lang::C23), A),
    kw("unsequenced", TA_UNSEQUENCED, LangSet::c_min(Lang::C23), A),
    // Microsoft calling conventions.
    kw("__cdecl", TA_MSC_CDECL, LangSet::ALL, A),
    kw("cdecl", TA_MSC_CDECL, LangSet::ALL, E),
    kw("__clrcall", TA_MSC_CLRCALL, LangSet::ALL, A),
    kw("__fastcall", TA_MSC_FASTCALL, LangSet::ALL, A),
    kw("__stdcall", TA_MSC_STDCALL, LangSet::ALL, A),
    kw("__thiscall", TA_MSC_THISCALL, LangSet::ALL, A),
    kw("__vectorcall", TA_MSC_VECTORCALL, LangSet::ALL, A),
];

/// Looks up a literal for the given grammar. Returns the keyword even when
/// it is not valid in `lang` so the caller can produce a "not supported
/// until ..." diagnostic instead of a generic parse error.
pub fn lookup(literal: &str, english: bool) -> Option<&'static Keyword> {
    KEYWORDS.iter().find(|k| {
        k.literal == literal
            && match k.ctx {
                KeywordCtx::All => true,
                KeywordCtx::GibberishOnly => !english,
                KeywordCtx::EnglishOnly => english,
            }
    })
}

/// True if the literal is a reserved word in the C/C++ grammar for the
/// given dialect, and so cannot be used as a declared name.
pub fn is_reserved(literal: &str, lang: Lang) -> bool {
    lookup(literal, false).is_some_and(|k| k.langs.contains(lang))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_gibberish() {
        let k = lookup("_Bool", false).unwrap();
        assert_eq!(k.bit, TB_BOOL);
        assert!(lookup("_Bool", true).is_none());
    }

    #[test]
    fn test_lookup_english_alias() {
        let k = lookup("constant", true).unwrap();
        assert_eq!(k.bit, TS_CONST);
        assert!(lookup("constant", false).is_none());
    }

    #[test]
    fn test_lookup_shared() {
        assert_eq!(lookup("const", true).unwrap().bit, TS_CONST);
        assert_eq!(lookup("const", false).unwrap().bit, TS_CONST);
    }

    #[test]
    fn test_lang_gating() {
        let k = lookup("char8_t", false).unwrap();
        assert!(!k.langs.contains(Lang::Cpp17));
        assert!(k.langs.contains(Lang::Cpp20));
        assert!(k.langs.contains(Lang::C23));
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved("int", Lang::C89));
        assert!(!is_reserved("class", Lang::C89));
        assert!(is_reserved("class", Lang::Cpp17));
    }

    #[test]
    fn test_bool_spellings() {
        // `bool` is a keyword proper only in C23 and C++; `_Bool` from C99.
        let b = lookup("bool", false).unwrap();
        assert!(b.langs.contains(Lang::C23));
        assert!(!b.langs.contains(Lang::C11));
    }
}
