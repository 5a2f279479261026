//! The three-part type-bit algebra.
//!
//! A type is a triple of bitsets: base type (`TB_*`), storage class /
//! qualifier / linkage / ref-qualifier (`TS_*`), and attribute (`TA_*`).
//! Each part's integer carries a 4-bit part tag in its top bits so a single
//! value can be routed to the right sub-operations without knowing its part
//! statically.
//!
//! Adding bits enforces the combination rules (`signed unsigned` is
//! rejected, `long long long` is rejected, duplicates other than `long` are
//! rejected). [`TypeBits::check`] evaluates the whole combination against
//! every dialect and returns the set of dialects in which it is legal; an
//! empty set means the combination is illegal everywhere.

use crate::diag::{Diagnostic, Loc};
use crate::lang::{Lang, LangSet};

/// Part tag occupying the top 4 bits of every bit constant.
pub const PART_MASK: u64 = 0xF << 60;
pub const PART_BASE: u64 = 0x1 << 60;
pub const PART_STORE: u64 = 0x2 << 60;
pub const PART_ATTR: u64 = 0x4 << 60;
/// Everything below the part tag.
pub const VALUE_MASK: u64 = !PART_MASK;

const fn tb(n: u64) -> u64 {
    PART_BASE | (1 << n)
}
const fn ts(n: u64) -> u64 {
    PART_STORE | (1 << n)
}
const fn ta(n: u64) -> u64 {
    PART_ATTR | (1 << n)
}

// Base types.
pub const TB_VOID: u64 = tb(0);
pub const TB_AUTO: u64 = tb(1); // deduced type, C++11
pub const TB_BOOL: u64 = tb(2);
pub const TB_CHAR: u64 = tb(3);
pub const TB_CHAR8: u64 = tb(4);
pub const TB_CHAR16: u64 = tb(5);
pub const TB_CHAR32: u64 = tb(6);
pub const TB_WCHAR: u64 = tb(7);
pub const TB_SHORT: u64 = tb(8);
pub const TB_INT: u64 = tb(9);
pub const TB_LONG: u64 = tb(10);
pub const TB_LONG_LONG: u64 = tb(11);
pub const TB_SIGNED: u64 = tb(12);
pub const TB_UNSIGNED: u64 = tb(13);
pub const TB_FLOAT: u64 = tb(14);
pub const TB_DOUBLE: u64 = tb(15);
pub const TB_COMPLEX: u64 = tb(16);
pub const TB_IMAGINARY: u64 = tb(17);
pub const TB_BITINT: u64 = tb(18);
pub const TB_ENUM: u64 = tb(19);
pub const TB_STRUCT: u64 = tb(20);
pub const TB_CLASS: u64 = tb(21);
pub const TB_UNION: u64 = tb(22);
pub const TB_NAMESPACE: u64 = tb(23);
pub const TB_SCOPE: u64 = tb(24);
pub const TB_TYPEDEF: u64 = tb(25); // reference to a typedef'd name
pub const TB_ACCUM: u64 = tb(26);
pub const TB_FRACT: u64 = tb(27);
pub const TB_SAT: u64 = tb(28);

// Storage classes, qualifiers, linkage, ref-qualifiers.
pub const TS_AUTO: u64 = ts(0); // storage-class auto, pre-C++11
pub const TS_APPLE_BLOCK: u64 = ts(1); // __block
pub const TS_EXTERN: u64 = ts(2);
pub const TS_EXTERN_C: u64 = ts(3);
pub const TS_REGISTER: u64 = ts(4);
pub const TS_STATIC: u64 = ts(5);
pub const TS_MUTABLE: u64 = ts(6);
pub const TS_TYPEDEF: u64 = ts(7);
pub const TS_THREAD_LOCAL: u64 = ts(8);
pub const TS_CONSTEVAL: u64 = ts(9);
pub const TS_CONSTEXPR: u64 = ts(10);
pub const TS_CONSTINIT: u64 = ts(11);
pub const TS_DEFAULT: u64 = ts(12);
pub const TS_DELETE: u64 = ts(13);
pub const TS_EXPLICIT: u64 = ts(14);
pub const TS_EXPORT: u64 = ts(15);
pub const TS_FINAL: u64 = ts(16);
pub const TS_FRIEND: u64 = ts(17);
pub const TS_INLINE: u64 = ts(18);
pub const TS_NOEXCEPT: u64 = ts(19);
pub const TS_OVERRIDE: u64 = ts(20);
pub const TS_PURE_VIRTUAL: u64 = ts(21);
pub const TS_THIS: u64 = ts(22); // explicit object parameter
pub const TS_THROW: u64 = ts(23); // dynamic exception specification
pub const TS_VIRTUAL: u64 = ts(24);
pub const TS_ATOMIC: u64 = ts(25);
pub const TS_CONST: u64 = ts(26);
pub const TS_RESTRICT: u64 = ts(27);
pub const TS_VOLATILE: u64 = ts(28);
pub const TS_NON_EMPTY_ARRAY: u64 = ts(29); // C99 array[static N]
pub const TS_REFERENCE: u64 = ts(30); // & ref-qualifier
pub const TS_RVALUE_REFERENCE: u64 = ts(31); // && ref-qualifier
pub const TS_UPC_RELAXED: u64 = ts(32);
pub const TS_UPC_SHARED: u64 = ts(33);
pub const TS_UPC_STRICT: u64 = ts(34);

// Attributes.
pub const TA_CARRIES_DEPENDENCY: u64 = ta(0);
pub const TA_DEPRECATED: u64 = ta(1);
pub const TA_MAYBE_UNUSED: u64 = ta(2);
pub const TA_NODISCARD: u64 = ta(3);
pub const TA_NORETURN: u64 = ta(4);
pub const TA_NO_UNIQUE_ADDRESS: u64 = ta(5);
pub const TA_REPRODUCIBLE: u64 = ta(6);
pub const TA_UNSEQUENCED: u64 = ta(7);
pub const TA_MSC_CDECL: u64 = ta(8);
pub const TA_MSC_CLRCALL: u64 = ta(9);
pub const TA_MSC_FASTCALL: u64 = ta(10);
pub const TA_MSC_STDCALL: u64 = ta(11);
pub const TA_MSC_THISCALL: u64 = ta(12);
pub const TA_MSC_VECTORCALL: u64 = ta(13);

// Useful masks (value bits only, tag included via the constituent bits).

/// Base-type modifiers that combine with a primary base.
pub const TB_ANY_MODIFIER: u64 =
    TB_SHORT | TB_LONG | TB_LONG_LONG | TB_SIGNED | TB_UNSIGNED | TB_COMPLEX | TB_IMAGINARY | TB_SAT;

/// Primary bases; at most one may be present.
pub const TB_ANY_PRIMARY: u64 = TB_VOID
    | TB_AUTO
    | TB_BOOL
    | TB_CHAR
    | TB_CHAR8
    | TB_CHAR16
    | TB_CHAR32
    | TB_WCHAR
    | TB_INT
    | TB_FLOAT
    | TB_DOUBLE
    | TB_BITINT
    | TB_ENUM
    | TB_STRUCT
    | TB_CLASS
    | TB_UNION
    | TB_NAMESPACE
    | TB_SCOPE
    | TB_TYPEDEF
    | TB_ACCUM
    | TB_FRACT;

/// Class-like tag bits.
pub const TB_ANY_CLASS: u64 = TB_STRUCT | TB_CLASS | TB_UNION;

/// True storage classes: mutually exclusive with each other, migrated to
/// the declared entity by the composition algorithms.
pub const TS_ANY_STORAGE: u64 = TS_AUTO
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
    | TS_DEFAULT
    | TS_DELETE
    | TS_EXPLICIT
    | TS_EXPORT
    | TS_FINAL
    | TS_FRIEND
    | TS_INLINE
    | TS_OVERRIDE
    | TS_PURE_VIRTUAL
    | TS_VIRTUAL;

/// Storage classes of which at most one may appear (thread_local composes
/// with static and extern).
pub const TS_EXCLUSIVE_STORAGE: u64 =
    TS_AUTO | TS_APPLE_BLOCK | TS_EXTERN | TS_MUTABLE | TS_REGISTER | TS_STATIC | TS_TYPEDEF;

/// cv-qualifiers and friends.
pub const TS_ANY_QUALIFIER: u64 = TS_ATOMIC
    | TS_CONST
    | TS_RESTRICT
    | TS_VOLATILE
    | TS_UPC_RELAXED
    | TS_UPC_SHARED
    | TS_UPC_STRICT;

/// Function ref-qualifiers.
pub const TS_ANY_REFERENCE: u64 = TS_REFERENCE | TS_RVALUE_REFERENCE;

/// Bits only meaningful on a member function.
pub const TS_MEMBER_FUNC_ONLY: u64 = TS_CONST
    | TS_VOLATILE
    | TS_REFERENCE
    | TS_RVALUE_REFERENCE
    | TS_FINAL
    | TS_OVERRIDE
    | TS_VIRTUAL
    | TS_PURE_VIRTUAL
    | TS_DEFAULT
    | TS_DELETE;

/// MSC calling conventions.
pub const TA_ANY_MSC_CALL: u64 = TA_MSC_CDECL
    | TA_MSC_CLRCALL
    | TA_MSC_FASTCALL
    | TA_MSC_STDCALL
    | TA_MSC_THISCALL
    | TA_MSC_VECTORCALL;

/// Inverts the value bits of a part-tagged integer, preserving the tag.
pub const fn complement(bits: u64) -> u64 {
    (!bits & VALUE_MASK) | (bits & PART_MASK)
}

/// Removes `bits` from `mask`, preserving `mask`'s part tag. A plain
/// bitwise and-not would clear the tag along with the value bits.
pub const fn minus(mask: u64, bits: u64) -> u64 {
    (mask & !bits & VALUE_MASK) | (mask & PART_MASK)
}

/// Name table entry for a single bit: C spelling, optional pseudo-English
/// spelling, and the dialects in which the bit itself is legal.
struct BitInfo {
    bit: u64,
    c_name: &'static str,
    english_name: Option<&'static str>,
    langs: LangSet,
}

const NOT_KNR: LangSet = LangSet(LangSet::ALL.0 & !0x1);
const C_ONLY_ALL: LangSet = LangSet::C;
const CPP_ONLY_ALL: LangSet = LangSet::CPP;

macro_rules! bits {
    ($($bit:expr, $c:expr, $eng:expr, $langs:expr;)*) => {
        &[ $( BitInfo { bit: $bit, c_name: $c, english_name: $eng, langs: $langs } ),* ]
    };
}

/// Canonical printing order: storage first, then modifiers, then primary.
static BASE_INFO: &[BitInfo] = bits![
    TB_SIGNED, "signed", None, NOT_KNR;
    TB_UNSIGNED, "unsigned", None, LangSet::ALL;
    TB_SHORT, "short", None, LangSet::ALL;
    TB_LONG, "long", None, LangSet::ALL;
    TB_LONG_LONG, "long long", None, LangSet::c_cpp_min(Lang::C99, Lang::Cpp11);
    TB_SAT, "_Sat", Some("saturated"), LangSet::c_min(Lang::C99);
    TB_COMPLEX, "_Complex", Some("complex"), LangSet::c_min(Lang::C99);
    TB_IMAGINARY, "_Imaginary", Some("imaginary"), LangSet::c_min(Lang::C99);
    TB_VOID, "void", None, NOT_KNR;
    TB_AUTO, "auto", None, LangSet::cpp_min(Lang::Cpp11);
    TB_BOOL, "bool", None, LangSet::c_cpp_min(Lang::C99, Lang::Cpp98);
    TB_CHAR, "char", None, LangSet::ALL;
    TB_CHAR8, "char8_t", None, LangSet::c_cpp_min(Lang::C23, Lang::Cpp20);
    TB_CHAR16, "char16_t", None, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11);
    TB_CHAR32, "char32_t", None, LangSet::c_cpp_min(Lang::C11, Lang::Cpp11);
    TB_WCHAR, "wchar_t", None, NOT_KNR;
    TB_INT, "int", None, LangSet::ALL;
    TB_FLOAT, "float", None, LangSet::ALL;
    TB_DOUBLE, "double", None, LangSet::ALL;
    TB_BITINT, "_BitInt", None, LangSet::c_min(Lang::C23);
    TB_ACCUM, "_Accum", None, LangSet::c_min(Lang::C99);
    TB_FRACT, "_Fract", None, LangSet::c_min(Lang::C99);
    TB_ENUM, "enum", None, NOT_KNR;
    TB_STRUCT, "struct", None, LangSet::ALL;
    TB_CLASS, "class", None, CPP_ONLY_ALL;
    TB_UNION, "union", None, LangSet::ALL;
    TB_NAMESPACE, "namespace", None, CPP_ONLY_ALL;
    TB_SCOPE, "scope", None, CPP_ONLY_ALL;
    TB_TYPEDEF, "typedef", Some("typedef type"), LangSet::ALL;
];

static STORE_INFO: &[BitInfo] = bits![
    TS_AUTO, "auto", Some("automatic"), LangSet(LangSet::C.0 | LangSet::cpp_max(Lang::Cpp03).0);
    TS_APPLE_BLOCK, "__block", None, LangSet::ALL;
    TS_EXTERN, "extern", None, LangSet::ALL;
    TS_EXTERN_C, "extern \"C\"", Some("external \"C\" linkage"), CPP_ONLY_ALL;
    TS_REGISTER, "register", None, LangSet(LangSet::C.0 | LangSet::cpp_max(Lang::Cpp14).0);
    TS_STATIC, "static", None, LangSet::ALL;
    TS_MUTABLE, "mutable", None, CPP_ONLY_ALL;
    TS_TYPEDEF, "typedef", None, LangSet::ALL;
    TS_THREAD_LOCAL, "thread_local", Some("thread local"), LangSet::c_cpp_min(Lang::C11, Lang::Cpp11);
    TS_CONSTEVAL, "consteval", None, LangSet::cpp_min(Lang::Cpp20);
    TS_CONSTEXPR, "constexpr", None, LangSet::c_cpp_min(Lang::C23, Lang::Cpp11);
    TS_CONSTINIT, "constinit", None, LangSet::cpp_min(Lang::Cpp20);
    TS_DEFAULT, "default", Some("defaulted"), LangSet::cpp_min(Lang::Cpp11);
    TS_DELETE, "delete", Some("deleted"), LangSet::cpp_min(Lang::Cpp11);
    TS_EXPLICIT, "explicit", None, CPP_ONLY_ALL;
    TS_EXPORT, "export", Some("exported"), CPP_ONLY_ALL;
    TS_FINAL, "final", None, LangSet::cpp_min(Lang::Cpp11);
    TS_FRIEND, "friend", None, CPP_ONLY_ALL;
    TS_INLINE, "inline", None, LangSet::c_cpp_min(Lang::C99, Lang::Cpp98);
    TS_NOEXCEPT, "noexcept", Some("no-exception"), LangSet::cpp_min(Lang::Cpp11);
    TS_OVERRIDE, "override", Some("overridden"), LangSet::cpp_min(Lang::Cpp11);
    TS_PURE_VIRTUAL, "= 0", Some("pure virtual"), CPP_ONLY_ALL;
    TS_THIS, "this", None, LangSet::cpp_min(Lang::Cpp23);
    TS_THROW, "throw", Some("non-throwing"), LangSet::cpp_max(Lang::Cpp14);
    TS_VIRTUAL, "virtual", None, CPP_ONLY_ALL;
    TS_ATOMIC, "_Atomic", Some("atomic"), LangSet::c_min(Lang::C11);
    TS_CONST, "const", Some("constant"), NOT_KNR;
    TS_RESTRICT, "restrict", Some("restricted"), LangSet::c_min(Lang::C99);
    TS_VOLATILE, "volatile", None, NOT_KNR;
    TS_NON_EMPTY_ARRAY, "static", Some("non-empty"), LangSet::c_min(Lang::C99);
    TS_REFERENCE, "&", Some("reference"), LangSet::cpp_min(Lang::Cpp11);
    TS_RVALUE_REFERENCE, "&&", Some("rvalue reference"), LangSet::cpp_min(Lang::Cpp11);
    TS_UPC_RELAXED, "relaxed", None, LangSet::single(Lang::C99);
    TS_UPC_SHARED, "shared", None, LangSet::single(Lang::C99);
    TS_UPC_STRICT, "strict", None, LangSet::single(Lang::C99);
];

static ATTR_INFO: &[BitInfo] = bits![
    TA_CARRIES_DEPENDENCY, "carries_dependency", Some("carries dependency"), LangSet::cpp_min(Lang::Cpp11);
    TA_DEPRECATED, "deprecated", None, LangSet::c_cpp_min(Lang::C23, Lang::Cpp14);
    TA_MAYBE_UNUSED, "maybe_unused", Some("maybe unused"), LangSet::c_cpp_min(Lang::C23, Lang::Cpp17);
    TA_NODISCARD, "nodiscard", Some("no discard"), LangSet::c_cpp_min(Lang::C23, Lang::Cpp17);
    TA_NORETURN, "noreturn", Some("non-returning"), LangSet::c_cpp_min(Lang::C11, Lang::Cpp11);
    TA_NO_UNIQUE_ADDRESS, "no_unique_address", Some("non-unique address"), LangSet::cpp_min(Lang::Cpp20);
    TA_REPRODUCIBLE, "reproducible", None, LangSet::c_min(Lang::C23);
    TA_UNSEQUENCED, "unsequenced", None, LangSet::c_min(Lang::C23);
    TA_MSC_CDECL, "__cdecl", Some("cdecl"), LangSet::ALL;
    TA_MSC_CLRCALL, "__clrcall", Some("clrcall"), LangSet::ALL;
    TA_MSC_FASTCALL, "__fastcall", Some("fastcall"), LangSet::ALL;
    TA_MSC_STDCALL, "__stdcall", Some("stdcall"), LangSet::ALL;
    TA_MSC_THISCALL, "__thiscall", Some("thiscall"), LangSet::ALL;
    TA_MSC_VECTORCALL, "__vectorcall", Some("vectorcall"), LangSet::ALL;
];

fn info_for(bit: u64) -> Option<&'static BitInfo> {
    let table: &[BitInfo] = match bit & PART_MASK {
        PART_BASE => BASE_INFO,
        PART_STORE => STORE_INFO,
        PART_ATTR => ATTR_INFO,
        _ => return None,
    };
    table.iter().find(|i| i.bit == bit)
}

/// C spelling of a single bit.
pub fn name_c(bit: u64) -> &'static str {
    info_for(bit).map(|i| i.c_name).unwrap_or("<unknown>")
}

/// Pseudo-English spelling of a single bit, falling back to the C one.
pub fn name_english(bit: u64) -> &'static str {
    info_for(bit)
        .map(|i| i.english_name.unwrap_or(i.c_name))
        .unwrap_or("<unknown>")
}

/// Spelling used in error messages: the pseudo-English alias when the error
/// arises while translating English to gibberish, the C spelling otherwise.
pub fn name_error(bit: u64, in_english: bool) -> &'static str {
    if in_english { name_english(bit) } else { name_c(bit) }
}

/// Names of all value bits in a part-tagged integer, in canonical order.
pub fn names_of(bits: u64, in_english: bool) -> Vec<&'static str> {
    let table: &[BitInfo] = match bits & PART_MASK {
        PART_BASE => BASE_INFO,
        PART_STORE => STORE_INFO,
        PART_ATTR => ATTR_INFO,
        _ => return Vec::new(),
    };
    table
        .iter()
        .filter(|i| bits & i.bit & VALUE_MASK != 0)
        .map(|i| {
            if in_english {
                i.english_name.unwrap_or(i.c_name)
            } else {
                i.c_name
            }
        })
        .collect()
}

/// The complete type of one AST node: base, storage/qualifier, attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeBits {
    pub base: u64,
    pub store: u64,
    pub attr: u64,
}

impl TypeBits {
    pub const NONE: TypeBits = TypeBits {
        base: 0,
        store: 0,
        attr: 0,
    };

    pub fn from_bit(bit: u64) -> TypeBits {
        let mut t = TypeBits::NONE;
        match bit & PART_MASK {
            PART_BASE => t.base = bit,
            PART_STORE => t.store = bit,
            PART_ATTR => t.attr = bit,
            _ => {}
        }
        t
    }

    pub fn is_none(&self) -> bool {
        self.base & VALUE_MASK == 0 && self.store & VALUE_MASK == 0 && self.attr & VALUE_MASK == 0
    }

    pub fn has(&self, bit: u64) -> bool {
        let field = match bit & PART_MASK {
            PART_BASE => self.base,
            PART_STORE => self.store,
            PART_ATTR => self.attr,
            _ => return false,
        };
        field & bit & VALUE_MASK != 0
    }

    pub fn has_any(&self, mask: u64) -> bool {
        self.has(mask)
    }

    /// Projects the part of this type matching `mask`'s tag, masked to
    /// `mask`'s value bits.
    pub fn get_part(&self, mask: u64) -> u64 {
        let field = match mask & PART_MASK {
            PART_BASE => self.base,
            PART_STORE => self.store,
            PART_ATTR => self.attr,
            _ => return 0,
        };
        (field & mask & VALUE_MASK) | (mask & PART_MASK)
    }

    /// Removes the given bits, returning what was removed (0 when nothing
    /// was set, so callers can test the result directly).
    pub fn take(&mut self, mask: u64) -> u64 {
        let taken = self.get_part(mask);
        if taken & VALUE_MASK == 0 {
            return 0;
        }
        let field = match mask & PART_MASK {
            PART_BASE => &mut self.base,
            PART_STORE => &mut self.store,
            PART_ATTR => &mut self.attr,
            _ => return 0,
        };
        *field &= !(mask & VALUE_MASK);
        if *field & VALUE_MASK == 0 {
            *field = 0;
        }
        taken
    }

    fn or_in(&mut self, bit: u64) {
        match bit & PART_MASK {
            PART_BASE => self.base |= bit,
            PART_STORE => self.store |= bit,
            PART_ATTR => self.attr |= bit,
            _ => {}
        }
    }

    /// Union-adds a single part-tagged bit, enforcing the conflict rules.
    /// `in_english` selects the spelling used in error messages.
    pub fn add_bit(&mut self, bit: u64, loc: Loc, in_english: bool) -> Result<(), Diagnostic> {
        match bit & PART_MASK {
            PART_BASE => self.add_base(bit, loc, in_english),
            PART_STORE => self.add_store(bit, loc, in_english),
            PART_ATTR => {
                if self.has(bit) {
                    return Err(dup_err(bit, loc, in_english));
                }
                self.or_in(bit);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn add_base(&mut self, bit: u64, loc: Loc, in_english: bool) -> Result<(), Diagnostic> {
        if bit == TB_LONG {
            if self.has(TB_LONG_LONG) {
                return Err(Diagnostic::error(loc, "\"long long long\" is too long"));
            }
            if self.has(TB_LONG) {
                self.take(TB_LONG);
                self.or_in(TB_LONG_LONG);
                return Ok(());
            }
            self.or_in(TB_LONG);
            return Ok(());
        }
        if self.has(bit) {
            return Err(dup_err(bit, loc, in_english));
        }
        if bit == TB_SIGNED && self.has(TB_UNSIGNED) || bit == TB_UNSIGNED && self.has(TB_SIGNED) {
            return Err(conflict_err(bit, TB_SIGNED | TB_UNSIGNED, self, loc, in_english));
        }
        if bit == TB_SHORT && self.has(TB_LONG | TB_LONG_LONG)
            || (bit == TB_LONG || bit == TB_LONG_LONG) && self.has(TB_SHORT)
        {
            return Err(conflict_err(
                bit,
                TB_SHORT | TB_LONG | TB_LONG_LONG,
                self,
                loc,
                in_english,
            ));
        }
        // At most one primary base; modifiers stack.
        if bit & TB_ANY_PRIMARY & VALUE_MASK != 0 && self.has(TB_ANY_PRIMARY) {
            // "enum class"/"enum struct" is the one legal pairing; its
            // dialect gate is applied by check().
            let ecsu_pair = (bit == TB_ENUM && self.has(TB_CLASS | TB_STRUCT))
                || (bit & (TB_CLASS | TB_STRUCT) & VALUE_MASK != 0 && self.has(TB_ENUM));
            if !ecsu_pair {
                return Err(conflict_err(bit, TB_ANY_PRIMARY, self, loc, in_english));
            }
        }
        self.or_in(bit);
        Ok(())
    }

    fn add_store(&mut self, bit: u64, loc: Loc, in_english: bool) -> Result<(), Diagnostic> {
        if self.has(bit) {
            return Err(dup_err(bit, loc, in_english));
        }
        if bit & TS_EXCLUSIVE_STORAGE & VALUE_MASK != 0 && self.has(TS_EXCLUSIVE_STORAGE) {
            return Err(conflict_err(bit, TS_EXCLUSIVE_STORAGE, self, loc, in_english));
        }
        if bit & TS_ANY_REFERENCE & VALUE_MASK != 0 && self.has(TS_ANY_REFERENCE) {
            return Err(conflict_err(bit, TS_ANY_REFERENCE, self, loc, in_english));
        }
        self.or_in(bit);
        Ok(())
    }

    /// Union-adds every bit of `other`.
    pub fn add(&mut self, other: TypeBits, loc: Loc, in_english: bool) -> Result<(), Diagnostic> {
        for info in BASE_INFO {
            if other.has(info.bit) && info.bit != TB_LONG_LONG {
                self.add_bit(info.bit, loc, in_english)?;
            }
        }
        if other.has(TB_LONG_LONG) && !self.has(TB_LONG_LONG) {
            self.take(TB_LONG);
            self.or_in(TB_LONG_LONG);
        }
        for info in STORE_INFO {
            if other.has(info.bit) && !self.has(info.bit) {
                self.add_bit(info.bit, loc, in_english)?;
            }
        }
        for info in ATTR_INFO {
            if other.has(info.bit) && !self.has(info.bit) {
                self.add_bit(info.bit, loc, in_english)?;
            }
        }
        Ok(())
    }

    /// Merges without conflict checking; used when folding already-checked
    /// bits (composition, placeholder patching).
    pub fn union_with(&mut self, other: TypeBits) {
        if other.has(TB_LONG) && self.has(TB_LONG) {
            self.take(TB_LONG);
            self.or_in(TB_LONG_LONG);
            self.base |= minus(other.base, TB_LONG);
        } else {
            self.base |= other.base;
        }
        self.store |= other.store;
        self.attr |= other.attr;
    }

    /// Replaces a bare `signed` (other than `signed char`) with nothing and
    /// makes implicit `int` explicit: `unsigned` becomes `unsigned int`,
    /// `long` becomes `long int`.
    pub fn normalize(mut self) -> TypeBits {
        if self.has(TB_SIGNED) && !self.has(TB_CHAR) && !self.has(TB_BITINT) {
            self.take(TB_SIGNED);
        }
        let has_primary = self.has(TB_ANY_PRIMARY) || self.has(TB_DOUBLE);
        let has_modifier = self.has(TB_SHORT | TB_LONG | TB_LONG_LONG | TB_UNSIGNED);
        if !has_primary && has_modifier {
            self.or_in(TB_INT);
        }
        self
    }

    /// The set of dialects in which this combination of bits is legal. An
    /// empty set means the combination is illegal in every known dialect.
    pub fn check(&self) -> LangSet {
        let mut langs = LangSet::ALL;
        for table in [BASE_INFO, STORE_INFO, ATTR_INFO] {
            for info in table {
                if self.has(info.bit) {
                    langs = langs.intersect(info.langs);
                }
            }
        }
        if langs.is_empty() {
            return langs;
        }

        // Base-modifier applicability.
        if self.has(TB_SHORT) && self.has(minus(TB_ANY_PRIMARY, TB_INT | TB_ACCUM | TB_FRACT)) {
            return LangSet::NONE;
        }
        if self.has(TB_LONG | TB_LONG_LONG) {
            let ok = TB_INT | TB_DOUBLE | TB_ACCUM | TB_FRACT;
            if self.has(minus(TB_ANY_PRIMARY, ok)) && !self.has(TB_TYPEDEF) {
                // "long float" meant double in pre-ANSI C.
                if self.has(TB_FLOAT) && !self.has(TB_LONG_LONG) {
                    return langs.intersect(LangSet::single(Lang::Knr));
                }
                return LangSet::NONE;
            }
            if self.has(TB_LONG_LONG) && self.has(TB_DOUBLE) {
                return LangSet::NONE;
            }
        }
        if self.has(TB_SIGNED | TB_UNSIGNED) {
            let ok = TB_CHAR | TB_INT | TB_BITINT;
            if self.has(minus(TB_ANY_PRIMARY, ok)) {
                return LangSet::NONE;
            }
        }
        if self.has(TB_COMPLEX | TB_IMAGINARY) {
            let ok = TB_FLOAT | TB_DOUBLE;
            if self.has(minus(TB_ANY_PRIMARY, ok)) || self.has(TB_SIGNED | TB_UNSIGNED | TB_SHORT) {
                return LangSet::NONE;
            }
        }
        if self.has(TB_SAT) && !self.has(TB_ACCUM | TB_FRACT) {
            return LangSet::NONE;
        }
        // "enum class" requires C++11; plain enum+struct is never legal.
        if self.has(TB_ENUM) && self.has(TB_CLASS | TB_STRUCT) {
            if self.has(TB_UNION) {
                return LangSet::NONE;
            }
            langs = langs.intersect(LangSet::cpp_min(Lang::Cpp11));
        }

        // Storage sanity: restrict never applies to non-pointer bases; the
        // structural check knows the node kind, here only catch the
        // combinations no dialect accepts.
        if self.has(TS_CONSTEVAL | TS_CONSTINIT) && self.has(TS_CONSTEXPR) {
            return LangSet::NONE;
        }
        if self.has(TS_FRIEND) && self.has(TS_ANY_REFERENCE | TS_FINAL | TS_OVERRIDE | TS_VIRTUAL) {
            return LangSet::NONE;
        }
        langs
    }

    /// C rendering of the base part, e.g. `unsigned long int`.
    pub fn base_c_string(&self) -> String {
        names_of(self.base, false).join(" ")
    }

    /// English rendering of the base part.
    pub fn base_english_string(&self) -> String {
        names_of(self.base, true).join(" ")
    }
}

fn dup_err(bit: u64, loc: Loc, in_english: bool) -> Diagnostic {
    Diagnostic::error(
        loc,
        format!("duplicate \"{}\"", name_error(bit, in_english)),
    )
}

fn conflict_err(
    bit: u64,
    conflict_mask: u64,
    existing: &TypeBits,
    loc: Loc,
    in_english: bool,
) -> Diagnostic {
    let old = existing.get_part(conflict_mask & !(bit & VALUE_MASK));
    let old_names = names_of(old, in_english).join(" ");
    Diagnostic::error(
        loc,
        format!(
            "\"{}\" combined with \"{}\" is illegal",
            name_error(bit, in_english),
            old_names
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Loc {
        Loc::col(0, 0)
    }

    #[test]
    fn test_add_long_long() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_LONG, loc(), false).unwrap();
        t.add_bit(TB_LONG, loc(), false).unwrap();
        assert!(t.has(TB_LONG_LONG));
        assert!(!t.has(TB_LONG));
        let err = t.add_bit(TB_LONG, loc(), false).unwrap_err();
        assert!(err.message.contains("long long long"));
    }

    #[test]
    fn test_add_duplicate() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_INT, loc(), false).unwrap();
        let err = t.add_bit(TB_INT, loc(), false).unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_signed_unsigned_conflict() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_SIGNED, loc(), false).unwrap();
        assert!(t.add_bit(TB_UNSIGNED, loc(), false).is_err());
    }

    #[test]
    fn test_normalize_bare_signed() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_SIGNED, loc(), false).unwrap();
        let n = t.normalize();
        assert!(!n.has(TB_SIGNED));
        assert!(n.has(TB_INT));
    }

    #[test]
    fn test_normalize_signed_char_kept() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_SIGNED, loc(), false).unwrap();
        t.add_bit(TB_CHAR, loc(), false).unwrap();
        let n = t.normalize();
        assert!(n.has(TB_SIGNED));
        assert!(n.has(TB_CHAR));
        assert!(!n.has(TB_INT));
    }

    #[test]
    fn test_normalize_implicit_int() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_UNSIGNED, loc(), false).unwrap();
        let n = t.normalize();
        assert!(n.has(TB_INT));
        assert_eq!(n.base_c_string(), "unsigned int");
    }

    #[test]
    fn test_normalize_stable() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_LONG, loc(), false).unwrap();
        let once = t.normalize();
        assert_eq!(once.normalize(), once);
    }

    #[test]
    fn test_check_bool_langs() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_BOOL, loc(), false).unwrap();
        let langs = t.check();
        assert!(!langs.contains(Lang::C89));
        assert!(langs.contains(Lang::C99));
        assert!(langs.contains(Lang::Cpp98));
    }

    #[test]
    fn test_check_short_double_illegal() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_SHORT, loc(), false).unwrap();
        t.base |= TB_DOUBLE;
        assert!(t.check().is_empty());
    }

    #[test]
    fn test_check_long_float_knr_only() {
        let t = TypeBits {
            base: TB_LONG | TB_FLOAT,
            store: 0,
            attr: 0,
        };
        let langs = t.check();
        assert!(langs.contains(Lang::Knr));
        assert!(!langs.contains(Lang::C89));
    }

    #[test]
    fn test_check_monotone() {
        // Adding bits can only shrink the language set.
        let mut small = TypeBits::NONE;
        small.add_bit(TB_INT, loc(), false).unwrap();
        let mut big = small;
        big.add_bit(TB_UNSIGNED, loc(), false).unwrap();
        big.add_bit(TS_THREAD_LOCAL, loc(), false).unwrap();
        assert!(big.check().is_subset(small.check()));
    }

    #[test]
    fn test_complement_involution() {
        let bits = TS_CONST | TS_VOLATILE;
        assert_eq!(complement(complement(bits)), bits);
        assert_eq!(complement(bits) & PART_MASK, PART_STORE);
    }

    #[test]
    fn test_get_part_routing() {
        let mut t = TypeBits::NONE;
        t.add_bit(TB_INT, loc(), false).unwrap();
        t.add_bit(TS_STATIC, loc(), false).unwrap();
        assert_eq!(t.get_part(TS_ANY_STORAGE) & VALUE_MASK, TS_STATIC & VALUE_MASK);
        assert_eq!(t.get_part(TB_INT) & VALUE_MASK, TB_INT & VALUE_MASK);
    }

    #[test]
    fn test_take_storage() {
        let mut t = TypeBits::NONE;
        t.add_bit(TS_STATIC, loc(), false).unwrap();
        t.add_bit(TS_CONST, loc(), false).unwrap();
        let taken = t.take(TS_ANY_STORAGE);
        assert!(taken & TS_STATIC & VALUE_MASK != 0);
        assert!(!t.has(TS_STATIC));
        assert!(t.has(TS_CONST));
    }

    #[test]
    fn test_name_error_spelling() {
        assert_eq!(name_error(TA_NORETURN, true), "non-returning");
        assert_eq!(name_error(TA_NORETURN, false), "noreturn");
    }

    #[test]
    fn test_storage_exclusive() {
        let mut t = TypeBits::NONE;
        t.add_bit(TS_STATIC, loc(), false).unwrap();
        assert!(t.add_bit(TS_EXTERN, loc(), false).is_err());
        // thread_local composes with static.
        t.add_bit(TS_THREAD_LOCAL, loc(), false).unwrap();
    }

    #[test]
    fn test_size_t_equals_unsigned_long() {
        let mut size_t = TypeBits::NONE;
        size_t.add_bit(TB_UNSIGNED, loc(), false).unwrap();
        size_t.add_bit(TB_LONG, loc(), false).unwrap();
        let mut ul = TypeBits::NONE;
        ul.add_bit(TB_UNSIGNED, loc(), false).unwrap();
        ul.add_bit(TB_LONG, loc(), false).unwrap();
        assert_eq!(size_t.normalize(), ul.normalize());
    }
}
