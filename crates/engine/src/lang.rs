//! C/C++ dialect identifiers and dialect sets.
//!
//! Every type-bit combination, keyword, and checker rule is gated on a set
//! of dialects. A [`Lang`] is a single dialect; a [`LangSet`] is a bitset of
//! them. Helpers like [`LangSet::c_min`] build the "this version and later"
//! sets the checker uses constantly.

use std::fmt;
use std::str::FromStr;

/// A single C or C++ dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Knr,
    C89,
    C99,
    C11,
    C17,
    C23,
    Cpp98,
    Cpp03,
    Cpp11,
    Cpp14,
    Cpp17,
    Cpp20,
    Cpp23,
    Cpp26,
}

/// All dialects, oldest first within each family.
pub const ALL_LANGS: [Lang; 14] = [
    Lang::Knr,
    Lang::C89,
    Lang::C99,
    Lang::C11,
    Lang::C17,
    Lang::C23,
    Lang::Cpp98,
    Lang::Cpp03,
    Lang::Cpp11,
    Lang::Cpp14,
    Lang::Cpp17,
    Lang::Cpp20,
    Lang::Cpp23,
    Lang::Cpp26,
];

impl Lang {
    /// Bit position within a [`LangSet`]. C dialects occupy the low byte,
    /// C++ dialects the next.
    const fn bit(self) -> u16 {
        match self {
            Lang::Knr => 1 << 0,
            Lang::C89 => 1 << 1,
            Lang::C99 => 1 << 2,
            Lang::C11 => 1 << 3,
            Lang::C17 => 1 << 4,
            Lang::C23 => 1 << 5,
            Lang::Cpp98 => 1 << 8,
            Lang::Cpp03 => 1 << 9,
            Lang::Cpp11 => 1 << 10,
            Lang::Cpp14 => 1 << 11,
            Lang::Cpp17 => 1 << 12,
            Lang::Cpp20 => 1 << 13,
            Lang::Cpp23 => 1 << 14,
            Lang::Cpp26 => 1 << 15,
        }
    }

    pub fn is_cpp(self) -> bool {
        self.bit() & LangSet::CPP.0 != 0
    }

    pub fn is_c(self) -> bool {
        !self.is_cpp()
    }

    /// The value of `__STDC_VERSION__` for C dialects that define it.
    pub fn stdc_version(self) -> Option<&'static str> {
        match self {
            Lang::C99 => Some("199901L"),
            Lang::C11 => Some("201112L"),
            Lang::C17 => Some("201710L"),
            Lang::C23 => Some("202311L"),
            _ => None,
        }
    }

    /// The value of `__cplusplus` for C++ dialects.
    pub fn cplusplus(self) -> Option<&'static str> {
        match self {
            Lang::Cpp98 | Lang::Cpp03 => Some("199711L"),
            Lang::Cpp11 => Some("201103L"),
            Lang::Cpp14 => Some("201402L"),
            Lang::Cpp17 => Some("201703L"),
            Lang::Cpp20 => Some("202002L"),
            Lang::Cpp23 => Some("202302L"),
            Lang::Cpp26 => Some("202400L"),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lang::Knr => "K&R C",
            Lang::C89 => "C89",
            Lang::C99 => "C99",
            Lang::C11 => "C11",
            Lang::C17 => "C17",
            Lang::C23 => "C23",
            Lang::Cpp98 => "C++98",
            Lang::Cpp03 => "C++03",
            Lang::Cpp11 => "C++11",
            Lang::Cpp14 => "C++14",
            Lang::Cpp17 => "C++17",
            Lang::Cpp20 => "C++20",
            Lang::Cpp23 => "C++23",
            Lang::Cpp26 => "C++26",
        };
        f.write_str(s)
    }
}

impl FromStr for Lang {
    type Err = String;

    /// Accepts the `set` command's spellings: `c89`, `c++17`, `knr`, etc.
    /// Case-insensitive; `cpp17` and `c++17` are both accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let lang = match lower.as_str() {
            "knr" | "k&r" | "k&rc" => Lang::Knr,
            "c89" | "c90" => Lang::C89,
            "c99" => Lang::C99,
            "c11" => Lang::C11,
            "c17" | "c18" => Lang::C17,
            "c23" => Lang::C23,
            "c++98" | "cpp98" => Lang::Cpp98,
            "c++03" | "cpp03" => Lang::Cpp03,
            "c++11" | "cpp11" => Lang::Cpp11,
            "c++14" | "cpp14" => Lang::Cpp14,
            "c++17" | "cpp17" => Lang::Cpp17,
            "c++20" | "cpp20" => Lang::Cpp20,
            "c++23" | "cpp23" => Lang::Cpp23,
            "c++26" | "cpp26" => Lang::Cpp26,
            _ => return Err(format!("\"{}\": unknown language", s)),
        };
        Ok(lang)
    }
}

/// A set of dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LangSet(pub u16);

impl LangSet {
    pub const NONE: LangSet = LangSet(0);
    pub const C: LangSet = LangSet(0x00ff);
    pub const CPP: LangSet = LangSet(0xff00);
    pub const ALL: LangSet = LangSet(0xffff);

    pub const fn single(lang: Lang) -> LangSet {
        LangSet(lang.bit())
    }

    /// The given C dialect and every later C dialect (no C++).
    pub const fn c_min(lang: Lang) -> LangSet {
        let bit = lang.bit();
        let ge = !(bit - 1); // bit and everything above
        LangSet(ge & LangSet::C.0)
    }

    /// The given C++ dialect and every later C++ dialect (no C).
    pub const fn cpp_min(lang: Lang) -> LangSet {
        let bit = lang.bit();
        let ge = !(bit - 1);
        LangSet(ge & LangSet::CPP.0)
    }

    /// C dialects up to and including the given one.
    pub const fn c_max(lang: Lang) -> LangSet {
        let bit = lang.bit();
        let le = (bit - 1) | bit;
        LangSet(le & LangSet::C.0)
    }

    /// C++ dialects up to and including the given one.
    pub const fn cpp_max(lang: Lang) -> LangSet {
        let bit = lang.bit();
        let le = (bit - 1) | bit;
        LangSet(le & LangSet::CPP.0)
    }

    /// Union of [`c_min`](Self::c_min) and [`cpp_min`](Self::cpp_min).
    pub const fn c_cpp_min(c: Lang, cpp: Lang) -> LangSet {
        LangSet(LangSet::c_min(c).0 | LangSet::cpp_min(cpp).0)
    }

    pub const fn union(self, other: LangSet) -> LangSet {
        LangSet(self.0 | other.0)
    }

    pub const fn intersect(self, other: LangSet) -> LangSet {
        LangSet(self.0 & other.0)
    }

    pub const fn contains(self, lang: Lang) -> bool {
        self.0 & lang.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_subset(self, other: LangSet) -> bool {
        self.0 & !other.0 == 0
    }

    /// Earliest dialect in the set, used when phrasing "until C99" style
    /// messages.
    pub fn first(self) -> Option<Lang> {
        ALL_LANGS.iter().copied().find(|l| self.contains(*l))
    }
}

impl fmt::Display for LangSet {
    /// Human-readable summary, e.g. `C99 and later` or `C++ only`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == LangSet::ALL {
            return f.write_str("all languages");
        }
        if *self == LangSet::C {
            return f.write_str("C only");
        }
        if *self == LangSet::CPP {
            return f.write_str("C++ only");
        }
        let langs: Vec<String> = ALL_LANGS
            .iter()
            .filter(|l| self.contains(**l))
            .map(|l| l.to_string())
            .collect();
        if langs.is_empty() {
            return f.write_str("no language");
        }
        // Collapse "X and everything after it in a family" to "X and later".
        let c_part = self.intersect(LangSet::C);
        let cpp_part = self.intersect(LangSet::CPP);
        let mut parts = Vec::new();
        if !c_part.is_empty() {
            let first = c_part.first().unwrap();
            if c_part == LangSet::c_min(first) {
                parts.push(format!("{} and later", first));
            } else {
                parts.push(
                    ALL_LANGS
                        .iter()
                        .filter(|l| l.is_c() && c_part.contains(**l))
                        .map(|l| l.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
        }
        if !cpp_part.is_empty() {
            let first = cpp_part.first().unwrap();
            if cpp_part == LangSet::cpp_min(first) {
                parts.push(format!("{} and later", first));
            } else {
                parts.push(
                    ALL_LANGS
                        .iter()
                        .filter(|l| l.is_cpp() && cpp_part.contains(**l))
                        .map(|l| l.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
        }
        f.write_str(&parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_str() {
        assert_eq!("c99".parse::<Lang>().unwrap(), Lang::C99);
        assert_eq!("C++17".parse::<Lang>().unwrap(), Lang::Cpp17);
        assert_eq!("cpp11".parse::<Lang>().unwrap(), Lang::Cpp11);
        assert_eq!("knr".parse::<Lang>().unwrap(), Lang::Knr);
        assert!("c100".parse::<Lang>().is_err());
    }

    #[test]
    fn test_c_min() {
        let set = LangSet::c_min(Lang::C99);
        assert!(!set.contains(Lang::C89));
        assert!(set.contains(Lang::C99));
        assert!(set.contains(Lang::C23));
        assert!(!set.contains(Lang::Cpp11));
    }

    #[test]
    fn test_cpp_min() {
        let set = LangSet::cpp_min(Lang::Cpp11);
        assert!(!set.contains(Lang::Cpp03));
        assert!(set.contains(Lang::Cpp11));
        assert!(set.contains(Lang::Cpp26));
        assert!(!set.contains(Lang::C23));
    }

    #[test]
    fn test_c_cpp_min() {
        let set = LangSet::c_cpp_min(Lang::C11, Lang::Cpp11);
        assert!(set.contains(Lang::C11));
        assert!(set.contains(Lang::Cpp14));
        assert!(!set.contains(Lang::C99));
        assert!(!set.contains(Lang::Cpp98));
    }

    #[test]
    fn test_c_max() {
        let set = LangSet::c_max(Lang::C89);
        assert!(set.contains(Lang::Knr));
        assert!(set.contains(Lang::C89));
        assert!(!set.contains(Lang::C99));
    }

    #[test]
    fn test_families() {
        assert!(Lang::Cpp20.is_cpp());
        assert!(Lang::C17.is_c());
        assert!(!Lang::C17.is_cpp());
    }

    #[test]
    fn test_display_ranges() {
        assert_eq!(LangSet::c_min(Lang::C99).to_string(), "C99 and later");
        assert_eq!(LangSet::ALL.to_string(), "all languages");
        assert_eq!(LangSet::NONE.to_string(), "no language");
    }
}
