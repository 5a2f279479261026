//! Scoped names: ordered sequences of `(identifier, scope-kind)` pairs.
//!
//! `S::T::x` is three components; each carries a base-type bit saying what
//! kind of scope encloses it (`namespace`, `class`, `struct`, `union`,
//! `enum`, or the generic `scope` when the kind is not yet known). The
//! empty sequence means "no name".

use crate::types::{self, TB_ANY_CLASS, TB_CLASS, TB_ENUM, TB_NAMESPACE, TB_SCOPE, TB_STRUCT, TB_UNION};
use std::fmt;

/// One component of a scoped name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePart {
    pub name: String,
    /// Base-type bit identifying the kind of this scope level.
    pub kind: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopedName {
    parts: Vec<ScopePart>,
}

impl ScopedName {
    pub fn new() -> Self {
        ScopedName::default()
    }

    /// A one-component name of unknown scope kind.
    pub fn from_name(name: impl Into<String>) -> Self {
        let mut sn = ScopedName::new();
        sn.push(name, TB_SCOPE);
        sn
    }

    pub fn push(&mut self, name: impl Into<String>, kind: u64) {
        self.parts.push(ScopePart {
            name: name.into(),
            kind,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn parts(&self) -> &[ScopePart] {
        &self.parts
    }

    /// The innermost (last) component's identifier.
    pub fn local_name(&self) -> Option<&str> {
        self.parts.last().map(|p| p.name.as_str())
    }

    /// The scope prefix, i.e. everything but the last component.
    pub fn scope(&self) -> ScopedName {
        let mut sn = self.clone();
        sn.parts.pop();
        sn
    }

    /// Name of the innermost enclosing scope (second-to-last component).
    pub fn scope_name(&self) -> Option<&str> {
        if self.parts.len() < 2 {
            return None;
        }
        Some(self.parts[self.parts.len() - 2].name.as_str())
    }

    /// Sets the kind of the innermost enclosing scope.
    pub fn set_scope_kind(&mut self, kind: u64) {
        let n = self.parts.len();
        if n >= 2 {
            self.parts[n - 2].kind = kind;
        }
    }

    pub fn take(&mut self) -> ScopedName {
        std::mem::take(self)
    }

    /// Appends all of `other`'s components.
    pub fn append(&mut self, other: ScopedName) {
        self.parts.extend(other.parts);
    }

    /// Verifies the outer-to-inner ordering of scope kinds: a namespace may
    /// contain anything, a class-like scope may not contain a namespace,
    /// and an enum may contain nothing.
    pub fn check_order(&self) -> Result<(), String> {
        for pair in self.parts.windows(2) {
            let outer = pair[0].kind;
            let inner = pair[1].kind;
            let ok = match outer {
                _ if outer == TB_NAMESPACE || outer == TB_SCOPE => true,
                _ if outer & TB_ANY_CLASS & types::VALUE_MASK != 0 => inner != TB_NAMESPACE,
                _ if outer == TB_ENUM => false,
                _ => true,
            };
            if !ok {
                return Err(format!(
                    "\"{}\" may not contain \"{}\"",
                    kind_name(outer),
                    kind_name(inner)
                ));
            }
        }
        Ok(())
    }
}

/// English word for a scope-kind bit.
pub fn kind_name(kind: u64) -> &'static str {
    match kind {
        _ if kind == TB_NAMESPACE => "namespace",
        _ if kind == TB_CLASS => "class",
        _ if kind == TB_STRUCT => "struct",
        _ if kind == TB_UNION => "union",
        _ if kind == TB_ENUM => "enum",
        _ => "scope",
    }
}

impl fmt::Display for ScopedName {
    /// `::`-joined form, e.g. `S::T::x`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                f.write_str("::")?;
            }
            f.write_str(&part.name)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_means_no_name() {
        let sn = ScopedName::new();
        assert!(sn.is_empty());
        assert_eq!(sn.local_name(), None);
        assert_eq!(sn.to_string(), "");
    }

    #[test]
    fn test_display_scoped() {
        let mut sn = ScopedName::new();
        sn.push("S", TB_NAMESPACE);
        sn.push("T", TB_CLASS);
        sn.push("x", TB_SCOPE);
        assert_eq!(sn.to_string(), "S::T::x");
        assert_eq!(sn.local_name(), Some("x"));
        assert_eq!(sn.scope_name(), Some("T"));
    }

    #[test]
    fn test_order_namespace_contains_class() {
        let mut sn = ScopedName::new();
        sn.push("N", TB_NAMESPACE);
        sn.push("C", TB_CLASS);
        assert!(sn.check_order().is_ok());
    }

    #[test]
    fn test_order_class_may_not_contain_namespace() {
        let mut sn = ScopedName::new();
        sn.push("C", TB_CLASS);
        sn.push("N", TB_NAMESPACE);
        assert!(sn.check_order().is_err());
    }

    #[test]
    fn test_order_enum_contains_nothing() {
        let mut sn = ScopedName::new();
        sn.push("E", TB_ENUM);
        sn.push("x", TB_SCOPE);
        assert!(sn.check_order().is_err());
    }
}
