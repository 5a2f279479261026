//! The typedef table.
//!
//! Typedefs live beyond the statement that declared them, so each entry
//! owns a private arena holding a deep copy of the defined type. A set of
//! standard-header names (`size_t`, the `<stdint.h>` family) is predefined
//! at session creation; `size_t` is represented as `unsigned long` at the
//! bit level and compares equal to it.

use crate::ast::{Arena, AstId, Kind, Node};
use crate::diag::{Diagnostic, Loc};
use crate::sname::ScopedName;
use crate::types::{TB_CHAR, TB_INT, TB_LONG, TB_SHORT, TB_SIGNED, TB_UNSIGNED, TS_TYPEDEF, TypeBits};
use std::collections::BTreeMap;

/// One saved typedef.
#[derive(Debug)]
pub struct Typedef {
    pub name: String,
    pub arena: Arena,
    pub root: AstId,
    pub user_defined: bool,
}

/// Insert/replace + lookup table, iterable in name order for `show`.
#[derive(Debug, Default)]
pub struct TypedefTable {
    map: BTreeMap<String, Typedef>,
}

impl TypedefTable {
    pub fn new() -> Self {
        TypedefTable::default()
    }

    /// A table preloaded with the standard-header names.
    pub fn with_predefined() -> Self {
        let mut table = TypedefTable::new();
        for (name, bits) in predefined_builtins() {
            let mut arena = Arena::new();
            let mut node = Node::new(Kind::Builtin { bit_width: 0 }, Loc::col(0, 0), 0);
            node.bits = bits;
            let root = arena.alloc(node);
            table.map.insert(
                name.to_string(),
                Typedef {
                    name: name.to_string(),
                    arena,
                    root,
                    user_defined: false,
                },
            );
        }
        table
    }

    pub fn lookup(&self, name: &str) -> Option<&Typedef> {
        self.map.get(name)
    }

    pub fn is_typedef(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Defines `name` as the type rooted at `root` in `src`, deep-copying
    /// it out of the statement arena. Redefinition to an equivalent type is
    /// accepted silently; to a different type it is an error.
    pub fn define(
        &mut self,
        name: &str,
        src: &Arena,
        root: AstId,
        loc: Loc,
    ) -> Result<(), Diagnostic> {
        if let Some(existing) = self.map.get(name) {
            if existing.arena.equiv(existing.root, src, root) {
                return Ok(());
            }
            return Err(Diagnostic::error(
                loc,
                format!("\"{}\": type redefinition with different type", name),
            ));
        }
        let mut arena = Arena::new();
        let new_root = src.deep_copy_into(root, &mut arena);
        // Neither the typedef'd name nor the `typedef` storage class is
        // part of the defined type.
        arena.node_mut(new_root).sname = ScopedName::new();
        arena.node_mut(new_root).bits.take(TS_TYPEDEF);
        self.map.insert(
            name.to_string(),
            Typedef {
                name: name.to_string(),
                arena,
                root: new_root,
                user_defined: true,
            },
        );
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Typedef> {
        self.map.values()
    }
}

fn bits_of(parts: &[u64]) -> TypeBits {
    let mut t = TypeBits::NONE;
    for p in parts {
        t.add_bit(*p, Loc::col(0, 0), false)
            .expect("predefined bits never conflict");
    }
    t.normalize()
}

/// `<stddef.h>` / `<stdint.h>` names and their bit-level representations.
fn predefined_builtins() -> Vec<(&'static str, TypeBits)> {
    vec![
        ("size_t", bits_of(&[TB_UNSIGNED, TB_LONG])),
        ("ssize_t", bits_of(&[TB_LONG])),
        ("ptrdiff_t", bits_of(&[TB_LONG])),
        ("intmax_t", bits_of(&[TB_LONG, TB_LONG])),
        ("uintmax_t", bits_of(&[TB_UNSIGNED, TB_LONG, TB_LONG])),
        ("intptr_t", bits_of(&[TB_LONG])),
        ("uintptr_t", bits_of(&[TB_UNSIGNED, TB_LONG])),
        ("int8_t", bits_of(&[TB_SIGNED, TB_CHAR])),
        ("int16_t", bits_of(&[TB_SHORT])),
        ("int32_t", bits_of(&[TB_INT])),
        ("int64_t", bits_of(&[TB_LONG, TB_LONG])),
        ("uint8_t", bits_of(&[TB_UNSIGNED, TB_CHAR])),
        ("uint16_t", bits_of(&[TB_UNSIGNED, TB_SHORT])),
        ("uint32_t", bits_of(&[TB_UNSIGNED, TB_INT])),
        ("uint64_t", bits_of(&[TB_UNSIGNED, TB_LONG, TB_LONG])),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_size_t() {
        let table = TypedefTable::with_predefined();
        let td = table.lookup("size_t").unwrap();
        assert!(!td.user_defined);
        let bits = td.arena.node(td.root).bits;
        assert!(bits.has(TB_UNSIGNED));
        assert!(bits.has(TB_LONG));
        assert!(bits.has(TB_INT)); // normalized: implicit int made explicit
    }

    #[test]
    fn test_define_and_lookup() {
        let mut table = TypedefTable::new();
        let mut arena = Arena::new();
        let mut node = Node::new(Kind::Builtin { bit_width: 0 }, Loc::col(0, 0), 0);
        node.bits = bits_of(&[TB_INT]);
        let root = arena.alloc(node);
        table.define("myint", &arena, root, Loc::col(0, 0)).unwrap();
        assert!(table.is_typedef("myint"));
        assert!(table.lookup("myint").unwrap().user_defined);
    }

    #[test]
    fn test_redefine_same_ok_different_err() {
        let mut table = TypedefTable::new();
        let mut arena = Arena::new();
        let mut node = Node::new(Kind::Builtin { bit_width: 0 }, Loc::col(0, 0), 0);
        node.bits = bits_of(&[TB_INT]);
        let int_root = arena.alloc(node);
        let mut other = Node::new(Kind::Builtin { bit_width: 0 }, Loc::col(0, 0), 0);
        other.bits = bits_of(&[TB_CHAR]);
        let char_root = arena.alloc(other);

        table.define("t", &arena, int_root, Loc::col(0, 0)).unwrap();
        assert!(table.define("t", &arena, int_root, Loc::col(0, 0)).is_ok());
        let err = table
            .define("t", &arena, char_root, Loc::col(0, 0))
            .unwrap_err();
        assert!(err.message.contains("redefinition"));
    }

    #[test]
    fn test_int64_equals_long_long() {
        let table = TypedefTable::with_predefined();
        let a = table.lookup("int64_t").unwrap();
        let b = table.lookup("intmax_t").unwrap();
        assert!(a.arena.equiv(a.root, &b.arena, b.root));
    }
}
