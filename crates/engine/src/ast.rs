//! The declaration AST: an arena of tagged nodes.
//!
//! One [`Arena`] exists per parsed statement and owns every node created
//! while parsing it. Nodes address each other by [`AstId`] index: children
//! are owning edges, `parent` is a non-owning back-link, so the whole
//! structure is a tree with upward pointers and is reclaimed in bulk when
//! the arena is dropped. Saved typedefs are deep-copied out of the arena
//! into their own long-lived arenas before teardown.
//!
//! Every node records the lexical parenthesization depth at which it was
//! created; the composition algorithms in `compose` compare depths to
//! decide precedence (`int *a[5]` versus `int (*a)[5]`).

use crate::diag::Loc;
use crate::oper::OpId;
use crate::sname::ScopedName;
use crate::types::TypeBits;
use std::fmt;

/// Index of a node within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstId(u32);

impl AstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for AstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Array size discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    /// `[]`
    Unspecified,
    /// `[*]`, C99 variable-length array in a prototype.
    Variable,
    /// `[static N]`, C99: at least N elements.
    NonEmpty(u64),
    /// `[N]`
    Explicit(u64),
}

/// `alignas` specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    /// `alignas(N)`
    Bytes(u64),
    /// `alignas(type)`; the type lives in the same arena.
    Type(AstId),
}

/// Member/non-member disposition of an overloaded operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberKind {
    #[default]
    Unspecified,
    Member,
    NonMember,
}

/// The tagged variant part of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Pointer {
        to: AstId,
    },
    Reference {
        to: AstId,
    },
    RvalueReference {
        to: AstId,
    },
    PointerToMember {
        to: AstId,
        class_sname: ScopedName,
    },
    Array {
        of: AstId,
        size: ArraySize,
    },
    Function {
        ret: AstId,
        params: Vec<AstId>,
    },
    AppleBlock {
        ret: AstId,
        params: Vec<AstId>,
    },
    Operator {
        ret: AstId,
        params: Vec<AstId>,
        op: OpId,
        member: MemberKind,
    },
    Constructor {
        params: Vec<AstId>,
    },
    Destructor,
    /// Built-in type; the payload is the `_BitInt` width when nonzero.
    Builtin {
        bit_width: u32,
    },
    /// enum, class, struct, or union; which one is in the node's base bits.
    /// `of` is the C++11 enum base type.
    Ecsu {
        tag: ScopedName,
        of: Option<AstId>,
    },
    /// A reference to a typedef'd name; `for_id` is the underlying type.
    Typedef {
        for_id: AstId,
        tname: ScopedName,
    },
    /// Bare identifier: K&R parameter or name-only scaffolding.
    Name,
    /// Sentinel left by the declarator grammar for the type specifier to
    /// splice into; never survives into a checked AST.
    Placeholder,
    /// `...`
    Variadic,
    UserDefConversion {
        to: AstId,
    },
    UserDefLiteral {
        ret: AstId,
        params: Vec<AstId>,
    },
}

impl Kind {
    /// Short noun used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Pointer { .. } => "pointer",
            Kind::Reference { .. } => "reference",
            Kind::RvalueReference { .. } => "rvalue reference",
            Kind::PointerToMember { .. } => "pointer to member",
            Kind::Array { .. } => "array",
            Kind::Function { .. } => "function",
            Kind::AppleBlock { .. } => "block",
            Kind::Operator { .. } => "operator",
            Kind::Constructor { .. } => "constructor",
            Kind::Destructor => "destructor",
            Kind::Builtin { .. } => "built-in type",
            Kind::Ecsu { .. } => "enum, class, struct, or union",
            Kind::Typedef { .. } => "typedef",
            Kind::Name => "name",
            Kind::Placeholder => "placeholder",
            Kind::Variadic => "variadic",
            Kind::UserDefConversion { .. } => "user-defined conversion",
            Kind::UserDefLiteral { .. } => "user-defined literal",
        }
    }

    pub fn is_pointer_like(&self) -> bool {
        matches!(
            self,
            Kind::Pointer { .. } | Kind::PointerToMember { .. }
        )
    }

    pub fn is_reference_like(&self) -> bool {
        matches!(self, Kind::Reference { .. } | Kind::RvalueReference { .. })
    }

    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            Kind::Function { .. }
                | Kind::AppleBlock { .. }
                | Kind::Operator { .. }
                | Kind::Constructor { .. }
                | Kind::Destructor
                | Kind::UserDefConversion { .. }
                | Kind::UserDefLiteral { .. }
        )
    }

    /// Parameter list, if this kind has one.
    pub fn params(&self) -> Option<&[AstId]> {
        match self {
            Kind::Function { params, .. }
            | Kind::AppleBlock { params, .. }
            | Kind::Operator { params, .. }
            | Kind::Constructor { params }
            | Kind::UserDefLiteral { params, .. } => Some(params),
            _ => None,
        }
    }
}

/// A single AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: Kind,
    pub parent: Option<AstId>,
    pub bits: TypeBits,
    pub sname: ScopedName,
    pub loc: Loc,
    pub align: Alignment,
    /// Count of `(` open when the node was created; never mutated after.
    pub depth: u32,
}

impl Node {
    pub fn new(kind: Kind, loc: Loc, depth: u32) -> Self {
        Node {
            kind,
            parent: None,
            bits: TypeBits::NONE,
            sname: ScopedName::new(),
            loc,
            align: Alignment::None,
            depth,
        }
    }
}

/// Direction for [`Arena::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitDir {
    /// Root toward leaves via the primary child.
    Down,
    /// Leaf toward root via `parent`.
    Up,
}

/// Owns every node of one parse.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Arena::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, node: Node) -> AstId {
        let id = AstId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: AstId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: AstId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: AstId) -> &Kind {
        &self.node(id).kind
    }

    pub fn ids(&self) -> impl Iterator<Item = AstId> + '_ {
        (0..self.nodes.len() as u32).map(AstId)
    }

    /// The primary child: the pointee, element, underlying, or return type.
    pub fn primary_child(&self, id: AstId) -> Option<AstId> {
        match &self.node(id).kind {
            Kind::Pointer { to }
            | Kind::Reference { to }
            | Kind::RvalueReference { to }
            | Kind::PointerToMember { to, .. }
            | Kind::UserDefConversion { to } => Some(*to),
            Kind::Array { of, .. } => Some(*of),
            Kind::Function { ret, .. }
            | Kind::AppleBlock { ret, .. }
            | Kind::Operator { ret, .. }
            | Kind::UserDefLiteral { ret, .. } => Some(*ret),
            Kind::Typedef { for_id, .. } => Some(*for_id),
            _ => None,
        }
    }

    /// Replaces the primary child of `parent` with `child` and links
    /// `child.parent` back. Panics if `parent`'s kind has no child slot.
    pub fn set_child(&mut self, parent: AstId, child: AstId) {
        match &mut self.node_mut(parent).kind {
            Kind::Pointer { to }
            | Kind::Reference { to }
            | Kind::RvalueReference { to }
            | Kind::PointerToMember { to, .. }
            | Kind::UserDefConversion { to } => *to = child,
            Kind::Array { of, .. } => *of = child,
            Kind::Function { ret, .. }
            | Kind::AppleBlock { ret, .. }
            | Kind::Operator { ret, .. }
            | Kind::UserDefLiteral { ret, .. } => *ret = child,
            Kind::Typedef { for_id, .. } => *for_id = child,
            other => panic!("set_child on kind without a child slot: {}", other.name()),
        }
        self.node_mut(child).parent = Some(parent);
    }

    /// Walks from `start` in the given direction, returning the first node
    /// for which `pred` returns true. The start node itself is tested.
    pub fn visit(
        &self,
        start: AstId,
        dir: VisitDir,
        mut pred: impl FnMut(&Arena, AstId) -> bool,
    ) -> Option<AstId> {
        let mut cur = Some(start);
        while let Some(id) = cur {
            if pred(self, id) {
                return Some(id);
            }
            cur = match dir {
                VisitDir::Down => self.primary_child(id),
                VisitDir::Up => self.node(id).parent,
            };
        }
        None
    }

    /// First placeholder reachable along the primary-child chain.
    pub fn find_placeholder(&self, start: AstId) -> Option<AstId> {
        self.visit(start, VisitDir::Down, |a, id| {
            matches!(a.kind(id), Kind::Placeholder)
        })
    }

    /// The root of the tree containing `id`.
    pub fn root(&self, id: AstId) -> AstId {
        let mut cur = id;
        while let Some(p) = self.node(cur).parent {
            cur = p;
        }
        cur
    }

    /// The leaf of the primary-child chain from `id`.
    pub fn innermost(&self, id: AstId) -> AstId {
        let mut cur = id;
        while let Some(c) = self.primary_child(cur) {
            cur = c;
        }
        cur
    }

    /// Strips references and typedef layers to reach the referred-to type.
    /// Typedefs naming references are unwrapped layer by layer, so a
    /// typedef for `int&` unreferences to `int`.
    pub fn unreference(&self, id: AstId) -> AstId {
        let mut cur = id;
        loop {
            match self.kind(cur) {
                Kind::Reference { to } | Kind::RvalueReference { to } => cur = *to,
                Kind::Typedef { for_id, .. } => {
                    let under = *for_id;
                    if matches!(
                        self.kind(under),
                        Kind::Reference { .. } | Kind::RvalueReference { .. } | Kind::Typedef { .. }
                    ) {
                        cur = under;
                    } else {
                        return cur;
                    }
                }
                _ => return cur,
            }
        }
    }

    /// Strips typedef layers only.
    pub fn untypedef(&self, id: AstId) -> AstId {
        let mut cur = id;
        while let Kind::Typedef { for_id, .. } = self.kind(cur) {
            cur = *for_id;
        }
        cur
    }

    /// Moves the name from `from` to `to` if `to` has none.
    pub fn take_name(&mut self, to: AstId, from: AstId) {
        if self.node(to).sname.is_empty() && !self.node(from).sname.is_empty() {
            let sname = self.node_mut(from).sname.take();
            self.node_mut(to).sname = sname;
        }
    }

    /// Recursively copies the subtree rooted at `id` into `dst`, returning
    /// the new root. Parent links inside the copy are rebuilt; the new
    /// root's parent is `None`.
    pub fn deep_copy_into(&self, id: AstId, dst: &mut Arena) -> AstId {
        let src = self.node(id);
        let mut copy = Node {
            kind: Kind::Placeholder, // patched below
            parent: None,
            bits: src.bits,
            sname: src.sname.clone(),
            loc: src.loc,
            align: Alignment::None,
            depth: src.depth,
        };
        let new_id_slot = dst.alloc(copy.clone());

        let copy_child = |arena: &Arena, dst: &mut Arena, c: AstId| arena.deep_copy_into(c, dst);
        let new_kind = match &src.kind {
            Kind::Pointer { to } => Kind::Pointer {
                to: copy_child(self, dst, *to),
            },
            Kind::Reference { to } => Kind::Reference {
                to: copy_child(self, dst, *to),
            },
            Kind::RvalueReference { to } => Kind::RvalueReference {
                to: copy_child(self, dst, *to),
            },
            Kind::PointerToMember { to, class_sname } => Kind::PointerToMember {
                to: copy_child(self, dst, *to),
                class_sname: class_sname.clone(),
            },
            Kind::UserDefConversion { to } => Kind::UserDefConversion {
                to: copy_child(self, dst, *to),
            },
            Kind::Array { of, size } => Kind::Array {
                of: copy_child(self, dst, *of),
                size: *size,
            },
            Kind::Function { ret, params } => Kind::Function {
                ret: copy_child(self, dst, *ret),
                params: params
                    .iter()
                    .map(|p| copy_child(self, dst, *p))
                    .collect(),
            },
            Kind::AppleBlock { ret, params } => Kind::AppleBlock {
                ret: copy_child(self, dst, *ret),
                params: params
                    .iter()
                    .map(|p| copy_child(self, dst, *p))
                    .collect(),
            },
            Kind::Operator {
                ret,
                params,
                op,
                member,
            } => Kind::Operator {
                ret: copy_child(self, dst, *ret),
                params: params
                    .iter()
                    .map(|p| copy_child(self, dst, *p))
                    .collect(),
                op: *op,
                member: *member,
            },
            Kind::UserDefLiteral { ret, params } => Kind::UserDefLiteral {
                ret: copy_child(self, dst, *ret),
                params: params
                    .iter()
                    .map(|p| copy_child(self, dst, *p))
                    .collect(),
            },
            Kind::Constructor { params } => Kind::Constructor {
                params: params
                    .iter()
                    .map(|p| copy_child(self, dst, *p))
                    .collect(),
            },
            Kind::Ecsu { tag, of } => Kind::Ecsu {
                tag: tag.clone(),
                of: of.map(|o| copy_child(self, dst, o)),
            },
            Kind::Typedef { for_id, tname } => Kind::Typedef {
                for_id: copy_child(self, dst, *for_id),
                tname: tname.clone(),
            },
            Kind::Destructor => Kind::Destructor,
            Kind::Builtin { bit_width } => Kind::Builtin {
                bit_width: *bit_width,
            },
            Kind::Name => Kind::Name,
            Kind::Placeholder => Kind::Placeholder,
            Kind::Variadic => Kind::Variadic,
        };
        copy.kind = new_kind;
        copy.align = match src.align {
            Alignment::Type(t) => Alignment::Type(self.deep_copy_into(t, dst)),
            other => other,
        };
        *dst.node_mut(new_id_slot) = copy;

        // Re-link children to the new parent.
        let child_ids: Vec<AstId> = {
            let node = dst.node(new_id_slot);
            let mut ids = Vec::new();
            if let Some(c) = dst.primary_child(new_id_slot) {
                ids.push(c);
            }
            if let Some(ps) = node.kind.params() {
                ids.extend(ps.iter().copied());
            }
            ids
        };
        for c in child_ids {
            dst.node_mut(c).parent = Some(new_id_slot);
        }
        new_id_slot
    }

    /// Copies the subtree rooted at `id` within this arena, returning the
    /// new root. Used by comma declarations, where each declarator gets its
    /// own copy of the specifier type.
    pub fn clone_subtree(&mut self, id: AstId) -> AstId {
        let mut tmp = Arena::new();
        let mid = self.deep_copy_into(id, &mut tmp);
        tmp.deep_copy_into(mid, self)
    }

    /// Structural equivalence modulo source locations and names: same
    /// kinds, bits, sizes, and children.
    pub fn equiv(&self, a: AstId, other: &Arena, b: AstId) -> bool {
        let na = self.node(a);
        let nb = other.node(b);
        if na.bits != nb.bits {
            return false;
        }
        match (&na.kind, &nb.kind) {
            (Kind::Pointer { to: ta }, Kind::Pointer { to: tb })
            | (Kind::Reference { to: ta }, Kind::Reference { to: tb })
            | (Kind::RvalueReference { to: ta }, Kind::RvalueReference { to: tb })
            | (Kind::UserDefConversion { to: ta }, Kind::UserDefConversion { to: tb }) => {
                self.equiv(*ta, other, *tb)
            }
            (
                Kind::PointerToMember {
                    to: ta,
                    class_sname: ca,
                },
                Kind::PointerToMember {
                    to: tb,
                    class_sname: cb,
                },
            ) => ca == cb && self.equiv(*ta, other, *tb),
            (Kind::Array { of: oa, size: sa }, Kind::Array { of: ob, size: sb }) => {
                sa == sb && self.equiv(*oa, other, *ob)
            }
            (
                Kind::Function {
                    ret: ra,
                    params: pa,
                },
                Kind::Function {
                    ret: rb,
                    params: pb,
                },
            )
            | (
                Kind::AppleBlock {
                    ret: ra,
                    params: pa,
                },
                Kind::AppleBlock {
                    ret: rb,
                    params: pb,
                },
            )
            | (
                Kind::UserDefLiteral {
                    ret: ra,
                    params: pa,
                },
                Kind::UserDefLiteral {
                    ret: rb,
                    params: pb,
                },
            ) => {
                self.equiv(*ra, other, *rb)
                    && pa.len() == pb.len()
                    && pa
                        .iter()
                        .zip(pb)
                        .all(|(x, y)| self.equiv(*x, other, *y))
            }
            (Kind::Builtin { bit_width: wa }, Kind::Builtin { bit_width: wb }) => wa == wb,
            (Kind::Ecsu { tag: ta, .. }, Kind::Ecsu { tag: tb, .. }) => ta == tb,
            (Kind::Typedef { tname: ta, .. }, Kind::Typedef { tname: tb, .. }) => ta == tb,
            (Kind::Name, Kind::Name)
            | (Kind::Placeholder, Kind::Placeholder)
            | (Kind::Variadic, Kind::Variadic)
            | (Kind::Destructor, Kind::Destructor) => true,
            _ => false,
        }
    }

    /// Debug dump of the subtree, one node per line.
    pub fn dump(&self, id: AstId, out: &mut String, indent: usize) {
        let node = self.node(id);
        out.push_str(&"  ".repeat(indent));
        out.push_str(&format!(
            "{} kind={} depth={}",
            id,
            node.kind.name(),
            node.depth
        ));
        if !node.sname.is_empty() {
            out.push_str(&format!(" name={}", node.sname));
        }
        let base = node.bits.base_c_string();
        if !base.is_empty() {
            out.push_str(&format!(" base=\"{}\"", base));
        }
        out.push('\n');
        if let Some(c) = self.primary_child(id) {
            self.dump(c, out, indent + 1);
        }
        if let Some(params) = self.node(id).kind.params() {
            for p in params.to_vec() {
                self.dump(p, out, indent + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TB_INT, TypeBits};

    fn loc() -> Loc {
        Loc::col(0, 0)
    }

    fn int_node(arena: &mut Arena) -> AstId {
        let mut n = Node::new(Kind::Builtin { bit_width: 0 }, loc(), 0);
        n.bits = {
            let mut t = TypeBits::NONE;
            t.add_bit(TB_INT, loc(), false).unwrap();
            t
        };
        arena.alloc(n)
    }

    #[test]
    fn test_single_root() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let ptr = a.alloc(Node::new(Kind::Pointer { to: int_id }, loc(), 0));
        a.node_mut(int_id).parent = Some(ptr);
        let roots: Vec<AstId> = a.ids().filter(|i| a.node(*i).parent.is_none()).collect();
        assert_eq!(roots, vec![ptr]);
        assert_eq!(a.root(int_id), ptr);
    }

    #[test]
    fn test_visit_down_finds_placeholder() {
        let mut a = Arena::new();
        let ph = a.alloc(Node::new(Kind::Placeholder, loc(), 0));
        let arr = a.alloc(Node::new(
            Kind::Array {
                of: ph,
                size: ArraySize::Explicit(5),
            },
            loc(),
            0,
        ));
        a.node_mut(ph).parent = Some(arr);
        assert_eq!(a.find_placeholder(arr), Some(ph));
    }

    #[test]
    fn test_visit_up() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let ptr = a.alloc(Node::new(Kind::Pointer { to: int_id }, loc(), 0));
        a.node_mut(int_id).parent = Some(ptr);
        let found = a.visit(int_id, VisitDir::Up, |ar, id| {
            matches!(ar.kind(id), Kind::Pointer { .. })
        });
        assert_eq!(found, Some(ptr));
    }

    #[test]
    fn test_set_child_relinks() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let ph = a.alloc(Node::new(Kind::Placeholder, loc(), 0));
        let ptr = a.alloc(Node::new(Kind::Pointer { to: ph }, loc(), 0));
        a.node_mut(ph).parent = Some(ptr);
        a.set_child(ptr, int_id);
        assert_eq!(a.primary_child(ptr), Some(int_id));
        assert_eq!(a.node(int_id).parent, Some(ptr));
    }

    #[test]
    fn test_deep_copy() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let ptr = a.alloc(Node::new(Kind::Pointer { to: int_id }, loc(), 0));
        a.node_mut(int_id).parent = Some(ptr);

        let mut b = Arena::new();
        let copied = a.deep_copy_into(ptr, &mut b);
        assert!(a.equiv(ptr, &b, copied));
        assert!(b.node(copied).parent.is_none());
        let child = b.primary_child(copied).unwrap();
        assert_eq!(b.node(child).parent, Some(copied));
    }

    #[test]
    fn test_unreference_through_typedef() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let r = a.alloc(Node::new(Kind::Reference { to: int_id }, loc(), 0));
        a.node_mut(int_id).parent = Some(r);
        let td = a.alloc(Node::new(
            Kind::Typedef {
                for_id: r,
                tname: ScopedName::from_name("int_ref"),
            },
            loc(),
            0,
        ));
        a.node_mut(r).parent = Some(td);
        assert_eq!(a.unreference(td), int_id);
    }

    #[test]
    fn test_untypedef_stops_at_reference() {
        let mut a = Arena::new();
        let int_id = int_node(&mut a);
        let td = a.alloc(Node::new(
            Kind::Typedef {
                for_id: int_id,
                tname: ScopedName::from_name("myint"),
            },
            loc(),
            0,
        ));
        a.node_mut(int_id).parent = Some(td);
        assert_eq!(a.untypedef(td), int_id);
    }

    #[test]
    fn test_take_name() {
        let mut a = Arena::new();
        let mut named = Node::new(Kind::Placeholder, loc(), 0);
        named.sname = ScopedName::from_name("x");
        let from = a.alloc(named);
        let to = a.alloc(Node::new(Kind::Pointer { to: from }, loc(), 0));
        a.take_name(to, from);
        assert_eq!(a.node(to).sname.to_string(), "x");
        assert!(a.node(from).sname.is_empty());
    }
}
