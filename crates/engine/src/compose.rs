//! AST composition: attaching array and function suffixes to a declarator
//! under construction, and splicing a type specifier into the placeholder
//! the declarator grammar leaves behind.
//!
//! Precedence is decided by comparing node depths (the parenthesization
//! depth at creation). This is what distinguishes `int *a[5]` (array of
//! pointer) from `int (*a)[5]` (pointer to array): the pointer created
//! inside `(...)` is deeper than the `[5]` suffix outside, so the array is
//! spliced below it rather than above.

use crate::ast::{Arena, AstId, Kind};
use crate::types::TS_ANY_STORAGE;
use tracing::trace;

/// Attaches an array suffix to `ast`. `array` must be an array node whose
/// element child is a placeholder. Returns the node that now stands where
/// `ast` stood.
pub fn add_array(arena: &mut Arena, ast: Option<AstId>, array: AstId) -> AstId {
    debug_assert!(matches!(arena.kind(array), Kind::Array { .. }));
    let result = match ast {
        None => array,
        Some(a) => add_array_impl(arena, a, array),
    };
    take_storage_to(arena, result);
    result
}

fn add_array_impl(arena: &mut Arena, ast: AstId, array: AstId) -> AstId {
    trace!(ast = %ast, array = %array, "add_array");
    match arena.kind(ast) {
        // Consecutive arrays append: `a[2][3]` is array 2 of array 3.
        Kind::Array { .. } => append_array(arena, ast, array),
        // The array absorbs a bare name: the declarator was just `x`.
        Kind::Placeholder => {
            arena.take_name(array, ast);
            arena.set_child(array, ast);
            array
        }
        Kind::Pointer { to }
        | Kind::Reference { to }
        | Kind::RvalueReference { to }
        | Kind::PointerToMember { to, .. }
            if arena.node(ast).depth > arena.node(array).depth =>
        {
            // `(*x)[5]`: the pointer is inside parens, so the suffix binds
            // to the pointee.
            let to = *to;
            let new_child = add_array_impl(arena, to, array);
            arena.set_child(ast, new_child);
            ast
        }
        _ => {
            if arena.node(ast).depth > arena.node(array).depth
                && let Some(child) = arena.primary_child(ast)
            {
                // `(*x(int))[3]`: the node is inside parentheses, so the
                // suffix belongs below it; descend toward the placeholder.
                let new_child = add_array_impl(arena, child, array);
                arena.set_child(ast, new_child);
                ast
            } else {
                // Insert the array between `ast` and its parent: the array
                // becomes the outer type.
                let parent = arena.node(ast).parent;
                arena.take_name(array, ast);
                arena.set_child(array, ast);
                if let Some(p) = parent {
                    arena.set_child(p, array);
                } else {
                    arena.node_mut(array).parent = None;
                }
                array
            }
        }
    }
}

/// Appends `array` at the end of the chain of consecutive arrays starting
/// at `ast`, recursing through inner pointers shallower than the new array.
fn append_array(arena: &mut Arena, ast: AstId, array: AstId) -> AstId {
    let child = arena
        .primary_child(ast)
        .expect("array nodes always have an element child");
    match arena.kind(child) {
        Kind::Array { .. } => {
            append_array(arena, child, array);
        }
        Kind::Pointer { .. }
        | Kind::Reference { .. }
        | Kind::RvalueReference { .. }
        | Kind::PointerToMember { .. }
            if arena.node(child).depth < arena.node(array).depth =>
        {
            append_array(arena, child, array);
        }
        _ => {
            arena.set_child(array, child);
            arena.set_child(ast, array);
        }
    }
    ast
}

/// Attaches a function-like suffix. `ret` is the type currently pending on
/// the inherited-attribute stack (the specifier, or a prefix pointer not
/// yet consumed); `func` is the new function-like node with its parameters
/// already attached. Returns the node that now stands where `ast` stood.
pub fn add_function(arena: &mut Arena, ast: AstId, ret: AstId, func: AstId) -> AstId {
    debug_assert!(arena.kind(func).is_function_like());
    trace!(ast = %ast, ret = %ret, func = %func, "add_function");
    let result = add_function_impl(arena, ast, ret, func);
    take_storage_to(arena, result);
    result
}

fn add_function_impl(arena: &mut Arena, ast: AstId, ret: AstId, func: AstId) -> AstId {
    match arena.kind(ast) {
        Kind::Array { .. }
        | Kind::Pointer { .. }
        | Kind::Reference { .. }
        | Kind::RvalueReference { .. }
        | Kind::PointerToMember { .. } => {
            let child = arena
                .primary_child(ast)
                .expect("parent kinds always have a child");
            match arena.kind(child) {
                Kind::Array { .. }
                | Kind::Pointer { .. }
                | Kind::Reference { .. }
                | Kind::RvalueReference { .. }
                | Kind::PointerToMember { .. }
                    if arena.node(ast).depth > arena.node(func).depth =>
                {
                    add_function_impl(arena, child, ret, func);
                    ast
                }
                Kind::Placeholder if child != ret => {
                    // `int (*f)(char)`: the function replaces the
                    // placeholder under the pointer and adopts the pending
                    // type as its return.
                    arena.set_child(ast, func);
                    set_return(arena, func, ret);
                    ast
                }
                _ => {
                    set_return(arena, func, ret);
                    ast
                }
            }
        }
        _ => {
            // A bare name or specifier: the function is the declarator.
            arena.take_name(func, ast);
            set_return(arena, func, ret);
            func
        }
    }
}

fn set_return(arena: &mut Arena, func: AstId, ret: AstId) {
    // Constructors and destructors have no return slot.
    if arena.primary_child(func).is_some() {
        arena.set_child(func, ret);
    }
}

/// Splices the type-specifier AST into the placeholder left by the
/// declarator grammar. Returns the root of the finished AST.
pub fn patch_placeholder(arena: &mut Arena, type_id: AstId, decl: Option<AstId>) -> AstId {
    let Some(decl) = decl else {
        return type_id;
    };
    trace!(type_id = %type_id, decl = %decl, "patch_placeholder");
    if arena.node(type_id).parent.is_none() {
        if let Some(ph) = arena.find_placeholder(decl) {
            if ph == decl {
                // The declarator is just a name: the type is the whole AST.
                arena.take_name(type_id, decl);
                let bits = arena.node(decl).bits;
                arena.node_mut(type_id).bits.union_with(bits);
                return type_id;
            }
            // Replace the placeholder with the type's root.
            let type_root = arena.root(type_id);
            let ph_parent = arena
                .node(ph)
                .parent
                .expect("a non-root placeholder has a parent");
            arena.take_name(type_root, ph);
            arena.set_child(ph_parent, type_root);
            let root = arena.root(decl);
            take_storage_to(arena, root);
            return root;
        }
    }
    // The type was already consumed (as a function return, say): just
    // migrate any leftover storage bits and the name.
    let storage = arena.node_mut(type_id).bits.take(TS_ANY_STORAGE);
    let root = arena.root(decl);
    arena.node_mut(root).bits.store |= storage;
    arena.take_name(root, type_id);
    take_storage_to(arena, root);
    root
}

/// Moves storage-class and attribute bits from the innermost node of the
/// primary-child chain up to `to`, so `static int x[4]` ends up "static
/// array 4 of int" rather than "array 4 of static int".
pub fn take_storage_to(arena: &mut Arena, to: AstId) {
    let innermost = arena.innermost(to);
    if innermost == to {
        return;
    }
    let inner = arena.node_mut(innermost);
    let storage = inner.bits.take(TS_ANY_STORAGE);
    let attrs = inner.bits.attr;
    inner.bits.attr = 0;
    if storage != 0 {
        arena.node_mut(to).bits.store |= storage;
    }
    if attrs != 0 {
        arena.node_mut(to).bits.attr |= attrs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArraySize, Node};
    use crate::diag::Loc;
    use crate::types::{TB_INT, TS_STATIC, TypeBits};

    fn loc() -> Loc {
        Loc::col(0, 0)
    }

    fn arena_with_int(bits_extra: u64) -> (Arena, AstId) {
        let mut a = Arena::new();
        let mut n = Node::new(Kind::Builtin { bit_width: 0 }, loc(), 0);
        let mut t = TypeBits::NONE;
        t.add_bit(TB_INT, loc(), false).unwrap();
        if bits_extra != 0 {
            t.add_bit(bits_extra, loc(), false).unwrap();
        }
        n.bits = t;
        let id = a.alloc(n);
        (a, id)
    }

    fn placeholder(a: &mut Arena, name: Option<&str>, depth: u32) -> AstId {
        let mut n = Node::new(Kind::Placeholder, loc(), depth);
        if let Some(name) = name {
            n.sname = crate::sname::ScopedName::from_name(name);
        }
        a.alloc(n)
    }

    fn array(a: &mut Arena, size: u64, depth: u32) -> AstId {
        let ph = placeholder(a, None, depth);
        let arr = a.alloc(Node::new(
            Kind::Array {
                of: ph,
                size: ArraySize::Explicit(size),
            },
            loc(),
            depth,
        ));
        a.node_mut(ph).parent = Some(arr);
        arr
    }

    fn pointer(a: &mut Arena, depth: u32) -> AstId {
        let ph = placeholder(a, None, depth);
        let ptr = a.alloc(Node::new(Kind::Pointer { to: ph }, loc(), depth));
        a.node_mut(ph).parent = Some(ptr);
        ptr
    }

    /// `int *a[5]`: the pointer is at depth 0, so the array becomes the
    /// outer type: array 5 of pointer to int.
    #[test]
    fn test_array_of_pointer() {
        let (mut a, int_id) = arena_with_int(0);
        let ptr = pointer(&mut a, 0);
        let arr = array(&mut a, 5, 0);
        let result = add_array(&mut a, Some(ptr), arr);
        assert_eq!(result, arr);
        assert_eq!(a.primary_child(arr), Some(ptr));
        let root = patch_placeholder(&mut a, int_id, Some(result));
        assert_eq!(root, arr);
        let inner = a.primary_child(ptr).unwrap();
        assert_eq!(inner, int_id);
    }

    /// `int (*x)[5]`: the pointer is at depth 1, deeper than the array, so
    /// the array is spliced below: pointer to array 5 of int.
    #[test]
    fn test_pointer_to_array() {
        let (mut a, int_id) = arena_with_int(0);
        let ptr = pointer(&mut a, 1);
        let arr = array(&mut a, 5, 0);
        let result = add_array(&mut a, Some(ptr), arr);
        assert_eq!(result, ptr);
        assert_eq!(a.primary_child(ptr), Some(arr));
        let root = patch_placeholder(&mut a, int_id, Some(result));
        assert_eq!(root, ptr);
        assert_eq!(a.primary_child(arr), Some(int_id));
    }

    /// `int a[2][3]`: arrays append.
    #[test]
    fn test_array_append() {
        let (mut a, int_id) = arena_with_int(0);
        let named = placeholder(&mut a, Some("a"), 0);
        let arr2 = array(&mut a, 2, 0);
        let first = add_array(&mut a, Some(named), arr2);
        assert_eq!(first, arr2);
        let arr3 = array(&mut a, 3, 0);
        let result = add_array(&mut a, Some(first), arr3);
        assert_eq!(result, arr2);
        assert_eq!(a.primary_child(arr2), Some(arr3));
        let root = patch_placeholder(&mut a, int_id, Some(result));
        assert_eq!(root, arr2);
        assert_eq!(a.node(arr2).sname.to_string(), "a");
        assert_eq!(a.primary_child(arr3), Some(int_id));
    }

    /// `static int x[4]`: the storage class migrates from the spliced type
    /// up to the array.
    #[test]
    fn test_storage_migration() {
        let (mut a, int_id) = arena_with_int(TS_STATIC);
        let named = placeholder(&mut a, Some("x"), 0);
        let arr = array(&mut a, 4, 0);
        let result = add_array(&mut a, Some(named), arr);
        let root = patch_placeholder(&mut a, int_id, Some(result));
        assert_eq!(root, arr);
        assert!(a.node(arr).bits.has(TS_STATIC));
        assert!(!a.node(int_id).bits.has(TS_STATIC));
    }

    /// After patching, no placeholder survives anywhere in the tree.
    #[test]
    fn test_no_placeholder_after_patch() {
        let (mut a, int_id) = arena_with_int(0);
        let ptr = pointer(&mut a, 1);
        let arr = array(&mut a, 5, 0);
        let result = add_array(&mut a, Some(ptr), arr);
        let root = patch_placeholder(&mut a, int_id, Some(result));
        let mut cur = Some(root);
        while let Some(id) = cur {
            assert!(!matches!(a.kind(id), Kind::Placeholder));
            cur = a.primary_child(id);
        }
    }

    /// `int (*f)(char)` shape: function spliced under the pointer with the
    /// pending specifier as its return.
    #[test]
    fn test_function_under_pointer() {
        let (mut a, int_id) = arena_with_int(0);
        let ptr = pointer(&mut a, 1);
        let ret_ph = placeholder(&mut a, None, 0);
        let func = a.alloc(Node::new(
            Kind::Function {
                ret: ret_ph,
                params: Vec::new(),
            },
            loc(),
            0,
        ));
        a.node_mut(ret_ph).parent = Some(func);
        let result = add_function(&mut a, ptr, int_id, func);
        assert_eq!(result, ptr);
        assert_eq!(a.primary_child(ptr), Some(func));
        assert_eq!(a.primary_child(func), Some(int_id));
    }

    /// `int f()` shape: a bare name becomes the function itself.
    #[test]
    fn test_function_from_name() {
        let (mut a, int_id) = arena_with_int(0);
        let named = placeholder(&mut a, Some("f"), 0);
        let ret_ph = placeholder(&mut a, None, 0);
        let func = a.alloc(Node::new(
            Kind::Function {
                ret: ret_ph,
                params: Vec::new(),
            },
            loc(),
            0,
        ));
        a.node_mut(ret_ph).parent = Some(func);
        let result = add_function(&mut a, named, int_id, func);
        assert_eq!(result, func);
        assert_eq!(a.node(func).sname.to_string(), "f");
        assert_eq!(a.primary_child(func), Some(int_id));
    }

    /// `static int f()`: storage moves from the return type to the
    /// function node.
    #[test]
    fn test_function_storage_migration() {
        let (mut a, int_id) = arena_with_int(TS_STATIC);
        let named = placeholder(&mut a, Some("f"), 0);
        let ret_ph = placeholder(&mut a, None, 0);
        let func = a.alloc(Node::new(
            Kind::Function {
                ret: ret_ph,
                params: Vec::new(),
            },
            loc(),
            0,
        ));
        a.node_mut(ret_ph).parent = Some(func);
        let result = add_function(&mut a, named, int_id, func);
        assert!(a.node(result).bits.has(TS_STATIC));
        assert!(!a.node(int_id).bits.has(TS_STATIC));
    }
}
