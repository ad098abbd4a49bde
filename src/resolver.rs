//! First-match search over the surface tree.
//!
//! Callers rely on the exact traversal order for "first match" semantics, so
//! the walk is specified precisely: top-level surfaces are visited in host
//! order, and each is explored with an explicit-stack depth-first search that
//! pushes a node's children in order and therefore visits the *last* pushed
//! child first. Read-only over the tree.

use crate::surface::{SurfaceId, SurfaceNode, SurfaceTree};

/// Returns the first node satisfying `predicate`, in stack-based DFS order.
pub fn find<P>(tree: &SurfaceTree, predicate: P) -> Option<SurfaceId>
where
    P: Fn(&SurfaceNode) -> bool,
{
    for &root in tree.top_level() {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            if predicate(node) {
                return Some(id);
            }
            stack.extend(node.children.iter().copied());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SurfaceKind, WindowState};
    use std::cell::RefCell;

    #[test]
    fn visits_in_stack_dfs_order() {
        // window
        // ├── a
        // │   ├── a1
        // │   └── a2
        // └── b
        //     ├── b1
        //     └── b2
        let mut tree = SurfaceTree::new();
        let window = tree.insert_top_level(SurfaceKind::Window(WindowState::new("w")));
        let a = tree.insert_child(window, SurfaceKind::Panel).unwrap();
        let b = tree.insert_child(window, SurfaceKind::Panel).unwrap();
        let a1 = tree.insert_child(a, SurfaceKind::Panel).unwrap();
        let a2 = tree.insert_child(a, SurfaceKind::Panel).unwrap();
        let b1 = tree.insert_child(b, SurfaceKind::Panel).unwrap();
        let b2 = tree.insert_child(b, SurfaceKind::Panel).unwrap();

        let visited = RefCell::new(Vec::new());
        let found = find(&tree, |node| {
            visited.borrow_mut().push(node.id);
            false
        });
        assert!(found.is_none());
        // Last-pushed child pops first.
        assert_eq!(*visited.borrow(), vec![window, b, b2, b1, a, a2, a1]);
    }

    #[test]
    fn first_match_is_order_sensitive() {
        let mut tree = SurfaceTree::new();
        let window = tree.insert_top_level(SurfaceKind::Window(WindowState::new("w")));
        let _a = tree.insert_child(window, SurfaceKind::Panel).unwrap();
        let b = tree.insert_child(window, SurfaceKind::Panel).unwrap();

        // Both panels match; the later sibling is visited first.
        let found = find(&tree, |node| matches!(node.kind, SurfaceKind::Panel));
        assert_eq!(found, Some(b));
    }

    #[test]
    fn top_level_surfaces_searched_in_host_order() {
        let mut tree = SurfaceTree::new();
        let first = tree.insert_top_level(SurfaceKind::Window(WindowState::new("first")));
        let _second = tree.insert_top_level(SurfaceKind::Window(WindowState::new("second")));

        let found = find(&tree, |node| matches!(node.kind, SurfaceKind::Window(_)));
        assert_eq!(found, Some(first));
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let tree = SurfaceTree::new();
        assert!(find(&tree, |_| true).is_none());
    }
}
