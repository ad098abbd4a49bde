//! Thread-bound console registry.
//!
//! Maps a runtime worker thread's identity to the one console surface it
//! owns. The binding is established when the console is created on the GUI
//! thread and removed when its window is destroyed; it is immutable for the
//! instance's lifetime, and at most one console is bound to a thread at any
//! time.
//!
//! Lookups are kept incremental: `resolve_for_thread` consults an owned
//! thread→console map maintained on create/destroy instead of re-searching
//! the widget tree per call. Tree search ([`crate::resolver::find`]) is
//! reserved for the one bootstrap case, [`ConsoleRegistry::any_console`].
//!
//! The original design read the live widget tree from worker threads with no
//! synchronization against concurrent GUI-thread mutation, a latent data
//! race. This implementation hardens that: tree and bindings live together
//! behind one `RwLock`, the GUI thread takes write locks as the sole mutator,
//! and worker lookups take read locks. See DESIGN.md for the trade-off.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread::ThreadId;

use log::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::resolver;
use crate::surface::{SurfaceId, SurfaceKind, SurfaceTree};

/// Surface tree plus the thread→console binding map, mutated only by the GUI
/// thread.
pub struct ConsoleRegistry {
    tree: SurfaceTree,
    bindings: HashMap<ThreadId, SurfaceId>,
}

/// Shared handle to the registry; write locks belong to the GUI thread.
pub type SharedRegistry = Arc<RwLock<ConsoleRegistry>>;

impl Default for ConsoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            tree: SurfaceTree::new(),
            bindings: HashMap::new(),
        }
    }

    /// A fresh shared registry handle.
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Read access to the surface tree.
    pub fn tree(&self) -> &SurfaceTree {
        &self.tree
    }

    /// Mutable access to the surface tree. GUI thread only; destruction of
    /// console nodes must go through [`Self::destroy`] so bindings stay
    /// consistent.
    pub fn tree_mut(&mut self) -> &mut SurfaceTree {
        &mut self.tree
    }

    /// Records that `thread` owns `console`. Fails if the thread already owns
    /// one.
    pub fn bind(&mut self, thread: ThreadId, console: SurfaceId) -> BridgeResult<()> {
        if self.bindings.contains_key(&thread) {
            return Err(BridgeError::ThreadAlreadyBound);
        }
        debug!("binding console {console:?} to thread {thread:?}");
        self.bindings.insert(thread, console);
        Ok(())
    }

    /// Console bound to `thread`, or `None`. Never errors; "no console" is a
    /// normal outcome.
    pub fn resolve_for_thread(&self, thread: ThreadId) -> Option<SurfaceId> {
        self.bindings.get(&thread).copied()
    }

    /// Any console in the tree, in first-match DFS order. Used during
    /// bootstrap before a console has been bound to the calling thread.
    pub fn any_console(&self) -> Option<SurfaceId> {
        resolver::find(&self.tree, |node| {
            matches!(node.kind, SurfaceKind::Console(_))
        })
    }

    /// Removes `surface` and its subtree, dropping the bindings of any
    /// consoles destroyed with it.
    pub fn destroy(&mut self, surface: SurfaceId) {
        for owner in self.tree.remove(surface) {
            debug!("unbinding console of thread {owner:?}");
            self.bindings.remove(&owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleDefaults;
    use crate::console::console_channels;
    use crate::surface::{ConsoleState, WindowState};

    fn add_console(registry: &mut ConsoleRegistry, owner: ThreadId) -> SurfaceId {
        let window = registry
            .tree_mut()
            .insert_top_level(SurfaceKind::Window(WindowState::new("console")));
        let (gui, _worker) = console_channels();
        let state = ConsoleState::new(owner, &ConsoleDefaults::default(), 100, gui);
        let console = registry
            .tree_mut()
            .insert_child(window, SurfaceKind::Console(state))
            .unwrap();
        registry.bind(owner, console).unwrap();
        console
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = ConsoleRegistry::new();
        assert!(registry.resolve_for_thread(std::thread::current().id()).is_none());
        assert!(registry.any_console().is_none());
    }

    #[test]
    fn binding_is_per_thread() {
        let mut registry = ConsoleRegistry::new();
        let here = std::thread::current().id();
        let elsewhere = std::thread::spawn(std::thread::current)
            .join()
            .unwrap()
            .id();

        let console = add_console(&mut registry, here);
        assert_eq!(registry.resolve_for_thread(here), Some(console));
        assert_eq!(registry.resolve_for_thread(elsewhere), None);
    }

    #[test]
    fn second_binding_for_same_thread_is_refused() {
        let mut registry = ConsoleRegistry::new();
        let here = std::thread::current().id();
        let console = add_console(&mut registry, here);

        let err = registry.bind(here, console).unwrap_err();
        assert!(matches!(err, BridgeError::ThreadAlreadyBound));
    }

    #[test]
    fn any_console_finds_one_during_bootstrap() {
        let mut registry = ConsoleRegistry::new();
        assert!(registry.any_console().is_none());

        let here = std::thread::current().id();
        let console = add_console(&mut registry, here);
        assert_eq!(registry.any_console(), Some(console));
    }

    #[test]
    fn destroy_window_drops_binding() {
        let mut registry = ConsoleRegistry::new();
        let here = std::thread::current().id();
        let console = add_console(&mut registry, here);
        let window = registry.tree().console(console).map(|_| registry.tree().top_level()[0]);

        registry.destroy(window.unwrap());
        assert!(registry.resolve_for_thread(here).is_none());
        assert!(registry.any_console().is_none());
        assert!(registry.tree().is_empty());
    }
}
