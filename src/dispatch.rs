//! Cross-thread GUI dispatcher.
//!
//! Exactly one GUI thread runs [`GuiEventLoop::run`], a cooperative loop
//! draining a queue of [`DispatchRequest`]s. An unbounded number of worker
//! threads hold [`GuiDispatcher`] clones and enqueue closures to run on the
//! GUI thread, either fire-and-forget ([`GuiDispatcher::dispatch_async`]) or
//! blocking until the closure has finished and handed a result back
//! ([`GuiDispatcher::dispatch_sync`]).
//!
//! # Request/rendezvous flow
//!
//! ```text
//! Worker thread                      GUI thread
//! -------------                      ----------
//! 1. Box the closure
//! 2. Send via mpsc queue      ------>
//! 3. Block on oneshot                3. Receive request
//!    (sync mode only)                4. Revalidate the target surface
//!                                    5. Run the closure against GuiContext
//!                                    6. Send result through the oneshot
//! 7. Resume with result       <------
//! ```
//!
//! The oneshot channel is created per sync request; it is both the completion
//! signal and the result slot, fired exactly once after the closure has fully
//! finished. The channel carries the happens-before edge: everything the
//! closure wrote is visible to the resumed caller.
//!
//! # Capability separation
//!
//! Worker code holds a `GuiDispatcher`; GUI-side code only ever receives
//! `&mut GuiContext`, handed to closures by the event loop. The blocking call
//! path therefore does not exist for GUI-side code written against the
//! intended API. Should a dispatcher clone be captured into a GUI-thread
//! closure anyway, `dispatch_sync` compares against the recorded GUI thread
//! id and fails with [`DispatchError::WouldDeadlock`] instead of blocking a
//! thread that can never drain its own queue.
//!
//! # Teardown
//!
//! There is no cancellation and no timeout: a queued request always runs or
//! the loop is gone. When the loop stops, dropped requests drop their oneshot
//! senders, so blocked sync callers are released with
//! [`DispatchError::Closed`] rather than left blocked forever. A GUI thread that
//! stops draining (without exiting) stalls all pending sync callers; that
//! starvation is a documented systemic limit, not detected here.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::{debug, info};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::Settings;
use crate::console::{console_channels, ConsoleStreams, DialogProvider};
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{ConsoleRegistry, SharedRegistry};
use crate::surface::{ConsoleState, SurfaceId, SurfaceKind, WindowState};

/// Errors produced by the dispatcher itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The GUI event loop is no longer running; the request was dropped or
    /// its result will never arrive.
    #[error("GUI event loop is no longer running")]
    Closed,

    /// A synchronous dispatch was attempted from the GUI thread, which cannot
    /// drain its own queue while blocked.
    #[error("synchronous dispatch from the GUI thread would deadlock")]
    WouldDeadlock,
}

/// A unit of work queued for the GUI thread.
///
/// Created by a worker thread, consumed and discarded by the GUI thread. The
/// target surface (if any) is revalidated at execution time; work always runs
/// even when the target has been destroyed in the meantime, receiving `None`
/// in that case.
pub struct DispatchRequest {
    target: Option<SurfaceId>,
    work: Work,
}

type Work = Box<dyn FnOnce(&mut GuiContext, Option<SurfaceId>) + Send>;

/// Worker-side handle for scheduling work onto the GUI thread.
#[derive(Clone)]
pub struct GuiDispatcher {
    tx: mpsc::UnboundedSender<DispatchRequest>,
    gui_thread: Arc<OnceCell<ThreadId>>,
}

impl GuiDispatcher {
    /// Enqueues `work` and returns immediately. No value is handed back.
    ///
    /// Requests from one thread run in the order they were enqueued; no order
    /// is guaranteed across threads beyond each enqueue being atomic.
    pub fn dispatch_async<F>(
        &self,
        target: Option<SurfaceId>,
        work: F,
    ) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut GuiContext, Option<SurfaceId>) + Send + 'static,
    {
        self.tx
            .send(DispatchRequest {
                target,
                work: Box::new(work),
            })
            .map_err(|_| DispatchError::Closed)
    }

    /// Enqueues `work`, blocks until the GUI thread has run it, and returns
    /// the closure's result.
    ///
    /// The rendezvous fires exactly once, after `work` has fully finished on
    /// the GUI thread. If the loop is gone, whether before the send or after
    /// it but before execution completes, the caller is released with
    /// [`DispatchError::Closed`].
    pub fn dispatch_sync<R, F>(
        &self,
        target: Option<SurfaceId>,
        work: F,
    ) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&mut GuiContext, Option<SurfaceId>) -> R + Send + 'static,
    {
        if self.gui_thread.get().copied() == Some(thread::current().id()) {
            return Err(DispatchError::WouldDeadlock);
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(DispatchRequest {
                target,
                work: Box::new(move |ctx, live| {
                    let _ = done_tx.send(work(ctx, live));
                }),
            })
            .map_err(|_| DispatchError::Closed)?;

        done_rx.blocking_recv().map_err(|_| DispatchError::Closed)
    }
}

/// GUI-thread capability: the state closures run against.
///
/// Only the event loop constructs one, and only executing closures see it, so
/// everything reachable from here is mutated on the GUI thread alone.
pub struct GuiContext {
    registry: SharedRegistry,
    settings: Settings,
    dialogs: Box<dyn DialogProvider>,
    quit: bool,
}

impl GuiContext {
    /// Shared registry handle, for giving worker-side code a resolver.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Read access to the surfaces.
    pub fn surfaces(&self) -> std::sync::RwLockReadGuard<'_, ConsoleRegistry> {
        self.registry.read().unwrap()
    }

    /// Write access to the surfaces. Caller is by construction the GUI
    /// thread.
    pub fn surfaces_mut(&self) -> std::sync::RwLockWriteGuard<'_, ConsoleRegistry> {
        self.registry.write().unwrap()
    }

    /// Runs `f` against the console state of `id`, if it still exists.
    pub fn with_console<R>(
        &self,
        id: SurfaceId,
        f: impl FnOnce(&mut ConsoleState) -> R,
    ) -> Option<R> {
        let mut registry = self.surfaces_mut();
        registry.tree_mut().console_mut(id).map(f)
    }

    /// Creates a new top-level window framing a console bound to `owner`,
    /// returning the console id and the worker-side stream triple.
    ///
    /// Fails with [`BridgeError::ThreadAlreadyBound`] if the owner already
    /// has a console; nothing is created in that case.
    pub fn create_console(
        &mut self,
        title: &str,
        owner: ThreadId,
    ) -> BridgeResult<(SurfaceId, ConsoleStreams)> {
        let mut registry = self.surfaces_mut();
        if registry.resolve_for_thread(owner).is_some() {
            return Err(BridgeError::ThreadAlreadyBound);
        }

        let window = registry
            .tree_mut()
            .insert_top_level(SurfaceKind::Window(WindowState::new(title)));

        let (gui, worker) = console_channels();
        let mut state = ConsoleState::new(
            owner,
            &self.settings.console,
            self.settings.history.limit,
            gui,
        );
        state.window = Some(window);
        let (cell_w, cell_h) = state.font.cell_metrics();
        let size_px = (state.size_cells.1 * cell_w, state.size_cells.0 * cell_h);

        let console = match registry
            .tree_mut()
            .insert_child(window, SurfaceKind::Console(state))
        {
            Some(id) => id,
            None => {
                // Window was inserted a moment ago; unreachable in practice.
                registry.destroy(window);
                return Err(BridgeError::ThreadAlreadyBound);
            }
        };
        if let Some(node) = registry.tree_mut().node_mut(window) {
            if let SurfaceKind::Window(win) = &mut node.kind {
                win.size_px = size_px;
            }
        }
        registry.bind(owner, console)?;
        info!("opened console {console:?} for thread {owner:?} (\"{title}\")");
        Ok((console, worker))
    }

    /// Destroys `surface` and its subtree, dropping console bindings with it.
    pub fn destroy_window(&mut self, surface: SurfaceId) {
        debug!("destroying surface {surface:?}");
        self.surfaces_mut().destroy(surface);
    }

    /// Dialog provider installed on this front end.
    pub fn dialogs(&self) -> &dyn DialogProvider {
        self.dialogs.as_ref()
    }

    /// Configuration the front end was started with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Asks the event loop to exit after the current request.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// The GUI thread's execution queue and pump.
pub struct GuiEventLoop {
    rx: mpsc::UnboundedReceiver<DispatchRequest>,
    ctx: GuiContext,
    gui_thread: Arc<OnceCell<ThreadId>>,
}

impl GuiEventLoop {
    /// Builds the loop, its worker-side dispatcher, and the shared registry.
    pub fn new(
        settings: Settings,
        dialogs: Box<dyn DialogProvider>,
    ) -> (Self, GuiDispatcher, SharedRegistry) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = ConsoleRegistry::shared();
        let gui_thread = Arc::new(OnceCell::new());
        let event_loop = Self {
            rx,
            ctx: GuiContext {
                registry: Arc::clone(&registry),
                settings,
                dialogs,
                quit: false,
            },
            gui_thread: Arc::clone(&gui_thread),
        };
        let dispatcher = GuiDispatcher { tx, gui_thread };
        (event_loop, dispatcher, registry)
    }

    /// Runs requests until quit is requested or every dispatcher is dropped.
    ///
    /// The calling thread becomes the GUI thread; its id is recorded so
    /// [`GuiDispatcher::dispatch_sync`] can refuse same-thread calls. On
    /// exit, undrained requests are dropped, which releases their blocked
    /// sync callers with [`DispatchError::Closed`].
    pub fn run(mut self) {
        let _ = self.gui_thread.set(thread::current().id());
        info!("GUI event loop started");
        while let Some(request) = self.rx.blocking_recv() {
            let live = request.target.filter(|id| {
                let registry = self.ctx.surfaces();
                registry.tree().node(*id).is_some()
            });
            (request.work)(&mut self.ctx, live);
            if self.ctx.quit_requested() {
                info!("quit requested, GUI event loop exiting");
                break;
            }
        }
        info!("GUI event loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::NoDialogs;

    #[test]
    fn sync_dispatch_from_gui_thread_is_refused() {
        let (_event_loop, dispatcher, _registry) =
            GuiEventLoop::new(Settings::default(), Box::new(NoDialogs));
        // Pretend this thread is the GUI thread.
        dispatcher
            .gui_thread
            .set(thread::current().id())
            .unwrap();

        let err = dispatcher
            .dispatch_sync(None, |_, _| ())
            .unwrap_err();
        assert_eq!(err, DispatchError::WouldDeadlock);
    }

    #[test]
    fn dispatch_into_dropped_loop_reports_closed() {
        let (event_loop, dispatcher, _registry) =
            GuiEventLoop::new(Settings::default(), Box::new(NoDialogs));
        drop(event_loop);

        assert_eq!(
            dispatcher.dispatch_async(None, |_, _| ()),
            Err(DispatchError::Closed)
        );
        assert_eq!(
            dispatcher.dispatch_sync(None, |_, _| 42).unwrap_err(),
            DispatchError::Closed
        );
    }

    #[test]
    fn absent_target_runs_and_returns_result() {
        let (event_loop, dispatcher, _registry) =
            GuiEventLoop::new(Settings::default(), Box::new(NoDialogs));
        let gui = thread::spawn(move || event_loop.run());

        let result = dispatcher.dispatch_sync(None, |_, live| {
            assert!(live.is_none());
            7 * 6
        });
        assert_eq!(result, Ok(42));

        dispatcher
            .dispatch_async(None, |ctx, _| ctx.request_quit())
            .unwrap();
        gui.join().unwrap();
    }
}
