//! Worker-side console sessions.
//!
//! [`ConsoleBridge`] is the handle a runtime worker thread holds: every
//! operation resolves the calling thread's bound console through the shared
//! registry and then either reads it under the registry lock (pure queries)
//! or ships a closure to the GUI thread through the dispatcher (anything that
//! mutates surfaces). One bridge clone per worker thread is the intended
//! shape; the handle is cheap to clone and all clones address the same front
//! end.
//!
//! I/O between a console widget and its worker travels over three unbounded
//! channels (input, output, error), split at creation into a GUI half kept in
//! the console state and a worker half ([`ConsoleStreams`]) returned from
//! [`ConsoleBridge::open_console`].

use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Settings;
use crate::dispatch::{GuiDispatcher, GuiEventLoop};
use crate::error::BridgeResult;
use crate::property::{console_schema, ExternalValue};
use crate::registry::SharedRegistry;
use crate::surface::{FontSettings, SurfaceId, SurfaceKind};

/// GUI-side half of a console's stream triple. Lives inside the console
/// state; the widget reads worker output from here and feeds typed input in.
pub(crate) struct GuiStreams {
    pub(crate) input: UnboundedSender<String>,
    pub(crate) output: UnboundedReceiver<String>,
    pub(crate) error: UnboundedReceiver<String>,
}

/// Worker-side half of a console's stream triple.
pub struct ConsoleStreams {
    /// Lines of user input, in the order they were typed.
    pub input: UnboundedReceiver<String>,
    /// Ordinary output lines toward the console display.
    pub output: UnboundedSender<String>,
    /// Error output lines toward the console display.
    pub error: UnboundedSender<String>,
}

/// Creates the paired stream halves of one console.
pub(crate) fn console_channels() -> (GuiStreams, ConsoleStreams) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    (
        GuiStreams {
            input: input_tx,
            output: output_rx,
            error: error_rx,
        },
        ConsoleStreams {
            input: input_rx,
            output: output_tx,
            error: error_tx,
        },
    )
}

/// Host-dialog hooks the front end installs.
///
/// Called on the GUI thread only, always from inside a dispatched closure, so
/// implementations may block on user interaction.
pub trait DialogProvider: Send {
    /// Modal open-file chooser. `None` on cancel.
    fn open_file(&self, caption: &str, start: &Path, pattern: &str) -> Option<PathBuf>;
    /// Modal save-file chooser. `None` on cancel.
    fn save_file(&self, caption: &str, start: &Path, pattern: &str) -> Option<PathBuf>;
    /// Modal font chooser seeded with the current selection. `None` on
    /// cancel.
    fn choose_font(&self, current: &FontSettings) -> Option<FontSettings>;
}

/// Dialog provider for headless front ends; every chooser cancels.
pub struct NoDialogs;

impl DialogProvider for NoDialogs {
    fn open_file(&self, _caption: &str, _start: &Path, _pattern: &str) -> Option<PathBuf> {
        None
    }

    fn save_file(&self, _caption: &str, _start: &Path, _pattern: &str) -> Option<PathBuf> {
        None
    }

    fn choose_font(&self, _current: &FontSettings) -> Option<FontSettings> {
        None
    }
}

/// One adjustment applied by [`ConsoleBridge::window_pos`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowOption {
    /// Resize to a text geometry; scaled to pixels via the console font.
    Size {
        /// Text columns.
        cols: u32,
        /// Text rows.
        rows: u32,
    },
    /// Move the window's top-left corner, in pixels.
    Position {
        /// Horizontal position.
        x: i32,
        /// Vertical position.
        y: i32,
    },
    /// Stacking order request. Accepted and ignored; the surface model has
    /// no z-axis.
    ZOrder(i32),
    /// Show or hide the window.
    Show(bool),
    /// Give the window focus.
    Activate,
}

/// Builds a console front end: the GUI event loop to run on the designated
/// GUI thread, and the bridge handle to clone into worker threads.
pub fn bridge(settings: Settings, dialogs: Box<dyn DialogProvider>) -> (GuiEventLoop, ConsoleBridge) {
    let (event_loop, dispatcher, registry) = GuiEventLoop::new(settings, dialogs);
    (
        event_loop,
        ConsoleBridge {
            dispatcher,
            registry,
        },
    )
}

/// Worker-side handle over the console front end.
#[derive(Clone)]
pub struct ConsoleBridge {
    dispatcher: GuiDispatcher,
    registry: SharedRegistry,
}

impl ConsoleBridge {
    /// Console bound to the calling thread, if any.
    fn current_console(&self) -> Option<SurfaceId> {
        self.registry
            .read()
            .unwrap()
            .resolve_for_thread(thread::current().id())
    }

    /// Any live console, in first-match traversal order. Bootstrap hook for
    /// host code that runs before its own thread has opened a console.
    pub fn any_console(&self) -> Option<SurfaceId> {
        self.registry.read().unwrap().any_console()
    }

    /// Opens a new console window bound to the calling thread and returns
    /// its id plus the worker-side streams.
    ///
    /// Blocks until the GUI thread has created the surfaces. Fails with
    /// [`crate::error::BridgeError::ThreadAlreadyBound`] if this thread
    /// already owns a console.
    pub fn open_console(&self, title: &str) -> BridgeResult<(SurfaceId, ConsoleStreams)> {
        let owner = thread::current().id();
        let title = title.to_string();
        self.dispatcher
            .dispatch_sync(None, move |ctx, _| ctx.create_console(&title, owner))?
    }

    /// Reads the title of the calling thread's console window, replacing it
    /// first when `new` is given. `None` if this thread has no console or
    /// its surfaces are gone.
    pub fn window_title(&self, new: Option<String>) -> Option<String> {
        let console = self.current_console()?;
        self.dispatcher
            .dispatch_sync(Some(console), move |ctx, live| {
                let window = ctx.surfaces().tree().console(live?)?.window?;
                let mut registry = ctx.surfaces_mut();
                let node = registry.tree_mut().node_mut(window)?;
                match &mut node.kind {
                    SurfaceKind::Window(win) => {
                        if let Some(new) = new {
                            win.title = new;
                        }
                        Some(win.title.clone())
                    }
                    _ => None,
                }
            })
            .ok()
            .flatten()
    }

    /// Applies geometry/visibility adjustments to the calling thread's
    /// console window. `false` if this thread has no console, its surfaces
    /// are gone, or the front end has shut down.
    pub fn window_pos(&self, options: &[WindowOption]) -> bool {
        let Some(console) = self.current_console() else {
            return false;
        };
        let options = options.to_vec();
        self.dispatcher
            .dispatch_sync(Some(console), move |ctx, live| {
                let Some(console) = live else {
                    return false;
                };
                let mut registry = ctx.surfaces_mut();
                let Some((window, cell)) = registry
                    .tree()
                    .console(console)
                    .and_then(|state| Some((state.window?, state.font.cell_metrics())))
                else {
                    return false;
                };
                if let Some(state) = registry.tree_mut().console_mut(console) {
                    for option in &options {
                        if let WindowOption::Size { cols, rows } = option {
                            state.size_cells = (*rows, *cols);
                        }
                    }
                }
                let Some(node) = registry.tree_mut().node_mut(window) else {
                    return false;
                };
                let SurfaceKind::Window(win) = &mut node.kind else {
                    return false;
                };
                for option in options {
                    match option {
                        WindowOption::Size { cols, rows } => {
                            win.size_px = (cols * cell.0, rows * cell.1);
                        }
                        WindowOption::Position { x, y } => win.position = (x, y),
                        WindowOption::ZOrder(order) => {
                            debug!("ignoring z-order request {order} for {window:?}");
                        }
                        WindowOption::Show(visible) => win.visible = visible,
                        WindowOption::Activate => win.active = true,
                    }
                }
                true
            })
            .unwrap_or(false)
    }

    /// Clears the display backlog of the calling thread's console.
    pub fn tty_clear(&self) -> bool {
        let Some(console) = self.current_console() else {
            return false;
        };
        self.dispatcher
            .dispatch_sync(Some(console), |ctx, live| {
                live.and_then(|id| ctx.with_console(id, |state| state.clear()))
                    .is_some()
            })
            .unwrap_or(false)
    }

    /// Current text geometry `(rows, cols)` of the calling thread's console.
    ///
    /// Pure read under the registry lock; never touches the GUI queue.
    pub fn tty_size(&self) -> Option<(u32, u32)> {
        let console = self.current_console()?;
        self.registry
            .read()
            .unwrap()
            .tree()
            .console(console)
            .map(|state| state.size_cells)
    }

    /// Appends a line to the calling thread's command history,
    /// fire-and-forget. `false` only if this thread has no console or the
    /// front end has shut down.
    pub fn add_history(&self, line: &str) -> bool {
        let Some(console) = self.current_console() else {
            return false;
        };
        let line = line.to_string();
        self.dispatcher
            .dispatch_async(Some(console), move |ctx, live| {
                let applied = live
                    .and_then(|id| ctx.with_console(id, |state| state.add_history_line(&line)));
                if applied.is_none() {
                    debug!("history line dropped, console {console:?} is gone");
                }
            })
            .is_ok()
    }

    /// Snapshot of the calling thread's command history, oldest first.
    pub fn history(&self) -> Vec<String> {
        let Some(console) = self.current_console() else {
            return Vec::new();
        };
        self.registry
            .read()
            .unwrap()
            .tree()
            .console(console)
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }

    /// Reads or writes one property of the calling thread's console,
    /// directed by the tag of `value` (unbound queries, anything else
    /// writes).
    ///
    /// `Ok(None)` when this thread has no console or its surface is gone;
    /// marshalling failures come back as errors with the property left
    /// untouched.
    pub fn console_property(
        &self,
        name: &str,
        value: ExternalValue,
    ) -> BridgeResult<Option<ExternalValue>> {
        let pairs = vec![(name.to_string(), value)];
        Ok(self
            .console_settings(&pairs)?
            .and_then(|results| results.into_iter().next()))
    }

    /// Applies a batch of property reads/writes in order, returning the
    /// resolved value of each. The batch stops at the first marshalling
    /// failure; earlier writes stay applied.
    pub fn console_settings(
        &self,
        pairs: &[(String, ExternalValue)],
    ) -> BridgeResult<Option<Vec<ExternalValue>>> {
        let Some(console) = self.current_console() else {
            return Ok(None);
        };
        let pairs = pairs.to_vec();
        self.dispatcher
            .dispatch_sync(Some(console), move |ctx, live| {
                let Some(id) = live else {
                    return Ok(None);
                };
                ctx.with_console(id, |state| {
                    let schema = console_schema();
                    let mut results = Vec::with_capacity(pairs.len());
                    for (name, value) in pairs {
                        results.push(schema.get_or_set(state, &name, value)?);
                    }
                    Ok(Some(results))
                })
                .unwrap_or(Ok(None))
            })?
    }

    /// Shows the open-file chooser on the GUI thread.
    pub fn open_file_dialog(
        &self,
        caption: &str,
        start: &Path,
        pattern: &str,
    ) -> BridgeResult<Option<PathBuf>> {
        let caption = caption.to_string();
        let start = start.to_path_buf();
        let pattern = pattern.to_string();
        Ok(self.dispatcher.dispatch_sync(None, move |ctx, _| {
            ctx.dialogs().open_file(&caption, &start, &pattern)
        })?)
    }

    /// Shows the save-file chooser on the GUI thread.
    pub fn save_file_dialog(
        &self,
        caption: &str,
        start: &Path,
        pattern: &str,
    ) -> BridgeResult<Option<PathBuf>> {
        let caption = caption.to_string();
        let start = start.to_path_buf();
        let pattern = pattern.to_string();
        Ok(self.dispatcher.dispatch_sync(None, move |ctx, _| {
            ctx.dialogs().save_file(&caption, &start, &pattern)
        })?)
    }

    /// Shows the font chooser seeded with the console's current font and
    /// applies the selection. The chosen font, or `None` on cancel or when
    /// this thread has no console.
    pub fn select_font(&self) -> BridgeResult<Option<FontSettings>> {
        let Some(console) = self.current_console() else {
            return Ok(None);
        };
        Ok(self
            .dispatcher
            .dispatch_sync(Some(console), move |ctx, live| {
                let id = live?;
                let current = ctx.surfaces().tree().console(id).map(|s| s.font.clone())?;
                let chosen = ctx.dialogs().choose_font(&current)?;
                ctx.with_console(id, |state| state.font = chosen.clone());
                Some(chosen)
            })?)
    }

    /// Closes the calling thread's console window and everything under it.
    /// The thread's binding is dropped with it; a later `open_console` may
    /// rebind.
    pub fn close(&self) -> bool {
        let Some(console) = self.current_console() else {
            return false;
        };
        self.dispatcher
            .dispatch_sync(Some(console), move |ctx, live| match live {
                Some(id) => {
                    let target = ctx
                        .surfaces()
                        .tree()
                        .console(id)
                        .and_then(|state| state.window)
                        .unwrap_or(id);
                    ctx.destroy_window(target);
                    true
                }
                None => false,
            })
            .unwrap_or(false)
    }

    /// Asks the GUI event loop to exit. Pending sync callers are released
    /// with a closed-dispatcher error once the loop stops.
    pub fn quit(&self) -> bool {
        let sent = self
            .dispatcher
            .dispatch_async(None, |ctx, _| ctx.request_quit())
            .is_ok();
        if !sent {
            warn!("quit requested after the GUI event loop already stopped");
        }
        sent
    }
}
