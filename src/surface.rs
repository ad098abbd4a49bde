//! Surface tree and console state.
//!
//! The GUI front end is modelled as a tree of surfaces: top-level windows,
//! plain panels, and console surfaces. The tree is arena-style, keyed by
//! [`SurfaceId`]; parents own the ordered child sequence. The GUI thread is
//! the sole mutator of everything in this module; worker threads only ever
//! observe it through the registry's read path.

use std::collections::HashMap;
use std::thread::ThreadId;

use serde::{Deserialize, Serialize};

use crate::config::ConsoleDefaults;
use crate::console::GuiStreams;

/// Opaque identifier of a node in the surface tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

/// Line wrapping modes of a console surface.
///
/// This is the crate's one enumerated property; the symbol table in the
/// property schema maps `NoWrap`/`WidgetWidth` onto the backing integers.
/// Bitmask/flag-style enumerations are not supported anywhere in the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineWrapMode {
    /// No wrapping; long lines scroll horizontally.
    NoWrap,
    /// Wrap at the widget width.
    WidgetWidth,
}

impl LineWrapMode {
    /// Backing integer of the mode.
    pub fn as_i64(self) -> i64 {
        match self {
            LineWrapMode::NoWrap => 0,
            LineWrapMode::WidgetWidth => 1,
        }
    }

    /// Mode for a backing integer, if it names one.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(LineWrapMode::NoWrap),
            1 => Some(LineWrapMode::WidgetWidth),
            _ => None,
        }
    }
}

/// Console font preference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FontSettings {
    /// Family name, e.g. `"Monospace"`.
    pub family: String,
    /// Point size.
    pub point_size: f64,
}

impl FontSettings {
    /// Approximate pixel size of one character cell `(width, height)`.
    ///
    /// The original derived this from live font metrics; a fixed ratio keeps
    /// the geometry math deterministic for tests.
    pub fn cell_metrics(&self) -> (u32, u32) {
        let width = (self.point_size * 0.6).ceil().max(1.0) as u32;
        let height = (self.point_size * 1.5).ceil().max(1.0) as u32;
        (width, height)
    }
}

/// State of a top-level window surface.
#[derive(Clone, Debug)]
pub struct WindowState {
    /// Window title.
    pub title: String,
    /// Top-left position in pixels.
    pub position: (i32, i32),
    /// Size in pixels `(width, height)`.
    pub size_px: (u32, u32),
    /// Whether the window is shown.
    pub visible: bool,
    /// Whether the window holds focus.
    pub active: bool,
}

impl WindowState {
    /// A visible, inactive window with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            position: (0, 0),
            size_px: (0, 0),
            visible: true,
            active: false,
        }
    }
}

/// Per-kind state of a console surface.
///
/// A console is bound one-to-one with the runtime worker thread that
/// requested it; the binding is set at creation and never changes for the
/// lifetime of the instance.
pub struct ConsoleState {
    owner: ThreadId,
    /// Enclosing top-level window, if the console is framed in one.
    pub window: Option<SurfaceId>,
    /// Command history, oldest first, bounded by `history_limit`.
    pub history: Vec<String>,
    /// Maximum number of history lines retained.
    pub history_limit: usize,
    /// Current font preference.
    pub font: FontSettings,
    /// Output refreshes between cursor resets.
    pub update_refresh_rate: u32,
    /// Display backlog limit; `0` means unbounded.
    pub maximum_block_count: i64,
    /// Current line wrapping mode.
    pub line_wrap_mode: LineWrapMode,
    /// Whether typed input overwrites instead of inserting.
    pub overwrite_mode: bool,
    /// Text geometry in character cells `(rows, cols)`.
    pub size_cells: (u32, u32),
    /// Display backlog of output lines.
    pub buffer: Vec<String>,
    pub(crate) streams: GuiStreams,
}

impl ConsoleState {
    pub(crate) fn new(
        owner: ThreadId,
        defaults: &ConsoleDefaults,
        history_limit: usize,
        streams: GuiStreams,
    ) -> Self {
        Self {
            owner,
            window: None,
            history: Vec::new(),
            history_limit,
            font: FontSettings {
                family: defaults.font_family.clone(),
                point_size: defaults.font_size,
            },
            update_refresh_rate: defaults.update_refresh_rate,
            maximum_block_count: defaults.maximum_block_count,
            line_wrap_mode: defaults.line_wrap_mode,
            overwrite_mode: false,
            size_cells: (defaults.rows, defaults.cols),
            buffer: Vec::new(),
            streams,
        }
    }

    /// Thread this console is bound to. Immutable after creation.
    pub fn owning_thread(&self) -> ThreadId {
        self.owner
    }

    /// Appends a command to the history; empty lines are ignored.
    pub fn add_history_line(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        self.history.push(line.to_string());
        if self.history.len() > self.history_limit {
            let excess = self.history.len() - self.history_limit;
            self.history.drain(..excess);
        }
    }

    /// Moves pending output/error stream lines into the display backlog,
    /// trimming from the top when `maximum_block_count` is exceeded.
    pub fn drain_output(&mut self) {
        while let Ok(line) = self.streams.output.try_recv() {
            self.buffer.push(line);
        }
        while let Ok(line) = self.streams.error.try_recv() {
            self.buffer.push(line);
        }
        if self.maximum_block_count > 0 && self.buffer.len() > self.maximum_block_count as usize {
            let excess = self.buffer.len() - self.maximum_block_count as usize;
            self.buffer.drain(..excess);
        }
    }

    /// Clears the display backlog.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feeds a line of user input to the owning worker's input stream.
    pub fn feed_input(&self, line: impl Into<String>) {
        let _ = self.streams.input.send(line.into());
    }
}

/// Type tag plus per-kind state of a surface node.
pub enum SurfaceKind {
    /// Top-level window.
    Window(WindowState),
    /// Plain container surface with no state of its own.
    Panel,
    /// Interactive console surface.
    Console(ConsoleState),
}

/// A node in the surface tree.
pub struct SurfaceNode {
    /// This node's id.
    pub id: SurfaceId,
    /// Parent node; `None` for top-level surfaces.
    pub parent: Option<SurfaceId>,
    /// Ordered children, owned by this node.
    pub children: Vec<SurfaceId>,
    /// Type tag and per-kind state.
    pub kind: SurfaceKind,
}

/// Arena of surface nodes plus the host-ordered top-level list.
pub struct SurfaceTree {
    nodes: HashMap<SurfaceId, SurfaceNode>,
    top_level: Vec<SurfaceId>,
    next_id: u64,
}

impl Default for SurfaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            top_level: Vec::new(),
            next_id: 1,
        }
    }

    fn alloc(&mut self, parent: Option<SurfaceId>, kind: SurfaceKind) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            SurfaceNode {
                id,
                parent,
                children: Vec::new(),
                kind,
            },
        );
        id
    }

    /// Appends a new top-level surface.
    pub fn insert_top_level(&mut self, kind: SurfaceKind) -> SurfaceId {
        let id = self.alloc(None, kind);
        self.top_level.push(id);
        id
    }

    /// Appends a new child under `parent`. Returns `None` if the parent is
    /// gone.
    pub fn insert_child(&mut self, parent: SurfaceId, kind: SurfaceKind) -> Option<SurfaceId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        let id = self.alloc(Some(parent), kind);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        Some(id)
    }

    /// Removes `id` and its whole subtree. Returns the owning threads of any
    /// consoles that were destroyed so their registry bindings can be
    /// dropped.
    pub fn remove(&mut self, id: SurfaceId) -> Vec<ThreadId> {
        let Some(root) = self.nodes.get(&id) else {
            return Vec::new();
        };
        match root.parent {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.retain(|c| *c != id);
                }
            }
            None => self.top_level.retain(|t| *t != id),
        }

        let mut owners = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children);
                if let SurfaceKind::Console(console) = node.kind {
                    owners.push(console.owning_thread());
                }
            }
        }
        owners
    }

    /// Top-level surfaces in host order.
    pub fn top_level(&self) -> &[SurfaceId] {
        &self.top_level
    }

    /// Node by id.
    pub fn node(&self, id: SurfaceId) -> Option<&SurfaceNode> {
        self.nodes.get(&id)
    }

    /// Mutable node by id.
    pub fn node_mut(&mut self, id: SurfaceId) -> Option<&mut SurfaceNode> {
        self.nodes.get_mut(&id)
    }

    /// Console state of `id`, if the node exists and is a console.
    pub fn console(&self, id: SurfaceId) -> Option<&ConsoleState> {
        match &self.node(id)?.kind {
            SurfaceKind::Console(state) => Some(state),
            _ => None,
        }
    }

    /// Mutable console state of `id`.
    pub fn console_mut(&mut self, id: SurfaceId) -> Option<&mut ConsoleState> {
        match &mut self.node_mut(id)?.kind {
            SurfaceKind::Console(state) => Some(state),
            _ => None,
        }
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no surfaces.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
