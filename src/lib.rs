//! # Console Bridge Library
//!
//! This crate bridges a multithreaded language runtime onto a single-threaded
//! GUI front end. Worker threads of the runtime each own an interactive
//! console window; every mutation of GUI state is marshalled onto the one
//! designated GUI thread, while reads go through a shared registry. The same
//! library backs both the demo binary (`main.rs`) and embedding as a console
//! layer inside a larger host.
//!
//! ## Crate Structure
//!
//! The library is organized into several modules, each with a distinct
//! responsibility:
//!
//! - **`config`**: Defines the structures for loading application
//!   configuration from TOML files. See `config::Settings`.
//! - **`console`**: The worker-side API. `ConsoleBridge` is the handle a
//!   runtime thread uses to open its console and drive every console
//!   operation; the paired stream types carry console I/O.
//! - **`dispatch`**: The cross-thread execution core. `GuiEventLoop` runs on
//!   the GUI thread and drains closures that worker-held `GuiDispatcher`
//!   clones enqueue, asynchronously or with a blocking rendezvous.
//! - **`error`**: Defines the `BridgeError` enum for centralized error
//!   handling across the crate.
//! - **`property`**: Typed marshalling between dynamically tagged runtime
//!   values and the statically typed console attribute schema.
//! - **`registry`**: The shared surface registry: the surface tree plus the
//!   thread-to-console binding map, behind one lock.
//! - **`resolver`**: Predicate-driven depth-first search over the surface
//!   tree.
//! - **`surface`**: The surface tree itself and the per-kind state of
//!   windows and consoles.

pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod property;
pub mod registry;
pub mod resolver;
pub mod surface;

pub use config::Settings;
pub use console::{bridge, ConsoleBridge, ConsoleStreams, DialogProvider, NoDialogs, WindowOption};
pub use dispatch::{DispatchError, GuiContext, GuiDispatcher, GuiEventLoop};
pub use error::{BridgeError, BridgeResult};
pub use property::{ExternalValue, PropertySchema};
pub use registry::{ConsoleRegistry, SharedRegistry};
pub use surface::{FontSettings, LineWrapMode, SurfaceId};
