//! CLI entry point for console-bridge.
//!
//! Provides a headless demonstration of the bridge: the main thread plays
//! the GUI thread and pumps the event loop while worker threads open
//! consoles, push output, and adjust their windows through the worker-side
//! API.
//!
//! # Usage
//!
//! Run the demo with four workers:
//! ```bash
//! console-bridge demo --workers 4
//! ```

use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use console_bridge::{bridge, ConsoleBridge, ExternalValue, NoDialogs, Settings, WindowOption};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "console-bridge")]
#[command(about = "Thread-bound console front end bridge", long_about = None)]
struct Cli {
    /// Config name under config/ (without extension)
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the headless demo session
    Demo {
        /// Number of worker threads, each with its own console
        #[arg(long, default_value = "2")]
        workers: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match Settings::new(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("config load failed ({e}), using defaults");
            Settings::default()
        }
    };
    env_logger::Builder::new()
        .parse_filters(&settings.log_level)
        .init();

    match cli.command {
        Commands::Demo { workers } => run_demo(settings, workers),
    }
}

/// Spawns `workers` console sessions and pumps GUI events on this thread
/// until the last worker has finished.
fn run_demo(settings: Settings, workers: usize) -> Result<()> {
    let (event_loop, bridge) = bridge(settings, Box::new(NoDialogs));

    let mut handles = Vec::with_capacity(workers);
    for n in 0..workers {
        let bridge = bridge.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("worker-{n}"))
                .spawn(move || worker_session(bridge, n))?,
        );
    }

    // Closes the loop once every worker is done.
    let coordinator = {
        let bridge = bridge.clone();
        thread::spawn(move || {
            for handle in handles {
                if handle.join().is_err() {
                    warn!("a worker session panicked");
                }
            }
            bridge.quit();
        })
    };

    // This thread is the GUI thread.
    event_loop.run();
    coordinator.join().ok();
    info!("demo finished");
    Ok(())
}

fn worker_session(bridge: ConsoleBridge, n: usize) {
    let (console, streams) = match bridge.open_console(&format!("console {n}")) {
        Ok(opened) => opened,
        Err(e) => {
            warn!("worker {n} could not open a console: {e}");
            return;
        }
    };
    info!("worker {n} opened {console:?}");

    bridge.window_pos(&[
        WindowOption::Position {
            x: 40 * n as i32,
            y: 40 * n as i32,
        },
        WindowOption::Show(true),
    ]);

    for i in 0..5 {
        let _ = streams.output.send(format!("worker {n}: line {i}"));
        bridge.add_history(&format!("cmd_{i}"));
        thread::sleep(Duration::from_millis(10));
    }

    match bridge.console_property("updateRefreshRate", ExternalValue::Unbound) {
        Ok(Some(rate)) => info!("worker {n} refresh rate: {rate:?}"),
        Ok(None) => warn!("worker {n} console vanished"),
        Err(e) => warn!("worker {n} property read failed: {e}"),
    }

    if let Some((rows, cols)) = bridge.tty_size() {
        info!("worker {n} geometry: {rows}x{cols}");
    }
    bridge.close();
}
