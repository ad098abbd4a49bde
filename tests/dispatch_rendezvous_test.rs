//! Integration tests for the cross-thread dispatch core.
//!
//! Exercises the rendezvous protocol under contention: many worker threads
//! blocking on synchronous dispatches at once, per-thread ordering of
//! asynchronous dispatches, and teardown releasing blocked callers instead of
//! hanging them.

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use console_bridge::{DispatchError, GuiEventLoop, NoDialogs, Settings};

fn start_loop() -> (thread::JoinHandle<()>, console_bridge::GuiDispatcher) {
    let (event_loop, dispatcher, _registry) =
        GuiEventLoop::new(Settings::default(), Box::new(NoDialogs));
    let gui = thread::spawn(move || event_loop.run());
    (gui, dispatcher)
}

#[test]
fn sync_rendezvous_under_contention() {
    let (gui, dispatcher) = start_loop();

    let mut workers = Vec::new();
    for worker in 0..4u64 {
        let dispatcher = dispatcher.clone();
        workers.push(thread::spawn(move || {
            for trial in 0..100u64 {
                let expected = worker * 1000 + trial;
                let got = dispatcher
                    .dispatch_sync(None, move |_, _| expected)
                    .unwrap();
                assert_eq!(got, expected);
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    dispatcher
        .dispatch_async(None, |ctx, _| ctx.request_quit())
        .unwrap();
    gui.join().unwrap();
}

#[test]
fn async_dispatches_from_one_thread_run_in_order() {
    let (gui, dispatcher) = start_loop();

    let seen = Arc::new(Mutex::new(Vec::new()));
    for i in 0..50usize {
        let seen = Arc::clone(&seen);
        dispatcher
            .dispatch_async(None, move |_, _| seen.lock().unwrap().push(i))
            .unwrap();
    }
    // Sync dispatch from the same thread queues behind the async batch.
    dispatcher.dispatch_sync(None, |_, _| ()).unwrap();

    let recorded = seen.lock().unwrap().clone();
    assert_eq!(recorded, (0..50).collect::<Vec<_>>());

    dispatcher
        .dispatch_async(None, |ctx, _| ctx.request_quit())
        .unwrap();
    gui.join().unwrap();
}

#[test]
fn stopped_loop_releases_later_dispatches() {
    let (gui, dispatcher) = start_loop();

    dispatcher
        .dispatch_async(None, |ctx, _| ctx.request_quit())
        .unwrap();
    gui.join().unwrap();

    assert_eq!(
        dispatcher.dispatch_sync(None, |_, _| ()),
        Err(DispatchError::Closed)
    );
    assert_eq!(
        dispatcher.dispatch_async(None, |_, _| ()),
        Err(DispatchError::Closed)
    );
}

#[test]
fn target_destroyed_before_execution_runs_with_none() {
    let (gui, dispatcher) = start_loop();
    let owner = thread::current().id();

    let console = dispatcher
        .dispatch_sync(None, move |ctx, _| {
            ctx.create_console("doomed", owner).map(|(id, _streams)| id)
        })
        .unwrap()
        .unwrap();

    // Queued from the same thread, so it runs before the sync request below.
    dispatcher
        .dispatch_async(Some(console), move |ctx, live| {
            assert_eq!(live, Some(console));
            let window = ctx
                .surfaces()
                .tree()
                .console(console)
                .and_then(|state| state.window)
                .unwrap();
            ctx.destroy_window(window);
        })
        .unwrap();

    // The id was live at enqueue time; revalidation at execution maps it to
    // None, the closure still runs, and the rendezvous still fires.
    let live = dispatcher
        .dispatch_sync(Some(console), |_, live| live)
        .unwrap();
    assert_eq!(live, None);

    dispatcher
        .dispatch_async(None, |ctx, _| ctx.request_quit())
        .unwrap();
    gui.join().unwrap();
}

#[test]
fn quit_releases_a_parked_sync_caller() {
    let (gui, dispatcher) = start_loop();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();

    // Holds the GUI thread until the parked caller is queued behind it, then
    // exits the loop with that request still undrained.
    dispatcher
        .dispatch_async(None, move |ctx, _| {
            gate_rx.recv().unwrap();
            ctx.request_quit();
        })
        .unwrap();

    let parked = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.dispatch_sync(None, |_, _| ()))
    };
    thread::sleep(Duration::from_millis(50));
    gate_tx.send(()).unwrap();

    // Dropping the undrained request drops its rendezvous sender, which
    // releases the blocked caller instead of leaving it parked.
    assert_eq!(parked.join().unwrap(), Err(DispatchError::Closed));
    gui.join().unwrap();
}

#[test]
fn smuggled_dispatcher_is_refused_on_the_gui_thread() {
    let (gui, dispatcher) = start_loop();

    // A dispatcher clone captured into GUI-side work must not be allowed to
    // block the only thread that drains the queue.
    let smuggled = dispatcher.clone();
    let result = dispatcher.dispatch_sync(None, move |_, _| {
        smuggled.dispatch_sync(None, |_, _| ()).unwrap_err()
    });
    assert_eq!(result, Ok(DispatchError::WouldDeadlock));

    dispatcher
        .dispatch_async(None, |ctx, _| ctx.request_quit())
        .unwrap();
    gui.join().unwrap();
}
