use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How a bounded operation ended. Exactly one variant is produced per run.
pub(crate) enum Completion<T> {
    /// The operation returned before the deadline.
    Finished(T),
    /// The deadline elapsed first; the operation may still be running.
    TimedOut,
    /// The operation panicked, or could not be started at all.
    Panicked(Box<dyn Any + Send + 'static>),
}

/// Runs `f` on its own thread and waits at most `timeout` for its result.
///
/// On timeout the thread is abandoned, not cancelled. Its result goes into a one-slot channel so
/// the send never blocks, and is dropped with the channel once nobody is listening.
pub(crate) fn run_with_timeout<F, T>(timeout: Duration, f: F) -> Completion<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);

    let spawned = thread::Builder::new()
        .name("breakwater-call".into())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // The receiver is gone when the caller already timed out.
            let _ = tx.send(outcome);
        });

    if let Err(err) = spawned {
        return Completion::Panicked(Box::new(format!("failed to spawn call thread: {}", err)));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(value)) => Completion::Finished(value),
        Ok(Err(payload)) => Completion::Panicked(payload),
        Err(RecvTimeoutError::Timeout) => Completion::TimedOut,
        Err(RecvTimeoutError::Disconnected) => {
            Completion::Panicked(Box::new("call thread exited without a result"))
        }
    }
}
