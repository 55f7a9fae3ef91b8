use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::task::JoinHandle;
use tokio::time::{self, Sleep};

use crate::executor::Completion;

pin_project! {
    /// Races a spawned task against a deadline.
    ///
    /// Dropping the future detaches the task rather than aborting it, so a timed out operation
    /// keeps running and its output is discarded by the runtime.
    pub(crate) struct Deadline<T> {
        #[pin]
        task: JoinHandle<T>,
        #[pin]
        delay: Sleep,
    }
}

impl<T> Deadline<T>
where
    T: Send + 'static,
{
    /// Spawns `future` onto the current runtime.
    ///
    /// # Panics
    ///
    /// * When called outside of a tokio runtime.
    pub(crate) fn spawn<F>(future: F, timeout: Duration) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Deadline {
            task: tokio::spawn(future),
            delay: time::sleep(timeout),
        }
    }
}

impl<T> Future for Deadline<T> {
    type Output = Completion<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Poll::Ready(joined) = this.task.poll(cx) {
            let completion = match joined {
                Ok(value) => Completion::Finished(value),
                Err(err) => match err.try_into_panic() {
                    Ok(payload) => Completion::Panicked(payload),
                    Err(err) => Completion::Panicked(Box::new(err.to_string())),
                },
            };
            return Poll::Ready(completion);
        }

        match this.delay.poll(cx) {
            Poll::Ready(()) => Poll::Ready(Completion::TimedOut),
            Poll::Pending => Poll::Pending,
        }
    }
}
