use core::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StartError;
use crate::invocation::Report;
use crate::poller::{PollEvent, Poller};


/// Starts polling `op` once per `every`, delivering one [`Report`] to
/// `handler` per completed invocation.
///
/// The first invocation begins immediately. A tick that lands while an
/// invocation is outstanding is skipped. The handler is never invoked
/// concurrently with itself for the same session, and may fire after
/// [`PollHandle::stop`] returns if an invocation was in flight at that moment.
///
/// Must be called from within a tokio runtime: the timer and the driver task
/// both live on it, and arming the timer panics outside one.
pub fn start<Op, Fut, T, E, H>(
    op: Op,
    every: Duration,
    mut handler: H,
) -> Result<PollHandle, StartError>
where
    Op: FnMut() -> Fut + Send + Unpin + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    H: FnMut(Report<T, E>) + Send + 'static,
{
    let mut poller = Poller::new(op, every)?;
    let token = CancellationToken::new();
    let task_token = token.clone();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = task_token.cancelled(), if !poller.is_halted() => {
                    debug!("stop requested, draining any in-flight invocation");
                    poller.halt();
                },
                event = poller.next() => match event {
                    Some(PollEvent::Completed(report)) => handler(report),
                    Some(_) => {},
                    None => break,
                },
            }
        }
    });

    Ok(PollHandle { token, task })
}

/// Handle to a running polling session.
///
/// Dropping the handle detaches the session rather than stopping it; only
/// [`stop`](PollHandle::stop) ends it.
pub struct PollHandle {
    token: CancellationToken,
    task:  JoinHandle<()>,
}

impl PollHandle {
    /// Suppresses all future ticks. Idempotent, non-preemptive: an invocation
    /// already in flight runs to completion and still reaches the handler.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the session to end: after [`stop`](PollHandle::stop), that
    /// means the last outstanding invocation has reported.
    pub async fn join(self) {
        if self.task.await.is_err() {
            warn!("poll driver task panicked");
        }
    }
}
