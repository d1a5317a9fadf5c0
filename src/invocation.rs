use core::any::Any;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::panic::AssertUnwindSafe;

use futures_util::future::CatchUnwind;
use futures_util::FutureExt;
use pin_project::pin_project;
use thiserror::Error;

/// The single outcome of one invocation: the operation's value, or whichever
/// failure path it took.
pub type Report<T, E> = Result<T, InvokeError<E>>;

/// Every way an invocation can fail, collapsed into one arm of [`Report`].
#[derive(Debug, Error)]
pub enum InvokeError<E> {
    /// The operation's own failure branch.
    #[error("operation failed: {0}")]
    Failed(E),

    /// The operation panicked while being polled.
    #[error("operation panicked: {0}")]
    Panicked(String),
}

/// Future adaptor that runs an operation future once and yields exactly one
/// [`Report`].
///
/// A panic raised while polling the operation is caught and reported through
/// the same error arm as an explicit `Err`. After the report is produced the
/// invocation latches: polling it again returns `Pending` rather than a second
/// outcome.
#[pin_project]
pub struct Invocation<Fut> {
    #[pin]
    fut:  CatchUnwind<AssertUnwindSafe<Fut>>,
    done: bool,
}

impl<Fut: Future> Invocation<Fut> {
    pub fn new(fut: Fut) -> Self {
        Self {
            fut:  AssertUnwindSafe(fut).catch_unwind(),
            done: false,
        }
    }
}

impl<Fut, T, E> Future for Invocation<Fut>
where
    Fut: Future<Output = Result<T, E>>,
{
    type Output = Report<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if *this.done {
            // a finished invocation never reports a second time
            return Poll::Pending;
        }

        let report = match this.fut.poll(cx) {
            Poll::Ready(Ok(Ok(value))) => Ok(value),
            Poll::Ready(Ok(Err(err))) => Err(InvokeError::Failed(err)),
            Poll::Ready(Err(payload)) => Err(InvokeError::Panicked(panic_message(&*payload))),
            Poll::Pending => return Poll::Pending,
        };

        *this.done = true;
        Poll::Ready(report)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}

#[cfg(test)]
mod test {
    use core::future::Future;
    use core::task::Poll;

    use futures_test::future::FutureTestExt;
    use futures_test::task::noop_context;
    use matches::assert_matches;

    use super::{Invocation, InvokeError, Report};

    #[test]
    fn value_passes_through() {
        let invocation = Invocation::new(async { Ok::<_, ()>(27) }.pending_once());
        let report = futures_executor::block_on(invocation);

        assert_matches!(report, Ok(27));
    }

    #[test]
    fn explicit_failure_lands_in_the_error_arm() {
        let invocation = Invocation::new(async { Err::<(), _>("boom") });
        let report: Report<(), &str> = futures_executor::block_on(invocation);

        assert_matches!(report, Err(InvokeError::Failed("boom")));
    }

    #[test]
    fn panic_lands_in_the_error_arm() {
        async fn always_panics() -> Result<(), ()> {
            panic!("wires crossed")
        }

        let invocation = Invocation::new(always_panics());
        let report = futures_executor::block_on(invocation);

        match report {
            Err(InvokeError::Panicked(message)) => assert_eq!(message, "wires crossed"),
            other => panic!("expected a panic report, got {:?}", other),
        }
    }

    #[test]
    fn completed_invocation_never_reports_twice() {
        let mut cx = noop_context();
        let mut invocation = Box::pin(Invocation::new(async { Ok::<_, ()>(1) }));

        assert_matches!(invocation.as_mut().poll(&mut cx), Poll::Ready(Ok(1)));
        assert_matches!(invocation.as_mut().poll(&mut cx), Poll::Pending);
        assert_matches!(invocation.as_mut().poll(&mut cx), Poll::Pending);
    }
}
