use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use crate::error::StartError;
use crate::invocation::{Invocation, Report};


/// One observable step of a polling session.
#[derive(Debug)]
pub enum PollEvent<T, E> {
    /// A tick found the gate idle and began a new invocation.
    Started,

    /// A tick fired while a previous invocation was still outstanding. The
    /// tick is permanently lost, never deferred.
    Skipped,

    /// An invocation finished. The gate is already idle when this is yielded.
    Completed(Report<T, E>),
}

/// Stream that fires an async operation at most once per interval.
///
/// The first tick is eager: the first invocation begins at construction time,
/// not one interval later. The timer keeps running while an invocation is
/// outstanding; ticks that land during one yield [`PollEvent::Skipped`]. At
/// most one invocation is outstanding at any time.
///
/// [`halt`](Poller::halt) is terminal: no further ticks fire, an invocation
/// already outstanding still completes and is still yielded, and the stream
/// then ends.
pub struct Poller<Op, Fut> {
    op:        Op,
    interval:  Interval,
    in_flight: Option<Pin<Box<Invocation<Fut>>>>,
    halted:    bool,
}

impl<Op, Fut, T, E> Poller<Op, Fut>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Fails fast on a zero interval, before any timer is armed.
    ///
    /// Must be called from within a tokio runtime: arming the timer panics
    /// outside one.
    pub fn new(op: Op, every: Duration) -> Result<Self, StartError> {
        if every.is_zero() {
            return Err(StartError::ZeroInterval);
        }

        // skipped ticks stay aligned to the original schedule instead of
        // bursting to catch up
        let mut interval = interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Self {
            op,
            interval,
            in_flight: None,
            halted: false,
        })
    }

    /// Stops the timer. Terminal; an in-flight invocation still drains.
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl<Op, Fut, T, E> Stream for Poller<Op, Fut>
where
    Op: FnMut() -> Fut + Unpin,
    Fut: Future<Output = Result<T, E>>,
{
    type Item = PollEvent<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // drive the in-flight invocation before looking at the timer, so a
        // completion racing a tick surfaces first
        if let Some(invocation) = &mut this.in_flight {
            if let Poll::Ready(report) = invocation.as_mut().poll(cx) {
                // the gate opens strictly before the report is surfaced
                this.in_flight = None;
                return Poll::Ready(Some(PollEvent::Completed(report)));
            }
        }

        if this.halted {
            return match this.in_flight {
                Some(_) => Poll::Pending,
                None => Poll::Ready(None),
            };
        }

        match this.interval.poll_tick(cx) {
            Poll::Ready(_) => {
                if this.in_flight.is_some() {
                    debug!("tick skipped, previous invocation still in flight");
                    return Poll::Ready(Some(PollEvent::Skipped));
                }

                debug!("tick started");
                this.in_flight = Some(Box::pin(Invocation::new((this.op)())));
                Poll::Ready(Some(PollEvent::Started))
            },
            Poll::Pending => Poll::Pending,
        }
    }
}
