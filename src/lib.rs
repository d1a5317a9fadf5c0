//! Single-flight interval poller for async operations.
//!
//! A [`Poller`] fires a caller-supplied async operation at most once per fixed
//! interval. A tick that lands while a previous invocation is still outstanding
//! is skipped, never queued. Every completed invocation produces exactly one
//! [`Report`], success or failure alike. [`start`] drives a poller on a spawned
//! tokio task and hands back a [`PollHandle`] whose `stop` suppresses future
//! ticks without touching an invocation already in flight.

#![deny(unsafe_op_in_unsafe_fn)]

mod driver;
mod error;
mod invocation;
mod poller;

pub use self::driver::{start, PollHandle};
pub use self::error::StartError;
pub use self::invocation::{Invocation, InvokeError, Report};
pub use self::poller::{PollEvent, Poller};
