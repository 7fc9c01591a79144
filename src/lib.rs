//! rankkit: bounded frequency ranking over unbounded key streams.
//!
//! Keys are registered one occurrence at a time; the structure keeps at
//! most `capacity` of them ordered by weight and evicts the lowest-ranked
//! key when a new one arrives at a full ranking. Three engines share the
//! same surface:
//!
//! - [`SequentialRanking`](ranking::sequential::SequentialRanking): the
//!   single-threaded reference.
//! - [`ConcurrentRanking`](ranking::concurrent::ConcurrentRanking): per-node
//!   locks, many registrations in parallel, consistent snapshots.
//! - [`SynchronizedRanking`](ranking::synchronized::SynchronizedRanking):
//!   the sequential engine behind one lock.
//!
//! See `DESIGN.md` for the ordering rules and the lock order.

pub mod builder;
pub mod ds;
pub mod error;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod ranking;
pub mod traits;
