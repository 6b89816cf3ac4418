//! `bulk-engine` runs "bulk task launches": a launch names a function and a
//! task count `N`, and the engine calls that function once for every task
//! index in `[0, N)`, in any order, possibly across many threads.
//!
//! Five variants of the same contract are provided, trading off latency,
//! idle CPU cost, and scheduling flexibility:
//!
//! - [`SerialEngine`] runs everything on the caller's thread. No concurrency,
//!   no synchronization, the baseline every other variant is measured
//!   against.
//! - [`AlwaysSpawnEngine`] spawns a fresh batch of [`std::thread::scope`]
//!   threads for every launch and joins them before returning. Simple, but
//!   pays thread-creation cost on every single bulk.
//! - [`SpinPoolEngine`] keeps a persistent pool of worker threads that
//!   busy-wait on atomics between bulks, trading idle CPU for the lowest
//!   possible wake latency.
//! - [`SleepPoolEngine`] is the same persistent-pool design, but workers
//!   block on a [`std::sync::Condvar`] instead of spinning, so an idle pool
//!   costs nothing.
//! - [`SleepPoolDagEngine`] extends the sleeping pool with asynchronous
//!   launches ([`Engine::run_async_with_deps`]) ordered by an explicit
//!   dependency graph, reclaimed in bulk by [`Engine::sync`].
//!
//! [`new_engine`] and [`EngineConfig`] pick one of the five by an
//! [`EngineVariant`] at runtime, which is how the `bulk-engine-bench` binary
//! selects a variant from a command-line flag.
//!
//! # Error handling
//!
//! Task dispatch itself is infallible. There is no `Result` anywhere on the
//! [`Engine`] trait: a violated precondition (an out-of-range dependency, a
//! worker count of zero) is a programming error, not a recoverable
//! condition, and is caught with `debug_assert!` rather than reported. The
//! `bulk-engine-errors` crate exists for the layers around the engine — CLI
//! argument parsing and the like — not for the scheduler itself.
//!
//! # Logging
//!
//! Every variant instruments its `run` method with a [`tracing`] span
//! (`level = "debug"`, field `variant`) and emits `trace!`-level events for
//! per-worker lifecycle and per-task completion. Consumers that want visibility
//! into scheduling decisions install a [`tracing_subscriber`] subscriber; the
//! engine crate itself never initializes one, since library crates should not
//! assume ownership of global logging state.
#![deny(missing_docs)]

mod always_spawn;
mod config;
mod contract;
mod launch_id;
mod runnable;
mod serial;
mod sleep_pool;
mod sleep_pool_dag;
mod spin_pool;

pub use always_spawn::AlwaysSpawnEngine;
pub use config::{new_engine, EngineConfig, EngineVariant};
pub use contract::Engine;
pub use launch_id::LaunchId;
pub use runnable::Runnable;
pub use serial::SerialEngine;
pub use sleep_pool::SleepPoolEngine;
pub use sleep_pool_dag::SleepPoolDagEngine;
pub use spin_pool::SpinPoolEngine;
