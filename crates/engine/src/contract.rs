use std::sync::Arc;

use crate::{LaunchId, Runnable};

/// The scheduler contract every engine variant implements.
///
/// All three operations are infallible from the engine's point of view (see
/// the crate-level docs, "Error handling"): a misuse of the contract —
/// dependencies that do not refer to a live launch, for instance — is a
/// programming error checked with `debug_assert!` rather than reported
/// through a `Result`.
pub trait Engine: Send + Sync {
    /// Invoke `runnable.execute(t, num_total_tasks)` once for every
    /// `t` in `[0, num_total_tasks)`, in any order, possibly in parallel,
    /// and return only once every index has been processed.
    ///
    /// `runnable` is borrowed for the duration of this call only; every
    /// variant guarantees it does not retain the reference past `run`'s
    /// return.
    fn run(&self, runnable: &(dyn Runnable + Sync), num_total_tasks: i32);

    /// Record an asynchronous bulk launch and return its [`LaunchId`]
    /// without waiting for it to run.
    ///
    /// `deps` must contain only ids returned by a previous call to this
    /// method in the current epoch that has not yet been reclaimed by a
    /// completed [`sync`](Engine::sync); every id in `deps` must additionally
    /// be strictly less than the id this call returns (the dependency graph
    /// is acyclic by construction, see the crate-level docs). Violating
    /// either precondition is checked with `debug_assert!` and is undefined
    /// behavior in release builds.
    ///
    /// `runnable` is owned jointly by the caller and the engine (hence the
    /// `Arc`): the bulk may run at any point up until the next `sync`, long
    /// after this call returns, so the engine must be able to keep it alive.
    ///
    /// Variants that do not implement dependency ordering may treat this
    /// as equivalent to running the bulk immediately, ignoring `deps`.
    fn run_async_with_deps(
        &self,
        runnable: Arc<dyn Runnable + Send + Sync>,
        num_total_tasks: i32,
        deps: &[LaunchId],
    ) -> LaunchId;

    /// Block until every launch submitted since the last `sync` (or since
    /// construction) has completed, then reclaim their storage and reset
    /// [`LaunchId`] allocation back to `0`.
    ///
    /// Calling `sync` twice in a row with no intervening submissions is a
    /// no-op the second time.
    fn sync(&self);

    /// A human-readable identifier for this variant, e.g. `"Serial"` or
    /// `"Parallel + Thread Pool + Sleep + DAG"`.
    fn name(&self) -> &'static str;
}
