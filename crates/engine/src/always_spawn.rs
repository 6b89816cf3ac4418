use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{instrument, trace};

use crate::{Engine, LaunchId, Runnable};

/// Spawns a fresh batch of `P` worker threads for every [`run`](Engine::run)
/// call, joining them before returning.
///
/// Workers pull task indices from a single shared counter with
/// `fetch_add`, so load is balanced dynamically across however long each
/// task actually takes. The price is thread-creation latency on every bulk;
/// [`SpinPoolEngine`](crate::SpinPoolEngine) and
/// [`SleepPoolEngine`](crate::SleepPoolEngine) exist to amortize it away.
#[derive(Debug)]
pub struct AlwaysSpawnEngine {
    workers: usize,
    next_launch_id: AtomicI32,
}

impl AlwaysSpawnEngine {
    /// Creates an engine that spawns `workers` threads per bulk.
    ///
    /// `workers` must be at least `1`; this is checked with `debug_assert!`
    /// in debug builds and left unchecked in release builds.
    pub fn new(workers: usize) -> Self {
        debug_assert!(workers > 0, "AlwaysSpawnEngine needs at least one worker");

        Self { workers, next_launch_id: AtomicI32::new(0) }
    }
}

impl Engine for AlwaysSpawnEngine {
    #[instrument(level = "debug", skip_all, fields(variant = "always_spawn", num_total_tasks, workers = self.workers))]
    fn run(&self, runnable: &(dyn Runnable + Sync), num_total_tasks: i32) {
        let next = AtomicI32::new(0);

        // `thread::scope` lets every spawned thread borrow `runnable` and
        // `next` directly: the scope does not return until all of them have
        // joined, so the borrow never outlives the call, exactly as the
        // contract in `Engine::run` requires.
        thread::scope(|scope| {
            for worker_id in 0..self.workers {
                scope.spawn(move || {
                    trace!(worker_id, "worker started");
                    loop {
                        // The increment is the reservation; checking the
                        // range only *after* `fetch_add` (not as a loop
                        // predicate that re-reads `next`) is what prevents
                        // two workers from ever being handed the same index.
                        let task_index = next.fetch_add(1, Ordering::Relaxed);
                        if task_index >= num_total_tasks {
                            break;
                        }
                        runnable.execute(task_index, num_total_tasks);
                    }
                    trace!(worker_id, "worker exiting");
                });
            }
        });
    }

    fn run_async_with_deps(
        &self,
        runnable: Arc<dyn Runnable + Send + Sync>,
        num_total_tasks: i32,
        _deps: &[LaunchId],
    ) -> LaunchId {
        self.run(&*runnable, num_total_tasks);
        LaunchId(self.next_launch_id.fetch_add(1, Ordering::Relaxed))
    }

    fn sync(&self) {
        self.next_launch_id.store(0, Ordering::Relaxed);
    }

    fn name(&self) -> &'static str {
        "Parallel + Always Spawn"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn every_index_is_dispatched_exactly_once() {
        let engine = AlwaysSpawnEngine::new(4);
        let seen: Vec<AtomicUsize> = (0..10_000).map(|_| AtomicUsize::new(0)).collect();

        engine.run(
            &(|t: i32, _n: i32| {
                seen[t as usize].fetch_add(1, Ordering::Relaxed);
            }),
            10_000,
        );

        assert!(seen.iter().all(|count| count.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn zero_tasks_spawns_workers_that_exit_immediately() {
        let engine = AlwaysSpawnEngine::new(4);
        let calls = AtomicUsize::new(0);
        engine.run(&(|_t: i32, _n: i32| { calls.fetch_add(1, Ordering::Relaxed); }), 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
