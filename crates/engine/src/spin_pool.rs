use std::hint;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{instrument, trace, trace_span};

use crate::{Engine, LaunchId, Runnable};

/// A type-erased pointer to the runnable currently published to the pool.
///
/// A fat pointer to `dyn Runnable` does not fit in an `AtomicPtr`, and a
/// bulk's `runnable` only ever changes at the start of a `run` call, so it is
/// guarded by a short-lived lock instead of an atomic; the hot claim loop
/// below never touches this lock except right after observing a new
/// `generation`.
///
/// # Safety
///
/// The pointer is valid for reads for as long as the `run` call that
/// published it has not returned. `run` busy-waits for `completed == N`
/// before it returns, and every worker that might still dereference the
/// pointer has, by construction, already observed `completed` reach `N`
/// itself before that happens — so the pointer is never read after the
/// borrow behind it ends.
struct PublishedJob(*const (dyn Runnable + Sync));

// SAFETY: see the invariant documented on `PublishedJob` above; the pointer
// is only ever dereferenced while the originating `run` call is still on the
// stack, so sending it to worker threads is sound.
unsafe impl Send for PublishedJob {}
unsafe impl Sync for PublishedJob {}

struct Shared {
    generation: AtomicU64,
    num_total_tasks: AtomicI32,
    next: AtomicI32,
    completed: AtomicI32,
    terminate: AtomicBool,
    job: Mutex<Option<PublishedJob>>,
}

/// A persistent pool of `P` workers that busy-wait between bulks.
///
/// Constructed once, workers spin on a handful of atomics rather than
/// blocking, trading CPU between bulks for the lowest possible wake
/// latency and no thread-creation cost on the hot path. See
/// [`SleepPoolEngine`](crate::SleepPoolEngine) for the blocking counterpart.
pub struct SpinPoolEngine {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    next_launch_id: AtomicI32,
}

impl SpinPoolEngine {
    /// Creates a pool of `workers` persistent spinning threads.
    ///
    /// `workers` must be at least `1`; checked with `debug_assert!` in debug
    /// builds.
    pub fn new(workers: usize) -> Self {
        debug_assert!(workers > 0, "SpinPoolEngine needs at least one worker");

        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            num_total_tasks: AtomicI32::new(0),
            next: AtomicI32::new(0),
            completed: AtomicI32::new(0),
            terminate: AtomicBool::new(false),
            job: Mutex::new(None),
        });

        let handles = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("bulk-engine-spin-{worker_id}"))
                    .spawn(move || worker_loop(worker_id, &shared))
                    .expect("failed to spawn spin-pool worker thread")
            })
            .collect();

        Self { shared, workers: handles, next_launch_id: AtomicI32::new(0) }
    }
}

fn worker_loop(worker_id: usize, shared: &Shared) {
    let _span = trace_span!("spin_worker", worker_id).entered();

    let mut local_generation = u64::MAX;
    let mut cached_job: Option<*const (dyn Runnable + Sync)> = None;

    loop {
        if shared.terminate.load(Ordering::Acquire) {
            return;
        }

        let generation = shared.generation.load(Ordering::Acquire);
        if generation != local_generation {
            cached_job = shared.job.lock().unwrap().as_ref().map(|job| job.0);
            local_generation = generation;
        }

        let num_total_tasks = shared.num_total_tasks.load(Ordering::Acquire);
        if num_total_tasks == 0 {
            hint::spin_loop();
            continue;
        }

        // Test-and-test-and-increment: peeking before the real reservation
        // keeps an idle worker from hammering `next` with `fetch_add` once a
        // bulk is fully claimed but not yet fully completed.
        if shared.next.load(Ordering::Relaxed) >= num_total_tasks {
            hint::spin_loop();
            continue;
        }

        let task_index = shared.next.fetch_add(1, Ordering::AcqRel);
        if task_index >= num_total_tasks {
            continue;
        }

        // SAFETY: `num_total_tasks > 0` was observed after reading
        // `generation`, so `cached_job` was populated for this bulk; see
        // the invariant on `PublishedJob`.
        let runnable = unsafe { &*cached_job.expect("job published whenever num_total_tasks > 0") };
        runnable.execute(task_index, num_total_tasks);
        shared.completed.fetch_add(1, Ordering::AcqRel);
    }
}

impl Engine for SpinPoolEngine {
    #[instrument(level = "debug", skip_all, fields(variant = "spin_pool", num_total_tasks, workers = self.workers.len()))]
    fn run(&self, runnable: &(dyn Runnable + Sync), num_total_tasks: i32) {
        {
            let mut job = self.shared.job.lock().unwrap();
            *job = Some(PublishedJob(runnable as *const (dyn Runnable + Sync)));
        }
        self.shared.next.store(0, Ordering::Relaxed);
        self.shared.completed.store(0, Ordering::Relaxed);
        self.shared.num_total_tasks.store(num_total_tasks, Ordering::Release);
        self.shared.generation.fetch_add(1, Ordering::Release);

        while self.shared.completed.load(Ordering::Acquire) != num_total_tasks {
            hint::spin_loop();
        }

        // Park the workers until the next bulk.
        self.shared.num_total_tasks.store(0, Ordering::Release);
        trace!("bulk drained, workers parked");
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
        "Parallel + Thread Pool + Spin"
    }
}

impl Drop for SpinPoolEngine {
    fn drop(&mut self) {
        // `run` always resets `num_total_tasks` back to `0` before it returns
        // (see the end of `run`, above), so observing anything else here
        // means the engine is being dropped while a bulk is still in
        // flight — a contract violation per the crate-level docs, "Error
        // handling". Caught only in debug builds, per that same contract.
        debug_assert!(
            self.shared.num_total_tasks.load(Ordering::Acquire) == 0,
            "SpinPoolEngine dropped while a bulk was still in flight; call `run` to completion before dropping the engine"
        );

        self.shared.terminate.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn every_index_is_dispatched_exactly_once() {
        let engine = SpinPoolEngine::new(4);
        let counter = AtomicUsize::new(0);

        engine.run(&(|_t: i32, _n: i32| { counter.fetch_add(1, Ordering::Relaxed); }), 10_000);

        assert_eq!(counter.load(Ordering::Relaxed), 10_000);
    }

    #[test]
    fn repeated_bulks_on_the_same_pool_each_cover_their_own_range() {
        let engine = SpinPoolEngine::new(3);

        for expected_n in [0, 1, 37, 512] {
            let seen: Vec<AtomicUsize> = (0..expected_n.max(1)).map(|_| AtomicUsize::new(0)).collect();
            engine.run(
                &(|t: i32, _n: i32| {
                    seen[t as usize].fetch_add(1, Ordering::Relaxed);
                }),
                expected_n,
            );
            for (index, count) in seen.iter().enumerate() {
                let expected = if (index as i32) < expected_n { 1 } else { 0 };
                assert_eq!(count.load(Ordering::Relaxed), expected);
            }
        }
    }
}
