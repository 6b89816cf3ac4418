use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{instrument, trace, trace_span};

use crate::{Engine, LaunchId, Runnable};

/// A launch that has been submitted but has not yet been reclaimed by
/// [`sync`](Engine::sync).
struct LaunchEntry {
    runnable: Arc<dyn Runnable + Send + Sync>,
    num_total_tasks: i32,
    /// Tasks not yet claimed by a worker.
    next: i32,
    /// Tasks claimed and finished.
    completed: i32,
    /// How many of this launch's own dependencies have not yet completed.
    /// The launch enters the frontier the instant this drops to zero.
    remaining_deps: i32,
    /// Launches that list this one as a dependency, by index.
    dependents: Vec<usize>,
    done: bool,
}

struct DagState {
    /// Indexed by `LaunchId::as_usize()` within the current epoch.
    launches: Vec<LaunchEntry>,
    /// Launches whose dependencies are all satisfied and that have not
    /// started dispatching tasks yet, in the order they became ready.
    frontier: VecDeque<usize>,
    /// The launch workers are currently pulling task indices from, if any.
    working: Option<usize>,
    launches_completed: i32,
}

struct Shared {
    state: Mutex<DagState>,
    /// Signaled when the frontier gains an entry or a new `working` launch
    /// is chosen, so idle workers wake up to look for something to claim.
    cv_work: Condvar,
    /// Signaled when a launch finishes, so `sync` can recheck its exit
    /// condition.
    cv_done: Condvar,
    terminate: AtomicBool,
}

/// A persistent sleeping pool that schedules launches against an explicit
/// dependency graph instead of running them all immediately.
///
/// At most one launch is "working" (actively handing out task indices) at a
/// time; the next launch is chosen from the frontier of ready-but-unstarted
/// launches as soon as the current one is fully claimed. This keeps the
/// claim loop as simple as the flat [`SleepPoolEngine`](crate::SleepPoolEngine)'s
/// while still respecting submission order among launches with no
/// dependency relationship, since the frontier is a FIFO queue.
pub struct SleepPoolDagEngine {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl SleepPoolDagEngine {
    /// Creates a pool of `workers` persistent threads serving the
    /// dependency-ordered queue.
    ///
    /// `workers` must be at least `1`; checked with `debug_assert!` in debug
    /// builds.
    pub fn new(workers: usize) -> Self {
        debug_assert!(workers > 0, "SleepPoolDagEngine needs at least one worker");

        let shared = Arc::new(Shared {
            state: Mutex::new(DagState {
                launches: Vec::new(),
                frontier: VecDeque::new(),
                working: None,
                launches_completed: 0,
            }),
            cv_work: Condvar::new(),
            cv_done: Condvar::new(),
            terminate: AtomicBool::new(false),
        });

        let handles = (0..workers)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("bulk-engine-dag-{worker_id}"))
                    .spawn(move || worker_loop(worker_id, &shared))
                    .expect("failed to spawn sleep-pool-dag worker thread")
            })
            .collect();

        Self { shared, workers: handles }
    }
}

/// Marks `index` complete, wakes its now-ready dependents into the
/// frontier, and bumps the epoch-wide completion count. Caller holds the
/// lock.
fn finish_launch(state: &mut DagState, index: usize) {
    state.launches[index].done = true;
    state.launches_completed += 1;
    let dependents = std::mem::take(&mut state.launches[index].dependents);
    for dependent in dependents {
        state.launches[dependent].remaining_deps -= 1;
        if state.launches[dependent].remaining_deps == 0 {
            state.frontier.push_back(dependent);
        }
    }
}

/// Pops ready launches off the frontier, immediately finishing any with
/// zero tasks (they have nothing to dispatch and would otherwise never
/// reach `completed == num_total_tasks`), until either a launch with work
/// is found and installed as `working`, or the frontier runs dry. Caller
/// holds the lock.
fn pump_frontier(state: &mut DagState) {
    if state.working.is_some() {
        return;
    }
    while let Some(index) = state.frontier.pop_front() {
        if state.launches[index].num_total_tasks == 0 {
            finish_launch(state, index);
            continue;
        }
        state.working = Some(index);
        return;
    }
}

fn worker_loop(worker_id: usize, shared: &Shared) {
    let _span = trace_span!("dag_worker", worker_id).entered();

    loop {
        let mut state = shared.state.lock().unwrap();

        loop {
            if shared.terminate.load(Ordering::Acquire) {
                return;
            }
            pump_frontier(&mut state);
            if let Some(index) = state.working {
                if state.launches[index].next < state.launches[index].num_total_tasks {
                    break;
                }
            }
            state = shared.cv_work.wait(state).unwrap();
        }

        let index = state.working.expect("working launch installed above");
        let task_index = state.launches[index].next;
        state.launches[index].next += 1;
        let num_total_tasks = state.launches[index].num_total_tasks;
        let runnable = Arc::clone(&state.launches[index].runnable);
        drop(state);

        runnable.execute(task_index, num_total_tasks);

        let mut state = shared.state.lock().unwrap();
        state.launches[index].completed += 1;
        let launch_done = state.launches[index].completed == num_total_tasks;
        if launch_done {
            state.working = None;
            finish_launch(&mut state, index);
            pump_frontier(&mut state);
            shared.cv_done.notify_all();
            shared.cv_work.notify_all();
        }
        drop(state);
        trace!(worker_id, task_index, "task completed");
    }
}

impl Engine for SleepPoolDagEngine {
    #[instrument(level = "debug", skip_all, fields(variant = "sleep_pool_dag", num_total_tasks))]
    fn run(&self, runnable: &(dyn Runnable + Sync), num_total_tasks: i32) {
        // Reuse the async path: erase `runnable`'s lifetime behind a raw
        // pointer good for the rest of this call, submit it with no
        // dependencies, then drain the whole epoch. Draining everything
        // (not just this one launch) is a deliberate simplification: a
        // synchronous `run` call on this variant acts as a full barrier,
        // same as calling `sync` directly would.
        struct BorrowedRunnable(*const (dyn Runnable + Sync));
        // SAFETY: `sync` below blocks until this launch (and everything
        // else in the epoch) has completed before `run` returns, so the
        // pointer is never read after the borrow of `runnable` ends.
        unsafe impl Send for BorrowedRunnable {}
        unsafe impl Sync for BorrowedRunnable {}
        impl Runnable for BorrowedRunnable {
            fn execute(&self, task_index: i32, total_tasks: i32) {
                // SAFETY: see `BorrowedRunnable`'s construction site.
                unsafe { (*self.0).execute(task_index, total_tasks) }
            }
        }

        let borrowed: Arc<dyn Runnable + Send + Sync> =
            Arc::new(BorrowedRunnable(runnable as *const (dyn Runnable + Sync)));
        self.run_async_with_deps(borrowed, num_total_tasks, &[]);
        self.sync();
    }

    fn run_async_with_deps(
        &self,
        runnable: Arc<dyn Runnable + Send + Sync>,
        num_total_tasks: i32,
        deps: &[LaunchId],
    ) -> LaunchId {
        let mut state = self.shared.state.lock().unwrap();

        let index = state.launches.len();
        let id = LaunchId(index as i32);

        let mut remaining_deps = 0;
        for &dep in deps {
            debug_assert!(
                dep.as_usize() < index,
                "a launch cannot depend on itself or on a launch submitted after it"
            );
            let dep_entry = &mut state.launches[dep.as_usize()];
            if dep_entry.done {
                continue;
            }
            dep_entry.dependents.push(index);
            remaining_deps += 1;
        }

        state.launches.push(LaunchEntry {
            runnable,
            num_total_tasks,
            next: 0,
            completed: 0,
            remaining_deps,
            dependents: Vec::new(),
            done: false,
        });

        if remaining_deps == 0 {
            state.frontier.push_back(index);
        }
        pump_frontier(&mut state);
        drop(state);
        self.shared.cv_work.notify_all();

        id
    }

    fn sync(&self) {
        let mut state = self.shared.state.lock().unwrap();
        let total = state.launches.len() as i32;
        while state.launches_completed != total {
            state = self.shared.cv_done.wait(state).unwrap();
        }
        state.launches.clear();
        state.frontier.clear();
        state.working = None;
        state.launches_completed = 0;
    }

    fn name(&self) -> &'static str {
        "Parallel + Thread Pool + Sleep + DAG"
    }
}

impl Drop for SleepPoolDagEngine {
    fn drop(&mut self) {
        // `sync` always clears `launches` before it returns, so a non-empty
        // table here means the engine is being dropped with launches still
        // pending a `sync` — a contract violation per the crate-level docs,
        // "Error handling". Caught only in debug builds, per that same
        // contract.
        debug_assert!(
            self.shared.state.lock().unwrap().launches.is_empty(),
            "SleepPoolDagEngine dropped with launches still pending a `sync`; call `sync` before dropping the engine"
        );

        self.shared.terminate.store(true, Ordering::Release);
        self.shared.cv_work.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
