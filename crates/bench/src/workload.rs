//! Canned workloads used to exercise the scheduler variants from the
//! command line.
//!
//! Each workload is deliberately small and deterministic: the point of this
//! binary is to show the shape of each variant's scheduling behavior, not to
//! be a rigorous benchmark harness.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use bulk_engine::{Engine, LaunchId};

/// The workloads `bulk-engine-bench` knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Workload {
    /// Sums `0..N` by having every task add its index into a shared
    /// accumulator. Exercises a single synchronous [`Engine::run`] call.
    SerialSum,
    /// Every task increments a shared counter once. Exercises contention on
    /// the task-claim path with a trivial per-task body.
    ParallelCounter,
    /// Five single-task launches, each depending on the previous one.
    /// Exercises [`Engine::run_async_with_deps`] on a variant that supports
    /// it; on variants that don't, dependencies are ignored and the chain
    /// still produces the correct sum because each stage is still run.
    LinearChain,
    /// A diamond: one launch, two launches that depend only on it, and a
    /// final launch depending on both. Exercises fan-out/fan-in ordering.
    Diamond,
}

impl Workload {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "serial-sum" => Some(Self::SerialSum),
            "parallel-counter" => Some(Self::ParallelCounter),
            "linear-chain" => Some(Self::LinearChain),
            "diamond" => Some(Self::Diamond),
            _ => None,
        }
    }

    /// Runs the workload against `engine` and returns its final result for
    /// display.
    pub(crate) fn run(self, engine: &dyn Engine) -> i64 {
        match self {
            Self::SerialSum => run_serial_sum(engine),
            Self::ParallelCounter => run_parallel_counter(engine),
            Self::LinearChain => run_linear_chain(engine),
            Self::Diamond => run_diamond(engine),
        }
    }
}

const TASK_COUNT: i32 = 10_000;

fn run_serial_sum(engine: &dyn Engine) -> i64 {
    let accumulator = AtomicI64::new(0);
    engine.run(
        &(|task_index: i32, _total_tasks: i32| {
            accumulator.fetch_add(i64::from(task_index), Ordering::Relaxed);
        }),
        TASK_COUNT,
    );
    accumulator.load(Ordering::Relaxed)
}

fn run_parallel_counter(engine: &dyn Engine) -> i64 {
    let counter = AtomicI64::new(0);
    engine.run(
        &(|_task_index: i32, _total_tasks: i32| {
            counter.fetch_add(1, Ordering::Relaxed);
        }),
        TASK_COUNT,
    );
    counter.load(Ordering::Relaxed)
}

fn run_linear_chain(engine: &dyn Engine) -> i64 {
    let total = Arc::new(AtomicI64::new(0));
    let mut previous: Option<LaunchId> = None;

    for stage in 0..5i64 {
        let total = Arc::clone(&total);
        let deps: Vec<LaunchId> = previous.into_iter().collect();
        previous = Some(engine.run_async_with_deps(
            Arc::new(move |_task_index: i32, _total_tasks: i32| {
                total.fetch_add(stage, Ordering::Relaxed);
            }),
            1,
            &deps,
        ));
    }
    engine.sync();

    total.load(Ordering::Relaxed)
}

fn run_diamond(engine: &dyn Engine) -> i64 {
    let total = Arc::new(AtomicI64::new(0));

    let add = |amount: i64, total: Arc<AtomicI64>| {
        move |_task_index: i32, _total_tasks: i32| {
            total.fetch_add(amount, Ordering::Relaxed);
        }
    };

    let top = engine.run_async_with_deps(Arc::new(add(1, Arc::clone(&total))), 1, &[]);
    let left = engine.run_async_with_deps(Arc::new(add(10, Arc::clone(&total))), 1, &[top]);
    let right = engine.run_async_with_deps(Arc::new(add(100, Arc::clone(&total))), 1, &[top]);
    engine.run_async_with_deps(Arc::new(add(1000, Arc::clone(&total))), 1, &[left, right]);
    engine.sync();

    total.load(Ordering::Relaxed)
}
