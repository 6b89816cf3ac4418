use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use tracing::instrument;

use crate::{Engine, LaunchId, Runnable};

/// Executes every task of every bulk on the caller's own thread.
///
/// The baseline variant: no workers, no concurrency, and therefore no
/// synchronization to get wrong. Dependencies are trivially satisfied,
/// because by the time `run_async_with_deps` returns, everything has already
/// happened.
#[derive(Debug, Default)]
pub struct SerialEngine {
    next_launch_id: AtomicI32,
}

impl SerialEngine {
    /// Creates a new serial engine. There is no worker count to configure.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Engine for SerialEngine {
    #[instrument(level = "debug", skip_all, fields(variant = "serial", num_total_tasks))]
    fn run(&self, runnable: &(dyn Runnable + Sync), num_total_tasks: i32) {
        for task_index in 0..num_total_tasks {
            runnable.execute(task_index, num_total_tasks);
        }
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
        "Serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_tasks_in_index_order_with_the_right_arguments() {
        let engine = SerialEngine::new();
        let output: Vec<AtomicI32> = (0..5).map(|_| AtomicI32::new(0)).collect();

        engine.run(
            &(|t: i32, _n: i32| output[t as usize].store(t * t, Ordering::Relaxed)),
            5,
        );

        let output: Vec<i32> = output.iter().map(|cell| cell.load(Ordering::Relaxed)).collect();
        assert_eq!(output, vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn zero_tasks_never_invokes_execute() {
        let engine = SerialEngine::new();
        let calls = AtomicI32::new(0);
        engine.run(&(|_t: i32, _n: i32| { calls.fetch_add(1, Ordering::Relaxed); }), 0);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn launch_ids_reset_after_sync() {
        let engine = SerialEngine::new();
        let a = engine.run_async_with_deps(Arc::new(|_, _| {}), 1, &[]);
        let b = engine.run_async_with_deps(Arc::new(|_, _| {}), 1, &[]);
        assert_eq!(a.as_i32(), 0);
        assert_eq!(b.as_i32(), 1);
        engine.sync();
        let c = engine.run_async_with_deps(Arc::new(|_, _| {}), 1, &[]);
        assert_eq!(c.as_i32(), 0);
    }
}
