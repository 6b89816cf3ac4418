/// The contract a bulk launch must fulfil so the engine can schedule it.
///
/// `execute` is invoked once for every task index in `[0, total_tasks)` of a
/// bulk; the engine never assumes anything about the order the indices
/// arrive in, nor about which worker thread calls them. Implementations must
/// therefore be safe to call concurrently from any number of workers at once.
///
/// A panic inside `execute` is not part of the contract (see the crate-level
/// docs, "Failure semantics"): the engine does not catch it, and the worker
/// that panicked takes the rest of the pool down with it, same as any other
/// panic on a detached thread.
pub trait Runnable {
    /// Execute one task of the bulk.
    ///
    /// `task_index` is in `[0, total_tasks)`. `total_tasks` is the `N` the
    /// bulk was launched with, handed to every task so it can compute its
    /// share of a larger piece of work without the engine having to track it
    /// separately.
    fn execute(&self, task_index: i32, total_tasks: i32);
}

impl<F> Runnable for F
where
    F: Fn(i32, i32),
{
    fn execute(&self, task_index: i32, total_tasks: i32) {
        self(task_index, total_tasks)
    }
}
