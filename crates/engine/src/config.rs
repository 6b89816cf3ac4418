use std::sync::Arc;

use crate::{AlwaysSpawnEngine, Engine, SerialEngine, SleepPoolDagEngine, SleepPoolEngine, SpinPoolEngine};

/// Selects which [`Engine`] implementation [`new_engine`] constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineVariant {
    /// [`SerialEngine`], the caller-thread baseline.
    Serial,
    /// [`AlwaysSpawnEngine`], one fresh batch of threads per bulk.
    AlwaysSpawn,
    /// [`SpinPoolEngine`], a persistent busy-waiting pool.
    SpinPool,
    /// [`SleepPoolEngine`], a persistent pool blocking on a condvar.
    SleepPool,
    /// [`SleepPoolDagEngine`], the sleep pool with dependency-ordered
    /// dispatch.
    SleepPoolDag,
}

impl EngineVariant {
    /// The CLI-facing spelling of this variant, e.g. `"spin-pool"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::AlwaysSpawn => "always-spawn",
            Self::SpinPool => "spin-pool",
            Self::SleepPool => "sleep-pool",
            Self::SleepPoolDag => "sleep-pool-dag",
        }
    }

    /// All variants, in the order they are documented in.
    pub fn all() -> &'static [Self] {
        &[Self::Serial, Self::AlwaysSpawn, Self::SpinPool, Self::SleepPool, Self::SleepPoolDag]
    }
}

/// Configuration accepted by [`new_engine`].
///
/// `workers` is ignored by [`EngineVariant::Serial`], which has no worker
/// count to configure.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    variant: EngineVariant,
    workers: usize,
}

impl EngineConfig {
    /// Starts a configuration for `variant`, defaulting `workers` to
    /// [`std::thread::available_parallelism`] (or `1` if it cannot be
    /// determined).
    pub fn new(variant: EngineVariant) -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { variant, workers }
    }

    /// Overrides the worker count. Has no effect for [`EngineVariant::Serial`].
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builds the configured [`Engine`].
    pub fn build(self) -> Arc<dyn Engine> {
        new_engine(self.variant, self.workers)
    }
}

/// Constructs the engine for `variant` with `workers` worker threads.
///
/// `workers` is ignored for [`EngineVariant::Serial`]. For every other
/// variant it must be at least `1`, checked with `debug_assert!` inside the
/// respective constructor.
pub fn new_engine(variant: EngineVariant, workers: usize) -> Arc<dyn Engine> {
    match variant {
        EngineVariant::Serial => Arc::new(SerialEngine::new()),
        EngineVariant::AlwaysSpawn => Arc::new(AlwaysSpawnEngine::new(workers)),
        EngineVariant::SpinPool => Arc::new(SpinPoolEngine::new(workers)),
        EngineVariant::SleepPool => Arc::new(SleepPoolEngine::new(workers)),
        EngineVariant::SleepPoolDag => Arc::new(SleepPoolDagEngine::new(workers)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_cli_spelling() {
        for &variant in EngineVariant::all() {
            let spelled = variant.as_str();
            assert!(!spelled.is_empty());
        }
    }

    #[test]
    fn config_builds_a_working_engine_for_every_variant() {
        for &variant in EngineVariant::all() {
            let engine = EngineConfig::new(variant).workers(2).build();
            let output = std::sync::atomic::AtomicI32::new(0);
            engine.run(&(|_t: i32, _n: i32| { output.fetch_add(1, std::sync::atomic::Ordering::Relaxed); }), 4);
            assert_eq!(output.load(std::sync::atomic::Ordering::Relaxed), 4);
        }
    }

    #[test]
    #[should_panic(expected = "needs at least one worker")]
    fn zero_workers_trips_the_constructor_debug_assertion() {
        // `Serial` ignores `workers` entirely, so the variant under test has
        // to be one of the persistent/spawning pools; `SpinPool` is as good
        // as any of them.
        EngineConfig::new(EngineVariant::SpinPool).workers(0).build();
    }
}
