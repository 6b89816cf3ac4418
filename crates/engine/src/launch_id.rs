use std::fmt;

/// The identifier returned by [`Engine::run_async_with_deps`](crate::Engine::run_async_with_deps).
///
/// `LaunchId`s are dense and assigned in submission order, starting at `0`
/// within the current epoch (see the crate-level docs for what an epoch is).
/// They are only meaningful as dependency-graph keys between the moment a
/// launch is submitted and the end of the [`sync`](crate::Engine::sync) call
/// that reclaims it; reusing one across epochs is a logic error.
///
/// The source this crate is a rewrite of represents "no working launch" with
/// the sentinel value `-1`. This crate never constructs a `LaunchId` with a
/// negative value and represents the absence of a working launch as
/// `Option<LaunchId>` instead (see [`DESIGN.md`] for the rationale).
///
/// [`DESIGN.md`]: https://docs.rs/bulk-engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaunchId(pub(crate) i32);

impl LaunchId {
    /// Returns the raw, 32-bit signed identifier.
    pub fn as_i32(self) -> i32 {
        self.0
    }

    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LaunchId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
