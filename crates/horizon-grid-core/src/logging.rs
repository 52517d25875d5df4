//! Logging facilities for Horizon Grid.
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_grid::geometry=trace,horizon_grid::factory=debug")
//!         .init();
//! }
//! ```
//!
//! The library itself never installs a subscriber.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "horizon_grid_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Serialized operation queue target.
    pub const TASK_QUEUE: &str = "horizon_grid_core::task_queue";
    /// Column model target.
    pub const COLUMNS: &str = "horizon_grid::columns";
    /// Geometry engine target.
    pub const GEOMETRY: &str = "horizon_grid::geometry";
    /// Widget recycling factory target.
    pub const FACTORY: &str = "horizon_grid::factory";
    /// Data source target.
    pub const DATA_SOURCE: &str = "horizon_grid::data_source";
    /// Tree data source target.
    pub const TREE: &str = "horizon_grid::tree";
    /// Scrolling container target.
    pub const SCROLL: &str = "horizon_grid::scroll";
}

/// A guard that records a span for the duration of an operation.
///
/// Use this to measure expensive passes such as a geometry recomputation:
///
/// ```
/// use horizon_grid_core::logging::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("compute_sizes");
///     // ... expensive operation ...
/// }
/// ```
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span, active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

impl std::fmt::Debug for PerfSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfSpan").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::COLUMNS,
            targets::GEOMETRY,
            targets::FACTORY,
            targets::DATA_SOURCE,
            targets::TREE,
            targets::SCROLL,
        ] {
            assert!(target.starts_with("horizon_grid::"), "{target}");
        }
    }
}
