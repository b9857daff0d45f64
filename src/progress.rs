//! Progress events for map/reduce runs.
//!
//! An optional, non-intrusive way to observe the orchestrator: one event per
//! map call and one for the reduce call. Implement [`ProgressHandler`] for
//! progress bars or logging; the orchestrator works without one.

use std::fmt;
use std::sync::Arc;

/// The phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Per-chunk restructuring calls.
    Map,
    /// The single merge call.
    Reduce,
}

impl Phase {
    /// Stable lowercase identifier (`"map"` / `"reduce"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Map => "map",
            Phase::Reduce => "reduce",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for orchestrator progress.
///
/// `current` is 1-based; `total` is the number of steps in the phase.
///
/// # Example
///
/// ```
/// use transcript_restructure::progress::{Phase, ProgressHandler};
///
/// struct PrintProgress;
///
/// impl ProgressHandler for PrintProgress {
///     fn on_progress(&self, phase: Phase, current: usize, total: usize) {
///         eprintln!("[{phase}] {current}/{total}");
///     }
/// }
/// ```
pub trait ProgressHandler: Send + Sync {
    /// Called before each map call and before the reduce call.
    fn on_progress(&self, phase: Phase, current: usize, total: usize);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(
    handler: &Option<Arc<dyn ProgressHandler>>,
    phase: Phase,
    current: usize,
    total: usize,
) {
    if let Some(handler) = handler {
        handler.on_progress(phase, current, total);
    }
}

/// A [`ProgressHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use transcript_restructure::progress::{FnProgressHandler, Phase};
///
/// let handler = Arc::new(FnProgressHandler(|phase: Phase, current, total| {
///     eprintln!("{phase} {current}/{total}");
/// }));
/// # let _ = handler;
/// ```
pub struct FnProgressHandler<F: Fn(Phase, usize, usize) + Send + Sync>(pub F);

impl<F: Fn(Phase, usize, usize) + Send + Sync> ProgressHandler for FnProgressHandler<F> {
    fn on_progress(&self, phase: Phase, current: usize, total: usize) {
        (self.0)(phase, current, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Map.to_string(), "map");
        assert_eq!(Phase::Reduce.to_string(), "reduce");
    }

    #[test]
    fn test_emit_without_handler_is_noop() {
        emit(&None, Phase::Map, 1, 2);
    }

    #[test]
    fn test_fn_handler_receives_events() {
        let seen: Arc<Mutex<Vec<(Phase, usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn ProgressHandler> =
            Arc::new(FnProgressHandler(move |phase, current, total| {
                sink.lock().unwrap().push((phase, current, total));
            }));

        let handler = Some(handler);
        emit(&handler, Phase::Map, 1, 3);
        emit(&handler, Phase::Reduce, 1, 1);

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(Phase::Map, 1, 3), (Phase::Reduce, 1, 1)]);
    }
}
