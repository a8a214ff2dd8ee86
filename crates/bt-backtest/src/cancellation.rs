use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A run is cancellable at day boundaries (spec §5): the driver polls this
/// between advancing the clock and evaluating stop-losses for the day.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
