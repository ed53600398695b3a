//! Cooperative cancellation shared between the cache and its callers.

use crate::{DemError, Result, TileKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag.
///
/// Cancelling is one-way; every clone observes it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled(key))` once cancelled.
    pub fn check(&self, key: TileKey) -> Result<()> {
        if self.is_cancelled() {
            Err(DemError::Cancelled(key))
        } else {
            Ok(())
        }
    }
}
