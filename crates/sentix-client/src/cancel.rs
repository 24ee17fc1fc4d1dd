use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the one request a controller has in flight.
///
/// `begin` cancels whatever was running before, so the latest request wins. Dropping the
/// slot cancels the current token.
#[derive(Debug, Default)]
pub struct InFlightSlot {
    current: Mutex<Option<CancellationToken>>,
}

impl InFlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(prev) = self.lock().replace(token.clone()) {
            prev.cancel();
        }
        token
    }

    pub fn cancel(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_cancels_previous() {
        let slot = InFlightSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        slot.cancel();
        assert!(second.is_cancelled());
        let third = slot.begin();
        assert!(!third.is_cancelled());
    }

    #[test]
    fn drop_cancels_current() {
        let slot = InFlightSlot::new();
        let token = slot.begin();
        drop(slot);
        assert!(token.is_cancelled());
    }
}
