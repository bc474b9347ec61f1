//! Wallet event handlers and the subscription guard that removes them.
//!
//! Injected wallet objects are owned by the browser extension and shared by
//! every consumer on the page, so a listener left behind outlives the
//! connection that installed it. [`EventSubscription`] is the single cleanup
//! handle for a set of listeners.

use std::fmt;
use std::sync::Arc;

/// Callback receiving the new account list.
pub type AccountsChangedHandler = Arc<dyn Fn(Vec<String>) + Send + Sync>;
/// Callback receiving the new numeric chain id.
pub type ChainChangedHandler = Arc<dyn Fn(u64) + Send + Sync>;
/// Callback invoked when the wallet disconnects.
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// The three standard wallet event callbacks.
#[derive(Clone)]
pub struct WalletEventHandlers {
    /// `accountsChanged`.
    pub on_accounts_changed: AccountsChangedHandler,
    /// `chainChanged`.
    pub on_chain_changed: ChainChangedHandler,
    /// `disconnect`.
    pub on_disconnect: DisconnectHandler,
}

impl WalletEventHandlers {
    /// Bundles the three callbacks.
    pub fn new(
        on_accounts_changed: impl Fn(Vec<String>) + Send + Sync + 'static,
        on_chain_changed: impl Fn(u64) + Send + Sync + 'static,
        on_disconnect: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_accounts_changed: Arc::new(on_accounts_changed),
            on_chain_changed: Arc::new(on_chain_changed),
            on_disconnect: Arc::new(on_disconnect),
        }
    }
}

impl fmt::Debug for WalletEventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletEventHandlers").finish_non_exhaustive()
    }
}

/// Removes a set of listeners when unsubscribed or dropped.
///
/// Unsubscribing twice is a no-op.
pub struct EventSubscription {
    cleanup: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl EventSubscription {
    /// Wraps a cleanup closure.
    pub fn new(cleanup: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// Removes the listeners now.
    pub fn unsubscribe(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    /// Returns `true` while the listeners are still installed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unsubscribe_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut sub = EventSubscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sub.is_active());
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        {
            let _sub = EventSubscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
