use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use ethers_core::types::Address;

use crate::{
    chains::{parse_chain_id, resolve_destination, Chain},
    wallet::{WalletError, WalletProvider},
};

/// Callback invoked with the raw chain id of a `chainChanged` event
pub type ChainListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle of a registered [`ChainListener`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of `chainChanged` listeners, for wallet implementations
#[derive(Default)]
pub struct ChainListeners {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, ChainListener>>,
}

impl std::fmt::Debug for ChainListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainListeners")
            .field("registered", &self.len())
            .finish()
    }
}

impl ChainListeners {
    /// Register a listener
    pub fn add(&self, listener: ChainListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, listener);
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a `chainChanged` event to every listener
    pub fn emit(&self, raw_chain_id: &str) {
        // callbacks run outside the lock so they may (un)register listeners
        let listeners: Vec<ChainListener> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener(raw_chain_id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ListenerId, ChainListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const UNKNOWN_CHAIN: u64 = 0;

/// The wallet's current network, kept up to date from `chainChanged` events
/// for as long as the watch lives. Dropping the watch removes its listener.
pub struct ChainWatch<'a, W: WalletProvider + ?Sized> {
    wallet: &'a W,
    current: Arc<AtomicU64>,
    listener: ListenerId,
}

impl<'a, W: WalletProvider + ?Sized> std::fmt::Debug for ChainWatch<'a, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainWatch")
            .field("current", &self.current())
            .field("listener", &self.listener)
            .finish()
    }
}

impl<'a, W: WalletProvider + ?Sized> ChainWatch<'a, W> {
    /// Subscribe to network changes, then read the initial chain id from the
    /// wallet. An event that arrives while the initial read is in flight wins
    /// over the value read.
    pub async fn attach(wallet: &'a W) -> Result<ChainWatch<'a, W>, WalletError> {
        let current = Arc::new(AtomicU64::new(UNKNOWN_CHAIN));

        let slot = current.clone();
        let listener = wallet.on_chain_changed(Arc::new(move |raw: &str| {
            match parse_chain_id(raw) {
                Some(chain_id) => {
                    slot.store(chain_id, Ordering::SeqCst);
                    tracing::info!(chain_id, "Network changed");
                }
                None => tracing::warn!(raw, "Ignoring unparseable chain id"),
            }
        }));

        // constructed before the await so the listener is released on error
        let watch = ChainWatch {
            wallet,
            current,
            listener,
        };

        let chain_id = wallet.chain_id().await?;
        let _ = watch.current.compare_exchange(
            UNKNOWN_CHAIN,
            chain_id,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        tracing::debug!(chain_id = ?watch.current(), "Watching network");
        Ok(watch)
    }

    /// The last observed chain id
    pub fn current(&self) -> Option<u64> {
        match self.current.load(Ordering::SeqCst) {
            UNKNOWN_CHAIN => None,
            chain_id => Some(chain_id),
        }
    }

    /// The last observed chain, if supported
    pub fn chain(&self) -> Option<Chain> {
        self.current().and_then(Chain::from_id)
    }

    /// The relay destination on the last observed chain
    pub fn destination(&self) -> Option<Address> {
        self.current().and_then(resolve_destination)
    }
}

impl<'a, W: WalletProvider + ?Sized> Drop for ChainWatch<'a, W> {
    fn drop(&mut self) {
        self.wallet.remove_listener(self.listener);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_register_emit_and_remove() {
        let listeners = ChainListeners::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let id = listeners.add(Arc::new(move |_: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(listeners.len(), 1);

        listeners.emit("0x1");
        listeners.emit("0x2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.emit("0x3");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(listeners.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let listeners = ChainListeners::default();
        let a = listeners.add(Arc::new(|_: &str| {}));
        let b = listeners.add(Arc::new(|_: &str| {}));
        assert_ne!(a, b);
    }
}
