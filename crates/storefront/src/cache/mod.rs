//! Client-side caches of server-owned resources.
//!
//! The upstream API owns every cart, wishlist and address book; these caches
//! only mirror its last answer. Each mutation is one network call followed by
//! a resource-specific refresh:
//!
//! | Cache | Mutation | Refresh |
//! |---|---|---|
//! | cart | add / update / remove | replace with the response |
//! | cart | clear | empty locally |
//! | wishlist | add | refetch |
//! | wishlist | remove | filter locally |
//! | addresses | add | append the response |
//! | addresses | update | replace by id |
//! | addresses | delete | filter locally |
//!
//! Operations on one cache are serialized, so responses are applied in the
//! order requests were issued and the cache after each completed operation
//! reflects the last server answer.

pub mod addresses;
pub mod cart;
pub mod wishlist;

pub use addresses::{AddressBackend, AddressBook};
pub use cart::{CartBackend, CartCache};
pub use wishlist::{WishlistBackend, WishlistCache};

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::warn;

/// A point-in-time copy of a cache.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot<T> {
    pub value: T,
    /// An operation is in flight.
    pub loading: bool,
    /// Message from the last failed operation, cleared when the next one starts.
    pub error: Option<String>,
}

/// Cached value plus the lock that serializes operations on it.
#[derive(Debug, Default)]
pub(crate) struct CacheCell<T> {
    state: RwLock<Snapshot<T>>,
    ops: Mutex<()>,
}

impl<T: Clone + Default> CacheCell<T> {
    /// Hold for the whole of an operation, network call included.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().await
    }

    pub(crate) async fn snapshot(&self) -> Snapshot<T> {
        self.state.read().await.clone()
    }

    pub(crate) async fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.read().await.value)
    }

    /// Mark an operation as started.
    pub(crate) async fn begin(&self) {
        let mut state = self.state.write().await;
        state.loading = true;
        state.error = None;
    }

    /// Apply a successful result.
    pub(crate) async fn finish(&self, apply: impl FnOnce(&mut T)) {
        let mut state = self.state.write().await;
        state.loading = false;
        apply(&mut state.value);
    }

    /// Record a failure, optionally adjusting the cached value.
    pub(crate) async fn fail(
        &self,
        message: &'static str,
        err: &dyn std::fmt::Display,
        apply: impl FnOnce(&mut T),
    ) {
        warn!(error = %err, "{message}");
        let mut state = self.state.write().await;
        state.loading = false;
        state.error = Some(message.to_string());
        apply(&mut state.value);
    }

    /// Drop everything, as on sign-out.
    pub(crate) async fn reset(&self) {
        *self.state.write().await = Snapshot::default();
    }
}
