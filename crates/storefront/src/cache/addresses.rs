//! Saved shipping addresses.

use std::future::Future;
use std::sync::Arc;

use bazaar_core::AddressId;
use tracing::instrument;

use super::{CacheCell, Snapshot};
use crate::api::types::Address;
use crate::api::{ApiClient, ApiError};
use crate::auth::AuthGate;
use crate::error::Result;
use crate::validation::AddressForm;

const LOAD_FAILED: &str = "Failed to load addresses";
const ADD_FAILED: &str = "Failed to add address";
const UPDATE_FAILED: &str = "Failed to update address";
const DELETE_FAILED: &str = "Failed to delete address";

/// Address operations the book needs from the upstream.
pub trait AddressBackend: Send + Sync + 'static {
    fn list_addresses(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<Address>, ApiError>> + Send;

    fn add_address(
        &self,
        form: &AddressForm,
    ) -> impl Future<Output = std::result::Result<Address, ApiError>> + Send;

    fn update_address(
        &self,
        id: &AddressId,
        form: &AddressForm,
    ) -> impl Future<Output = std::result::Result<Address, ApiError>> + Send;

    fn delete_address(
        &self,
        id: &AddressId,
    ) -> impl Future<Output = std::result::Result<(), ApiError>> + Send;
}

impl AddressBackend for ApiClient {
    fn list_addresses(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<Address>, ApiError>> + Send {
        Self::list_addresses(self)
    }

    fn add_address(
        &self,
        form: &AddressForm,
    ) -> impl Future<Output = std::result::Result<Address, ApiError>> + Send {
        Self::add_address(self, form)
    }

    fn update_address(
        &self,
        id: &AddressId,
        form: &AddressForm,
    ) -> impl Future<Output = std::result::Result<Address, ApiError>> + Send {
        Self::update_address(self, id, form)
    }

    fn delete_address(
        &self,
        id: &AddressId,
    ) -> impl Future<Output = std::result::Result<(), ApiError>> + Send {
        Self::delete_address(self, id)
    }
}

/// The signed-in user's address book.
pub struct AddressBook<B> {
    inner: Arc<AddressBookInner<B>>,
}

struct AddressBookInner<B> {
    backend: B,
    gate: AuthGate,
    cell: CacheCell<Vec<Address>>,
}

impl<B> Clone for AddressBook<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AddressBackend> AddressBook<B> {
    #[must_use]
    pub fn new(backend: B, gate: AuthGate) -> Self {
        Self {
            inner: Arc::new(AddressBookInner {
                backend,
                gate,
                cell: CacheCell::default(),
            }),
        }
    }

    pub async fn snapshot(&self) -> Snapshot<Vec<Address>> {
        self.inner.cell.snapshot().await
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.inner.cell.read(Clone::clone).await
    }

    pub async fn get(&self, id: &AddressId) -> Option<Address> {
        self.inner
            .cell
            .read(|list| list.iter().find(|a| &a.id == id).cloned())
            .await
    }

    /// Load the address book. Signed-out users get an empty list and no
    /// request is made.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached list is kept.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        let cell = &self.inner.cell;
        if !self.inner.gate.is_authenticated() {
            cell.begin().await;
            cell.finish(Vec::clear).await;
            return Ok(());
        }

        cell.begin().await;
        match self.inner.backend.list_addresses().await {
            Ok(fresh) => {
                cell.finish(|list| *list = fresh).await;
                Ok(())
            }
            Err(err) => {
                cell.fail(LOAD_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Validate and save a new address, appending the server's copy.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip(self, form))]
    pub async fn add(&self, form: &AddressForm) -> Result<Address> {
        form.validate()?;
        let _op = self.inner.cell.lock().await;
        let cell = &self.inner.cell;
        cell.begin().await;
        match self.inner.backend.add_address(form).await {
            Ok(address) => {
                let returned = address.clone();
                cell.finish(|list| list.push(address)).await;
                Ok(returned)
            }
            Err(err) => {
                cell.fail(ADD_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Validate and replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request, or the upstream error.
    #[instrument(skip(self, form), fields(address = %id))]
    pub async fn update(&self, id: &AddressId, form: &AddressForm) -> Result<Address> {
        form.validate()?;
        let _op = self.inner.cell.lock().await;
        let cell = &self.inner.cell;
        cell.begin().await;
        match self.inner.backend.update_address(id, form).await {
            Ok(address) => {
                let returned = address.clone();
                cell.finish(|list| {
                    if let Some(slot) = list.iter_mut().find(|a| &a.id == id) {
                        *slot = address;
                    }
                })
                .await;
                Ok(returned)
            }
            Err(err) => {
                cell.fail(UPDATE_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    /// Delete a saved address and drop it locally.
    ///
    /// # Errors
    ///
    /// Returns the upstream error; the cached list is left unchanged.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn delete(&self, id: &AddressId) -> Result<()> {
        let _op = self.inner.cell.lock().await;
        let cell = &self.inner.cell;
        cell.begin().await;
        match self.inner.backend.delete_address(id).await {
            Ok(()) => {
                cell.finish(|list| list.retain(|a| &a.id != id)).await;
                Ok(())
            }
            Err(err) => {
                cell.fail(DELETE_FAILED, &err, |_| {}).await;
                Err(err.into())
            }
        }
    }

    pub async fn reset(&self) {
        let _op = self.inner.cell.lock().await;
        self.inner.cell.reset().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::cart::tests::signed_in_gate;
    use crate::error::AppError;

    fn address(id: &str, city: &str) -> Address {
        Address {
            id: AddressId::new(id),
            name: "Home".to_string(),
            details: "12 Nile Street".to_string(),
            phone: "01012345678".to_string(),
            city: city.to_string(),
        }
    }

    fn form(city: &str) -> AddressForm {
        AddressForm {
            name: "Home".to_string(),
            details: "12 Nile Street".to_string(),
            phone: "01012345678".to_string(),
            city: city.to_string(),
        }
    }

    /// In-memory upstream that assigns sequential ids.
    #[derive(Default)]
    struct FakeAddresses {
        saved: Mutex<Vec<Address>>,
        calls: AtomicUsize,
    }

    impl AddressBackend for FakeAddresses {
        async fn list_addresses(&self) -> std::result::Result<Vec<Address>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn add_address(&self, form: &AddressForm) -> std::result::Result<Address, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let created = address(&format!("addr-{n}"), &form.city);
            self.saved.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update_address(
            &self,
            id: &AddressId,
            form: &AddressForm,
        ) -> std::result::Result<Address, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let updated = address(id.as_str(), &form.city);
            let mut saved = self.saved.lock().unwrap();
            let slot = saved
                .iter_mut()
                .find(|a| &a.id == id)
                .ok_or_else(|| ApiError::NotFound("No address".to_string()))?;
            *slot = updated.clone();
            Ok(updated)
        }

        async fn delete_address(&self, id: &AddressId) -> std::result::Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.saved.lock().unwrap().retain(|a| &a.id != id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let book = AddressBook::new(FakeAddresses::default(), signed_in_gate());
        book.fetch().await.unwrap();

        let cairo = book.add(&form("Cairo")).await.unwrap();
        let giza = book.add(&form("Giza")).await.unwrap();
        assert_eq!(book.addresses().await.len(), 2);

        book.update(&cairo.id, &form("Alexandria")).await.unwrap();
        assert_eq!(book.get(&cairo.id).await.unwrap().city, "Alexandria");

        book.delete(&giza.id).await.unwrap();
        let cities: Vec<String> = book.addresses().await.into_iter().map(|a| a.city).collect();
        assert_eq!(cities, vec!["Alexandria".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let book = AddressBook::new(FakeAddresses::default(), signed_in_gate());
        let mut bad = form("Cairo");
        bad.phone = "12345".to_string();

        let err = book.add(&bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(book.inner.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_list() {
        let book = AddressBook::new(FakeAddresses::default(), signed_in_gate());
        book.add(&form("Cairo")).await.unwrap();

        let missing = AddressId::new("nope");
        assert!(book.update(&missing, &form("Giza")).await.is_err());

        let snapshot = book.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some(UPDATE_FAILED));
        assert_eq!(snapshot.value.len(), 1);
        assert_eq!(snapshot.value.first().unwrap().city, "Cairo");
    }

    #[tokio::test]
    async fn test_fetch_replaces_list() {
        let backend = FakeAddresses::default();
        backend.saved.lock().unwrap().push(address("a1", "Cairo"));
        let book = AddressBook::new(backend, signed_in_gate());

        book.fetch().await.unwrap();
        assert_eq!(book.addresses().await, vec![address("a1", "Cairo")]);

        book.reset().await;
        assert!(book.addresses().await.is_empty());
    }
}
