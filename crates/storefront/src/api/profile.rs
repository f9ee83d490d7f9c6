//! Address book and user profile endpoints.

use bazaar_core::AddressId;
use secrecy::ExposeSecret;
use tracing::instrument;

use super::conversions::{convert_address, convert_addresses, convert_auth, convert_user};
use super::types::{Address, AuthTokens, UserProfile};
use super::wire::{
    AddressBody, ChangePasswordBody, DataEnvelope, MaybeEnveloped, OneOrMany, ProfileBody,
    RawAddress, RawAuthResponse, RawMe,
};
use super::{ApiClient, ApiError, segment};
use crate::validation::{AddressForm, ChangePasswordForm, UpdateProfileForm};

/// Address mutations answer with either the touched address or the whole
/// list. Pick the touched one: the entry with `id` if given, else the last.
fn pick_address(
    raw: OneOrMany<RawAddress>,
    id: Option<&AddressId>,
) -> Result<Address, ApiError> {
    let address = match raw {
        OneOrMany::One(raw) => convert_address(raw),
        OneOrMany::Many(list) => {
            let mut addresses = convert_addresses(list);
            match id {
                Some(id) => addresses
                    .iter()
                    .position(|a| &a.id == id)
                    .map(|index| addresses.swap_remove(index)),
                None => addresses.pop(),
            }
        }
    };
    address.ok_or(ApiError::MissingData("address"))
}

impl AddressForm {
    fn body(&self) -> AddressBody<'_> {
        AddressBody {
            name: &self.name,
            details: &self.details,
            phone: &self.phone,
            city: &self.city,
        }
    }
}

impl ApiClient {
    // =========================================================================
    // Addresses
    // =========================================================================

    /// List saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self) -> Result<Vec<Address>, ApiError> {
        let raw: MaybeEnveloped<RawAddress> = self.execute(self.get("/addresses")?).await?;
        Ok(convert_addresses(raw.into_items()))
    }

    /// Get one saved address.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the address does not exist.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn get_address(&self, id: &AddressId) -> Result<Address, ApiError> {
        let path = format!("/addresses/{}", segment(id.as_str()));
        let raw: DataEnvelope<RawAddress> = self.execute(self.get(&path)?).await?;
        convert_address(raw.data).ok_or(ApiError::MissingData("address id"))
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the address.
    #[instrument(skip(self, form))]
    pub async fn add_address(&self, form: &AddressForm) -> Result<Address, ApiError> {
        let raw: DataEnvelope<OneOrMany<RawAddress>> = self
            .execute(self.post("/addresses")?.json(&form.body()))
            .await?;
        pick_address(raw.data, None)
    }

    /// Replace a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the address.
    #[instrument(skip(self, form), fields(address = %id))]
    pub async fn update_address(
        &self,
        id: &AddressId,
        form: &AddressForm,
    ) -> Result<Address, ApiError> {
        let path = format!("/addresses/{}", segment(id.as_str()));
        let raw: DataEnvelope<OneOrMany<RawAddress>> =
            self.execute(self.put(&path)?.json(&form.body())).await?;
        pick_address(raw.data, Some(id))
    }

    /// Delete a saved address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(address = %id))]
    pub async fn delete_address(&self, id: &AddressId) -> Result<(), ApiError> {
        let path = format!("/addresses/{}", segment(id.as_str()));
        self.execute_unit(self.delete(&path)?).await
    }

    // =========================================================================
    // User
    // =========================================================================

    /// Get the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let raw: DataEnvelope<RawMe> = self.execute(self.get("/users/me")?).await?;
        let (RawMe::Nested { user } | RawMe::Flat(user)) = raw.data;
        Ok(convert_user(user))
    }

    /// Update name, email and phone.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the update.
    #[instrument(skip(self, form))]
    pub async fn update_profile(&self, form: &UpdateProfileForm) -> Result<(), ApiError> {
        let body = ProfileBody {
            name: &form.name,
            email: &form.email,
            phone: &form.phone,
        };
        self.execute_unit(self.put("/users/updateMe")?.json(&body))
            .await
    }

    /// Change the password. Returns the replacement session when the upstream
    /// rotates the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the current password is wrong.
    #[instrument(skip(self, form))]
    pub async fn change_password(
        &self,
        form: &ChangePasswordForm,
    ) -> Result<Option<AuthTokens>, ApiError> {
        let body = ChangePasswordBody {
            current_password: form.current_password.expose_secret(),
            password: form.password.expose_secret(),
            re_password: form.re_password.expose_secret(),
        };
        let raw: RawAuthResponse = self
            .execute(self.put("/users/changeMyPassword")?.json(&body))
            .await?;
        Ok(convert_auth(raw))
    }
}
