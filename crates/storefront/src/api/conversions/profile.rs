//! Address, user and auth conversion functions.

use bazaar_core::AddressId;
use secrecy::SecretString;
use tracing::warn;

use super::canonical_ids;
use crate::api::types::{Address, AuthTokens, UserProfile};
use crate::api::wire::{RawAddress, RawAuthResponse, RawUser};

pub fn convert_address(raw: RawAddress) -> Option<Address> {
    let Some((id, _)) = canonical_ids(raw.mongo_id, raw.id) else {
        warn!(name = %raw.name, "Dropping address without an id");
        return None;
    };
    Some(Address {
        id: AddressId::new(id),
        name: raw.name,
        details: raw.details,
        phone: raw.phone,
        city: raw.city,
    })
}

pub fn convert_addresses(raw: Vec<RawAddress>) -> Vec<Address> {
    raw.into_iter().filter_map(convert_address).collect()
}

pub fn convert_user(raw: RawUser) -> UserProfile {
    UserProfile {
        name: raw.name,
        email: raw.email,
        phone: raw.phone.filter(|p| !p.is_empty()),
        role: raw.role.filter(|r| !r.is_empty()),
    }
}

/// Extract the token and user from an auth response, if a token was issued.
pub fn convert_auth(raw: RawAuthResponse) -> Option<AuthTokens> {
    let token = raw.token.filter(|t| !t.is_empty())?;
    Some(AuthTokens {
        token: SecretString::from(token),
        user: raw.user.map(convert_user),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::api::wire::RawMe;

    #[test]
    fn test_convert_auth_response() {
        let raw: RawAuthResponse = serde_json::from_value(serde_json::json!({
            "message": "success",
            "user": {"name": "Mona", "email": "mona@example.com", "role": "user"},
            "token": "aaa.bbb.ccc"
        }))
        .unwrap();

        let auth = convert_auth(raw).unwrap();
        assert_eq!(auth.token.expose_secret(), "aaa.bbb.ccc");
        let user = auth.user.unwrap();
        assert_eq!(user.name, "Mona");
        assert_eq!(user.role.as_deref(), Some("user"));
        assert_eq!(user.phone, None);
    }

    #[test]
    fn test_convert_auth_without_token() {
        let raw: RawAuthResponse =
            serde_json::from_value(serde_json::json!({"message": "success"})).unwrap();
        assert!(convert_auth(raw).is_none());
    }

    #[test]
    fn test_me_nested_and_flat() {
        let nested: RawMe = serde_json::from_value(
            serde_json::json!({"user": {"name": "A", "email": "a@b.co"}}),
        )
        .unwrap();
        let flat: RawMe =
            serde_json::from_value(serde_json::json!({"name": "A", "email": "a@b.co"})).unwrap();

        for me in [nested, flat] {
            let user = match me {
                RawMe::Nested { user } | RawMe::Flat(user) => convert_user(user),
            };
            assert_eq!(user.email, "a@b.co");
        }
    }

    #[test]
    fn test_convert_addresses_drops_missing_ids() {
        let raw: Vec<RawAddress> = serde_json::from_value(serde_json::json!([
            {"_id": "a1", "name": "Home", "details": "12 Nile St", "phone": "01012345678", "city": "Cairo"},
            {"name": "Nowhere"}
        ]))
        .unwrap();
        let addresses = convert_addresses(raw);
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses.first().unwrap().id.as_str(), "a1");
    }
}
