//! Profile and address book commands.

use bazaar_core::AddressId;
use bazaar_storefront::api::types::Address;
use bazaar_storefront::validation::{AddressForm, ChangePasswordForm, UpdateProfileForm};
use bazaar_storefront::{AppError, Storefront};
use secrecy::SecretString;
use tracing::info;

use super::protected;
use crate::{AddressArgs, AddressesAction, ProfileAction};

pub async fn run(storefront: &Storefront, action: ProfileAction) -> Result<(), AppError> {
    protected(storefront)?;

    match action {
        ProfileAction::Show => {
            let profile = storefront.profile().await?;
            info!("{} <{}>", profile.name, profile.email);
            if let Some(phone) = &profile.phone {
                info!("Phone: {phone}");
            }
        }
        ProfileAction::Update { name, email, phone } => {
            let form = UpdateProfileForm { name, email, phone };
            let profile = storefront.update_profile(&form).await?;
            info!("Profile updated for {}", profile.name);
        }
        ProfileAction::ChangePassword {
            current_password,
            password,
            re_password,
        } => {
            let re_password = re_password.unwrap_or_else(|| password.clone());
            let form = ChangePasswordForm {
                current_password: SecretString::from(current_password),
                password: SecretString::from(password),
                re_password: SecretString::from(re_password),
            };
            storefront.auth().change_password(&form).await?;
            info!("Password changed");
        }
    }
    Ok(())
}

pub async fn addresses(storefront: &Storefront, action: AddressesAction) -> Result<(), AppError> {
    protected(storefront)?;
    let book = storefront.addresses();
    book.fetch().await?;

    match action {
        AddressesAction::List => {
            let saved = book.addresses().await;
            if saved.is_empty() {
                info!("No saved addresses");
            }
            saved.iter().for_each(log_address);
        }
        AddressesAction::Add(args) => {
            let address = book.add(&form(args)).await?;
            info!("Address added");
            log_address(&address);
        }
        AddressesAction::Update { id, address } => {
            let id = AddressId::new(id);
            if book.get(&id).await.is_none() {
                return Err(AppError::NotFound(format!("Address {id}")));
            }
            let address = book.update(&id, &form(address)).await?;
            info!("Address updated");
            log_address(&address);
        }
        AddressesAction::Delete { id } => {
            book.delete(&AddressId::new(id)).await?;
            info!("Address deleted");
        }
    }
    Ok(())
}

fn form(args: AddressArgs) -> AddressForm {
    AddressForm {
        name: args.name,
        details: args.details,
        phone: args.phone,
        city: args.city,
    }
}

fn log_address(address: &Address) {
    info!(
        "{}  {}: {}, {} ({})",
        address.id, address.name, address.details, address.city, address.phone
    );
}
