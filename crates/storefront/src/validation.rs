//! Form input types and their client-side validation rules.
//!
//! Validation is advisory: it runs synchronously before a request is sent so
//! obviously bad input never reaches the network, but the upstream remains
//! the authority and may still reject a form that passes here.

use std::fmt;
use std::sync::LazyLock;

use bazaar_core::Email;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Egyptian mobile numbers, optionally prefixed with `+20` or `0`.
static PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\+20|0)?1[0125]\d{8}$").ok());

const MIN_PASSWORD: usize = 6;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every rule a form failed, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// A single error not tied to a field rule.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first message recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// The first message overall, for toast-style display.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    // Rules shared by the forms below.

    fn min_len(&mut self, field: &'static str, value: &str, min: usize, message: &str) {
        if value.trim().chars().count() < min {
            self.push(field, message);
        }
    }

    fn email(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "Email is required");
        } else if Email::parse(value).is_err() {
            self.push(field, "Invalid email address");
        }
    }

    fn phone(&mut self, field: &'static str, value: &str) {
        if !is_valid_phone(value) {
            self.push(field, "Invalid phone number");
        }
    }

    fn password(&mut self, field: &'static str, value: &SecretString) {
        if value.expose_secret().chars().count() < MIN_PASSWORD {
            self.push(field, "Password must be at least 6 characters");
        }
    }
}

/// Whether `phone` is an acceptable mobile number.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(phone.trim()))
}

// =============================================================================
// Auth Forms
// =============================================================================

/// Account registration.
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub re_password: SecretString,
    pub phone: String,
}

impl SignUpForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.min_len("name", &self.name, 3, "Name must be at least 3 characters");
        errors.email("email", &self.email);
        errors.password("password", &self.password);
        errors.password("re_password", &self.re_password);
        if self.password.expose_secret() != self.re_password.expose_secret() {
            errors.push("re_password", "Passwords do not match");
        }
        errors.min_len("phone", &self.phone, 10, "Phone must be at least 10 digits");
        errors.into_result()
    }
}

/// Credentials for signing in.
#[derive(Debug, Clone)]
pub struct SignInForm {
    pub email: String,
    pub password: SecretString,
}

impl SignInForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.email("email", &self.email);
        errors.password("password", &self.password);
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.email("email", &self.email);
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct VerifyCodeForm {
    pub reset_code: String,
}

impl VerifyCodeForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.min_len("reset_code", &self.reset_code, 6, "Code must be at least 6 characters");
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct ResetPasswordForm {
    pub email: String,
    pub new_password: SecretString,
}

impl ResetPasswordForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.email("email", &self.email);
        errors.password("new_password", &self.new_password);
        errors.into_result()
    }
}

// =============================================================================
// Profile Forms
// =============================================================================

/// A delivery address to save.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressForm {
    pub name: String,
    pub details: String,
    pub phone: String,
    pub city: String,
}

impl AddressForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.min_len("name", &self.name, 2, "Name must be at least 2 characters");
        errors.min_len("details", &self.details, 5, "Address details must be at least 5 characters");
        errors.phone("phone", &self.phone);
        errors.min_len("city", &self.city, 2, "City must be at least 2 characters");
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct ChangePasswordForm {
    pub current_password: SecretString,
    pub password: SecretString,
    pub re_password: SecretString,
}

impl ChangePasswordForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.password("current_password", &self.current_password);
        errors.password("password", &self.password);
        errors.password("re_password", &self.re_password);
        if self.password.expose_secret() != self.re_password.expose_secret() {
            errors.push("re_password", "Passwords do not match");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateProfileForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl UpdateProfileForm {
    /// # Errors
    ///
    /// Returns every failed rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.min_len("name", &self.name, 2, "Name must be at least 2 characters");
        errors.email("email", &self.email);
        errors.phone("phone", &self.phone);
        errors.into_result()
    }
}
