//! Authentication endpoints.

use secrecy::ExposeSecret;
use tracing::instrument;

use super::conversions::convert_auth;
use super::types::AuthTokens;
use super::wire::{
    EmailBody, RawAuthResponse, ResetCodeBody, ResetPasswordBody, SignInBody, SignUpBody,
};
use super::{ApiClient, ApiError};
use crate::validation::{
    ForgotPasswordForm, ResetPasswordForm, SignInForm, SignUpForm, VerifyCodeForm,
};

impl ApiClient {
    /// Register a new account. Registration does not sign the user in.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the registration.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &SignUpForm) -> Result<(), ApiError> {
        let body = SignUpBody {
            name: &form.name,
            email: &form.email,
            password: form.password.expose_secret(),
            re_password: form.re_password.expose_secret(),
            phone: &form.phone,
        };
        self.execute_unit(self.post("/auth/register")?.json(&body))
            .await
    }

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or no token is issued.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn sign_in(&self, form: &SignInForm) -> Result<AuthTokens, ApiError> {
        let body = SignInBody {
            email: &form.email,
            password: form.password.expose_secret(),
        };
        let raw: RawAuthResponse = self.execute(self.post("/auth/signin")?.json(&body)).await?;
        convert_auth(raw).ok_or(ApiError::MissingData("token"))
    }

    /// Ask the upstream to email a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the request.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<(), ApiError> {
        let body = EmailBody { email: &form.email };
        self.execute_unit(self.post("/auth/forgotPasswords")?.json(&body))
            .await
    }

    /// Check an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is wrong or expired.
    #[instrument(skip(self, form))]
    pub async fn verify_reset_code(&self, form: &VerifyCodeForm) -> Result<(), ApiError> {
        let body = ResetCodeBody {
            reset_code: &form.reset_code,
        };
        self.execute_unit(self.post("/auth/verifyResetCode")?.json(&body))
            .await
    }

    /// Set a new password after a verified reset code.
    ///
    /// Returns the fresh session when the upstream issues one.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream rejects the reset.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn reset_password(
        &self,
        form: &ResetPasswordForm,
    ) -> Result<Option<AuthTokens>, ApiError> {
        let body = ResetPasswordBody {
            email: &form.email,
            new_password: form.new_password.expose_secret(),
        };
        let raw: RawAuthResponse = self
            .execute(self.put("/auth/resetPassword")?.json(&body))
            .await?;
        Ok(convert_auth(raw))
    }
}

