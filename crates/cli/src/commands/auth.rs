//! Account commands.

use bazaar_storefront::auth::{
    AuthState, RESET_PASSWORD_ROUTE, RouteDecision, SIGN_IN_ROUTE, guard_auth_page,
};
use bazaar_storefront::validation::{
    ForgotPasswordForm, ResetPasswordForm, SignInForm, SignUpForm, VerifyCodeForm,
};
use bazaar_storefront::{AppError, Storefront};
use secrecy::SecretString;
use tracing::info;

use crate::AuthAction;

pub async fn run(storefront: &Storefront, action: AuthAction) -> Result<(), AppError> {
    if let Some(path) = page_for(&action) {
        let has_cookie = storefront.session().cookie_token()?.is_some();
        if let RouteDecision::Redirect(to) = guard_auth_page(path, has_cookie) {
            info!("Already signed in (redirecting to {to}); sign out first");
            return Ok(());
        }
    }

    let auth = storefront.auth();
    let redirect = match action {
        AuthAction::SignUp {
            name,
            email,
            password,
            re_password,
            phone,
        } => {
            let re_password = re_password.unwrap_or_else(|| password.clone());
            let form = SignUpForm {
                name,
                email,
                password: SecretString::from(password),
                re_password: SecretString::from(re_password),
                phone,
            };
            let redirect = auth.register(&form).await?;
            info!("Account created, please sign in");
            redirect
        }
        AuthAction::SignIn { email, password } => {
            let form = SignInForm {
                email,
                password: SecretString::from(password),
            };
            let redirect = storefront.sign_in(&form).await?;
            let user = storefront.session().user()?;
            match user {
                Some(user) => info!("Welcome back, {}", user.name),
                None => info!("Signed in"),
            }
            redirect
        }
        AuthAction::SignOut => storefront.sign_out().await?,
        AuthAction::Status => return status(storefront).await,
        AuthAction::ForgotPassword { email } => {
            let redirect = auth.forgot_password(&ForgotPasswordForm { email }).await?;
            info!("Reset code sent, check your email");
            redirect
        }
        AuthAction::VerifyCode { code } => {
            let redirect = auth
                .verify_reset_code(&VerifyCodeForm { reset_code: code })
                .await?;
            info!("Code verified, set a new password with `bazaar auth reset-password`");
            redirect
        }
        AuthAction::ResetPassword {
            email,
            new_password,
        } => {
            let form = ResetPasswordForm {
                email,
                new_password: SecretString::from(new_password),
            };
            let redirect = auth.reset_password(&form).await?;
            if redirect.requires_reload() {
                storefront.mount().await;
                info!("Password reset, you are signed in");
            } else {
                info!("Password reset, please sign in");
            }
            redirect
        }
    };

    tracing::debug!(path = redirect.path(), reload = redirect.requires_reload(), "Redirect");
    Ok(())
}

/// The page a command stands in for, when it is an auth page.
const fn page_for(action: &AuthAction) -> Option<&'static str> {
    match action {
        AuthAction::SignUp { .. } => Some("/sign-up"),
        AuthAction::SignIn { .. } => Some(SIGN_IN_ROUTE),
        AuthAction::ForgotPassword { .. } => Some("/forgot-password"),
        AuthAction::VerifyCode { .. } => Some("/verify-code"),
        AuthAction::ResetPassword { .. } => Some(RESET_PASSWORD_ROUTE),
        AuthAction::SignOut | AuthAction::Status => None,
    }
}

async fn status(storefront: &Storefront) -> Result<(), AppError> {
    match storefront.mount().await {
        AuthState::Authenticated => {
            let session = storefront.session();
            let name = session.user()?.map(|u| u.name);
            let claims = session.token()?.and_then(|token| token.claims().ok());
            info!(
                user = name.as_deref().unwrap_or("unknown"),
                role = claims.as_ref().and_then(|c| c.role.as_deref()).unwrap_or("user"),
                "Signed in"
            );
            if let Some(expires_at) = claims.and_then(|c| c.expires_at) {
                info!("Token expires at {expires_at}");
            }
            info!(
                "Cart: {} item(s), wishlist: {} item(s)",
                storefront.cart().item_count().await,
                storefront.wishlist().count().await
            );
        }
        AuthState::Anonymous | AuthState::Loading => info!("Not signed in"),
    }
    Ok(())
}
