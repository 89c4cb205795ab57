//! Authentication pages.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{info, warn};

use super::AppState;
use crate::auth::totp;
use crate::db::{NewUser, RefreshTokenRepository, UserRepository};
use crate::template::TemplateContext;
use crate::web::error::WebError;
use crate::web::flash::redirect_with_flash;
use crate::web::forms::{first_error, LoginForm, RegisterForm};
use crate::web::middleware::{AuthUser, OptionalAuthUser, REFRESH_COOKIE};

const LOGIN_FAILED: &str = "Incorrect email or password";

/// GET /register - Registration form.
pub async fn register_page(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    if claims.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    state.render(jar, "register", "Register", None, TemplateContext::new())
}

/// POST /register - Create an account.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    match create_account(&state, &form).await {
        Ok(()) => Redirect::to("/login").into_response(),
        Err(message) => redirect_with_flash(jar, "/register", &message).into_response(),
    }
}

/// Register a user; the error is the message to show.
async fn create_account(state: &AppState, form: &RegisterForm) -> Result<(), String> {
    if let Some(message) = first_error(form, RegisterForm::FIELDS) {
        return Err(message);
    }
    let email = form.email.as_str();

    let repo = UserRepository::new(state.db.pool());
    match repo.email_exists(email).await {
        Ok(true) => return Err("User is already registered".to_string()),
        Ok(false) => {}
        Err(e) => {
            warn!("Failed to look up user: {}", e);
            return Err("Failed to register user".to_string());
        }
    }

    crate::validate_password(&form.password).map_err(|e| e.to_string())?;

    let hash = crate::hash_password(&form.password).map_err(|e| {
        warn!("Failed to hash password: {}", e);
        "Failed to register user".to_string()
    })?;

    let user = repo
        .create(&NewUser::new(email).with_password(hash))
        .await
        .map_err(|e| {
            warn!("Failed to create user: {}", e);
            "Failed to register user".to_string()
        })?;

    info!(user_id = user.id, "User registered");
    Ok(())
}

/// GET /login - Login form.
pub async fn login_page(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    if claims.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    state.render(jar, "login", "Log In", None, TemplateContext::new())
}

/// POST /login - Check credentials and start a session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_email(&form.email)
        .await?;

    let user = match user {
        Some(user) if user.verify_password(&form.password) => user,
        _ => {
            info!("Failed login attempt");
            return Ok(redirect_with_flash(jar, "/login", LOGIN_FAILED).into_response());
        }
    };

    let jar = state.start_session(jar, &user).await?;
    info!(user_id = user.id, "User logged in");
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /logout - Revoke the refresh token and clear the session cookies.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        if let Err(e) = RefreshTokenRepository::new(state.db.pool())
            .revoke(cookie.value())
            .await
        {
            warn!("Failed to revoke refresh token: {}", e);
        }
    }
    (state.end_session(jar), Redirect::to("/")).into_response()
}

/// GET /refresh - Exchange the refresh token for a new session.
///
/// The refresh token is single use: it is revoked and a new one issued.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let repo = RefreshTokenRepository::new(state.db.pool());
    let stored = match token {
        Some(token) => repo.find_valid(&token).await?,
        None => None,
    };
    let user = match stored {
        Some(stored) => UserRepository::new(state.db.pool())
            .get_by_id(stored.user_id)
            .await?
            .map(|user| (stored, user)),
        None => None,
    };

    let Some((stored, user)) = user else {
        return Ok((state.end_session(jar), Redirect::to("/login")).into_response());
    };

    // A concurrent refresh may have consumed the token already.
    if !repo.revoke(&stored.token).await? {
        return Ok((state.end_session(jar), Redirect::to("/login")).into_response());
    }

    let jar = state.start_session(jar, &user).await?;
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET / - Start page of a signed-in user.
pub async fn index(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    jar: CookieJar,
) -> Result<Response, WebError> {
    let Some(user) = UserRepository::new(state.db.pool())
        .get_by_id(claims.sub)
        .await?
    else {
        return Ok((state.end_session(jar), Redirect::to("/login")).into_response());
    };

    let otp_uri = match user.otp_secret.as_deref() {
        Some(secret) => totp::provisioning_uri(secret, &user.email)
            .map_err(|e| warn!(user_id = user.id, "Invalid OTP secret: {}", e))
            .ok(),
        None => None,
    };

    let mut context = TemplateContext::new();
    context.set("display_name", user.display_name());
    context.set("registered_on", user.registered_on.format("%Y-%m-%d").to_string());
    context.set("otp_uri", otp_uri);

    state.render(jar, "index", "Home", Some(&user.email), context)
}
