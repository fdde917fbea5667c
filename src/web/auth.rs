use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration as ChronoDuration, Utc};
use cookie::time::Duration as CookieDuration;
use rand_core::OsRng;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::web::{
    AppState,
    flash::{self, Flash},
    forms::{LoginForm, LoginInput},
    models::User,
    pages,
    responses::Found,
    templates::{self, LoginPage},
};

pub const SESSION_COOKIE: &str = "session_token";
const INVALID_CREDENTIALS: &str = "Invalid username or password. Please try again.";

#[derive(Default, Deserialize)]
pub struct LoginFormData {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let viewer = current_user(&state, &jar).await;
    let (jar, flash) = flash::take(jar);
    let page = templates::render_login_page(LoginPage {
        viewer: viewer.as_ref().map(|user| user.username.as_str()),
        flash,
        ..LoginPage::default()
    });
    (jar, Html(page)).into_response()
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginFormData>,
) -> Response {
    let submitted_username = form.username.clone().unwrap_or_default();

    let input = match LoginForm::validate(form.username.as_deref(), form.password.as_deref()) {
        Ok(input) => input,
        Err(errors) => {
            let page = templates::render_login_page(LoginPage {
                username: &submitted_username,
                errors: Some(&errors),
                ..LoginPage::default()
            });
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
    };

    let user = match authenticate(&state, &input).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(username = %input.username, "rejected login attempt");
            let page = templates::render_login_page(LoginPage {
                username: &submitted_username,
                error_message: Some(INVALID_CREDENTIALS),
                ..LoginPage::default()
            });
            return (StatusCode::UNAUTHORIZED, Html(page)).into_response();
        }
        Err(err) => {
            error!(?err, "failed to fetch user during login");
            return pages::server_error_response();
        }
    };

    let ttl_days = state.config().session_ttl_days;
    let expires_at = Utc::now() + ChronoDuration::days(ttl_days);
    let token = match state.sessions().create(user.id, expires_at).await {
        Ok(token) => token,
        Err(err) => {
            error!(?err, "failed to create session");
            return pages::server_error_response();
        }
    };

    info!(username = %user.username, "user logged in");

    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::days(ttl_days));

    let jar = flash::push(jar.add(cookie), Flash::LoggedIn);
    (jar, Found("/upload")).into_response()
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Found) {
    if let Some(token) = session_token(&jar) {
        if let Err(err) = state.sessions().revoke(token).await {
            error!(?err, "failed to remove session during logout");
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.set_http_only(true);
    removal.set_same_site(SameSite::Lax);
    removal.set_max_age(CookieDuration::seconds(0));
    let jar = flash::push(jar.remove(removal), Flash::LoggedOut);

    (jar, Found("/"))
}

/// Resolves the session cookie to a user record. Lookup failures count as anonymous.
pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<User> {
    let token = session_token(jar)?;

    let user_id = match state.sessions().user_id_for(token).await {
        Ok(user_id) => user_id?,
        Err(err) => {
            error!(?err, "failed to resolve session");
            return None;
        }
    };

    match state.users().find_by_id(user_id).await {
        Ok(user) => user,
        Err(err) => {
            error!(?err, "failed to load session user");
            None
        }
    }
}

/// Gate for pages that need a logged-in user; everyone else is sent to the login form.
pub async fn require_user(
    state: &AppState,
    jar: CookieJar,
) -> Result<(CookieJar, User), (CookieJar, Found)> {
    match current_user(state, &jar).await {
        Some(user) => Ok((jar, user)),
        None => Err((flash::push(jar, Flash::LoginRequired), Found("/login"))),
    }
}

fn session_token(jar: &CookieJar) -> Option<Uuid> {
    let cookie = jar.get(SESSION_COOKIE)?;
    Uuid::parse_str(cookie.value()).ok()
}

/// Looks the user up and checks the password. Unknown users and bad passwords both yield `None`.
pub async fn authenticate(state: &AppState, input: &LoginInput) -> anyhow::Result<Option<User>> {
    let user = state.users().find_by_username(&input.username).await?;

    match user {
        Some(user) if verify_password(&input.password, &user.password_hash) => Ok(Some(user)),
        Some(_) => Ok(None),
        None => {
            // keeps the unknown-user path as slow as a real verification
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(&input.password, hash);
            }
            Ok(None)
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let parsed = PasswordHash::new(password_hash);
    match parsed {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("snapshelf-dummy-password").ok())
        .as_deref()
}
