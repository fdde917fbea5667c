use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    config::ALLOWED_EXTENSIONS,
    web::{AppState, auth, flash, responses::AppError, storage, templates},
};

pub async fn home(State(state): State<AppState>, jar: CookieJar) -> Response {
    let viewer = auth::current_user(&state, &jar).await;
    let (jar, flash) = flash::take(jar);
    let page = templates::render_home_page(viewer.as_ref().map(|user| user.username.as_str()), flash);
    (jar, Html(page)).into_response()
}

pub async fn about(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let viewer = auth::current_user(&state, &jar).await;
    Html(templates::render_about_page(
        viewer.as_ref().map(|user| user.username.as_str()),
        &state.config().site_owner,
    ))
}

pub async fn files(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let (jar, user) = match auth::require_user(&state, jar).await {
        Ok(found) => found,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let image_files = storage::list_uploaded(state.upload_folder(), ALLOWED_EXTENSIONS).await?;
    let (jar, flash) = flash::take(jar);
    let page = templates::render_files_page(&user.username, flash, &image_files);
    Ok((jar, Html(page)).into_response())
}

pub async fn not_found() -> Response {
    not_found_response()
}

pub fn not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(templates::render_not_found_page()),
    )
        .into_response()
}

pub fn server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(templates::render_server_error_page()),
    )
        .into_response()
}
