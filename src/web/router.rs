use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    response::Response,
    routing::{get, post},
};

use crate::web::{AppState, auth, pages, storage, uploads};

const X_UA_COMPATIBLE: &str = "x-ua-compatible";

pub fn build_router(state: AppState) -> Router {
    let upload_limit = uploads::body_limit(&state);

    Router::new()
        .route("/", get(pages::home))
        .route("/about/", get(pages::about))
        .route(
            "/upload",
            get(uploads::upload_page)
                .post(uploads::process_upload)
                .layer(upload_limit),
        )
        .route("/login", get(auth::login_page).post(auth::process_login))
        .route("/logout", post(auth::logout))
        .route("/uploads/:filename", get(storage::serve_upload))
        .route("/files", get(pages::files))
        .route("/:asset", get(storage::serve_text_asset))
        .fallback(pages::not_found)
        .layer(middleware::map_response(add_default_headers))
        .with_state(state)
}

async fn add_default_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_UA_COMPATIBLE, HeaderValue::from_static("IE=Edge,chrome=1"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=0"),
    );
    response
}
