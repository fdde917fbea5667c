use std::path::{Path, PathBuf};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::ALLOWED_EXTENSIONS,
    web::{
        AppState, auth,
        flash::{self, Flash},
        forms::{FormErrors, UploadForm, ValidatedFile},
        responses::{AppError, Found},
        templates::{self, UploadPage},
    },
};

const INVALID_FILENAME: &str = "Invalid filename.";
/// Longest file name most filesystems accept, in bytes.
const MAX_FILENAME_BYTES: usize = 255;

pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when persisting an uploaded file.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("filename `{0}` has no usable characters")]
    UnusableName(String),
    #[error("failed to {action} `{}`: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Metadata describing a stored upload on disk.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub original_name: String,
    pub stored_name: String,
    pub stored_path: PathBuf,
    pub file_size: u64,
}

pub async fn upload_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let viewer = auth::current_user(&state, &jar).await;
    let (jar, flash) = flash::take(jar);
    let page = templates::render_upload_page(UploadPage {
        viewer: viewer.as_ref().map(|user| user.username.as_str()),
        flash,
        errors: None,
    });
    (jar, Html(page)).into_response()
}

pub async fn process_upload(
    State(state): State<AppState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let incoming = match UploadForm::read(multipart).await {
        Ok(incoming) => incoming,
        Err(err) => return Ok(err.into_response()),
    };

    let file = match UploadForm::validate(incoming, ALLOWED_EXTENSIONS) {
        Ok(file) => file,
        Err(errors) => return Ok(rejected_upload(&state, &jar, &errors).await),
    };

    let saved = match persist_upload(state.upload_folder(), &file).await {
        Ok(saved) => saved,
        Err(UploadError::UnusableName(name)) => {
            warn!(filename = %name, "upload filename sanitized to nothing");
            let mut errors = FormErrors::default();
            errors.add(UploadForm::FILE_FIELD, INVALID_FILENAME);
            return Ok(rejected_upload(&state, &jar, &errors).await);
        }
        Err(err) => return Err(err.into()),
    };
    info!(
        original = %saved.original_name,
        stored = %saved.stored_name,
        path = %saved.stored_path.display(),
        bytes = saved.file_size,
        "stored upload"
    );

    let jar = flash::push(jar, Flash::Uploaded);
    Ok((jar, Found("/")).into_response())
}

async fn rejected_upload(state: &AppState, jar: &CookieJar, errors: &FormErrors) -> Response {
    let viewer = auth::current_user(state, jar).await;
    let page = templates::render_upload_page(UploadPage {
        viewer: viewer.as_ref().map(|user| user.username.as_str()),
        flash: None,
        errors: Some(errors),
    });
    (StatusCode::BAD_REQUEST, Html(page)).into_response()
}

/// Body limit layer for the upload route.
pub fn body_limit(state: &AppState) -> DefaultBodyLimit {
    DefaultBodyLimit::max(state.config().max_upload_bytes)
}

/// Writes the file under `root` using its sanitized name. An existing file with that name is replaced.
pub async fn persist_upload(root: &Path, file: &ValidatedFile) -> UploadResult<SavedUpload> {
    let stored_name = secure_filename(&file.filename)
        .ok_or_else(|| UploadError::UnusableName(file.filename.clone()))?;

    tokio::fs::create_dir_all(root)
        .await
        .map_err(|err| UploadError::io("create upload folder", root, err))?;

    let stored_path = root.join(&stored_name);
    let staging_path = root.join(format!(".{}.part", Uuid::new_v4()));

    if let Err(err) = write_file(&staging_path, &file.bytes).await {
        let _ = tokio::fs::remove_file(&staging_path).await;
        return Err(err);
    }

    if let Err(source) = tokio::fs::rename(&staging_path, &stored_path).await {
        let _ = tokio::fs::remove_file(&staging_path).await;
        return Err(UploadError::io("move upload into", &stored_path, source));
    }

    Ok(SavedUpload {
        original_name: file.filename.clone(),
        stored_name,
        stored_path,
        file_size: file.bytes.len() as u64,
    })
}

async fn write_file(path: &Path, bytes: &[u8]) -> UploadResult<()> {
    let mut handle = File::create(path)
        .await
        .map_err(|err| UploadError::io("create", path, err))?;
    handle
        .write_all(bytes)
        .await
        .map_err(|err| UploadError::io("write", path, err))?;
    handle
        .sync_all()
        .await
        .map_err(|err| UploadError::io("flush", path, err))?;
    Ok(())
}

/// Reduces an untrusted client filename to a single safe path component.
///
/// Directory parts are dropped, whitespace becomes `_`, characters the filesystem
/// would reject are removed, leading dots are stripped and the extension is
/// lowercased. Long names lose the tail of their stem, never the extension.
/// Returns `None` when nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let spaced: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    let sanitized = sanitize_filename::sanitize_with_options(
        &spaced,
        sanitize_filename::Options {
            truncate: false,
            ..Default::default()
        },
    );
    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.len() != sanitized.len() && !trimmed.contains('.') {
        // a bare extension such as `.png`
        return None;
    }

    let (stem, extension) = match trimmed.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (trimmed, None),
    };
    let suffix = match extension {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_ascii_lowercase()),
        _ => String::new(),
    };
    let stem = truncate_at_char_boundary(stem, MAX_FILENAME_BYTES.checked_sub(suffix.len())?);
    if stem.trim_matches(|c: char| c == '.' || c == '_').is_empty() {
        return None;
    }

    Some(format!("{stem}{suffix}"))
}

fn truncate_at_char_boundary(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
