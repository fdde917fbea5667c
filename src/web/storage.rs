use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path as AxumPath, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::web::{AppState, pages};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Ensure the storage directory exists.
pub async fn ensure_storage_root(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("failed to ensure storage root at {}", path.display()))
}

/// Walks `root` recursively and returns the names of files ending in an allowed extension.
///
/// Order follows directory enumeration. A missing root is an empty listing; unreadable
/// subdirectories are skipped.
pub async fn list_uploaded(root: &Path, allowed: &[&str]) -> Result<Vec<String>, StorageError> {
    let suffixes: Vec<String> = allowed.iter().map(|ext| format!(".{ext}")).collect();
    let mut names = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if dir == root && err.kind() == ErrorKind::NotFound => return Ok(names),
            Err(source) if dir == root => return Err(StorageError::Read { path: dir, source }),
            Err(err) => {
                warn!(?err, dir = %dir.display(), "skipping unreadable upload subdirectory");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(?err, dir = %dir.display(), "stopped reading upload directory");
                    break;
                }
            };

            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(entry.path());
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
                names.push(name);
            }
        }
    }

    Ok(names)
}

/// `GET /uploads/{filename}`
pub async fn serve_upload(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Response {
    serve_from(state.upload_folder(), &filename, None).await
}

/// `GET /{name}.txt`, served out of the static folder.
pub async fn serve_text_asset(
    State(state): State<AppState>,
    AxumPath(asset): AxumPath<String>,
) -> Response {
    let is_text = asset
        .strip_suffix(".txt")
        .is_some_and(|stem| !stem.is_empty());
    if !is_text {
        return pages::not_found_response();
    }

    serve_from(state.static_folder(), &asset, Some(mime::TEXT_PLAIN_UTF_8)).await
}

async fn serve_from(root: &Path, filename: &str, content_type: Option<mime::Mime>) -> Response {
    let Some(path) = resolve_within(root, filename) else {
        return pages::not_found_response();
    };

    match read_file(&path).await {
        Ok(Some(bytes)) => {
            let content_type = content_type
                .unwrap_or_else(|| mime_guess::from_path(&path).first_or_octet_stream());
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (headers, bytes).into_response()
        }
        Ok(None) => pages::not_found_response(),
        Err(err) => {
            error!(?err, "failed to serve stored file");
            pages::server_error_response()
        }
    }
}

/// Joins a single untrusted path component onto `root`, refusing anything that could escape it.
pub fn resolve_within(root: &Path, filename: &str) -> Option<PathBuf> {
    let valid = !filename.is_empty()
        && !filename.starts_with('.')
        && !filename.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
    valid.then(|| root.join(filename))
}

async fn read_file(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            Ok(None)
        }
        Err(source) => Err(StorageError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALLOWED_EXTENSIONS;
    use tempfile::tempdir;

    #[tokio::test]
    async fn listing_walks_subdirectories_and_filters() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("2024").join("june");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("cat.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"2").unwrap();
        std::fs::write(dir.path().join("anim.gif"), b"3").unwrap();
        std::fs::write(dir.path().join(".tmp.part"), b"4").unwrap();
        std::fs::write(nested.join("dog.png"), b"5").unwrap();

        let mut names = list_uploaded(dir.path(), ALLOWED_EXTENSIONS).await.unwrap();
        names.sort();

        assert_eq!(names, vec!["cat.jpg".to_string(), "dog.png".to_string()]);
    }

    #[tokio::test]
    async fn listing_is_case_sensitive_on_suffix() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("LOUD.JPG"), b"1").unwrap();

        let names = list_uploaded(dir.path(), ALLOWED_EXTENSIONS).await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn listing_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let names = list_uploaded(&dir.path().join("absent"), ALLOWED_EXTENSIONS)
            .await
            .unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn resolve_within_rejects_traversal() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve_within(root, "a.png"),
            Some(PathBuf::from("/srv/uploads/a.png"))
        );
        assert!(resolve_within(root, "..").is_none());
        assert!(resolve_within(root, "../secret.png").is_none());
        assert!(resolve_within(root, r"..\secret.png").is_none());
        assert!(resolve_within(root, ".env").is_none());
        assert!(resolve_within(root, "").is_none());
    }

    #[tokio::test]
    async fn read_file_missing_is_none() {
        let dir = tempdir().unwrap();
        assert!(read_file(&dir.path().join("nope.png")).await.unwrap().is_none());
    }
}
