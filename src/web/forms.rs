//! Field-level validation for the login and upload forms.

use std::{collections::BTreeMap, path::Path};

use axum::{body::Bytes, extract::Multipart, extract::multipart::MultipartError};

pub const FIELD_REQUIRED: &str = "This field is required.";
pub const IMAGES_ONLY: &str = "Images only!";

/// Error messages keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn for_field(&self, field: &str) -> &[String] {
        self.fields
            .get(field)
            .map(|messages| messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

pub struct LoginForm;

impl LoginForm {
    pub fn validate(
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<LoginInput, FormErrors> {
        let username = username.map(str::trim).unwrap_or_default();
        let password = password.unwrap_or_default();

        let mut errors = FormErrors::default();
        if username.is_empty() {
            errors.add("username", FIELD_REQUIRED);
        }
        if password.is_empty() {
            errors.add("password", FIELD_REQUIRED);
        }

        errors.into_result(|| LoginInput {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// A file part as received from the client, before any validation.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// A file that passed the upload form checks; handlers get one only from [`UploadForm::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedFile {
    pub filename: String,
    pub bytes: Bytes,
}

pub struct UploadForm;

impl UploadForm {
    pub const FILE_FIELD: &'static str = "file";

    /// Collects the `file` part from a multipart body. Parts with an empty filename count as absent.
    pub async fn read(mut multipart: Multipart) -> Result<Option<IncomingFile>, MultipartError> {
        let mut incoming = None;

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(Self::FILE_FIELD) {
                continue;
            }

            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            if filename.is_empty() {
                continue;
            }

            incoming = Some(IncomingFile { filename, bytes });
        }

        Ok(incoming)
    }

    pub fn validate(
        file: Option<IncomingFile>,
        allowed_extensions: &[&str],
    ) -> Result<ValidatedFile, FormErrors> {
        let mut errors = FormErrors::default();

        let Some(file) = file else {
            errors.add(Self::FILE_FIELD, FIELD_REQUIRED);
            return Err(errors);
        };

        let allowed = file_extension(&file.filename)
            .is_some_and(|ext| allowed_extensions.contains(&ext.as_str()));
        if !allowed {
            errors.add(Self::FILE_FIELD, IMAGES_ONLY);
        }

        errors.into_result(|| ValidatedFile {
            filename: file.filename,
            bytes: file.bytes,
        })
    }
}

/// Lowercased text after the final dot, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALLOWED_EXTENSIONS;

    fn incoming(name: &str) -> Option<IncomingFile> {
        Some(IncomingFile {
            filename: name.to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        })
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = LoginForm::validate(None, Some("")).unwrap_err();
        assert_eq!(errors.for_field("username"), [FIELD_REQUIRED]);
        assert_eq!(errors.for_field("password"), [FIELD_REQUIRED]);
    }

    #[test]
    fn login_treats_blank_username_as_missing() {
        let errors = LoginForm::validate(Some("   "), Some("pw")).unwrap_err();
        assert_eq!(errors.for_field("username").len(), 1);
        assert!(errors.for_field("password").is_empty());
    }

    #[test]
    fn login_trims_username_but_not_password() {
        let input = LoginForm::validate(Some(" alice "), Some(" pw ")).unwrap();
        assert_eq!(input.username, "alice");
        assert_eq!(input.password, " pw ");
    }

    #[test]
    fn upload_without_file_is_required_error() {
        let errors = UploadForm::validate(None, ALLOWED_EXTENSIONS).unwrap_err();
        assert_eq!(errors.for_field("file"), [FIELD_REQUIRED]);
    }

    #[test]
    fn upload_rejects_other_extensions() {
        for name in ["anim.gif", "noext", "archive.png.zip", "trailing."] {
            let errors = UploadForm::validate(incoming(name), ALLOWED_EXTENSIONS).unwrap_err();
            assert_eq!(errors.for_field("file"), [IMAGES_ONLY], "{name}");
        }
    }

    #[test]
    fn upload_accepts_allowed_extensions_in_any_case() {
        let file = UploadForm::validate(incoming("PHOTO.JPG"), ALLOWED_EXTENSIONS).unwrap();
        assert_eq!(file.filename, "PHOTO.JPG");

        let file = UploadForm::validate(incoming("shot.png"), ALLOWED_EXTENSIONS).unwrap();
        assert_eq!(&file.bytes[..], b"\x89PNG");
    }
}
