use std::{env, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPLOAD_FOLDER: &str = "uploads";
const DEFAULT_STATIC_FOLDER: &str = "static";
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;
const DEFAULT_MAX_UPLOAD_MB: usize = 16;
const DEFAULT_SITE_OWNER: &str = "Mary Jane";
const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Extensions accepted by the upload form and shown on the listing page.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "png"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub upload_folder: PathBuf,
    pub static_folder: PathBuf,
    pub session_ttl_days: i64,
    pub max_upload_bytes: usize,
    pub site_owner: String,
    pub seed_user: Option<SeedUser>,
}

#[derive(Clone, Debug)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;

        let seed_user = match (env::var("SEED_USERNAME"), env::var("SEED_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.trim().is_empty() && !password.is_empty() => {
                Some(SeedUser {
                    username: username.trim().to_string(),
                    password,
                })
            }
            _ => None,
        };

        let max_upload_bytes =
            upload_limit_bytes(parse_var("MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?)?;
        let session_ttl_days =
            check_session_ttl(parse_var("SESSION_TTL_DAYS", DEFAULT_SESSION_TTL_DAYS)?)?;

        Ok(Self {
            database_url,
            port: parse_var("PORT", DEFAULT_PORT)?,
            upload_folder: path_var("UPLOAD_FOLDER", DEFAULT_UPLOAD_FOLDER),
            static_folder: path_var("STATIC_FOLDER", DEFAULT_STATIC_FOLDER),
            session_ttl_days,
            max_upload_bytes,
            site_owner: env::var("SITE_OWNER").unwrap_or_else(|_| DEFAULT_SITE_OWNER.to_string()),
            seed_user,
        })
    }

    #[cfg(test)]
    pub fn with_folders(upload_folder: PathBuf, static_folder: PathBuf) -> Self {
        Self {
            database_url: String::new(),
            port: DEFAULT_PORT,
            upload_folder,
            static_folder,
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            site_owner: DEFAULT_SITE_OWNER.to_string(),
            seed_user: None,
        }
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("{name} must be a valid number, got `{raw}`")),
        _ => Ok(default),
    }
}

fn upload_limit_bytes(megabytes: usize) -> Result<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow!("MAX_UPLOAD_MB is too large, got `{megabytes}`"))
}

fn check_session_ttl(days: i64) -> Result<i64> {
    if (1..=MAX_SESSION_TTL_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(anyhow!(
            "SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}, got `{days}`"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_folders_uses_defaults() {
        let config = AppConfig::with_folders(PathBuf::from("up"), PathBuf::from("st"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_ttl_days, 7);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.site_owner, "Mary Jane");
        assert!(config.seed_user.is_none());
    }

    #[test]
    fn parse_var_falls_back_when_unset() {
        let value: u16 = parse_var("SNAPSHELF_TEST_UNSET_PORT", 1234).unwrap();
        assert_eq!(value, 1234);
    }

    #[test]
    fn upload_limit_rejects_overflow() {
        assert_eq!(upload_limit_bytes(2).unwrap(), 2 * 1024 * 1024);
        let err = upload_limit_bytes(usize::MAX).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB"));
    }

    #[test]
    fn session_ttl_must_be_in_range() {
        assert_eq!(check_session_ttl(7).unwrap(), 7);
        assert_eq!(check_session_ttl(MAX_SESSION_TTL_DAYS).unwrap(), MAX_SESSION_TTL_DAYS);
        for days in [0, -3, i64::MAX] {
            let err = check_session_ttl(days).unwrap_err();
            assert!(err.to_string().contains("SESSION_TTL_DAYS"), "{days}");
        }
    }
}
