use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Uploaded,
    LoggedIn,
    LoggedOut,
    LoginRequired,
}

impl Flash {
    pub fn code(self) -> &'static str {
        match self {
            Flash::Uploaded => "uploaded",
            Flash::LoggedIn => "logged_in",
            Flash::LoggedOut => "logged_out",
            Flash::LoginRequired => "login_required",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "uploaded" => Some(Flash::Uploaded),
            "logged_in" => Some(Flash::LoggedIn),
            "logged_out" => Some(Flash::LoggedOut),
            "login_required" => Some(Flash::LoginRequired),
            _ => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::Uploaded => "File successfully uploaded!",
            Flash::LoggedIn => "Successfully logged in!",
            Flash::LoggedOut => "You have been logged out.",
            Flash::LoginRequired => "Please log in to access this page.",
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Flash::LoginRequired => "danger",
            _ => "success",
        }
    }
}

/// Queues a message for the next rendered page.
pub fn push(jar: CookieJar, flash: Flash) -> CookieJar {
    let mut cookie = Cookie::new(FLASH_COOKIE, flash.code());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    jar.add(cookie)
}

/// Pops the pending message, if any. The returned jar removes the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(flash) = jar
        .get(FLASH_COOKIE)
        .map(|cookie| Flash::from_code(cookie.value()))
    else {
        return (jar, None);
    };

    let mut removal = Cookie::from(FLASH_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_cookie() {
        let jar = push(CookieJar::new(), Flash::Uploaded);
        let (_jar, flash) = take(jar);
        assert_eq!(flash, Some(Flash::Uploaded));
    }

    #[test]
    fn unknown_code_is_dropped() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "bogus"));
        let (jar, flash) = take(jar);
        assert_eq!(flash, None);
        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn take_without_cookie_is_noop() {
        let (_jar, flash) = take(CookieJar::new());
        assert!(flash.is_none());
    }
}
