use actix_web::{cookie::Cookie, HttpRequest};

/// Name of the cookie carrying the signed session token
pub const COOKIE_NAME: &str = "notegate_session";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: actix_web::cookie::SameSite,
    pub path: String,
    pub max_age: actix_web::cookie::time::Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            same_site: actix_web::cookie::SameSite::Lax,
            path: "/".to_string(),
            max_age: actix_web::cookie::time::Duration::hours(24),
        }
    }
}

/// Factory for session cookies.
///
/// The cookie value is the signed session token itself; the signature is
/// what protects it, so no additional cookie-level encryption is applied.
#[derive(Clone)]
pub struct CookieFactory {
    cookie_secure: bool,
    session_duration_hours: u64,
}

impl CookieFactory {
    #[must_use]
    pub fn new(cookie_secure: bool, session_duration_hours: u64) -> Self {
        Self {
            cookie_secure,
            session_duration_hours,
        }
    }

    /// Create the session cookie from an issued token
    #[must_use]
    pub fn create_session_cookie(&self, token: &str) -> Cookie<'static> {
        let options = CookieOptions {
            max_age: actix_web::cookie::time::Duration::hours(
                i64::try_from(self.session_duration_hours).unwrap_or(24),
            ),
            ..Default::default()
        };

        Cookie::build(COOKIE_NAME.to_owned(), token.to_owned())
            .http_only(options.http_only)
            .secure(self.cookie_secure && options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    /// Create an expired cookie to clear the session
    #[must_use]
    pub fn create_expired_cookie(&self) -> Cookie<'static> {
        create_expired_cookie(COOKIE_NAME, self.cookie_secure)
    }
}

/// Extract the session token from request cookies, if present
#[must_use]
pub fn extract_session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Create an expired cookie to clear a specific cookie
#[must_use]
pub fn create_expired_cookie(name: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(name.to_owned(), "")
        .http_only(true)
        .secure(secure)
        .same_site(actix_web::cookie::SameSite::Lax)
        .path("/")
        .max_age(actix_web::cookie::time::Duration::seconds(-1))
        .finish()
}

/// Filter a forwarded `Cookie` header, removing the session cookie so the
/// signed token never reaches the upstream notes API
#[must_use]
pub fn filter_session_cookie(cookie_str: &str) -> Option<String> {
    let filtered_cookies: Vec<&str> = cookie_str
        .split(';')
        .filter_map(|cookie| {
            let trimmed = cookie.trim();
            if trimmed.is_empty() || trimmed.starts_with(&format!("{COOKIE_NAME}=")) {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect();

    if filtered_cookies.is_empty() {
        None
    } else {
        Some(filtered_cookies.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_session_cookie() {
        // Test with single session cookie
        let cookies = "notegate_session=abc123";
        assert_eq!(filter_session_cookie(cookies), None);

        // Test with multiple cookies including the session cookie
        let cookies = "other_cookie=value; notegate_session=abc123; another_cookie=value2";
        assert_eq!(
            filter_session_cookie(cookies),
            Some("other_cookie=value; another_cookie=value2".to_string())
        );

        // Test with no session cookie
        let cookies = "cookie1=value1; cookie2=value2";
        assert_eq!(
            filter_session_cookie(cookies),
            Some("cookie1=value1; cookie2=value2".to_string())
        );

        // Test with empty string
        assert_eq!(filter_session_cookie(""), None);
    }

    #[test]
    fn test_create_expired_cookie() {
        let cookie = create_expired_cookie("test_cookie", true);
        assert_eq!(cookie.name(), "test_cookie");
        assert_eq!(cookie.value(), "");
        assert!(cookie.http_only().unwrap());
        assert!(cookie.secure().unwrap());
        assert_eq!(cookie.path().unwrap(), "/");
        assert!(cookie.max_age().unwrap().whole_seconds() < 0);
    }

    #[test]
    fn test_create_session_cookie() {
        let factory = CookieFactory::new(false, 24);
        let cookie = factory.create_session_cookie("signed.token.value");

        assert_eq!(cookie.name(), COOKIE_NAME);
        assert_eq!(cookie.value(), "signed.token.value");
        assert!(cookie.http_only().unwrap());
        // secure follows the factory configuration
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(
            cookie.max_age().unwrap(),
            actix_web::cookie::time::Duration::hours(24)
        );
    }
}
