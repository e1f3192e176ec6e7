//! Cookie parsing and `Set-Cookie` construction shared by the session and
//! CSRF components.

use axum::http::{header, HeaderMap};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

/// Attributes common to every cookie the API sets.
#[derive(Debug, Clone)]
pub struct CookieAttributes {
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
}

impl CookieAttributes {
    /// Build from the configured strings. Unknown values fall back to `Lax`;
    /// config validation rejects them before this point.
    pub fn new(secure: bool, same_site: &str, domain: Option<String>) -> Self {
        let same_site = match same_site.to_ascii_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        };
        Self {
            secure,
            same_site,
            domain,
        }
    }

    /// A cookie with these attributes, path `/`, and the given lifetime.
    pub fn build(
        &self,
        name: &str,
        value: String,
        http_only: bool,
        max_age_secs: i64,
    ) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .max_age(CookieDuration::seconds(max_age_secs));
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

/// Value of the first cookie named `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_from_any_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("session_id=abc.def"));

        assert_eq!(read_cookie(&headers, "session_id").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "a").as_deref(), Some("1"));
        assert!(read_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn builds_cookie_with_attributes() {
        let attrs = CookieAttributes::new(true, "None", Some("example.com".into()));
        let cookie = attrs.build("session_id", "tok".into(), true, 60);

        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(60)));
    }
}
