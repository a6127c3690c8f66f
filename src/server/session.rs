//! Session cookie parsing and formatting.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;

/// Find the value of cookie `name` in the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs a session token.
pub fn session_cookie(name: &str, token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, max_age_secs
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; sid=abc123; lang=en"));

        assert_eq!(read_cookie(&headers, "sid").as_deref(), Some("abc123"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(read_cookie(&headers, "sid"), None);
    }

    #[test]
    fn cookie_formatting() {
        assert_eq!(
            session_cookie("sid", "tok", 60),
            "sid=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(clear_cookie("sid").starts_with("sid=;"));
    }
}
