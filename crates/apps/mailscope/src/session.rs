//! Session id transport: cookie for browsers, bearer header for scripts

use axum::http::{HeaderMap, header};
use mail::SessionId;

pub const SESSION_COOKIE: &str = "mailscope_session";

/// Session id from the session cookie only
pub fn cookie_session(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionId::new(value))
}

/// Session id from the cookie, else from `Authorization: Bearer`
pub fn request_session(headers: &HeaderMap) -> Option<SessionId> {
    cookie_session(headers).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(SessionId::new)
    })
}

pub fn set_cookie(id: &SessionId, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        id.as_str(),
        max_age_secs.max(0)
    )
}

pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_cookie_among_others() {
        let map = headers(&[(header::COOKIE, "theme=dark; mailscope_session=abc123; lang=en")]);
        assert_eq!(cookie_session(&map), Some(SessionId::new("abc123")));
    }

    #[test]
    fn test_cookie_in_second_header() {
        let map = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::COOKIE, "mailscope_session=xyz"),
        ]);
        assert_eq!(cookie_session(&map), Some(SessionId::new("xyz")));
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let map = headers(&[(header::COOKIE, "mailscope_session=")]);
        assert_eq!(cookie_session(&map), None);
    }

    #[test]
    fn test_bearer_fallback() {
        let map = headers(&[(header::AUTHORIZATION, "Bearer token-1")]);
        assert_eq!(cookie_session(&map), None);
        assert_eq!(request_session(&map), Some(SessionId::new("token-1")));

        let both = headers(&[
            (header::AUTHORIZATION, "Bearer token-1"),
            (header::COOKIE, "mailscope_session=cookie-1"),
        ]);
        assert_eq!(request_session(&both), Some(SessionId::new("cookie-1")));

        let basic = headers(&[(header::AUTHORIZATION, "Basic dXNlcg==")]);
        assert_eq!(request_session(&basic), None);
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            set_cookie(&SessionId::new("abc"), 600),
            "mailscope_session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=600"
        );
        assert!(clear_cookie().contains("Max-Age=0"));
    }
}
