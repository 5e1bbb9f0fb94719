use super::{
    models::{AppState, User},
    session,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use regex::Regex;
use std::{convert::Infallible, sync::OnceLock};

fn session_cookie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|;\s*)session=([^;]*)").expect("valid regex")
    })
}

/// Resolve the logged-in user from the `session` cookie. Anything short of a
/// cookie signed with our secret comes out as `None`.
pub fn user_from_headers(secret: &[u8], headers: &HeaderMap) -> Option<User> {
    let cookie = headers.get("Cookie")?.to_str().ok()?;
    let captures = session_cookie_re().captures(cookie)?;
    let token = captures.get(1)?.as_str();

    session::deserialize_session(secret, token)
        .ok()
        .map(|s| s.user)
}

/// Whoever is looking at the page, if anyone. Public pages use this;
/// protected ones get a `User` extension from `middleware::require_login`
/// instead.
pub struct Viewer(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(
        req: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Viewer(user_from_headers(&state.session_secret, &req.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::fixtures::user, session::Session};
    use axum::http::HeaderValue;

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Cookie", HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_reads_session_among_other_cookies() {
        let token =
            session::serialize_session(b"foo", &Session { user: user(4) });
        let headers = headers_with(&format!("theme=dark; session={token}; x=1"));
        assert_eq!(user_from_headers(b"foo", &headers), Some(user(4)));
    }

    #[test]
    fn test_no_cookie_is_anonymous() {
        assert_eq!(user_from_headers(b"foo", &HeaderMap::new()), None);
        assert_eq!(user_from_headers(b"foo", &headers_with("theme=dark")), None);
    }

    #[test]
    fn test_forged_cookie_is_anonymous() {
        let token =
            session::serialize_session(b"other", &Session { user: user(4) });
        let headers = headers_with(&format!("session={token}"));
        assert_eq!(user_from_headers(b"foo", &headers), None);
    }
}
