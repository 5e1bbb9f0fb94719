use super::{
    config::LOGIN_URL, errors::ServerError, extractors::user_from_headers,
    models::AppState,
};
use axum::{
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

pub async fn html_headers<B>(
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, ServerError> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("content-type", HeaderValue::from_str("text/html")?);

    Ok(response)
}

/// Guard for everything that needs a logged-in user. On success the `User`
/// is stashed in the request extensions for the handler; otherwise we bounce
/// to the login page with a `next` parameter pointing back here.
pub async fn require_login<B>(
    State(state): State<AppState>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    match user_from_headers(&state.session_secret, request.headers()) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            let target = request
                .uri()
                .path_and_query()
                .map_or("/", |pq| pq.as_str());
            tracing::debug!(target, "anonymous request to protected route");
            Redirect::to(&login_redirect(target)).into_response()
        }
    }
}

/// `LOGIN_URL` with `next` pointing back at `target`, query string and all.
pub fn login_redirect(target: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", target)
        .finish();

    format!("{LOGIN_URL}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_encodes_target() {
        assert_eq!(login_redirect("/responses"), "/accounts/login?next=%2Fresponses");
        assert_eq!(
            login_redirect("/responses?note_id=4&x=a b"),
            "/accounts/login?next=%2Fresponses%3Fnote_id%3D4%26x%3Da+b"
        );
    }
}
