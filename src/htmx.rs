/// HTMX utils
use axum::http::{HeaderMap, HeaderValue};

/// For responses to `hx-post` / `hx-delete` requests, which htmx will not
/// follow a plain 3xx for.
pub fn redirect(to: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Hx-Redirect",
        HeaderValue::from_str(to).unwrap_or(HeaderValue::from_static("/")),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_header() {
        let headers = redirect("/responses");
        assert_eq!(headers.get("Hx-Redirect").unwrap(), "/responses");
    }

    #[test]
    fn test_redirect_falls_back_to_root() {
        let headers = redirect("/bad\nheader");
        assert_eq!(headers.get("Hx-Redirect").unwrap(), "/");
    }
}
