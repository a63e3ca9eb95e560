use axum::http::{header, HeaderMap, Uri};

pub const TOKEN_NAME: &str = "access_token";

/// Pulls the access token off a request: `access_token` query parameter,
/// then the second field of the `Authorization` header, then the
/// `access_token` cookie.
pub fn extract_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    if let Some(query) = uri.query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == TOKEN_NAME && !value.is_empty() {
                return Some(value.into_owned());
            }
        }
    }

    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.split_whitespace().nth(1) {
                return Some(token.to_owned());
            }
        }
    }

    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };

        for pair in value.split(';') {
            if let Some((name, token)) = pair.trim().split_once('=') {
                if name == TOKEN_NAME && !token.is_empty() {
                    return Some(token.to_owned());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;

    fn uri(given: &str) -> Uri {
        given.parse().unwrap()
    }

    #[test]
    fn token_from_query() {
        let headers = HeaderMap::new();

        assert_eq!(
            extract_token(&uri("/f.txt?access_token=abc123"), &headers),
            Some(String::from("abc123"))
        );
        assert_eq!(extract_token(&uri("/f.txt?access_token="), &headers), None);
        assert_eq!(extract_token(&uri("/f.txt"), &headers), None);
    }

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());

        assert_eq!(
            extract_token(&uri("/f.txt"), &headers),
            Some(String::from("abc123"))
        );
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; access_token=abc123".parse().unwrap()
        );

        assert_eq!(
            extract_token(&uri("/f.txt"), &headers),
            Some(String::from("abc123"))
        );
    }

    #[test]
    fn query_wins_over_header_and_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        headers.insert(header::COOKIE, "access_token=from-cookie".parse().unwrap());

        assert_eq!(
            extract_token(&uri("/f.txt?access_token=from-query"), &headers),
            Some(String::from("from-query"))
        );

        headers.remove(header::AUTHORIZATION);

        assert_eq!(
            extract_token(&uri("/f.txt"), &headers),
            Some(String::from("from-cookie"))
        );
    }
}
