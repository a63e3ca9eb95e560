use crate::fs::Backend;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;

use crate::fs::WriteBackend;
use crate::net::error;
use crate::sec::authn;
use crate::sec::authz::PUBLIC_TOKEN;
use crate::state::Shared;

pub mod data;
pub mod images;
pub mod index;
pub mod keys;
pub mod remote_get;

/// The token on the request, or the literal public token when none is
/// presented.
pub(crate) fn token_or_public(uri: &Uri, headers: &HeaderMap) -> String {
    match authn::extract_token(uri, headers) {
        Some(token) => token,
        None => String::from(PUBLIC_TOKEN)
    }
}

/// The path prefix configured for the requesting host, empty when the host
/// is unmapped. `X-Forwarded-Host` wins over `Host`.
pub(crate) fn mapped_root(state: &Shared, headers: &HeaderMap) -> String {
    let host = headers.get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    match state.domain_map().get(host) {
        Some(prefix) => prefix.clone(),
        None => String::new()
    }
}

pub(crate) fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

pub(crate) fn content_type(state: &Shared, effective_path: &str) -> String {
    if let Some(found) = state.overrides().get(effective_path) {
        if let Some(content_type) = &found.content_type {
            return content_type.clone();
        }
    }

    crate::net::mime::mime_from_ext(Path::new(effective_path).extension()).to_string()
}

pub(crate) fn writer(state: &Shared) -> error::Result<&dyn WriteBackend> {
    state.backend().writer().ok_or_else(|| error::Error::new()
        .message("Backend does not support writing"))
}

pub(crate) fn json_response<T>(value: &T) -> error::Result<Response<Body>>
where
    T: Serialize
{
    let body = serde_json::to_vec(value)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

pub(crate) fn empty_response() -> error::Result<Response<Body>> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::empty())?)
}
