use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;

use crate::net::error::{Error, Kind, Result};
use crate::sec::authn::extract_token;
use crate::sec::key::{generate_key, KeyData};
use crate::state::ArcShared;

use super::empty_response;

/// `POST /gemdrive/create-key` issues a child of the caller's key. The
/// requested privileges must be a subset of the caller's.
pub async fn create(
    State(state): State<ArcShared>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let token = extract_token(&uri, &headers).unwrap_or_default();

    let mut req_data = parse_key_data(&body)?;

    let Some(parent_data) = state.store().get_key_data(&token) else {
        return Err(Error::new()
            .kind(Kind::InvalidRequest)
            .message("Invalid key"));
    };

    if !req_data.is_subset_of(&parent_data) {
        return Err(Error::new().message("You don't have permissions for that"));
    }

    let new_key = generate_key();
    req_data.parent = token;

    state.store()
        .add_key_data(&new_key, req_data)
        .map_err(|err| Error::new().message(err.to_string()))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::from(new_key))?)
}

/// `PUT /gemdrive/keys/<key>` stores key data under a caller-chosen key
/// string. Only the master key may do this.
pub async fn set(
    State(state): State<ArcShared>,
    Path(key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let token = extract_token(&uri, &headers).unwrap_or_default();

    let Some(master) = state.store().get_master_key() else {
        return Err(Error::new().message("No master key"));
    };

    if token != master {
        return Err(Error::denied());
    }

    let mut req_data = parse_key_data(&body)?;

    let Some(master_data) = state.store().get_key_data(&master) else {
        return Err(Error::new().message("No master key"));
    };

    if !req_data.is_subset_of(&master_data) {
        return Err(Error::new().message("You don't have permissions for that"));
    }

    // the master key must stay the only record with an empty parent
    req_data.parent = master;

    state.store()
        .set_key_data(&key, req_data)
        .map_err(|err| Error::new().message(err.to_string()))?;

    empty_response()
}

/// `GET /gemdrive/login` rotates the presented key: the same data is stored
/// under a fresh key and the old key is deleted.
pub async fn login(
    State(state): State<ArcShared>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    let token = extract_token(&uri, &headers).unwrap_or_default();

    let Some(data) = state.store().get_key_data(&token) else {
        return Err(Error::new()
            .kind(Kind::InvalidRequest)
            .message("Invalid key"));
    };

    let new_key = generate_key();

    state.store()
        .add_key_data(&new_key, data)
        .map_err(|err| Error::new().message(err.to_string()))?;

    state.store()
        .delete_key_data(&token)
        .map_err(|err| Error::new().message(err.to_string()))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body(Body::from(new_key))?)
}

fn parse_key_data(body: &Bytes) -> Result<KeyData> {
    serde_json::from_slice(body).map_err(|err| Error::new()
        .kind(Kind::InvalidRequest)
        .message(err.to_string()))
}
