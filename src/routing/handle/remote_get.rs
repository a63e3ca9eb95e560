use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use bytes::Bytes;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;

use crate::fs::ByteStream;
use crate::net::error::{Error, Kind, Result};
use crate::state::ArcShared;

use super::{empty_response, token_or_public, writer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGetRequest {
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub destination: String,

    #[serde(default)]
    pub destination_offset: u64,

    #[serde(default)]
    pub overwrite: bool,

    #[serde(default)]
    pub truncate: bool,
}

/// `POST /gemdrive/remote-get` pulls `source` over http and writes it to
/// `destination` through the backend, streaming end to end.
pub async fn post(
    State(state): State<ArcShared>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let token = token_or_public(&uri, &headers);

    let req: RemoteGetRequest = serde_json::from_slice(&body)
        .map_err(|err| Error::new()
            .kind(Kind::InvalidRequest)
            .message(err.to_string()))?;

    if req.source.is_empty() {
        return Err(Error::new()
            .kind(Kind::InvalidRequest)
            .message("remote-get: Missing source"));
    }

    if req.destination.is_empty() {
        return Err(Error::new()
            .kind(Kind::InvalidRequest)
            .message("remote-get: Missing destination"));
    }

    if !state.auth().can_write(&token, &req.destination) {
        return Err(Error::denied());
    }

    let writer = writer(&state)?;

    let resp = reqwest::get(&req.source)
        .await
        .map_err(|err| Error::new().message(format!("remote-get: {err}")))?;

    if !resp.status().is_success() {
        return Err(Error::new().message(format!(
            "remote-get: Failed with status {}", resp.status().as_u16()
        )));
    }

    // the declared-length contract on write needs a known size
    let Some(length) = resp.content_length() else {
        return Err(Error::new().message("remote-get: Missing content length"));
    };

    let stream = resp.bytes_stream().map_err(std::io::Error::other);
    let data: ByteStream = Box::new(StreamReader::new(stream));

    writer
        .write(
            &req.destination,
            data,
            req.destination_offset,
            length,
            req.overwrite,
            req.truncate,
        )
        .await?;

    empty_response()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_body_is_camel_case_with_defaults() {
        let req: RemoteGetRequest = serde_json::from_str(r#"{
            "source": "http://origin/x.bin",
            "destination": "/files/x.bin",
            "destinationOffset": 100,
            "overwrite": true
        }"#).unwrap();

        assert_eq!(req.source, "http://origin/x.bin");
        assert_eq!(req.destination_offset, 100);
        assert!(req.overwrite);
        assert!(!req.truncate);
    }
}
