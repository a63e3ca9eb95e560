use crate::fs::Backend;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::net::error::{Error, Kind, Result};
use crate::state::ArcShared;

use super::{content_type, mapped_root, token_or_public};

/// `/gemdrive/images/<size>/<subpath>` serves a cached thumbnail whose
/// larger dimension is `size` pixels.
pub async fn get(
    State(state): State<ArcShared>,
    Path((size, rest)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    let token = token_or_public(&uri, &headers);
    let mapped = mapped_root(&state, &headers);

    let size: u32 = size.parse().map_err(|_| Error::new()
        .kind(Kind::InvalidRequest)
        .message("Invalid size param"))?;

    let img_path = format!("{mapped}/{rest}");

    if !state.auth().can_read(&token, &img_path) {
        return Err(Error::denied());
    }

    let Some(images) = state.backend().images() else {
        return Err(Error::new().message("Backend does not support images"));
    };

    let (data, length) = images.get_image(&img_path, size).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&state, &img_path))
        .header(header::CONTENT_LENGTH, length)
        .body(Body::from_stream(ReaderStream::new(data)))?)
}
