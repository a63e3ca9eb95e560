use crate::fs::Backend;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;

use crate::net::error::{Error, Kind, Result};
use crate::state::ArcShared;

use super::{json_response, mapped_root, query_param, token_or_public};

/// `/gemdrive/index/<subpath>list.json` lists one level;
/// `/gemdrive/index/<subpath>tree.json?depth=N` expands N levels, 0 meaning
/// as deep as the backend allows.
pub async fn get(
    State(state): State<ArcShared>,
    Path(rest): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response<Body>> {
    let token = token_or_public(&uri, &headers);
    let mapped = mapped_root(&state, &headers);

    let (sub_path, depth) = if let Some(stripped) = rest.strip_suffix("list.json") {
        (stripped, 1)
    } else if let Some(stripped) = rest.strip_suffix("tree.json") {
        let depth = match query_param(&uri, "depth") {
            Some(given) => given.parse().map_err(|_| Error::new()
                .kind(Kind::InvalidRequest)
                .message("Invalid depth param"))?,
            None => 0
        };

        (stripped, depth)
    } else {
        return Err(Error::new()
            .kind(Kind::InvalidRequest)
            .message("Invalid GemDrive request"));
    };

    let gem_path = format!("{mapped}/{sub_path}");

    if !state.auth().can_read(&token, &gem_path) {
        return Err(Error::denied());
    }

    let item = state.backend().list(&gem_path, depth).await?;

    json_response(&item)
}
