use crate::fs::Backend;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::Response;
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::fs::ByteStream;
use crate::net::error::{Error, Kind, Result};
use crate::net::range;
use crate::state::{ArcShared, Shared};
use crate::time::{http_date, parse_mod_time};

use super::{
    content_type, empty_response, mapped_root, query_param, token_or_public, writer,
};

/// The public data plane. Every path that is not `/gemdrive/*` lands here
/// and is dispatched on the method after host mapping and token extraction.
pub async fn handle(
    State(state): State<ArcShared>,
    req: Request<Body>,
) -> Result<Response<Body>> {
    let (parts, body) = req.into_parts();
    let method = parts.method;
    let uri = parts.uri;
    let headers = parts.headers;

    if method == Method::OPTIONS {
        return empty_response();
    }

    let effective = format!("{}{}", mapped_root(&state, &headers), uri.path());
    let token = token_or_public(&uri, &headers);

    tracing::debug!("{} {}", method, effective);

    if method == Method::HEAD {
        head(&state, &token, &effective).await
    } else if method == Method::GET {
        get(&state, &uri, &headers, &token, &effective).await
    } else if method == Method::PUT {
        put(&state, &uri, &headers, &token, &effective, body).await
    } else if method == Method::PATCH {
        patch(&state, &uri, &headers, &token, &effective, body).await
    } else if method == Method::DELETE {
        delete(&state, &uri, &token, &effective).await
    } else {
        Err(Error::new()
            .kind(Kind::MethodNotAllowed)
            .message("Invalid method"))
    }
}

async fn head(state: &Shared, token: &str, effective: &str) -> Result<Response<Body>> {
    if !state.auth().can_read(token, effective) {
        return Err(Error::denied());
    }

    let (parent, filename) = parent_and_base(effective);

    let item = state.backend().list(&parent, 1).await?;

    let Some(child) = item.children.as_ref().and_then(|children| children.get(&filename)) else {
        return Err(Error::new().kind(Kind::NotFound).message("Not found"));
    };

    let Some(mod_time) = child.mod_time.as_deref().and_then(parse_mod_time) else {
        return Err(Error::new().message("Invalid ModTime"));
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(state, effective))
        .header(header::CONTENT_LENGTH, child.size)
        .header(header::LAST_MODIFIED, http_date(&mod_time))
        .header("gemdrive-isexecutable", bool_str(child.is_executable))
        .body(Body::empty())?)
}

async fn get(
    state: &Shared,
    uri: &Uri,
    headers: &HeaderMap,
    token: &str,
    effective: &str,
) -> Result<Response<Body>> {
    if !state.auth().can_read(token, effective) {
        return Err(Error::denied());
    }

    if effective.ends_with('/') {
        serve_dir(state, effective).await
    } else {
        serve_file(state, uri, headers, effective).await
    }
}

/// A directory is only readable through its `index.html`.
async fn serve_dir(state: &Shared, effective: &str) -> Result<Response<Body>> {
    let index_path = format!("{effective}index.html");

    let (item, data) = state.backend()
        .read(&index_path, 0, 0)
        .await
        .map_err(|_| Error::new()
            .kind(Kind::InvalidRequest)
            .message("Attempted to read directory"))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CONTENT_LENGTH, item.size)
        .body(Body::from_stream(ReaderStream::new(data)))?)
}

async fn serve_file(
    state: &Shared,
    uri: &Uri,
    headers: &HeaderMap,
    effective: &str,
) -> Result<Response<Body>> {
    let range = match headers.get(header::RANGE) {
        Some(value) => Some(range::parse(value.to_str()?)?),
        None => None
    };

    let (offset, copy_length) = match &range {
        Some(range) => (range.start, range.copy_length()),
        None => (0, 0)
    };

    let (item, data) = state.backend().read(effective, offset, copy_length).await?;

    let Some(mod_time) = item.mod_time.as_deref().and_then(parse_mod_time) else {
        return Err(Error::new().message("Invalid ModTime"));
    };

    let mut builder = Response::builder()
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_TYPE, content_type(state, effective))
        .header(header::LAST_MODIFIED, http_date(&mod_time))
        .header("gemdrive-isexecutable", bool_str(item.is_executable));

    if query_param(uri, "download").as_deref() == Some("true") {
        builder = builder.header(header::CONTENT_DISPOSITION, "attachment");
    }

    let builder = match &range {
        Some(range) => {
            let end = range.end_for(item.size);

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", range.start, end, item.size)
                )
                .header(header::CONTENT_LENGTH, (end + 1).saturating_sub(range.start))
        }
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, item.size)
    };

    Ok(builder.body(Body::from_stream(ReaderStream::new(data)))?)
}

async fn put(
    state: &Shared,
    uri: &Uri,
    headers: &HeaderMap,
    token: &str,
    effective: &str,
    body: Body,
) -> Result<Response<Body>> {
    if !state.auth().can_write(token, effective) {
        return Err(Error::denied());
    }

    if effective.ends_with('/') {
        let recursive = query_param(uri, "recursive").as_deref() == Some("true");

        writer(state)?.make_dir(effective, recursive).await?;

        return empty_response();
    }

    let length = content_length(headers)?;
    let overwrite = query_param(uri, "overwrite").as_deref() == Some("true");

    writer(state)?
        .write(effective, body_stream(body), 0, length, overwrite, true)
        .await?;

    apply_attributes(state, uri, effective).await?;

    empty_response()
}

async fn patch(
    state: &Shared,
    uri: &Uri,
    headers: &HeaderMap,
    token: &str,
    effective: &str,
    body: Body,
) -> Result<Response<Body>> {
    if !state.auth().can_write(token, effective) {
        return Err(Error::denied());
    }

    let offset = match query_param(uri, "offset") {
        Some(given) => given.parse().map_err(|_| Error::new()
            .kind(Kind::InvalidRequest)
            .message("Invalid offset"))?,
        None => 0
    };

    let length = content_length(headers)?;

    writer(state)?
        .write(effective, body_stream(body), offset, length, true, false)
        .await?;

    apply_attributes(state, uri, effective).await?;

    empty_response()
}

async fn delete(
    state: &Shared,
    uri: &Uri,
    token: &str,
    effective: &str,
) -> Result<Response<Body>> {
    if !state.auth().can_write(token, effective) {
        return Err(Error::denied());
    }

    let recursive = query_param(uri, "recursive").as_deref() == Some("true");

    writer(state)?.delete(effective, recursive).await?;

    empty_response()
}

/// `?mod-time=` and `?is-executable=` piggyback on PUT and PATCH.
async fn apply_attributes(state: &Shared, uri: &Uri, effective: &str) -> Result<()> {
    let mod_time = match query_param(uri, "mod-time") {
        Some(given) => match parse_mod_time(&given) {
            Some(parsed) => Some(parsed),
            None => return Err(Error::new()
                .kind(Kind::InvalidRequest)
                .message("Invalid mod-time"))
        },
        None => None
    };

    let is_executable = query_param(uri, "is-executable")
        .map(|given| given == "true");

    if mod_time.is_some() || is_executable.is_some() {
        writer(state)?.set_attributes(effective, mod_time, is_executable).await?;
    }

    Ok(())
}

fn content_length(headers: &HeaderMap) -> Result<u64> {
    headers.get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| Error::new()
            .kind(Kind::InvalidRequest)
            .message("Invalid content length"))
}

fn body_stream(body: Body) -> ByteStream {
    let stream = body.into_data_stream().map_err(std::io::Error::other);

    Box::new(StreamReader::new(stream))
}

fn parent_and_base(path: &str) -> (String, String) {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    match trimmed.rsplit_once('/') {
        Some((parent, base)) => (format!("{parent}/"), base.to_owned()),
        None => (String::from("/"), trimmed.to_owned())
    }
}

fn bool_str(given: bool) -> &'static str {
    if given {
        "true"
    } else {
        "false"
    }
}
