use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use strum::AsRefStr;
use tracing::Level;

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum Kind {
    NotFound,
    InvalidRequest,
    Unauthorized,
    Conflict,
    MethodNotAllowed,
    Internal,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&Kind> for StatusCode {
    fn from(kind: &Kind) -> Self {
        match kind {
            Kind::NotFound => StatusCode::NOT_FOUND,
            Kind::InvalidRequest => StatusCode::BAD_REQUEST,
            Kind::Unauthorized => StatusCode::FORBIDDEN,
            Kind::Conflict => StatusCode::CONFLICT,
            Kind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Kind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What a denied request gets instead of content. Revisions with a bundled
/// dashboard served a full login asset here.
const LOGIN_BODY: &str = "<!DOCTYPE html>\n\
<html>\n\
<body>\n\
<p>Access denied. Provide a key via the access_token cookie, an\n\
Authorization header, or an access_token query parameter.</p>\n\
</body>\n\
</html>\n";

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    msg: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Self {
        Error {
            kind: Kind::Internal,
            msg: None,
            src: None,
        }
    }

    pub fn kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Self
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }

    /// An authorization denial. Renders the login body.
    pub fn denied() -> Self {
        Error::new().kind(Kind::Unauthorized)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, self.msg.as_ref(), self.src.as_ref()) {
            (kind, Some(msg), Some(err)) => write!(f, "{kind}: {msg}\n{err:?}"),
            (kind, Some(msg), None) => write!(f, "{kind}: {msg}"),
            (kind, None, Some(err)) => write!(f, "{kind}: {err:?}"),
            (kind, None, None) => write!(f, "{kind}")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Some(err) = self.src.as_ref() {
            tracing::event!(
                Level::ERROR,
                "unhandled error when processing request: {:#?}",
                err
            );
        }

        let status = StatusCode::from(&self.kind);

        if self.kind == Kind::Unauthorized {
            return (
                status,
                [
                    (header::WWW_AUTHENTICATE, "emauth realm=\"Everything\", charset=\"UTF-8\""),
                    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                ],
                LOGIN_BODY,
            ).into_response();
        }

        let body = match self.msg {
            Some(msg) => msg,
            None => self.kind.as_ref().to_owned()
        };

        (status, body).into_response()
    }
}

impl From<crate::fs::error::Error> for Error {
    fn from(err: crate::fs::error::Error) -> Self {
        let kind = match err.status() {
            StatusCode::NOT_FOUND => Kind::NotFound,
            StatusCode::BAD_REQUEST => Kind::InvalidRequest,
            StatusCode::CONFLICT => Kind::Conflict,
            _ => Kind::Internal
        };

        Error::new()
            .kind(kind)
            .message(err.into_message())
    }
}

macro_rules! simple_from {
    ($e:path) => {
        impl From<$e> for Error {
            fn from(err: $e) -> Self {
                Error::new()
                    .source(err)
            }
        }
    };
    ($e:path, $k:expr) => {
        impl From<$e> for Error {
            fn from(err: $e) -> Self {
                Error::new()
                    .kind($k)
                    .source(err)
            }
        }
    };
}

simple_from!(std::io::Error);
simple_from!(axum::Error);
simple_from!(axum::http::Error);
simple_from!(serde_json::Error);
simple_from!(
    axum::http::header::ToStrError,
    Kind::InvalidRequest
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(StatusCode::from(&Kind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(StatusCode::from(&Kind::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(StatusCode::from(&Kind::Conflict), StatusCode::CONFLICT);
        assert_eq!(StatusCode::from(&Kind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn denied_renders_login_body() {
        let response = Error::denied().into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
