use http::StatusCode;
use strum::AsRefStr;

#[derive(Debug, Clone, PartialEq, Eq, AsRefStr)]
pub enum ErrorKind {
    NotFound,
    InvalidPath,
    InvalidRequest,
    InvalidImageType,
    Conflict,
    Unsupported,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.as_ref(), f)
    }
}

impl From<&ErrorKind> for StatusCode {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidPath |
            ErrorKind::InvalidRequest |
            ErrorKind::InvalidImageType => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unsupported |
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A backend failure with an explicit HTTP status. Anything a backend cannot
/// classify is `Internal`.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    msg: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            msg: None,
        }
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from(&self.kind)
    }

    /// The message a response body should carry.
    pub fn into_message(self) -> String {
        match self.msg {
            Some(msg) => msg,
            None => self.kind.as_ref().to_owned()
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.msg {
            Some(msg) => write!(f, "{}: {}", self.kind, msg),
            None => write!(f, "{}", self.kind)
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => ErrorKind::Conflict,
            _ => ErrorKind::Internal
        };

        Error::new(kind).message(err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn io_errors_map_to_http_codes() {
        let not_found = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound, "missing"
        ));
        let exists = Error::from(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists, "there"
        ));
        let other = Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied, "denied"
        ));

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(exists.status(), StatusCode::CONFLICT);
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
