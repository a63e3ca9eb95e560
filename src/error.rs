type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// Startup and persistence failures. Fatal to whatever raised them, so a
/// message for the log and the underlying cause are all they carry.
#[derive(Debug)]
pub struct Error {
    msg: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Error {
        Error {
            msg: None,
            src: None,
        }
    }

    pub fn message<M>(mut self, msg: M) -> Error
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Error
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.msg.as_ref(), self.src.as_ref()) {
            (Some(msg), Some(err)) => write!(f, "{msg}: {err}"),
            (Some(msg), None) => write!(f, "{msg}"),
            (None, Some(err)) => write!(f, "{err}"),
            (None, None) => write!(f, "startup error")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

/// Attaches a message to a failed `Result` or an empty `Option` on its way
/// up to the fatal-error log line.
pub trait Context<T, E> {
    fn context<C>(self, cxt: C) -> Result<T>
    where
        C: Into<String>;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<BoxDynError>
{
    fn context<C>(self, cxt: C) -> Result<T>
    where
        C: Into<String>
    {
        match self {
            Ok(v) => Ok(v),
            Err(err) => Err(Error::new()
                .message(cxt)
                .source(err))
        }
    }
}

impl<T> Context<T, ()> for std::option::Option<T> {
    fn context<C>(self, cxt: C) -> Result<T>
    where
        C: Into<String>
    {
        match self {
            Some(v) => Ok(v),
            None => Err(Error::new()
                .message(cxt))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_includes_message_and_cause() {
        let err: Result<()> = std::fs::read("/no/such/gemdrive/file")
            .map(|_| ())
            .context("failed to read state");

        let text = err.unwrap_err().to_string();

        assert!(text.starts_with("failed to read state: "), "{text}");
    }

    #[test]
    fn option_context_produces_the_message() {
        let err = None::<u16>.context("port missing").unwrap_err();

        assert_eq!(err.to_string(), "port missing");
    }
}
