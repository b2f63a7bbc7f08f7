//! Error taxonomy shared by every collaborator client and pipeline step.
//!
//! Errors fall into three kinds. Transient failures (timeouts, rate limits,
//! 5xx) are the only ones the retry wrapper repeats; permanent failures and
//! domain errors surface on the first attempt because repeating the call
//! cannot change the outcome.
use std::fmt;
use std::path::PathBuf;

/// External service an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    OpenAi,
    Notion,
    Prices,
    Ffmpeg,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::OpenAi => "openai",
            Service::Notion => "notion",
            Service::Prices => "prices",
            Service::Ffmpeg => "ffmpeg",
        };
        f.write_str(name)
    }
}

/// Coarse classification used for retry decisions and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Domain,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{service} call failed transiently: {message}")]
    Transient { service: Service, message: String },

    #[error("{service} API error (HTTP {status}): {message}")]
    Api {
        service: Service,
        status: u16,
        message: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode { service: Service, message: String },

    #[error("{0} is required. Configure it via the environment or a .env file")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No price data found for {ticker}")]
    NoData { ticker: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transient { .. } => ErrorKind::Transient,
            Error::NoData { .. } | Error::InvalidInput(_) => ErrorKind::Domain,
            Error::Api { .. }
            | Error::Decode { .. }
            | Error::MissingConfig(_)
            | Error::InvalidConfig(_)
            | Error::Render(_)
            | Error::Io { .. } => ErrorKind::Permanent,
        }
    }

    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Map an HTTP error status to the taxonomy.
    ///
    /// 408, 429 and 5xx are transient; every other status is permanent.
    pub(crate) fn from_status(service: Service, status: u16, message: String) -> Self {
        if status == 408 || status == 429 || (500..600).contains(&status) {
            Error::Transient {
                service,
                message: format!("HTTP {status}: {message}"),
            }
        } else {
            Error::Api {
                service,
                status,
                message,
            }
        }
    }

    /// Map a transport-level failure (connect, DNS, timeout, broken body).
    pub(crate) fn transport(service: Service, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => Error::from_status(service, status, String::new()),
            other => Error::Transient {
                service,
                message: other.to_string(),
            },
        }
    }
}

/// Errors that know whether repeating the failed call could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
