use std::fmt;

use thiserror::Error;

/// Boxed error value produced by a backend SDK.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which adapter an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    S3,
    Gcs,
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::S3 => write!(f, "s3"),
            Backend::Gcs => write!(f, "gcs"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// Malformed request, rejected before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bucket name is empty")]
    EmptyBucket,

    #[error("object name is empty")]
    EmptyKey,

    #[error("object body is missing")]
    MissingBody,

    #[error("object name {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("object name is {0} bytes long, limit is 1024")]
    KeyTooLong(usize),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage: {0}")]
    Validation(#[from] ValidationError),

    /// Error surfaced by a backend SDK. `source` is the SDK's own error
    /// value; `status` is the HTTP status it carried, if any.
    #[error("{backend} backend error{}: {source}", status_suffix(.status))]
    Backend {
        backend: Backend,
        status: Option<u16>,
        #[source]
        source: BoxError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn backend<E>(backend: Backend, status: Option<u16>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        StorageError::Backend {
            backend,
            status,
            source: source.into(),
        }
    }

    /// HTTP status reported by the backend, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// True iff the error came from a backend rather than local validation.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, StorageError::Backend { .. })
    }

    /// True iff the backend answered with a 4xx status.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    /// True iff the backend answered with exactly 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Borrow the original SDK error as a concrete type.
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            StorageError::Backend { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub fn is_backend_error(err: &StorageError) -> bool {
    err.is_backend_error()
}

pub fn is_client_error(err: &StorageError) -> bool {
    err.is_client_error()
}

pub fn is_not_found(err: &StorageError) -> bool {
    err.is_not_found()
}
