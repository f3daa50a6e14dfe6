use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Error {
    pub kind: Arc<ErrorKind>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Error {
            kind: Arc::new(kind),
        }
    }

    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Error::new(ErrorKind::MalformedTransaction { field, reason: reason.into() })
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Error::new(ErrorKind::BackendSave(msg.into()))
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config(msg.into()))
    }

    /// Same error with the offending payload appended, for diagnostics.
    pub fn with_payload(&self, payload: &str) -> Self {
        match &*self.kind {
            ErrorKind::MalformedTransaction { field, reason } => Error::new(ErrorKind::MalformedTransaction {
                field: *field,
                reason: format!("{} (payload: {})", reason, payload),
            }),
            other => Error::new(ErrorKind::Unknown(format!("{} (payload: {})", other, payload))),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(*self.kind, ErrorKind::MalformedTransaction { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<std::string::String> for Error {
    fn from(err: std::string::String) -> Error {
        Error::new(ErrorKind::Unknown(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::new(ErrorKind::IO(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::new(ErrorKind::Json(err))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Error {
        Error::new(ErrorKind::JoinError(err))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("{0}")]
    IO(std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(serde_json::Error),
    #[error("{0}")]
    JoinError(tokio::task::JoinError),
    #[error("Malformed transaction, field `{field}` {reason}")]
    MalformedTransaction { field: &'static str, reason: String },
    #[error("Save failed: {0}")]
    BackendSave(String),
    #[error("Notification failed: {0}")]
    Notification(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown error {0}")]
    Unknown(String),
}
