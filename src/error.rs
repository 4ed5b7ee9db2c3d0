use std::fmt;

/// The four error signals the engine surfaces at its boundaries. Never
/// thrown, always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DbException,
    TransactionAborted,
    IoError,
    IllegalArgument,
}

#[derive(Debug, Clone)]
pub struct SmallError {
    kind: ErrorKind,
    details: String,
}

impl SmallError {
    pub fn new(kind: ErrorKind, msg: &str) -> SmallError {
        SmallError {
            kind,
            details: msg.to_string(),
        }
    }

    pub fn db_exception(msg: &str) -> SmallError {
        SmallError::new(ErrorKind::DbException, msg)
    }

    pub fn transaction_aborted(msg: &str) -> SmallError {
        SmallError::new(ErrorKind::TransactionAborted, msg)
    }

    pub fn io_error(msg: &str) -> SmallError {
        SmallError::new(ErrorKind::IoError, msg)
    }

    pub fn illegal_argument(msg: &str) -> SmallError {
        SmallError::new(ErrorKind::IllegalArgument, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.details)
    }
}

impl std::error::Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::io_error(&e.to_string())
    }
}

/// Result alias used for mutations that don't otherwise return a value.
pub type SmallResult = Result<(), SmallError>;
