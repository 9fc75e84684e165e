use std::{fmt, io};

use machine_learning::MlErr;

/// All errors that can occur in the coordinator.
#[derive(Debug)]
pub enum CoordinatorError {
    /// Invalid cluster configuration — caught before connecting.
    InvalidConfig(String),
    /// The model specification could not be realized.
    Model(MlErr),
    /// Failed to connect to a worker or server.
    ConnectionFailed { addr: String, source: io::Error },
    /// A worker produced an unrecoverable error during training.
    WorkerFailed { worker_id: usize, msg: String },
    /// Every worker dropped while steps were still outstanding.
    AllWorkersDisconnected,
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Model(e) => write!(f, "bad model spec: {e}"),
            Self::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            Self::WorkerFailed { worker_id, msg } => {
                write!(f, "worker {worker_id} error: {msg}")
            }
            Self::AllWorkersDisconnected => {
                write!(f, "every worker disconnected with steps outstanding")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoordinatorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<MlErr> for CoordinatorError {
    fn from(e: MlErr) -> Self {
        Self::Model(e)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<CoordinatorError> for io::Error {
    fn from(value: CoordinatorError) -> Self {
        match value {
            CoordinatorError::Io(e) => e,
            other => io::Error::other(other.to_string()),
        }
    }
}
