use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        a: &'static str,
        b: &'static str,
        got: usize,
        expected: usize,
    },
    BadLayer {
        index: usize,
        reason: String,
    },
    BadLabel {
        index: usize,
        label: u32,
        classes: usize,
    },
    NotContiguous {
        what: &'static str,
    },
    Dataset(String),
    Io(io::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                a,
                b,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch between {a} and {b}, got {got} and expected {expected}"
            ),
            MlErr::BadLayer { index, reason } => {
                write!(f, "Layer {index} is misconfigured: {reason}")
            }
            MlErr::BadLabel {
                index,
                label,
                classes,
            } => write!(
                f,
                "Label {label} at position {index} is out of range for {classes} classes"
            ),
            MlErr::NotContiguous { what } => {
                write!(f, "Expected {what} to be a contiguous row-major array")
            }
            MlErr::Dataset(reason) => write!(f, "Bad dataset: {reason}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<MlErr> for io::Error {
    fn from(value: MlErr) -> Self {
        match value {
            MlErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
