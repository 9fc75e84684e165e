use std::{
    error::Error,
    fmt::{self, Display},
};

/// Parameter initialization failures.
#[derive(Debug)]
pub enum InitErr {
    /// A random distribution could not be constructed from its spec.
    BadDistribution(String),
    /// The initialization plan does not cover the expected parameter count.
    PlanMismatch { got: usize, expected: usize },
    /// The requested shard lies outside the parameter stream.
    RangeOutOfBounds {
        start: usize,
        end: usize,
        total: usize,
    },
}

impl Display for InitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDistribution(reason) => write!(f, "bad distribution: {reason}"),
            Self::PlanMismatch { got, expected } => write!(
                f,
                "initialization plan yields {got} parameters, expected {expected}"
            ),
            Self::RangeOutOfBounds { start, end, total } => write!(
                f,
                "shard range {start}..{end} is out of bounds for {total} parameters"
            ),
        }
    }
}

impl Error for InitErr {}
