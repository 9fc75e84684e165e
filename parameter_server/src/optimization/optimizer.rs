use std::{
    error::Error,
    fmt::{self, Display},
};

/// The gradient and parameter slices handed to an optimizer differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr;

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gradient and parameter slices differ in length")
    }
}

impl Error for SizeMismatchErr {}

/// An optimization algorithm updating parameters in place from a gradient.
pub trait Optimizer {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr>;
}
