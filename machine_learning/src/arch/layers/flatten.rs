use ndarray::{ArrayView2, ArrayViewMut2};

use crate::Result;

/// Marks the transition from spatial feature maps to flat features.
///
/// Activations already flow batch-major with row-major features, so both
/// directions are pass-throughs.
#[derive(Default)]
pub struct Flatten;

impl Flatten {
    pub fn new() -> Self {
        Self
    }

    pub fn size(&self) -> usize {
        0
    }

    pub fn forward<'a>(
        &'a mut self,
        _params: &'a [f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        Ok(x)
    }

    pub fn backward<'a>(
        &'a mut self,
        _params: &'a [f32],
        _grad: &'a mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        Ok(d)
    }
}
