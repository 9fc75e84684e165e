use ndarray::{ArrayView2, ArrayViewMut2};

use super::{Conv2d, Dense, Flatten, MaxPool2d};
use crate::Result;

/// A layer of a sequential model.
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Flatten(Flatten),
    Dense(Dense),
}

impl Layer {
    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Layer::Conv2d(layer) => layer.size(),
            Layer::MaxPool2d(layer) => layer.size(),
            Layer::Flatten(layer) => layer.size(),
            Layer::Dense(layer) => layer.size(),
        }
    }

    /// Makes a forward pass through this layer.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the flat parameter vector.
    /// * `x` - The input activations, one row per sample.
    pub fn forward<'a>(
        &'a mut self,
        params: &'a [f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        match self {
            Layer::Conv2d(layer) => layer.forward(params, x),
            Layer::MaxPool2d(layer) => layer.forward(params, x),
            Layer::Flatten(layer) => layer.forward(params, x),
            Layer::Dense(layer) => layer.forward(params, x),
        }
    }

    /// Propagates `d` backward through this layer.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the flat parameter vector.
    /// * `grad` - This layer's slice of the flat gradient buffer.
    /// * `d` - The loss delta with respect to this layer's outputs.
    pub fn backward<'a>(
        &'a mut self,
        params: &'a [f32],
        grad: &'a mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        match self {
            Layer::Conv2d(layer) => layer.backward(params, grad, d),
            Layer::MaxPool2d(layer) => layer.backward(params, grad, d),
            Layer::Flatten(layer) => layer.backward(params, grad, d),
            Layer::Dense(layer) => layer.backward(params, grad, d),
        }
    }
}
