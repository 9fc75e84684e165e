use std::num::NonZeroUsize;

use ndarray::{ArrayView1, ArrayView2};

use super::{Model, StepStats, layers::Layer, loss::LossFn};
use crate::{MlErr, Result, metrics};

/// A sequential model: information flows forward when computing an output and
/// backward when computing the *deltas* of its layers.
pub struct Sequential {
    layers: Vec<Layer>,
    size: usize,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        Self { layers, size }
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The model's flat parameters.
    /// * `x` - The input data, one row per sample.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward<'a>(
        &'a mut self,
        params: &'a [f32],
        mut x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        if params.len() != self.size {
            return Err(MlErr::SizeMismatch {
                a: "params",
                b: "model",
                got: params.len(),
                expected: self.size,
            });
        }

        let mut offset = 0;
        for layer in self.layers.iter_mut() {
            let size = layer.size();
            let slice = &params[offset..offset + size];
            offset += size;

            x = layer.forward(slice, x)?;
        }

        Ok(x)
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.size
    }

    fn train_step<L: LossFn>(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        loss_fn: &L,
        images: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        global_batch: NonZeroUsize,
    ) -> Result<StepStats> {
        if grad.len() != self.size {
            return Err(MlErr::SizeMismatch {
                a: "grad",
                b: "model",
                got: grad.len(),
                expected: self.size,
            });
        }

        grad.fill(0.);
        let scale = 1.0 / global_batch.get() as f32;

        let logits = self.forward(params, images)?;
        let loss = loss_fn.per_example(logits, labels)?.sum() * scale;
        let correct = metrics::correct_predictions(logits, labels);
        let mut delta = loss_fn.loss_prime(logits, labels, scale)?;

        let mut d = delta.view_mut();
        let mut p_end = params.len();
        let mut rest = grad;

        for layer in self.layers.iter_mut().rev() {
            let size = layer.size();
            let split = rest.len() - size;
            let (head, layer_grad) = rest.split_at_mut(split);
            rest = head;

            p_end -= size;
            let layer_params = &params[p_end..p_end + size];

            d = layer.backward(layer_params, layer_grad, d)?;
        }

        Ok(StepStats {
            loss,
            correct,
            seen: labels.len() as u64,
        })
    }
}
