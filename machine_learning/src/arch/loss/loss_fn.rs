use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::Result;

/// A per-example loss over logits and integer class labels.
///
/// Losses stay unreduced here; the caller decides what batch size to average
/// over, which lets a distributed step normalize by the global batch.
pub trait LossFn {
    /// Computes one loss value per example.
    fn per_example(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> Result<Array1<f32>>;

    /// Computes the gradient of the summed per-example loss with respect to
    /// the logits, scaled by `scale`.
    fn loss_prime(
        &self,
        logits: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        scale: f32,
    ) -> Result<Array2<f32>>;
}
