use std::num::NonZeroUsize;

use ndarray::{ArrayView1, ArrayView2};

use crate::{Result, arch::loss::LossFn};

/// What one training step produced.
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    /// Per-example losses summed and divided by the global batch size.
    pub loss: f32,
    /// Amount of argmax predictions that hit their label.
    pub correct: u64,
    /// Amount of examples in the batch.
    pub seen: u64,
}

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Computes the gradient of the averaged loss over one batch.
    ///
    /// The parameters are read-only; applying the gradient is the parameter
    /// servers' job. `grad` is zeroed and filled in full.
    ///
    /// # Arguments
    /// * `params` - The model's flat parameters.
    /// * `grad` - A buffer for the computed gradient, one entry per parameter.
    /// * `loss_fn` - The per-example loss function.
    /// * `images` - One batch of inputs, one row per sample.
    /// * `labels` - One integer class label per sample.
    /// * `global_batch` - The batch size the summed loss is divided by.
    ///
    /// # Returns
    /// The step's loss and accuracy counts.
    fn train_step<L: LossFn>(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        loss_fn: &L,
        images: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        global_batch: NonZeroUsize,
    ) -> Result<StepStats>;
}
