use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::LossFn;
use crate::{MlErr, Result};

/// Cross-entropy between integer class labels and unnormalized logits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseCategoricalCrossentropy;

impl SparseCategoricalCrossentropy {
    pub fn new() -> Self {
        Self
    }

    fn check(logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> Result<()> {
        if logits.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                a: "logits",
                b: "labels",
                got: logits.nrows(),
                expected: labels.len(),
            });
        }

        let classes = logits.ncols();
        labels
            .iter()
            .enumerate()
            .try_for_each(|(index, &label)| match (label as usize) < classes {
                true => Ok(()),
                false => Err(MlErr::BadLabel {
                    index,
                    label,
                    classes,
                }),
            })
    }

    /// The shifted log-sum-exp of one logit row.
    fn log_sum_exp(row: ArrayView1<f32>) -> f32 {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let sum: f32 = row.iter().map(|&v| (v - max).exp()).sum();
        max + sum.ln()
    }
}

impl LossFn for SparseCategoricalCrossentropy {
    fn per_example(&self, logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> Result<Array1<f32>> {
        Self::check(logits, labels)?;

        let losses = logits
            .outer_iter()
            .zip(&labels)
            .map(|(row, &label)| Self::log_sum_exp(row) - row[label as usize])
            .collect();

        Ok(Array1::from_vec(losses))
    }

    fn loss_prime(
        &self,
        logits: ArrayView2<f32>,
        labels: ArrayView1<u32>,
        scale: f32,
    ) -> Result<Array2<f32>> {
        Self::check(logits, labels)?;

        let mut d = Array2::zeros(logits.dim());

        for ((mut d_row, row), &label) in d.outer_iter_mut().zip(logits.outer_iter()).zip(&labels) {
            let lse = Self::log_sum_exp(row);

            // softmax - onehot, scaled.
            d_row.zip_mut_with(&row, |d, &v| *d = (v - lse).exp() * scale);
            d_row[label as usize] -= scale;
        }

        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_lose_ln_classes() {
        let loss = SparseCategoricalCrossentropy::new();
        let logits = ndarray::array![[0., 0., 0., 0.]];
        let labels = ndarray::array![2_u32];

        let per_example = loss.per_example(logits.view(), labels.view()).unwrap();
        assert!((per_example[0] - 4.0_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn confident_correct_logit_loses_little() {
        let loss = SparseCategoricalCrossentropy::new();
        let logits = ndarray::array![[10., 0., 0.]];
        let labels = ndarray::array![0_u32];

        let per_example = loss.per_example(logits.view(), labels.view()).unwrap();
        assert!(per_example[0] < 1e-3);
    }

    #[test]
    fn prime_rows_sum_to_zero() {
        let loss = SparseCategoricalCrossentropy::new();
        let logits = ndarray::array![[1., -2., 0.5], [3., 3., 3.]];
        let labels = ndarray::array![2_u32, 0];

        let d = loss.loss_prime(logits.view(), labels.view(), 1.0).unwrap();
        for row in d.outer_iter() {
            assert!(row.sum().abs() < 1e-6);
        }
    }

    #[test]
    fn prime_scale_divides_by_global_batch() {
        let loss = SparseCategoricalCrossentropy::new();
        let logits = ndarray::array![[1., 2.]];
        let labels = ndarray::array![0_u32];

        let full = loss.loss_prime(logits.view(), labels.view(), 1.0).unwrap();
        let scaled = loss.loss_prime(logits.view(), labels.view(), 0.25).unwrap();
        assert!((full[[0, 0]] * 0.25 - scaled[[0, 0]]).abs() < 1e-7);
    }

    #[test]
    fn rejects_out_of_range_label() {
        let loss = SparseCategoricalCrossentropy::new();
        let logits = ndarray::array![[1., 2.]];
        let labels = ndarray::array![2_u32];
        assert!(loss.per_example(logits.view(), labels.view()).is_err());
    }
}
