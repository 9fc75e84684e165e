use ndarray::{ArrayView1, ArrayView2};

/// Counts how many logit rows put their largest value on the labeled class.
///
/// Ties resolve to the first maximum.
pub fn correct_predictions(logits: ArrayView2<f32>, labels: ArrayView1<u32>) -> u64 {
    logits
        .outer_iter()
        .zip(&labels)
        .filter(|&(ref row, &label)| {
            let argmax = row
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 { (i, v) } else { best }
                })
                .0;

            argmax == label as usize
        })
        .count() as u64
}

/// Running accuracy over integer class labels.
///
/// Workers report raw counts per step; the coordinator merges them here so
/// the metric behaves as one value across replicas.
#[derive(Debug, Default, Clone, Copy)]
pub struct SparseCategoricalAccuracy {
    correct: u64,
    seen: u64,
}

impl SparseCategoricalAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the running counts at an epoch boundary.
    pub fn reset_states(&mut self) {
        *self = Self::default();
    }

    /// Folds one step's counts into the running totals.
    pub fn merge(&mut self, correct: u64, seen: u64) {
        self.correct += correct;
        self.seen += seen;
    }

    /// The running accuracy, or `0.0` before any update.
    pub fn result(&self) -> f32 {
        if self.seen == 0 {
            0.0
        } else {
            self.correct as f32 / self.seen as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_argmax_hits() {
        let logits = ndarray::array![[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]];
        let labels = ndarray::array![1_u32, 0, 0];
        assert_eq!(correct_predictions(logits.view(), labels.view()), 2);
    }

    #[test]
    fn merges_and_resets() {
        let mut acc = SparseCategoricalAccuracy::new();
        assert_eq!(acc.result(), 0.0);

        acc.merge(3, 4);
        acc.merge(1, 4);
        assert!((acc.result() - 0.5).abs() < 1e-6);

        acc.reset_states();
        assert_eq!(acc.result(), 0.0);
    }
}
