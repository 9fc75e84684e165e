use std::num::NonZeroUsize;

use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::InMemoryDataset;

/// An infinite, shuffled, batched view over an in-memory dataset.
///
/// The index permutation is reshuffled whenever a pass over the data runs out
/// of full batches; restarting the sequence means recreating the iterator.
#[derive(Debug)]
pub struct BatchIter {
    dataset: InMemoryDataset,
    order: Vec<usize>,
    cursor: usize,
    batch_size: usize,
    rng: StdRng,
}

impl BatchIter {
    /// Creates a new `BatchIter`.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to draw from.
    /// * `batch_size` - Wanted batch size, capped at the dataset length.
    /// * `seed` - Optional seed for a deterministic shuffle order.
    pub fn new(dataset: InMemoryDataset, batch_size: NonZeroUsize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut order: Vec<_> = (0..dataset.len()).collect();
        order.shuffle(&mut rng);

        Self {
            batch_size: batch_size.get().min(dataset.len()),
            dataset,
            order,
            cursor: 0,
            rng,
        }
    }

    pub fn dataset(&self) -> &InMemoryDataset {
        &self.dataset
    }

    /// Draws the next batch, one image row and one label per sample.
    pub fn next_batch(&mut self) -> (Array2<f32>, Array1<u32>) {
        if self.cursor + self.batch_size > self.order.len() {
            self.order.shuffle(&mut self.rng);
            self.cursor = 0;
        }

        let picks = &self.order[self.cursor..self.cursor + self.batch_size];
        self.cursor += self.batch_size;

        let images = self.dataset.images();
        let labels = self.dataset.labels();

        let mut batch_images = Array2::zeros((picks.len(), self.dataset.features()));
        let mut batch_labels = Array1::zeros(picks.len());

        for (slot, &pick) in picks.iter().enumerate() {
            batch_images.row_mut(slot).assign(&images.row(pick));
            batch_labels[slot] = labels[pick];
        }

        (batch_images, batch_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> InMemoryDataset {
        let images: Vec<f32> = (0..n * 4).map(|i| i as f32).collect();
        let labels: Vec<u32> = (0..n as u32).collect();
        InMemoryDataset::from_flat(&images, &labels, (2, 2, 1)).unwrap()
    }

    #[test]
    fn batches_are_infinite_and_full_sized() {
        let mut it = BatchIter::new(dataset(10), NonZeroUsize::new(3).unwrap(), Some(7));

        for _ in 0..20 {
            let (images, labels) = it.next_batch();
            assert_eq!(images.dim(), (3, 4));
            assert_eq!(labels.len(), 3);
        }
    }

    #[test]
    fn one_pass_has_no_repeats() {
        let mut it = BatchIter::new(dataset(9), NonZeroUsize::new(3).unwrap(), Some(7));

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let (_, labels) = it.next_batch();
            for &label in &labels {
                assert!(seen.insert(label), "label {label} drawn twice in one pass");
            }
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn seeded_iterators_agree() {
        let mut a = BatchIter::new(dataset(8), NonZeroUsize::new(4).unwrap(), Some(42));
        let mut b = BatchIter::new(dataset(8), NonZeroUsize::new(4).unwrap(), Some(42));

        for _ in 0..6 {
            assert_eq!(a.next_batch().1, b.next_batch().1);
        }
    }

    #[test]
    fn rows_travel_with_their_labels() {
        let mut it = BatchIter::new(dataset(5), NonZeroUsize::new(5).unwrap(), Some(1));
        let (images, labels) = it.next_batch();

        for (row, &label) in images.outer_iter().zip(&labels) {
            assert_eq!(row[0], label as f32 * 4.0);
        }
    }

    #[test]
    fn oversized_batch_is_capped_at_dataset_len() {
        let mut it = BatchIter::new(dataset(3), NonZeroUsize::new(64).unwrap(), Some(1));
        let (images, _) = it.next_batch();
        assert_eq!(images.nrows(), 3);
    }
}
