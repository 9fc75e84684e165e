use ndarray::{Array1, Array2};

use crate::{MlErr, Result};

/// An in-memory supervised dataset: one flat image row per sample plus one
/// integer class label each.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    images: Array2<f32>,
    labels: Array1<u32>,
    sample_shape: (usize, usize, usize),
}

impl InMemoryDataset {
    /// Creates a new dataset from owned arrays.
    ///
    /// # Arguments
    /// * `images` - One row per sample, `height * width * channels` wide.
    /// * `labels` - One class label per sample.
    /// * `sample_shape` - The `(height, width, channels)` shape of one sample.
    ///
    /// # Returns
    /// The dataset, or an error on empty or mismatched inputs.
    pub fn new(
        images: Array2<f32>,
        labels: Array1<u32>,
        sample_shape: (usize, usize, usize),
    ) -> Result<Self> {
        let (h, w, c) = sample_shape;

        if images.nrows() == 0 {
            return Err(MlErr::Dataset("dataset must be non-empty".to_string()));
        }

        if images.ncols() != h * w * c {
            return Err(MlErr::SizeMismatch {
                a: "images",
                b: "sample shape",
                got: images.ncols(),
                expected: h * w * c,
            });
        }

        if images.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                a: "images",
                b: "labels",
                got: images.nrows(),
                expected: labels.len(),
            });
        }

        Ok(Self {
            images,
            labels,
            sample_shape,
        })
    }

    /// Creates a new dataset from flat buffers.
    pub fn from_flat(
        images: &[f32],
        labels: &[u32],
        sample_shape: (usize, usize, usize),
    ) -> Result<Self> {
        let (h, w, c) = sample_shape;
        let features = h * w * c;

        if features == 0 || images.len() % features != 0 {
            return Err(MlErr::Dataset(format!(
                "{} pixels do not divide into {features}-feature samples",
                images.len()
            )));
        }

        let rows = images.len() / features;
        // SAFETY: The length check above guarantees the shape.
        let images = Array2::from_shape_vec((rows, features), images.to_vec()).unwrap();

        Self::new(images, Array1::from_vec(labels.to_vec()), sample_shape)
    }

    pub fn len(&self) -> usize {
        self.images.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.images.nrows() == 0
    }

    /// The amount of features of one flat sample.
    pub fn features(&self) -> usize {
        self.images.ncols()
    }

    pub fn sample_shape(&self) -> (usize, usize, usize) {
        self.sample_shape
    }

    pub fn images(&self) -> &Array2<f32> {
        &self.images
    }

    pub fn labels(&self) -> &Array1<u32> {
        &self.labels
    }
}
