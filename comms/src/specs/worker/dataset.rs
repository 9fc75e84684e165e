use serde::{Deserialize, Serialize};

/// Dataset selection for a worker's local input pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSpec {
    /// Fashion-MNIST IDX files from a local cache directory.
    FashionMnist {
        /// Overrides the default cache directory.
        dir: Option<String>,
    },
    /// In-memory samples, used by tests and small runs.
    Inline {
        /// Flat row-major pixels, one sample per `height * width * channels` chunk.
        images: Vec<f32>,
        labels: Vec<u32>,
        height: usize,
        width: usize,
        channels: usize,
    },
}
