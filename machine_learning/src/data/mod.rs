mod batches;
mod dataset;
pub mod fashion_mnist;

pub use batches::BatchIter;
pub use dataset::InMemoryDataset;

use comms::specs::worker::DatasetSpec;

use crate::Result;

/// Materializes the dataset a worker spec points at.
pub fn from_spec(spec: &DatasetSpec) -> Result<InMemoryDataset> {
    match spec {
        DatasetSpec::FashionMnist { dir } => fashion_mnist::load(dir.as_deref()),
        DatasetSpec::Inline {
            images,
            labels,
            height,
            width,
            channels,
        } => InMemoryDataset::from_flat(images, labels, (*height, *width, *channels)),
    }
}
