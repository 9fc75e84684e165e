use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

pub mod dataset;
pub mod model;

pub use dataset::DatasetSpec;
pub use model::{ActFnSpec, InputSpec, LayerSpec, ModelSpec};

use crate::specs::server::ShardRange;

/// One parameter server a worker must talk to, with the parameter slice it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardAssignment {
    pub addr: String,
    pub range: ShardRange,
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossSpec {
    /// Per-example cross-entropy on logits against integer class labels.
    SparseCategoricalCrossentropy,
}

/// Wire-level bootstrap specification for a worker instance.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Worker identifier assigned by the coordinator.
    pub worker_id: usize,
    /// Model selection and configuration.
    pub model: ModelSpec,
    /// Loss function applied per example.
    pub loss: LossSpec,
    /// Ordered parameter server shard map.
    pub servers: Vec<ShardAssignment>,
    /// Dataset to draw training batches from.
    pub dataset: DatasetSpec,
    /// Global batch size of one training step.
    pub batch_size: NonZeroUsize,
    /// Optional seed for deterministic shuffling.
    pub seed: Option<u64>,
}
