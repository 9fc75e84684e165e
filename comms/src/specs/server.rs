use serde::{Deserialize, Serialize};

/// The specification for the `Distribution` trait.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    Uniform { low: f32, high: f32 },
    GlorotUniform { fan_in: usize, fan_out: usize },
}

/// The specification for the `WeightGen` trait.
///
/// A list of these describes the full flat parameter stream of a model, one
/// entry per parameter tensor, so any shard of it can be regenerated
/// deterministically from a shared seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightGenSpec {
    Const {
        value: f32,
        limit: usize,
    },
    Rand {
        distribution: DistributionSpec,
        limit: usize,
    },
}

impl WeightGenSpec {
    /// The amount of parameters this entry generates.
    pub fn limit(&self) -> usize {
        match self {
            Self::Const { limit, .. } | Self::Rand { limit, .. } => *limit,
        }
    }
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    RmsProp {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
}

/// A contiguous slice of the flat parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRange {
    pub start: usize,
    pub end: usize,
}

impl ShardRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Wire-level bootstrap specification for a parameter server instance.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Number of workers that will connect to this server.
    pub workers: usize,
    /// The shard of the flat parameter vector this server owns.
    pub range: ShardRange,
    /// Total parameter count of the model being sharded.
    pub total_params: usize,
    /// Initialization plan for the full parameter stream.
    pub init: Vec<WeightGenSpec>,
    /// The optimizer applied to pushed gradients.
    pub optimizer: OptimizerSpec,
    /// Optional seed for deterministic initialization.
    pub seed: Option<u64>,
}
