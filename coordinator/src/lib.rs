mod coordinator;
mod error;
mod partition;
mod resolver;
mod strategy;

pub use coordinator::{ClusterCoordinator, EpochStats, TrainJob};
pub use error::CoordinatorError;
pub use partition::FixedShardsPartitioner;
pub use resolver::ClusterResolver;
pub use strategy::ParameterServerStrategy;
