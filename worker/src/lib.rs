mod builder;
mod error;
mod metrics;
mod net;
mod serve;
mod worker;

pub use builder::WorkerBuilder;
pub use error::{Result, WorkerErr};
pub use metrics::WorkerMetrics;
pub use net::ShardClient;
pub use serve::serve;
pub use worker::Worker;
