mod initialization;
mod optimization;
mod parameters;
mod service;

pub use initialization::InitErr;
pub use parameters::ShardState;
pub use service::{PServer, ServerBuilder, serve};
