pub mod activations;
mod builder;
pub mod layers;
pub mod loss;
mod model;
mod sequential;

pub use builder::{build, init_plan, param_count};
pub use model::{Model, StepStats};
pub use sequential::Sequential;
