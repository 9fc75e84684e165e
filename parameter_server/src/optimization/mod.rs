mod gradient_descent;
mod optimizer;
mod rms_prop;

pub use gradient_descent::GradientDescent;
pub use optimizer::{Optimizer, SizeMismatchErr};
pub use rms_prop::RmsProp;

use comms::specs::server::OptimizerSpec;

/// Instantiates the optimizer a server spec asks for.
///
/// # Arguments
/// * `spec` - The optimizer selection and hyperparameters.
/// * `len` - The amount of parameters the optimizer state must cover.
pub fn from_spec(spec: OptimizerSpec, len: usize) -> Box<dyn Optimizer + Send> {
    match spec {
        OptimizerSpec::RmsProp {
            learning_rate,
            rho,
            epsilon,
        } => Box::new(RmsProp::new(len, learning_rate, rho, epsilon)),
        OptimizerSpec::GradientDescent { learning_rate } => {
            Box::new(GradientDescent::new(learning_rate))
        }
    }
}
