mod loss_fn;
mod sparse_categorical;

pub use loss_fn::LossFn;
pub use sparse_categorical::SparseCategoricalCrossentropy;
