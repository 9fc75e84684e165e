mod accuracy;

pub use accuracy::{SparseCategoricalAccuracy, correct_predictions};
