use rand::RngCore;

use super::WeightGen;

/// A weight generator that always yields the same value, used for biases.
pub struct ConstWeightGen {
    value: f32,
    remaining: usize,
}

impl ConstWeightGen {
    /// Creates a new `ConstWeightGen` weight generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl WeightGen for ConstWeightGen {
    fn sample(&mut self, _rng: &mut dyn RngCore, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;
        Some(vec![self.value; n])
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}
