use rand::RngCore;
use rand_distr::{Distribution, Uniform};

use super::{InitErr, WeightGen};

/// A weight generator that follows a certain probabilistic distribution.
pub struct RandWeightGen<D: Distribution<f32>> {
    distribution: D,
    remaining: usize,
}

impl<D: Distribution<f32>> RandWeightGen<D> {
    /// Creates a new `RandWeightGen` weight generator.
    ///
    /// # Arguments
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `limit` - The maximum amount of numbers to generate.
    pub fn new(distribution: D, limit: usize) -> Self {
        Self {
            distribution,
            remaining: limit,
        }
    }
}

impl RandWeightGen<Uniform<f32>> {
    /// Creates a new `RandWeightGen` weight generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An error if the range is invalid (low > high).
    pub fn uniform(limit: usize, low: f32, high: f32) -> Result<Self, InitErr> {
        let distribution =
            Uniform::new(low, high).map_err(|e| InitErr::BadDistribution(e.to_string()))?;

        Ok(Self::new(distribution, limit))
    }

    /// Creates a new `RandWeightGen` weight generator using Glorot uniform
    /// initialization.
    ///
    /// # Arguments
    /// * `limit` - The maximum amount of numbers to generate.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn glorot_uniform(limit: usize, fan_in: usize, fan_out: usize) -> Result<Self, InitErr> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(limit, -range, range)
    }
}

impl<D: Distribution<f32>> WeightGen for RandWeightGen<D> {
    fn sample(&mut self, rng: &mut dyn RngCore, mut n: usize) -> Option<Vec<f32>> {
        if self.remaining == 0 {
            return None;
        }

        n = n.min(self.remaining);
        self.remaining -= n;
        Some((0..n).map(|_| self.distribution.sample(rng)).collect())
    }

    fn remaining(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn glorot_values_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut weight_gen = RandWeightGen::glorot_uniform(100, 8, 8).unwrap();

        let limit = (6.0_f32 / 16.0).sqrt();
        let values = weight_gen.sample(&mut rng, 100).unwrap();
        assert!(values.iter().all(|v| v.abs() <= limit));
    }

    #[test]
    fn generator_runs_dry_at_its_limit() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut weight_gen = RandWeightGen::uniform(3, 0.0, 1.0).unwrap();

        assert_eq!(weight_gen.sample(&mut rng, 2).unwrap().len(), 2);
        assert_eq!(weight_gen.sample(&mut rng, 2).unwrap().len(), 1);
        assert!(weight_gen.sample(&mut rng, 2).is_none());
    }

    #[test]
    fn rejects_inverted_uniform_range() {
        assert!(RandWeightGen::uniform(1, 1.0, -1.0).is_err());
    }
}
