mod chained;
mod constant;
mod error;
mod random;

pub use chained::ChainedWeightGen;
pub use constant::ConstWeightGen;
pub use error::InitErr;
pub use random::RandWeightGen;

use comms::specs::server::{DistributionSpec, ShardRange, WeightGenSpec};
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// A generator for a bounded stream of initial parameter values.
pub trait WeightGen {
    /// Samples up to `n` values, or `None` once the generator ran out.
    fn sample(&mut self, rng: &mut dyn RngCore, n: usize) -> Option<Vec<f32>>;

    /// The amount of values this generator can still produce.
    fn remaining(&self) -> usize;
}

/// Instantiates one generator from its wire specification.
pub fn from_spec(spec: &WeightGenSpec) -> Result<Box<dyn WeightGen + Send>, InitErr> {
    match *spec {
        WeightGenSpec::Const { value, limit } => Ok(Box::new(ConstWeightGen::new(value, limit))),
        WeightGenSpec::Rand {
            distribution,
            limit,
        } => match distribution {
            DistributionSpec::Uniform { low, high } => {
                let weight_gen = RandWeightGen::uniform(limit, low, high)?;
                Ok(Box::new(weight_gen))
            }
            DistributionSpec::GlorotUniform { fan_in, fan_out } => {
                let weight_gen = RandWeightGen::glorot_uniform(limit, fan_in, fan_out)?;
                Ok(Box::new(weight_gen))
            }
        },
    }
}

/// Generates this shard's slice of the flat parameter stream.
///
/// The whole stream is regenerated from the shared seed and the shard's range
/// is kept, so every server agrees on the initial model without any parameter
/// exchange.
///
/// # Arguments
/// * `specs` - The initialization plan of the full parameter stream.
/// * `seed` - The shared seed, or `None` for a random initialization.
/// * `range` - The shard to keep.
/// * `total` - The expected length of the full stream.
pub fn materialize(
    specs: &[WeightGenSpec],
    seed: Option<u64>,
    range: ShardRange,
    total: usize,
) -> Result<Vec<f32>, InitErr> {
    let gens = specs
        .iter()
        .map(from_spec)
        .collect::<Result<Vec<_>, _>>()?;

    let mut chain = ChainedWeightGen::new(gens);
    if chain.remaining() != total {
        return Err(InitErr::PlanMismatch {
            got: chain.remaining(),
            expected: total,
        });
    }

    if range.end > total || range.start > range.end {
        return Err(InitErr::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            total,
        });
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let stream = chain.sample(&mut rng, total).unwrap_or_default();
    if stream.len() != total {
        return Err(InitErr::PlanMismatch {
            got: stream.len(),
            expected: total,
        });
    }

    Ok(stream[range.start..range.end].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Vec<WeightGenSpec> {
        vec![
            WeightGenSpec::Rand {
                distribution: DistributionSpec::Uniform { low: -1.0, high: 1.0 },
                limit: 6,
            },
            WeightGenSpec::Const {
                value: 0.0,
                limit: 2,
            },
        ]
    }

    #[test]
    fn shards_agree_with_the_full_stream() {
        let full = materialize(&plan(), Some(3), ShardRange::new(0, 8), 8).unwrap();
        let left = materialize(&plan(), Some(3), ShardRange::new(0, 5), 8).unwrap();
        let right = materialize(&plan(), Some(3), ShardRange::new(5, 8), 8).unwrap();

        assert_eq!(full[..5], left[..]);
        assert_eq!(full[5..], right[..]);
    }

    #[test]
    fn seed_makes_initialization_deterministic() {
        let a = materialize(&plan(), Some(11), ShardRange::new(0, 8), 8).unwrap();
        let b = materialize(&plan(), Some(11), ShardRange::new(0, 8), 8).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn biases_come_out_constant() {
        let full = materialize(&plan(), Some(3), ShardRange::new(6, 8), 8).unwrap();
        assert_eq!(full, [0.0, 0.0]);
    }

    #[test]
    fn rejects_plan_total_mismatch() {
        assert!(matches!(
            materialize(&plan(), Some(3), ShardRange::new(0, 8), 9),
            Err(InitErr::PlanMismatch { got: 8, expected: 9 })
        ));
    }

    #[test]
    fn rejects_out_of_bounds_range() {
        assert!(materialize(&plan(), Some(3), ShardRange::new(4, 9), 8).is_err());
    }

    #[test]
    fn empty_range_yields_no_params() {
        let none = materialize(&plan(), Some(3), ShardRange::new(8, 8), 8).unwrap();
        assert!(none.is_empty());
    }
}
