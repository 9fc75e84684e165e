use std::num::NonZeroUsize;

use comms::specs::server::ShardRange;

/// Splits the flat parameter vector into a fixed amount of contiguous shards,
/// one per parameter server.
#[derive(Debug, Clone, Copy)]
pub struct FixedShardsPartitioner {
    num_shards: NonZeroUsize,
}

impl FixedShardsPartitioner {
    /// Creates a new `FixedShardsPartitioner`.
    ///
    /// # Arguments
    /// * `num_shards` - The amount of shards to partition into.
    pub fn new(num_shards: NonZeroUsize) -> Self {
        Self { num_shards }
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards.get()
    }

    /// Partitions `total` parameters into shard ranges.
    ///
    /// Shards are equally sized up to rounding; the tail may be ragged or
    /// empty when `total` does not divide evenly.
    pub fn partition(&self, total: usize) -> Vec<ShardRange> {
        let n = self.num_shards.get();
        let shard_size = total.div_ceil(n);

        (0..n)
            .map(|i| {
                let start = (i * shard_size).min(total);
                let end = ((i + 1) * shard_size).min(total);
                ShardRange::new(start, end)
            })
            .collect()
    }
}
