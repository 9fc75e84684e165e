use comms::specs::{cluster::ClusterSpec, server::ShardRange};

use crate::{ClusterResolver, FixedShardsPartitioner};

/// The parameter-server distribution strategy.
///
/// Variables are sharded across the cluster's parameter servers by the
/// partitioner; training steps run asynchronously, one worker per step, so a
/// single replica is in sync at any time.
#[derive(Debug, Clone)]
pub struct ParameterServerStrategy {
    resolver: ClusterResolver,
    partitioner: FixedShardsPartitioner,
}

impl ParameterServerStrategy {
    /// Creates a new `ParameterServerStrategy`.
    ///
    /// # Arguments
    /// * `resolver` - The resolved cluster topology.
    /// * `partitioner` - How to shard the flat parameter vector.
    pub fn new(resolver: ClusterResolver, partitioner: FixedShardsPartitioner) -> Self {
        Self {
            resolver,
            partitioner,
        }
    }

    /// The amount of replicas whose updates are synchronized per step.
    ///
    /// Asynchronous parameter-server training dispatches every step to one
    /// worker, so this is always one regardless of cluster size.
    pub fn num_replicas_in_sync(&self) -> usize {
        1
    }

    pub fn cluster(&self) -> &ClusterSpec {
        self.resolver.cluster()
    }

    pub fn resolver(&self) -> &ClusterResolver {
        &self.resolver
    }

    /// Shards `total` parameters across the cluster's parameter servers.
    pub fn partition(&self, total: usize) -> Vec<ShardRange> {
        self.partitioner.partition(total)
    }
}
