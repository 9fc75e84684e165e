mod shard;

pub use shard::ShardState;
