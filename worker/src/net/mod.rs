mod client;

pub use client::ShardClient;
