use comms::specs::worker::{LossSpec, WorkerSpec};
use machine_learning::{
    arch::{self, Model, loss::SparseCategoricalCrossentropy},
    data::{self, BatchIter},
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Result, ShardClient, Worker, WorkerErr, worker::ComputeState};

/// Builds `Worker` instances out of their wire specifications.
#[derive(Default)]
pub struct WorkerBuilder;

impl WorkerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Materializes the model and dataset and checks the shard map against
    /// them.
    ///
    /// # Arguments
    /// * `spec` - The worker bootstrap specification.
    /// * `clients` - One connected shard client per `spec.servers` entry, in
    ///   the same order.
    ///
    /// # Returns
    /// A ready `Worker`, or an error if the spec is inconsistent.
    pub fn build<R, W>(
        &self,
        spec: WorkerSpec,
        clients: Vec<ShardClient<R, W>>,
    ) -> Result<Worker<R, W>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let model = arch::build(&spec.model)?;
        let size = model.size();

        Self::check_shard_map(&spec, &clients, size)?;

        let dataset = data::from_spec(&spec.dataset)?;
        let batches = BatchIter::new(dataset, spec.batch_size, spec.seed);

        let loss_fn = match spec.loss {
            LossSpec::SparseCategoricalCrossentropy => SparseCategoricalCrossentropy::new(),
        };

        let state = ComputeState {
            model,
            loss_fn,
            batches,
            params: vec![0.; size],
            grads: vec![0.; size],
        };

        Ok(Worker::new(
            spec.worker_id,
            spec.batch_size,
            state,
            clients,
        ))
    }

    /// The shard map must tile `0..size` in order, one client per shard.
    fn check_shard_map<R, W>(
        spec: &WorkerSpec,
        clients: &[ShardClient<R, W>],
        size: usize,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if spec.servers.len() != clients.len() {
            return Err(WorkerErr::BadShardMap {
                reason: format!(
                    "{} shard(s) in the spec but {} client(s) connected",
                    spec.servers.len(),
                    clients.len()
                ),
            });
        }

        let mut covered = 0;
        for (shard, (assignment, client)) in spec.servers.iter().zip(clients).enumerate() {
            if assignment.range.start != covered {
                return Err(WorkerErr::BadShardMap {
                    reason: format!(
                        "shard {shard} starts at {} instead of {covered}",
                        assignment.range.start
                    ),
                });
            }

            if assignment.range.len() != client.len() {
                return Err(WorkerErr::BadShardMap {
                    reason: format!(
                        "shard {shard} client holds {} parameters, assignment says {}",
                        client.len(),
                        assignment.range.len()
                    ),
                });
            }

            covered = assignment.range.end;
        }

        if covered != size {
            return Err(WorkerErr::BadShardMap {
                reason: format!("shards cover {covered} of {size} parameters"),
            });
        }

        Ok(())
    }
}
