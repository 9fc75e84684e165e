use std::{io, num::NonZeroUsize};

use comms::{
    WireReceiver, WireSender,
    msg::{Command, Msg},
};
use futures::future::try_join_all;
use log::{debug, warn};
use machine_learning::{
    arch::{Model, Sequential, StepStats, loss::SparseCategoricalCrossentropy},
    data::BatchIter,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task,
};

use crate::{Result, ShardClient, WorkerErr, metrics::WorkerMetrics};

/// Everything one training step touches on the compute side.
///
/// Kept as one movable unit so a step can hop onto the blocking pool without
/// cloning any buffers.
pub(crate) struct ComputeState {
    pub model: Sequential,
    pub loss_fn: SparseCategoricalCrossentropy,
    pub batches: BatchIter,
    pub params: Vec<f32>,
    pub grads: Vec<f32>,
}

impl ComputeState {
    fn run_step(&mut self, global_batch: NonZeroUsize) -> machine_learning::Result<StepStats> {
        let (images, labels) = self.batches.next_batch();

        self.model.train_step(
            &self.params,
            &mut self.grads,
            &self.loss_fn,
            images.view(),
            labels.view(),
            global_batch,
        )
    }
}

/// Executes training steps dispatched by the coordinator.
///
/// Per step: pull current weights from every shard, compute one batch's
/// gradient on the blocking pool, push the per-shard gradient slices, report
/// the step outcome.
pub struct Worker<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    worker_id: usize,
    global_batch: NonZeroUsize,
    state: Option<ComputeState>,
    clients: Vec<ShardClient<R, W>>,
    metrics: WorkerMetrics,
}

impl<R, W> Worker<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) fn new(
        worker_id: usize,
        global_batch: NonZeroUsize,
        state: ComputeState,
        clients: Vec<ShardClient<R, W>>,
    ) -> Self {
        Self {
            worker_id,
            global_batch,
            state: Some(state),
            clients,
            metrics: WorkerMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }

    /// Serves step requests until the coordinator disconnects.
    ///
    /// # Arguments
    /// * `rx`, `tx` - The coordinator control channel.
    ///
    /// # Returns
    /// The session's metrics, or the first unrecoverable error.
    pub async fn run<R2, W2>(
        mut self,
        mut rx: WireReceiver<R2>,
        mut tx: WireSender<W2>,
    ) -> io::Result<WorkerMetrics>
    where
        R2: AsyncRead + Unpin,
        W2: AsyncWrite + Unpin,
    {
        loop {
            match rx.recv().await {
                Ok(Msg::Control(Command::RunStep { step })) => {
                    let stats = self.execute_step().await?;
                    debug!(worker_id = self.worker_id, step = step; "step done");

                    let done = Command::StepDone {
                        step,
                        loss: stats.loss,
                        correct: stats.correct,
                        seen: stats.seen,
                    };
                    tx.send(&Msg::Control(done)).await?;
                }
                Ok(Msg::Control(Command::Disconnect)) => break,
                Ok(msg) => warn!("unexpected message: {msg:?}"),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }

        for client in &mut self.clients {
            client.disconnect().await.map_err(io::Error::from)?;
        }

        Ok(self.metrics)
    }

    /// One full training step: pull, compute, push.
    async fn execute_step(&mut self) -> Result<StepStats> {
        self.pull_weights().await?;

        let state = self.state.take().ok_or_else(|| WorkerErr::BadShardMap {
            reason: "compute state lost by a previous panic".to_string(),
        })?;

        let global_batch = self.global_batch;
        let (state, stats) = task::spawn_blocking(move || {
            let mut state = state;
            let stats = state.run_step(global_batch)?;
            Ok::<_, WorkerErr>((state, stats))
        })
        .await
        .map_err(|e| WorkerErr::Io(io::Error::other(format!("compute join error: {e}"))))??;

        self.state = Some(state);
        self.push_grads().await?;

        self.metrics.bump_step();
        self.metrics.add_samples(stats.seen);
        Ok(stats)
    }

    /// Gathers the full parameter vector, one shard slice per server.
    async fn pull_weights(&mut self) -> Result<()> {
        let state = self.state.as_mut().ok_or_else(|| WorkerErr::BadShardMap {
            reason: "compute state lost by a previous panic".to_string(),
        })?;

        let mut slices = Vec::with_capacity(self.clients.len());
        let mut rest = state.params.as_mut_slice();

        for client in &self.clients {
            let (head, tail) = rest.split_at_mut(client.len());
            slices.push(head);
            rest = tail;
        }

        let pulls = self
            .clients
            .iter_mut()
            .zip(slices)
            .map(|(client, slice)| client.pull_into(slice));

        try_join_all(pulls).await?;
        Ok(())
    }

    /// Scatters the computed gradient back, one shard slice per server.
    async fn push_grads(&mut self) -> Result<()> {
        let state = self.state.as_ref().ok_or_else(|| WorkerErr::BadShardMap {
            reason: "compute state lost by a previous panic".to_string(),
        })?;

        let mut slices = Vec::with_capacity(self.clients.len());
        let mut rest = state.grads.as_slice();

        for client in &self.clients {
            let (head, tail) = rest.split_at(client.len());
            slices.push(head);
            rest = tail;
        }

        let pushes = self
            .clients
            .iter_mut()
            .zip(slices)
            .map(|(client, slice)| client.push_grad(slice));

        try_join_all(pushes).await?;
        Ok(())
    }
}
