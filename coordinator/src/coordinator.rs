use std::{io, num::NonZeroUsize, sync::Arc};

use comms::{
    WireReceiver, WireSender,
    msg::{Command, Msg},
    specs::{
        cluster::ClusterSpec,
        server::{OptimizerSpec, ServerSpec, ShardRange, WeightGenSpec},
        worker::{DatasetSpec, LossSpec, ModelSpec, ShardAssignment, WorkerSpec},
    },
};
use log::{info, warn};
use machine_learning::{arch, metrics::SparseCategoricalAccuracy};
use tokio::{
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    runtime::Runtime,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};

use crate::{CoordinatorError, ParameterServerStrategy};

type NetRx = WireReceiver<OwnedReadHalf>;
type NetTx = WireSender<OwnedWriteHalf>;

/// Everything one training run needs besides the cluster itself.
#[derive(Debug, Clone)]
pub struct TrainJob {
    pub model: ModelSpec,
    pub loss: LossSpec,
    pub dataset: DatasetSpec,
    pub optimizer: OptimizerSpec,
    /// Global batch size of one scheduled step.
    pub batch_size: NonZeroUsize,
    pub seed: Option<u64>,
}

/// What an epoch's joined steps amounted to.
#[derive(Debug, Clone, Copy)]
pub struct EpochStats {
    pub steps: u64,
    pub mean_loss: f32,
    pub accuracy: f32,
}

#[derive(Debug, Clone, Copy)]
struct StepOutcome {
    loss: f32,
    correct: u64,
    seen: u64,
}

type StepResult = Result<StepOutcome, (usize, io::Error)>;

/// Schedules opaque training steps across the cluster's workers.
///
/// `schedule` is fire-and-forget: tickets land on a shared queue that one
/// driver task per worker competes for. `join` blocks until every scheduled
/// step reported back, surfacing the first worker failure.
pub struct ClusterCoordinator {
    runtime: Runtime,
    queue: Option<mpsc::UnboundedSender<u64>>,
    results: mpsc::UnboundedReceiver<StepResult>,
    drivers: Vec<JoinHandle<()>>,
    servers: Vec<(NetRx, NetTx)>,
    metric: SparseCategoricalAccuracy,
    in_flight: usize,
    next_step: u64,
}

impl ClusterCoordinator {
    /// Boots the cluster for one training run.
    ///
    /// Connects to every parameter server and worker of the strategy's
    /// cluster, ships their bootstrap specs and starts the step drivers.
    ///
    /// # Arguments
    /// * `strategy` - The distribution strategy holding the resolved cluster.
    /// * `job` - The model, data and optimizer to train with.
    pub fn new(
        strategy: &ParameterServerStrategy,
        job: TrainJob,
    ) -> Result<Self, CoordinatorError> {
        let total = arch::param_count(&job.model)?;
        let plan = arch::init_plan(&job.model)?;
        let ranges = strategy.partition(total);
        let cluster = strategy.cluster();

        info!(
            "sharding {total} parameters across {} server(s) for {} worker(s)",
            cluster.num_ps(),
            cluster.num_workers()
        );

        let runtime = Runtime::new()?;
        let servers =
            runtime.block_on(Self::create_servers(cluster, &ranges, total, &plan, &job))?;
        let workers = runtime.block_on(Self::create_workers(cluster, &ranges, &job))?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let drivers = workers
            .into_iter()
            .enumerate()
            .map(|(worker_id, (rx, tx))| {
                runtime.spawn(drive_worker(
                    worker_id,
                    rx,
                    tx,
                    Arc::clone(&queue_rx),
                    results_tx.clone(),
                ))
            })
            .collect();

        Ok(Self {
            runtime,
            queue: Some(queue_tx),
            results: results_rx,
            drivers,
            servers,
            metric: SparseCategoricalAccuracy::new(),
            in_flight: 0,
            next_step: 0,
        })
    }

    /// Clears the accuracy metric at an epoch boundary.
    pub fn reset_states(&mut self) {
        self.metric.reset_states();
    }

    /// The running accuracy over everything joined since the last reset.
    pub fn accuracy(&self) -> f32 {
        self.metric.result()
    }

    /// Queues one training step; whichever worker frees up first takes it.
    pub fn schedule(&mut self) {
        let step = self.next_step;
        self.next_step += 1;
        self.in_flight += 1;

        if let Some(queue) = &self.queue {
            // The drivers hold the receiving end for the coordinator's whole
            // lifetime, so this only fails after shutdown.
            let _ = queue.send(step);
        }
    }

    /// Blocks until every scheduled step completed.
    ///
    /// # Returns
    /// The epoch's merged stats, or the first failure a worker reported.
    pub fn join(&mut self) -> Result<EpochStats, CoordinatorError> {
        let mut first_err = None;
        let mut loss_sum = 0.0;
        let mut steps = 0;

        let handle = self.runtime.handle().clone();
        handle.block_on(async {
            while self.in_flight > 0 {
                match self.results.recv().await {
                    Some(Ok(outcome)) => {
                        self.in_flight -= 1;
                        loss_sum += outcome.loss;
                        steps += 1;
                        self.metric.merge(outcome.correct, outcome.seen);
                    }
                    Some(Err((worker_id, e))) => {
                        self.in_flight -= 1;
                        warn!("worker {worker_id} failed: {e}");

                        if first_err.is_none() {
                            first_err = Some(CoordinatorError::WorkerFailed {
                                worker_id,
                                msg: e.to_string(),
                            });
                        }
                    }
                    None => {
                        if first_err.is_none() {
                            first_err = Some(CoordinatorError::AllWorkersDisconnected);
                        }
                        break;
                    }
                }
            }
        });

        if let Some(e) = first_err {
            return Err(e);
        }

        Ok(EpochStats {
            steps,
            mean_loss: if steps > 0 {
                loss_sum / steps as f32
            } else {
                0.0
            },
            accuracy: self.metric.result(),
        })
    }

    /// Winds the cluster down: drains the drivers and disconnects the servers.
    ///
    /// Server processes keep listening for their next session; only this
    /// run's connections are closed.
    pub fn shutdown(mut self) -> Result<(), CoordinatorError> {
        // Closing the queue lets every driver drain out and disconnect its
        // worker.
        self.queue = None;

        let drivers = std::mem::take(&mut self.drivers);
        let mut servers = std::mem::take(&mut self.servers);

        self.runtime.block_on(async move {
            for driver in drivers {
                let _ = driver.await;
            }

            for (_, tx) in &mut servers {
                tx.send(&Msg::Control(Command::Disconnect)).await?;
            }

            Ok::<_, io::Error>(())
        })?;

        Ok(())
    }

    async fn create_servers(
        cluster: &ClusterSpec,
        ranges: &[ShardRange],
        total: usize,
        plan: &[WeightGenSpec],
        job: &TrainJob,
    ) -> Result<Vec<(NetRx, NetTx)>, CoordinatorError> {
        let mut channels = Vec::with_capacity(cluster.num_ps());

        for (addr, &range) in cluster.ps.iter().zip(ranges) {
            let (rx, mut tx) = Self::open_channel(addr).await?;

            let spec = ServerSpec {
                workers: cluster.num_workers(),
                range,
                total_params: total,
                init: plan.to_vec(),
                optimizer: job.optimizer,
                seed: job.seed,
            };

            tx.send(&Msg::Control(Command::CreateServer(spec))).await?;
            channels.push((rx, tx));
        }

        Ok(channels)
    }

    async fn create_workers(
        cluster: &ClusterSpec,
        ranges: &[ShardRange],
        job: &TrainJob,
    ) -> Result<Vec<(NetRx, NetTx)>, CoordinatorError> {
        let servers: Vec<_> = cluster
            .ps
            .iter()
            .zip(ranges)
            .map(|(addr, &range)| ShardAssignment {
                addr: addr.clone(),
                range,
            })
            .collect();

        let mut channels = Vec::with_capacity(cluster.num_workers());

        for (worker_id, addr) in cluster.worker.iter().enumerate() {
            let (rx, mut tx) = Self::open_channel(addr).await?;

            let spec = WorkerSpec {
                worker_id,
                model: job.model.clone(),
                loss: job.loss,
                servers: servers.clone(),
                dataset: job.dataset.clone(),
                batch_size: job.batch_size,
                // Decorrelate the workers' shuffles while keeping them
                // reproducible from one run seed.
                seed: job.seed.map(|seed| seed.wrapping_add(worker_id as u64)),
            };

            tx.send(&Msg::Control(Command::CreateWorker(spec))).await?;
            channels.push((rx, tx));
        }

        Ok(channels)
    }

    /// Creates a communication channel with some node through its network address.
    async fn open_channel(addr: &str) -> Result<(NetRx, NetTx), CoordinatorError> {
        let stream =
            comms::connect(addr)
                .await
                .map_err(|source| CoordinatorError::ConnectionFailed {
                    addr: addr.to_string(),
                    source,
                })?;

        let (rx, tx) = stream.into_split();
        Ok(comms::channel(rx, tx))
    }
}

/// Competes for step tickets and runs them against one worker.
async fn drive_worker(
    worker_id: usize,
    mut rx: NetRx,
    mut tx: NetTx,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<u64>>>,
    results: mpsc::UnboundedSender<StepResult>,
) {
    loop {
        let ticket = queue.lock().await.recv().await;
        let Some(step) = ticket else { break };

        match run_step(&mut rx, &mut tx, step).await {
            Ok(outcome) => {
                if results.send(Ok(outcome)).is_err() {
                    break;
                }
            }
            Err(e) => {
                // The ticket was consumed, so it must be accounted for; the
                // remaining queue drains onto the surviving workers.
                let _ = results.send(Err((worker_id, e)));
                break;
            }
        }
    }

    let _ = tx.send(&Msg::Control(Command::Disconnect)).await;
}

async fn run_step(rx: &mut NetRx, tx: &mut NetTx, step: u64) -> io::Result<StepOutcome> {
    tx.send(&Msg::Control(Command::RunStep { step })).await?;

    loop {
        match rx.recv().await? {
            Msg::Control(Command::StepDone {
                step: done,
                loss,
                correct,
                seen,
            }) => {
                if done != step {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("worker answered step {done} while {step} was running"),
                    ));
                }

                return Ok(StepOutcome {
                    loss,
                    correct,
                    seen,
                });
            }
            Msg::Err(e) => return Err(io::Error::other(e.into_owned())),
            msg => warn!("unexpected message: {msg:?}"),
        }
    }
}
