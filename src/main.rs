mod cli;

use std::{env, io, num::NonZeroUsize};

use clap::Parser;
use comms::specs::{
    cluster::{self, ClusterConfig, ClusterSpec, TaskType},
    server::OptimizerSpec,
    worker::{ActFnSpec, DatasetSpec, InputSpec, LayerSpec, LossSpec, ModelSpec},
};
use coordinator::{
    ClusterCoordinator, ClusterResolver, FixedShardsPartitioner, ParameterServerStrategy, TrainJob,
};
use log::info;
use machine_learning::data::fashion_mnist;
use tokio::{net::TcpListener, runtime::Runtime, signal};

use crate::cli::Cli;

const EPOCHS: usize = 10;
const BATCH_SIZE_PER_REPLICA: usize = 64;

fn main() -> io::Result<()> {
    env_logger::init();

    let args = Cli::parse();
    let task_type = TaskType::from_role(&args.task_type);

    let cluster = ClusterSpec::from_host_lists(&args.worker_hosts, &args.ps_hosts)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let config = ClusterConfig::new(cluster, task_type, args.task_index)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let json = config
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: No other threads exist yet; the runtimes spawn below.
    unsafe {
        env::set_var(cluster::CONFIG_ENV, json);
        env::set_var(comms::FAIL_FAST_ENV, "use_caller");
    }

    info!(
        "run {} starting as {} {}",
        args.run_id, config.task.task_type, config.task.index
    );

    match config.task.task_type {
        TaskType::Worker | TaskType::Ps => run_server(&config),
        TaskType::Chief => run_coordinator(),
    }
}

/// Serves the worker or parameter-server role until the process is killed.
fn run_server(config: &ClusterConfig) -> io::Result<()> {
    let addr = config.task_addr().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "server role without a host entry")
    })?;

    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "{} {} listening at {addr}",
            config.task.task_type, config.task.index
        );

        tokio::select! {
            ret = serve_role(config.task.task_type, listener) => ret,
            _ = signal::ctrl_c() => {
                info!("received SIGTERM");
                Ok(())
            }
        }
    })
}

async fn serve_role(task_type: TaskType, listener: TcpListener) -> io::Result<()> {
    match task_type {
        TaskType::Ps => parameter_server::serve(listener).await,
        TaskType::Worker => worker::serve(listener).await,
        // The dispatcher above never sends the chief here.
        TaskType::Chief => unreachable!(),
    }
}

/// Drives the training loop as the cluster's coordinator.
fn run_coordinator() -> io::Result<()> {
    let resolver = ClusterResolver::from_env().map_err(io::Error::from)?;
    let num_ps = NonZeroUsize::new(resolver.num_ps()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "cluster has no parameter servers")
    })?;

    let strategy = ParameterServerStrategy::new(resolver, FixedShardsPartitioner::new(num_ps));
    println!("Number of devices: {}", strategy.num_replicas_in_sync());

    let global_batch = BATCH_SIZE_PER_REPLICA * strategy.num_replicas_in_sync();
    let job = TrainJob {
        model: build_model(),
        loss: LossSpec::SparseCategoricalCrossentropy,
        dataset: DatasetSpec::FashionMnist { dir: None },
        optimizer: OptimizerSpec::RmsProp {
            learning_rate: 0.1,
            rho: 0.9,
            epsilon: 1e-7,
        },
        batch_size: NonZeroUsize::new(global_batch)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty global batch"))?,
        seed: None,
    };

    let steps_per_epoch = fashion_mnist::train_len(None)? / BATCH_SIZE_PER_REPLICA;
    let mut coordinator = ClusterCoordinator::new(&strategy, job)?;

    for epoch in 0..EPOCHS {
        coordinator.reset_states();

        for _ in 0..steps_per_epoch {
            coordinator.schedule();
        }

        // Wait at epoch boundaries.
        let stats = coordinator.join()?;
        info!("epoch {epoch}: mean loss {:.6}", stats.mean_loss);
        println!("Finished epoch {epoch}, accuracy is {:.6}.", stats.accuracy);
    }

    coordinator.shutdown()?;
    Ok(())
}

/// The fixed convolutional classifier: two convolution+pool blocks, flatten,
/// two dense layers ending in logits.
fn build_model() -> ModelSpec {
    ModelSpec::Sequential {
        input: InputSpec {
            height: 28,
            width: 28,
            channels: 1,
        },
        layers: vec![
            LayerSpec::Conv2d {
                filters: 32,
                kernel: 3,
                act_fn: Some(ActFnSpec::Relu),
            },
            LayerSpec::MaxPool2d { pool: 2 },
            LayerSpec::Conv2d {
                filters: 64,
                kernel: 3,
                act_fn: Some(ActFnSpec::Relu),
            },
            LayerSpec::MaxPool2d { pool: 2 },
            LayerSpec::Flatten,
            LayerSpec::Dense {
                units: 64,
                act_fn: Some(ActFnSpec::Relu),
            },
            LayerSpec::Dense {
                units: 10,
                act_fn: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::arch;

    use super::*;

    #[test]
    fn global_batch_follows_the_replica_count() {
        // One replica in sync under asynchronous parameter-server training.
        let cluster = ClusterSpec::from_host_lists("w0:1", "p0:2").unwrap();
        let config = ClusterConfig::new(cluster, TaskType::Chief, 0).unwrap();

        let resolver = ClusterResolver::from_config(config);
        let strategy = ParameterServerStrategy::new(
            resolver,
            FixedShardsPartitioner::new(NonZeroUsize::new(1).unwrap()),
        );

        assert_eq!(
            BATCH_SIZE_PER_REPLICA * strategy.num_replicas_in_sync(),
            BATCH_SIZE_PER_REPLICA
        );
    }

    #[test]
    fn the_training_model_is_buildable() {
        let spec = build_model();
        assert_eq!(arch::param_count(&spec).unwrap(), 121_930);
        arch::build(&spec).unwrap();
    }
}
