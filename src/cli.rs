use clap::Parser;

/// Launches distributed parameter-server training of a Fashion-MNIST
/// classifier.
///
/// Every process of the cluster runs this same binary; `--task_type` decides
/// whether it serves as a worker, a parameter server, or drives training as
/// the coordinator.
#[derive(Debug, Parser)]
#[command(name = "trainer", version)]
pub struct Cli {
    /// Experiment identifier, echoed into the logs.
    #[arg(long = "run_id", default_value_t = 0)]
    pub run_id: u64,

    /// This task's index within its role's host list.
    #[arg(long = "task_index", default_value_t = 0)]
    pub task_index: usize,

    /// Comma-separated host:port list for the parameter-server role.
    #[arg(long = "ps_hosts")]
    pub ps_hosts: String,

    /// Comma-separated host:port list for the worker role.
    #[arg(long = "worker_hosts")]
    pub worker_hosts: String,

    /// This task's role: `worker` and `ps` serve, anything else coordinates.
    #[arg(long = "task_type", default_value = "chief")]
    pub task_type: String,
}
