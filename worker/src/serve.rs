use std::io;

use comms::msg::{Command, Msg};
use log::{info, warn};
use tokio::net::TcpListener;

use crate::{ShardClient, WorkerBuilder};

/// Serves the worker role forever.
///
/// Each session starts with the coordinator connecting and sending
/// `CreateWorker`; the worker then dials every parameter server in its shard
/// map and executes dispatched steps until the coordinator disconnects. There
/// is no graceful shutdown path; the process runs until it is terminated.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    'sessions: loop {
        let (stream, addr) = listener.accept().await?;
        info!("coordinator connected from {addr}");

        let (rx, tx) = stream.into_split();
        let (mut rx, tx) = comms::channel(rx, tx);

        let mut rx_buf = vec![0_u32; 1024];
        let spec = loop {
            match rx.recv_into(&mut rx_buf).await {
                Ok(Msg::Control(Command::CreateWorker(spec))) => break spec,
                Ok(msg) => warn!("expected CreateWorker, got {msg:?}"),
                Err(e) => {
                    warn!("io error on control channel: {e}");
                    continue 'sessions;
                }
            }
        };

        let mut clients = Vec::with_capacity(spec.servers.len());
        for (shard, assignment) in spec.servers.iter().enumerate() {
            let stream = comms::connect(&assignment.addr).await?;
            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            clients.push(ShardClient::new(rx, tx, shard, assignment.range.len()));
        }

        let worker_id = spec.worker_id;
        let worker = match WorkerBuilder::new().build(spec, clients) {
            Ok(worker) => worker,
            Err(e) => {
                warn!("failed to build worker {worker_id}: {e}");
                continue;
            }
        };

        let metrics = worker.run(rx, tx).await?;
        info!(
            "worker {worker_id} finished after {} step(s) over {} sample(s)",
            metrics.steps, metrics.samples
        );
    }
}
