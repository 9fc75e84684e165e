mod builder;
mod pserver;

pub use builder::ServerBuilder;
pub use pserver::PServer;

use std::{borrow::Cow, io};

use comms::msg::{Command, Msg};
use log::{info, warn};
use tokio::net::TcpListener;

/// Serves the parameter-server role forever.
///
/// Each session starts with the coordinator connecting and sending
/// `CreateServer`, after which one connection per worker is accepted. When a
/// session's workers all disconnect the listener goes back to waiting for the
/// next coordinator. There is no graceful shutdown path; the process runs
/// until it is terminated.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    let builder = ServerBuilder::new();

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("coordinator connected from {addr}");

        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let spec = match rx.recv().await {
            Ok(Msg::Control(Command::CreateServer(spec))) => spec,
            Ok(msg) => {
                warn!("expected CreateServer, got {msg:?}");
                continue;
            }
            Err(e) => {
                warn!("io error on control channel: {e}");
                continue;
            }
        };

        let workers = spec.workers;
        let mut pserver = match builder.build(spec) {
            Ok(pserver) => pserver,
            Err(e) => {
                warn!("failed to build server: {e}");
                let _ = tx.send(&Msg::Err(Cow::Owned(e.to_string()))).await;
                continue;
            }
        };

        info!(
            "serving {} parameters to {workers} worker(s)",
            pserver.len()
        );

        for _ in 0..workers {
            let (stream, addr) = listener.accept().await?;
            info!("worker connected from {addr}");

            let (rx, tx) = stream.into_split();
            let (rx, tx) = comms::channel(rx, tx);
            pserver.spawn(rx, tx);
        }

        pserver.run().await?;

        // The coordinator closes the session once every worker is done.
        match rx.recv().await {
            Ok(Msg::Control(Command::Disconnect)) | Err(_) => {}
            Ok(msg) => warn!("unexpected message at session end: {msg:?}"),
        }

        info!("training session finished");
    }
}
