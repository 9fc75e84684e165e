use std::{io, sync::Arc};

use comms::{
    WireReceiver, WireSender,
    msg::{Command, Msg, Payload},
};
use log::warn;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinHandle,
};

use crate::parameters::ShardState;

/// One training session of the parameter-server role.
///
/// Every worker connection gets its own task over the shared shard state, so
/// pulls and pushes from different workers interleave freely.
pub struct PServer {
    state: Arc<ShardState>,
    tasks: Vec<JoinHandle<io::Result<()>>>,
}

impl PServer {
    /// Creates a new `PServer`.
    ///
    /// # Arguments
    /// * `state` - The shard this server owns.
    pub fn new(state: ShardState) -> Self {
        Self {
            state: Arc::new(state),
            tasks: Vec::new(),
        }
    }

    /// The amount of parameters this server holds.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Spawns the handler task for one worker connection.
    pub fn spawn<R, W>(&mut self, rx: WireReceiver<R>, tx: WireSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        self.tasks.push(tokio::spawn(handle_conn(state, rx, tx)));
    }

    /// Runs until every connected worker disconnected.
    pub async fn run(self) -> io::Result<()> {
        for task in self.tasks {
            task.await.map_err(io::Error::other)??;
        }

        Ok(())
    }
}

async fn handle_conn<R, W>(
    state: Arc<ShardState>,
    mut rx: WireReceiver<R>,
    mut tx: WireSender<W>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut weights = Vec::new();

    loop {
        match rx.recv().await {
            Ok(Msg::Control(Command::PullParams)) => {
                state.pull_into(&mut weights);
                tx.send(&Msg::Data(Payload::Weights(&weights))).await?;
            }
            Ok(Msg::Data(Payload::Gradient(grad))) => {
                state
                    .apply(grad)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            }
            Ok(Msg::Control(Command::Disconnect)) => break Ok(()),
            Ok(msg) => warn!("unexpected message: {msg:?}"),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break Ok(()),
            Err(e) => break Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::specs::server::{OptimizerSpec, ServerSpec, ShardRange, WeightGenSpec};
    use tokio::io as tokio_io;

    use super::{super::ServerBuilder, *};

    fn spec() -> ServerSpec {
        ServerSpec {
            workers: 1,
            range: ShardRange::new(0, 4),
            total_params: 4,
            init: vec![WeightGenSpec::Const {
                value: 1.0,
                limit: 4,
            }],
            optimizer: OptimizerSpec::GradientDescent { learning_rate: 1.0 },
            seed: None,
        }
    }

    #[tokio::test]
    async fn serves_pulls_and_applies_pushes() -> io::Result<()> {
        const BUF_SIZE: usize = 4096;

        let mut pserver = ServerBuilder::new().build(spec()).unwrap();

        let (sv_stream, wk_stream) = tokio_io::duplex(BUF_SIZE);
        let (sv_rx, sv_tx) = tokio_io::split(sv_stream);
        let (sv_rx, sv_tx) = comms::channel(sv_rx, sv_tx);
        pserver.spawn(sv_rx, sv_tx);

        let (wk_rx, wk_tx) = tokio_io::split(wk_stream);
        let (mut wk_rx, mut wk_tx) = comms::channel(wk_rx, wk_tx);

        // Initial pull sees the materialized weights.
        wk_tx.send(&Msg::Control(Command::PullParams)).await?;
        match wk_rx.recv().await? {
            Msg::Data(Payload::Weights(w)) => assert_eq!(w, [1.0; 4]),
            other => panic!("unexpected msg: {other:?}"),
        }

        // Push a gradient, then observe the optimizer step.
        let grad = [0.25_f32; 4];
        wk_tx.send(&Msg::Data(Payload::Gradient(&grad))).await?;
        wk_tx.send(&Msg::Control(Command::PullParams)).await?;
        match wk_rx.recv().await? {
            Msg::Data(Payload::Weights(w)) => assert_eq!(w, [0.75; 4]),
            other => panic!("unexpected msg: {other:?}"),
        }

        wk_tx.send(&Msg::Control(Command::Disconnect)).await?;
        pserver.run().await
    }
}
