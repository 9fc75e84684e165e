use comms::{
    WireReceiver, WireSender,
    msg::{Command, Msg, Payload},
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Result, WorkerErr};

/// Client handle for one parameter-server shard.
///
/// Contract: a `PullParams` request is answered with one `Weights` frame;
/// gradient pushes are one-way.
pub struct ShardClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: WireReceiver<R>,
    tx: WireSender<W>,
    shard: usize,
    len: usize,
}

impl<R, W> ShardClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `ShardClient`.
    ///
    /// # Arguments
    /// * `rx`, `tx` - The connection to the shard's server.
    /// * `shard` - The shard's position in the worker's shard map.
    /// * `len` - The amount of parameters the shard owns.
    pub fn new(rx: WireReceiver<R>, tx: WireSender<W>, shard: usize, len: usize) -> Self {
        Self { rx, tx, shard, len }
    }

    /// The amount of parameters this shard owns.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pulls the shard's current weights and copies them into `dst`.
    pub async fn pull_into(&mut self, dst: &mut [f32]) -> Result<()> {
        self.tx.send(&Msg::Control(Command::PullParams)).await?;

        match self.rx.recv().await? {
            Msg::Data(Payload::Weights(w)) => {
                if w.len() != dst.len() {
                    return Err(WorkerErr::WeightsLengthMismatch {
                        shard: self.shard,
                        got: w.len(),
                        expected: dst.len(),
                    });
                }

                dst.copy_from_slice(w);
                Ok(())
            }
            other => Err(WorkerErr::UnexpectedMessage {
                shard: self.shard,
                got: format!("{other:?}"),
            }),
        }
    }

    /// Pushes this shard's slice of the gradient.
    pub async fn push_grad(&mut self, grad: &[f32]) -> Result<()> {
        self.tx.send(&Msg::Data(Payload::Gradient(grad))).await?;
        Ok(())
    }

    /// Tells the server this worker is done.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io;

    use super::*;

    #[tokio::test]
    async fn pull_push_roundtrip_over_duplex() -> Result<()> {
        const PARAMS: usize = 4;
        const BUF_SIZE: usize = 4096;

        let (sv_stream, wk_stream) = io::duplex(BUF_SIZE);

        let (sv_rx, sv_tx) = io::split(sv_stream);
        let (mut sv_rx, mut sv_tx) = comms::channel(sv_rx, sv_tx);

        let (wk_rx, wk_tx) = io::split(wk_stream);
        let (wk_rx, wk_tx) = comms::channel(wk_rx, wk_tx);
        let mut client = ShardClient::new(wk_rx, wk_tx, 0, PARAMS);

        let server = tokio::spawn(async move {
            // Answer one pull, then expect one gradient.
            match sv_rx.recv().await.unwrap() {
                Msg::Control(Command::PullParams) => {}
                other => panic!("unexpected msg: {other:?}"),
            }

            let weights = [1.0_f32, 2.0, 3.0, 4.0];
            sv_tx
                .send(&Msg::Data(Payload::Weights(&weights)))
                .await
                .unwrap();

            match sv_rx.recv().await.unwrap() {
                Msg::Data(Payload::Gradient(g)) => assert_eq!(g, [0.1, 0.2, 0.3, 0.4]),
                other => panic!("unexpected msg: {other:?}"),
            }
        });

        let mut local = [0.0_f32; PARAMS];
        client.pull_into(&mut local).await?;
        assert_eq!(local, [1.0, 2.0, 3.0, 4.0]);

        client.push_grad(&[0.1, 0.2, 0.3, 0.4]).await?;
        server.await.unwrap();

        Ok(())
    }

    #[tokio::test]
    async fn rejects_short_weights() {
        const BUF_SIZE: usize = 4096;

        let (sv_stream, wk_stream) = io::duplex(BUF_SIZE);
        let (sv_rx, sv_tx) = io::split(sv_stream);
        let (mut sv_rx, mut sv_tx) = comms::channel(sv_rx, sv_tx);

        let (wk_rx, wk_tx) = io::split(wk_stream);
        let (wk_rx, wk_tx) = comms::channel(wk_rx, wk_tx);
        let mut client = ShardClient::new(wk_rx, wk_tx, 0, 4);

        tokio::spawn(async move {
            let _: Msg = sv_rx.recv().await.unwrap();
            let weights = [1.0_f32; 2];
            sv_tx
                .send(&Msg::Data(Payload::Weights(&weights)))
                .await
                .unwrap();
        });

        let mut local = [0.0_f32; 4];
        assert!(matches!(
            client.pull_into(&mut local).await,
            Err(WorkerErr::WeightsLengthMismatch { .. })
        ));
    }
}
