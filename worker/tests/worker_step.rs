use std::{io, num::NonZeroUsize};

use comms::{
    msg::{Command, Msg, Payload},
    specs::{
        server::ShardRange,
        worker::{DatasetSpec, InputSpec, LayerSpec, LossSpec, ModelSpec, ShardAssignment, WorkerSpec},
    },
};
use tokio::io as tokio_io;
use worker::{ShardClient, WorkerBuilder};

/// 2x2 single-channel inputs, flattened into a two-class dense head.
fn tiny_spec(servers: Vec<ShardAssignment>) -> WorkerSpec {
    WorkerSpec {
        worker_id: 0,
        model: ModelSpec::Sequential {
            input: InputSpec {
                height: 2,
                width: 2,
                channels: 1,
            },
            layers: vec![
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 2,
                    act_fn: None,
                },
            ],
        },
        loss: LossSpec::SparseCategoricalCrossentropy,
        servers,
        dataset: DatasetSpec::Inline {
            images: vec![
                0.0, 0.0, 0.0, 0.0, //
                1.0, 1.0, 1.0, 1.0, //
                0.0, 1.0, 0.0, 1.0, //
                1.0, 0.0, 1.0, 0.0, //
            ],
            labels: vec![0, 1, 0, 1],
            height: 2,
            width: 2,
            channels: 1,
        },
        batch_size: NonZeroUsize::new(2).unwrap(),
        seed: Some(7),
    }
}

// (4 + 1) * 2 parameters in the dense head.
const PARAMS: usize = 10;

#[tokio::test]
async fn worker_executes_dispatched_steps() -> io::Result<()> {
    const BUF_SIZE: usize = 1 << 16;
    const STEPS: u64 = 3;

    // Fake parameter server on one duplex link.
    let (ps_stream, wk_ps_stream) = tokio_io::duplex(BUF_SIZE);
    let (ps_rx, ps_tx) = tokio_io::split(ps_stream);
    let (mut ps_rx, mut ps_tx) = comms::channel(ps_rx, ps_tx);

    let ps = tokio::spawn(async move {
        let weights = vec![0.5_f32; PARAMS];
        let mut grads_seen = 0_u64;

        loop {
            match ps_rx.recv().await.unwrap() {
                Msg::Control(Command::PullParams) => {
                    ps_tx
                        .send(&Msg::Data(Payload::Weights(&weights)))
                        .await
                        .unwrap();
                }
                Msg::Data(Payload::Gradient(g)) => {
                    assert_eq!(g.len(), PARAMS);
                    assert!(g.iter().all(|v| v.is_finite()));
                    grads_seen += 1;
                }
                Msg::Control(Command::Disconnect) => break,
                other => panic!("unexpected msg: {other:?}"),
            }
        }

        grads_seen
    });

    let (wk_ps_rx, wk_ps_tx) = tokio_io::split(wk_ps_stream);
    let (wk_ps_rx, wk_ps_tx) = comms::channel(wk_ps_rx, wk_ps_tx);
    let client = ShardClient::new(wk_ps_rx, wk_ps_tx, 0, PARAMS);

    let spec = tiny_spec(vec![ShardAssignment {
        addr: "unused".to_string(),
        range: ShardRange::new(0, PARAMS),
    }]);
    let worker = WorkerBuilder::new().build(spec, vec![client]).unwrap();

    // Coordinator on a second duplex link.
    let (co_stream, wk_co_stream) = tokio_io::duplex(BUF_SIZE);
    let (co_rx, co_tx) = tokio_io::split(co_stream);
    let (mut co_rx, mut co_tx) = comms::channel(co_rx, co_tx);

    let (wk_co_rx, wk_co_tx) = tokio_io::split(wk_co_stream);
    let (wk_co_rx, wk_co_tx) = comms::channel(wk_co_rx, wk_co_tx);

    let worker_task = tokio::spawn(worker.run(wk_co_rx, wk_co_tx));

    for step in 0..STEPS {
        co_tx.send(&Msg::Control(Command::RunStep { step })).await?;

        match co_rx.recv().await? {
            Msg::Control(Command::StepDone {
                step: done,
                loss,
                correct,
                seen,
            }) => {
                assert_eq!(done, step);
                assert_eq!(seen, 2);
                assert!(correct <= seen);
                assert!(loss.is_finite());
            }
            other => panic!("unexpected msg: {other:?}"),
        }
    }

    co_tx.send(&Msg::Control(Command::Disconnect)).await?;

    let metrics = worker_task.await.unwrap()?;
    assert_eq!(metrics.steps, STEPS);
    assert_eq!(metrics.samples, STEPS * 2);

    assert_eq!(ps.await.unwrap(), STEPS);
    Ok(())
}

#[tokio::test]
async fn sharded_pull_reassembles_the_full_vector() -> io::Result<()> {
    const BUF_SIZE: usize = 1 << 16;

    // Two shards: 0..6 and 6..10, serving distinct constants so a mixed-up
    // reassembly would be visible in the gradient flow.
    let mut ps_tasks = Vec::new();
    let mut clients = Vec::new();

    for (shard, range) in [ShardRange::new(0, 6), ShardRange::new(6, 10)]
        .into_iter()
        .enumerate()
    {
        let (ps_stream, wk_stream) = tokio_io::duplex(BUF_SIZE);
        let (ps_rx, ps_tx) = tokio_io::split(ps_stream);
        let (mut ps_rx, mut ps_tx) = comms::channel(ps_rx, ps_tx);

        ps_tasks.push(tokio::spawn(async move {
            let weights = vec![shard as f32; range.len()];

            loop {
                match ps_rx.recv().await.unwrap() {
                    Msg::Control(Command::PullParams) => {
                        ps_tx
                            .send(&Msg::Data(Payload::Weights(&weights)))
                            .await
                            .unwrap();
                    }
                    Msg::Data(Payload::Gradient(g)) => assert_eq!(g.len(), range.len()),
                    Msg::Control(Command::Disconnect) => break,
                    other => panic!("unexpected msg: {other:?}"),
                }
            }
        }));

        let (wk_rx, wk_tx) = tokio_io::split(wk_stream);
        let (wk_rx, wk_tx) = comms::channel(wk_rx, wk_tx);
        clients.push(ShardClient::new(wk_rx, wk_tx, shard, range.len()));
    }

    let spec = tiny_spec(vec![
        ShardAssignment {
            addr: "unused".to_string(),
            range: ShardRange::new(0, 6),
        },
        ShardAssignment {
            addr: "unused".to_string(),
            range: ShardRange::new(6, 10),
        },
    ]);
    let worker = WorkerBuilder::new().build(spec, clients).unwrap();

    let (co_stream, wk_co_stream) = tokio_io::duplex(BUF_SIZE);
    let (co_rx, co_tx) = tokio_io::split(co_stream);
    let (mut co_rx, mut co_tx) = comms::channel(co_rx, co_tx);

    let (wk_co_rx, wk_co_tx) = tokio_io::split(wk_co_stream);
    let (wk_co_rx, wk_co_tx) = comms::channel(wk_co_rx, wk_co_tx);
    let worker_task = tokio::spawn(worker.run(wk_co_rx, wk_co_tx));

    co_tx.send(&Msg::Control(Command::RunStep { step: 0 })).await?;
    assert!(matches!(
        co_rx.recv().await?,
        Msg::Control(Command::StepDone { step: 0, .. })
    ));

    co_tx.send(&Msg::Control(Command::Disconnect)).await?;
    worker_task.await.unwrap()?;

    for ps in ps_tasks {
        ps.await.unwrap();
    }

    Ok(())
}

#[test]
fn builder_rejects_shard_gaps() {
    let spec = tiny_spec(vec![ShardAssignment {
        addr: "unused".to_string(),
        range: ShardRange::new(0, 6),
    }]);

    let clients: Vec<ShardClient<tokio_io::ReadHalf<tokio_io::DuplexStream>, _>> = {
        let (stream, _keep) = tokio_io::duplex(64);
        let (rx, tx) = tokio_io::split(stream);
        let (rx, tx) = comms::channel(rx, tx);
        vec![ShardClient::new(rx, tx, 0, 6)]
    };

    assert!(WorkerBuilder::new().build(spec, clients).is_err());
}
