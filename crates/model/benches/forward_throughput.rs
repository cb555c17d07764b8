use candle_core::{Device, Tensor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use layerdrop::LocalReplica;
use layers::{RandomState, RunMode};
use model::{Model, ModelConfig, PolicyKind};

fn bench_forward(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 2usize;
    let seq = 64usize;
    let ids = Tensor::from_vec(
        (0..batch * seq).map(|i| (i % 1000) as u32).collect::<Vec<_>>(),
        (batch, seq),
        &device,
    )
    .expect("token ids");

    let mut group = c.benchmark_group("layerdrop_forward");
    group.throughput(Throughput::Elements((batch * seq) as u64));
    for policy in [PolicyKind::Global, PolicyKind::PerLayer] {
        for mode in [RunMode::Eval, RunMode::Train] {
            let config = ModelConfig {
                d_model: 128,
                d_ff: 512,
                n_layers: 6,
                n_heads: 4,
                max_len: seq,
                mode,
                policy,
                ..ModelConfig::new(1000)
            };
            let model = Model::from_config(&config, &device).expect("model init");
            group.bench_with_input(
                BenchmarkId::new(format!("{policy:?}"), mode),
                &(model, ids.clone()),
                |b, (model, ids)| {
                    let mut rng = RandomState::new(0);
                    b.iter(|| {
                        let out = model
                            .forward(black_box(ids), &mut rng, &LocalReplica)
                            .expect("forward");
                        black_box(out);
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_forward);
criterion_main!(benches);
