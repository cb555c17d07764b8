use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use candle_core::{Device, Tensor};
use layerdrop::{LayerDropError, ReplicaGroup, ThreadReplicaGroup};
use layers::{RandomState, RunMode};
use model::{
    build_global_skip_model, build_per_layer_skip_model, Model, ModelConfig, PassTrace,
};

fn config() -> ModelConfig {
    ModelConfig {
        d_model: 8,
        d_ff: 16,
        n_layers: 5,
        n_heads: 2,
        max_len: 16,
        mode: RunMode::Train,
        skip_fraction: 0.5,
        ..ModelConfig::new(12)
    }
}

fn run_replicas(model: Arc<Model>, world: usize, passes: usize) -> Result<Vec<Vec<PassTrace>>> {
    let handles: Vec<_> = ThreadReplicaGroup::new_group(world, Duration::from_secs(20))
        .into_iter()
        .map(|replica| {
            let model = Arc::clone(&model);
            thread::spawn(move || -> layerdrop::Result<Vec<PassTrace>> {
                // Each replica sees its own shard and its own local stream.
                let rank = replica.rank();
                let ids = Tensor::from_vec(
                    (0..6).map(|i| ((i + rank) % 12) as u32).collect::<Vec<_>>(),
                    (1, 6),
                    &Device::Cpu,
                )?;
                let mut rng = RandomState::new(100 + rank as u64);
                (0..passes)
                    .map(|_| -> layerdrop::Result<PassTrace> {
                        Ok(model.forward_traced(&ids, &mut rng, &replica)?.1)
                    })
                    .collect::<layerdrop::Result<Vec<_>>>()
            })
        })
        .collect();

    let mut traces = Vec::with_capacity(world);
    for handle in handles {
        traces.push(handle.join().expect("replica thread panicked")?);
    }
    Ok(traces)
}

#[test]
fn global_policy_decisions_agree_across_replicas() -> Result<()> {
    let model = Arc::new(build_global_skip_model(&config(), &Device::Cpu)?);
    let traces = run_replicas(model, 3, 6)?;
    for replica in &traces[1..] {
        assert_eq!(replica, &traces[0]);
    }
    Ok(())
}

#[test]
fn per_layer_policy_decisions_agree_across_replicas() -> Result<()> {
    let model = Arc::new(build_per_layer_skip_model(&config(), &Device::Cpu)?);
    let traces = run_replicas(model, 2, 6)?;
    assert_eq!(traces[0], traces[1]);
    Ok(())
}

#[test]
fn replicas_running_different_policies_diverge() -> Result<()> {
    let models = [
        Arc::new(build_global_skip_model(&config(), &Device::Cpu)?),
        Arc::new(build_per_layer_skip_model(&config(), &Device::Cpu)?),
    ];
    let handles: Vec<_> = ThreadReplicaGroup::new_group(2, Duration::from_secs(20))
        .into_iter()
        .zip(models)
        .map(|(replica, model)| {
            thread::spawn(move || -> layerdrop::Result<Tensor> {
                let ids = Tensor::from_vec(vec![1u32, 2, 3], (1, 3), &Device::Cpu)?;
                model.forward(&ids, &mut RandomState::new(0), &replica)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("replica thread panicked");
        assert!(matches!(result, Err(LayerDropError::SyncDivergence(_))));
    }
    Ok(())
}
