use std::thread;
use std::time::Duration;

use anyhow::Result;
use layerdrop::{
    CollectiveSite, GlobalThresholdPolicy, LayerDropError, PerLayerBernoulliPolicy, ReplicaGroup,
    SkipPolicy, SyncedRandomSource, ThreadReplicaGroup,
};
use layers::{RandomState, RunMode};

const TIMEOUT: Duration = Duration::from_secs(10);

fn join_all<T: Send + 'static>(handles: Vec<thread::JoinHandle<T>>) -> Vec<T> {
    handles
        .into_iter()
        .map(|handle| handle.join().expect("replica thread panicked"))
        .collect()
}

#[test]
fn replicas_with_different_seeds_draw_the_same_scalar() -> Result<()> {
    let source = SyncedRandomSource::new(0.0, 10.0)?;
    let handles = ThreadReplicaGroup::new_group(4, TIMEOUT)
        .into_iter()
        .map(|replica| {
            thread::spawn(move || -> layerdrop::Result<Vec<f32>> {
                let mut rng = RandomState::new(1000 + replica.rank() as u64);
                (0..5)
                    .map(|step| source.sample(&mut rng, &replica, CollectiveSite::new("draw", step)))
                    .collect()
            })
        })
        .collect();

    let draws = join_all(handles)
        .into_iter()
        .collect::<layerdrop::Result<Vec<_>>>()?;
    for other in &draws[1..] {
        assert_eq!(other, &draws[0]);
    }
    assert!(draws[0].iter().all(|v| (0.0..10.0).contains(v)));
    Ok(())
}

#[test]
fn replicas_with_identical_seeds_agree_on_every_layer() -> Result<()> {
    let policy = PerLayerBernoulliPolicy::new(0.5, RunMode::Train)?;
    let handles = ThreadReplicaGroup::new_group(3, TIMEOUT)
        .into_iter()
        .map(|replica| {
            let policy = policy.clone();
            thread::spawn(move || -> layerdrop::Result<(Vec<bool>, usize)> {
                let mut rng = RandomState::new(7);
                let mut executed = Vec::new();
                for layer in 0..8 {
                    executed.push(policy.decide(layer, None, &mut rng, &replica)?.execute);
                }
                Ok((executed, replica.collective_count()))
            })
        })
        .collect();

    let results = join_all(handles)
        .into_iter()
        .collect::<layerdrop::Result<Vec<_>>>()?;
    for (executed, collectives) in &results {
        assert_eq!(executed, &results[0].0);
        assert_eq!(*collectives, 8);
    }
    Ok(())
}

#[test]
fn mismatched_sites_fail_every_participant() -> Result<()> {
    let handles = ThreadReplicaGroup::new_group(2, TIMEOUT)
        .into_iter()
        .map(|replica| {
            thread::spawn(move || {
                let label = if replica.rank() == 0 { "pass_threshold" } else { "layer" };
                let mut words = [1u32, 2];
                let first = replica.all_reduce_sum(CollectiveSite::new(label, 0), &mut words);
                let again = replica.all_reduce_sum(CollectiveSite::new(label, 1), &mut words);
                (first, again, replica.is_failed())
            })
        })
        .collect();

    for (first, again, failed) in join_all(handles) {
        assert!(matches!(first, Err(LayerDropError::SyncDivergence(_))));
        assert!(matches!(again, Err(LayerDropError::SyncDivergence(_))));
        assert!(failed);
    }
    Ok(())
}

#[test]
fn missing_peer_times_out() -> Result<()> {
    let mut group = ThreadReplicaGroup::new_group(2, Duration::from_millis(50));
    let absent = group.pop();
    let present = group.pop().expect("two handles");

    let policy = GlobalThresholdPolicy::new(4, 0.5, RunMode::Train)?;
    let mut rng = RandomState::new(0);
    let err = policy.prepare_pass(&mut rng, &present).unwrap_err();
    match err {
        LayerDropError::SyncDivergence(reason) => assert!(reason.contains("timed out")),
        other => panic!("expected divergence, got {other:?}"),
    }

    let late = absent.expect("two handles");
    let mut words = [0u32; 2];
    assert!(late
        .all_reduce_sum(GlobalThresholdPolicy::SITE, &mut words)
        .is_err());
    Ok(())
}
