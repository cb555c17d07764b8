//! Replica groups: the collective used to keep skip decisions identical
//! across data-parallel replicas.
//!
//! The only collective the control layer needs is an in-place wrapping sum over
//! the two `u32` words of a random key. Every call names the graph position it
//! was issued from with a [`CollectiveSite`]; replicas that disagree on the site
//! have diverged and the group fails.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;

use crate::error::{LayerDropError, Result};

/// Graph position of a collective call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectiveSite {
    pub label: &'static str,
    pub index: usize,
}

impl CollectiveSite {
    pub const fn new(label: &'static str, index: usize) -> Self {
        Self { label, index }
    }
}

impl fmt::Display for CollectiveSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.label, self.index)
    }
}

/// Abstract sum-reduction backend shared by all replicas of a run.
pub trait ReplicaGroup: Send + Sync {
    /// Total number of replicas in the group.
    fn world_size(&self) -> usize;
    /// This replica's index (0-based).
    fn rank(&self) -> usize;
    /// In-place wrapping sum of `buf` across all replicas issued at `site`.
    fn all_reduce_sum(&self, site: CollectiveSite, buf: &mut [u32]) -> Result<()>;
}

/// Single-replica group; reductions are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReplica;

impl ReplicaGroup for LocalReplica {
    fn world_size(&self) -> usize {
        1
    }

    fn rank(&self) -> usize {
        0
    }

    fn all_reduce_sum(&self, _site: CollectiveSite, _buf: &mut [u32]) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Rendezvous {
    generation: u64,
    arrived: usize,
    site: Option<CollectiveSite>,
    accumulator: Vec<u32>,
    result: Vec<u32>,
    failure: Option<String>,
}

#[derive(Debug)]
struct Shared {
    world: usize,
    timeout: Duration,
    state: Mutex<Rendezvous>,
    ready: Condvar,
}

/// In-process replica group for `k` replica threads.
///
/// Build one handle per rank with [`ThreadReplicaGroup::new_group`] and move
/// each handle into its thread. A site mismatch or a peer missing the timeout
/// fails every participant, and the group stays failed afterwards.
#[derive(Debug)]
pub struct ThreadReplicaGroup {
    rank: usize,
    shared: Arc<Shared>,
    collectives: AtomicUsize,
}

impl ThreadReplicaGroup {
    /// Creates `world_size` handles sharing one rendezvous.
    pub fn new_group(world_size: usize, timeout: Duration) -> Vec<Self> {
        let shared = Arc::new(Shared {
            world: world_size,
            timeout,
            state: Mutex::new(Rendezvous::default()),
            ready: Condvar::new(),
        });
        (0..world_size)
            .map(|rank| Self {
                rank,
                shared: Arc::clone(&shared),
                collectives: AtomicUsize::new(0),
            })
            .collect()
    }

    /// Number of collectives this rank has entered.
    pub fn collective_count(&self) -> usize {
        self.collectives.load(Ordering::SeqCst)
    }

    /// Whether the group has diverged.
    pub fn is_failed(&self) -> bool {
        self.lock().map(|state| state.failure.is_some()).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Rendezvous>> {
        self.shared
            .state
            .lock()
            .map_err(|_| LayerDropError::SyncDivergence("replica group lock poisoned".into()))
    }

    fn fail(&self, state: &mut Rendezvous, reason: String) -> LayerDropError {
        warn!("replica {} failing group: {}", self.rank, reason);
        state.failure = Some(reason.clone());
        self.shared.ready.notify_all();
        LayerDropError::SyncDivergence(reason)
    }
}

impl ReplicaGroup for ThreadReplicaGroup {
    fn world_size(&self) -> usize {
        self.shared.world
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn all_reduce_sum(&self, site: CollectiveSite, buf: &mut [u32]) -> Result<()> {
        self.collectives.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock()?;
        if let Some(reason) = &state.failure {
            return Err(LayerDropError::SyncDivergence(reason.clone()));
        }

        let pending = state.site;
        match pending {
            None => {
                state.site = Some(site);
                state.accumulator = buf.to_vec();
            }
            Some(expected) if expected != site => {
                let reason = format!(
                    "rank {} reached collective {site} while peers are at {expected}",
                    self.rank
                );
                return Err(self.fail(&mut state, reason));
            }
            Some(_) if state.accumulator.len() != buf.len() => {
                let reason = format!(
                    "rank {} reduced {} words at {site}, peers reduced {}",
                    self.rank,
                    buf.len(),
                    state.accumulator.len()
                );
                return Err(self.fail(&mut state, reason));
            }
            Some(_) => {
                for (acc, value) in state.accumulator.iter_mut().zip(buf.iter()) {
                    *acc = acc.wrapping_add(*value);
                }
            }
        }
        state.arrived += 1;

        if state.arrived == self.shared.world {
            state.result = std::mem::take(&mut state.accumulator);
            state.arrived = 0;
            state.site = None;
            state.generation = state.generation.wrapping_add(1);
            buf.copy_from_slice(&state.result);
            self.shared.ready.notify_all();
            return Ok(());
        }

        let generation = state.generation;
        let deadline = Instant::now() + self.shared.timeout;
        while state.generation == generation && state.failure.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let reason = format!(
                    "rank {} timed out after {:?} waiting for peers at {site}",
                    self.rank, self.shared.timeout
                );
                return Err(self.fail(&mut state, reason));
            }
            let (guard, _) = self
                .shared
                .ready
                .wait_timeout(state, remaining)
                .map_err(|_| LayerDropError::SyncDivergence("replica group lock poisoned".into()))?;
            state = guard;
        }

        if state.generation != generation {
            buf.copy_from_slice(&state.result);
            return Ok(());
        }
        let reason = state.failure.clone().unwrap_or_default();
        Err(LayerDropError::SyncDivergence(reason))
    }
}
