//! # Stage Queues
//!
//! Work queues shared by the scheduler and its workers.
//!
//! ## Components
//! - `TieredQueue`: a high and a low priority FIFO plus a parking list for
//!   samples that were not ready yet
//! - `WakeSignal`: a level-triggered flag workers sleep on
//!
//! A coordinate is held at most once per queue. Requesting it again only
//! refreshes its distance and may promote it to the high tier.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::engine_state::voxels::chunk::ChunkCoordinate;
use crate::engine_state::voxels::world::chunk_distance;

/// Which FIFO of a [`TieredQueue`] a sample lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Low,
}

impl Tier {
    pub fn from_priority(high_priority: bool) -> Self {
        if high_priority {
            Tier::High
        } else {
            Tier::Low
        }
    }
}

/// A unit of scheduled work: one chunk and its distance to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub coordinate: ChunkCoordinate,
    /// Chebyshev distance in chunks, as given by the last request
    pub distance: i32,
    pub tier: Tier,
}

impl Sample {
    pub fn new(coordinate: ChunkCoordinate, distance: i32, tier: Tier) -> Self {
        Self {
            coordinate,
            distance,
            tier,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    high: VecDeque<Sample>,
    low: VecDeque<Sample>,
    parked: Vec<Sample>,
    members: HashSet<ChunkCoordinate>,
}

impl QueueState {
    fn enqueue(&mut self, sample: Sample) {
        match sample.tier {
            Tier::High => self.high.push_back(sample),
            Tier::Low => self.low.push_back(sample),
        }
    }

    fn refresh(&mut self, sample: Sample) -> bool {
        if let Some(index) = self
            .parked
            .iter()
            .position(|parked| parked.coordinate == sample.coordinate)
        {
            let parked = self.parked[index];
            if parked.distance == sample.distance && parked.tier == sample.tier {
                return false;
            }
            // A new distance or tier can make the sample ready.
            self.parked.swap_remove(index);
            self.enqueue(Sample {
                tier: Self::merge(parked.tier, sample.tier),
                ..sample
            });
            return true;
        }

        if let Some(queued) = self
            .high
            .iter_mut()
            .find(|queued| queued.coordinate == sample.coordinate)
        {
            queued.distance = sample.distance;
            return false;
        }

        if let Some(index) = self
            .low
            .iter()
            .position(|queued| queued.coordinate == sample.coordinate)
        {
            if sample.tier == Tier::High {
                self.low.remove(index);
                self.high.push_back(sample);
                return true;
            }
            self.low[index].distance = sample.distance;
        }
        false
    }

    fn merge(a: Tier, b: Tier) -> Tier {
        if a == Tier::High || b == Tier::High {
            Tier::High
        } else {
            Tier::Low
        }
    }
}

/// Two priority tiers and a parking list behind one mutex.
#[derive(Debug, Default)]
pub struct TieredQueue {
    state: Mutex<QueueState>,
}

impl TieredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap()
    }

    /// Adds a sample, or refreshes the one already held for its coordinate.
    ///
    /// # Returns
    /// `true` if the queue gained runnable work.
    pub fn push(&self, sample: Sample) -> bool {
        let mut state = self.state();
        if !state.members.insert(sample.coordinate) {
            return state.refresh(sample);
        }
        state.enqueue(sample);
        true
    }

    /// Takes the oldest high tier sample, or the oldest low tier one.
    pub fn pop(&self) -> Option<Sample> {
        let mut state = self.state();
        let sample = state.high.pop_front().or_else(|| state.low.pop_front())?;
        state.members.remove(&sample.coordinate);
        Some(sample)
    }

    /// Parks a sample that could not run yet.
    ///
    /// `seen_epoch` is the value of `epoch` read before the readiness check.
    /// If a release happened since then the sample is queued again right away,
    /// so no wakeup is lost between the check and the park.
    ///
    /// # Returns
    /// `true` if the sample was parked, `false` if it went back into its tier.
    pub fn park(&self, sample: Sample, seen_epoch: u64, epoch: &AtomicU64) -> bool {
        let mut state = self.state();
        // A newer request for the same chunk already took its place.
        if !state.members.insert(sample.coordinate) {
            return false;
        }
        if epoch.load(Ordering::SeqCst) != seen_epoch {
            state.enqueue(sample);
            return false;
        }
        state.parked.push(sample);
        true
    }

    /// Moves every parked sample back into its tier.
    ///
    /// # Returns
    /// Number of samples released.
    pub fn release_parked(&self) -> usize {
        let mut state = self.state();
        let parked = std::mem::take(&mut state.parked);
        let released = parked.len();
        for sample in parked {
            state.enqueue(sample);
        }
        released
    }

    /// Drops every sample farther than `radius` from `center` and updates the
    /// distance of the rest.
    ///
    /// # Returns
    /// Number of samples dropped.
    pub fn retain_within(&self, center: ChunkCoordinate, radius: i32) -> usize {
        let mut state = self.state();
        let before = state.members.len();
        let keep = |sample: &mut Sample| {
            sample.distance = chunk_distance(center, sample.coordinate);
            sample.distance <= radius
        };
        state.high.retain_mut(keep);
        state.low.retain_mut(keep);
        state.parked.retain_mut(keep);

        let QueueState {
            high,
            low,
            parked,
            members,
        } = &mut *state;
        members.clear();
        members.extend(high.iter().chain(low.iter()).chain(parked.iter()).map(|s| s.coordinate));
        before - members.len()
    }

    /// `true` if a sample is waiting in either tier. Parked samples do not count.
    pub fn has_runnable(&self) -> bool {
        let state = self.state();
        !state.high.is_empty() || !state.low.is_empty()
    }

    pub fn parked_len(&self) -> usize {
        self.state().parked.len()
    }

    /// Samples held in total, parked ones included.
    pub fn len(&self) -> usize {
        self.state().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.state().members.contains(&coordinate)
    }
}

/// A level-triggered wakeup for the worker pool.
///
/// Raising the signal wakes every sleeping worker and keeps it raised until a
/// worker observes that there is nothing left to do.
#[derive(Debug, Default)]
pub struct WakeSignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        *self.raised.lock().unwrap() = true;
        self.condvar.notify_all();
    }

    /// Blocks until the signal is raised or `running` is cleared.
    pub fn wait(&self, running: &AtomicBool) {
        let raised = self.raised.lock().unwrap();
        let _raised = self
            .condvar
            .wait_while(raised, |raised| !*raised && running.load(Ordering::Acquire))
            .unwrap();
    }

    /// Lowers the signal unless `has_work` reports otherwise.
    ///
    /// `has_work` runs under the signal's lock, so an enqueue racing with
    /// this call either is seen by it or raises the signal again afterwards.
    pub fn lower_unless(&self, has_work: impl FnOnce() -> bool) {
        let mut raised = self.raised.lock().unwrap();
        if !has_work() {
            *raised = false;
        }
    }

    pub fn is_raised(&self) -> bool {
        *self.raised.lock().unwrap()
    }
}
