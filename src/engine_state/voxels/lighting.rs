//! # Light Propagation
//!
//! Breadth-first relaxation of the four light channels.
//!
//! Every chunk carries a pending queue per channel with the world positions
//! whose light has to spread (sky voxels from generation, light sources from
//! edits). The propagator drains the center chunk's queues one channel at a
//! time, in `Sun, Red, Green, Blue` order. For each dequeued voxel with level
//! `V` it visits the six neighbors and raises any non-solid neighbor whose
//! level is below the candidate:
//!
//! - sunlight at full strength travelling straight down stays at 15
//! - everything else loses one level per step
//!
//! Light spreads into the surrounding chunks of the 3x3 neighborhood, which
//! is why chunks are at least 16 voxels wide: a level 15 source can never get
//! further than one chunk away from where it started.
//!
//! When the queues are empty no voxel can be raised further (fixed point).

use std::ops::DerefMut;
use std::sync::Arc;

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::BlockRegistry;
use crate::engine_state::voxels::chunk::{ChunkNeighborhood, ChunkVolume};
use crate::engine_state::voxels::light::{LightChannel, MAX_LIGHT};

pub struct LightPropagator {
    registry: Arc<dyn BlockRegistry>,
}

impl LightPropagator {
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        Self { registry }
    }

    /// Drains the center chunk's pending queues.
    ///
    /// # Returns
    /// Number of light values written.
    pub fn propagate<G>(&self, hood: &mut ChunkNeighborhood<G>) -> usize
    where
        G: DerefMut<Target = ChunkVolume>,
    {
        LightChannel::ALL
            .into_iter()
            .map(|channel| self.propagate_channel(hood, channel))
            .sum()
    }

    fn propagate_channel<G>(&self, hood: &mut ChunkNeighborhood<G>, channel: LightChannel) -> usize
    where
        G: DerefMut<Target = ChunkVolume>,
    {
        let mut queue = hood.center_mut().take_pending(channel);
        let mut writes = 0;

        while let Some(position) = queue.pop_front() {
            if !hood.contains(position) {
                continue;
            }
            let level = hood.light_at(position, channel);
            if level == 0 {
                continue;
            }

            for side in BlockSide::all() {
                let neighbor: Point3<i32> = position + side.offset();
                if !hood.contains(neighbor) || self.registry.is_solid(hood.block_at(neighbor)) {
                    continue;
                }

                let candidate = if channel == LightChannel::Sun
                    && side == BlockSide::BOTTOM
                    && level == MAX_LIGHT
                {
                    MAX_LIGHT
                } else {
                    level - 1
                };

                let stored = hood.light_at(neighbor, channel);
                if stored + 2 <= candidate + 1 {
                    hood.set_light_at(neighbor, channel, candidate);
                    queue.push_back(neighbor);
                    writes += 1;
                }
            }
        }

        writes
    }
}
