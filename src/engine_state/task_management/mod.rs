//! # Task Management System
//!
//! This module drives every chunk through the pipeline
//! `Empty -> Light -> Mesh -> Upload -> Done` on a fixed pool of worker
//! threads, and hands finished geometry to the presentation thread.
//!
//! ## Architecture Overview
//!
//! - `PipelineScheduler`: Owns the stage queues and the worker pool
//! - `StageTask`: One step of the state machine (generation, light, mesh)
//! - `TieredQueue`: Per-stage high/low priority FIFOs plus a parking list
//! - `WakeSignal`: Level-triggered flag the workers sleep on
//!
//! ## Stage Lifecycle
//! 1. `request()` creates the chunk if needed and queues it for the stage
//!    matching its status
//! 2. A worker wakes, and tries one sample from the generation, light and
//!    mesh queues in turn (high tier first in each)
//! 3. The sample's chunk is claimed; if it is not ready (missing or lagging
//!    neighbors, outside the radius) the sample is parked
//! 4. When a stage succeeds the chunk advances and moves on to the next
//!    queue; every parked sample is released so it can re-check readiness
//! 5. `poll_uploads()` on the presentation thread publishes `Upload` chunks
//!    and marks them `Done`
//!
//! ## Failure Handling
//! Stage errors and panics are caught at the worker boundary. The chunk is
//! marked `Failed`, which is terminal and never satisfies a neighbor's
//! readiness check. The worker carries on with the next sample.
//!
//! ## Performance Considerations
//! - A coordinate sits in a stage queue at most once, so re-requesting the
//!   whole radius every frame costs a lookup per chunk
//! - Not-ready samples are parked instead of spinning through the queue
//! - Stages touching several chunks lock them in ascending coordinate order

pub mod queue;
pub mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use cgmath::{Point2, Point3};
use log::{debug, error, info, warn};
use web_time::Instant;

use crate::core::PipelineError;
use crate::engine_state::rendering::atlas::TextureAtlas;
use crate::engine_state::rendering::meshing::ChunkMesher;
use crate::engine_state::rendering::presenter::MeshPresenter;
use crate::engine_state::rendering::tasks::ChunkMeshGenerationTask;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::neighborhood::slot_offsets;
use crate::engine_state::voxels::chunk::{ChunkCoordinate, ChunkStatus};
use crate::engine_state::voxels::generation::{NoiseProvider, TerrainGenerator};
use crate::engine_state::voxels::light::LightChannel;
use crate::engine_state::voxels::lighting::LightPropagator;
use crate::engine_state::voxels::tasks::{ChunkGenerationTask, ChunkLightTask};
use crate::engine_state::voxels::world::World;

use queue::{Sample, Tier, TieredQueue, WakeSignal};
use task::{StageContext, StageTask};

/// Completion count and durations of one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub completed: u64,
    pub last: Duration,
    pub average: Duration,
}

/// A snapshot of pipeline activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub generation: StageTimings,
    pub light: StageTimings,
    pub meshing: StageTimings,
    /// Chunks handed to the presenter
    pub uploaded: u64,
    /// Chunks that ended up `Failed`
    pub failed: u64,
    /// Samples held by the stage queues, parked ones included
    pub queued: usize,
    pub parked: usize,
}

#[derive(Debug, Default)]
struct StageMetrics {
    completed: AtomicU64,
    total_nanos: AtomicU64,
    last_nanos: AtomicU64,
}

impl StageMetrics {
    fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.last_nanos.store(nanos, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StageTimings {
        let completed = self.completed.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        StageTimings {
            completed,
            last: Duration::from_nanos(self.last_nanos.load(Ordering::Relaxed)),
            average: Duration::from_nanos(total.checked_div(completed).unwrap_or(0)),
        }
    }
}

struct StageSlot {
    task: Box<dyn StageTask>,
    queue: TieredQueue,
    metrics: StageMetrics,
}

/// State shared between the scheduler handle and its workers.
struct PipelineShared {
    world: Arc<World>,
    stages: Vec<StageSlot>,
    uploads: TieredQueue,
    wake: WakeSignal,
    running: AtomicBool,
    /// Bumped on every parking release
    epoch: AtomicU64,
    render_radius: AtomicI32,
    uploaded: AtomicU64,
    failed: AtomicU64,
}

impl PipelineShared {
    fn slot_for(&self, status: ChunkStatus) -> Option<&StageSlot> {
        self.stages
            .iter()
            .find(|slot| slot.task.input_status() == status)
    }

    /// Queues `sample` for whatever handles `status`.
    ///
    /// # Returns
    /// `true` if a queue gained work.
    fn route(&self, sample: Sample, status: ChunkStatus) -> bool {
        if let Some(slot) = self.slot_for(status) {
            let queued = slot.queue.push(sample);
            if queued {
                self.wake.raise();
            }
            queued
        } else if status == ChunkStatus::Upload {
            self.uploads.push(sample)
        } else {
            false
        }
    }

    fn release_parked(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let released: usize = self
            .stages
            .iter()
            .map(|slot| slot.queue.release_parked())
            .sum();
        if released > 0 {
            self.wake.raise();
        }
    }

    fn has_runnable(&self) -> bool {
        self.stages.iter().any(|slot| slot.queue.has_runnable())
    }

    /// Tries one sample from every stage queue, in pipeline order.
    ///
    /// # Returns
    /// `true` if any queue yielded a sample.
    fn run_once(&self) -> bool {
        let mut progressed = false;
        for slot in &self.stages {
            progressed |= self.attempt(slot);
        }
        progressed
    }

    fn attempt(&self, slot: &StageSlot) -> bool {
        let seen_epoch = self.epoch.load(Ordering::SeqCst);
        let Some(sample) = slot.queue.pop() else {
            return false;
        };
        let input = slot.task.input_status();

        // Evicted, or already past this stage: the sample is stale.
        let Some(chunk) = self.world.get_chunk_at(sample.coordinate) else {
            return true;
        };
        if chunk.status() != input {
            return true;
        }

        if !chunk.try_claim() {
            debug!(
                "Chunk ({}, {}) is claimed by another worker, parking its {} sample",
                sample.coordinate.x,
                sample.coordinate.y,
                slot.task.name()
            );
            slot.queue.park(sample, seen_epoch, &self.epoch);
            return true;
        }
        if chunk.status() != input {
            chunk.release();
            return true;
        }

        let context = StageContext {
            world: &self.world,
            chunk: &chunk,
            distance: sample.distance,
            render_radius: self.render_radius.load(Ordering::Acquire),
        };
        if !slot.task.is_ready(&context) {
            chunk.release();
            slot.queue.park(sample, seen_epoch, &self.epoch);
            return true;
        }

        let revision = chunk.revision();
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| slot.task.process(&context)))
            .unwrap_or_else(|payload| Err(PipelineError::from_panic(slot.task.name(), payload)));
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                let output = slot.task.output_status();
                let advanced = chunk.advance_status(input, output);
                // Checked after advancing: an edit that lands later rewinds
                // the status itself.
                let edited = chunk.revision() != revision;
                if advanced && edited {
                    chunk.advance_status(output, input);
                }
                let tier = Tier::from_priority(chunk.has_priority());
                chunk.release();

                if advanced && !edited {
                    slot.metrics.record(elapsed);
                    debug!(
                        "Stage {} finished chunk ({}, {}) in {:?}",
                        slot.task.name(),
                        sample.coordinate.x,
                        sample.coordinate.y,
                        elapsed
                    );
                    self.route(Sample { tier, ..sample }, output);
                } else if advanced {
                    debug!(
                        "Chunk ({}, {}) was edited during {}, running it again",
                        sample.coordinate.x,
                        sample.coordinate.y,
                        slot.task.name()
                    );
                    self.route(Sample { tier, ..sample }, input);
                }
            }
            Err(PipelineError::ChunkMissing(coordinate)) => {
                chunk.release();
                debug!(
                    "Chunk ({}, {}) was unloaded during {}, dropping its sample",
                    coordinate.x,
                    coordinate.y,
                    slot.task.name()
                );
            }
            Err(err) => {
                error!(
                    "Stage {} failed for chunk ({}, {}): {}",
                    slot.task.name(),
                    sample.coordinate.x,
                    sample.coordinate.y,
                    err
                );
                chunk.set_status(ChunkStatus::Failed);
                chunk.release();
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.release_parked();
        true
    }
}

fn worker_loop(shared: Arc<PipelineShared>, index: usize) {
    info!("Pipeline worker {} started", index);
    while shared.running.load(Ordering::Acquire) {
        shared.wake.wait(&shared.running);
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
        if !shared.run_once() {
            shared.wake.lower_unless(|| shared.has_runnable());
        }
    }
    info!("Pipeline worker {} stopped", index);
}

/// The three stages every chunk goes through before upload.
///
/// # Arguments
/// * `world` - Supplies the config and block registry the stages share
/// * `noise` - Noise fields for terrain generation
/// * `atlas` - Texture lookup for the mesher
pub fn default_stages(
    world: &World,
    noise: Arc<dyn NoiseProvider>,
    atlas: Arc<dyn TextureAtlas>,
) -> Vec<Box<dyn StageTask>> {
    let registry = world.registry().clone();
    let generator = TerrainGenerator::new(world.config().clone(), noise, registry.clone());
    let propagator = LightPropagator::new(registry.clone());
    let mesher = ChunkMesher::new(registry, atlas);

    vec![
        Box::new(ChunkGenerationTask::new(Arc::new(generator))),
        Box::new(ChunkLightTask::new(Arc::new(propagator))),
        Box::new(ChunkMeshGenerationTask::new(Arc::new(mesher))),
    ]
}

/// Drives chunks through the pipeline on a pool of worker threads.
///
/// The scheduler is `Send + Sync`; everything except `poll_uploads` may be
/// called from any thread.
pub struct PipelineScheduler {
    shared: Arc<PipelineShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    presenter_thread: OnceLock<ThreadId>,
}

impl PipelineScheduler {
    /// Creates a scheduler with the default generation, light and mesh stages.
    /// No worker runs until [`PipelineScheduler::start`] is called.
    pub fn new(
        world: Arc<World>,
        noise: Arc<dyn NoiseProvider>,
        atlas: Arc<dyn TextureAtlas>,
    ) -> Self {
        let stages = default_stages(&world, noise, atlas);
        Self::with_stages(world, stages)
    }

    /// Creates a scheduler running the given stages.
    ///
    /// Each stage is looked up by its input status. A stage whose output is
    /// `Upload` feeds the upload queue.
    pub fn with_stages(world: Arc<World>, stages: Vec<Box<dyn StageTask>>) -> Self {
        let render_radius = world.config().render_radius;
        let stages = stages
            .into_iter()
            .map(|task| StageSlot {
                task,
                queue: TieredQueue::new(),
                metrics: StageMetrics::default(),
            })
            .collect();

        PipelineScheduler {
            shared: Arc::new(PipelineShared {
                world,
                stages,
                uploads: TieredQueue::new(),
                wake: WakeSignal::new(),
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                render_radius: AtomicI32::new(render_radius),
                uploaded: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
            workers: Mutex::new(Vec::new()),
            presenter_thread: OnceLock::new(),
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.shared.world
    }

    /// Spawns `worker_count` workers. Does nothing if workers are already running.
    ///
    /// # Errors
    /// `PipelineError::Spawn` if the OS refuses a thread. Workers spawned
    /// before the failure keep running until `shutdown`.
    pub fn start(&self, worker_count: usize) -> Result<(), PipelineError> {
        let mut workers = self.workers.lock().unwrap();
        if !workers.is_empty() {
            warn!("Pipeline already running with {} workers", workers.len());
            return Ok(());
        }

        info!(
            "Starting {} pipeline workers (available parallelism: {:?})",
            worker_count,
            thread::available_parallelism()
        );
        self.shared.running.store(true, Ordering::Release);

        for index in 0..worker_count {
            let shared = Arc::clone(&self.shared);
            let worker = thread::Builder::new()
                .name(format!("pipeline-worker-{index}"))
                .spawn(move || worker_loop(shared, index))
                .map_err(PipelineError::Spawn)?;
            workers.push(worker);
        }

        if self.shared.has_runnable() {
            self.shared.wake.raise();
        }
        Ok(())
    }

    /// Asks for the chunk at `coordinate` to be brought to `Done`.
    ///
    /// Creates the chunk if needed and queues it for the stage matching its
    /// current status. `Done` and `Failed` chunks are left alone. Requesting a
    /// chunk that is already queued only refreshes its distance and tier.
    ///
    /// # Arguments
    /// * `coordinate` - The chunk column
    /// * `distance` - Chebyshev distance to the observer, in chunks
    /// * `high_priority` - Serve this chunk ahead of every low priority one
    pub fn request(&self, coordinate: ChunkCoordinate, distance: i32, high_priority: bool) {
        let chunk = self.shared.world.get_or_create_chunk(coordinate);
        let status = chunk.status();
        if matches!(status, ChunkStatus::Done | ChunkStatus::Failed) {
            return;
        }
        if high_priority {
            chunk.set_priority(true);
        }

        let sample = Sample::new(coordinate, distance, Tier::from_priority(chunk.has_priority()));
        if self.shared.route(sample, status) {
            self.shared.release_parked();
        }
    }

    /// Publishes every chunk waiting for upload and marks it `Done`.
    ///
    /// The first thread to call this becomes the presentation thread.
    ///
    /// # Returns
    /// Number of chunks published.
    ///
    /// # Errors
    /// `PipelineError::WrongThread` when called from any other thread.
    pub fn poll_uploads(&self, presenter: &mut dyn MeshPresenter) -> Result<usize, PipelineError> {
        let caller = thread::current().id();
        let owner = *self.presenter_thread.get_or_init(|| caller);
        if owner != caller {
            return Err(PipelineError::WrongThread { owner, caller });
        }

        let mut published = 0;
        while let Some(sample) = self.shared.uploads.pop() {
            let Some(chunk) = self.shared.world.get_chunk_at(sample.coordinate) else {
                continue;
            };
            if chunk.status() != ChunkStatus::Upload {
                continue;
            }

            for mesh in chunk.meshes().iter() {
                presenter.upload_section(sample.coordinate, mesh.section, mesh);
            }
            if chunk.advance_status(ChunkStatus::Upload, ChunkStatus::Done) {
                chunk.set_priority(false);
                published += 1;
            }
        }

        if published > 0 {
            self.shared
                .uploaded
                .fetch_add(published as u64, Ordering::Relaxed);
            debug!("Published {} chunks", published);
        }
        Ok(published)
    }

    /// Runs one generation, light and mesh attempt on the calling thread.
    ///
    /// # Returns
    /// `true` if any stage queue yielded a sample. `false` means nothing is
    /// runnable: every remaining sample is parked.
    pub fn tick(&self) -> bool {
        self.shared.run_once()
    }

    /// Re-queues the chunks affected by an edit at `position`.
    ///
    /// The owning chunk goes back to `Light` so new light sources (and light
    /// flowing into a freshly opened voxel) get propagated; its eight
    /// neighbors go back to `Mesh` so border faces are rebuilt. Chunks that
    /// never reached those stages are untouched.
    pub fn block_changed(&self, position: Point3<i32>) {
        let world = &self.shared.world;
        let coordinate = world.chunk_coordinate_of(position);

        if let Some(chunk) = world.get_chunk_at(coordinate) {
            if chunk.status().has_reached(ChunkStatus::Light) {
                {
                    let mut volume = chunk.volume_mut();
                    for side in BlockSide::all() {
                        for channel in LightChannel::ALL {
                            volume.enqueue_light(channel, position + side.offset());
                        }
                    }
                }
                chunk.touch();
                chunk.set_priority(true);
                chunk.set_status(ChunkStatus::Light);
                self.shared
                    .route(Sample::new(coordinate, 0, Tier::High), ChunkStatus::Light);
            }
        }

        for (dx, dz) in slot_offsets().filter(|offset| *offset != (0, 0)) {
            let neighbor = Point2::new(coordinate.x + dx, coordinate.y + dz);
            let Some(chunk) = world.get_chunk_at(neighbor) else {
                continue;
            };
            if chunk.status().has_reached(ChunkStatus::Mesh) {
                chunk.touch();
                chunk.set_priority(true);
                chunk.set_status(ChunkStatus::Mesh);
                self.shared
                    .route(Sample::new(neighbor, 0, Tier::High), ChunkStatus::Mesh);
            }
        }

        self.shared.release_parked();
    }

    pub fn render_radius(&self) -> i32 {
        self.shared.render_radius.load(Ordering::Acquire)
    }

    /// Changes the radius the light and mesh stages work within.
    pub fn set_render_radius(&self, radius: i32) {
        let previous = self.shared.render_radius.swap(radius, Ordering::AcqRel);
        if previous != radius {
            info!("Render radius changed from {} to {}", previous, radius);
        }
        self.shared.release_parked();
    }

    /// Drops queued samples for chunks farther than `radius` from `center`.
    ///
    /// Remaining samples get their distance recomputed against `center` and
    /// parked ones are released to re-check readiness. The chunks themselves
    /// stay in the world.
    ///
    /// # Returns
    /// Number of samples dropped.
    pub fn discard_outside(&self, center: ChunkCoordinate, radius: i32) -> usize {
        let dropped: usize = self
            .shared
            .stages
            .iter()
            .map(|slot| slot.queue.retain_within(center, radius))
            .sum();
        // Distances changed, so parked samples may have become ready.
        self.shared.release_parked();
        if dropped > 0 {
            debug!(
                "Discarded {} samples outside radius {} of ({}, {})",
                dropped, radius, center.x, center.y
            );
        }
        dropped
    }

    pub fn status(&self, coordinate: ChunkCoordinate) -> Option<ChunkStatus> {
        self.shared.world.status_of(coordinate)
    }

    pub fn stats(&self) -> PipelineStats {
        let timings = |status| {
            self.shared
                .slot_for(status)
                .map(|slot| slot.metrics.snapshot())
                .unwrap_or_default()
        };

        PipelineStats {
            generation: timings(ChunkStatus::Empty),
            light: timings(ChunkStatus::Light),
            meshing: timings(ChunkStatus::Mesh),
            uploaded: self.shared.uploaded.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            queued: self.shared.stages.iter().map(|slot| slot.queue.len()).sum(),
            parked: self
                .shared
                .stages
                .iter()
                .map(|slot| slot.queue.parked_len())
                .sum(),
        }
    }

    /// Stops and joins every worker. Queued samples are kept, so the pipeline
    /// can be restarted or driven with `tick()` afterwards.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.wake.raise();

        let workers: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        if workers.is_empty() {
            return;
        }
        for worker in workers {
            if worker.join().is_err() {
                error!("A pipeline worker exited with a panic");
            }
        }
        info!("Pipeline workers stopped");
    }
}

impl Drop for PipelineScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
