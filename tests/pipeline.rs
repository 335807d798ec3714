use std::thread;
use std::time::Duration;

use cgmath::{Point2, Point3};
use voxel_pipeline::engine_state::voxels::block::BlockId;
use voxel_pipeline::engine_state::voxels::light::LightChannel;
use voxel_pipeline::engine_state::voxels::world::chunks_in_radius;
use voxel_pipeline::{ChunkStatus, EngineConfig, EngineState, MeshBufferState};
use web_time::Instant;

const TIMEOUT: Duration = Duration::from_secs(60);

fn threaded_config() -> EngineConfig {
    EngineConfig {
        seed: 7,
        chunk_size: 16,
        section_count: 2,
        sea_level: 12,
        render_radius: 3,
        worker_count: 3,
    }
}

/// Polls uploads until `done` holds or the timeout expires.
fn pump_until(
    state: &mut EngineState,
    presenter: &mut MeshBufferState,
    mut done: impl FnMut(&EngineState) -> bool,
) {
    let started = Instant::now();
    loop {
        state.process_uploads(presenter).unwrap();
        if done(state) {
            return;
        }
        assert!(started.elapsed() < TIMEOUT, "pipeline did not finish in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn workers_build_the_area_around_the_observer() {
    let mut state = EngineState::new(threaded_config()).unwrap();
    state.start().unwrap();
    let mut presenter = MeshBufferState::new();

    state.update_observer(Point3::new(4, 20, 4));
    pump_until(&mut state, &mut presenter, |state| {
        chunks_in_radius(Point2::new(0, 0), 1)
            .iter()
            .all(|(coordinate, _)| state.status(*coordinate) == Some(ChunkStatus::Done))
    });

    // Distance 2 is lit but never meshed, distance 3 only generated.
    let settled = Instant::now();
    while state.status(Point2::new(2, 2)) != Some(ChunkStatus::Mesh) {
        assert!(settled.elapsed() < TIMEOUT);
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(state.status(Point2::new(3, 0)), Some(ChunkStatus::Light));

    let stats = state.stats();
    assert_eq!(stats.uploaded, 9);
    assert_eq!(stats.failed, 0);
    assert_eq!(presenter.chunk_count(), 9);
    assert!(presenter.quad_count() > 0);

    state.shutdown();
}

#[test]
fn placing_sand_lights_its_surroundings() {
    let mut state = EngineState::new(threaded_config()).unwrap();
    state.start().unwrap();
    let mut presenter = MeshBufferState::new();
    state.update_observer(Point3::new(0, 0, 0));
    pump_until(&mut state, &mut presenter, |state| {
        state.status(Point2::new(0, 0)) == Some(ChunkStatus::Done)
    });

    let above = Point3::new(8, 31, 8);
    let sand = Point3::new(8, 30, 8);
    state.set_block(above, BlockId::AIR).unwrap();
    assert!(state.set_block(sand, BlockId::SAND).unwrap());
    assert_ne!(state.status(Point2::new(0, 0)), Some(ChunkStatus::Done));

    pump_until(&mut state, &mut presenter, |state| {
        state.status(Point2::new(0, 0)) == Some(ChunkStatus::Done)
    });

    let world = &state.world;
    assert_eq!(world.light_at(sand, LightChannel::Red), 15);
    assert_eq!(world.light_at(above, LightChannel::Red), 14);
    assert_eq!(world.light_at(above, LightChannel::Blue), 14);
    assert_eq!(world.light_at(above, LightChannel::Green), 0);

    state.shutdown();
}

#[test]
fn shutdown_with_pending_work_returns() {
    let config = EngineConfig {
        render_radius: 12,
        ..threaded_config()
    };
    let mut state = EngineState::new(config).unwrap();
    state.start().unwrap();
    state.update_observer(Point3::new(0, 0, 0));

    state.shutdown();

    // Nothing runs once the workers are gone.
    let stats = state.stats();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(state.stats().generation.completed, stats.generation.completed);
}
