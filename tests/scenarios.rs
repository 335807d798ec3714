use std::sync::Arc;

use cgmath::{Point2, Point3, Vector3};
use voxel_pipeline::engine_state::rendering::atlas::GridTextureAtlas;
use voxel_pipeline::engine_state::rendering::meshing::ChunkMesher;
use voxel_pipeline::engine_state::voxels::block::{BlockId, DefaultBlockRegistry};
use voxel_pipeline::engine_state::voxels::generation::{FbmNoiseProvider, TerrainGenerator};
use voxel_pipeline::engine_state::voxels::light::LightChannel;
use voxel_pipeline::engine_state::voxels::lighting::LightPropagator;
use voxel_pipeline::engine_state::voxels::world::{chunks_in_radius, World};
use voxel_pipeline::EngineConfig;

fn config() -> Arc<EngineConfig> {
    Arc::new(EngineConfig {
        chunk_size: 16,
        section_count: 2,
        sea_level: 12,
        render_radius: 3,
        worker_count: 0,
        ..EngineConfig::default()
    })
}

/// A world with the 3x3 chunks around the origin loaded and empty.
fn empty_world() -> World {
    let world = World::new(config(), Arc::new(DefaultBlockRegistry::with_builtin_blocks()));
    for (coordinate, _) in chunks_in_radius(Point2::new(0, 0), 1) {
        world.get_or_create_chunk(coordinate);
    }
    world
}

fn propagate(world: &World, coordinate: Point2<i32>) -> usize {
    let propagator = LightPropagator::new(world.registry().clone());
    world
        .with_neighborhood_mut(coordinate, |hood| propagator.propagate(hood))
        .unwrap()
}

#[test]
fn red_light_fades_by_manhattan_distance() {
    let world = empty_world();
    let source = Point3::new(3, 10, 5);
    world.add_light(source, 15, 0, 0);

    assert!(propagate(&world, Point2::new(0, 0)) > 0);

    for offset in [
        Vector3::new(1, 0, 0),
        Vector3::new(-1, 0, 0),
        Vector3::new(0, 1, 0),
        Vector3::new(0, -1, 0),
        Vector3::new(0, 0, 1),
        Vector3::new(0, 0, -1),
    ] {
        assert_eq!(world.light_at(source + offset, LightChannel::Red), 14);
    }
    // Across the border into chunk (-1, 0).
    assert_eq!(world.light_at(Point3::new(-2, 10, 5), LightChannel::Red), 10);
    assert_eq!(world.light_at(Point3::new(3, 10, 20), LightChannel::Red), 0);
    assert_eq!(world.light_at(source, LightChannel::Green), 0);

    // A second pass finds nothing left to do.
    assert_eq!(propagate(&world, Point2::new(0, 0)), 0);
}

#[test]
fn sunlight_falls_straight_down_and_spreads_sideways() {
    let world = empty_world();
    let top = Point3::new(8, 31, 8);
    world.set_light_at(top, LightChannel::Sun, 15);
    world.get_chunk_at(Point2::new(0, 0))
        .unwrap()
        .volume_mut()
        .enqueue_light(LightChannel::Sun, top);
    world.set_block_at(Point3::new(8, 4, 8), BlockId::STONE).unwrap();

    propagate(&world, Point2::new(0, 0));

    for y in 5..=31 {
        assert_eq!(world.light_at(Point3::new(8, y, 8), LightChannel::Sun), 15);
    }
    assert_eq!(world.light_at(Point3::new(9, 20, 8), LightChannel::Sun), 14);
    assert_eq!(world.light_at(Point3::new(10, 20, 8), LightChannel::Sun), 13);
    assert_eq!(world.light_at(Point3::new(8, 4, 8), LightChannel::Sun), 0);
    // Under the stone, light has to walk around it: four steps from (8, 5, 8).
    assert_eq!(world.light_at(Point3::new(8, 3, 8), LightChannel::Sun), 11);
}

#[test]
fn stone_column_meshes_to_its_outer_faces() {
    let world = empty_world();
    for y in 0..=10 {
        world.set_block_at(Point3::new(5, y, 5), BlockId::STONE).unwrap();
    }
    let mesher = ChunkMesher::new(
        world.registry().clone(),
        Arc::new(GridTextureAtlas::with_default_textures()),
    );

    let meshes = world
        .with_neighborhood(Point2::new(0, 0), |hood| mesher.mesh_chunk(hood))
        .unwrap();

    assert_eq!(meshes.len(), 2);
    assert_eq!(meshes[0].solid.quad_count(), 2 + 4 * 11);
    assert_eq!(meshes[0].solid.indices.len(), 6 * 46);
    assert!(meshes[1].is_empty());
}

#[test]
fn terrain_is_deterministic_per_seed() {
    let registry = Arc::new(DefaultBlockRegistry::with_builtin_blocks());
    let generate = |coordinate| {
        TerrainGenerator::new(config(), Arc::new(FbmNoiseProvider::new()), registry.clone())
            .generate(coordinate)
            .unwrap()
    };

    for coordinate in [Point2::new(0, 0), Point2::new(-3, 7)] {
        let first = generate(coordinate);
        let second = generate(coordinate);
        assert!(first.blocks().iter().eq(second.blocks().iter()));
        assert_eq!(first.light_store(), second.light_store());
    }
}
