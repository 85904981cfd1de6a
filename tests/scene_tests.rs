//! Integration tests for the CPU side of a frame.
//!
//! These exercise the public API the way the app drives it: a scene loaded
//! from disk, a particle grid built from it, the ping-pong schedule across
//! several frames and the camera following its orbit.

use glam::Vec3;
use metaball_particles::camera::auto_orbit_position;
use metaball_particles::frame::{downsample_extent, FrameSchedule};
use metaball_particles::grid::MAX_TEXTURE_SIDE;
use metaball_particles::{
    CameraMatrices, CompositeMode, ConfigError, Cubemap, FramePlan, MeshData, MeshShape,
    OrbitCamera, ParticleGrid, PingPong, Projection, SceneConfig, TextureError,
};

// ============================================================================
// Scene files
// ============================================================================

#[test]
fn test_scene_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenes").join("swirl.toml");

    let config = SceneConfig::new()
        .with_particle_count(1024)
        .with_downsample(2.5)
        .with_debug_mesh(MeshShape::Cube)
        .with_cube_range(Vec3::new(2.0, 4.0, 2.0));
    config.save(&path).unwrap();

    let loaded = SceneConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_scene_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "particle_count = 256\nrender_raymarch = false\n").unwrap();

    let loaded = SceneConfig::load(&path).unwrap();
    let defaults = SceneConfig::default();
    assert_eq!(loaded.particle_count, 256);
    assert!(!loaded.render_raymarch);
    assert_eq!(loaded.epsilon, defaults.epsilon);
    assert_eq!(loaded.debug_mesh, defaults.debug_mesh);
}

#[test]
fn test_out_of_range_scene_file_is_clamped() {
    let loaded = SceneConfig::from_toml_str(
        "time_delta = 4.0\nepsilon = 0.5\nstay_in_cube_range = [0.0, 9.0, 3.0]\n",
    )
    .unwrap();
    assert_eq!(loaded.time_delta, 1.0);
    assert_eq!(loaded.epsilon, 0.01);
    assert_eq!(loaded.stay_in_cube_range, [1.0, 5.0, 3.0]);
}

#[test]
fn test_missing_scene_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SceneConfig::load(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_scene_file_count_is_validated_by_grid() {
    let config = SceneConfig::from_toml_str("particle_count = 50\n").unwrap();
    let err = ParticleGrid::new(config.particle_count).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParticleCount(50)));
}

#[test]
fn test_oversized_particle_count_fails_before_gpu() {
    let config = SceneConfig::default()
        .with_particle_count(100_000_000)
        .sanitized();
    let err = ParticleGrid::new(config.particle_count).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ParticleGridTooLarge { side: 10_000, max: MAX_TEXTURE_SIDE, .. }
    ));
}

// ============================================================================
// Frame schedule
// ============================================================================

#[test]
fn test_schedule_alternates_slots_while_running() {
    // Frame n renders what frame n-1's update did not write
    let mut slots = PingPong::from_fn(|slot| slot);
    let mut schedule = FrameSchedule::new();
    let mut rendered = Vec::new();
    for _ in 0..4 {
        let steps = schedule.begin(&slots, true);
        assert_eq!(steps.update, Some(steps.render));
        rendered.push(*slots.get(steps.render));
        schedule.finish(&steps, &mut slots);
    }
    assert_eq!(rendered, vec![0, 1, 0, 1]);
}

#[test]
fn test_schedule_pause_then_reset() {
    let mut slots = PingPong::from_fn(|slot| slot);
    let mut schedule = FrameSchedule::new();

    let first = schedule.begin(&slots, true);
    schedule.finish(&first, &mut slots);

    let paused = schedule.begin(&slots, false);
    assert_eq!(paused.render, first.render);
    assert_eq!((paused.init, paused.update, paused.swap), (None, None, false));
    schedule.finish(&paused, &mut slots);

    schedule.reseed();
    let reseeded = schedule.begin(&slots, false);
    assert_eq!(reseeded.init, Some(reseeded.render));
}

#[test]
fn test_grid_covers_every_particle() {
    for count in [1, 4, 64, 100, 4096] {
        let grid = ParticleGrid::new(count).unwrap();
        let covered = grid.workgroups() * metaball_particles::grid::WORKGROUP_EDGE;
        assert!(covered >= grid.side());
        assert!(grid.texel_of(count - 1).is_some());
        assert!(grid.texel_of(count).is_none());
    }
}

#[test]
fn test_plan_follows_toggles() {
    let mut config = SceneConfig::default();
    assert_eq!(
        FramePlan::new(&config, 1280, 720).composite,
        CompositeMode::Raymarch
    );

    config = config.with_downsample(2.0);
    assert_eq!(
        FramePlan::new(&config, 1280, 720).composite,
        CompositeMode::RaymarchDownsampled {
            width: 640,
            height: 360
        }
    );

    config = config.with_raymarch_enabled(false).with_debug_mesh_enabled(false);
    let plan = FramePlan::new(&config, 1280, 720);
    assert_eq!(plan.composite, CompositeMode::Passthrough);
    assert!(!plan.draw_debug_mesh);
}

#[test]
fn test_downsample_extent_never_zero() {
    assert_eq!(downsample_extent(1, 1, 3.0), (1, 1));
    assert_eq!(downsample_extent(1001, 7, 2.0), (500, 3));
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn test_camera_follows_orbit() {
    let mut camera = OrbitCamera::new();
    for frame in [0u64, 90, 360, 719] {
        camera.follow_auto_orbit(frame);
        let expected = auto_orbit_position(frame);
        assert!((camera.position() - expected).length() < 1e-3);
    }
}

#[test]
fn test_camera_matrices_invert() {
    let mut camera = OrbitCamera::new();
    camera.follow_auto_orbit(200);
    let matrices = CameraMatrices::new(&camera, &Projection::new(1280, 720));

    let origin = matrices.inv_view.transform_point3(Vec3::ZERO);
    assert!((origin - matrices.position).length() < 1e-3);

    let identity = matrices.proj * matrices.inv_proj;
    assert!(identity.abs_diff_eq(glam::Mat4::IDENTITY, 1e-4));
}

// ============================================================================
// Assets
// ============================================================================

#[test]
fn test_sky_directory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = Cubemap::procedural(8);
    for (face, name) in metaball_particles::sky::FACE_NAMES.iter().enumerate() {
        let img = image::RgbaImage::from_raw(8, 8, source.faces[face].clone()).unwrap();
        img.save(dir.path().join(format!("{}.png", name))).unwrap();
    }

    let loaded = Cubemap::load_dir(dir.path()).unwrap();
    assert_eq!(loaded.size, 8);
    assert_eq!(loaded.faces, source.faces);
}

#[test]
fn test_sky_directory_missing_face() {
    let dir = tempfile::tempdir().unwrap();
    let err = Cubemap::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, TextureError::MissingFace { face: "px", .. }));
}

#[test]
fn test_every_mesh_shape_builds() {
    for shape in [MeshShape::Cube, MeshShape::Octahedron, MeshShape::Icosphere] {
        let mesh = MeshData::build(shape);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.index_count() % 3, 0);
    }
    assert!(MeshData::build(MeshShape::None).is_empty());
}
