//! CPU-side costs paid at startup or once per frame.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use metaball_particles::{
    CameraMatrices, Cubemap, FramePlan, MeshData, MeshShape, OrbitCamera, Projection, SceneConfig,
};

fn bench_mesh_build(c: &mut Criterion) {
    c.bench_function("mesh_icosphere", |b| {
        b.iter(|| MeshData::build(black_box(MeshShape::Icosphere)))
    });
}

fn bench_frame_setup(c: &mut Criterion) {
    let projection = Projection::new(1920, 1080);
    let config = SceneConfig::default().with_downsample(2.0);
    let mut camera = OrbitCamera::new();
    let mut frame = 0u64;

    c.bench_function("frame_setup", |b| {
        b.iter(|| {
            frame += 1;
            camera.follow_auto_orbit(frame);
            let matrices = CameraMatrices::new(&camera, &projection);
            let plan = FramePlan::new(&config, 1920, 1080);
            black_box((matrices, plan))
        })
    });
}

fn bench_procedural_sky(c: &mut Criterion) {
    c.bench_function("procedural_sky_128", |b| {
        b.iter(|| Cubemap::procedural(black_box(128)))
    });
}

criterion_group!(benches, bench_mesh_build, bench_frame_setup, bench_procedural_sky);
criterion_main!(benches);
