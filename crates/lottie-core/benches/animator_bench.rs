use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use lottie_core::{KeyframeTrack, TrackKeyframe, TransformDescriptor, TransformTree};

fn animated_descriptor(seed: f32) -> TransformDescriptor {
    TransformDescriptor {
        rotation_z: KeyframeTrack::from_keyframes(vec![
            TrackKeyframe::linear(0.0, 0.0),
            TrackKeyframe::linear(60.0, 360.0 + seed),
        ]),
        position: Some(KeyframeTrack::from_keyframes(vec![
            TrackKeyframe::linear(0.0, Vec3::new(seed, 0.0, 0.0)),
            TrackKeyframe::linear(60.0, Vec3::new(seed, 50.0, 0.0)),
        ])),
        ..Default::default()
    }
}

fn static_descriptor(seed: f32) -> TransformDescriptor {
    TransformDescriptor {
        position: Some(KeyframeTrack::constant(Vec3::new(seed, seed, 0.0))),
        ..Default::default()
    }
}

/// A chain of `depth` nodes whose root is animated: every frame rebuilds all.
fn chain(depth: usize) -> TransformTree {
    let mut tree = TransformTree::new();
    let mut parent = None;
    for i in 0..depth {
        let desc = if i == 0 {
            animated_descriptor(0.0)
        } else {
            static_descriptor(i as f32)
        };
        parent = tree.add_node(&desc, parent).ok();
    }
    tree
}

/// One animated root with `width` static leaves, plus `width` static roots
/// that never need a rebuild after the first frame.
fn fan(width: usize) -> TransformTree {
    let mut tree = TransformTree::new();
    if let Ok(root) = tree.add_node(&animated_descriptor(0.0), None) {
        for i in 0..width {
            let _ = tree.add_node(&static_descriptor(i as f32), Some(root));
        }
    }
    for i in 0..width {
        let _ = tree.add_node(&static_descriptor(i as f32), None);
    }
    tree
}

fn bench_update_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_tree");

    for depth in [10usize, 100] {
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, &depth| {
            let mut tree = chain(depth);
            let mut frame = 0.0f32;
            b.iter(|| {
                frame = (frame + 1.0) % 60.0;
                black_box(tree.update_tree(black_box(frame), false));
            });
        });
    }

    group.bench_function("fan_100", |b| {
        let mut tree = fan(100);
        let mut frame = 0.0f32;
        b.iter(|| {
            frame = (frame + 1.0) % 60.0;
            black_box(tree.update_tree(black_box(frame), false));
        });
    });

    group.bench_function("chain_100_forced", |b| {
        let mut tree = chain(100);
        b.iter(|| black_box(tree.update_tree(black_box(30.0), true)));
    });

    group.finish();
}

fn bench_keyframe_track(c: &mut Criterion) {
    let track = KeyframeTrack::from_keyframes(
        (0..64)
            .map(|i| TrackKeyframe::linear(i as f32 * 10.0, i as f32))
            .collect(),
    );

    c.bench_function("keyframe_track_value_at", |b| {
        b.iter(|| black_box(track.value_at(black_box(317.5))))
    });
}

criterion_group!(benches, bench_update_tree, bench_keyframe_track);
criterion_main!(benches);
