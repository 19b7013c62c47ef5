use collidable::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

fn prepare_manager(count: usize) -> CollisionManager<()> {
    let mut manager = CollisionManager::default();
    let columns = (count as f32).sqrt().ceil() as usize;
    for i in 0..count {
        let id = manager.spawn((), ShapeDef::Circle { radius: 8.0 });
        if let Some(mut entity) = manager.get_mut(id) {
            let (x, y) = ((i % columns) as f32, (i / columns) as f32);
            entity.set_position(Vec2::new(x * 15.0, y * 15.0));
            entity.set_velocity(Vec2::new(if i % 2 == 0 { 20.0 } else { -20.0 }, 0.0));
        }
    }
    manager
}

fn bench_manager_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("manager_step");
    for &count in &[64usize, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("sensors", count), &count, |b, &count| {
            let mut manager = prepare_manager(count);
            manager.step(DT);
            b.iter(|| manager.step(black_box(DT)))
        });
    }
    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygon_partition");
    for &points in &[16usize, 64, 256] {
        let outline: Vec<Vec2> = (0..points)
            .map(|i| {
                let angle = i as f32 / points as f32 * std::f32::consts::TAU;
                Vec2::new(angle.cos(), angle.sin()) * 200.0
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("spawn", points), &outline, |b, outline| {
            b.iter(|| {
                let mut manager = CollisionManager::<()>::default();
                black_box(manager.spawn((), ShapeDef::Polygon(outline.clone())))
            })
        });
    }
    group.finish();
}

fn bench_area_query(c: &mut Criterion) {
    let manager = prepare_manager(1024);
    c.bench_function("query_area", |b| {
        b.iter(|| {
            black_box(manager.query_area(black_box(Vec2::new(100.0, 100.0)), Vec2::new(250.0, 250.0)))
        })
    });
}

criterion_group!(benches, bench_manager_step, bench_partition, bench_area_query);
criterion_main!(benches);
