use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strata::{Direction, EngineConfig, InMemoryCache, InMemoryDatastore, Mapper, SchemaRegistry};
use strata_codec::{flatten, unflatten};
use strata_schema::fixtures::{sample_parent, Parent};
use tokio::runtime::Runtime;

fn schema_indexing(c: &mut Criterion) {
    c.bench_function("schema/index_fresh", |b| {
        b.iter(|| {
            let registry = SchemaRegistry::new();
            black_box(registry.ensure::<Parent>().unwrap());
        })
    });

    let registry = SchemaRegistry::new();
    registry.ensure::<Parent>().unwrap();
    c.bench_function("schema/index_cached", |b| {
        b.iter(|| black_box(registry.ensure::<Parent>().unwrap()))
    });
}

fn codec(c: &mut Criterion) {
    let schema = SchemaRegistry::new().ensure::<Parent>().unwrap();
    let parent = sample_parent("bench", 42);
    let props = flatten(&parent, &schema).unwrap();

    c.bench_function("codec/flatten", |b| {
        b.iter(|| black_box(flatten(&parent, &schema).unwrap()))
    });
    c.bench_function("codec/unflatten", |b| {
        b.iter(|| {
            let mut loaded = Parent::default();
            unflatten(&props, &schema, &mut loaded).unwrap();
            black_box(loaded)
        })
    });
}

fn mapper(config: EngineConfig) -> Mapper {
    Mapper::with_config(
        Arc::new(InMemoryDatastore::new()),
        Arc::new(InMemoryCache::new()),
        config,
    )
}

fn engine(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let m = mapper(EngineConfig::default());
    c.bench_function("engine/create_read", |b| {
        b.iter_batched(
            || sample_parent("bench", 7),
            |mut parent| {
                rt.block_on(async {
                    let ctx = m.context();
                    ctx.create(&mut parent).await.unwrap();
                    let mut loaded = Parent::default();
                    loaded.model.set_key(parent.model.key().cloned().unwrap());
                    ctx.read(&mut loaded).await.unwrap();
                    black_box(loaded)
                })
            },
            BatchSize::SmallInput,
        )
    });

    let m = mapper(EngineConfig {
        batch_size: 100,
        key_chunk: 50,
        workers: 4,
        ..Default::default()
    });
    rt.block_on(async {
        let ctx = m.context();
        for i in 0..1000 {
            ctx.create(&mut sample_parent(&format!("p{i}"), i)).await.unwrap();
        }
    });
    let mut group = c.benchmark_group("engine/scan_1000");
    group.sample_size(20);
    group.bench_function("get", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ctx = m.context();
                black_box(
                    ctx.query::<Parent>()
                        .order_by("Num", Direction::Asc)
                        .get()
                        .await
                        .unwrap(),
                )
            })
        })
    });
    group.bench_function("get_multi", |b| {
        b.iter(|| {
            rt.block_on(async {
                let ctx = m.context();
                black_box(
                    ctx.query::<Parent>()
                        .order_by("Num", Direction::Asc)
                        .get_multi()
                        .await
                        .unwrap(),
                )
            })
        })
    });
    group.finish();
}

criterion_group!(benches, schema_indexing, codec, engine);
criterion_main!(benches);
