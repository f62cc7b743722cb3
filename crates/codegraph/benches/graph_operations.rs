use codegraph::{
    CodeGraph, EdgeKind, EdgeMetadata, Entity, EntityKind, QualifiedName, Signature,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn populate(size: usize) -> (CodeGraph, Vec<codegraph::EntityId>) {
    let mut graph = CodeGraph::new();
    let global = graph.global_namespace();
    let ids: Vec<_> = (0..size)
        .map(|i| {
            let entity = Entity::new(EntityKind::Function, QualifiedName::new([format!("func_{i}")]))
                .with_signature(Signature::new(["int"]).with_return_type("int"));
            let id = graph.put_entity(entity).unwrap().id();
            graph
                .put_edge(global, id, EdgeKind::Contains, EdgeMetadata::None)
                .unwrap();
            id
        })
        .collect();
    (graph, ids)
}

fn bench_entity_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_lookup");

    for size in [1000, 10_000, 100_000].iter() {
        let (graph, ids) = populate(*size);
        group.bench_with_input(BenchmarkId::new("lookup", size), size, |b, _| {
            let id = ids[ids.len() / 2];
            b.iter(|| {
                black_box(graph.entity(id).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_override_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("override_closure");

    for fanout in [10, 100, 1000].iter() {
        let mut graph = CodeGraph::new();
        let root = graph
            .put_entity(Entity::new(EntityKind::Method, QualifiedName::parse("Base::f")))
            .unwrap()
            .id();
        for i in 0..*fanout {
            let overrider = graph
                .put_entity(Entity::new(
                    EntityKind::Method,
                    QualifiedName::new([format!("Derived{i}"), "f".to_string()]),
                ))
                .unwrap()
                .id();
            graph
                .put_edge(overrider, root, EdgeKind::Overrides, EdgeMetadata::None)
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("edges_to", fanout), fanout, |b, _| {
            b.iter(|| {
                black_box(graph.edges_to(root, Some(EdgeKind::Overrides)).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100, 1000, 10_000].iter() {
        let (partial, _) = populate(*size);
        group.bench_with_input(BenchmarkId::new("partial", size), size, |b, _| {
            b.iter_with_setup(CodeGraph::new, |mut target| {
                black_box(target.merge(&partial).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_entity_lookup, bench_override_closure, bench_merge);
criterion_main!(benches);
