//! Benchmarks for node selection over large layered DAGs
//!
//! Each layer depends on the previous one, which makes `+` and `@`
//! expansions touch most of the graph.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dagsel_dbt::{Graph, Manifest};
use dagsel_selector::NodeSelector;

/// Generate a manifest with `layers` x `width` models, a schema test per
/// model and every tenth model ephemeral
fn generate_layered_manifest(layers: usize, width: usize) -> Manifest {
    let mut nodes = serde_json::Map::new();

    for layer in 0..layers {
        for i in 0..width {
            let name = format!("model_{}_{}", layer, i);
            let model_id = format!("model.project.{}", name);

            // Each model depends on two models of the previous layer
            let depends_on: Vec<String> = if layer > 0 {
                [i, (i + 1) % width]
                    .iter()
                    .map(|j| format!("model.project.model_{}_{}", layer - 1, j))
                    .collect()
            } else {
                vec![]
            };

            let materialized = if (layer * width + i) % 10 == 0 { "ephemeral" } else { "table" };
            let tags = if i % 2 == 0 { vec!["even"] } else { vec!["odd"] };

            nodes.insert(
                model_id.clone(),
                serde_json::json!({
                    "unique_id": &model_id,
                    "name": &name,
                    "resource_type": "model",
                    "package_name": "project",
                    "original_file_path": format!("models/layer_{}/{}.sql", layer, name),
                    "fqn": ["project", format!("layer_{}", layer), &name],
                    "tags": tags,
                    "config": {"materialized": materialized},
                    "depends_on": {"nodes": depends_on}
                }),
            );

            let test_id = format!("test.project.not_null_{}_id", name);
            nodes.insert(
                test_id.clone(),
                serde_json::json!({
                    "unique_id": &test_id,
                    "name": format!("not_null_{}_id", name),
                    "resource_type": "test",
                    "package_name": "project",
                    "fqn": ["project", "schema_test", format!("not_null_{}_id", name)],
                    "test_metadata": {"name": "not_null"},
                    "depends_on": {"nodes": [&model_id]}
                }),
            );
        }
    }

    let json = serde_json::json!({ "nodes": nodes }).to_string();
    Manifest::from_str(&json).expect("generated manifest parses")
}

/// Benchmark: select everything downstream of the first layer
fn bench_children_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("children_selection");

    for layers in [10, 50, 100].iter() {
        let manifest = generate_layered_manifest(*layers, 20);
        let graph = Graph::from_manifest(&manifest);
        let selector = NodeSelector::new(&graph, &manifest);
        let include = vec!["layer_0+".to_string()];

        group.bench_with_input(BenchmarkId::from_parameter(layers), layers, |b, _| {
            b.iter(|| black_box(selector.select(Some(&include[..]), None).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: `@` expansion from the middle of the graph
fn bench_childrens_parents(c: &mut Criterion) {
    let mut group = c.benchmark_group("childrens_parents");

    for layers in [10, 50, 100].iter() {
        let manifest = generate_layered_manifest(*layers, 20);
        let graph = Graph::from_manifest(&manifest);
        let selector = NodeSelector::new(&graph, &manifest);
        let include = vec![format!("@model_{}_0", layers / 2)];

        group.bench_with_input(BenchmarkId::from_parameter(layers), layers, |b, _| {
            b.iter(|| black_box(selector.select(Some(&include[..]), None).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: intersections and exclusions over tag and fqn searches
fn bench_set_operations(c: &mut Criterion) {
    let manifest = generate_layered_manifest(50, 20);
    let graph = Graph::from_manifest(&manifest);
    let selector = NodeSelector::new(&graph, &manifest);
    let include = vec!["tag:even,layer_10+".to_string(), "config.materialized:ephemeral".to_string()];
    let exclude = vec!["layer_40+".to_string()];

    c.bench_function("set_operations", |b| {
        b.iter(|| black_box(selector.select(Some(&include[..]), Some(&exclude[..])).unwrap()));
    });
}

/// Benchmark: dependency ordering of a large selection
fn bench_execution_order(c: &mut Criterion) {
    let manifest = generate_layered_manifest(100, 20);
    let graph = Graph::from_manifest(&manifest);
    let selector = NodeSelector::new(&graph, &manifest);
    let selected = selector.select(None::<&[String]>, None).unwrap().selected;

    c.bench_function("execution_order", |b| {
        b.iter(|| black_box(selector.execution_order(&selected)));
    });
}

criterion_group!(
    benches,
    bench_children_selection,
    bench_childrens_parents,
    bench_set_operations,
    bench_execution_order
);
criterion_main!(benches);
