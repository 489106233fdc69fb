use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use graphlens::cluster::ClusterTable;
use graphlens::compress::compress;
use graphlens::config::{Config, VisibilityConfig};
use graphlens::derive::derive;
use graphlens::error::Diagnostics;
use graphlens::ir::{EdgeInput, GraphInput, NodeInput};
use graphlens::render::render_svg;
use graphlens::{Graph, Network, TypeTag};
use std::hint::black_box;

const TYPES: [&str; 5] = ["user", "group", "repository", "file", "bot"];
const RELATIONS: [&str; 3] = ["memberOf", "owns", "writes"];

/// Organisation-like graph: `entities` nodes spread over five types, a chain
/// that keeps most of them connected, `extra_edges` cross relations and a tail
/// of unconnected nodes that end up in clusters.
fn synthetic_input(entities: usize, extra_edges: usize, isolated: usize) -> GraphInput {
    let mut input = GraphInput::default();
    for i in 0..entities + isolated {
        input.nodes.push(NodeInput {
            id: format!("n{i}"),
            type_tag: TypeTag::new(TYPES[i % TYPES.len()]),
            label: None,
            anchor: i == 0,
        });
    }
    let relation = |source: usize, target: usize, input: &mut GraphInput| {
        input.edges.push(EdgeInput {
            source_id: format!("n{source}"),
            target_id: format!("n{target}"),
            relation_tag: RELATIONS[(source + target) % RELATIONS.len()].to_string(),
        });
    };
    for i in 1..entities {
        relation(i - 1, i, &mut input);
    }
    let mut count = 0usize;
    'outer: for i in 0..entities {
        for j in (i + 3..entities).step_by(7) {
            if count >= extra_edges {
                break 'outer;
            }
            relation(i, j, &mut input);
            count += 1;
        }
    }
    input
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");
    let config = Config::default();
    for (entities, extra_edges) in [(50usize, 80usize), (200, 400), (800, 2000)] {
        let name = format!("org_{entities}_{extra_edges}");
        let input = synthetic_input(entities, extra_edges, 0);
        let (graph, _) = Graph::from_input(&input, &VisibilityConfig::default());
        for budget in [Some(entities / 4), None] {
            let label = match budget {
                Some(budget) => format!("{name}/budget_{budget}"),
                None => format!("{name}/full"),
            };
            let mut compression = config.compression.clone();
            compression.budget = budget;
            group.bench_with_input(BenchmarkId::from_parameter(label), &graph, |b, graph| {
                b.iter(|| {
                    let mut scored = graph.clone();
                    let selection =
                        compress(black_box(&mut scored), &compression, &mut Diagnostics::new());
                    black_box(selection.nodes.len());
                });
            });
        }
    }
    group.finish();
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    let config = Config::default();
    for (entities, extra_edges, isolated) in [(50usize, 80usize, 10usize), (400, 800, 60)] {
        let name = format!("org_{entities}_{extra_edges}_{isolated}");
        let input = synthetic_input(entities, extra_edges, isolated);
        let (base, _) = Graph::from_input(&input, &VisibilityConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(name), &base, |b, base| {
            b.iter(|| {
                let derivation = derive(
                    black_box(base),
                    None,
                    &config,
                    &Graph::new(),
                    &mut ClusterTable::new(),
                    &mut Diagnostics::new(),
                );
                black_box(derivation.graph.len());
            });
        });
    }
    group.finish();
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    group.sample_size(20);
    let config = Config::default();
    for (entities, extra_edges) in [(30usize, 40usize), (120, 200)] {
        let name = format!("ticks_{entities}_{extra_edges}");
        let input = synthetic_input(entities, extra_edges, 6);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, input| {
            b.iter(|| {
                let mut network = Network::with_input(config.clone(), input.clone());
                let report = network.run(black_box(100));
                black_box(report.max_displacement);
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(20);
    let config = Config::default();
    let input = synthetic_input(80, 120, 8);
    group.bench_function("org_80_120_8", |b| {
        b.iter(|| {
            let mut network = Network::with_input(config.clone(), black_box(input.clone()));
            network.run(60);
            let svg = render_svg(&network.frame(), &config.theme, &config.render);
            black_box(svg.len());
        });
    });
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_compress, bench_derive, bench_simulation, bench_end_to_end
);
criterion_main!(benches);
