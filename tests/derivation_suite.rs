use glam::Vec2;
use graphlens::cluster::ClusterTable;
use graphlens::compress::{BudgetBounds, compress};
use graphlens::config::{CompressionConfig, ForceWeights, VisibilityConfig, load_config};
use graphlens::derive::derive;
use graphlens::error::Diagnostics;
use graphlens::ir::{NodeKind, cluster_id};
use graphlens::layout::curve::EdgeCurve;
use graphlens::layout_dump::LayoutDump;
use graphlens::{Command, Config, Diagnostic, Graph, GraphInput, Network, TypeTag};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_input(name: &str) -> GraphInput {
    let path = fixtures_dir().join(name);
    let raw = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    GraphInput::from_json(&raw).unwrap_or_else(|err| panic!("failed to parse {name}: {err}"))
}

fn load_graph(name: &str) -> Graph {
    Graph::from_input(&load_input(name), &VisibilityConfig::default()).0
}

fn assert_finite(network: &Network, fixture: &str, step: &str) {
    let frame = network.frame();
    for node in &frame.nodes {
        assert!(
            node.x.is_finite() && node.y.is_finite(),
            "{fixture}: {} has non-finite position after {step}",
            node.id
        );
    }
    assert!(frame.is_finite(), "{fixture}: frame not finite after {step}");
}

fn assert_closed(graph: &Graph, fixture: &str) {
    for link in graph.links() {
        assert!(
            graph.contains(&link.source_id) && graph.contains(&link.target_id),
            "{fixture}: link {} -> {} is missing an endpoint",
            link.source_id,
            link.target_id
        );
    }
}

const FIXTURES: &[&str] = &[
    "star.json",
    "users_group.json",
    "isolated.json",
    "parallel.json",
    "mixed.json",
];

#[test]
fn fixtures_parse() {
    for name in FIXTURES {
        let input = load_input(name);
        assert!(!input.nodes.is_empty(), "{name}: no nodes");
    }
}

#[test]
fn star_with_single_element_budget_keeps_edge_endpoints() {
    let mut graph = load_graph("star.json");
    let config = CompressionConfig {
        budget: Some(1),
        class_priority: vec![TypeTag::new("host"), TypeTag::new("service")],
    };
    let mut diagnostics = Diagnostics::new();
    let selection = compress(&mut graph, &config, &mut diagnostics);

    assert_eq!(selection.pre_closure_count, 1);
    assert_eq!(selection.stats.rendered_edges, 1);
    assert!(selection.contains("center"));
    assert!(selection.contains("l1"));
    assert!(selection.contains("center-[runs]->l1"));
    assert_eq!(selection.nodes.len(), 3);
    for link in &selection.links {
        assert!(selection.contains(&link.source_id));
        assert!(selection.contains(&link.target_id));
    }
    assert!(
        diagnostics
            .iter()
            .any(|diagnostic| matches!(diagnostic, Diagnostic::BudgetOutOfRange { .. })),
        "budget below the type count is reported"
    );
}

#[test]
fn selection_respects_budget_before_closure() {
    for name in FIXTURES {
        let graph = load_graph(name);
        let bounds = BudgetBounds::of(&graph);
        for budget in 0..=bounds.c_max {
            let mut scored = graph.clone();
            let config = CompressionConfig {
                budget: Some(budget),
                class_priority: Vec::new(),
            };
            let selection = compress(&mut scored, &config, &mut Diagnostics::new());
            assert!(
                selection.pre_closure_count <= budget,
                "{name}: took {} elements for budget {budget}",
                selection.pre_closure_count
            );
            let active = scored.subgraph(&selection);
            assert_closed(&active, name);
        }

        let mut scored = graph.clone();
        let full = compress(&mut scored, &CompressionConfig::default(), &mut Diagnostics::new());
        assert_eq!(full.nodes.len(), graph.len(), "{name}: C_max drops nodes");
        assert_eq!(full.links.len(), graph.links().len(), "{name}: C_max drops links");
    }
}

#[test]
fn identical_input_gives_identical_layout() {
    for name in FIXTURES {
        let config = Config::default();
        let mut first = Network::with_input(config.clone(), load_input(name));
        let mut second = Network::with_input(config, load_input(name));
        for network in [&mut first, &mut second] {
            network.push(Command::SetBudget(Some(5)));
            network.run(40);
        }

        let positions = |network: &Network| -> Vec<(String, f32, f32)> {
            network
                .frame()
                .nodes
                .iter()
                .map(|node| (node.id.clone(), node.x, node.y))
                .collect()
        };
        assert_eq!(positions(&first), positions(&second), "{name}: layouts differ");
        assert_eq!(first.stats(), second.stats(), "{name}: stats differ");
    }
}

#[test]
fn users_and_one_group_render_without_clusters() {
    let mut network = Network::with_input(Config::default(), load_input("users_group.json"));
    network.run(50);
    let graph = network.graph();

    let users = graph
        .entities()
        .filter(|node| node.type_tag.as_str() == "user")
        .count();
    let groups = graph
        .entities()
        .filter(|node| node.type_tag.as_str() == "group")
        .count();
    assert_eq!(users, 5);
    assert_eq!(groups, 1);
    assert_eq!(graph.edge_labels().count(), 4);
    assert!(graph.nodes().iter().all(|node| !node.is_cluster()));
    assert_eq!(network.frame().edges.len(), 4);

    let stats = network.stats();
    assert_eq!(stats.rendered_vertices, 6);
    assert_eq!(stats.rendered_edges, 4);
    assert_eq!(stats.hidden_elements, 0);
}

#[test]
fn isolated_files_collapse_and_round_trip() {
    let file = TypeTag::new("file");
    let cluster = cluster_id(&file);
    let mut network = Network::with_input(Config::default(), load_input("isolated.json"));

    let members = |network: &Network| -> BTreeSet<String> {
        network
            .clusters()
            .members(&file)
            .iter()
            .map(|node| node.id.clone())
            .collect()
    };
    let expected: BTreeSet<String> = ["main.rs", "notes.txt", "todo.md", "build.log"]
        .iter()
        .map(|id| id.to_string())
        .collect();

    assert!(network.graph().contains(&cluster));
    assert!(network.graph().contains("lib.rs"), "connected file stays visible");
    assert_eq!(members(&network), expected);
    assert!(network.clusters().is_exclusive(network.graph()));

    network.push(Command::ToggleCluster(file.clone()));
    network.tick();
    assert!(!network.graph().contains(&cluster));
    assert!(network.clusters().is_expanded(&file));
    for id in &expected {
        assert!(network.graph().contains(id), "{id} not expanded");
    }
    assert!(network.clusters().is_exclusive(network.graph()));
    network.run(20);
    assert_finite(&network, "isolated.json", "expand");

    network.push(Command::ToggleCluster(file.clone()));
    network.tick();
    let node = network.graph().node(&cluster).expect("cluster restored");
    assert_eq!(node.kind, NodeKind::Cluster);
    assert_eq!(node.type_tag, file);
    assert_eq!(members(&network), expected);
    for id in &expected {
        assert!(!network.graph().contains(id), "{id} still active");
    }
    assert_eq!(
        network.graph().nodes().iter().filter(|node| node.is_cluster()).count(),
        1
    );
}

#[test]
fn parallel_relations_get_distinct_hotspots() {
    let mut network = Network::with_input(Config::default(), load_input("parallel.json"));
    network.run(10);
    let frame = network.frame();
    assert_eq!(frame.edges.len(), 4);

    let slots: Vec<usize> = frame.edges.iter().filter_map(|edge| edge.hotspot).collect();
    assert_eq!(slots.len(), 4, "every relation holds a slot");
    let distinct: BTreeSet<usize> = slots.iter().copied().collect();
    assert_eq!(distinct.len(), 4, "slots collide: {slots:?}");
    assert!(slots.iter().all(|slot| *slot < 4));
}

#[test]
fn rederivation_keeps_hotspot_slots() {
    let mut network = Network::with_input(Config::default(), load_input("parallel.json"));
    network.run(200);
    let slots = |network: &Network| -> Vec<(String, Option<usize>)> {
        let mut slots: Vec<_> = network
            .frame()
            .edges
            .iter()
            .map(|edge| (edge.link_id.clone(), edge.hotspot))
            .collect();
        slots.sort();
        slots
    };
    let before = slots(&network);
    assert!(before.iter().all(|(_, slot)| slot.is_some()));

    network.push(Command::SetBudget(None));
    network.tick();
    assert_eq!(slots(&network), before, "labels switched slots after rederiving");
    network.push(Command::SetBudget(None));
    network.run(5);
    assert_eq!(slots(&network), before);
}

#[test]
fn curve_passes_through_label_for_every_edge() {
    for name in FIXTURES {
        let mut network = Network::with_input(Config::default(), load_input(name));
        network.run(30);
        let graph = network.graph();
        for label in graph.edge_labels() {
            let Some(info) = label.edge.as_ref() else {
                continue;
            };
            let endpoints = (graph.node(&info.source_id), graph.node(&info.target_id));
            let (Some(source), Some(target)) = endpoints else {
                continue;
            };
            let curve = EdgeCurve::through(source.pos, label.pos, target.pos);
            let at_t = curve.point_at(curve.t);
            let tolerance = 1e-4 * (1.0 + source.pos.length() + target.pos.length());
            assert!(
                at_t.distance(label.pos) <= tolerance,
                "{name}: {} misses its label at t = {} ({at_t:?} vs {:?})",
                label.id,
                curve.t,
                label.pos
            );
        }
    }
}

#[test]
fn curve_hits_labels_hugging_an_endpoint() {
    let (start, end) = (Vec2::new(-40.0, 25.0), Vec2::new(60.0, 25.0));
    for offset in [Vec2::new(0.0, 0.09), Vec2::new(0.004, 0.0), Vec2::new(-0.03, -0.05)] {
        for label in [start + offset, end + offset] {
            let curve = EdgeCurve::through(start, label, end);
            assert!(
                curve.point_at(curve.t).distance(label) < 1e-3,
                "{label:?} missed at t = {}",
                curve.t
            );
        }
    }
}

#[test]
fn mixed_commands_never_produce_nan() {
    let fixture = "mixed.json";
    let mut network = Network::with_input(Config::default(), load_input(fixture));
    let hide_files = VisibilityConfig {
        hidden_types: [TypeTag::new("file")].into_iter().collect(),
        hidden_relations: BTreeSet::new(),
    };

    let script: Vec<(&str, Vec<Command>)> = vec![
        ("drag", vec![
            Command::StartDrag("alice".to_string()),
            Command::UpdateDrag { x: 200.0, y: -120.0 },
        ]),
        ("nan drag", vec![Command::UpdateDrag { x: f32::NAN, y: f32::INFINITY }]),
        ("end drag", vec![Command::EndDrag, Command::TogglePin("bob".to_string())]),
        ("budget", vec![Command::SetBudget(Some(4))]),
        ("toggle", vec![Command::ToggleCluster(TypeTag::new("file"))]),
        ("budget reset", vec![Command::SetBudget(None)]),
        ("resize", vec![Command::Resize { width: 0.0, height: -10.0 }]),
        ("resize", vec![Command::Resize { width: 640.0, height: 480.0 }]),
        ("forces", vec![Command::SetForces(ForceWeights {
            cluster_gravity: f32::NAN,
            edge_straightness: 5.0,
            edge_shortness: 0.2,
        })]),
        ("visibility", vec![Command::SetVisibility(hide_files)]),
        ("focus", vec![Command::Focus(Some("ops".to_string()))]),
        ("pause", vec![Command::Pause]),
        ("unfocus", vec![Command::Focus(None), Command::Resume]),
        ("priority", vec![Command::SetClassPriority(vec![
            TypeTag::new("repository"),
            TypeTag::new("user"),
        ])]),
        ("reload", vec![Command::Reload(load_input("isolated.json"))]),
        ("toggle", vec![Command::ToggleCluster(TypeTag::new("file"))]),
        ("reload", vec![Command::Reload(load_input(fixture))]),
    ];

    for (step, commands) in script {
        for command in commands {
            network.push(command);
        }
        network.run(15);
        assert_finite(&network, fixture, step);
        assert_closed(network.graph(), fixture);
        assert!(
            network.clusters().is_exclusive(network.graph()),
            "{fixture}: cluster exclusivity broken after {step}"
        );
    }

    let diagnostics = network.take_diagnostics();
    assert!(
        !diagnostics
            .iter()
            .any(|diagnostic| matches!(diagnostic, Diagnostic::InvariantViolation(_))),
        "invariant violations: {diagnostics:?}"
    );
}

#[test]
fn bad_input_is_reported_not_fatal() {
    let network = Network::with_input(Config::default(), load_input("mixed.json"));
    let diagnostics = network.diagnostics();
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::DuplicateNode { id } if id == "dev"
    )));
    assert!(diagnostics.iter().any(|diagnostic| matches!(
        diagnostic,
        Diagnostic::DataInconsistency { missing, .. } if missing == "ghost"
    )));
    assert!(network.graph().contains("alice"));
    assert!(!network.base().contains("ghost"));
}

#[test]
fn pinned_node_survives_rederivation() {
    let mut network = Network::with_input(Config::default(), load_input("mixed.json"));
    network.push(Command::StartDrag("api".to_string()));
    network.push(Command::UpdateDrag { x: 150.0, y: 75.0 });
    network.push(Command::EndDrag);
    network.push(Command::TogglePin("api".to_string()));
    network.run(5);
    network.push(Command::SetBudget(Some(12)));
    network.run(25);

    let api = network.graph().node("api").expect("api stays selected");
    assert!(api.pinned);
    assert_eq!(api.pos, Vec2::new(150.0, 75.0));
}

#[test]
fn focus_on_unknown_node_keeps_whole_graph() {
    let mut network = Network::with_input(Config::default(), load_input("mixed.json"));
    let before = network.graph().len();
    network.take_diagnostics();
    network.push(Command::Focus(Some("nobody".to_string())));
    network.tick();
    assert_eq!(network.graph().len(), before);
    assert!(
        network
            .take_diagnostics()
            .contains(&Diagnostic::UnknownNode("nobody".to_string()))
    );
}

#[test]
fn derivation_reuses_previous_positions() {
    let base = load_graph("mixed.json");
    let config = Config::default();
    let mut clusters = ClusterTable::new();
    let mut diagnostics = Diagnostics::new();
    let first = derive(&base, None, &config, &Graph::new(), &mut clusters, &mut diagnostics);
    let second = derive(&base, None, &config, &first.graph, &mut clusters, &mut diagnostics);

    assert!(second.placed.is_empty());
    for node in first.graph.nodes() {
        let again = second.graph.node(&node.id).expect("same selection");
        assert_eq!(again.pos, node.pos, "{} moved between derivations", node.id);
    }
}

#[test]
fn config_fixture_loads() {
    let path = fixtures_dir().join("config.json5");
    let config = load_config(Some(&path)).expect("config fixture parses");
    assert_eq!(config.layout.width, 900.0);
    assert_eq!(config.render.height, 600.0);
    assert_eq!(config.layout.forces.cluster_gravity, 0.5);
    assert_eq!(config.layout.forces.edge_straightness, 0.9, "weights are clamped");
    assert_eq!(config.compression.budget, Some(6));
    assert_eq!(
        config.compression.class_priority,
        vec![TypeTag::new("group"), TypeTag::new("user")]
    );
    assert!(!config.visibility.type_visible(&TypeTag::new("file")));

    let network = Network::with_input(config, load_input("isolated.json"));
    assert!(network.graph().entities().all(|node| node.type_tag.as_str() != "file"));
}

#[test]
fn layout_dump_serializes() {
    let mut network = Network::with_input(Config::default(), load_input("isolated.json"));
    network.run(10);
    let dump = LayoutDump::from_network(&network);
    assert_eq!(dump.nodes.len(), network.graph().len());
    assert_eq!(dump.clusters.len(), 1);
    assert_eq!(dump.clusters[0].members.len(), 4);

    let json = serde_json::to_value(&dump).expect("dump serializes");
    assert_eq!(json["state"], "running");
    assert!(json["edges"].as_array().is_some_and(|edges| !edges.is_empty()));
    assert!(json["stats"]["c_max"].as_u64().is_some());
    for edge in &dump.edges {
        assert!(edge.length.is_finite() && edge.label_offset.is_finite());
        assert!(edge.label_offset <= edge.length * 1.01 + 1e-2, "{}", edge.link_id);
    }
}
