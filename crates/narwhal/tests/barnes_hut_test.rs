use narwhal::{BarnesHutTree, Graph, Link, Node, Repulsion, Settings, SimNode, Simulation};

fn brute(nodes: &[SimNode], index: usize, repulsion: Repulsion) -> (f64, f64) {
    nodes
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .map(|(_, other)| repulsion.between(&nodes[index], other))
        .fold((0.0, 0.0), |(ax, ay), (fx, fy)| (ax + fx, ay + fy))
}

fn relative_error(a: (f64, f64), b: (f64, f64)) -> f64 {
    let diff = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
    diff / (b.0 * b.0 + b.1 * b.1).sqrt().max(1e-12)
}

#[test]
fn two_nodes_are_always_resolved_exactly() {
    let nodes = vec![
        SimNode::new(0, -3.0, 2.0, 2.0),
        SimNode::new(1, 4.5, -1.0, 3.0),
    ];
    let tree = BarnesHutTree::build(&nodes).unwrap();
    let repulsion = Repulsion::new(false, 2.0);
    let mut stack = Vec::new();
    for i in 0..2 {
        let f = tree.apply_force(&nodes, i, repulsion, 1.2, &mut stack);
        assert_eq!(f, brute(&nodes, i, repulsion));
    }
}

#[test]
fn distant_cluster_is_approximated_as_one_body() {
    let mut nodes: Vec<SimNode> = (0..20)
        .map(|i| {
            let a = i as f64 * 0.9;
            SimNode::new(i, 5.0 * a.cos(), 4.0 * a.sin(), 1.0 + (i % 3) as f64)
        })
        .collect();
    nodes.push(SimNode::new(99, 1000.0, 30.0, 2.0));

    let tree = BarnesHutTree::build(&nodes).unwrap();
    let repulsion = Repulsion::new(false, 2.0);
    let far = nodes.len() - 1;
    let mut stack = Vec::new();

    let approx = tree.apply_force(&nodes, far, repulsion, 1.2, &mut stack);
    let exact = brute(&nodes, far, repulsion);
    let err = relative_error(approx, exact);
    assert!(err < 1e-2, "relative error {err}: tree={approx:?} brute={exact:?}");
    assert!(approx.0 > 0.0, "far node should be pushed away from the cluster");
}

#[test]
fn barnes_hut_simulation_tracks_brute_force_on_first_step() {
    let nodes = (0..200).map(Node::new).collect();
    let links = (0..199u64).map(|i| Link::new(i, i + 1)).collect();
    let g = Graph::new(nodes, links);

    let run = |barnes_hut_optimize: bool, barnes_hut_theta: f64| {
        let settings = Settings {
            barnes_hut_optimize,
            barnes_hut_theta,
            random_seed: 3,
            thread_count: Some(2),
            ..Settings::default()
        };
        let mut sim = Simulation::new(&g, settings).unwrap();
        sim.run_step().unwrap();
        sim.nodes()
            .iter()
            .map(|n| (n.dx, n.dy))
            .collect::<Vec<_>>()
    };

    let exact = run(false, 1.0);
    let zero_theta = run(true, 0.0);
    for (a, b) in zero_theta.iter().zip(&exact) {
        assert!(relative_error(*a, *b) < 1e-9);
    }

    let approx = run(true, 0.5);
    let mean_err = approx
        .iter()
        .zip(&exact)
        .map(|(a, b)| relative_error(*a, *b))
        .sum::<f64>()
        / exact.len() as f64;
    assert!(mean_err < 0.05, "mean relative error {mean_err}");
}

#[test]
fn linked_pair_step_matches_brute_force_for_any_theta() {
    let g = Graph::new(vec![Node::new(10), Node::new(20)], vec![Link::new(10, 20)]);
    let step = |barnes_hut_optimize: bool, barnes_hut_theta: f64| {
        let settings = Settings {
            barnes_hut_optimize,
            barnes_hut_theta,
            random_seed: 11,
            thread_count: Some(1),
            ..Settings::default()
        };
        let mut sim = Simulation::new(&g, settings).unwrap();
        let report = sim.run_step().unwrap();
        let forces = sim
            .nodes()
            .iter()
            .map(|n| (n.dx, n.dy))
            .collect::<Vec<_>>();
        (forces, report)
    };

    let (exact, exact_report) = step(false, 1.0);
    assert!(exact.iter().all(|&(dx, dy)| dx != 0.0 || dy != 0.0));
    for theta in [0.0, 1.2] {
        let (forces, report) = step(true, theta);
        assert_eq!(forces, exact, "theta {theta}");
        assert_eq!(report, exact_report, "theta {theta}");
    }
}

#[test]
fn coincident_nodes_still_feel_distant_repulsion() {
    let mut nodes: Vec<SimNode> = (0..4).map(|i| SimNode::new(i, 2.0, 2.0, 1.0)).collect();
    nodes.push(SimNode::new(4, -300.0, 50.0, 1.0));
    let tree = BarnesHutTree::build(&nodes).unwrap();
    let repulsion = Repulsion::new(false, 2.0);
    let mut stack = Vec::new();
    for i in 0..nodes.len() {
        let approx = tree.apply_force(&nodes, i, repulsion, 1.2, &mut stack);
        let exact = brute(&nodes, i, repulsion);
        assert!(relative_error(approx, exact) < 1e-9, "node {i}");
    }
}
