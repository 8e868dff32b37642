#![forbid(unsafe_code)]

//! Headless ForceAtlas2 graph layout.
//!
//! `narwhal` computes 2D coordinates for an undirected graph: linked nodes attract, all nodes
//! repel, and a global adaptive speed keeps the simulation from oscillating. Repulsion can be
//! approximated with a Barnes-Hut quadtree and is computed on a worker pool owned by each
//! [`Simulation`].

pub mod algo;
pub mod error;
pub mod graph;

pub use algo::Settings;
pub use algo::forceatlas2::{
    Attraction, AttractionLaw, BarnesHutTree, Gravity, Region, Repulsion, SimLink, SimNode,
    Simulation, StepReport,
};
pub use error::{Error, Result};
pub use graph::{Graph, LayoutResult, Link, Node, Point};

/// Headless layout entry point: runs `iterations` steps and returns the final positions.
pub fn layout(graph: &Graph, settings: &Settings, iterations: usize) -> Result<LayoutResult> {
    tracing::info!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        iterations,
        "forceatlas2 layout start"
    );
    let mut sim = Simulation::new(graph, settings.clone())?;
    let mut last = None;
    for _ in 0..iterations {
        last = Some(sim.run_step()?);
    }
    tracing::info!(
        speed = sim.speed(),
        displacement = last.map(|r| r.displacement),
        "forceatlas2 layout done"
    );
    Ok(sim.into_result())
}
