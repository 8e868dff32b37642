use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

/// Undirected input graph.
///
/// Node ids only need to be unique; they do not have to be dense or sorted. Links refer to nodes
/// by id.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    pub fn validate(&self) -> Result<()> {
        self.checked_index().map(|_| ())
    }

    /// [`Graph::validate`] that also hands back the id index.
    pub(crate) fn checked_index(&self) -> Result<FxHashMap<u64, usize>> {
        let idx = self.index_by_id()?;
        for n in &self.nodes {
            if !n.size.is_finite() || n.size < 0.0 {
                return Err(Error::InvalidSize {
                    node_id: n.id,
                    size: n.size,
                });
            }
        }
        for (link_index, l) in self.links.iter().enumerate() {
            if !l.weight.is_finite() || l.weight < 0.0 {
                return Err(Error::InvalidWeight {
                    link_index,
                    weight: l.weight,
                });
            }
        }
        Ok(idx)
    }

    /// Maps node ids to their position in `nodes`, rejecting duplicates and dangling link
    /// endpoints.
    pub(crate) fn index_by_id(&self) -> Result<FxHashMap<u64, usize>> {
        let mut idx: FxHashMap<u64, usize> = FxHashMap::default();
        idx.reserve(self.nodes.len());
        for (i, n) in self.nodes.iter().enumerate() {
            if idx.insert(n.id, i).is_some() {
                return Err(Error::DuplicateNode { node_id: n.id });
            }
        }
        for (link_index, l) in self.links.iter().enumerate() {
            for id in [l.source, l.target] {
                if !idx.contains_key(&id) {
                    return Err(Error::MissingEndpoint {
                        link_index,
                        node_id: id,
                    });
                }
            }
        }
        Ok(idx)
    }

    /// Degree per node (in `nodes` order). Both endpoints count; a self-loop counts once.
    pub fn degrees(&self) -> Result<Vec<usize>> {
        let idx = self.index_by_id()?;
        Ok(self.degrees_indexed(&idx))
    }

    pub(crate) fn degrees_indexed(&self, idx: &FxHashMap<u64, usize>) -> Vec<usize> {
        let mut degrees = vec![0usize; self.nodes.len()];
        for l in &self.links {
            degrees[idx[&l.source]] += 1;
            if l.source != l.target {
                degrees[idx[&l.target]] += 1;
            }
        }
        degrees
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// Visual radius; only consulted when `Settings::adjust_sizes` is on.
    pub size: f64,
    /// Fixed nodes keep their coordinates for the whole run.
    pub fixed: bool,
}

impl Node {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            size: 1.0,
            fixed: false,
        }
    }

    pub fn at(id: u64, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::new(id)
        }
    }

    pub fn fixed_at(id: u64, x: f64, y: f64) -> Self {
        Self {
            fixed: true,
            ..Self::at(id, x, y)
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
    pub source: u64,
    pub target: u64,
    pub weight: f64,
}

impl Link {
    pub fn new(source: u64, target: u64) -> Self {
        Self::weighted(source, target, 1.0)
    }

    pub fn weighted(source: u64, target: u64, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub positions: std::collections::BTreeMap<u64, Point>,
}

impl LayoutResult {
    pub fn get(&self, id: u64) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Copies the computed coordinates back into `graph`. Nodes without a result are untouched.
    pub fn apply_to(&self, graph: &mut Graph) {
        for n in &mut graph.nodes {
            if let Some(p) = self.positions.get(&n.id) {
                n.x = p.x;
                n.y = p.y;
            }
        }
    }
}
