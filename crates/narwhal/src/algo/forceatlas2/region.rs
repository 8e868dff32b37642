//! Barnes-Hut quadtree over the simulation nodes.
//!
//! Regions live in a flat arena (`BarnesHutTree::regions`, root at index 0). A region either
//! holds node indices directly (leaf) or children, split at the region's own mass center into up
//! to four quadrants. Nodes no quadrant split can separate (identical positions) get one
//! single-node child each instead, so every leaf holds exactly one node.

use super::force::Repulsion;
use super::node::SimNode;
use std::ops::Range;

pub const ROOT: usize = 0;

// Quadrant slots, in the order children are visited.
const TOP_LEFT: usize = 0;
const BOTTOM_LEFT: usize = 1;
const BOTTOM_RIGHT: usize = 2;
const TOP_RIGHT: usize = 3;

#[derive(Debug, Clone)]
pub struct Region {
    /// Node indices; only populated on leaves.
    contents: Vec<usize>,
    children: [Option<usize>; 4],
    /// Arena span of single-node children when the quadrant split separated nothing.
    singles: Range<usize>,
    node_count: usize,
    mass: f64,
    mass_center_x: f64,
    mass_center_y: f64,
    /// Twice the largest node distance from the mass center.
    size: f64,
}

impl Region {
    fn from_members(nodes: &[SimNode], members: Vec<usize>) -> Self {
        let mut mass = 0.0;
        let mut mass_sum_x = 0.0;
        let mut mass_sum_y = 0.0;
        for &i in &members {
            let n = &nodes[i];
            mass += n.mass;
            mass_sum_x += n.x * n.mass;
            mass_sum_y += n.y * n.mass;
        }

        let (mass_center_x, mass_center_y) = if mass > 0.0 {
            (mass_sum_x / mass, mass_sum_y / mass)
        } else {
            (0.0, 0.0)
        };

        let mut size: f64 = 0.0;
        for &i in &members {
            let n = &nodes[i];
            let dx = n.x - mass_center_x;
            let dy = n.y - mass_center_y;
            size = size.max(2.0 * (dx * dx + dy * dy).sqrt());
        }

        Self {
            node_count: members.len(),
            contents: members,
            children: [None; 4],
            singles: 0..0,
            mass,
            mass_center_x,
            mass_center_y,
            size,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn mass_center_x(&self) -> f64 {
        self.mass_center_x
    }

    pub fn mass_center_y(&self) -> f64 {
        self.mass_center_y
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none) && self.singles.is_empty()
    }

    pub fn contents(&self) -> &[usize] {
        &self.contents
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.children
            .iter()
            .filter_map(|c| *c)
            .chain(self.singles.clone())
    }
}

#[derive(Debug, Clone)]
pub struct BarnesHutTree {
    regions: Vec<Region>,
}

impl BarnesHutTree {
    /// Builds the full partition. Returns `None` for an empty node set.
    pub fn build(nodes: &[SimNode]) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }

        let mut tree = Self {
            regions: Vec::with_capacity(nodes.len() * 2),
        };
        tree.regions
            .push(Region::from_members(nodes, (0..nodes.len()).collect()));

        let mut pending = vec![ROOT];
        while let Some(r) = pending.pop() {
            tree.subdivide(r, nodes, &mut pending);
        }
        Some(tree)
    }

    fn subdivide(&mut self, r: usize, nodes: &[SimNode], pending: &mut Vec<usize>) {
        let quadrants = {
            let region = &self.regions[r];
            if region.contents.len() <= 1 {
                return;
            }

            let mut quadrants: [Vec<usize>; 4] = Default::default();
            for &i in &region.contents {
                let n = &nodes[i];
                let slot = match (n.x < region.mass_center_x, n.y < region.mass_center_y) {
                    (true, false) => TOP_LEFT,
                    (true, true) => BOTTOM_LEFT,
                    (false, true) => BOTTOM_RIGHT,
                    (false, false) => TOP_RIGHT,
                };
                quadrants[slot].push(i);
            }

            if quadrants.iter().any(|q| q.len() == region.contents.len()) {
                None
            } else {
                Some(quadrants)
            }
        };

        // Nothing separated: one single-node child per member, which terminates the recursion.
        let Some(quadrants) = quadrants else {
            let members = std::mem::take(&mut self.regions[r].contents);
            let start = self.regions.len();
            for i in members {
                self.regions.push(Region::from_members(nodes, vec![i]));
            }
            self.regions[r].singles = start..self.regions.len();
            return;
        };

        self.regions[r].contents = Vec::new();
        for (slot, members) in quadrants.into_iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let child = self.regions.len();
            self.regions.push(Region::from_members(nodes, members));
            self.regions[r].children[slot] = Some(child);
            pending.push(child);
        }
    }

    pub fn root(&self) -> &Region {
        &self.regions[ROOT]
    }

    pub fn region(&self, index: usize) -> &Region {
        &self.regions[index]
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Repulsion exerted on `nodes[index]` by every other node, approximated region by region.
    ///
    /// A region is collapsed into one body when `distance * theta > size`; `theta == 0` never
    /// collapses and reproduces the exact pairwise sum. `stack` is scratch space reused across
    /// calls.
    pub fn apply_force(
        &self,
        nodes: &[SimNode],
        index: usize,
        repulsion: Repulsion,
        theta: f64,
        stack: &mut Vec<usize>,
    ) -> (f64, f64) {
        let node = &nodes[index];
        let mut fx = 0.0;
        let mut fy = 0.0;

        stack.clear();
        stack.push(ROOT);
        while let Some(r) = stack.pop() {
            let region = &self.regions[r];

            if region.node_count >= 2 {
                let dx = node.x - region.mass_center_x;
                let dy = node.y - region.mass_center_y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance * theta > region.size {
                    let (rx, ry) = repulsion.from_region(node, region);
                    fx += rx;
                    fy += ry;
                    continue;
                }
            }

            if region.is_leaf() {
                for &other in &region.contents {
                    if other == index {
                        continue;
                    }
                    let (px, py) = repulsion.between(node, &nodes[other]);
                    fx += px;
                    fy += py;
                }
            } else {
                // Reversed so children pop in arena order.
                stack.extend(region.children().rev());
            }
        }

        (fx, fy)
    }
}
