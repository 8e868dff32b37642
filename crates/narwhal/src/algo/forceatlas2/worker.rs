use super::force::{Gravity, Repulsion};
use super::node::SimNode;
use super::region::BarnesHutTree;
use crate::error::{Error, Result};
use rayon::prelude::*;
use std::ops::Range;

/// Tasks per pool thread; ranges take uneven time, so the pool gets more tasks than threads.
pub(crate) const TASKS_PER_THREAD: usize = 8;

/// Splits `0..n` into `task_count` contiguous ranges (`floor(n * t / task_count)` bounds), dropping
/// empty ones.
pub(crate) fn task_ranges(n: usize, task_count: usize) -> Vec<Range<usize>> {
    let task_count = task_count.max(1);
    (1..=task_count)
        .map(|t| (n * (t - 1) / task_count)..(n * t / task_count))
        .filter(|r| !r.is_empty())
        .collect()
}

/// Repulsion + gravity for one contiguous slice of nodes.
///
/// Node positions and the tree are shared read-only; the worker writes only into its own slice
/// of the force buffer.
pub(crate) struct ParallelForceWorker<'a> {
    nodes: &'a [SimNode],
    from: usize,
    forces: &'a mut [(f64, f64)],
    tree: Option<&'a BarnesHutTree>,
    theta: f64,
    repulsion: Repulsion,
    gravity: Gravity,
    gravitation: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WorkerForces<'a> {
    pub(crate) tree: Option<&'a BarnesHutTree>,
    pub(crate) theta: f64,
    pub(crate) repulsion: Repulsion,
    pub(crate) gravity: Gravity,
    pub(crate) gravitation: f64,
}

impl<'a> ParallelForceWorker<'a> {
    /// One worker per range. `forces.len()` must equal `nodes.len()` and `ranges` must tile it in
    /// order.
    pub(crate) fn partition(
        nodes: &'a [SimNode],
        forces: &'a mut [(f64, f64)],
        ranges: &[Range<usize>],
        cfg: WorkerForces<'a>,
    ) -> Vec<Self> {
        debug_assert_eq!(nodes.len(), forces.len());
        let mut workers = Vec::with_capacity(ranges.len());
        let mut rest = forces;
        let mut offset = 0;
        for range in ranges {
            debug_assert_eq!(range.start, offset);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            rest = tail;
            offset = range.end;
            workers.push(Self {
                nodes,
                from: range.start,
                forces: head,
                tree: cfg.tree,
                theta: cfg.theta,
                repulsion: cfg.repulsion,
                gravity: cfg.gravity,
                gravitation: cfg.gravitation,
            });
        }
        workers
    }

    pub(crate) fn run(self) -> Result<()> {
        let mut stack = Vec::new();
        for (k, force) in self.forces.iter_mut().enumerate() {
            let index = self.from + k;
            let node = &self.nodes[index];
            if !node.is_finite() {
                return Err(Error::NonFinitePosition { node_id: node.id });
            }

            let (rx, ry) = match self.tree {
                Some(tree) => {
                    tree.apply_force(self.nodes, index, self.repulsion, self.theta, &mut stack)
                }
                None => brute_force(self.nodes, index, self.repulsion),
            };
            let (gx, gy) = self.gravity.on(node, self.gravitation);
            *force = (rx + gx, ry + gy);
        }
        Ok(())
    }
}

fn brute_force(nodes: &[SimNode], index: usize, repulsion: Repulsion) -> (f64, f64) {
    let node = &nodes[index];
    let mut fx = 0.0;
    let mut fy = 0.0;
    for (other, n) in nodes.iter().enumerate() {
        if other == index {
            continue;
        }
        let (px, py) = repulsion.between(node, n);
        fx += px;
        fy += py;
    }
    (fx, fy)
}

/// Runs every worker on `pool` and blocks until all are done. The first error wins.
pub(crate) fn run_all(
    pool: &rayon::ThreadPool,
    workers: Vec<ParallelForceWorker<'_>>,
) -> Result<()> {
    pool.install(|| workers.into_par_iter().try_for_each(ParallelForceWorker::run))
}

#[cfg(test)]
mod tests {
    use super::{ParallelForceWorker, WorkerForces, run_all, task_ranges};
    use crate::algo::forceatlas2::force::{Gravity, Repulsion};
    use crate::algo::forceatlas2::node::SimNode;
    use crate::algo::forceatlas2::region::BarnesHutTree;
    use crate::error::Error;

    fn ring(n: usize) -> Vec<SimNode> {
        (0..n)
            .map(|i| {
                let a = i as f64 * 0.7;
                let mass = 1.0 + (i % 3) as f64;
                SimNode::new(i as u64, 50.0 * a.cos() + i as f64, 40.0 * a.sin(), mass)
            })
            .collect()
    }

    fn pool(threads: usize) -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("pool")
    }

    fn compute(nodes: &[SimNode], threads: usize, tree: Option<&BarnesHutTree>) -> Vec<(f64, f64)> {
        let mut forces = vec![(0.0, 0.0); nodes.len()];
        let ranges = task_ranges(nodes.len(), 8 * threads);
        let cfg = WorkerForces {
            tree,
            theta: 1.2,
            repulsion: Repulsion::new(false, 2.0),
            gravity: Gravity::new(false, 2.0),
            gravitation: 0.5,
        };
        let workers = ParallelForceWorker::partition(nodes, &mut forces, &ranges, cfg);
        run_all(&pool(threads), workers).expect("workers");
        forces
    }

    #[test]
    fn ranges_tile_the_node_set() {
        for n in [0usize, 1, 3, 31, 32, 33, 1000] {
            let ranges = task_ranges(n, 32);
            let mut expected = 0;
            for r in &ranges {
                assert_eq!(r.start, expected);
                assert!(!r.is_empty());
                expected = r.end;
            }
            assert_eq!(expected, n);
            if n > 0 {
                assert!(!ranges.is_empty());
            }
        }
    }

    #[test]
    fn results_do_not_depend_on_thread_count() {
        let nodes = ring(57);
        assert_eq!(compute(&nodes, 1, None), compute(&nodes, 4, None));

        let tree = BarnesHutTree::build(&nodes).expect("tree");
        assert_eq!(
            compute(&nodes, 1, Some(&tree)),
            compute(&nodes, 3, Some(&tree))
        );
    }

    #[test]
    fn brute_force_forces_sum_to_gravity_only() {
        // Pairwise repulsion cancels out over the whole node set.
        let nodes = ring(20);
        let forces = compute(&nodes, 2, None);
        let gravity = Gravity::new(false, 2.0);
        let (mut sx, mut sy) = (0.0, 0.0);
        for (n, (fx, fy)) in nodes.iter().zip(&forces) {
            let (gx, gy) = gravity.on(n, 0.5);
            sx += fx - gx;
            sy += fy - gy;
        }
        assert!(sx.abs() < 1e-9 && sy.abs() < 1e-9, "net repulsion: ({sx}, {sy})");
    }

    #[test]
    fn non_finite_positions_fail_the_worker() {
        let mut nodes = ring(10);
        nodes[6].x = f64::NAN;
        let mut forces = vec![(0.0, 0.0); nodes.len()];
        let ranges = task_ranges(nodes.len(), 4);
        let cfg = WorkerForces {
            tree: None,
            theta: 1.0,
            repulsion: Repulsion::new(false, 1.0),
            gravity: Gravity::new(false, 1.0),
            gravitation: 1.0,
        };
        let workers = ParallelForceWorker::partition(&nodes, &mut forces, &ranges, cfg);
        match run_all(&pool(2), workers) {
            Err(Error::NonFinitePosition { node_id }) => assert_eq!(node_id, 6),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
