//! Read-only snapshot of the world taken at the start of a step.
//!
//! Cell functions that look beyond their own cluster (weapons, sensors)
//! query this snapshot instead of the live clusters, so parallel dispatch
//! never observes half-applied state.

use std::collections::HashMap;

use glam::{I64Vec2, Vec2};

use crate::cluster::Cluster;
use crate::space_metric::SpaceMetric;
use crate::types::{CellIndex, ClusterId};

/// Position of a cell within the world's cluster list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// Slot of the cluster in the world's cluster list for this step.
    pub cluster: usize,
    pub cell: CellIndex,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub pos: Vec2,
    pub cell_count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSummary {
    pub at: CellRef,
    pub pos: Vec2,
    pub energy: f32,
}

/// Uniform bucket grid over the torus.
///
/// Only occupied buckets are stored, so memory follows the number of cells
/// rather than the world area.
#[derive(Debug)]
struct CellGrid {
    bucket_size: f32,
    dims: I64Vec2,
    buckets: HashMap<I64Vec2, Vec<usize>>,
}

impl CellGrid {
    fn new(world: Vec2, bucket_size: f32) -> Self {
        let bucket_size = bucket_size.max(1.0);
        let dims = I64Vec2::new(
            ((world.x / bucket_size).ceil() as i64).max(1),
            ((world.y / bucket_size).ceil() as i64).max(1),
        );
        Self {
            bucket_size,
            dims,
            buckets: HashMap::new(),
        }
    }

    fn coord(&self, pos: Vec2) -> I64Vec2 {
        let c = (pos / self.bucket_size).floor().as_i64vec2();
        c.clamp(I64Vec2::ZERO, self.dims - I64Vec2::ONE)
    }

    fn wrap(&self, c: I64Vec2) -> I64Vec2 {
        I64Vec2::new(c.x.rem_euclid(self.dims.x), c.y.rem_euclid(self.dims.y))
    }

    fn insert(&mut self, pos: Vec2, item: usize) {
        let key = self.coord(pos);
        self.buckets.entry(key).or_default().push(item);
    }

    /// Items of every bucket touching the square of half-width `radius`
    /// around `pos`, each bucket visited once even when the square wraps.
    fn candidates(&self, pos: Vec2, radius: f32) -> Vec<usize> {
        let center = self.coord(pos);
        let reach = (radius / self.bucket_size).ceil() as i64;
        let span = reach.saturating_mul(2).saturating_add(1);
        let (span_x, span_y) = (span.min(self.dims.x), span.min(self.dims.y));

        let mut items = Vec::new();
        if span_x.saturating_mul(span_y) >= self.buckets.len() as i64 {
            // Fewer occupied buckets than the window holds: filter them.
            let near = |c: i64, k: i64, dim: i64| {
                span >= dim || {
                    let d = (k - c).rem_euclid(dim);
                    d.min(dim - d) <= reach
                }
            };
            for (key, bucket) in &self.buckets {
                if near(center.x, key.x, self.dims.x) && near(center.y, key.y, self.dims.y) {
                    items.extend_from_slice(bucket);
                }
            }
        } else {
            let axis = |c: i64, dim: i64| -> Vec<i64> {
                if span >= dim {
                    (0..dim).collect()
                } else {
                    (c - reach..=c + reach).collect()
                }
            };
            for y in axis(center.y, self.dims.y) {
                for x in axis(center.x, self.dims.x) {
                    if let Some(bucket) = self.buckets.get(&self.wrap(I64Vec2::new(x, y))) {
                        items.extend_from_slice(bucket);
                    }
                }
            }
        }
        items.sort_unstable();
        items
    }
}

#[derive(Debug)]
pub struct WorldView {
    metric: SpaceMetric,
    clusters: Vec<ClusterSummary>,
    cells: Vec<CellSummary>,
    grid: CellGrid,
}

impl WorldView {
    /// Snapshots `clusters`; `bucket_size` should be close to the largest
    /// query radius.
    pub fn build(clusters: &[Cluster], metric: &SpaceMetric, bucket_size: f32) -> Self {
        let mut grid = CellGrid::new(metric.size(), bucket_size);
        let mut cells = Vec::new();
        let summaries = clusters
            .iter()
            .enumerate()
            .map(|(slot, cluster)| {
                for (index, cell) in cluster.cells.iter().enumerate() {
                    grid.insert(cell.abs_pos, cells.len());
                    cells.push(CellSummary {
                        at: CellRef {
                            cluster: slot,
                            cell: index,
                        },
                        pos: cell.abs_pos,
                        energy: cell.energy,
                    });
                }
                ClusterSummary {
                    id: cluster.id,
                    pos: cluster.pos,
                    cell_count: cluster.cells.len(),
                }
            })
            .collect();
        Self {
            metric: *metric,
            clusters: summaries,
            cells,
            grid,
        }
    }

    pub fn metric(&self) -> &SpaceMetric {
        &self.metric
    }

    pub fn clusters(&self) -> &[ClusterSummary] {
        &self.clusters
    }

    /// Cells within `radius` of `pos`, ordered by cluster slot and cell
    /// index, paired with their toroidal distance.
    pub fn cells_within(&self, pos: Vec2, radius: f32) -> Vec<(CellSummary, f32)> {
        self.grid
            .candidates(pos, radius)
            .into_iter()
            .filter_map(|i| {
                let cell = self.cells[i];
                let d = self.metric.distance(pos, cell.pos);
                (d <= radius).then_some((cell, d))
            })
            .collect()
    }
}
