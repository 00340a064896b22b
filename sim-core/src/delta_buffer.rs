use glam::Vec2;

use crate::types::CellIndex;

/// A requested change of a cluster's velocities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KinematicDelta {
    pub linear: Vec2,
    /// Degrees per time unit.
    pub angular: f32,
    /// Kinetic energy this request would add on its own, measured against
    /// the cluster state at the start of the step.
    pub energy_cost: f32,
}

/// Sum of every request collected in a [`DeltaBuffer`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccumulatedDelta {
    pub linear: Vec2,
    pub angular: f32,
    /// Requesting cells with the summed cost estimate of their requests,
    /// ascending by cell index.
    pub payers: Vec<(CellIndex, f32)>,
}

/// Per-cluster buffer that collects kinematic delta requests per cell.
///
/// For each cell index the buffer keeps:
///
/// - every [`KinematicDelta`] submitted by tokens processed at that cell;
/// - the number of submitted requests.
///
/// Requests are never applied in place. [`DeltaBuffer::total`] sums them in
/// a canonical order that depends only on their content, so the result is
/// bit-identical no matter in which order tokens were processed.
#[derive(Debug, Default)]
pub struct DeltaBuffer {
    requests: Vec<Vec<KinematicDelta>>,
    /// Number of requests submitted per cell.
    pub count: Vec<u32>,
}

impl DeltaBuffer {
    /// Creates a buffer for a cluster with `len` cells.
    pub fn with_len(len: usize) -> Self {
        Self {
            requests: vec![Vec::new(); len],
            count: vec![0; len],
        }
    }

    /// Records one request submitted at cell `id`.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn add(&mut self, id: CellIndex, delta: KinematicDelta) {
        self.requests[id].push(delta);
        self.count[id] += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.count.iter().all(|&c| c == 0)
    }

    /// Indices of the cells that submitted at least one request.
    pub fn requested_indices(&self) -> impl Iterator<Item = CellIndex> + '_ {
        self.count
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c > 0 { Some(i) } else { None })
    }

    /// Sums all requests: vector sum of linear deltas, scalar sum of
    /// angular deltas.
    pub fn total(&self) -> AccumulatedDelta {
        let mut total = AccumulatedDelta::default();
        for id in self.requested_indices() {
            let mut requests = self.requests[id].clone();
            requests.sort_by(|a, b| {
                a.linear
                    .x
                    .total_cmp(&b.linear.x)
                    .then(a.linear.y.total_cmp(&b.linear.y))
                    .then(a.angular.total_cmp(&b.angular))
                    .then(a.energy_cost.total_cmp(&b.energy_cost))
            });
            let mut cost = 0.0;
            for r in &requests {
                total.linear += r.linear;
                total.angular += r.angular;
                cost += r.energy_cost;
            }
            total.payers.push((id, cost));
        }
        total
    }
}
