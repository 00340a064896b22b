//! Rigid-body kinematics of clusters.
//!
//! The integrator owns a cluster's velocities during a step. Cell functions
//! only read a [`ClusterKinematics`] snapshot and submit requests into a
//! [`DeltaBuffer`]; [`integrate`] applies the summed requests, charges the
//! resulting kinetic energy change to the requesting cells and advances the
//! cluster over the torus.

use glam::Vec2;
use tracing::warn;

use crate::cell::Cell;
use crate::cluster::Cluster;
use crate::config::SimulationParameters;
use crate::delta_buffer::DeltaBuffer;
use crate::space_metric::SpaceMetric;
use crate::types::{CellIndex, ClusterId};

/// Read-only kinematic state of a cluster at the start of a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterKinematics {
    pub id: ClusterId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    pub angular_vel: f32,
    pub mass: f32,
    pub angular_mass: f32,
}

impl ClusterKinematics {
    pub fn of(cluster: &Cluster, cell_mass: f32) -> Self {
        Self {
            id: cluster.id,
            pos: cluster.pos,
            vel: cluster.vel,
            angle: cluster.angle,
            angular_vel: cluster.angular_vel,
            mass: cluster.mass(cell_mass),
            angular_mass: cluster.angular_mass(cell_mass),
        }
    }

    pub fn kinetic_energy(&self) -> f32 {
        kinetic_energy(self.mass, self.angular_mass, self.vel, self.angular_vel)
    }

    /// Kinetic energy added by applying `linear` and `angular` on their own.
    pub fn energy_cost(&self, linear: Vec2, angular: f32) -> f32 {
        kinetic_energy(
            self.mass,
            self.angular_mass,
            self.vel + linear,
            self.angular_vel + angular,
        ) - self.kinetic_energy()
    }
}

/// Rotates `v` by `degrees`; positive angles turn clockwise on screen.
pub fn rotate(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Linear plus rotational kinetic energy. `angular_vel` is in degrees.
pub fn kinetic_energy(mass: f32, angular_mass: f32, vel: Vec2, angular_vel: f32) -> f32 {
    let omega = angular_vel.to_radians();
    0.5 * mass * vel.length_squared() + 0.5 * angular_mass * omega * omega
}

/// Angular velocity change (degrees) produced by `force` applied at
/// `offset` from the center.
pub fn angular_delta(offset: Vec2, force: Vec2, angular_mass: f32) -> f32 {
    if angular_mass <= f32::EPSILON {
        return 0.0;
    }
    (offset.perp_dot(force) / angular_mass).to_degrees()
}

/// Applies the accumulated requests and advances the cluster by one step.
///
/// Returns the kinetic energy change that was charged to the cells.
pub fn integrate(
    cluster: &mut Cluster,
    deltas: &DeltaBuffer,
    params: &SimulationParameters,
    metric: &SpaceMetric,
) -> f32 {
    let mut charged = 0.0;
    if !deltas.is_empty() {
        let total = deltas.total();
        let before = cluster.kinetic_energy(params.cell_mass);
        cluster.vel += total.linear;
        cluster.angular_vel += total.angular;
        charged = cluster.kinetic_energy(params.cell_mass) - before;
        charge(cluster.id, &mut cluster.cells, &total.payers, charged);
    }
    advance(cluster, params.dt, metric);
    charged
}

/// Moves and turns the cluster by its current velocities.
pub fn advance(cluster: &mut Cluster, dt: f32, metric: &SpaceMetric) {
    cluster.pos = metric.shift_position(cluster.pos, cluster.vel * dt);
    let angle = (cluster.angle + cluster.angular_vel * dt).rem_euclid(360.0);
    cluster.angle = if angle >= 360.0 { 0.0 } else { angle };
    cluster.update_cell_positions(metric);
}

/// Splits `amount` over the payers in proportion to their cost estimates,
/// evenly when every estimate is zero.
fn charge(cluster: ClusterId, cells: &mut [Cell], payers: &[(CellIndex, f32)], amount: f32) {
    if payers.is_empty() || amount == 0.0 {
        return;
    }
    let weight_sum: f32 = payers.iter().map(|(_, w)| w.abs()).sum();
    for &(index, weight) in payers {
        let share = if weight_sum > 0.0 {
            amount * weight.abs() / weight_sum
        } else {
            amount / payers.len() as f32
        };
        cells[index].energy -= share;
    }
    settle_deficits(cluster, cells);
}

/// Moves negative cell balances onto the richest cells of the cluster.
fn settle_deficits(cluster: ClusterId, cells: &mut [Cell]) {
    let mut deficit = 0.0;
    for cell in cells.iter_mut().filter(|c| c.energy < 0.0) {
        deficit -= cell.energy;
        cell.energy = 0.0;
    }
    if deficit == 0.0 {
        return;
    }
    let mut order: Vec<CellIndex> = (0..cells.len()).collect();
    order.sort_by(|&a, &b| {
        cells[b]
            .energy
            .total_cmp(&cells[a].energy)
            .then(a.cmp(&b))
    });
    for index in order {
        if deficit <= 0.0 {
            break;
        }
        let take = cells[index].energy.min(deficit);
        cells[index].energy -= take;
        deficit -= take;
    }
    if deficit > 0.0 {
        warn!(cluster, deficit, "cluster could not pay for its kinetic energy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta_buffer::KinematicDelta;
    use crate::description::ClusterDescription;
    use glam::UVec2;

    fn cluster(desc: ClusterDescription) -> (Cluster, SimulationParameters, SpaceMetric) {
        let params = SimulationParameters::with_world_size(10, 10);
        let metric = SpaceMetric::new(UVec2::new(10, 10));
        let cluster = Cluster::from_description(&desc, &params, &metric).unwrap();
        (cluster, params, metric)
    }

    #[test]
    fn rotate_quarter_turn() {
        let r = rotate(Vec2::new(1.0, 0.0), 90.0);
        assert!((r - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn kinetic_energy_combines_linear_and_rotation() {
        let e = kinetic_energy(2.0, 0.5, Vec2::new(1.0, 0.0), 180.0);
        let omega = 180f32.to_radians();
        assert!((e - (1.0 + 0.25 * omega * omega)).abs() < 1e-4);
    }

    #[test]
    fn integration_without_requests_only_advances() {
        let desc = ClusterDescription::line(1, 2, 10.0)
            .with_pos(Vec2::new(9.5, 5.0))
            .with_vel(Vec2::new(1.0, 0.0))
            .with_angular_vel(90.0);
        let (mut c, params, metric) = cluster(desc);
        let charged = integrate(&mut c, &DeltaBuffer::with_len(2), &params, &metric);
        assert_eq!(charged, 0.0);
        assert!((c.pos - Vec2::new(0.5, 5.0)).length() < 1e-5);
        assert_eq!(c.angle, 90.0);
        // Cells stay rigidly attached to the new center.
        assert!((c.cells[1].abs_pos - Vec2::new(0.5, 5.5)).length() < 1e-5);
        assert_eq!(c.cells[0].energy, 10.0);
    }

    #[test]
    fn requested_energy_is_charged_to_payers() {
        let (mut c, params, metric) = cluster(ClusterDescription::line(1, 2, 10.0));
        let kin = ClusterKinematics::of(&c, params.cell_mass);
        let linear = Vec2::new(0.5, 0.0);
        let mut deltas = DeltaBuffer::with_len(2);
        deltas.add(
            1,
            KinematicDelta {
                linear,
                angular: 0.0,
                energy_cost: kin.energy_cost(linear, 0.0),
            },
        );
        let charged = integrate(&mut c, &deltas, &params, &metric);
        assert!((charged - 0.25).abs() < 1e-6);
        assert_eq!(c.cells[0].energy, 10.0);
        assert!((c.cells[1].energy - 9.75).abs() < 1e-6);
    }

    #[test]
    fn angle_wraps_into_full_turn() {
        let desc = ClusterDescription::line(1, 2, 10.0)
            .with_angle(350.0)
            .with_angular_vel(20.0);
        let (mut c, params, metric) = cluster(desc);
        integrate(&mut c, &DeltaBuffer::with_len(2), &params, &metric);
        assert!((c.angle - 10.0).abs() < 1e-4);
    }

    #[test]
    fn deficits_move_to_the_richest_cell() {
        let (mut c, _, _) = cluster(ClusterDescription::line(1, 3, 1.0));
        c.cells[2].energy = 5.0;
        charge(1, &mut c.cells, &[(0, 1.0)], 3.0);
        assert_eq!(c.cells[0].energy, 0.0);
        assert_eq!(c.cells[1].energy, 1.0);
        assert_eq!(c.cells[2].energy, 3.0);
    }
}
