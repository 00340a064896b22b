//! Energy bookkeeping across cells, tokens, particles and motion.

use crate::cluster::Cluster;
use crate::config::SimulationParameters;
use crate::description::DataDescription;
use crate::particle::ParticleSet;
use crate::physics;

/// World energy broken down by where it is stored, summed in `f64`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyTotals {
    pub cells: f64,
    pub tokens: f64,
    pub particles: f64,
    /// Linear plus rotational kinetic energy of all clusters.
    pub kinetic: f64,
}

impl EnergyTotals {
    pub fn of_world(clusters: &[Cluster], particles: &ParticleSet, cell_mass: f32) -> Self {
        let mut totals = Self {
            particles: particles.total_energy(),
            ..Self::default()
        };
        for cluster in clusters {
            for cell in &cluster.cells {
                totals.cells += f64::from(cell.energy);
                totals.tokens += cell.tokens.iter().map(|t| f64::from(t.energy)).sum::<f64>();
            }
            totals.kinetic += f64::from(cluster.kinetic_energy(cell_mass));
        }
        totals
    }

    /// Totals of a description, without building the world from it.
    pub fn of_description(data: &DataDescription, cell_mass: f32) -> Self {
        let mut totals = Self {
            particles: data.particles.iter().map(|p| f64::from(p.energy)).sum(),
            ..Self::default()
        };
        for cluster in &data.clusters {
            let mass = cluster.cells.len() as f32 * cell_mass;
            let centroid = cluster.cells.iter().map(|c| c.rel_pos).sum::<glam::Vec2>()
                / cluster.cells.len().max(1) as f32;
            let angular_mass = cluster
                .cells
                .iter()
                .map(|c| (c.rel_pos - centroid).length_squared() * cell_mass)
                .sum();
            totals.kinetic += f64::from(physics::kinetic_energy(
                mass,
                angular_mass,
                cluster.vel,
                cluster.angular_vel,
            ));
            for cell in &cluster.cells {
                totals.cells += f64::from(cell.energy);
                totals.tokens += cell.tokens.iter().map(|t| f64::from(t.energy)).sum::<f64>();
            }
        }
        totals
    }

    pub fn total(&self) -> f64 {
        self.cells + self.tokens + self.particles + self.kinetic
    }
}

/// A step whose energy totals differ by more than the tolerance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyDiagnostic {
    pub before: f64,
    pub after: f64,
    pub tolerance: f64,
}

impl EnergyDiagnostic {
    pub fn difference(&self) -> f64 {
        self.after - self.before
    }
}

/// Comparison of the totals at the start and the end of a step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyBalance {
    pub before: EnergyTotals,
    pub after: EnergyTotals,
    /// Energy moved from cells into particles by radiation this step.
    pub radiated: f64,
}

impl EnergyBalance {
    pub fn tolerance(&self, params: &SimulationParameters) -> f64 {
        params.energy_tolerance_abs + params.energy_tolerance_rel * self.before.total().abs()
    }

    /// Returns a diagnostic when the balance is off by more than the
    /// tolerance.
    pub fn check(&self, params: &SimulationParameters) -> Option<EnergyDiagnostic> {
        let tolerance = self.tolerance(params);
        let before = self.before.total();
        let after = self.after.total();
        ((after - before).abs() > tolerance).then_some(EnergyDiagnostic {
            before,
            after,
            tolerance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::{ClusterDescription, TokenDescription};
    use crate::space_metric::SpaceMetric;
    use glam::{UVec2, Vec2};

    #[test]
    fn totals_of_world_and_description_agree() {
        let params = SimulationParameters::with_world_size(20, 20);
        let metric = SpaceMetric::new(UVec2::new(20, 20));
        let mut desc = ClusterDescription::line(1, 3, 10.0)
            .with_vel(Vec2::new(0.5, 0.0))
            .with_angular_vel(30.0);
        desc.cells[0].add_token(TokenDescription::new(4.0));
        let mut data = DataDescription::default();
        data.add_cluster(desc.clone());

        let cluster = Cluster::from_description(&desc, &params, &metric).unwrap();
        let world = EnergyTotals::of_world(&[cluster], &ParticleSet::default(), params.cell_mass);
        let described = EnergyTotals::of_description(&data, params.cell_mass);
        assert_eq!(world.cells, 30.0);
        assert_eq!(world.tokens, 4.0);
        assert!((world.kinetic - described.kinetic).abs() < 1e-6);
        assert!(world.kinetic > 0.375);
    }

    #[test]
    fn breach_beyond_tolerance_is_reported() {
        let params = SimulationParameters::default();
        let before = EnergyTotals {
            cells: 1000.0,
            ..EnergyTotals::default()
        };
        let mut balance = EnergyBalance {
            before,
            after: before,
            radiated: 0.0,
        };
        assert_eq!(balance.check(&params), None);

        balance.after.cells += 0.05;
        assert_eq!(balance.check(&params), None);

        balance.after.cells += 1.0;
        let diagnostic = balance.check(&params).unwrap();
        assert!((diagnostic.difference() - 1.05).abs() < 1e-9);
        assert!((diagnostic.tolerance - 0.101).abs() < 1e-9);
    }
}
