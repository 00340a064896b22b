//! The simulation facade: owns the world and runs the step pipeline.

use std::collections::HashSet;

use glam::Vec2;
use rand::{SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::cluster::Cluster;
use crate::config::{ConfigError, SimulationParameters};
use crate::description::DataDescription;
use crate::energy::{EnergyBalance, EnergyTotals};
use crate::error::DescriptionError;
use crate::particle::ParticleSet;
use crate::phases::{self, ClusterDispatch};
use crate::physics::ClusterKinematics;
use crate::report::{StepDiagnostic, StepOutcome, StepReport};
use crate::space_metric::SpaceMetric;
use crate::world_view::WorldView;

pub struct Simulation {
    params: SimulationParameters,
    metric: SpaceMetric,
    /// Sorted by id, so slots are canonical.
    clusters: Vec<Cluster>,
    particles: ParticleSet,
    rng: SmallRng,
    timestep: u64,
}

impl Simulation {
    /// Creates an empty world.
    pub fn new(params: SimulationParameters) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            metric: SpaceMetric::new(params.world_size),
            clusters: Vec::new(),
            particles: ParticleSet::default(),
            rng: SmallRng::seed_from_u64(params.seed),
            timestep: 0,
            params,
        })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn metric(&self) -> &SpaceMetric {
        &self.metric
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    /// Replaces the world content with `data`.
    ///
    /// Clusters that fail to load are skipped and returned as errors; the
    /// rest of the description is loaded normally. A cluster id seen twice
    /// keeps its first occurrence.
    pub fn update_data(&mut self, data: &DataDescription) -> Vec<DescriptionError> {
        let mut seen = HashSet::with_capacity(data.clusters.len());
        let mut errors = Vec::new();
        let mut clusters = Vec::with_capacity(data.clusters.len());
        for desc in &data.clusters {
            if !seen.insert(desc.id) {
                errors.push(DescriptionError::DuplicateCluster { cluster: desc.id });
                continue;
            }
            match Cluster::from_description(desc, &self.params, &self.metric) {
                Ok(cluster) => clusters.push(cluster),
                Err(err) => errors.push(err),
            }
        }
        for err in &errors {
            warn!(cluster = err.cluster(), %err, "cluster rejected");
        }
        clusters.sort_by_key(|c| c.id);
        self.clusters = clusters;

        self.particles = ParticleSet::from_descriptions(&data.particles, &self.metric);
        self.particles.particles.sort_by_key(|p| p.id);
        errors
    }

    /// Snapshot of the whole world.
    pub fn to_description(&self) -> DataDescription {
        DataDescription {
            clusters: self.clusters.iter().map(Cluster::to_description).collect(),
            particles: self.particles.to_descriptions(),
        }
    }

    /// Clusters with at least one cell, and particles, inside the toroidal
    /// rectangle starting at `top_left`.
    pub fn query_region(&self, top_left: Vec2, size: Vec2) -> DataDescription {
        let inside = |pos| self.metric.contains(top_left, size, pos);
        DataDescription {
            clusters: self
                .clusters
                .iter()
                .filter(|c| c.cells.iter().any(|cell| inside(cell.abs_pos)))
                .map(Cluster::to_description)
                .collect(),
            particles: self
                .particles
                .to_descriptions()
                .into_iter()
                .filter(|p| inside(p.pos))
                .collect(),
        }
    }

    pub fn energy(&self) -> EnergyTotals {
        EnergyTotals::of_world(&self.clusters, &self.particles, self.params.cell_mass)
    }

    /// Advances the world by one step.
    pub fn step(&mut self) -> StepReport {
        let params = &self.params;
        let before = EnergyTotals::of_world(&self.clusters, &self.particles, params.cell_mass);

        let world = WorldView::build(&self.clusters, &self.metric, params.weapon_range);
        let kinematics: Vec<ClusterKinematics> = self
            .clusters
            .iter()
            .map(|c| ClusterKinematics::of(c, params.cell_mass))
            .collect();

        let dispatches: Vec<ClusterDispatch> = self
            .clusters
            .par_iter_mut()
            .zip(kinematics.par_iter())
            .enumerate()
            .map(|(slot, (cluster, kin))| {
                let arrivals = phases::routing_phase(cluster, params);
                phases::dispatch_phase(cluster, slot, arrivals, kin, &world, params)
            })
            .collect();

        let mut diagnostics = Vec::new();
        for (cluster, dispatch) in self.clusters.iter().zip(&dispatches) {
            for &(cell, function_type) in &dispatch.unrecognized {
                let cell = cluster.cells[cell].id;
                warn!(cluster = cluster.id, cell, function_type, "unrecognized cell function");
                diagnostics.push(StepDiagnostic::UnrecognizedFunction {
                    cluster: cluster.id,
                    cell,
                    function_type,
                });
            }
        }

        let kinetic_charged =
            phases::integration_phase(&mut self.clusters, &dispatches, params, &self.metric);

        let transfers: Vec<_> = dispatches
            .iter()
            .flat_map(|d| d.transfers.iter().copied())
            .collect();
        let drained = phases::transfer_phase(&mut self.clusters, &transfers, params);

        let radiated = phases::radiation_phase(
            &mut self.clusters,
            &mut self.particles,
            params,
            &mut self.rng,
        );
        self.particles.advance(params.dt, &self.metric);

        let balance = EnergyBalance {
            before,
            after: EnergyTotals::of_world(&self.clusters, &self.particles, params.cell_mass),
            radiated,
        };
        if let Some(diagnostic) = balance.check(params) {
            warn!(
                before = diagnostic.before,
                after = diagnostic.after,
                tolerance = diagnostic.tolerance,
                "energy balance breached"
            );
            diagnostics.push(StepDiagnostic::EnergyImbalance(diagnostic));
        }

        self.timestep += 1;
        debug!(
            timestep = self.timestep,
            clusters = self.clusters.len(),
            particles = self.particles.particles.len(),
            energy = balance.after.total(),
            kinetic_charged,
            drained,
            radiated,
            "step finished"
        );

        StepReport {
            timestep: self.timestep,
            balance,
            kinetic_charged,
            drained,
            diagnostics,
            rejected: Vec::new(),
        }
    }

    pub fn run(&mut self, steps: usize) -> Vec<StepReport> {
        (0..steps).map(|_| self.step()).collect()
    }

    /// Loads `data`, advances it by one step and describes the result.
    pub fn step_description(&mut self, data: &DataDescription) -> StepOutcome {
        let rejected = self.update_data(data);
        let mut report = self.step();
        report.rejected = rejected;
        StepOutcome {
            data: self.to_description(),
            report,
        }
    }
}
