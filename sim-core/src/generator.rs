//! Random demo worlds.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::cell::CellFunctionType;
use crate::config::SimulationParameters;
use crate::description::{
    CellFeatureDescription, ClusterDescription, DataDescription, TokenDescription,
};
use crate::functions::propulsion::PropIn;
use crate::functions::sensor::SensorIn;
use crate::particle::ParticleSet;
use crate::space_metric::SpaceMetric;
use crate::token::registers;

/// Shape of a generated world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldRecipe {
    pub clusters: usize,
    /// Cells per cluster are drawn from `2..=max_cells`.
    pub max_cells: usize,
    pub cell_energy: f32,
    pub token_energy: f32,
    pub particles: usize,
    pub particle_energy: f32,
    pub max_speed: f32,
}

impl Default for WorldRecipe {
    fn default() -> Self {
        Self {
            clusters: 20,
            max_cells: 6,
            cell_energy: 100.0,
            token_energy: 30.0,
            particles: 50,
            particle_energy: 5.0,
            max_speed: 0.2,
        }
    }
}

const FUNCTIONS: [Option<CellFunctionType>; 4] = [
    None,
    Some(CellFunctionType::Propulsion),
    Some(CellFunctionType::Weapon),
    Some(CellFunctionType::Sensor),
];

/// Builds chains of randomly specialized cells, each carrying one token at
/// its head, plus free particles.
pub fn random_world(
    recipe: &WorldRecipe,
    params: &SimulationParameters,
    rng: &mut impl Rng,
) -> DataDescription {
    let metric = SpaceMetric::new(params.world_size);
    let size = metric.size();
    let mut data = DataDescription::default();

    for id in 1..=recipe.clusters as u64 {
        let len = rng.random_range(2..=recipe.max_cells.max(2));
        let mut cluster = ClusterDescription::line(id, len, recipe.cell_energy)
            .with_pos(Vec2::new(
                rng.random_range(0.0..size.x),
                rng.random_range(0.0..size.y),
            ))
            .with_vel(Vec2::new(
                rng.random_range(-recipe.max_speed..=recipe.max_speed),
                rng.random_range(-recipe.max_speed..=recipe.max_speed),
            ))
            .with_angle(rng.random_range(0.0..360.0));
        for (i, cell) in cluster.cells.iter_mut().enumerate() {
            cell.token_branch_number = (i % usize::from(params.cell_max_token_branch_number)) as u8;
            if i > 0
                && let Some(Some(function)) = FUNCTIONS.choose(rng)
            {
                cell.feature = Some(CellFeatureDescription::new(*function));
            }
        }

        let token = TokenDescription::new(recipe.token_energy)
            .with_register(
                registers::prop::IN,
                rng.random_range(PropIn::DoNothing as u8..=PropIn::DampRotation as u8),
            )
            .with_register(registers::prop::IN_ANGLE, rng.random())
            .with_register(registers::prop::IN_POWER, rng.random())
            .with_register(
                registers::sensor::IN,
                rng.random_range(SensorIn::DoNothing as u8..=SensorIn::SearchTowardCenter as u8),
            );
        cluster.cells[0].add_token(token);
        data.add_cluster(cluster);
    }

    data.particles = ParticleSet::random(
        recipe.particles,
        recipe.particle_energy,
        recipe.max_speed,
        &metric,
        rng,
    )
    .to_descriptions();
    data
}
