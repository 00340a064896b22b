use glam::Vec2;
use rand::Rng;

use crate::description::ParticleDescription;
use crate::space_metric::SpaceMetric;
use crate::types::ParticleId;

/// Free energy quantum drifting over the torus.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyParticle {
    pub id: ParticleId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub energy: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleSet {
    pub particles: Vec<EnergyParticle>,
    next_id: ParticleId,
}

impl ParticleSet {
    pub fn from_descriptions(descs: &[ParticleDescription], metric: &SpaceMetric) -> Self {
        let particles: Vec<EnergyParticle> = descs
            .iter()
            .filter(|p| p.energy.is_finite() && p.energy > 0.0 && p.vel.is_finite())
            .map(|p| EnergyParticle {
                id: p.id,
                pos: metric.correct_position(p.pos),
                vel: p.vel,
                energy: p.energy,
            })
            .collect();
        let next_id = particles.iter().map(|p| p.id + 1).max().unwrap_or(1);
        Self { particles, next_id }
    }

    pub fn to_descriptions(&self) -> Vec<ParticleDescription> {
        self.particles
            .iter()
            .map(|p| ParticleDescription {
                id: p.id,
                pos: p.pos,
                vel: p.vel,
                energy: p.energy,
            })
            .collect()
    }

    /// Adds a particle and returns its id.
    pub fn emit(&mut self, pos: Vec2, vel: Vec2, energy: f32) -> ParticleId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.particles.push(EnergyParticle {
            id,
            pos,
            vel,
            energy,
        });
        id
    }

    /// Scatters `count` particles uniformly over the world.
    pub fn random(
        count: usize,
        energy: f32,
        max_speed: f32,
        metric: &SpaceMetric,
        rng: &mut impl Rng,
    ) -> Self {
        let mut set = Self::default();
        let size = metric.size();
        for _ in 0..count {
            let pos = Vec2::new(rng.random_range(0.0..size.x), rng.random_range(0.0..size.y));
            let vel = Vec2::new(
                rng.random_range(-max_speed..=max_speed),
                rng.random_range(-max_speed..=max_speed),
            );
            set.emit(pos, vel, energy);
        }
        set
    }

    pub fn advance(&mut self, dt: f32, metric: &SpaceMetric) {
        for p in &mut self.particles {
            p.pos = metric.shift_position(p.pos, p.vel * dt);
        }
    }

    pub fn total_energy(&self) -> f64 {
        self.particles.iter().map(|p| f64::from(p.energy)).sum()
    }
}
