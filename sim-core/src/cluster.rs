//! Rigid clusters of bonded cells.
//!
//! A cluster owns its cells in an index-addressed arena; bonds between cells
//! are stored as [`CellIndex`] values. Cell world positions are always
//! derived from the cluster center and orientation, never integrated on
//! their own.

use std::collections::HashMap;

use glam::Vec2;
use tracing::warn;

use crate::cell::Cell;
use crate::config::SimulationParameters;
use crate::description::{CellDescription, ClusterDescription, TokenDescription};
use crate::error::DescriptionError;
use crate::physics;
use crate::space_metric::SpaceMetric;
use crate::token::Token;
use crate::types::{CellIndex, ClusterId};

/// Centroids smaller than this are treated as already centered.
const CENTROID_EPSILON: f32 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Center of mass in world coordinates.
    pub pos: Vec2,
    pub vel: Vec2,
    /// Orientation in degrees, kept in `[0, 360)`.
    pub angle: f32,
    /// Degrees per time unit, positive is clockwise on screen.
    pub angular_vel: f32,
    pub cells: Vec<Cell>,
}

impl Cluster {
    /// Builds a cluster from its description.
    ///
    /// Connections are resolved to arena indices and made symmetric, the
    /// relative positions are re-centered on the center of mass and the
    /// cell world positions are derived.
    pub fn from_description(
        desc: &ClusterDescription,
        params: &SimulationParameters,
        metric: &SpaceMetric,
    ) -> Result<Self, DescriptionError> {
        let cluster = desc.id;
        let invalid = |field| DescriptionError::InvalidValue { cluster, field };

        if desc.cells.is_empty() {
            return Err(DescriptionError::EmptyCluster { cluster });
        }
        if !(desc.pos.is_finite() && desc.vel.is_finite()) {
            return Err(invalid("pos/vel"));
        }
        if !(desc.angle.is_finite() && desc.angular_vel.is_finite()) {
            return Err(invalid("angle/angularVel"));
        }

        let mut index_by_id: HashMap<_, CellIndex> = HashMap::with_capacity(desc.cells.len());
        for (index, cell) in desc.cells.iter().enumerate() {
            if index_by_id.insert(cell.id, index).is_some() {
                return Err(DescriptionError::DuplicateCell {
                    cluster,
                    cell: cell.id,
                });
            }
            if !cell.rel_pos.is_finite() {
                return Err(invalid("cells.relPos"));
            }
            if !(cell.energy.is_finite() && cell.energy >= 0.0) {
                return Err(invalid("cells.energy"));
            }
            if cell
                .tokens
                .iter()
                .any(|t| !(t.energy.is_finite() && t.energy >= 0.0))
            {
                return Err(invalid("cells.tokens.energy"));
            }
        }

        let mut cells: Vec<Cell> = desc
            .cells
            .iter()
            .map(|c| Cell::from_description(c, params.cell_max_token_branch_number))
            .collect();

        for (index, cell_desc) in desc.cells.iter().enumerate() {
            for target in &cell_desc.connections {
                let Some(&other) = index_by_id.get(target) else {
                    return Err(DescriptionError::UnknownConnection {
                        cluster,
                        cell: cell_desc.id,
                        target: *target,
                    });
                };
                if other == index {
                    continue;
                }
                if !cells[index].is_connected_to(other) {
                    cells[index].connections.push(other);
                }
                if !cells[other].is_connected_to(index) {
                    cells[other].connections.push(index);
                }
            }
        }
        for cell in &mut cells {
            cell.connections.sort_unstable();
        }

        for (cell, cell_desc) in cells.iter_mut().zip(&desc.cells) {
            load_tokens(cluster, cell, cell_desc, params);
        }

        let mut result = Self {
            id: cluster,
            pos: desc.pos,
            vel: desc.vel,
            angle: desc.angle.rem_euclid(360.0),
            angular_vel: desc.angular_vel,
            cells,
        };
        result.recenter();
        result.pos = metric.correct_position(result.pos);
        result.update_cell_positions(metric);
        Ok(result)
    }

    pub fn to_description(&self) -> ClusterDescription {
        let cells = self
            .cells
            .iter()
            .map(|cell| CellDescription {
                id: cell.id,
                rel_pos: cell.rel_pos,
                energy: cell.energy,
                token_branch_number: cell.branch_number,
                connections: cell.connections.iter().map(|&i| self.cells[i].id).collect(),
                feature: cell.feature_description(),
                tokens: cell
                    .tokens
                    .iter()
                    .map(|t| TokenDescription {
                        energy: t.energy,
                        data: t.memory.to_vec(),
                    })
                    .collect(),
            })
            .collect();
        ClusterDescription {
            id: self.id,
            pos: self.pos,
            vel: self.vel,
            angle: self.angle,
            angular_vel: self.angular_vel,
            cells,
        }
    }

    /// Moves the cluster origin onto the centroid of its cells while
    /// keeping every cell at the same world position.
    fn recenter(&mut self) {
        let centroid =
            self.cells.iter().map(|c| c.rel_pos).sum::<Vec2>() / self.cells.len() as f32;
        if centroid.length() < CENTROID_EPSILON {
            return;
        }
        for cell in &mut self.cells {
            cell.rel_pos -= centroid;
        }
        self.pos += physics::rotate(centroid, self.angle);
    }

    /// Re-derives the world position of every cell from center and angle.
    pub fn update_cell_positions(&mut self, metric: &SpaceMetric) {
        let rotation = Vec2::from_angle(self.angle.to_radians());
        for cell in &mut self.cells {
            cell.abs_pos = metric.correct_position(self.pos + rotation.rotate(cell.rel_pos));
        }
    }

    pub fn mass(&self, cell_mass: f32) -> f32 {
        self.cells.len() as f32 * cell_mass
    }

    pub fn angular_mass(&self, cell_mass: f32) -> f32 {
        self.cells
            .iter()
            .map(|c| c.rel_pos.length_squared() * cell_mass)
            .sum()
    }

    pub fn kinetic_energy(&self, cell_mass: f32) -> f32 {
        physics::kinetic_energy(
            self.mass(cell_mass),
            self.angular_mass(cell_mass),
            self.vel,
            self.angular_vel,
        )
    }

    pub fn token_count(&self) -> usize {
        self.cells.iter().map(|c| c.tokens.len()).sum()
    }
}

fn load_tokens(
    cluster: ClusterId,
    cell: &mut Cell,
    desc: &CellDescription,
    params: &SimulationParameters,
) {
    for (slot, token_desc) in desc.tokens.iter().enumerate() {
        if slot >= params.cell_max_tokens {
            warn!(
                cluster,
                cell = desc.id,
                "token beyond cell capacity dropped, energy credited to cell"
            );
            cell.energy += token_desc.energy;
            continue;
        }
        let (token, truncated) = Token::from_snapshot(token_desc.energy, &token_desc.data);
        if truncated {
            warn!(cluster, cell = desc.id, "token register snapshot truncated");
        }
        cell.tokens.push(token);
    }
}
