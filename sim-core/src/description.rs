//! Data descriptions exchanged with the surrounding simulation context.
//!
//! A [`DataDescription`] is the only shape in which world state enters or
//! leaves the core. Descriptions are plain serde data; the builder helpers
//! keep test and tooling code short.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cell::CellFunctionType;
use crate::types::{CellId, ClusterId, ParticleId};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDescription {
    pub clusters: Vec<ClusterDescription>,
    pub particles: Vec<ParticleDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterDescription {
    pub id: ClusterId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Orientation in degrees.
    pub angle: f32,
    /// Degrees per time unit, positive is clockwise on screen.
    pub angular_vel: f32,
    pub cells: Vec<CellDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellDescription {
    pub id: CellId,
    /// Position relative to the cluster center, in the cluster frame.
    pub rel_pos: Vec2,
    pub energy: f32,
    pub token_branch_number: u8,
    /// Ids of the cells this cell is bonded to.
    pub connections: Vec<CellId>,
    pub feature: Option<CellFeatureDescription>,
    pub tokens: Vec<TokenDescription>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CellFeatureDescription {
    /// Raw function type code, see [`CellFunctionType`].
    pub function_type: u8,
    /// Immutable function data, e.g. compiled computer code.
    pub static_data: Vec<u8>,
    /// Mutable function data, e.g. the computer cell memory.
    pub volatile_data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenDescription {
    pub energy: f32,
    /// Register snapshot indexed by register address.
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleDescription {
    pub id: ParticleId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub energy: f32,
}

impl DataDescription {
    pub fn add_cluster(&mut self, cluster: ClusterDescription) -> &mut Self {
        self.clusters.push(cluster);
        self
    }

    pub fn add_particle(&mut self, particle: ParticleDescription) -> &mut Self {
        self.particles.push(particle);
        self
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&ClusterDescription> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

impl ClusterDescription {
    /// A straight chain of `len` bonded cells one unit apart, centered on
    /// the cluster position. Cell ids are `id * 1000 + i`.
    pub fn line(id: ClusterId, len: usize, cell_energy: f32) -> Self {
        let offset = (len as f32 - 1.0) * 0.5;
        let cells = (0..len)
            .map(|i| {
                let mut connections = Vec::with_capacity(2);
                if i > 0 {
                    connections.push(line_cell_id(id, i - 1));
                }
                if i + 1 < len {
                    connections.push(line_cell_id(id, i + 1));
                }
                CellDescription {
                    id: line_cell_id(id, i),
                    rel_pos: Vec2::new(i as f32 - offset, 0.0),
                    energy: cell_energy,
                    connections,
                    ..CellDescription::default()
                }
            })
            .collect();
        Self {
            id,
            cells,
            ..Self::default()
        }
    }

    pub fn with_pos(mut self, pos: Vec2) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_vel(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_angular_vel(mut self, angular_vel: f32) -> Self {
        self.angular_vel = angular_vel;
        self
    }

    pub fn cell(&self, id: CellId) -> Option<&CellDescription> {
        self.cells.iter().find(|c| c.id == id)
    }

    pub fn token_count(&self) -> usize {
        self.cells.iter().map(|c| c.tokens.len()).sum()
    }
}

fn line_cell_id(cluster: ClusterId, i: usize) -> CellId {
    cluster * 1000 + i as CellId
}

impl CellDescription {
    pub fn with_feature(mut self, feature: CellFeatureDescription) -> Self {
        self.feature = Some(feature);
        self
    }

    pub fn add_token(&mut self, token: TokenDescription) -> &mut Self {
        self.tokens.push(token);
        self
    }
}

impl CellFeatureDescription {
    pub fn new(function_type: CellFunctionType) -> Self {
        Self {
            function_type: function_type.code(),
            ..Self::default()
        }
    }

    pub fn with_static_data(mut self, data: Vec<u8>) -> Self {
        self.static_data = data;
        self
    }
}

impl TokenDescription {
    pub fn new(energy: f32) -> Self {
        Self {
            energy,
            data: Vec::new(),
        }
    }

    /// Writes `value` into register `address`, growing the snapshot.
    pub fn with_register(mut self, address: usize, value: u8) -> Self {
        if self.data.len() <= address {
            self.data.resize(address + 1, 0);
        }
        self.data[address] = value;
        self
    }

    pub fn register(&self, address: usize) -> u8 {
        self.data.get(address).copied().unwrap_or(0)
    }
}
