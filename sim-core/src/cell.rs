use glam::Vec2;

use crate::description::{CellDescription, CellFeatureDescription};
use crate::functions::computer::ComputerProgram;
use crate::token::Token;
use crate::types::{CellId, CellIndex};

/// Size of the volatile memory of a cell.
pub const CELL_MEMORY_SIZE: usize = 8;

pub type CellMemory = [u8; CELL_MEMORY_SIZE];

/// Function type codes as they appear in descriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellFunctionType {
    Computer = 0,
    Propulsion = 1,
    Weapon = 2,
    Sensor = 3,
}

impl CellFunctionType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Computer),
            1 => Some(Self::Propulsion),
            2 => Some(Self::Weapon),
            3 => Some(Self::Sensor),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Behavior selected by a cell's feature.
#[derive(Clone, Debug, PartialEq)]
pub enum CellFunction {
    None,
    Computer(ComputerProgram),
    Propulsion,
    Weapon,
    Sensor,
    /// A feature whose type code is not known to this engine.
    Unrecognized(u8),
}

impl CellFunction {
    /// Builds the function of a feature description.
    pub fn from_feature(feature: Option<&CellFeatureDescription>) -> Self {
        let Some(feature) = feature else {
            return Self::None;
        };
        match CellFunctionType::from_code(feature.function_type) {
            Some(CellFunctionType::Computer) => {
                Self::Computer(ComputerProgram::from_bytes(&feature.static_data))
            }
            Some(CellFunctionType::Propulsion) => Self::Propulsion,
            Some(CellFunctionType::Weapon) => Self::Weapon,
            Some(CellFunctionType::Sensor) => Self::Sensor,
            None => Self::Unrecognized(feature.function_type),
        }
    }

    pub fn function_type_code(&self) -> Option<u8> {
        match self {
            Self::None => None,
            Self::Computer(_) => Some(CellFunctionType::Computer.code()),
            Self::Propulsion => Some(CellFunctionType::Propulsion.code()),
            Self::Weapon => Some(CellFunctionType::Weapon.code()),
            Self::Sensor => Some(CellFunctionType::Sensor.code()),
            Self::Unrecognized(code) => Some(*code),
        }
    }

    fn static_data(&self) -> Vec<u8> {
        match self {
            Self::Computer(program) => program.to_bytes(),
            _ => Vec::new(),
        }
    }
}

/// A cell inside a cluster's arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub id: CellId,
    /// Position relative to the cluster center, in the cluster frame.
    pub rel_pos: Vec2,
    /// World position, derived from the owning cluster's center and angle.
    pub abs_pos: Vec2,
    pub energy: f32,
    pub branch_number: u8,
    pub connections: Vec<CellIndex>,
    pub function: CellFunction,
    pub memory: CellMemory,
    pub tokens: Vec<Token>,
}

impl Cell {
    /// Creates a cell from its description. Connections and tokens are
    /// resolved by the owning cluster.
    pub fn from_description(desc: &CellDescription, max_branch_number: u8) -> Self {
        let mut memory = [0; CELL_MEMORY_SIZE];
        if let Some(feature) = &desc.feature {
            let len = feature.volatile_data.len().min(CELL_MEMORY_SIZE);
            memory[..len].copy_from_slice(&feature.volatile_data[..len]);
        }
        Self {
            id: desc.id,
            rel_pos: desc.rel_pos,
            abs_pos: Vec2::ZERO,
            energy: desc.energy,
            branch_number: desc.token_branch_number % max_branch_number,
            connections: Vec::new(),
            function: CellFunction::from_feature(desc.feature.as_ref()),
            memory,
            tokens: Vec::new(),
        }
    }

    pub fn feature_description(&self) -> Option<CellFeatureDescription> {
        let function_type = self.function.function_type_code()?;
        Some(CellFeatureDescription {
            function_type,
            static_data: self.function.static_data(),
            volatile_data: self.memory.to_vec(),
        })
    }

    pub fn is_connected_to(&self, other: CellIndex) -> bool {
        self.connections.contains(&other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_code_is_kept() {
        let feature = CellFeatureDescription {
            function_type: 42,
            ..CellFeatureDescription::default()
        };
        let function = CellFunction::from_feature(Some(&feature));
        assert_eq!(function, CellFunction::Unrecognized(42));
        assert_eq!(function.function_type_code(), Some(42));
    }

    #[test]
    fn branch_number_is_reduced_modulo_maximum() {
        let desc = CellDescription {
            token_branch_number: 8,
            ..CellDescription::default()
        };
        assert_eq!(Cell::from_description(&desc, 6).branch_number, 2);
    }

    #[test]
    fn cell_without_feature_has_no_description() {
        let cell = Cell::from_description(&CellDescription::default(), 6);
        assert_eq!(cell.function, CellFunction::None);
        assert!(cell.feature_description().is_none());
    }
}
