//! Cell functions and their dispatch.
//!
//! Every cell function is a pure routine
//! `(token, context) -> ProcessingResult`. It may rewrite the token's
//! registers, but any effect on the cluster or the rest of the world leaves
//! it only as a request inside the [`ProcessingResult`], applied later by
//! the step phases.

pub mod computer;
pub mod propulsion;
pub mod sensor;
pub mod weapon;

use glam::Vec2;

use crate::cell::{Cell, CellFunction, CellMemory};
use crate::config::SimulationParameters;
use crate::delta_buffer::KinematicDelta;
use crate::physics::{self, ClusterKinematics};
use crate::token::{Token, registers};
use crate::types::CellIndex;
use crate::world_view::{CellRef, WorldView};

/// Everything a cell function may look at while processing a token.
pub struct ProcessingContext<'a> {
    pub params: &'a SimulationParameters,
    /// Kinematics of the owning cluster at the start of the step.
    pub cluster: &'a ClusterKinematics,
    /// Slot of the owning cluster in the world view.
    pub cluster_slot: usize,
    /// Cell arena of the owning cluster.
    pub cells: &'a [Cell],
    pub cell: CellIndex,
    /// Cell the token arrived from, `None` on the token's origin step.
    pub previous: Option<CellIndex>,
    pub world: &'a WorldView,
}

impl ProcessingContext<'_> {
    pub fn cell(&self) -> &Cell {
        &self.cells[self.cell]
    }

    pub fn previous_cell(&self) -> Option<&Cell> {
        self.previous.map(|i| &self.cells[i])
    }

    /// Offset of the processing cell from the cluster center, world frame.
    pub fn world_offset(&self) -> Vec2 {
        physics::rotate(self.cell().rel_pos, self.cluster.angle)
    }

    /// Direction that angle registers are measured from, world frame.
    ///
    /// It points from the processing cell back toward the previous cell,
    /// or along the cluster's local x axis when there is none.
    pub fn reference_direction(&self) -> Vec2 {
        let local = self
            .previous_cell()
            .map(|prev| (prev.rel_pos - self.cell().rel_pos).normalize_or_zero())
            .filter(|dir| *dir != Vec2::ZERO)
            .unwrap_or(Vec2::X);
        physics::rotate(local, self.cluster.angle)
    }
}

/// Energy drained from a cell of another cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyTransfer {
    pub source: CellRef,
    pub amount: f32,
}

/// Outcome of processing one token at one cell.
///
/// There is no request to spawn tokens at neighbors: a token reaching a
/// fork is copied onto every successor by [`crate::phases::routing_phase`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessingResult {
    /// Velocity change requested for the owning cluster.
    pub delta: Option<KinematicDelta>,
    /// The token is to be removed; its energy goes to the cell.
    pub consume_token: bool,
    /// Energy to drain from other clusters, shared between the processing
    /// cell and the token.
    pub transfers: Vec<EnergyTransfer>,
    /// New contents of the processing cell's memory.
    pub cell_memory: Option<CellMemory>,
    /// Type code of a function this engine does not know.
    pub unrecognized_function: Option<u8>,
}

/// Runs the function of the context's cell on `token`.
pub fn dispatch(token: &mut Token, ctx: &ProcessingContext) -> ProcessingResult {
    let mut result = match &ctx.cell().function {
        CellFunction::None => ProcessingResult::default(),
        CellFunction::Computer(program) => computer::process(program, token, ctx),
        CellFunction::Propulsion => propulsion::process(token, ctx),
        CellFunction::Weapon => weapon::process(token, ctx),
        CellFunction::Sensor => sensor::process(token, ctx),
        CellFunction::Unrecognized(code) => {
            token.set(registers::OUT, registers::FAILURE);
            ProcessingResult {
                unrecognized_function: Some(*code),
                ..ProcessingResult::default()
            }
        }
    };
    if token.energy < ctx.params.token_min_energy {
        result.consume_token = true;
    }
    result
}
