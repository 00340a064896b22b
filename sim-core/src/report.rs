use crate::description::DataDescription;
use crate::energy::{EnergyBalance, EnergyDiagnostic};
use crate::error::DescriptionError;
use crate::types::{CellId, ClusterId};

/// Non-fatal conditions met while stepping.
#[derive(Clone, Debug, PartialEq)]
pub enum StepDiagnostic {
    /// A token visited a cell whose function type is unknown.
    UnrecognizedFunction {
        cluster: ClusterId,
        cell: CellId,
        function_type: u8,
    },
    /// World energy changed by more than the tolerance.
    EnergyImbalance(EnergyDiagnostic),
}

/// What happened during one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Number of the step, starting at 1.
    pub timestep: u64,
    pub balance: EnergyBalance,
    /// Kinetic energy charged to cells by the integrator.
    pub kinetic_charged: f64,
    /// Energy drained by weapons.
    pub drained: f64,
    pub diagnostics: Vec<StepDiagnostic>,
    /// Clusters of the input description that could not be loaded.
    pub rejected: Vec<DescriptionError>,
}

impl StepReport {
    pub fn energy_diagnostic(&self) -> Option<&EnergyDiagnostic> {
        self.diagnostics.iter().find_map(|d| match d {
            StepDiagnostic::EnergyImbalance(e) => Some(e),
            _ => None,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.energy_diagnostic().is_none()
    }
}

/// Result of stepping a description.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub data: DataDescription,
    pub report: StepReport,
}
