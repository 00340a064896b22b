use glam::UVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when simulation parameters cannot be used.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid simulation parameter `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Global parameters of a simulation run.
///
/// Every field has a default (see [`SimulationParameters::default`]), so a
/// JSON document only needs to name the options it overrides.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParameters {
    /// Toroidal world size `(width, height)`.
    pub world_size: UVec2,
    /// Time delta of one step.
    pub dt: f32,
    /// Per-cell, per-step probability of emitting an energy particle.
    /// Set to `0` to isolate propulsion and weapon behavior.
    pub radiation_probability: f32,
    /// Fraction of the cell energy carried away by one radiation event.
    pub radiation_factor: f32,
    /// Mass of a single cell.
    pub cell_mass: f32,
    /// Energy a cell always keeps when paying for a function.
    pub cell_min_energy: f32,
    /// Maximum number of tokens a cell can hold at once.
    pub cell_max_tokens: usize,
    /// Branch numbers cycle through `0..cell_max_token_branch_number`.
    pub cell_max_token_branch_number: u8,
    /// Tokens below this energy are consumed by their cell.
    pub token_min_energy: f32,
    /// Thrust produced by a propulsion cell at full power.
    pub propulsion_max_thrust: f32,
    /// Fraction of the target energy drained by one weapon strike.
    pub weapon_strength: f32,
    /// Reach of a weapon cell.
    pub weapon_range: f32,
    /// Reach of a sensor cell.
    pub sensor_range: f32,
    /// Half-width (degrees) of the cone searched by directional sensors.
    pub sensor_angular_tolerance: f32,
    /// Upper bound on instructions executed by a computer cell.
    pub computer_max_instructions: usize,
    /// Absolute tolerance of the energy balance check.
    pub energy_tolerance_abs: f64,
    /// Relative tolerance of the energy balance check.
    pub energy_tolerance_rel: f64,
    /// Seed for radiation and random world generation.
    pub seed: u64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            world_size: UVec2::new(1000, 1000),
            dt: 1.0,
            radiation_probability: 0.03,
            radiation_factor: 0.05,
            cell_mass: 1.0,
            cell_min_energy: 1.0,
            cell_max_tokens: 3,
            cell_max_token_branch_number: 6,
            token_min_energy: 3.0,
            propulsion_max_thrust: 0.1,
            weapon_strength: 0.1,
            weapon_range: 2.0,
            sensor_range: 50.0,
            sensor_angular_tolerance: 20.0,
            computer_max_instructions: 15,
            energy_tolerance_abs: 1e-3,
            energy_tolerance_rel: 1e-4,
            seed: 0,
        }
    }
}

impl SimulationParameters {
    /// Parameters for a world of the given size, everything else default.
    pub fn with_world_size(width: u32, height: u32) -> Self {
        Self {
            world_size: UVec2::new(width, height),
            ..Self::default()
        }
    }

    /// Checks that every parameter lies in its usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });

        if self.world_size.x == 0 || self.world_size.y == 0 {
            return invalid("worldSize", "both axes must be positive");
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return invalid("dt", "must be a positive finite number");
        }
        if !(0.0..=1.0).contains(&self.radiation_probability) {
            return invalid("radiationProbability", "must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.radiation_factor) {
            return invalid("radiationFactor", "must lie in [0, 1]");
        }
        if !(self.cell_mass.is_finite() && self.cell_mass > 0.0) {
            return invalid("cellMass", "must be a positive finite number");
        }
        if !(self.cell_min_energy.is_finite() && self.cell_min_energy >= 0.0) {
            return invalid("cellMinEnergy", "must be a non-negative finite number");
        }
        if self.cell_max_tokens == 0 {
            return invalid("cellMaxTokens", "must be at least 1");
        }
        if self.cell_max_token_branch_number == 0 {
            return invalid("cellMaxTokenBranchNumber", "must be at least 1");
        }
        if !(self.token_min_energy.is_finite() && self.token_min_energy >= 0.0) {
            return invalid("tokenMinEnergy", "must be a non-negative finite number");
        }
        if !(self.propulsion_max_thrust.is_finite() && self.propulsion_max_thrust >= 0.0) {
            return invalid("propulsionMaxThrust", "must be a non-negative finite number");
        }
        if !(0.0..=1.0).contains(&self.weapon_strength) {
            return invalid("weaponStrength", "must lie in [0, 1]");
        }
        if !(self.weapon_range >= 0.0 && self.sensor_range >= 0.0) {
            return invalid("weaponRange/sensorRange", "must not be negative");
        }
        if !(0.0..=180.0).contains(&self.sensor_angular_tolerance) {
            return invalid("sensorAngularTolerance", "must lie in [0, 180]");
        }
        if !(self.energy_tolerance_abs >= 0.0 && self.energy_tolerance_rel >= 0.0) {
            return invalid("energyTolerance", "must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationParameters::default().validate(), Ok(()));
    }

    #[test]
    fn zero_world_axis_is_rejected() {
        let params = SimulationParameters::with_world_size(0, 10);
        assert!(matches!(
            params.validate(),
            Err(ConfigError::Invalid {
                field: "worldSize",
                ..
            })
        ));
    }

    #[test]
    fn radiation_probability_outside_unit_interval_is_rejected() {
        let mut params = SimulationParameters::default();
        params.radiation_probability = 1.5;
        assert!(params.validate().is_err());
    }

    #[test]
    fn infinite_energy_thresholds_are_rejected() {
        for field in ["cellMinEnergy", "tokenMinEnergy", "propulsionMaxThrust"] {
            let mut params = SimulationParameters::default();
            match field {
                "cellMinEnergy" => params.cell_min_energy = f32::INFINITY,
                "tokenMinEnergy" => params.token_min_energy = f32::INFINITY,
                _ => params.propulsion_max_thrust = f32::INFINITY,
            }
            assert!(
                matches!(params.validate(), Err(ConfigError::Invalid { field: f, .. }) if f == field),
                "{field}"
            );
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: SimulationParameters =
            serde_json::from_str(r#"{ "worldSize": [10, 20], "radiationProbability": 0.0 }"#)
                .unwrap();
        assert_eq!(params.world_size, UVec2::new(10, 20));
        assert_eq!(params.radiation_probability, 0.0);
        assert_eq!(params.cell_max_tokens, 3);
    }
}
