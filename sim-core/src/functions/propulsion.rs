//! Propulsion: turns cell energy into cluster motion.

use glam::Vec2;

use super::{ProcessingContext, ProcessingResult};
use crate::delta_buffer::KinematicDelta;
use crate::physics;
use crate::token::{Token, angle_from_data, registers};

/// Commands read from `prop::IN`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PropIn {
    DoNothing = 0,
    ByAngle = 1,
    FromCenter = 2,
    TowardCenter = 3,
    RotationClockwise = 4,
    RotationCounterclockwise = 5,
    DampRotation = 6,
}

impl PropIn {
    pub fn from_data(data: u8) -> Option<Self> {
        match data {
            0 => Some(Self::DoNothing),
            1 => Some(Self::ByAngle),
            2 => Some(Self::FromCenter),
            3 => Some(Self::TowardCenter),
            4 => Some(Self::RotationClockwise),
            5 => Some(Self::RotationCounterclockwise),
            6 => Some(Self::DampRotation),
            _ => None,
        }
    }
}

/// Result codes written to `OUT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PropOut {
    Success = 0,
    ErrorNoEnergy = 1,
    Failure = registers::FAILURE,
}

pub fn process(token: &mut Token, ctx: &ProcessingContext) -> ProcessingResult {
    let Some(command) = PropIn::from_data(token.get(registers::prop::IN)) else {
        token.set(registers::OUT, PropOut::Failure as u8);
        return ProcessingResult::default();
    };
    if command == PropIn::DoNothing {
        token.set(registers::OUT, PropOut::Success as u8);
        return ProcessingResult::default();
    }

    let kin = ctx.cluster;
    let power =
        f32::from(token.get(registers::prop::IN_POWER)) / 255.0 * ctx.params.propulsion_max_thrust;
    let offset = ctx.world_offset();

    let thrust = |force: Vec2| {
        (
            force / kin.mass,
            physics::angular_delta(offset, force, kin.angular_mass),
        )
    };
    // Magnitude of the turn a tangential thrust at this cell produces.
    let spin = || {
        if kin.angular_mass <= f32::EPSILON {
            0.0
        } else {
            (power * offset.length() / kin.angular_mass).to_degrees()
        }
    };

    let (linear, angular) = match command {
        PropIn::DoNothing => (Vec2::ZERO, 0.0),
        PropIn::ByAngle => {
            let angle = angle_from_data(token.get(registers::prop::IN_ANGLE));
            thrust(physics::rotate(ctx.reference_direction(), angle) * power)
        }
        PropIn::FromCenter => thrust(offset.normalize_or_zero() * power),
        PropIn::TowardCenter => thrust(-offset.normalize_or_zero() * power),
        PropIn::RotationClockwise => (Vec2::ZERO, spin()),
        PropIn::RotationCounterclockwise => (Vec2::ZERO, -spin()),
        PropIn::DampRotation => {
            let current = kin.angular_vel;
            let damping = if current == 0.0 {
                0.0
            } else {
                -current.signum() * spin().min(current.abs())
            };
            (Vec2::ZERO, damping)
        }
    };

    let energy_cost = kin.energy_cost(linear, angular);
    if energy_cost > 0.0 && ctx.cell().energy - energy_cost < ctx.params.cell_min_energy {
        token.set(registers::OUT, PropOut::ErrorNoEnergy as u8);
        return ProcessingResult::default();
    }

    token.set(registers::OUT, PropOut::Success as u8);
    ProcessingResult {
        delta: Some(KinematicDelta {
            linear,
            angular,
            energy_cost,
        }),
        ..ProcessingResult::default()
    }
}
