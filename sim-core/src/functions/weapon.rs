//! Weapon: drains energy from cells of nearby foreign clusters.

use super::{EnergyTransfer, ProcessingContext, ProcessingResult};
use crate::token::{Token, registers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WeaponOut {
    NoTarget = 0,
    StrikeSuccessful = 1,
}

pub fn process(token: &mut Token, ctx: &ProcessingContext) -> ProcessingResult {
    let params = ctx.params;
    let transfers: Vec<EnergyTransfer> = ctx
        .world
        .cells_within(ctx.cell().abs_pos, params.weapon_range)
        .into_iter()
        .filter(|(target, _)| target.at.cluster != ctx.cluster_slot)
        .filter_map(|(target, _)| {
            let amount = target.energy * params.weapon_strength + 1.0;
            (target.energy - amount >= params.cell_min_energy).then_some(EnergyTransfer {
                source: target.at,
                amount,
            })
        })
        .collect();

    let out = if transfers.is_empty() {
        WeaponOut::NoTarget
    } else {
        WeaponOut::StrikeSuccessful
    };
    token.set(registers::OUT, out as u8);
    ProcessingResult {
        transfers,
        ..ProcessingResult::default()
    }
}
