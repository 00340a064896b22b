//! Phases of one simulation step.
//!
//! A step runs, in order:
//! 1. [`routing_phase`]: tokens move along the cell graph to the cells
//!    whose branch number follows that of their current cell.
//! 2. [`dispatch_phase`]: every arrived token is processed by the function
//!    of its new cell; kinematic requests are collected in a
//!    [`DeltaBuffer`], cross-cluster effects as [`PendingTransfer`]s.
//! 3. [`integration_phase`]: the collected requests are applied and every
//!    cluster moves.
//! 4. [`transfer_phase`]: weapon drains are applied in canonical order.
//! 5. [`radiation_phase`]: cells randomly shed energy as particles.
//!
//! Phases 1 to 3 only touch one cluster at a time and run in parallel over
//! clusters; phases 4 and 5 run sequentially.

use glam::Vec2;
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::cell::Cell;
use crate::cluster::Cluster;
use crate::config::SimulationParameters;
use crate::delta_buffer::DeltaBuffer;
use crate::functions::{self, EnergyTransfer, ProcessingContext};
use crate::particle::ParticleSet;
use crate::physics::{self, ClusterKinematics};
use crate::space_metric::SpaceMetric;
use crate::token::Token;
use crate::types::CellIndex;
use crate::world_view::WorldView;

/// A token that reached `cell` from `previous` during routing.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrival {
    pub cell: CellIndex,
    pub previous: CellIndex,
    pub token: Token,
}

/// An energy drain requested by a weapon, waiting to be applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingTransfer {
    /// Slot of the firing cluster.
    pub cluster: usize,
    /// Firing cell.
    pub cell: CellIndex,
    /// Slot of the firing token on its cell, `None` if it was consumed.
    pub token: Option<usize>,
    pub transfer: EnergyTransfer,
}

/// Everything the dispatch of one cluster produced.
#[derive(Debug, Default)]
pub struct ClusterDispatch {
    pub deltas: DeltaBuffer,
    pub transfers: Vec<PendingTransfer>,
    /// Cells whose function type code is unknown, with that code.
    pub unrecognized: Vec<(CellIndex, u8)>,
}

/// Connected cells a token leaves `index` for, ascending by index.
pub fn successors(cells: &[Cell], index: CellIndex, max_branch_number: u8) -> Vec<CellIndex> {
    let next = ((u16::from(cells[index].branch_number) + 1) % u16::from(max_branch_number)) as u8;
    cells[index]
        .connections
        .iter()
        .copied()
        .filter(|&other| cells[other].branch_number == next)
        .collect()
}

/// Moves every token of the cluster one hop along the cell graph.
///
/// Tokens are visited by cell index, then by slot:
///
/// 1. With no successor the token dissolves and its energy goes to its
///    current cell.
/// 2. Otherwise the token is split into one copy per successor, the
///    energy shares summing to the original energy. This is the only way
///    new tokens appear on neighboring cells.
/// 3. A destination accepts at most `params.cell_max_tokens` arrivals;
///    the energy of every further arrival goes to the destination cell.
///
/// All tokens are taken off their cells. The returned arrivals are ordered
/// by destination cell, then by arrival.
///
/// ### Parameters
/// - `cluster` - Cluster whose tokens move; cell energies receive the
///   energy of dissolved and rejected tokens.
/// - `params` - Provides the branch number cycle and the cell capacity.
pub fn routing_phase(cluster: &mut Cluster, params: &SimulationParameters) -> Vec<Arrival> {
    let mut candidates = Vec::new();
    for index in 0..cluster.cells.len() {
        let tokens = std::mem::take(&mut cluster.cells[index].tokens);
        if tokens.is_empty() {
            continue;
        }
        let next = successors(&cluster.cells, index, params.cell_max_token_branch_number);
        for token in tokens {
            if next.is_empty() {
                cluster.cells[index].energy += token.energy;
                continue;
            }
            for (&cell, token) in next.iter().zip(token.split(next.len())) {
                candidates.push(Arrival {
                    cell,
                    previous: index,
                    token,
                });
            }
        }
    }

    let mut load = vec![0usize; cluster.cells.len()];
    let mut arrivals = Vec::with_capacity(candidates.len());
    for arrival in candidates {
        if load[arrival.cell] >= params.cell_max_tokens {
            debug!(
                cluster = cluster.id,
                cell = cluster.cells[arrival.cell].id,
                "token rejected by full cell"
            );
            cluster.cells[arrival.cell].energy += arrival.token.energy;
            continue;
        }
        load[arrival.cell] += 1;
        arrivals.push(arrival);
    }
    arrivals.sort_by_key(|a| a.cell);
    arrivals
}

/// Processes the arrived tokens of one cluster.
///
/// Tokens are handled one after another in arrival order, so a cell
/// memory written by one token is visible to the next. Cell energies are
/// not: every function sees the energies left by routing, and the energy of
/// consumed tokens is credited only once all arrivals are processed.
/// Kinematic requests are only recorded; the cluster's velocities stay
/// untouched. Tokens that survive are put back on their cell.
///
/// ### Parameters
/// - `cluster` - The cluster whose tokens are processed.
/// - `slot` - Slot of the cluster in `world`.
/// - `arrivals` - Output of [`routing_phase`] for this cluster.
/// - `kinematics` - Snapshot of the cluster taken before routing.
/// - `world` - Snapshot of all clusters taken before routing.
/// - `params` - Global parameters handed to the cell functions.
pub fn dispatch_phase(
    cluster: &mut Cluster,
    slot: usize,
    arrivals: Vec<Arrival>,
    kinematics: &ClusterKinematics,
    world: &WorldView,
    params: &SimulationParameters,
) -> ClusterDispatch {
    let mut out = ClusterDispatch {
        deltas: DeltaBuffer::with_len(cluster.cells.len()),
        ..ClusterDispatch::default()
    };
    let mut credits = vec![0.0f32; cluster.cells.len()];

    for Arrival {
        cell,
        previous,
        mut token,
    } in arrivals
    {
        let ctx = ProcessingContext {
            params,
            cluster: kinematics,
            cluster_slot: slot,
            cells: &cluster.cells,
            cell,
            previous: Some(previous),
            world,
        };
        let result = functions::dispatch(&mut token, &ctx);

        if let Some(code) = result.unrecognized_function {
            out.unrecognized.push((cell, code));
        }
        if let Some(delta) = result.delta {
            out.deltas.add(cell, delta);
        }
        let target = &mut cluster.cells[cell];
        if let Some(memory) = result.cell_memory {
            target.memory = memory;
        }
        let token_slot = if result.consume_token {
            credits[cell] += token.energy;
            None
        } else {
            target.tokens.push(token);
            Some(target.tokens.len() - 1)
        };
        out.transfers
            .extend(result.transfers.into_iter().map(|transfer| PendingTransfer {
                cluster: slot,
                cell,
                token: token_slot,
                transfer,
            }));
    }

    for (cell, credit) in cluster.cells.iter_mut().zip(credits) {
        cell.energy += credit;
    }
    out
}

/// Applies the collected requests and advances every cluster.
///
/// Returns the kinetic energy charged to cells, summed over clusters.
pub fn integration_phase(
    clusters: &mut [Cluster],
    dispatches: &[ClusterDispatch],
    params: &SimulationParameters,
    metric: &SpaceMetric,
) -> f64 {
    clusters
        .par_iter_mut()
        .zip(dispatches.par_iter())
        .map(|(cluster, dispatch)| {
            f64::from(physics::integrate(cluster, &dispatch.deltas, params, metric))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .sum()
}

/// Drains energy from weapon targets, in the order given.
///
/// A target never drops below `params.cell_min_energy`; what it can pay is
/// split in half between the firing cell and the firing token (the firing
/// cell takes both halves when the token is gone).
///
/// Returns the total energy drained.
pub fn transfer_phase(
    clusters: &mut [Cluster],
    transfers: &[PendingTransfer],
    params: &SimulationParameters,
) -> f64 {
    let mut drained = 0.0;
    for pending in transfers {
        let source = pending.transfer.source;
        let Some(target) = clusters
            .get_mut(source.cluster)
            .and_then(|c| c.cells.get_mut(source.cell))
        else {
            continue;
        };
        let actual = pending
            .transfer
            .amount
            .min(target.energy - params.cell_min_energy)
            .max(0.0);
        if actual <= 0.0 {
            continue;
        }
        target.energy -= actual;

        let firing = &mut clusters[pending.cluster].cells[pending.cell];
        let to_token = actual * 0.5;
        match pending.token.and_then(|slot| firing.tokens.get_mut(slot)) {
            Some(token) => {
                token.energy += to_token;
                firing.energy += actual - to_token;
            }
            None => firing.energy += actual,
        }
        drained += f64::from(actual);
    }
    drained
}

/// Lets cells shed energy as particles.
///
/// Each cell radiates with probability `params.radiation_probability`,
/// losing `params.radiation_factor` of its energy but never going below
/// `params.cell_min_energy`. The particle starts at the cell, moving with
/// the cluster plus a small random jitter.
///
/// Returns the total energy radiated.
pub fn radiation_phase(
    clusters: &mut [Cluster],
    particles: &mut ParticleSet,
    params: &SimulationParameters,
    rng: &mut impl Rng,
) -> f64 {
    if params.radiation_probability <= 0.0 {
        return 0.0;
    }
    let mut radiated = 0.0;
    for cluster in clusters.iter_mut() {
        for cell in &mut cluster.cells {
            if rng.random::<f32>() >= params.radiation_probability {
                continue;
            }
            let amount = (cell.energy * params.radiation_factor)
                .min(cell.energy - params.cell_min_energy);
            if amount <= 0.0 {
                continue;
            }
            cell.energy -= amount;
            let jitter = Vec2::new(rng.random_range(-0.5..0.5), rng.random_range(-0.5..0.5));
            particles.emit(cell.abs_pos, cluster.vel + jitter, amount);
            radiated += f64::from(amount);
        }
    }
    radiated
}
