/// Identifier of a cluster, stable across steps and descriptions.
pub type ClusterId = u64;

/// Identifier of a cell, stable across steps and descriptions.
pub type CellId = u64;

/// Identifier of an energy particle.
pub type ParticleId = u64;

/// Index of a cell inside its cluster's cell arena.
///
/// This is only meaningful within the lifetime of a given
/// [`crate::cluster::Cluster`]; connections between cells are stored as
/// `CellIndex` values.
pub type CellIndex = usize;
