use thiserror::Error;

use crate::types::{CellId, ClusterId};

/// Structural defects of a cluster description.
///
/// Each error rejects only the cluster it names; the rest of the
/// description is loaded and stepped normally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DescriptionError {
    #[error("cluster {cluster} has no cells")]
    EmptyCluster { cluster: ClusterId },

    #[error("cluster {cluster} contains cell id {cell} more than once")]
    DuplicateCell { cluster: ClusterId, cell: CellId },

    #[error("cell {cell} of cluster {cluster} is connected to unknown cell {target}")]
    UnknownConnection {
        cluster: ClusterId,
        cell: CellId,
        target: CellId,
    },

    #[error("cluster {cluster} has a non-finite or negative value in `{field}`")]
    InvalidValue {
        cluster: ClusterId,
        field: &'static str,
    },

    #[error("cluster id {cluster} appears more than once")]
    DuplicateCluster { cluster: ClusterId },
}

impl DescriptionError {
    pub fn cluster(&self) -> ClusterId {
        match self {
            Self::EmptyCluster { cluster }
            | Self::DuplicateCell { cluster, .. }
            | Self::UnknownConnection { cluster, .. }
            | Self::InvalidValue { cluster, .. }
            | Self::DuplicateCluster { cluster } => *cluster,
        }
    }
}
