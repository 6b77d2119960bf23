//! Error types shared by the assembly and reachability subsystems.

use crate::assembly::NodeKey;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown element key: {0}")]
    UnknownKey(NodeKey),

    #[error("Element {0} has no open connector")]
    NoOpenConnector(NodeKey),

    #[error("Invalid flip code: {0:?} (expected AA, AB, BA or BB)")]
    InvalidFlip(String),

    #[error("Invalid unit index: {0} (expected 0 or 1)")]
    InvalidUnitIndex(usize),

    #[error("Second unit of a module needs a module-mate placed before it")]
    MissingModuleMate,

    #[error("Reachability resolution must be positive, got {0}")]
    InvalidResolution(f32),

    #[error("Point set is empty: {0}")]
    EmptyPointSet(&'static str),

    #[error("Support footprint needs at least 3 vertices, got {0}")]
    DegenerateFootprint(usize),

    #[error("No reachability dataset loaded")]
    NoDataset,

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
