//! Fatal contract violations raised while updating a unit.

use thiserror::Error;

use crate::UnitId;

/// Broken invariants that abort a unit update.
///
/// Missing paths, vanished targets, absent scripts and blocked moves are
/// ordinary control flow and never surface here.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// A weapon slot index outside the three fixed mounts was used.
    #[error("invalid weapon slot index {index}")]
    InvalidWeaponSlot {
        /// Offending index.
        index: u32,
    },
    /// A synchronous script query suspended instead of finishing.
    #[error("synchronous query `{script}` on unit {} blocked before completion", unit.get())]
    QueryBlocked {
        /// Unit whose script environment ran the query.
        unit: UnitId,
        /// Name of the query script.
        script: String,
    },
    /// A script referenced a model piece the unit does not have.
    #[error("unit {} has no model piece {piece}", unit.get())]
    UnknownPiece {
        /// Unit whose script referenced the piece.
        unit: UnitId,
        /// Piece index returned by the script.
        piece: i32,
    },
}
