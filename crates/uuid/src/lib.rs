//! Canonical identifiers and sharded-path utilities.
//!
//! Every entity in the vaccination records (schemes, dose records, clinics, patients, staff,
//! inventory items) is identified by a UUID. Identifiers use a *canonical* text form:
//! **32 lowercase hexadecimal characters** (no hyphens), the same value produced by
//! `Uuid::new_v4().simple().to_string()`.
//!
//! This crate provides:
//! - [`CanonicalUuid`], a wrapper that guarantees the canonical format once constructed.
//! - One newtype per entity kind ([`SchemeId`], [`DoseRecordId`], [`ClinicId`], [`PatientId`],
//!   [`UserId`], [`InventoryItemId`]) so identifiers of different kinds cannot be swapped.
//! - Sharding logic used by file-backed stores.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data lives under `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`, which keeps
//! the fan-out of any single directory small.

mod ids;

pub use ids::{
    CanonicalUuid, ClinicId, DoseRecordId, InventoryItemId, PatientId, SchemeId, Uuid, UserId,
};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
