//! # Vax Core
//!
//! Core business logic for clinic vaccination scheduling.
//!
//! This crate contains the scheduling rules and their persistence seams:
//! - Vaccine scheme definitions with per-dose month offsets
//! - Dose registration that projects when the next dose is due
//! - Pending-dose computation per patient and overdue detection per clinic
//! - In-memory and sharded YAML stores under `VAX_DATA_DIR`
//!
//! **No transport concerns**: authentication, tenant resolution and HTTP routing belong to the
//! embedding application. Every operation takes the clinic id explicitly.

pub mod clock;
pub mod config;
pub mod constants;
pub mod dose;
pub mod engine;
mod error;
pub mod report;
pub mod repositories;
pub mod schedule;
pub mod scheme;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CoreConfig, DoseUniqueness};
pub use dose::{DoseRecord, DoseRegistration};
pub use engine::DoseScheduleEngine;
pub use error::{VaccinationError, VaccinationResult};
pub use report::{HistoryEntry, OverdueDose, PendingDose, VaccinationHistory};
pub use scheme::{NewScheme, SchemePatch, VaccineScheme};

pub use vax_types::{LotNumber, SchemeName, TextError};
pub use vax_uuid::{ClinicId, DoseRecordId, InventoryItemId, PatientId, SchemeId, UserId};
