//! Data models for the appointment console.
//!
//! - `Cita`: an appointment record as stored in the remote table
//! - `CitaStatus`: the status column's enumerated values
//! - `CitaFilter`: optional exact-match filters applied to a load
//! - `Stats`: summary counters derived from the current snapshot

pub mod cita;

pub use cita::{Cita, CitaFilter, CitaStatus, Stats};
