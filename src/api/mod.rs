//! REST client for the hosted appointment database.
//!
//! This module provides the `ApiClient` for talking to the PostgREST-style
//! data endpoint (`/rest/v1/citas`) and its companion auth endpoint
//! (`/auth/v1`). Reads use filtered, ordered selects; writes are restricted
//! to single-record status updates and deletes.
//!
//! Requests carry the project API key; once an admin is signed in, their
//! access token replaces the key as the bearer credential.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
