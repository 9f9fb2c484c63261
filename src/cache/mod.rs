//! Offline shell cache.
//!
//! Mirrors the dashboard's static assets into a versioned on-disk store so
//! the shell stays available without a network connection:
//!
//! - `AssetStore`: one directory per cache version, one body file plus a
//!   JSON metadata sidecar per asset
//! - `ShellWorker`: the install/activate lifecycle and the fetch gateway
//!   (database traffic bypass, cache-first, offline fallback)
//!
//! The worker runs on its own task and shares no state with the rest of the
//! app; everything goes through its command channel.

pub mod store;
pub mod worker;

pub use store::{AssetStore, CachedAsset};
pub use worker::{FetchOutcome, ShellWorker, WorkerCommand, WorkerState};
