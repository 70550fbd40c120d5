//! Core of the ballot client.
//!
//! Mirrors the election contract into a consistent, versioned [`Snapshot`]
//! and drives user-initiated writes through a submit → pending →
//! confirmed/failed lifecycle:
//! - [`Synchronizer`] builds snapshots from independent reads, absorbing
//!   per-field failures
//! - [`SnapshotStore`] publishes only the newest snapshot of the current context
//! - [`Visibility`] and [`View`] derive everything the UI shows, purely from a snapshot
//! - [`Orchestrator`] runs one mutating action end to end
//! - [`Controller`] ties them to the wallet's account and chain notifications

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod snapshot;
pub mod sync;
pub mod view;
pub mod visibility;

pub use config::ClientConfig;
pub use controller::{Controller, SyncOutcome};
pub use error::{ClientError, ErrorKind};
pub use orchestrator::{Action, Orchestrator, Resync, TxEvent, TxState};
pub use snapshot::{CandidateEntry, ReadFailure, Snapshot, SnapshotStore};
pub use sync::Synchronizer;
pub use view::View;
pub use visibility::{VoteButton, Visibility};
