//! Nullable infrastructure for deterministic testing.
//!
//! The wallet and the contract are external collaborators. This crate
//! provides in-memory stand-ins for both that:
//! - Return deterministic values
//! - Can be controlled programmatically (scripted failures, held calls)
//! - Record every call for assertions
//! - Never touch the network
//!
//! Usage: swap the HTTP provider and the RPC gateway for nullables in tests.

pub mod contract;
pub mod gate;
pub mod wallet;

pub use contract::NullContract;
pub use gate::HeldCall;
pub use wallet::NullWallet;
