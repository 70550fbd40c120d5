//! Wallet connection layer for the ballot client.
//!
//! Provides everything needed to act on behalf of an account:
//! - The [`WalletProvider`] abstraction over an EIP-1193 style wallet
//! - An HTTP JSON-RPC provider with polled account/chain change notifications
//! - The [`ConnectionManager`], which owns the single active [`SessionContext`]
//!   and replaces it atomically on account or network changes

pub mod connection;
pub mod error;
pub mod http;
pub mod provider;
pub mod session;

pub use connection::{ConnectionEvent, ConnectionManager};
pub use error::{ProviderError, ProviderErrorKind, WalletError};
pub use http::HttpWalletProvider;
pub use provider::{TransactionRequest, WalletProvider};
pub use session::{SessionContext, SigningContext};
