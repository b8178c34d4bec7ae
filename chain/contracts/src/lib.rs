//! Fractional Vault, Escrow Auction and Stake Reward Contracts
//!
//! Three cooperating ledgers over pluggable token and asset boundaries:
//! non-fungible assets are locked into vaults for fungible claim tokens,
//! auctions escrow cumulative bids, and a share of every settled auction
//! is distributed to stakers pro rata.
//!
//! # Modules
//! - `errors`: Contract-specific error types
//! - `events`: Records emitted by successful operations
//! - `security`: Reentrancy guard, capability checks and role-based access control
//! - `config`: Serde configuration for all three contracts
//! - `ledger`: Fungible token boundary and in-memory ledger
//! - `registry`: Non-fungible asset boundary and in-memory registry
//! - `vault`: Two-phase vault fractionalization
//! - `auction`: Ascending auctions with accumulated escrow
//! - `stake`: Proportional reward distribution to stakers
//!
//! # Version
//! v0.1.0

pub mod auction;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod security;
pub mod stake;
pub mod vault;

pub use auction::{Auction, AuctionHouse, AuctionStatus};
pub use config::LedgerConfig;
pub use ledger::{FungibleLedger, InMemoryLedger};
pub use registry::{AssetRegistry, InMemoryAssetRegistry};
pub use security::{AccessControl, Action, Authorizer, Role};
pub use stake::{RewardSink, StakeLedger, StakePosition};
pub use vault::{MintRequest, Vault, VaultRegistry};

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
