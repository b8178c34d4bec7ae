//! Contract-specific error types
//!
//! Error taxonomy for the vault registry, auction house and stake ledger,
//! plus the failures surfaced by the external token and asset boundaries.
//! Every error is a rejected operation; none leaves partial state behind.

use thiserror::Error;
use types::errors::{FeeError, NumericError};
use types::ids::{AccountId, AssetId, AuctionId, CollectionId, TokenId, VaultId};

/// Failures reported by a [`FungibleLedger`](crate::ledger::FungibleLedger)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Unknown token: {token}")]
    UnknownToken { token: TokenId },

    #[error("Insufficient balance of {token}: required {required}, available {available}")]
    InsufficientBalance {
        token: TokenId,
        required: u128,
        available: u128,
    },

    #[error("Insufficient allowance of {token}: required {required}, approved {approved}")]
    InsufficientAllowance {
        token: TokenId,
        required: u128,
        approved: u128,
    },

    #[error("Caller {caller} may not mint {token}")]
    NotMinter { token: TokenId, caller: AccountId },

    #[error("Arithmetic overflow in token balance")]
    Overflow,
}

/// Failures reported by an [`AssetRegistry`](crate::registry::AssetRegistry)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Asset {asset_id} does not exist in {collection}")]
    UnknownAsset {
        collection: CollectionId,
        asset_id: AssetId,
    },

    #[error("Caller {caller} is not owner nor approved for asset {asset_id} in {collection}")]
    NotOwnerNorApproved {
        collection: CollectionId,
        asset_id: AssetId,
        caller: AccountId,
    },
}

/// Vault registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Unauthorized: caller lacks the required capability")]
    Unauthorized,

    #[error("Unknown vault: {vault_id}")]
    UnknownVault { vault_id: VaultId },

    #[error("Caller is not token owner nor approved for asset {asset_id}")]
    NotAssetOwner { asset_id: AssetId },

    #[error("No pending mint request for vault {vault_id} with the given assets")]
    RequestNotFound { vault_id: VaultId },

    #[error("Mint request already approved")]
    AlreadyApproved,

    #[error("Requester already has a pending request on vault {vault_id}")]
    RequestPending { vault_id: VaultId },

    #[error("Asset {asset_id} is already part of a pending request")]
    AssetAlreadyRequested { asset_id: AssetId },

    #[error("Mint request must name at least one distinct asset")]
    EmptyRequest,

    #[error("Vault allocation and cardinality must be positive")]
    InvalidAllocation,

    #[error("Vault {vault_id} capacity exceeded: {locked} locked, {requested} requested, capacity {capacity}")]
    CapacityExceeded {
        vault_id: VaultId,
        locked: u64,
        requested: u64,
        capacity: u64,
    },

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Counter exhausted")]
    IdsExhausted,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] NumericError),
}

/// Stake ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StakeError {
    #[error("Stake amount must be positive")]
    InvalidAmount,

    #[error("Unauthorized: caller is not a reward depositor")]
    Unauthorized,

    #[error("No reward")]
    NoReward,

    #[error("Insufficient stake: requested {requested}, staked {staked}")]
    InsufficientStake { requested: u128, staked: u128 },

    #[error("Reward deposit rejected: nothing is staked")]
    NoStakers,

    #[error("Arithmetic overflow in reward accounting")]
    Overflow,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Auction house errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    #[error("Unauthorized: caller may not manage auction")]
    Unauthorized,

    #[error("Auction not found: {auction_id}")]
    AuctionNotFound { auction_id: AuctionId },

    #[error("Auction already ended")]
    AlreadyEnded,

    #[error("Amount is low: cumulative bid {total} does not exceed highest bid {highest_bid}")]
    BidTooLow { total: u128, highest_bid: u128 },

    #[error("Auction bidding closed at {end_time}")]
    AuctionExpired { end_time: i64 },

    #[error("Auction still open until {end_time}")]
    AuctionStillOpen { end_time: i64 },

    #[error("Auction duration must be positive")]
    InvalidDuration,

    #[error("Bid amount must be positive")]
    InvalidAmount,

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Arithmetic overflow in escrow accounting")]
    Overflow,

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Counter exhausted")]
    IdsExhausted,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Stake error: {0}")]
    Stake(#[from] StakeError),

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),
}

/// Configuration loading and validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {message}")]
    Parse { message: String },

    #[error("Vault cardinality must be positive")]
    InvalidCardinality,

    #[error("Auction pays in {payment} but stakers are rewarded in {reward}")]
    RewardTokenMismatch { payment: TokenId, reward: TokenId },

    #[error("Fee error: {0}")]
    Fee(#[from] FeeError),
}
