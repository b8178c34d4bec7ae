//! Contract events
//!
//! Events are immutable records emitted by successful contract operations.
//! Failed operations never emit.

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, AssetId, AuctionId, CollectionId, RequestId, TokenId, VaultId};
use types::numeric::Amount;

/// New fractionalization vault registered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCreated {
    pub vault_id: VaultId,
    pub fraction_token: TokenId,
    pub collection: CollectionId,
    pub allocation: Amount,
    pub cardinality: u64,
}

/// Mint request validated and recorded (assets not moved yet)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequested {
    pub request_id: RequestId,
    pub vault_id: VaultId,
    pub requester: AccountId,
    pub asset_ids: Vec<AssetId>,
}

/// Mint request finalized: assets in custody, claim tokens minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintApproved {
    pub request_id: RequestId,
    pub vault_id: VaultId,
    pub requester: AccountId,
    pub approver: AccountId,
    pub asset_ids: Vec<AssetId>,
    pub claim_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionStarted {
    pub auction_id: AuctionId,
    pub seller: AccountId,
    pub starting_bid: Amount,
    pub end_time: i64,
}

/// Bid accepted; `total` is the bidder's cumulative contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidPlaced {
    pub auction_id: AuctionId,
    pub bidder: AccountId,
    pub amount: Amount,
    pub total: Amount,
}

/// Auction settled; amounts are zero when nobody bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionEnded {
    pub auction_id: AuctionId,
    pub winner: Option<AccountId>,
    pub highest_bid: Amount,
    pub protocol_fee: Amount,
    pub reward: Amount,
    pub seller_proceeds: Amount,
}

/// Losing bidder pulled their escrowed contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionWithdrawn {
    pub auction_id: AuctionId,
    pub bidder: AccountId,
    pub amount: Amount,
}

/// Settlement payout the ledger refused; held in escrow for `claim_proceeds`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceedsDeferred {
    pub auction_id: AuctionId,
    pub recipient: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceedsClaimed {
    pub recipient: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staked {
    pub staker: AccountId,
    pub amount: Amount,
    pub total_staked: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unstaked {
    pub staker: AccountId,
    pub amount: Amount,
    pub total_staked: Amount,
}

/// Reward received; `deferred` when it is held until stake exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDeposited {
    pub depositor: AccountId,
    pub amount: Amount,
    pub acc_reward_per_share: u128,
    pub deferred: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardWithdrawn {
    pub staker: AccountId,
    pub amount: Amount,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    VaultCreated(VaultCreated),
    MintRequested(MintRequested),
    MintApproved(MintApproved),
    AuctionStarted(AuctionStarted),
    BidPlaced(BidPlaced),
    AuctionEnded(AuctionEnded),
    ContributionWithdrawn(ContributionWithdrawn),
    ProceedsDeferred(ProceedsDeferred),
    ProceedsClaimed(ProceedsClaimed),
    Staked(Staked),
    Unstaked(Unstaked),
    RewardDeposited(RewardDeposited),
    RewardWithdrawn(RewardWithdrawn),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auction_ended_serialization() {
        let event = ContractEvent::AuctionEnded(AuctionEnded {
            auction_id: AuctionId::FIRST,
            winner: Some(AccountId::new()),
            highest_bid: 350_000_000_000_000_000,
            protocol_fee: 8_750_000_000_000_000,
            reward: 35_000_000_000_000_000,
            seller_proceeds: 306_250_000_000_000_000,
        });
        let json = serde_json::to_string(&event).unwrap();
        let deser: ContractEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_mint_requested_serialization() {
        let event = MintRequested {
            request_id: RequestId::FIRST,
            vault_id: VaultId::FIRST,
            requester: AccountId::new(),
            asset_ids: vec![AssetId::new(1), AssetId::new(2)],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"asset_ids\":[1,2]"));
        let deser: MintRequested = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_contract_event_enum_variant() {
        let event = ContractEvent::Staked(Staked {
            staker: AccountId::new(),
            amount: 500,
            total_staked: 500,
        });
        assert!(matches!(event, ContractEvent::Staked(_)));
    }
}
