//! Contract configuration
//!
//! Plain serde structs with defaults. A full [`LedgerConfig`] can be loaded
//! from JSON; omitted sections and fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use types::fee::FeeSplit;
use types::ids::{AccountId, TokenId};

use crate::errors::ConfigError;

/// Who may finalize a pending mint request.
///
/// Observed deployments let the requester approve their own request, which
/// defeats the purpose of a discretionary approval gate. The rule is left to
/// configuration instead of being hard-coded either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Only the account that filed the request
    Requester,
    /// Only holders of the `ApproveMint` capability
    Administrator,
    /// Either of the above (observed behaviour)
    #[default]
    RequesterOrAdministrator,
}

/// What happens to a reward deposited while nothing is staked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPoolPolicy {
    /// Fail the deposit with `NoStakers`
    Reject,
    /// Hold it and distribute once stake exists
    #[default]
    Defer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Asset units a vault's allocation is divided over, unless overridden
    /// per vault.
    pub default_cardinality: u64,
    pub approval_policy: ApprovalPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_cardinality: 100,
            approval_policy: ApprovalPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    /// Token bids are paid in
    pub payment_token: TokenId,
    pub fees: FeeSplit,
    /// Receives the protocol fee; without one the fee stays with the seller
    pub fee_recipient: Option<AccountId>,
    /// Allow the seller or an admin to end before `end_time`
    pub allow_early_end: bool,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            payment_token: TokenId::from("ETH"),
            fees: FeeSplit::default(),
            fee_recipient: None,
            allow_early_end: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    pub stake_token: TokenId,
    pub reward_token: TokenId,
    pub empty_pool_policy: EmptyPoolPolicy,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            stake_token: TokenId::from("FTX"),
            reward_token: TokenId::from("ETH"),
            empty_pool_policy: EmptyPoolPolicy::default(),
        }
    }
}

/// Configuration for all three contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub vault: VaultConfig,
    pub auction: AuctionConfig,
    pub stake: StakeConfig,
}

impl LedgerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault.default_cardinality == 0 {
            return Err(ConfigError::InvalidCardinality);
        }
        self.auction.fees.validate()?;
        // Settlement forwards the reward share straight into the stake pool.
        if self.auction.payment_token != self.stake.reward_token {
            return Err(ConfigError::RewardTokenMismatch {
                payment: self.auction.payment_token.clone(),
                reward: self.stake.reward_token.clone(),
            });
        }
        Ok(())
    }
}
