//! Settlement fee splitting
//!
//! Auction proceeds are divided in basis points between a protocol fee
//! recipient, the staking reward sink, and the seller. The seller receives
//! the remainder, so truncation dust always lands with the seller.

use serde::{Deserialize, Serialize};

use crate::errors::FeeError;
use crate::numeric::{mul_div, Amount};

/// 100% expressed in basis points
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Basis-point shares carved out of a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub protocol_fee_bps: u16,
    pub reward_share_bps: u16,
}

/// Concrete amounts produced by [`FeeSplit::split`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitAmounts {
    pub protocol_fee: Amount,
    pub reward: Amount,
    pub seller: Amount,
}

impl FeeSplit {
    pub fn new(protocol_fee_bps: u16, reward_share_bps: u16) -> Result<Self, FeeError> {
        let split = Self {
            protocol_fee_bps,
            reward_share_bps,
        };
        split.validate()?;
        Ok(split)
    }

    /// Both shares together may not exceed 100%.
    pub fn validate(&self) -> Result<(), FeeError> {
        let total_bps = u32::from(self.protocol_fee_bps) + u32::from(self.reward_share_bps);
        if total_bps > BPS_DENOMINATOR {
            return Err(FeeError::SharesExceedTotal { total_bps });
        }
        Ok(())
    }

    /// Divide `amount`; `protocol_fee + reward + seller == amount` always holds.
    pub fn split(&self, amount: Amount) -> Result<SplitAmounts, FeeError> {
        self.validate()?;
        let denominator = Amount::from(BPS_DENOMINATOR);
        let protocol_fee = mul_div(amount, Amount::from(self.protocol_fee_bps), denominator)?;
        let reward = mul_div(amount, Amount::from(self.reward_share_bps), denominator)?;
        let seller = amount - protocol_fee - reward;
        Ok(SplitAmounts {
            protocol_fee,
            reward,
            seller,
        })
    }
}

impl Default for FeeSplit {
    /// 2.5% protocol fee, 10% to stakers
    fn default() -> Self {
        Self {
            protocol_fee_bps: 250,
            reward_share_bps: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_split() {
        let split = FeeSplit::default().split(10_000).unwrap();
        assert_eq!(split.protocol_fee, 250);
        assert_eq!(split.reward, 1_000);
        assert_eq!(split.seller, 8_750);
    }

    #[test]
    fn test_split_dust_goes_to_seller() {
        let split = FeeSplit::new(3_333, 3_333).unwrap().split(10).unwrap();
        assert_eq!(split.protocol_fee, 3);
        assert_eq!(split.reward, 3);
        assert_eq!(split.seller, 4);
    }

    #[test]
    fn test_zero_shares() {
        let split = FeeSplit::new(0, 0).unwrap().split(42).unwrap();
        assert_eq!(split.seller, 42);
    }

    #[test]
    fn test_shares_over_total_rejected() {
        assert_eq!(
            FeeSplit::new(6_000, 5_000),
            Err(FeeError::SharesExceedTotal { total_bps: 11_000 })
        );
    }

    #[test]
    fn test_split_is_conservative_for_large_amounts() {
        let amount = 350_000_000_000_000_000u128;
        let split = FeeSplit::default().split(amount).unwrap();
        assert_eq!(split.protocol_fee + split.reward + split.seller, amount);
    }
}
