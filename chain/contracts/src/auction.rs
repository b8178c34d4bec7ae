//! Auction House: ascending auctions with accumulated escrow
//!
//! Lifecycle per auction: `start → Open → (bid)* → end → Ended`.
//!
//! Bids are cumulative: a bidder tops up their own contribution and the new
//! total must strictly exceed the current highest bid. Outbid parties are
//! never refunded during bidding, so no recipient can block the next bid.
//! After settlement losers pull their contribution back with `withdraw`.
//!
//! Settlement splits the winning bid between the protocol fee recipient,
//! the stake ledger (as a reward deposit) and the seller. The winner's
//! contribution is consumed by settlement.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::fee::SplitAmounts;
use types::ids::{AccountId, AuctionId};
use types::numeric::Amount;

use crate::config::AuctionConfig;
use crate::errors::{AuctionError, TokenError};
use crate::events::{
    AuctionEnded, AuctionStarted, BidPlaced, ContractEvent, ContributionWithdrawn, ProceedsClaimed,
    ProceedsDeferred,
};
use crate::ledger::FungibleLedger;
use crate::security::{AccessControl, Action, Authorizer, ReentrancyGuard};
use crate::stake::RewardSink;

/// Auction state. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    Open,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    pub seller: AccountId,
    pub starting_bid: Amount,
    /// `None` until the first accepted bid
    pub highest_bidder: Option<AccountId>,
    /// Starting bid until someone bids, then the leader's cumulative contribution
    pub highest_bid: Amount,
    pub start_time: i64,
    pub end_time: i64,
    pub status: AuctionStatus,
    /// How the winning bid was paid out, once ended
    pub settlement: Option<SplitAmounts>,
}

impl Auction {
    pub fn is_ended(&self) -> bool {
        self.status == AuctionStatus::Ended
    }
}

/// Runs any number of concurrent auctions paid in a single token.
#[derive(Debug)]
pub struct AuctionHouse<A = AccessControl> {
    config: AuctionConfig,
    /// Holds every bidder's contribution until settlement or withdrawal
    escrow: AccountId,
    auctions: BTreeMap<AuctionId, Auction>,
    /// (auction, bidder) -> cumulative escrowed amount
    contributions: HashMap<(AuctionId, AccountId), Amount>,
    /// Fee or seller payouts the ledger refused at settlement
    unclaimed: HashMap<AccountId, Amount>,
    next_id: AuctionId,
    reentrancy_guard: ReentrancyGuard,
    authorizer: A,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl AuctionHouse<AccessControl> {
    pub fn new(admin: AccountId, config: AuctionConfig) -> Self {
        Self::with_authorizer(config, AccessControl::new(admin))
    }
}

impl<A: Authorizer> AuctionHouse<A> {
    pub fn with_authorizer(config: AuctionConfig, authorizer: A) -> Self {
        let escrow = AccountId::new();
        info!(
            %escrow,
            payment_token = %config.payment_token,
            protocol_fee_bps = config.fees.protocol_fee_bps,
            reward_share_bps = config.fees.reward_share_bps,
            "AuctionHouse initialized"
        );
        Self {
            config,
            escrow,
            auctions: BTreeMap::new(),
            contributions: HashMap::new(),
            unclaimed: HashMap::new(),
            next_id: AuctionId::FIRST,
            reentrancy_guard: ReentrancyGuard::new(),
            authorizer,
            events: Vec::new(),
        }
    }

    // ───────────────────────── Start ─────────────────────────

    /// Open a new auction sold by `seller`, bidding above `starting_bid`
    /// until `now + duration_seconds`.
    pub fn start(
        &mut self,
        seller: AccountId,
        starting_bid: Amount,
        duration_seconds: i64,
        now: i64,
    ) -> Result<AuctionId, AuctionError> {
        if !self.authorizer.is_authorized(&seller, Action::StartAuction) {
            warn!(%seller, "Rejected auction start from unauthorized account");
            return Err(AuctionError::Unauthorized);
        }
        if duration_seconds <= 0 {
            return Err(AuctionError::InvalidDuration);
        }
        let end_time = now
            .checked_add(duration_seconds)
            .ok_or(AuctionError::Overflow)?;
        let id = self.next_id;
        self.next_id = id.next().ok_or(AuctionError::IdsExhausted)?;

        self.auctions.insert(
            id,
            Auction {
                id,
                seller,
                starting_bid,
                highest_bidder: None,
                highest_bid: starting_bid,
                start_time: now,
                end_time,
                status: AuctionStatus::Open,
                settlement: None,
            },
        );

        info!(auction_id = %id, %seller, starting_bid, end_time, "Auction started");
        self.emit(ContractEvent::AuctionStarted(AuctionStarted {
            auction_id: id,
            seller,
            starting_bid,
            end_time,
        }));
        Ok(id)
    }

    // ───────────────────────── Bid ─────────────────────────

    /// Add `amount` to `bidder`'s contribution. The payment moves from the
    /// bidder into escrow and stays there until settlement or withdrawal.
    pub fn bid(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        amount: Amount,
        now: i64,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        if amount == 0 {
            return Err(AuctionError::InvalidAmount);
        }
        self.check_reentrancy()?;
        let result = self.bid_inner(auction_id, bidder, amount, now, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn bid_inner(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        amount: Amount,
        now: i64,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        let auction = self.open_auction(auction_id)?;
        if now >= auction.end_time {
            return Err(AuctionError::AuctionExpired {
                end_time: auction.end_time,
            });
        }

        let key = (auction_id, bidder);
        let previous = self.contributions.get(&key).copied();
        let total = previous
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(AuctionError::Overflow)?;
        if total <= auction.highest_bid {
            return Err(AuctionError::BidTooLow {
                total,
                highest_bid: auction.highest_bid,
            });
        }

        let snapshot = auction.clone();
        self.contributions.insert(key, total);
        let auction = self.auction_mut(auction_id)?;
        auction.highest_bidder = Some(bidder);
        auction.highest_bid = total;

        let transfer = ledger.transfer(&self.config.payment_token, &bidder, &self.escrow, amount);
        if let Err(e) = transfer {
            match previous {
                Some(prev) => self.contributions.insert(key, prev),
                None => self.contributions.remove(&key),
            };
            self.auctions.insert(auction_id, snapshot);
            return Err(e.into());
        }

        debug!(auction_id = %auction_id, %bidder, amount, total, "Bid placed");
        Ok(self.emit(ContractEvent::BidPlaced(BidPlaced {
            auction_id,
            bidder,
            amount,
            total,
        })))
    }

    // ───────────────────────── End ─────────────────────────

    /// Close the auction and pay out the winning bid.
    ///
    /// Callable by the seller or an account holding `EndAuction`. Before
    /// `end_time` only if early ending is configured. With no bids nothing
    /// moves. Fails without effect if the reward sink rejects the deposit.
    /// Once the reward is deposited the auction is final: a fee or seller
    /// payout the ledger refuses stays in escrow for `claim_proceeds`.
    pub fn end(
        &mut self,
        auction_id: AuctionId,
        caller: AccountId,
        now: i64,
        ledger: &mut dyn FungibleLedger,
        rewards: &mut dyn RewardSink,
    ) -> Result<ContractEvent, AuctionError> {
        let auction = self.open_auction(auction_id)?;
        if caller != auction.seller && !self.authorizer.is_authorized(&caller, Action::EndAuction) {
            warn!(auction_id = %auction_id, %caller, "Rejected auction end from unauthorized account");
            return Err(AuctionError::Unauthorized);
        }
        if now < auction.end_time && !self.config.allow_early_end {
            return Err(AuctionError::AuctionStillOpen {
                end_time: auction.end_time,
            });
        }
        self.check_reentrancy()?;
        let result = self.end_inner(auction_id, ledger, rewards);
        self.reentrancy_guard.release();
        result
    }

    fn end_inner(
        &mut self,
        auction_id: AuctionId,
        ledger: &mut dyn FungibleLedger,
        rewards: &mut dyn RewardSink,
    ) -> Result<ContractEvent, AuctionError> {
        let snapshot = self.open_auction(auction_id)?.clone();
        let mut split = match snapshot.highest_bidder {
            Some(_) => self.config.fees.split(snapshot.highest_bid)?,
            None => SplitAmounts {
                protocol_fee: 0,
                reward: 0,
                seller: 0,
            },
        };
        if self.config.fee_recipient.is_none() {
            split.seller += split.protocol_fee;
            split.protocol_fee = 0;
        }

        let token = self.config.payment_token.clone();
        if split.seller + split.protocol_fee + split.reward > 0 {
            let held = ledger.balance_of(&token, &self.escrow);
            if held < snapshot.highest_bid {
                return Err(AuctionError::Token(TokenError::InsufficientBalance {
                    token,
                    required: snapshot.highest_bid,
                    available: held,
                }));
            }
        }

        let winner_key = snapshot.highest_bidder.map(|winner| (auction_id, winner));
        let winning_contribution = winner_key.and_then(|key| self.contributions.get(&key).copied());

        let auction = self.auction_mut(auction_id)?;
        auction.status = AuctionStatus::Ended;
        auction.settlement = Some(split);
        if let Some(key) = winner_key {
            self.contributions.insert(key, 0);
        }

        // Only leg allowed to abort settlement; nothing has moved yet
        if split.reward > 0 {
            if let Err(e) = rewards.deposit_reward(self.escrow, split.reward, ledger) {
                self.auctions.insert(auction_id, snapshot);
                if let (Some(key), Some(amount)) = (winner_key, winning_contribution) {
                    self.contributions.insert(key, amount);
                }
                return Err(e.into());
            }
        }

        // The auction is final from here on; refused payouts become claimable
        if let Some(recipient) = self.config.fee_recipient {
            self.pay_or_defer(auction_id, recipient, split.protocol_fee, ledger);
        }
        self.pay_or_defer(auction_id, snapshot.seller, split.seller, ledger);

        info!(
            auction_id = %auction_id,
            winner = ?snapshot.highest_bidder,
            highest_bid = snapshot.highest_bid,
            protocol_fee = split.protocol_fee,
            reward = split.reward,
            seller_proceeds = split.seller,
            "Auction ended"
        );
        Ok(self.emit(ContractEvent::AuctionEnded(AuctionEnded {
            auction_id,
            winner: snapshot.highest_bidder,
            highest_bid: if snapshot.highest_bidder.is_some() {
                snapshot.highest_bid
            } else {
                0
            },
            protocol_fee: split.protocol_fee,
            reward: split.reward,
            seller_proceeds: split.seller,
        })))
    }

    fn pay_or_defer(
        &mut self,
        auction_id: AuctionId,
        recipient: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) {
        if amount == 0 {
            return;
        }
        let transfer = ledger.transfer(&self.config.payment_token, &self.escrow, &recipient, amount);
        if let Err(e) = transfer {
            warn!(auction_id = %auction_id, %recipient, amount, error = %e, "Payout refused, proceeds deferred");
            // Bounded by the escrow balance, which is itself a u128
            let owed = self.unclaimed.entry(recipient).or_insert(0);
            *owed = owed.saturating_add(amount);
            self.emit(ContractEvent::ProceedsDeferred(ProceedsDeferred {
                auction_id,
                recipient,
                amount,
            }));
        }
    }

    // ───────────────────────── Claim ─────────────────────────

    /// Pay out settlement proceeds that were refused when the auction ended.
    pub fn claim_proceeds(
        &mut self,
        recipient: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        self.check_reentrancy()?;
        let result = self.claim_proceeds_inner(recipient, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn claim_proceeds_inner(
        &mut self,
        recipient: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        let amount = self.unclaimed_proceeds(&recipient);
        if amount == 0 {
            return Err(AuctionError::NothingToWithdraw);
        }

        self.unclaimed.remove(&recipient);
        let transfer = ledger.transfer(&self.config.payment_token, &self.escrow, &recipient, amount);
        if let Err(e) = transfer {
            self.unclaimed.insert(recipient, amount);
            return Err(e.into());
        }

        info!(%recipient, amount, "Proceeds claimed");
        Ok(self.emit(ContractEvent::ProceedsClaimed(ProceedsClaimed { recipient, amount })))
    }

    // ───────────────────────── Withdraw ─────────────────────────

    /// Return a losing bidder's escrowed contribution after the auction ended.
    pub fn withdraw(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        self.check_reentrancy()?;
        let result = self.withdraw_inner(auction_id, bidder, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn withdraw_inner(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, AuctionError> {
        let auction = self.find(auction_id)?;
        if !auction.is_ended() {
            return Err(AuctionError::AuctionStillOpen {
                end_time: auction.end_time,
            });
        }
        if auction.highest_bidder == Some(bidder) {
            return Err(AuctionError::NothingToWithdraw);
        }

        let key = (auction_id, bidder);
        let amount = self.contributions.get(&key).copied().unwrap_or(0);
        if amount == 0 {
            return Err(AuctionError::NothingToWithdraw);
        }

        self.contributions.insert(key, 0);
        let transfer = ledger.transfer(&self.config.payment_token, &self.escrow, &bidder, amount);
        if let Err(e) = transfer {
            self.contributions.insert(key, amount);
            return Err(e.into());
        }

        debug!(auction_id = %auction_id, %bidder, amount, "Contribution withdrawn");
        Ok(self.emit(ContractEvent::ContributionWithdrawn(ContributionWithdrawn {
            auction_id,
            bidder,
            amount,
        })))
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn auction(&self, auction_id: AuctionId) -> Option<&Auction> {
        self.auctions.get(&auction_id)
    }

    pub fn auctions(&self) -> impl Iterator<Item = &Auction> {
        self.auctions.values()
    }

    /// Number of auctions ever started.
    pub fn auction_count(&self) -> u64 {
        self.next_id.value() - 1
    }

    /// Settlement proceeds held in escrow for `recipient`.
    pub fn unclaimed_proceeds(&self, recipient: &AccountId) -> Amount {
        self.unclaimed.get(recipient).copied().unwrap_or(0)
    }

    /// Escrowed contribution of `bidder`; zero once withdrawn or settled.
    pub fn contribution(&self, auction_id: AuctionId, bidder: &AccountId) -> Amount {
        self.contributions
            .get(&(auction_id, *bidder))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero contributions to an auction.
    pub fn contributions(&self, auction_id: AuctionId) -> Vec<(AccountId, Amount)> {
        let mut entries: Vec<(AccountId, Amount)> = self
            .contributions
            .iter()
            .filter(|((id, _), amount)| *id == auction_id && **amount > 0)
            .map(|((_, bidder), amount)| (*bidder, *amount))
            .collect();
        entries.sort();
        entries
    }

    pub fn escrow_account(&self) -> AccountId {
        self.escrow
    }

    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    pub fn authorizer_mut(&mut self) -> &mut A {
        &mut self.authorizer
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Internal ─────────────────────────

    fn find(&self, auction_id: AuctionId) -> Result<&Auction, AuctionError> {
        self.auctions
            .get(&auction_id)
            .ok_or(AuctionError::AuctionNotFound { auction_id })
    }

    fn open_auction(&self, auction_id: AuctionId) -> Result<&Auction, AuctionError> {
        let auction = self.find(auction_id)?;
        if auction.is_ended() {
            return Err(AuctionError::AlreadyEnded);
        }
        Ok(auction)
    }

    fn auction_mut(&mut self, auction_id: AuctionId) -> Result<&mut Auction, AuctionError> {
        self.auctions
            .get_mut(&auction_id)
            .ok_or(AuctionError::AuctionNotFound { auction_id })
    }

    fn emit(&mut self, event: ContractEvent) -> ContractEvent {
        self.events.push(event.clone());
        event
    }

    fn check_reentrancy(&mut self) -> Result<(), AuctionError> {
        if !self.reentrancy_guard.acquire() {
            return Err(AuctionError::Reentrancy);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmptyPoolPolicy, StakeConfig};
    use crate::errors::StakeError;
    use crate::ledger::InMemoryLedger;
    use crate::security::Role;
    use crate::stake::StakeLedger;
    use proptest::prelude::*;
    use types::ids::TokenId;
    use types::numeric::parse_ether;

    const DAY: i64 = 86_400;
    const T0: i64 = 1_700_000_000;

    struct Fixture {
        house: AuctionHouse,
        stake: StakeLedger,
        ledger: InMemoryLedger,
        admin: AccountId,
    }

    fn eth(s: &str) -> Amount {
        parse_ether(s).unwrap()
    }

    fn setup() -> Fixture {
        setup_with(AuctionConfig::default(), StakeConfig::default())
    }

    fn setup_with(config: AuctionConfig, stake_config: StakeConfig) -> Fixture {
        let admin = AccountId::new();
        let house = AuctionHouse::new(admin, config);
        let mut stake = StakeLedger::new(admin, stake_config.clone());
        stake
            .authorizer_mut()
            .grant_role(&admin, house.escrow_account(), Role::Depositor);

        let mut ledger = InMemoryLedger::new();
        ledger.create_token(stake_config.stake_token, admin);
        ledger.create_token(stake_config.reward_token, admin);
        Fixture {
            house,
            stake,
            ledger,
            admin,
        }
    }

    fn fund(f: &mut Fixture, amount: Amount) -> AccountId {
        let account = AccountId::new();
        let token = f.house.config().payment_token.clone();
        f.ledger.mint(&token, &f.admin, &account, amount).unwrap();
        account
    }

    fn start(f: &mut Fixture) -> AuctionId {
        f.house.start(f.admin, eth("0.1"), DAY, T0).unwrap()
    }

    fn balance(f: &Fixture, account: &AccountId) -> Amount {
        f.ledger.balance_of(&TokenId::from("ETH"), account)
    }

    #[test]
    fn test_start_assigns_sequential_ids() {
        let mut f = setup();
        assert_eq!(start(&mut f), AuctionId::new(1));
        assert_eq!(start(&mut f), AuctionId::new(2));
        assert_eq!(f.house.auction_count(), 2);

        let auction = f.house.auction(AuctionId::new(1)).unwrap();
        assert_eq!(auction.status, AuctionStatus::Open);
        assert_eq!(auction.highest_bid, eth("0.1"));
        assert_eq!(auction.highest_bidder, None);
        assert_eq!(auction.end_time, T0 + DAY);
    }

    #[test]
    fn test_start_requires_capability() {
        let mut f = setup();
        let eve = AccountId::new();
        assert_eq!(
            f.house.start(eve, 1, DAY, T0),
            Err(AuctionError::Unauthorized)
        );

        let operator = AccountId::new();
        let admin = f.admin;
        f.house
            .authorizer_mut()
            .grant_role(&admin, operator, Role::Operator);
        let id = f.house.start(operator, 1, DAY, T0).unwrap();
        assert_eq!(f.house.auction(id).unwrap().seller, operator);
    }

    #[test]
    fn test_start_rejects_non_positive_duration() {
        let mut f = setup();
        assert_eq!(
            f.house.start(f.admin, 1, 0, T0),
            Err(AuctionError::InvalidDuration)
        );
        assert_eq!(
            f.house.start(f.admin, 1, i64::MAX, T0),
            Err(AuctionError::Overflow)
        );
        assert_eq!(f.house.auction_count(), 0);
    }

    #[test]
    fn test_cumulative_bidding() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        let bob = fund(&mut f, eth("1"));

        f.house.bid(id, alice, eth("0.2"), T0 + 1, &mut f.ledger).unwrap();

        let result = f.house.bid(id, bob, eth("0.1"), T0 + 2, &mut f.ledger);
        assert_eq!(
            result,
            Err(AuctionError::BidTooLow {
                total: eth("0.1"),
                highest_bid: eth("0.2"),
            })
        );

        f.house.bid(id, bob, eth("0.3"), T0 + 3, &mut f.ledger).unwrap();
        let event = f.house.bid(id, alice, eth("0.15"), T0 + 4, &mut f.ledger).unwrap();
        assert!(matches!(
            event,
            ContractEvent::BidPlaced(BidPlaced { total, .. }) if total == eth("0.35")
        ));

        let auction = f.house.auction(id).unwrap();
        assert_eq!(auction.highest_bidder, Some(alice));
        assert_eq!(auction.highest_bid, eth("0.35"));
        assert_eq!(f.house.contribution(id, &alice), eth("0.35"));
        assert_eq!(f.house.contribution(id, &bob), eth("0.3"));
        assert_eq!(balance(&f, &f.house.escrow_account()), eth("0.65"));
        assert_eq!(balance(&f, &bob), eth("0.7"));
    }

    #[test]
    fn test_first_bid_must_beat_starting_bid() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        assert!(matches!(
            f.house.bid(id, alice, eth("0.1"), T0, &mut f.ledger),
            Err(AuctionError::BidTooLow { .. })
        ));
        assert_eq!(
            f.house.bid(id, alice, 0, T0, &mut f.ledger),
            Err(AuctionError::InvalidAmount)
        );
    }

    #[test]
    fn test_rejected_bid_leaves_no_trace() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("0.5"));
        f.house.bid(id, alice, eth("0.2"), T0, &mut f.ledger).unwrap();
        let events_before = f.house.events().len();

        let poor = fund(&mut f, eth("0.01"));
        let result = f.house.bid(id, poor, eth("0.3"), T0, &mut f.ledger);
        assert!(matches!(result, Err(AuctionError::Token(_))));

        let auction = f.house.auction(id).unwrap();
        assert_eq!(auction.highest_bidder, Some(alice));
        assert_eq!(auction.highest_bid, eth("0.2"));
        assert_eq!(f.house.contribution(id, &poor), 0);
        assert!(f.house.contributions(id).iter().all(|(b, _)| *b != poor));
        assert_eq!(f.house.events().len(), events_before);
        assert_eq!(balance(&f, &poor), eth("0.01"));
    }

    #[test]
    fn test_bid_after_end_time_expired() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        assert_eq!(
            f.house.bid(id, alice, eth("0.2"), T0 + DAY, &mut f.ledger),
            Err(AuctionError::AuctionExpired { end_time: T0 + DAY })
        );
    }

    #[test]
    fn test_unknown_auction() {
        let mut f = setup();
        let alice = fund(&mut f, eth("1"));
        let missing = AuctionId::new(9);
        assert_eq!(
            f.house.bid(missing, alice, 1, T0, &mut f.ledger),
            Err(AuctionError::AuctionNotFound { auction_id: missing })
        );
    }

    #[test]
    fn test_end_before_end_time_rejected() {
        let mut f = setup();
        let id = start(&mut f);
        let result = f.house.end(id, f.admin, T0 + 10, &mut f.ledger, &mut f.stake);
        assert_eq!(
            result,
            Err(AuctionError::AuctionStillOpen { end_time: T0 + DAY })
        );
    }

    #[test]
    fn test_early_end_when_allowed() {
        let config = AuctionConfig {
            allow_early_end: true,
            ..AuctionConfig::default()
        };
        let mut f = setup_with(config, StakeConfig::default());
        let id = start(&mut f);
        f.house
            .end(id, f.admin, T0 + 10, &mut f.ledger, &mut f.stake)
            .unwrap();
        assert!(f.house.auction(id).unwrap().is_ended());
    }

    #[test]
    fn test_end_requires_seller_or_capability() {
        let mut f = setup();
        let id = start(&mut f);
        let eve = AccountId::new();
        assert_eq!(
            f.house.end(id, eve, T0 + DAY, &mut f.ledger, &mut f.stake),
            Err(AuctionError::Unauthorized)
        );
        assert!(!f.house.auction(id).unwrap().is_ended());
    }

    #[test]
    fn test_end_splits_proceeds() {
        let fee_recipient = AccountId::new();
        let config = AuctionConfig {
            fee_recipient: Some(fee_recipient),
            ..AuctionConfig::default()
        };
        let mut f = setup_with(config, StakeConfig::default());
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        let bob = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("0.2"), T0, &mut f.ledger).unwrap();
        f.house.bid(id, bob, eth("0.3"), T0, &mut f.ledger).unwrap();
        f.house.bid(id, alice, eth("0.15"), T0, &mut f.ledger).unwrap();

        let event = f
            .house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        let expected = AuctionEnded {
            auction_id: id,
            winner: Some(alice),
            highest_bid: eth("0.35"),
            protocol_fee: eth("0.00875"),
            reward: eth("0.035"),
            seller_proceeds: eth("0.30625"),
        };
        assert_eq!(event, ContractEvent::AuctionEnded(expected));

        assert_eq!(balance(&f, &fee_recipient), eth("0.00875"));
        assert_eq!(balance(&f, &f.admin), eth("0.30625"));
        assert_eq!(balance(&f, &f.stake.pool_account()), eth("0.035"));
        assert_eq!(f.stake.total_rewards_deposited(), eth("0.035"));
        // Bob's losing contribution is still held for withdrawal
        assert_eq!(balance(&f, &f.house.escrow_account()), eth("0.3"));

        let auction = f.house.auction(id).unwrap();
        assert_eq!(auction.status, AuctionStatus::Ended);
        assert!(auction.settlement.is_some());
    }

    #[test]
    fn test_protocol_fee_goes_to_seller_without_recipient() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("1"), T0, &mut f.ledger).unwrap();
        f.house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        assert_eq!(balance(&f, &f.admin), eth("0.9"));
        assert_eq!(balance(&f, &f.stake.pool_account()), eth("0.1"));
    }

    #[test]
    fn test_end_without_bids_moves_nothing() {
        let mut f = setup();
        let id = start(&mut f);
        let event = f
            .house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        match event {
            ContractEvent::AuctionEnded(ended) => {
                assert_eq!(ended.winner, None);
                assert_eq!(ended.highest_bid, 0);
                assert_eq!(ended.seller_proceeds, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(f.stake.total_rewards_deposited(), 0);
    }

    #[test]
    fn test_ended_auction_is_terminal() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        assert_eq!(
            f.house.end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake),
            Err(AuctionError::AlreadyEnded)
        );
        assert_eq!(
            f.house.bid(id, alice, eth("0.5"), T0 + DAY, &mut f.ledger),
            Err(AuctionError::AlreadyEnded)
        );
    }

    #[test]
    fn test_rejected_reward_deposit_rolls_back_end() {
        let stake_config = StakeConfig {
            empty_pool_policy: EmptyPoolPolicy::Reject,
            ..StakeConfig::default()
        };
        let mut f = setup_with(AuctionConfig::default(), stake_config);
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("0.5"), T0, &mut f.ledger).unwrap();

        let result = f.house.end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake);
        assert_eq!(result, Err(AuctionError::Stake(StakeError::NoStakers)));
        let auction = f.house.auction(id).unwrap();
        assert_eq!(auction.status, AuctionStatus::Open);
        assert_eq!(auction.settlement, None);
        assert_eq!(f.house.contribution(id, &alice), eth("0.5"));
        assert_eq!(balance(&f, &f.house.escrow_account()), eth("0.5"));
        assert_eq!(balance(&f, &f.admin), 0);
    }

    #[test]
    fn test_settlement_consumes_winning_contribution() {
        let mut f = setup();
        let first = start(&mut f);
        let second = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        let bob = fund(&mut f, eth("1"));
        f.house.bid(first, bob, eth("0.3"), T0, &mut f.ledger).unwrap();
        f.house.bid(first, alice, eth("0.4"), T0, &mut f.ledger).unwrap();
        f.house.bid(second, bob, eth("0.2"), T0, &mut f.ledger).unwrap();

        f.house
            .end(first, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        assert_eq!(f.house.contribution(first, &alice), 0);
        assert_eq!(f.house.contributions(first), vec![(bob, eth("0.3"))]);

        let held: Amount = [first, second]
            .iter()
            .flat_map(|id| f.house.contributions(*id))
            .map(|(_, amount)| amount)
            .sum();
        assert_eq!(balance(&f, &f.house.escrow_account()), held);
    }

    #[test]
    fn test_claim_proceeds_without_deferral() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("0.5"), T0, &mut f.ledger).unwrap();
        f.house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        assert_eq!(f.house.unclaimed_proceeds(&f.admin), 0);
        assert_eq!(
            f.house.claim_proceeds(f.admin, &mut f.ledger),
            Err(AuctionError::NothingToWithdraw)
        );
    }

    #[test]
    fn test_escrow_needs_depositor_role() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("0.5"), T0, &mut f.ledger).unwrap();

        let mut unwired = StakeLedger::new(f.admin, StakeConfig::default());
        let result = f.house.end(id, f.admin, T0 + DAY, &mut f.ledger, &mut unwired);
        assert_eq!(result, Err(AuctionError::Stake(StakeError::Unauthorized)));
        assert!(!f.house.auction(id).unwrap().is_ended());
    }

    #[test]
    fn test_losers_withdraw_contribution() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        let bob = fund(&mut f, eth("1"));
        f.house.bid(id, bob, eth("0.3"), T0, &mut f.ledger).unwrap();
        f.house.bid(id, alice, eth("0.4"), T0, &mut f.ledger).unwrap();

        assert_eq!(
            f.house.withdraw(id, bob, &mut f.ledger),
            Err(AuctionError::AuctionStillOpen { end_time: T0 + DAY })
        );

        f.house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();
        f.house.withdraw(id, bob, &mut f.ledger).unwrap();
        assert_eq!(balance(&f, &bob), eth("1"));
        assert_eq!(f.house.contribution(id, &bob), 0);
        assert_eq!(balance(&f, &f.house.escrow_account()), 0);

        assert_eq!(
            f.house.withdraw(id, bob, &mut f.ledger),
            Err(AuctionError::NothingToWithdraw)
        );
        assert_eq!(
            f.house.withdraw(id, alice, &mut f.ledger),
            Err(AuctionError::NothingToWithdraw)
        );
    }

    #[test]
    fn test_events_recorded_in_order() {
        let mut f = setup();
        let id = start(&mut f);
        let alice = fund(&mut f, eth("1"));
        f.house.bid(id, alice, eth("0.2"), T0, &mut f.ledger).unwrap();
        f.house
            .end(id, f.admin, T0 + DAY, &mut f.ledger, &mut f.stake)
            .unwrap();

        let events = f.house.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ContractEvent::AuctionStarted(_)));
        assert!(matches!(events[1], ContractEvent::BidPlaced(_)));
        assert!(matches!(events[2], ContractEvent::AuctionEnded(_)));
        assert!(f.house.events().is_empty());
    }

    proptest! {
        #[test]
        fn prop_highest_bid_is_max_contribution(
            bids in proptest::collection::vec((0usize..4, 1u64..1_000), 1..40)
        ) {
            let mut f = setup();
            let id = f.house.start(f.admin, 0, DAY, T0).unwrap();
            let bidders: Vec<AccountId> = (0..4).map(|_| fund(&mut f, 1_000_000)).collect();

            for (who, amount) in bids {
                let _ = f.house.bid(id, bidders[who], Amount::from(amount), T0, &mut f.ledger);

                let contributions = f.house.contributions(id);
                let auction = f.house.auction(id).unwrap();
                let held: Amount = contributions.iter().map(|(_, a)| *a).sum();
                prop_assert_eq!(balance(&f, &f.house.escrow_account()), held);

                if let Some(leader) = auction.highest_bidder {
                    let max = contributions.iter().map(|(_, a)| *a).max().unwrap_or(0);
                    prop_assert_eq!(auction.highest_bid, max);
                    prop_assert_eq!(f.house.contribution(id, &leader), max);
                    let leaders = contributions.iter().filter(|(_, a)| *a == max).count();
                    prop_assert_eq!(leaders, 1);
                }
            }
        }
    }
}
