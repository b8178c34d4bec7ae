//! Vault Registry: two-phase fractionalization of non-fungible assets
//!
//! A vault binds an asset collection to a fungible claim token and an
//! allocation. Holders lock assets in two steps:
//! - `request_mint` validates ownership and records a pending request
//! - `approve_mint_request` moves the assets into custody and mints
//!   `allocation * assets / cardinality` claim tokens to the requester
//!
//! The custody account must be the claim token's minter and must be
//! approved to move every requested asset by the time of approval.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::errors::NumericError;
use types::ids::{AccountId, AssetId, CollectionId, RequestId, TokenId, VaultId};
use types::numeric::{mul_div, Amount};

use crate::config::{ApprovalPolicy, VaultConfig};
use crate::errors::{AssetError, VaultError};
use crate::events::{ContractEvent, MintApproved, MintRequested, VaultCreated};
use crate::ledger::FungibleLedger;
use crate::registry::AssetRegistry;
use crate::security::{AccessControl, Action, Authorizer, ReentrancyGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub id: VaultId,
    pub fraction_token: TokenId,
    pub collection: CollectionId,
    /// Claim tokens backing a full vault of `cardinality` assets
    pub allocation: Amount,
    pub cardinality: u64,
    /// Assets currently held in custody for this vault
    pub locked_assets: u64,
    /// Claim tokens minted so far
    pub minted: Amount,
}

impl Vault {
    /// Claim tokens minted for locking `asset_count` assets (truncating).
    pub fn claim_amount(&self, asset_count: u64) -> Result<Amount, VaultError> {
        Ok(mul_div(
            self.allocation,
            Amount::from(asset_count),
            Amount::from(self.cardinality),
        )?)
    }

    /// Assets that can still be locked.
    pub fn remaining_capacity(&self) -> u64 {
        self.cardinality.saturating_sub(self.locked_assets)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    pub id: RequestId,
    pub vault_id: VaultId,
    pub requester: AccountId,
    /// In the order the requester supplied them
    pub asset_ids: Vec<AssetId>,
    pub approved: bool,
}

impl MintRequest {
    /// Order-insensitive comparison against a caller-supplied id list.
    fn covers(&self, asset_ids: &[AssetId]) -> bool {
        if self.asset_ids.len() != asset_ids.len() {
            return false;
        }
        let mut mine = self.asset_ids.clone();
        let mut theirs = asset_ids.to_vec();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

/// Registry of fractionalization vaults and their mint requests.
#[derive(Debug)]
pub struct VaultRegistry<A = AccessControl> {
    config: VaultConfig,
    /// Receives locked assets; mints claim tokens
    custody: AccountId,
    vaults: BTreeMap<VaultId, Vault>,
    requests: BTreeMap<RequestId, MintRequest>,
    /// Unapproved request per (vault, requester)
    pending: HashMap<(VaultId, AccountId), RequestId>,
    /// Assets named by an unapproved request
    reserved_assets: HashMap<(CollectionId, AssetId), RequestId>,
    next_vault_id: VaultId,
    next_request_id: RequestId,
    reentrancy_guard: ReentrancyGuard,
    authorizer: A,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl VaultRegistry<AccessControl> {
    pub fn new(admin: AccountId, config: VaultConfig) -> Self {
        Self::with_authorizer(config, AccessControl::new(admin))
    }
}

impl<A: Authorizer> VaultRegistry<A> {
    pub fn with_authorizer(config: VaultConfig, authorizer: A) -> Self {
        let custody = AccountId::new();
        info!(
            %custody,
            default_cardinality = config.default_cardinality,
            approval_policy = ?config.approval_policy,
            "VaultRegistry initialized"
        );
        Self {
            config,
            custody,
            vaults: BTreeMap::new(),
            requests: BTreeMap::new(),
            pending: HashMap::new(),
            reserved_assets: HashMap::new(),
            next_vault_id: VaultId::FIRST,
            next_request_id: RequestId::FIRST,
            reentrancy_guard: ReentrancyGuard::new(),
            authorizer,
            events: Vec::new(),
        }
    }

    // ───────────────────────── Vaults ─────────────────────────

    /// Register a vault using the configured default cardinality.
    pub fn create_vault(
        &mut self,
        caller: AccountId,
        fraction_token: TokenId,
        collection: CollectionId,
        allocation: Amount,
    ) -> Result<VaultId, VaultError> {
        let cardinality = self.config.default_cardinality;
        self.create_vault_with_cardinality(caller, fraction_token, collection, allocation, cardinality)
    }

    pub fn create_vault_with_cardinality(
        &mut self,
        caller: AccountId,
        fraction_token: TokenId,
        collection: CollectionId,
        allocation: Amount,
        cardinality: u64,
    ) -> Result<VaultId, VaultError> {
        if !self.authorizer.is_authorized(&caller, Action::CreateVault) {
            warn!(%caller, "Rejected vault creation from unauthorized account");
            return Err(VaultError::Unauthorized);
        }
        if allocation == 0 || cardinality == 0 {
            return Err(VaultError::InvalidAllocation);
        }
        let vault_id = self.next_vault_id;
        self.next_vault_id = vault_id.next().ok_or(VaultError::IdsExhausted)?;

        self.vaults.insert(
            vault_id,
            Vault {
                id: vault_id,
                fraction_token: fraction_token.clone(),
                collection: collection.clone(),
                allocation,
                cardinality,
                locked_assets: 0,
                minted: 0,
            },
        );

        info!(%vault_id, %fraction_token, %collection, allocation, cardinality, "Vault created");
        self.emit(ContractEvent::VaultCreated(VaultCreated {
            vault_id,
            fraction_token,
            collection,
            allocation,
            cardinality,
        }));
        Ok(vault_id)
    }

    // ───────────────────────── Mint Request ─────────────────────────

    /// Record a request to lock `asset_ids` into `vault_id`. Nothing moves yet.
    pub fn request_mint(
        &mut self,
        caller: AccountId,
        vault_id: VaultId,
        asset_ids: &[AssetId],
        assets: &dyn AssetRegistry,
    ) -> Result<RequestId, VaultError> {
        let vault = self.find(vault_id)?;
        let distinct: BTreeSet<AssetId> = asset_ids.iter().copied().collect();
        if asset_ids.is_empty() || distinct.len() != asset_ids.len() {
            return Err(VaultError::EmptyRequest);
        }
        if self.pending.contains_key(&(vault_id, caller)) {
            return Err(VaultError::RequestPending { vault_id });
        }
        for &asset_id in asset_ids {
            if self
                .reserved_assets
                .contains_key(&(vault.collection.clone(), asset_id))
            {
                return Err(VaultError::AssetAlreadyRequested { asset_id });
            }
            if !assets.is_approved_or_owner(&vault.collection, &caller, asset_id) {
                return Err(VaultError::NotAssetOwner { asset_id });
            }
        }

        let collection = vault.collection.clone();
        let request_id = self.next_request_id;
        self.next_request_id = request_id.next().ok_or(VaultError::IdsExhausted)?;

        self.requests.insert(
            request_id,
            MintRequest {
                id: request_id,
                vault_id,
                requester: caller,
                asset_ids: asset_ids.to_vec(),
                approved: false,
            },
        );
        self.pending.insert((vault_id, caller), request_id);
        for &asset_id in asset_ids {
            self.reserved_assets
                .insert((collection.clone(), asset_id), request_id);
        }

        debug!(%request_id, %vault_id, requester = %caller, assets = asset_ids.len(), "Mint requested");
        self.emit(ContractEvent::MintRequested(MintRequested {
            request_id,
            vault_id,
            requester: caller,
            asset_ids: asset_ids.to_vec(),
        }));
        Ok(request_id)
    }

    // ───────────────────────── Mint Approval ─────────────────────────

    /// Finalize the request on `vault_id` naming exactly `asset_ids` (in any
    /// order): lock the assets in custody and mint claim tokens to the
    /// requester.
    ///
    /// Who may call this is decided by [`ApprovalPolicy`]; deployments so far
    /// have let requesters approve themselves.
    pub fn approve_mint_request(
        &mut self,
        caller: AccountId,
        vault_id: VaultId,
        asset_ids: &[AssetId],
        assets: &mut dyn AssetRegistry,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, VaultError> {
        self.find(vault_id)?;
        let request = self.matching_request(vault_id, asset_ids)?.clone();
        if request.approved {
            return Err(VaultError::AlreadyApproved);
        }
        if !self.may_approve(&caller, &request.requester) {
            warn!(%caller, request_id = %request.id, "Rejected mint approval from unauthorized account");
            return Err(VaultError::Unauthorized);
        }
        self.check_reentrancy()?;
        let result = self.approve_inner(caller, request, assets, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn approve_inner(
        &mut self,
        approver: AccountId,
        request: MintRequest,
        assets: &mut dyn AssetRegistry,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, VaultError> {
        let request_id = request.id;
        let vault = self.find(request.vault_id)?.clone();

        let count = request.asset_ids.len() as u64;
        if count > vault.remaining_capacity() {
            return Err(VaultError::CapacityExceeded {
                vault_id: vault.id,
                locked: vault.locked_assets,
                requested: count,
                capacity: vault.cardinality,
            });
        }
        let claim_amount = vault.claim_amount(count)?;
        let minted = vault
            .minted
            .checked_add(claim_amount)
            .ok_or(NumericError::Overflow)?;

        for &asset_id in &request.asset_ids {
            if !assets.is_approved_or_owner(&vault.collection, &request.requester, asset_id) {
                return Err(VaultError::NotAssetOwner { asset_id });
            }
            if !assets.is_approved_or_owner(&vault.collection, &self.custody, asset_id) {
                return Err(AssetError::NotOwnerNorApproved {
                    collection: vault.collection.clone(),
                    asset_id,
                    caller: self.custody,
                }
                .into());
            }
        }

        // Effects
        self.set_approved(&request, true);
        if let Some(v) = self.vaults.get_mut(&vault.id) {
            v.locked_assets += count;
            v.minted = minted;
        }

        // Interactions
        if let Err(e) = self.lock_and_mint(&vault, &request, claim_amount, assets, ledger) {
            self.set_approved(&request, false);
            self.vaults.insert(vault.id, vault);
            return Err(e);
        }

        info!(
            %request_id,
            vault_id = %vault.id,
            requester = %request.requester,
            %approver,
            assets = count,
            claim_amount,
            "Mint request approved"
        );
        Ok(self.emit(ContractEvent::MintApproved(MintApproved {
            request_id,
            vault_id: vault.id,
            requester: request.requester,
            approver,
            asset_ids: request.asset_ids,
            claim_amount,
        })))
    }

    /// Move every asset into custody, then mint. Assets already moved are
    /// handed back to the requester if a later step fails.
    fn lock_and_mint(
        &self,
        vault: &Vault,
        request: &MintRequest,
        claim_amount: Amount,
        assets: &mut dyn AssetRegistry,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<(), VaultError> {
        let mut locked = Vec::with_capacity(request.asset_ids.len());
        let mut outcome: Result<(), VaultError> = Ok(());
        for &asset_id in &request.asset_ids {
            let previous_owner = match assets.owner_of(&vault.collection, asset_id) {
                Ok(owner) => owner,
                Err(e) => {
                    outcome = Err(e.into());
                    break;
                }
            };
            if let Err(e) = assets.transfer(&vault.collection, &self.custody, asset_id, &self.custody) {
                outcome = Err(e.into());
                break;
            }
            locked.push((asset_id, previous_owner));
        }
        if outcome.is_ok() {
            outcome = ledger
                .mint(&vault.fraction_token, &self.custody, &request.requester, claim_amount)
                .map_err(VaultError::from);
        }

        if outcome.is_err() {
            for (asset_id, previous_owner) in locked.into_iter().rev() {
                if let Err(e) = assets.transfer(&vault.collection, &self.custody, asset_id, &previous_owner) {
                    warn!(%asset_id, error = %e, "Failed to hand back asset after aborted approval");
                }
            }
        }
        outcome
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn vault(&self, vault_id: VaultId) -> Option<&Vault> {
        self.vaults.get(&vault_id)
    }

    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.values()
    }

    /// Number of vaults ever created.
    pub fn vault_count(&self) -> u64 {
        self.next_vault_id.value() - 1
    }

    pub fn request(&self, request_id: RequestId) -> Option<&MintRequest> {
        self.requests.get(&request_id)
    }

    /// The caller's unapproved request on a vault, if any.
    pub fn pending_request(&self, vault_id: VaultId, requester: &AccountId) -> Option<&MintRequest> {
        self.pending
            .get(&(vault_id, *requester))
            .and_then(|id| self.requests.get(id))
    }

    /// Account that holds locked assets and mints claim tokens.
    pub fn custody_account(&self) -> AccountId {
        self.custody
    }

    pub fn config(&self) -> &VaultConfig {
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

    fn find(&self, vault_id: VaultId) -> Result<&Vault, VaultError> {
        self.vaults
            .get(&vault_id)
            .ok_or(VaultError::UnknownVault { vault_id })
    }

    /// Pending match wins over an already approved one for the same assets.
    fn matching_request(
        &self,
        vault_id: VaultId,
        asset_ids: &[AssetId],
    ) -> Result<&MintRequest, VaultError> {
        let mut approved = None;
        for request in self.requests.values() {
            if request.vault_id != vault_id || !request.covers(asset_ids) {
                continue;
            }
            if !request.approved {
                return Ok(request);
            }
            approved = Some(request);
        }
        approved.ok_or(VaultError::RequestNotFound { vault_id })
    }

    fn may_approve(&self, caller: &AccountId, requester: &AccountId) -> bool {
        let is_requester = caller == requester;
        let is_operator = || self.authorizer.is_authorized(caller, Action::ApproveMint);
        match self.config.approval_policy {
            ApprovalPolicy::Requester => is_requester,
            ApprovalPolicy::Administrator => is_operator(),
            ApprovalPolicy::RequesterOrAdministrator => is_requester || is_operator(),
        }
    }

    /// Flip a request between pending and approved, keeping the pending and
    /// reserved-asset indexes in step.
    fn set_approved(&mut self, request: &MintRequest, approved: bool) {
        let collection = match self.vaults.get(&request.vault_id) {
            Some(vault) => vault.collection.clone(),
            None => return,
        };
        if let Some(stored) = self.requests.get_mut(&request.id) {
            stored.approved = approved;
        }
        let key = (request.vault_id, request.requester);
        if approved {
            self.pending.remove(&key);
            for asset_id in &request.asset_ids {
                self.reserved_assets.remove(&(collection.clone(), *asset_id));
            }
        } else {
            self.pending.insert(key, request.id);
            for asset_id in &request.asset_ids {
                self.reserved_assets
                    .insert((collection.clone(), *asset_id), request.id);
            }
        }
    }

    fn emit(&mut self, event: ContractEvent) -> ContractEvent {
        self.events.push(event.clone());
        event
    }

    fn check_reentrancy(&mut self) -> Result<(), VaultError> {
        if !self.reentrancy_guard.acquire() {
            return Err(VaultError::Reentrancy);
        }
        Ok(())
    }
}
