//! Non-fungible asset boundary
//!
//! The vault registry validates and takes custody of assets through an
//! [`AssetRegistry`]. [`InMemoryAssetRegistry`] tracks ownership, per-asset
//! approvals and operator approvals for any number of collections.

use std::collections::{HashMap, HashSet};
use types::ids::{AccountId, AssetId, CollectionId};

use crate::errors::AssetError;

/// Non-fungible asset operations consumed by the vault registry.
pub trait AssetRegistry {
    fn owner_of(&self, collection: &CollectionId, asset_id: AssetId)
        -> Result<AccountId, AssetError>;

    /// Whether `caller` owns the asset or has been approved to move it.
    /// Unknown assets report `false`.
    fn is_approved_or_owner(
        &self,
        collection: &CollectionId,
        caller: &AccountId,
        asset_id: AssetId,
    ) -> bool;

    /// Move the asset to `to`. `operator` must own or be approved for it.
    fn transfer(
        &mut self,
        collection: &CollectionId,
        operator: &AccountId,
        asset_id: AssetId,
        to: &AccountId,
    ) -> Result<(), AssetError>;
}

/// In-memory asset registry with sequential asset ids per collection.
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    owners: HashMap<(CollectionId, AssetId), AccountId>,
    approvals: HashMap<(CollectionId, AssetId), AccountId>,
    /// (collection, owner, operator)
    operators: HashSet<(CollectionId, AccountId, AccountId)>,
    next_ids: HashMap<CollectionId, AssetId>,
}

impl InMemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next asset of `collection` to `to`; ids start at 1.
    pub fn mint(&mut self, collection: &CollectionId, to: AccountId) -> AssetId {
        let next = self
            .next_ids
            .entry(collection.clone())
            .or_insert(AssetId::FIRST);
        let asset_id = *next;
        *next = AssetId::new(asset_id.value() + 1);
        self.owners.insert((collection.clone(), asset_id), to);
        asset_id
    }

    /// Approve `spender` for a single asset. Only the owner may approve.
    pub fn approve(
        &mut self,
        collection: &CollectionId,
        owner: &AccountId,
        spender: AccountId,
        asset_id: AssetId,
    ) -> Result<(), AssetError> {
        if self.owner_of(collection, asset_id)? != *owner {
            return Err(AssetError::NotOwnerNorApproved {
                collection: collection.clone(),
                asset_id,
                caller: *owner,
            });
        }
        self.approvals.insert((collection.clone(), asset_id), spender);
        Ok(())
    }

    /// Grant or revoke `operator` rights over all of `owner`'s assets.
    pub fn set_approval_for_all(
        &mut self,
        collection: &CollectionId,
        owner: AccountId,
        operator: AccountId,
        approved: bool,
    ) {
        let key = (collection.clone(), owner, operator);
        if approved {
            self.operators.insert(key);
        } else {
            self.operators.remove(&key);
        }
    }

    pub fn approved(&self, collection: &CollectionId, asset_id: AssetId) -> Option<AccountId> {
        self.approvals.get(&(collection.clone(), asset_id)).copied()
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn owner_of(
        &self,
        collection: &CollectionId,
        asset_id: AssetId,
    ) -> Result<AccountId, AssetError> {
        self.owners
            .get(&(collection.clone(), asset_id))
            .copied()
            .ok_or_else(|| AssetError::UnknownAsset {
                collection: collection.clone(),
                asset_id,
            })
    }

    fn is_approved_or_owner(
        &self,
        collection: &CollectionId,
        caller: &AccountId,
        asset_id: AssetId,
    ) -> bool {
        let Ok(owner) = self.owner_of(collection, asset_id) else {
            return false;
        };
        owner == *caller
            || self.approved(collection, asset_id) == Some(*caller)
            || self
                .operators
                .contains(&(collection.clone(), owner, *caller))
    }

    fn transfer(
        &mut self,
        collection: &CollectionId,
        operator: &AccountId,
        asset_id: AssetId,
        to: &AccountId,
    ) -> Result<(), AssetError> {
        self.owner_of(collection, asset_id)?;
        if !self.is_approved_or_owner(collection, operator, asset_id) {
            return Err(AssetError::NotOwnerNorApproved {
                collection: collection.clone(),
                asset_id,
                caller: *operator,
            });
        }
        let key = (collection.clone(), asset_id);
        self.approvals.remove(&key);
        self.owners.insert(key, *to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nft() -> CollectionId {
        CollectionId::from("TestNFT")
    }

    #[test]
    fn test_mint_assigns_sequential_ids() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        let bob = AccountId::new();
        assert_eq!(registry.mint(&nft(), alice), AssetId::new(1));
        assert_eq!(registry.mint(&nft(), alice), AssetId::new(2));
        assert_eq!(registry.mint(&nft(), bob), AssetId::new(3));
        assert_eq!(registry.owner_of(&nft(), AssetId::new(3)).unwrap(), bob);
    }

    #[test]
    fn test_ids_are_per_collection() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        registry.mint(&nft(), alice);
        assert_eq!(
            registry.mint(&CollectionId::from("Other"), alice),
            AssetId::new(1)
        );
    }

    #[test]
    fn test_approval_grants_transfer_and_is_cleared() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        let custody = AccountId::new();
        let id = registry.mint(&nft(), alice);

        assert!(!registry.is_approved_or_owner(&nft(), &custody, id));
        registry.approve(&nft(), &alice, custody, id).unwrap();
        assert!(registry.is_approved_or_owner(&nft(), &custody, id));

        registry.transfer(&nft(), &custody, id, &custody).unwrap();
        assert_eq!(registry.owner_of(&nft(), id).unwrap(), custody);
        assert_eq!(registry.approved(&nft(), id), None);
    }

    #[test]
    fn test_non_owner_cannot_approve() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        let bob = AccountId::new();
        let id = registry.mint(&nft(), alice);
        assert!(registry.approve(&nft(), &bob, bob, id).is_err());
    }

    #[test]
    fn test_operator_approval() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        let operator = AccountId::new();
        let id = registry.mint(&nft(), alice);
        registry.set_approval_for_all(&nft(), alice, operator, true);
        assert!(registry.is_approved_or_owner(&nft(), &operator, id));
        registry.set_approval_for_all(&nft(), alice, operator, false);
        assert!(!registry.is_approved_or_owner(&nft(), &operator, id));
    }

    #[test]
    fn test_unauthorized_transfer_rejected() {
        let mut registry = InMemoryAssetRegistry::new();
        let alice = AccountId::new();
        let eve = AccountId::new();
        let id = registry.mint(&nft(), alice);
        let result = registry.transfer(&nft(), &eve, id, &eve);
        assert!(matches!(result, Err(AssetError::NotOwnerNorApproved { .. })));
        assert_eq!(registry.owner_of(&nft(), id).unwrap(), alice);
    }

    #[test]
    fn test_unknown_asset() {
        let registry = InMemoryAssetRegistry::new();
        assert!(registry.owner_of(&nft(), AssetId::new(1)).is_err());
        assert!(!registry.is_approved_or_owner(&nft(), &AccountId::new(), AssetId::new(1)));
    }
}
