//! Shared security primitives for contract modules
//!
//! Provides the reentrancy guard and the capability check used by the vault
//! registry, auction house and stake ledger.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use types::ids::AccountId;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A contract function acquires the guard before executing state-changing
/// logic and releases it on completion. Any nested call attempt fails.
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `true` if successfully acquired.
    /// Returns `false` if already locked (reentrancy attempt).
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the guard.
    pub fn release(&mut self) {
        self.locked = false;
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Privileged operations gated by a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    CreateVault,
    ApproveMint,
    StartAuction,
    EndAuction,
    DepositReward,
}

/// Capability predicate consumed by the contracts.
///
/// Anything that can answer "may `caller` perform `action`" plugs in here;
/// [`AccessControl`] is the role-based default.
pub trait Authorizer {
    fn is_authorized(&self, caller: &AccountId, action: Action) -> bool;
}

/// Access control roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full system control
    Admin,
    /// Runs auctions and approves mint requests
    Operator,
    /// May feed rewards into the stake ledger (e.g. the auction escrow)
    Depositor,
}

impl Role {
    /// Whether this role grants `action`.
    pub fn permits(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Operator => matches!(
                action,
                Action::ApproveMint | Action::StartAuction | Action::EndAuction
            ),
            Role::Depositor => action == Action::DepositReward,
        }
    }
}

/// Role-based access control manager.
///
/// Maps callers to their assigned role. The primary admin can grant, revoke
/// and hand over administration.
#[derive(Debug, Clone)]
pub struct AccessControl {
    roles: HashMap<AccountId, Role>,
    admin: AccountId,
}

impl AccessControl {
    /// Create access control with an initial admin.
    pub fn new(admin: AccountId) -> Self {
        let mut roles = HashMap::new();
        roles.insert(admin, Role::Admin);
        Self { roles, admin }
    }

    /// Check if a caller has the specified role.
    pub fn has_role(&self, caller: &AccountId, role: Role) -> bool {
        self.roles.get(caller).map_or(false, |r| *r == role)
    }

    /// Check if a caller is admin.
    pub fn is_admin(&self, caller: &AccountId) -> bool {
        self.has_role(caller, Role::Admin)
    }

    /// Assign a role to a caller. Only admin can assign roles.
    pub fn grant_role(&mut self, admin_caller: &AccountId, target: AccountId, role: Role) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        self.roles.insert(target, role);
        true
    }

    /// Remove a role from a caller. Only admin can revoke.
    pub fn revoke_role(&mut self, admin_caller: &AccountId, target: &AccountId) -> bool {
        if !self.is_admin(admin_caller) {
            return false;
        }
        // Cannot revoke the primary admin
        if *target == self.admin {
            return false;
        }
        self.roles.remove(target);
        true
    }

    /// Transfer admin to a new account.
    pub fn transfer_admin(&mut self, current_admin: &AccountId, new_admin: AccountId) -> bool {
        if !self.is_admin(current_admin) {
            return false;
        }
        self.roles.remove(current_admin);
        self.roles.insert(new_admin, Role::Admin);
        self.admin = new_admin;
        true
    }

    /// Get the current admin identifier.
    pub fn admin(&self) -> &AccountId {
        &self.admin
    }
}

impl Authorizer for AccessControl {
    fn is_authorized(&self, caller: &AccountId, action: Action) -> bool {
        self.roles
            .get(caller)
            .map_or(false, |role| role.permits(action))
    }
}
