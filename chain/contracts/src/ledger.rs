//! Fungible token boundary
//!
//! The contracts never own token balances themselves; they move funds through
//! a [`FungibleLedger`]. [`InMemoryLedger`] is a self-contained implementation
//! with balance tracking by (token, account), allowances and a single minter
//! per token, suitable for tests and simulations.

use std::collections::HashMap;
use types::ids::{AccountId, TokenId};
use types::numeric::Amount;

use crate::errors::TokenError;

/// Fungible token operations consumed by the contracts.
///
/// Implementations must be atomic: a failed call leaves every balance and
/// allowance untouched. Zero-amount transfers succeed without effect.
pub trait FungibleLedger {
    fn balance_of(&self, token: &TokenId, owner: &AccountId) -> Amount;

    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Create `amount` new units for `to`. Only the token's minter may call.
    fn mint(
        &mut self,
        token: &TokenId,
        minter: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `from`'s own funds. `from` is the authenticated caller.
    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move funds on `from`'s behalf, consuming `spender`'s allowance.
    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

/// In-memory multi-token ledger.
///
/// Balances are stored as `HashMap<TokenId, HashMap<AccountId, Amount>>`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Balances: token -> (account -> amount)
    balances: HashMap<TokenId, HashMap<AccountId, Amount>>,
    /// Allowances: (token, owner, spender) -> amount
    allowances: HashMap<(TokenId, AccountId, AccountId), Amount>,
    /// Sole account allowed to mint each token
    minters: HashMap<TokenId, AccountId>,
    total_supply: HashMap<TokenId, Amount>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token with its minter. Re-registering keeps balances and
    /// replaces the minter.
    pub fn create_token(&mut self, token: TokenId, minter: AccountId) {
        self.balances.entry(token.clone()).or_default();
        self.total_supply.entry(token.clone()).or_insert(0);
        self.minters.insert(token, minter);
    }

    /// Hand minting rights to another account (e.g. the vault custody).
    pub fn set_minter(
        &mut self,
        token: &TokenId,
        current: &AccountId,
        new_minter: AccountId,
    ) -> Result<(), TokenError> {
        let minter = self.minter_mut(token)?;
        if *minter != *current {
            return Err(TokenError::NotMinter {
                token: token.clone(),
                caller: *current,
            });
        }
        *minter = new_minter;
        Ok(())
    }

    pub fn total_supply(&self, token: &TokenId) -> Amount {
        self.total_supply.get(token).copied().unwrap_or(0)
    }

    fn minter_mut(&mut self, token: &TokenId) -> Result<&mut AccountId, TokenError> {
        self.minters
            .get_mut(token)
            .ok_or_else(|| TokenError::UnknownToken {
                token: token.clone(),
            })
    }

    fn token_balances(
        &mut self,
        token: &TokenId,
    ) -> Result<&mut HashMap<AccountId, Amount>, TokenError> {
        self.balances
            .get_mut(token)
            .ok_or_else(|| TokenError::UnknownToken {
                token: token.clone(),
            })
    }

    /// Debit `from` and credit `to`, checking both sides before writing.
    fn move_balance(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let balances = self.token_balances(token)?;
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                token: token.clone(),
                required: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        balances.insert(*from, available - amount);
        balances.insert(*to, credited);
        Ok(())
    }
}

impl FungibleLedger for InMemoryLedger {
    fn balance_of(&self, token: &TokenId, owner: &AccountId) -> Amount {
        self.balances
            .get(token)
            .and_then(|accounts| accounts.get(owner))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(token.clone(), *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn mint(
        &mut self,
        token: &TokenId,
        minter: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if *self.minter_mut(token)? != *minter {
            return Err(TokenError::NotMinter {
                token: token.clone(),
                caller: *minter,
            });
        }

        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balances = self.token_balances(token)?;
        let current = balances.get(to).copied().unwrap_or(0);
        let credited = current.checked_add(amount).ok_or(TokenError::Overflow)?;

        balances.insert(*to, credited);
        self.total_supply.insert(token.clone(), supply);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.move_balance(token, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(token, from, spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                token: token.clone(),
                required: amount,
                approved,
            });
        }

        self.move_balance(token, from, to, amount)?;
        self.allowances
            .insert((token.clone(), *from, *spender), approved - amount);
        Ok(())
    }

    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.token_balances(token)?;
        self.allowances
            .insert((token.clone(), *owner, *spender), amount);
        Ok(())
    }
}
