//! Fungible token ledger interface and in-memory implementation.
//!
//! The escrow, controller and distributor never own token balances
//! directly; they move tokens through a [`TokenLedger`] supplied per call.
//! [`MemoryLedger`] is suitable for tests and embedding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::types::{AccountId, Amount, TokenId};

/// Balance, transfer and approval semantics of a multi-token ledger.
pub trait TokenLedger {
    fn balance_of(&self, token: TokenId, account: &AccountId) -> Amount;

    fn allowance(&self, token: TokenId, owner: &AccountId, spender: &AccountId) -> Amount;

    fn approve(
        &mut self,
        token: TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::ZeroAddress`] if either side is the zero address
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    fn transfer(
        &mut self,
        token: TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. An allowance of `Amount::MAX` is never decremented.
    fn transfer_from(
        &mut self,
        token: TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct MemoryLedger {
    balances: BTreeMap<(TokenId, AccountId), Amount>,
    allowances: BTreeMap<(TokenId, AccountId, AccountId), Amount>,
    supply: BTreeMap<TokenId, Amount>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens for `to`.
    pub fn mint(&mut self, token: TokenId, to: &AccountId, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self.supply.entry(token).or_default();
        *supply = supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let bal = self.balances.entry((token, *to)).or_default();
        *bal = bal.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    pub fn total_supply(&self, token: TokenId) -> Amount {
        self.supply.get(&token).copied().unwrap_or(0)
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, token: TokenId, account: &AccountId) -> Amount {
        self.balances.get(&(token, *account)).copied().unwrap_or(0)
    }

    fn allowance(&self, token: TokenId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances.get(&(token, *owner, *spender)).copied().unwrap_or(0)
    }

    fn approve(
        &mut self,
        token: TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if owner.is_zero() || spender.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        self.allowances.insert((token, *owner, *spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if from.is_zero() || to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let have = self.balance_of(token, from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }
        if amount == 0 || from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.balances.insert((token, *from), have - amount);
        self.balances.insert((token, *to), credited);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { have: allowed, need: amount });
        }
        self.transfer(token, from, to, amount)?;
        if allowed != Amount::MAX {
            self.allowances.insert((token, *from, *spender), allowed - amount);
        }
        Ok(())
    }
}
