//! Revenue intake: how tokens held by the distributor become revenue.
//!
//! A [`RevenueIntake::Direct`] distributor receives the revenue token as-is.
//! A [`RevenueIntake::Reserve`] distributor receives some input token and
//! deposits it into a reserve pool, which pays out the revenue token at a
//! fixed rate.

use serde::{Deserialize, Serialize};
use tracing::debug;

use wane_core::error::{FeeError, TokenError};
use wane_core::ledger::TokenLedger;
use wane_core::math::apply_bps;
use wane_core::types::{AccountId, Amount, TokenId};

/// How much of a held balance to settle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum DepositAmount {
    /// Everything the holder has.
    All,
    Exact(Amount),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum RevenueIntake {
    /// Revenue arrives already denominated in the revenue token.
    Direct,
    /// Revenue arrives as `input` and is swapped through `pool`, which pays
    /// `rate_bps / 10_000` revenue tokens per input token.
    Reserve { input: TokenId, pool: AccountId, rate_bps: u64 },
}

impl RevenueIntake {
    /// Tokens other than the revenue token that this intake may hold.
    pub fn input_token(&self) -> Option<TokenId> {
        match self {
            RevenueIntake::Direct => None,
            RevenueIntake::Reserve { input, .. } => Some(*input),
        }
    }

    /// Settle `amount` of `token` held by `holder` into `revenue`.
    /// Returns the revenue-token amount produced.
    ///
    /// # Errors
    ///
    /// - [`FeeError::UnsupportedOperation`] if this intake cannot settle `token`
    /// - [`FeeError::NothingToDistribute`] if the resolved amount is zero
    /// - [`FeeError::Token`] if `holder` or the pool lacks the balance
    pub fn distribute(
        &self,
        ledger: &mut dyn TokenLedger,
        token: TokenId,
        holder: &AccountId,
        revenue: TokenId,
        amount: DepositAmount,
    ) -> Result<Amount, FeeError> {
        match self {
            RevenueIntake::Direct => {
                if token != revenue {
                    return Err(FeeError::UnsupportedOperation(format!(
                        "direct intake cannot settle {token}"
                    )));
                }
                resolve(ledger, token, holder, amount)
            }
            RevenueIntake::Reserve { input, pool, rate_bps } => {
                if token != *input {
                    return Err(FeeError::UnsupportedOperation(format!(
                        "reserve intake only settles {input}, got {token}"
                    )));
                }
                let amount = resolve(ledger, token, holder, amount)?;
                let out = apply_bps(amount, *rate_bps).ok_or(FeeError::ArithmeticOverflow)?;
                let pool_balance = ledger.balance_of(revenue, pool);
                if pool_balance < out {
                    return Err(TokenError::InsufficientBalance { have: pool_balance, need: out }.into());
                }
                ledger.transfer(token, holder, pool, amount)?;
                ledger.transfer(revenue, pool, holder, out)?;
                debug!(%token, %pool, amount, out, "deposited into reserve");
                Ok(out)
            }
        }
    }
}

fn resolve(
    ledger: &dyn TokenLedger,
    token: TokenId,
    holder: &AccountId,
    amount: DepositAmount,
) -> Result<Amount, FeeError> {
    let balance = ledger.balance_of(token, holder);
    let amount = match amount {
        DepositAmount::All => balance,
        DepositAmount::Exact(n) => n,
    };
    if amount == 0 {
        return Err(FeeError::NothingToDistribute);
    }
    if amount > balance {
        return Err(TokenError::InsufficientBalance { have: balance, need: amount }.into());
    }
    Ok(amount)
}
