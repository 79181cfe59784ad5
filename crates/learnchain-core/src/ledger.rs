//! Ledger: fungible token balances per account.
//!
//! The ledger is the leaf of the state machine. It knows nothing about
//! skills or sessions; it only moves and issues tokens. Every mutating
//! method checks all preconditions before touching a balance, so a failed
//! call leaves the ledger exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::types::{Address, Amount};

/// Descriptive token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenInfo {
    fn default() -> Self {
        Self {
            name: "LearnToken".to_string(),
            symbol: "LEARN".to_string(),
            decimals: 18,
        }
    }
}

impl TokenInfo {
    /// Render a smallest-unit amount as a decimal string using `decimals`.
    pub fn format(&self, amount: Amount) -> String {
        format_units(amount, self.decimals)
    }
}

/// Render `amount` as a decimal with `decimals` fractional digits.
///
/// Trailing fractional zeros are trimmed, but at least one fractional
/// digit is kept: `format_units(1_500, 3) == "1.5"`, `format_units(2_000, 3) == "2.0"`.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let digits = amount.to_string();
    let decimals = decimals as usize;
    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };
    let trimmed = frac_part.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{}.0", int_part)
    } else {
        format!("{}.{}", int_part, trimmed)
    }
}

/// Balance book keyed by account.
///
/// Accounts come into existence on first credit and are never removed.
#[derive(Debug, Clone)]
pub struct Ledger {
    balances: BTreeMap<Address, Amount>,
    issuer: Address,
    total_supply: Amount,
}

impl Ledger {
    /// Create an empty ledger whose only minting authority is `issuer`.
    pub fn new(issuer: Address) -> Self {
        Self {
            balances: BTreeMap::new(),
            issuer,
            total_supply: 0,
        }
    }

    /// The account allowed to mint.
    pub fn issuer(&self) -> Address {
        self.issuer
    }

    /// Total amount ever minted.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account (zero for unknown accounts).
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// All accounts with their balances, in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Sum of every balance.
    pub fn total_balances(&self) -> Amount {
        self.balances.values().sum()
    }

    /// Fail with `InsufficientBalance` unless `account` holds at least `amount`.
    pub fn ensure_funds(&self, account: &Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(PlatformError::InsufficientBalance {
                account: *account,
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Fail with `Overflow` if crediting `amount` to `account` would overflow.
    pub fn ensure_credit_fits(&self, account: &Address, amount: Amount) -> Result<()> {
        self.balance_of(account)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(PlatformError::Overflow("balance"))
    }

    /// Fail with `Overflow` if minting `amount` to `to` would overflow.
    pub fn ensure_mint_fits(&self, to: &Address, amount: Amount) -> Result<()> {
        self.total_supply
            .checked_add(amount)
            .ok_or(PlatformError::Overflow("total_supply"))?;
        self.ensure_credit_fits(to, amount)
    }

    /// Increase an account's balance.
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(PlatformError::InvalidAmount(amount));
        }
        let updated = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or(PlatformError::Overflow("balance"))?;
        self.balances.insert(*account, updated);
        Ok(())
    }

    /// Decrease an account's balance.
    pub fn debit(&mut self, account: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(PlatformError::InvalidAmount(amount));
        }
        self.ensure_funds(account, amount)?;
        let updated = self.balance_of(account) - amount;
        self.balances.insert(*account, updated);
        Ok(())
    }

    /// Move `amount` from one account to another, atomically.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(PlatformError::InvalidAmount(amount));
        }
        self.ensure_funds(from, amount)?;
        if from == to {
            return Ok(());
        }
        // Overflow on the receiving side must be caught before the debit.
        self.ensure_credit_fits(to, amount)?;

        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Issue new tokens to `to`. Only the issuer may mint.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<()> {
        if *caller != self.issuer {
            return Err(PlatformError::Unauthorized {
                caller: *caller,
                action: "mint",
            });
        }
        if amount == 0 {
            return Err(PlatformError::InvalidAmount(amount));
        }
        self.ensure_mint_fits(to, amount)?;
        self.credit(to, amount)?;
        self.total_supply += amount;
        Ok(())
    }
}
