// Treasury collaborator.
//
// The governor performs at most one withdrawal per approved proposal. The
// treasury holds its own pool of collateral; a successful withdrawal credits
// the recipient's ledger account through the injected closure so the treasury
// never touches ledger internals.

use serde::{Deserialize, Serialize};

use crate::errors::ErrorKind;

#[derive(Debug, Clone, PartialEq)]
pub enum TreasuryError {
    InvalidAmount(f64),
    InsufficientFunds { available: f64, requested: f64 },
}

impl std::fmt::Display for TreasuryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreasuryError::InvalidAmount(amt) => write!(f, "Invalid amount: {}", amt),
            TreasuryError::InsufficientFunds { available, requested } => write!(
                f,
                "Insufficient treasury funds: have {}, need {}",
                available, requested
            ),
        }
    }
}

impl std::error::Error for TreasuryError {}

impl TreasuryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreasuryError::InvalidAmount(_) => ErrorKind::Validation,
            TreasuryError::InsufficientFunds { .. } => ErrorKind::Economic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasury {
    balance: f64,
}

impl Treasury {
    pub fn new(initial_balance: f64) -> Self {
        Self { balance: initial_balance }
    }

    pub fn available(&self) -> f64 {
        self.balance
    }

    pub fn deposit(&mut self, amount: f64) {
        if amount > 0.0 && amount.is_finite() {
            self.balance += amount;
        }
    }

    /// Debit the treasury and hand the amount to the recipient via `credit`.
    ///
    /// The single atomic debit per approved proposal; fails whole on
    /// shortfall with no state change.
    pub fn withdraw<F>(
        &mut self,
        recipient: &str,
        amount: f64,
        credit: F,
    ) -> Result<(), TreasuryError>
    where
        F: FnOnce(&str, f64),
    {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(TreasuryError::InvalidAmount(amount));
        }
        if self.balance < amount {
            return Err(TreasuryError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        credit(recipient, amount);
        Ok(())
    }
}
