/// Collateral Ledger
///
/// Account-keyed balances of the collateral asset, shared by every subsystem:
/// traders pay LMSR costs from here, splits escrow against it, oracle bonds
/// are posted from it, and treasury grants land back in it.
///
/// The ledger is a leaf component. It never inspects markets, conditions, or
/// proposals; callers move value and record what the movement was for.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ErrorKind;

// ============================================================================
// TRANSACTION LOG
// ============================================================================

/// What a ledger movement was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Faucet,
    Transfer,
    Split,
    Merge,
    Redeem,
    TradeBuy,
    TradeSell,
    BondPost,
    BondPayout,
    TreasuryTransfer,
}

/// A single recorded movement of collateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTx {
    pub id: String,
    pub tx_type: TxType,
    pub from: String,
    pub to: Option<String>,
    pub amount: f64,
    /// Market this movement belongs to, when there is one.
    pub market_id: Option<u64>,
    pub timestamp: u64,
    pub memo: Option<String>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    InvalidAmount(f64),
    InsufficientBalance { account: String, available: f64, requested: f64 },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::InvalidAmount(amt) => write!(f, "Invalid amount: {}", amt),
            LedgerError::InsufficientBalance { account, available, requested } => write!(
                f,
                "Insufficient balance for {}: have {}, need {}",
                account, available, requested
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_) => ErrorKind::Validation,
            LedgerError::InsufficientBalance { .. } => ErrorKind::Economic,
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Collateral balances plus the typed transaction log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralLedger {
    /// account -> spendable balance
    pub accounts: HashMap<String, f64>,

    /// Every recorded movement, oldest first.
    pub transactions: Vec<LedgerTx>,
}

impl CollateralLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &str) -> f64 {
        self.accounts.get(account).copied().unwrap_or(0.0)
    }

    /// Credit collateral to an account, creating it if unknown.
    pub fn credit(&mut self, account: &str, amount: f64) -> Result<(), LedgerError> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        *self.accounts.entry(account.to_string()).or_insert(0.0) += amount;
        Ok(())
    }

    /// Debit collateral from an account. Fails without mutating on shortfall.
    pub fn debit(&mut self, account: &str, amount: f64) -> Result<(), LedgerError> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let available = self.balance(account);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.to_string(),
                available,
                requested: amount,
            });
        }
        *self.accounts.entry(account.to_string()).or_insert(0.0) -= amount;
        Ok(())
    }

    /// Move collateral between two accounts as one atomic step.
    pub fn transfer(&mut self, from: &str, to: &str, amount: f64) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        // credit cannot fail once the debit has validated the amount
        self.credit(to, amount)
    }

    /// Append a movement to the transaction log. Returns the tx id.
    pub fn record(
        &mut self,
        tx_type: TxType,
        from: &str,
        to: Option<&str>,
        amount: f64,
        market_id: Option<u64>,
        timestamp: u64,
        memo: Option<String>,
    ) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.transactions.push(LedgerTx {
            id: id.clone(),
            tx_type,
            from: from.to_string(),
            to: to.map(|s| s.to_string()),
            amount,
            market_id,
            timestamp,
            memo,
        });
        id
    }

    /// All movements touching an account, oldest first.
    pub fn transactions_for(&self, account: &str) -> Vec<&LedgerTx> {
        self.transactions
            .iter()
            .filter(|tx| tx.from == account || tx.to.as_deref() == Some(account))
            .collect()
    }

    /// Total collateral held across all accounts.
    pub fn total_supply(&self) -> f64 {
        self.accounts.values().sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================
