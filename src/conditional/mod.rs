// ============================================================================
// Conditional Position Ledger
// ============================================================================
//
// Outcome positions for conditional markets. A position represents ownership
// of one outcome of a prepared condition.
//
// Core Invariant:
//   1 PASS position + 1 FAIL position = 1 unit of collateral (always)
//
// Positions are minted and burned only in complementary pairs (split/merge)
// while the condition is live, so total PASS supply always equals total FAIL
// supply before resolution. After the condition's oracle reports payout
// numerators, single-sided redemption pays out proportionally.
//
// ============================================================================

pub mod redeem;
pub mod split;

pub use redeem::*;
pub use split::*;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::errors::ErrorKind;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of outcome slots every condition carries. Markets here are strictly
/// binary: PASS and FAIL.
pub const OUTCOME_SLOT_COUNT: usize = 2;

// ============================================================================
// SIDE
// ============================================================================

/// One of the two outcomes of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pass,
    Fail,
}

impl Side {
    pub fn index(&self) -> usize {
        match self {
            Side::Pass => 0,
            Side::Fail => 1,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Pass => Side::Fail,
            Side::Fail => Side::Pass,
        }
    }

    pub fn from_index(index: usize) -> Option<Side> {
        match index {
            0 => Some(Side::Pass),
            1 => Some(Side::Fail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Pass => write!(f, "pass"),
            Side::Fail => write!(f, "fail"),
        }
    }
}

// ============================================================================
// CONDITION
// ============================================================================

/// A prepared condition: the question a market's positions settle against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Deterministic identifier, see [`condition_id`].
    pub id: String,

    /// Account allowed to report payouts. For markets this is always the
    /// market controller's reporting identity.
    pub oracle_ref: String,

    /// Opaque question identifier (e.g. "proposal:42").
    pub question_id: String,

    pub outcome_slot_count: usize,

    /// Set exactly once by `report_payouts`. `[1,0]` pass wins, `[0,1]` fail
    /// wins, `[1,1]` tie.
    pub payout_numerators: Option<[u32; 2]>,

    pub resolved: bool,
}

/// Deterministic condition identifier from its defining inputs.
pub fn condition_id(oracle_ref: &str, question_id: &str, outcome_slot_count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"condition");
    hasher.update(oracle_ref.as_bytes());
    hasher.update(question_id.as_bytes());
    hasher.update(outcome_slot_count.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Deterministic position identifier from `(condition, outcome index)`.
pub fn position_id(condition_id: &str, side: Side) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"position");
    hasher.update(condition_id.as_bytes());
    hasher.update(side.index().to_be_bytes());
    hex::encode(hasher.finalize())
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalError {
    UnknownCondition(String),
    ConditionExists(String),
    InvalidOutcomeCount(usize),
    InvalidAmount(f64),
    NotOracle { condition_id: String, caller: String },
    AlreadyResolved(String),
    NotResolved(String),
    InsufficientPosition { side: Side, available: f64, requested: f64 },
    Collateral(String),
}

impl std::fmt::Display for ConditionalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionalError::UnknownCondition(id) => write!(f, "Unknown condition: {}", id),
            ConditionalError::ConditionExists(id) => {
                write!(f, "Condition already prepared: {}", id)
            }
            ConditionalError::InvalidOutcomeCount(n) => {
                write!(f, "Unsupported outcome slot count: {}", n)
            }
            ConditionalError::InvalidAmount(amt) => write!(f, "Invalid amount: {}", amt),
            ConditionalError::NotOracle { condition_id, caller } => write!(
                f,
                "{} is not the oracle for condition {}",
                caller, condition_id
            ),
            ConditionalError::AlreadyResolved(id) => {
                write!(f, "Condition already resolved: {}", id)
            }
            ConditionalError::NotResolved(id) => write!(f, "Condition not resolved: {}", id),
            ConditionalError::InsufficientPosition { side, available, requested } => write!(
                f,
                "Insufficient {} position: have {}, need {}",
                side, available, requested
            ),
            ConditionalError::Collateral(msg) => write!(f, "Collateral movement failed: {}", msg),
        }
    }
}

impl std::error::Error for ConditionalError {}

impl ConditionalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConditionalError::UnknownCondition(_)
            | ConditionalError::InvalidOutcomeCount(_)
            | ConditionalError::InvalidAmount(_)
            | ConditionalError::NotResolved(_) => ErrorKind::Validation,
            ConditionalError::ConditionExists(_) | ConditionalError::AlreadyResolved(_) => {
                ErrorKind::Duplicate
            }
            ConditionalError::NotOracle { .. } => ErrorKind::Authorization,
            ConditionalError::InsufficientPosition { .. } | ConditionalError::Collateral(_) => {
                ErrorKind::Economic
            }
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Summary of one holding, for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionInfo {
    pub condition_id: String,
    pub position_id: String,
    pub side: Side,
    pub amount: f64,
}

/// Conditions plus per-owner position balances plus per-condition escrow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionalLedger {
    /// condition id -> condition
    pub conditions: HashMap<String, Condition>,

    /// (owner, position id) -> balance
    balances: HashMap<(String, String), f64>,

    /// condition id -> collateral locked 1:1 against outstanding pairs
    escrow: HashMap<String, f64>,
}

impl ConditionalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a condition. Fails if the same inputs were already prepared.
    pub fn prepare_condition(
        &mut self,
        oracle_ref: &str,
        question_id: &str,
        outcome_slot_count: usize,
    ) -> Result<String, ConditionalError> {
        if outcome_slot_count != OUTCOME_SLOT_COUNT {
            return Err(ConditionalError::InvalidOutcomeCount(outcome_slot_count));
        }

        let id = condition_id(oracle_ref, question_id, outcome_slot_count);
        if self.conditions.contains_key(&id) {
            return Err(ConditionalError::ConditionExists(id));
        }

        self.conditions.insert(
            id.clone(),
            Condition {
                id: id.clone(),
                oracle_ref: oracle_ref.to_string(),
                question_id: question_id.to_string(),
                outcome_slot_count,
                payout_numerators: None,
                resolved: false,
            },
        );
        Ok(id)
    }

    pub fn condition(&self, condition_id: &str) -> Option<&Condition> {
        self.conditions.get(condition_id)
    }

    fn require_condition(&self, condition_id: &str) -> Result<&Condition, ConditionalError> {
        self.conditions
            .get(condition_id)
            .ok_or_else(|| ConditionalError::UnknownCondition(condition_id.to_string()))
    }

    pub fn balance(&self, owner: &str, condition_id: &str, side: Side) -> f64 {
        let pid = position_id(condition_id, side);
        self.balances
            .get(&(owner.to_string(), pid))
            .copied()
            .unwrap_or(0.0)
    }

    pub(crate) fn credit_position(&mut self, owner: &str, condition_id: &str, side: Side, amount: f64) {
        let pid = position_id(condition_id, side);
        *self
            .balances
            .entry((owner.to_string(), pid))
            .or_insert(0.0) += amount;
    }

    pub(crate) fn debit_position(
        &mut self,
        owner: &str,
        condition_id: &str,
        side: Side,
        amount: f64,
    ) -> Result<(), ConditionalError> {
        let available = self.balance(owner, condition_id, side);
        if available < amount {
            return Err(ConditionalError::InsufficientPosition {
                side,
                available,
                requested: amount,
            });
        }
        let pid = position_id(condition_id, side);
        *self
            .balances
            .entry((owner.to_string(), pid))
            .or_insert(0.0) -= amount;
        Ok(())
    }

    /// Move `amount` of one outcome position between owners.
    pub fn transfer_position(
        &mut self,
        from: &str,
        to: &str,
        condition_id: &str,
        side: Side,
        amount: f64,
    ) -> Result<(), ConditionalError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(ConditionalError::InvalidAmount(amount));
        }
        self.require_condition(condition_id)?;
        self.debit_position(from, condition_id, side, amount)?;
        self.credit_position(to, condition_id, side, amount);
        Ok(())
    }

    /// Report payout numerators. Only the condition's oracle, exactly once.
    pub fn report_payouts(
        &mut self,
        caller: &str,
        condition_id: &str,
        numerators: [u32; 2],
    ) -> Result<(), ConditionalError> {
        let condition = self
            .conditions
            .get_mut(condition_id)
            .ok_or_else(|| ConditionalError::UnknownCondition(condition_id.to_string()))?;

        if condition.oracle_ref != caller {
            return Err(ConditionalError::NotOracle {
                condition_id: condition_id.to_string(),
                caller: caller.to_string(),
            });
        }
        if condition.resolved {
            return Err(ConditionalError::AlreadyResolved(condition_id.to_string()));
        }

        condition.payout_numerators = Some(numerators);
        condition.resolved = true;

        tracing::info!(
            condition = condition_id,
            pass = numerators[0],
            fail = numerators[1],
            "condition resolved"
        );
        Ok(())
    }

    /// Collateral locked against a condition's outstanding pairs.
    pub fn escrowed(&self, condition_id: &str) -> f64 {
        self.escrow.get(condition_id).copied().unwrap_or(0.0)
    }

    pub(crate) fn add_escrow(&mut self, condition_id: &str, amount: f64) {
        *self.escrow.entry(condition_id.to_string()).or_insert(0.0) += amount;
    }

    pub(crate) fn release_escrow(&mut self, condition_id: &str, amount: f64) {
        let entry = self.escrow.entry(condition_id.to_string()).or_insert(0.0);
        *entry = (*entry - amount).max(0.0);
    }

    /// Outstanding supply of one side across all owners.
    pub fn total_supply(&self, condition_id: &str, side: Side) -> f64 {
        let pid = position_id(condition_id, side);
        self.balances
            .iter()
            .filter(|((_, p), _)| *p == pid)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// All non-empty holdings of an owner.
    pub fn positions_of(&self, owner: &str) -> Vec<PositionInfo> {
        let mut out = Vec::new();
        for condition in self.conditions.values() {
            for side in [Side::Pass, Side::Fail] {
                let amount = self.balance(owner, &condition.id, side);
                if amount > 0.0 {
                    out.push(PositionInfo {
                        condition_id: condition.id.clone(),
                        position_id: position_id(&condition.id, side),
                        side,
                        amount,
                    });
                }
            }
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
