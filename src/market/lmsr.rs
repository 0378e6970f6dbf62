// ============================================================================
// LMSR Bonding Curve
// ============================================================================
//
// Logarithmic market scoring rule for a binary PASS/FAIL market:
//
//   C(q_pass, q_fail) = b * ln(exp(q_pass/b) + exp(q_fail/b))
//
//   price(side) = dC/dq_side, strictly inside (0,1), both prices sum to 1
//
// Buying D of one side costs C(q') - C(q) in collateral; selling pays the
// same difference back. The cost function is evaluated with a max-shifted
// log-sum-exp so large q/b ratios cannot overflow.
//
// The worst case the pool can ever pay out beyond what it collected is
// b * ln(2), so a market must be seeded with at least that much collateral.
//
// ============================================================================

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::conditional::Side;

/// Decimal places of the collateral asset. Monetary results of curve
/// evaluations are quantized to this scale, always rounding in the pool's
/// favor: buy costs up, sell proceeds down.
pub const COLLATERAL_DP: u32 = 6;

/// Quantize a buy cost (round up at the collateral scale).
pub fn quantize_cost(value: f64) -> f64 {
    quantize(value, RoundingStrategy::ToPositiveInfinity)
}

/// Quantize sell proceeds or a payout (round down at the collateral scale).
pub fn quantize_payout(value: f64) -> f64 {
    quantize(value, RoundingStrategy::ToNegativeInfinity)
}

fn quantize(value: f64, strategy: RoundingStrategy) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(COLLATERAL_DP, strategy))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
        .max(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LmsrError {
    InvalidLiquidityParam(f64),
    InvalidAmount(f64),
}

impl std::fmt::Display for LmsrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LmsrError::InvalidLiquidityParam(b) => write!(f, "Invalid liquidity parameter: {}", b),
            LmsrError::InvalidAmount(amt) => write!(f, "Invalid trade amount: {}", amt),
        }
    }
}

impl std::error::Error for LmsrError {}

/// LMSR pool state: liquidity parameter plus net quantities issued per side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmsrPool {
    pub b: f64,
    pub q_pass: f64,
    pub q_fail: f64,
}

impl LmsrPool {
    pub fn new(b: f64) -> Result<Self, LmsrError> {
        if b <= 0.0 || !b.is_finite() {
            return Err(LmsrError::InvalidLiquidityParam(b));
        }
        Ok(Self { b, q_pass: 0.0, q_fail: 0.0 })
    }

    /// Minimum seed collateral: the pool's bounded worst-case subsidy.
    pub fn max_subsidy(&self) -> f64 {
        self.b * std::f64::consts::LN_2
    }

    fn cost_at(&self, q_pass: f64, q_fail: f64) -> f64 {
        // max-shift keeps the exponents <= 0
        let m = q_pass.max(q_fail);
        let sum = ((q_pass - m) / self.b).exp() + ((q_fail - m) / self.b).exp();
        m + self.b * sum.ln()
    }

    /// Current value of the cost function.
    pub fn cost(&self) -> f64 {
        self.cost_at(self.q_pass, self.q_fail)
    }

    /// Instantaneous price of one side, strictly inside (0,1).
    pub fn price(&self, side: Side) -> f64 {
        let m = self.q_pass.max(self.q_fail);
        let e_pass = ((self.q_pass - m) / self.b).exp();
        let e_fail = ((self.q_fail - m) / self.b).exp();
        match side {
            Side::Pass => e_pass / (e_pass + e_fail),
            Side::Fail => e_fail / (e_pass + e_fail),
        }
    }

    /// (pass price, fail price); the pair sums to 1 up to rounding.
    pub fn prices(&self) -> (f64, f64) {
        (self.price(Side::Pass), self.price(Side::Fail))
    }

    fn shifted(&self, side: Side, delta: f64) -> (f64, f64) {
        match side {
            Side::Pass => (self.q_pass + delta, self.q_fail),
            Side::Fail => (self.q_pass, self.q_fail + delta),
        }
    }

    /// Collateral charged for buying `amount` of `side`.
    pub fn buy_cost(&self, side: Side, amount: f64) -> Result<f64, LmsrError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(LmsrError::InvalidAmount(amount));
        }
        let (q_pass, q_fail) = self.shifted(side, amount);
        Ok(quantize_cost(self.cost_at(q_pass, q_fail) - self.cost()))
    }

    /// Collateral paid out for selling `amount` of `side` back to the pool.
    pub fn sell_proceeds(&self, side: Side, amount: f64) -> Result<f64, LmsrError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(LmsrError::InvalidAmount(amount));
        }
        let (q_pass, q_fail) = self.shifted(side, -amount);
        Ok(quantize_payout(self.cost() - self.cost_at(q_pass, q_fail)))
    }

    pub fn apply_buy(&mut self, side: Side, amount: f64) {
        match side {
            Side::Pass => self.q_pass += amount,
            Side::Fail => self.q_fail += amount,
        }
    }

    pub fn apply_sell(&mut self, side: Side, amount: f64) {
        match side {
            Side::Pass => self.q_pass -= amount,
            Side::Fail => self.q_fail -= amount,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
