// ============================================================================
// Market Lifecycle Controller
// ============================================================================
//
// Owns the Market records and drives their state machine:
//
//   Active -> TradingEnded -> Resolved
//   Active -> Cancelled
//
// No other transition is legal, and the only mutation path is the single
// `Market::advance` function. Each market escrows its collateral and outcome
// inventory under its own account (`market:{id}`), and the controller is the
// sole oracle allowed to report payouts for conditions it prepares.
//
// ============================================================================

pub mod lmsr;

pub use lmsr::{LmsrError, LmsrPool, COLLATERAL_DP};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::access::{Capability, CapabilityRegistry, NullificationRegistry};
use crate::clock::Clock;
use crate::conditional::{
    execute_merge, execute_split, ConditionalError, ConditionalLedger, Side, OUTCOME_SLOT_COUNT,
};
use crate::errors::ErrorKind;
use crate::ledger::{CollateralLedger, LedgerError, TxType};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Reporting identity under which the controller prepares and resolves
/// conditions. Nothing else may report payouts for market conditions.
pub const CONTROLLER_ORACLE_REF: &str = "market-controller";

/// Sentinel for "this proposal has no market". Market ids are allocated from
/// zero, so the first market's id collides with the sentinel; the duplicate
/// check cannot see a market whose id is 0. Preserved as observed upstream.
pub const NO_MARKET: u64 = 0;

pub const MIN_TRADING_PERIOD_SECS: u64 = 2 * 24 * 60 * 60;
pub const MAX_TRADING_PERIOD_SECS: u64 = 21 * 24 * 60 * 60;

/// Escrow account that holds a market's collateral and outcome inventory.
pub fn market_account(market_id: u64) -> String {
    format!("market:{}", market_id)
}

// ============================================================================
// STATUS
// ============================================================================

/// Market lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Trading is live until `trading_end_time`.
    Active,
    /// Trading closed, awaiting resolution values.
    TradingEnded,
    /// Payouts reported, positions redeemable.
    Resolved,
    /// Terminated from Active with no payout.
    Cancelled,
}

impl MarketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketStatus::Resolved | MarketStatus::Cancelled)
    }

    fn can_transition_to(self, next: MarketStatus) -> bool {
        matches!(
            (self, next),
            (MarketStatus::Active, MarketStatus::TradingEnded)
                | (MarketStatus::Active, MarketStatus::Cancelled)
                | (MarketStatus::TradingEnded, MarketStatus::Resolved)
        )
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketStatus::Active => "active",
            MarketStatus::TradingEnded => "trading_ended",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// What the conditional values measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    WelfareMetric,
    TokenPrice,
    ProtocolRevenue,
}

impl Default for BetType {
    fn default() -> Self {
        BetType::WelfareMetric
    }
}

// ============================================================================
// MARKET
// ============================================================================

/// A conditional market pair for one proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub proposal_id: u64,
    pub collateral_asset: String,
    pub pool: LmsrPool,
    /// Collateral currently escrowed under the market account.
    pub total_liquidity: f64,
    pub trading_end_time: u64,
    pub status: MarketStatus,
    pub bet_type: BetType,
    pub condition_id: String,
    pub pass_position_id: String,
    pub fail_position_id: String,
    pub pass_value: Option<f64>,
    pub fail_value: Option<f64>,
    pub resolved: bool,
    pub created_at: u64,
}

impl Market {
    /// The one authoritative status mutation. Illegal edges are rejected
    /// without touching the record.
    fn advance(&mut self, next: MarketStatus) -> Result<(), MarketError> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::IllegalTransition {
                market_id: self.id,
                from: self.status,
                to: next,
            });
        }
        tracing::info!(market = self.id, from = %self.status, to = %next, "market transition");
        self.status = next;
        Ok(())
    }
}

/// Result of a buy or sell, for callers and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReceipt {
    pub trade_id: String,
    pub market_id: u64,
    pub trader: String,
    pub side: Side,
    pub amount: f64,
    /// Collateral paid (buy) or received (sell).
    pub collateral: f64,
    pub price_pass: f64,
    pub price_fail: f64,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MarketError {
    Unauthorized(String),
    NotFound(u64),
    IllegalTransition { market_id: u64, from: MarketStatus, to: MarketStatus },
    TradingNotOver { now: u64, ends: u64 },
    TradingClosed { market_id: u64 },
    InvalidTradingPeriod { secs: u64 },
    InvalidLiquidity(f64),
    InvalidValue(f64),
    InsufficientSeed { required: f64, provided: f64 },
    DuplicateMarket { proposal_id: u64, existing: u64 },
    Nullified(String),
    InsufficientInventory { side: Side, available: f64, requested: f64 },
    Lmsr(LmsrError),
    Conditional(ConditionalError),
    Ledger(LedgerError),
}

impl std::fmt::Display for MarketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::Unauthorized(caller) => write!(f, "Unauthorized: {}", caller),
            MarketError::NotFound(id) => write!(f, "Market not found: {}", id),
            MarketError::IllegalTransition { market_id, from, to } => {
                write!(f, "Market {} cannot move {} -> {}", market_id, from, to)
            }
            MarketError::TradingNotOver { now, ends } => {
                write!(f, "Trading period still open: now {}, ends {}", now, ends)
            }
            MarketError::TradingClosed { market_id } => {
                write!(f, "Trading closed on market {}", market_id)
            }
            MarketError::InvalidTradingPeriod { secs } => {
                write!(f, "Trading period out of bounds: {} seconds", secs)
            }
            MarketError::InvalidLiquidity(amt) => write!(f, "Invalid liquidity amount: {}", amt),
            MarketError::InvalidValue(v) => write!(f, "Invalid resolution value: {}", v),
            MarketError::InsufficientSeed { required, provided } => write!(
                f,
                "Seed liquidity below bounded-loss minimum: need {}, got {}",
                required, provided
            ),
            MarketError::DuplicateMarket { proposal_id, existing } => write!(
                f,
                "Proposal {} already has market {}",
                proposal_id, existing
            ),
            MarketError::Nullified(what) => write!(f, "Nullified: {}", what),
            MarketError::InsufficientInventory { side, available, requested } => write!(
                f,
                "Market inventory short on {}: have {}, need {}",
                side, available, requested
            ),
            MarketError::Lmsr(e) => write!(f, "{}", e),
            MarketError::Conditional(e) => write!(f, "{}", e),
            MarketError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MarketError {}

impl From<LmsrError> for MarketError {
    fn from(e: LmsrError) -> Self {
        MarketError::Lmsr(e)
    }
}

impl From<ConditionalError> for MarketError {
    fn from(e: ConditionalError) -> Self {
        MarketError::Conditional(e)
    }
}

impl From<LedgerError> for MarketError {
    fn from(e: LedgerError) -> Self {
        MarketError::Ledger(e)
    }
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Unauthorized(_) | MarketError::Nullified(_) => ErrorKind::Authorization,
            MarketError::DuplicateMarket { .. } => ErrorKind::Duplicate,
            MarketError::InsufficientInventory { .. } => ErrorKind::Economic,
            MarketError::Conditional(e) => e.kind(),
            MarketError::Ledger(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// Parameters for deploying one market pair.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySpec {
    pub proposal_id: u64,
    pub collateral_asset: String,
    pub liquidity_amount: f64,
    pub liquidity_param: f64,
    pub trading_period_secs: u64,
    #[serde(default)]
    pub bet_type: BetType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketController {
    pub markets: HashMap<u64, Market>,
    /// proposal id -> market id, with [`NO_MARKET`] sentinel semantics.
    proposal_markets: HashMap<u64, u64>,
    next_market_id: u64,
}

impl MarketController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn market(&self, market_id: u64) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    fn require_market(&self, market_id: u64) -> Result<&Market, MarketError> {
        self.markets
            .get(&market_id)
            .ok_or(MarketError::NotFound(market_id))
    }

    /// Market linked to a proposal, or [`NO_MARKET`] when there is none.
    /// A real market with id 0 is indistinguishable from the sentinel.
    pub fn market_for_proposal(&self, proposal_id: u64) -> u64 {
        self.proposal_markets
            .get(&proposal_id)
            .copied()
            .unwrap_or(NO_MARKET)
    }

    /// Deploy a conditional market pair for a proposal.
    ///
    /// Prepares the condition, escrows the seed collateral from the caller,
    /// splits it into the market's PASS/FAIL inventory, and opens trading.
    pub fn deploy_market_pair(
        &mut self,
        ledger: &mut CollateralLedger,
        positions: &mut ConditionalLedger,
        capabilities: &CapabilityRegistry,
        clock: &dyn Clock,
        caller: &str,
        spec: &DeploySpec,
    ) -> Result<u64, MarketError> {
        if !capabilities.has_capability(caller, Capability::DeployMarket) {
            return Err(MarketError::Unauthorized(caller.to_string()));
        }
        if spec.liquidity_amount <= 0.0 || !spec.liquidity_amount.is_finite() {
            return Err(MarketError::InvalidLiquidity(spec.liquidity_amount));
        }
        if spec.trading_period_secs < MIN_TRADING_PERIOD_SECS
            || spec.trading_period_secs > MAX_TRADING_PERIOD_SECS
        {
            return Err(MarketError::InvalidTradingPeriod { secs: spec.trading_period_secs });
        }

        let existing = self.market_for_proposal(spec.proposal_id);
        if existing != NO_MARKET {
            return Err(MarketError::DuplicateMarket {
                proposal_id: spec.proposal_id,
                existing,
            });
        }

        let pool = LmsrPool::new(spec.liquidity_param)?;
        if spec.liquidity_amount < pool.max_subsidy() {
            return Err(MarketError::InsufficientSeed {
                required: pool.max_subsidy(),
                provided: spec.liquidity_amount,
            });
        }

        let available = ledger.balance(caller);
        if available < spec.liquidity_amount {
            return Err(MarketError::Ledger(LedgerError::InsufficientBalance {
                account: caller.to_string(),
                available,
                requested: spec.liquidity_amount,
            }));
        }

        let market_id = self.next_market_id;
        let account = market_account(market_id);
        let question_id = format!("proposal:{}", spec.proposal_id);
        let condition_id =
            positions.prepare_condition(CONTROLLER_ORACLE_REF, &question_id, OUTCOME_SLOT_COUNT)?;

        // balance was checked above; seed the market inventory
        ledger.transfer(caller, &account, spec.liquidity_amount)?;
        execute_split(positions, &account, &condition_id, spec.liquidity_amount, |acct, amt| {
            ledger.debit(acct, amt).map_err(|e| e.to_string())
        })?;

        let now = clock.now();
        ledger.record(
            TxType::Split,
            caller,
            Some(&account),
            spec.liquidity_amount,
            Some(market_id),
            now,
            Some("seed liquidity".to_string()),
        );

        let market = Market {
            id: market_id,
            proposal_id: spec.proposal_id,
            collateral_asset: spec.collateral_asset.clone(),
            pass_position_id: crate::conditional::position_id(&condition_id, Side::Pass),
            fail_position_id: crate::conditional::position_id(&condition_id, Side::Fail),
            condition_id,
            pool,
            total_liquidity: spec.liquidity_amount,
            trading_end_time: now + spec.trading_period_secs,
            status: MarketStatus::Active,
            bet_type: spec.bet_type,
            pass_value: None,
            fail_value: None,
            resolved: false,
            created_at: now,
        };

        tracing::info!(
            market = market_id,
            proposal = spec.proposal_id,
            b = spec.liquidity_param,
            seed = spec.liquidity_amount,
            "market deployed"
        );

        self.markets.insert(market_id, market);
        self.proposal_markets.insert(spec.proposal_id, market_id);
        self.next_market_id += 1;
        Ok(market_id)
    }

    fn check_tradeable(
        &self,
        nullification: &NullificationRegistry,
        clock: &dyn Clock,
        caller: &str,
        market_id: u64,
    ) -> Result<(), MarketError> {
        let market = self.require_market(market_id)?;
        if market.status != MarketStatus::Active {
            return Err(MarketError::TradingClosed { market_id });
        }
        if clock.now() >= market.trading_end_time {
            return Err(MarketError::TradingClosed { market_id });
        }
        if nullification.is_market_nullified(market_id) {
            return Err(MarketError::Nullified(format!("market {}", market_id)));
        }
        if nullification.is_address_nullified(caller) {
            return Err(MarketError::Nullified(format!("address {}", caller)));
        }
        Ok(())
    }

    /// Buy `amount` of one side at the LMSR cost.
    pub fn buy_tokens(
        &mut self,
        ledger: &mut CollateralLedger,
        positions: &mut ConditionalLedger,
        nullification: &NullificationRegistry,
        clock: &dyn Clock,
        caller: &str,
        market_id: u64,
        side: Side,
        amount: f64,
    ) -> Result<TradeReceipt, MarketError> {
        self.check_tradeable(nullification, clock, caller, market_id)?;

        let account = market_account(market_id);
        let (condition_id, cost) = {
            let market = self.require_market(market_id)?;
            (market.condition_id.clone(), market.pool.buy_cost(side, amount)?)
        };

        // pool inventory after splitting the incoming cost must cover the fill
        let inventory = positions.balance(&account, &condition_id, side) + cost;
        if inventory < amount {
            return Err(MarketError::InsufficientInventory {
                side,
                available: inventory,
                requested: amount,
            });
        }

        ledger.debit(caller, cost)?;
        ledger.credit(&account, cost)?;
        execute_split(positions, &account, &condition_id, cost, |acct, amt| {
            ledger.debit(acct, amt).map_err(|e| e.to_string())
        })?;
        positions.transfer_position(&account, caller, &condition_id, side, amount)?;

        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        market.pool.apply_buy(side, amount);
        market.total_liquidity += cost;
        let (price_pass, price_fail) = market.pool.prices();

        let trade_id = ledger.record(
            TxType::TradeBuy,
            caller,
            Some(&account),
            cost,
            Some(market_id),
            clock.now(),
            Some(format!("buy {} {}", amount, side)),
        );

        Ok(TradeReceipt {
            trade_id,
            market_id,
            trader: caller.to_string(),
            side,
            amount,
            collateral: cost,
            price_pass,
            price_fail,
        })
    }

    /// Sell `amount` of one side back to the pool.
    pub fn sell_tokens(
        &mut self,
        ledger: &mut CollateralLedger,
        positions: &mut ConditionalLedger,
        nullification: &NullificationRegistry,
        clock: &dyn Clock,
        caller: &str,
        market_id: u64,
        side: Side,
        amount: f64,
    ) -> Result<TradeReceipt, MarketError> {
        self.check_tradeable(nullification, clock, caller, market_id)?;

        let account = market_account(market_id);
        let (condition_id, proceeds) = {
            let market = self.require_market(market_id)?;
            (market.condition_id.clone(), market.pool.sell_proceeds(side, amount)?)
        };

        let held = positions.balance(caller, &condition_id, side);
        if held < amount {
            return Err(MarketError::InsufficientInventory {
                side,
                available: held,
                requested: amount,
            });
        }
        // the pool pays by merging pairs; its opposite-side inventory must
        // cover the proceeds (guaranteed by the seed bound, still checked)
        let opposite = positions.balance(&account, &condition_id, side.opposite());
        if opposite < proceeds {
            return Err(MarketError::InsufficientInventory {
                side: side.opposite(),
                available: opposite,
                requested: proceeds,
            });
        }

        positions.transfer_position(caller, &account, &condition_id, side, amount)?;
        execute_merge(positions, &account, &condition_id, proceeds, |acct, amt| {
            ledger.credit(acct, amt).map_err(|e| e.to_string())
        })?;
        ledger.transfer(&account, caller, proceeds)?;

        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        market.pool.apply_sell(side, amount);
        market.total_liquidity -= proceeds;
        let (price_pass, price_fail) = market.pool.prices();

        let trade_id = ledger.record(
            TxType::TradeSell,
            &account,
            Some(caller),
            proceeds,
            Some(market_id),
            clock.now(),
            Some(format!("sell {} {}", amount, side)),
        );

        Ok(TradeReceipt {
            trade_id,
            market_id,
            trader: caller.to_string(),
            side,
            amount,
            collateral: proceeds,
            price_pass,
            price_fail,
        })
    }

    /// Close trading once the trading period has elapsed.
    pub fn end_trading(&mut self, clock: &dyn Clock, market_id: u64) -> Result<(), MarketError> {
        let now = clock.now();
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;

        if market.status == MarketStatus::Active && now < market.trading_end_time {
            return Err(MarketError::TradingNotOver { now, ends: market.trading_end_time });
        }
        market.advance(MarketStatus::TradingEnded)
    }

    /// Report resolution values and settle the condition.
    ///
    /// PASS wins `[1,0]` iff pass_value > fail_value, FAIL wins `[0,1]` iff
    /// fail_value > pass_value, a tie pays both sides `[1,1]`.
    pub fn resolve_market(
        &mut self,
        positions: &mut ConditionalLedger,
        market_id: u64,
        pass_value: f64,
        fail_value: f64,
    ) -> Result<(), MarketError> {
        for value in [pass_value, fail_value] {
            if value < 0.0 || !value.is_finite() {
                return Err(MarketError::InvalidValue(value));
            }
        }

        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        if market.status != MarketStatus::TradingEnded {
            return Err(MarketError::IllegalTransition {
                market_id,
                from: market.status,
                to: MarketStatus::Resolved,
            });
        }

        let numerators = if pass_value > fail_value {
            [1, 0]
        } else if fail_value > pass_value {
            [0, 1]
        } else {
            [1, 1]
        };

        positions.report_payouts(CONTROLLER_ORACLE_REF, &market.condition_id, numerators)?;

        market.advance(MarketStatus::Resolved)?;
        market.pass_value = Some(pass_value);
        market.fail_value = Some(fail_value);
        market.resolved = true;

        tracing::info!(
            market = market_id,
            pass_value,
            fail_value,
            "market resolved"
        );
        Ok(())
    }

    /// Terminate a market before trading ends. No payout.
    pub fn cancel_market(
        &mut self,
        capabilities: &CapabilityRegistry,
        caller: &str,
        market_id: u64,
    ) -> Result<(), MarketError> {
        if !capabilities.has_capability(caller, Capability::CancelMarket) {
            return Err(MarketError::Unauthorized(caller.to_string()));
        }
        let market = self
            .markets
            .get_mut(&market_id)
            .ok_or(MarketError::NotFound(market_id))?;
        market.advance(MarketStatus::Cancelled)
    }

    /// Deploy every spec or none: any failure restores the pre-batch state of
    /// the controller, collateral ledger, and position ledger.
    pub fn batch_deploy_markets(
        &mut self,
        ledger: &mut CollateralLedger,
        positions: &mut ConditionalLedger,
        capabilities: &CapabilityRegistry,
        clock: &dyn Clock,
        caller: &str,
        specs: &[DeploySpec],
    ) -> Result<Vec<u64>, MarketError> {
        let snapshot = (self.clone(), ledger.clone(), positions.clone());

        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.deploy_market_pair(ledger, positions, capabilities, clock, caller, spec) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    *self = snapshot.0;
                    *ledger = snapshot.1;
                    *positions = snapshot.2;
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    /// Resolve every `(market, pass, fail)` or none.
    pub fn batch_resolve_markets(
        &mut self,
        positions: &mut ConditionalLedger,
        resolutions: &[(u64, f64, f64)],
    ) -> Result<(), MarketError> {
        let snapshot = (self.clone(), positions.clone());

        for &(market_id, pass_value, fail_value) in resolutions {
            if let Err(e) = self.resolve_market(positions, market_id, pass_value, fail_value) {
                *self = snapshot.0;
                *positions = snapshot.1;
                return Err(e);
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const DAY: u64 = 24 * 60 * 60;

    struct Harness {
        ledger: CollateralLedger,
        positions: ConditionalLedger,
        controller: MarketController,
        capabilities: CapabilityRegistry,
        nullification: NullificationRegistry,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let mut ledger = CollateralLedger::new();
        ledger.credit("alice", 10_000.0).unwrap();
        ledger.credit("bob", 10_000.0).unwrap();

        let mut capabilities = CapabilityRegistry::new();
        capabilities.grant("alice", Capability::DeployMarket);
        capabilities.grant("alice", Capability::CancelMarket);

        Harness {
            ledger,
            positions: ConditionalLedger::new(),
            controller: MarketController::new(),
            capabilities,
            nullification: NullificationRegistry::new(),
            clock: ManualClock::new(1_000_000),
        }
    }

    fn spec(proposal_id: u64) -> DeploySpec {
        DeploySpec {
            proposal_id,
            collateral_asset: "GOV".to_string(),
            liquidity_amount: 1_000.0,
            liquidity_param: 100.0,
            trading_period_secs: 7 * DAY,
            bet_type: BetType::WelfareMetric,
        }
    }

    fn deploy(h: &mut Harness, proposal_id: u64) -> u64 {
        h.controller
            .deploy_market_pair(
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "alice",
                &spec(proposal_id),
            )
            .unwrap()
    }

    #[test]
    fn test_deploy_seeds_inventory_and_escrow() {
        let mut h = harness();
        let id = deploy(&mut h, 1);

        let market = h.controller.market(id).unwrap().clone();
        let account = market_account(id);

        assert_eq!(market.status, MarketStatus::Active);
        assert_eq!(h.ledger.balance("alice"), 9_000.0);
        assert_eq!(h.positions.balance(&account, &market.condition_id, Side::Pass), 1_000.0);
        assert_eq!(h.positions.balance(&account, &market.condition_id, Side::Fail), 1_000.0);
        assert_eq!(h.positions.escrowed(&market.condition_id), 1_000.0);
    }

    #[test]
    fn test_trading_period_bounds() {
        let mut h = harness();

        for bad_secs in [1 * DAY, 30 * DAY] {
            let mut s = spec(1);
            s.trading_period_secs = bad_secs;
            let err = h
                .controller
                .deploy_market_pair(
                    &mut h.ledger,
                    &mut h.positions,
                    &h.capabilities,
                    &h.clock,
                    "alice",
                    &s,
                )
                .unwrap_err();
            assert!(matches!(err, MarketError::InvalidTradingPeriod { .. }));
        }
    }

    #[test]
    fn test_deploy_requires_capability() {
        let mut h = harness();
        let err = h
            .controller
            .deploy_market_pair(
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "bob",
                &spec(1),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_sentinel_zero_collision_both_ways() {
        let mut h = harness();

        // the first market gets id 0, which equals the NO_MARKET sentinel:
        // a second deploy for the same proposal slips past the duplicate check
        let first = deploy(&mut h, 7);
        assert_eq!(first, NO_MARKET);
        let err = h
            .controller
            .deploy_market_pair(
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "alice",
                &spec(7),
            )
            .unwrap_err();
        // not DuplicateMarket: the sentinel check was blind, only the
        // already-prepared condition stopped the redeploy
        assert!(matches!(
            err,
            MarketError::Conditional(ConditionalError::ConditionExists(_))
        ));

        // markets with nonzero ids are protected by the sentinel check itself
        let second = deploy(&mut h, 8);
        assert!(second != NO_MARKET);
        let err = h
            .controller
            .deploy_market_pair(
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "alice",
                &spec(8),
            )
            .unwrap_err();
        assert!(matches!(err, MarketError::DuplicateMarket { .. }));
    }

    #[test]
    fn test_buy_and_sell_round_trip() {
        let mut h = harness();
        let id = deploy(&mut h, 1);

        let buy = h
            .controller
            .buy_tokens(
                &mut h.ledger,
                &mut h.positions,
                &h.nullification,
                &h.clock,
                "bob",
                id,
                Side::Pass,
                50.0,
            )
            .unwrap();

        assert!(buy.collateral > 0.0 && buy.collateral < 50.0);
        assert!(buy.price_pass > 0.5);
        let market = h.controller.market(id).unwrap();
        assert_eq!(h.positions.balance("bob", &market.condition_id, Side::Pass), 50.0);

        let sell = h
            .controller
            .sell_tokens(
                &mut h.ledger,
                &mut h.positions,
                &h.nullification,
                &h.clock,
                "bob",
                id,
                Side::Pass,
                50.0,
            )
            .unwrap();

        // rounding favors the pool, so bob never profits on a round trip
        assert!(sell.collateral <= buy.collateral);
        assert!(buy.collateral - sell.collateral < 0.01);
        let market = h.controller.market(id).unwrap();
        assert_eq!(h.positions.balance("bob", &market.condition_id, Side::Pass), 0.0);

        // trading only moves positions around; pair supplies stay equal
        let pass_supply = h.positions.total_supply(&market.condition_id, Side::Pass);
        let fail_supply = h.positions.total_supply(&market.condition_id, Side::Fail);
        assert!((pass_supply - fail_supply).abs() < 1e-9);
    }

    #[test]
    fn test_trading_rejected_after_end_time() {
        let mut h = harness();
        let id = deploy(&mut h, 1);

        h.clock.advance(7 * DAY);
        let err = h
            .controller
            .buy_tokens(
                &mut h.ledger,
                &mut h.positions,
                &h.nullification,
                &h.clock,
                "bob",
                id,
                Side::Pass,
                10.0,
            )
            .unwrap_err();
        assert!(matches!(err, MarketError::TradingClosed { .. }));
    }

    #[test]
    fn test_nullification_blocks_trading() {
        let mut h = harness();
        let id = deploy(&mut h, 1);

        h.nullification.set_enforcement(true);
        h.nullification.nullify_address("bob");

        let err = h
            .controller
            .buy_tokens(
                &mut h.ledger,
                &mut h.positions,
                &h.nullification,
                &h.clock,
                "bob",
                id,
                Side::Pass,
                10.0,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_status_only_moves_forward() {
        let mut h = harness();
        let id = deploy(&mut h, 1);

        // cannot resolve from Active
        assert!(h
            .controller
            .resolve_market(&mut h.positions, id, 10.0, 5.0)
            .is_err());
        // cannot end trading early
        assert!(h.controller.end_trading(&h.clock, id).is_err());

        h.clock.advance(7 * DAY);
        h.controller.end_trading(&h.clock, id).unwrap();
        // cancel is only legal from Active
        assert!(h.controller.cancel_market(&h.capabilities, "alice", id).is_err());

        h.controller
            .resolve_market(&mut h.positions, id, 10.0, 5.0)
            .unwrap();
        let market = h.controller.market(id).unwrap();
        assert!(market.resolved);
        assert_eq!(market.status, MarketStatus::Resolved);

        // second resolution is rejected
        assert!(h
            .controller
            .resolve_market(&mut h.positions, id, 1.0, 2.0)
            .is_err());
    }

    #[test]
    fn test_tie_reports_split_payout() {
        let mut h = harness();
        let id = deploy(&mut h, 1);
        h.clock.advance(7 * DAY);
        h.controller.end_trading(&h.clock, id).unwrap();
        h.controller
            .resolve_market(&mut h.positions, id, 50.0, 50.0)
            .unwrap();

        let market = h.controller.market(id).unwrap();
        let condition = h.positions.condition(&market.condition_id).unwrap();
        assert_eq!(condition.payout_numerators, Some([1, 1]));
    }

    #[test]
    fn test_batch_deploy_is_all_or_nothing() {
        let mut h = harness();

        let mut bad = spec(2);
        bad.trading_period_secs = DAY; // below minimum, fails validation
        let specs = vec![spec(1), bad, spec(3)];

        let err = h
            .controller
            .batch_deploy_markets(
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "alice",
                &specs,
            )
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidTradingPeriod { .. }));

        // nothing from the batch survived
        assert!(h.controller.markets.is_empty());
        assert_eq!(h.ledger.balance("alice"), 10_000.0);
        assert!(h.positions.conditions.is_empty());
    }

    #[test]
    fn test_batch_resolve_is_all_or_nothing() {
        let mut h = harness();
        let a = deploy(&mut h, 1);
        let b = deploy(&mut h, 2);

        h.clock.advance(7 * DAY);
        h.controller.end_trading(&h.clock, a).unwrap();
        // market b left Active so its resolution fails

        let err = h
            .controller
            .batch_resolve_markets(&mut h.positions, &[(a, 10.0, 5.0), (b, 1.0, 2.0)])
            .unwrap_err();
        assert!(matches!(err, MarketError::IllegalTransition { .. }));

        assert!(!h.controller.market(a).unwrap().resolved);
        assert_eq!(h.controller.market(a).unwrap().status, MarketStatus::TradingEnded);
    }
}
