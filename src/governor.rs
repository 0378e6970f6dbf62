// ============================================================================
// Governor - Proposal Phase State Machine
// ============================================================================
//
// Orchestrates a funded proposal's journey:
//
//   Submitted -> UnderReview -> Active -> Trading -> Resolution
//                                                      |-> Execution -> Completed
//                                                      `-> Rejected
//
// Activation deploys the conditional market pair; after trading the oracle
// protocol produces the welfare values; finalization compares them and either
// schedules the funding transfer behind a timelock or rejects. Ties reject,
// conservatively.
//
// Execution follows checks-effects-interactions: the `executed` flag and the
// terminal phase are committed strictly before the treasury transfer is
// issued, so a re-entrant call can never observe stale state and double-spend.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::access::{Capability, CapabilityRegistry};
use crate::clock::Clock;
use crate::conditional::ConditionalLedger;
use crate::errors::ErrorKind;
use crate::ledger::{CollateralLedger, TxType};
use crate::market::{DeploySpec, MarketController, MarketError};
use crate::oracle::{OracleError, OracleManager};
use crate::treasury::{Treasury, TreasuryError};

pub const DEFAULT_TIMELOCK_SECS: u64 = 2 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Delay between approval and execution.
    pub timelock_secs: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self { timelock_secs: DEFAULT_TIMELOCK_SECS }
    }
}

impl GovernorConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            timelock_secs: std::env::var("GOVERNOR_TIMELOCK_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMELOCK_SECS),
        }
    }
}

// ============================================================================
// PHASES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalPhase {
    Submitted,
    UnderReview,
    Active,
    Trading,
    Resolution,
    Execution,
    Completed,
    Rejected,
}

impl ProposalPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalPhase::Completed | ProposalPhase::Rejected)
    }

    fn can_transition_to(self, next: ProposalPhase) -> bool {
        use ProposalPhase::*;
        matches!(
            (self, next),
            (Submitted, UnderReview)
                | (UnderReview, Active)
                | (Active, Trading)
                | (Trading, Resolution)
                | (Resolution, Execution)
                | (Resolution, Rejected)
                | (Execution, Completed)
        )
    }
}

impl std::fmt::Display for ProposalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProposalPhase::Submitted => "submitted",
            ProposalPhase::UnderReview => "under_review",
            ProposalPhase::Active => "active",
            ProposalPhase::Trading => "trading",
            ProposalPhase::Resolution => "resolution",
            ProposalPhase::Execution => "execution",
            ProposalPhase::Completed => "completed",
            ProposalPhase::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// PROPOSAL
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub proposer: String,
    /// Account funded if the proposal passes.
    pub recipient: String,
    pub funding_amount: f64,
    /// Sole account allowed to post the initial oracle report.
    pub designated_reporter: String,
    pub phase: ProposalPhase,
    pub market_id: Option<u64>,
    /// Earliest execution time, set when the proposal is approved.
    pub execution_time: Option<u64>,
    pub executed: bool,
    pub final_pass_value: Option<f64>,
    pub final_fail_value: Option<f64>,
    pub created_at: u64,
}

impl GovernanceProposal {
    fn advance(&mut self, next: ProposalPhase) -> Result<(), GovernorError> {
        if !self.phase.can_transition_to(next) {
            return Err(GovernorError::IllegalPhase { proposal_id: self.id, phase: self.phase });
        }
        tracing::info!(proposal = self.id, from = %self.phase, to = %next, "proposal transition");
        self.phase = next;
        Ok(())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum GovernorError {
    ProposalNotFound(u64),
    IllegalPhase { proposal_id: u64, phase: ProposalPhase },
    Unauthorized(String),
    InvalidFunding(f64),
    MissingReporter,
    NoMarket(u64),
    ResolutionNotFinal(u64),
    TimelockActive { now: u64, execution_time: u64 },
    AlreadyExecuted(u64),
    Market(MarketError),
    Oracle(OracleError),
    Treasury(TreasuryError),
}

impl std::fmt::Display for GovernorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GovernorError::ProposalNotFound(id) => write!(f, "Proposal not found: {}", id),
            GovernorError::IllegalPhase { proposal_id, phase } => {
                write!(f, "Proposal {} is in phase {}", proposal_id, phase)
            }
            GovernorError::Unauthorized(caller) => write!(f, "Unauthorized: {}", caller),
            GovernorError::InvalidFunding(amt) => write!(f, "Invalid funding amount: {}", amt),
            GovernorError::MissingReporter => write!(f, "Designated reporter required"),
            GovernorError::NoMarket(id) => write!(f, "Proposal {} has no market", id),
            GovernorError::ResolutionNotFinal(id) => {
                write!(f, "Resolution for proposal {} is not finalized", id)
            }
            GovernorError::TimelockActive { now, execution_time } => {
                write!(f, "Timelock active: now {}, executable at {}", now, execution_time)
            }
            GovernorError::AlreadyExecuted(id) => write!(f, "Proposal {} already executed", id),
            GovernorError::Market(e) => write!(f, "{}", e),
            GovernorError::Oracle(e) => write!(f, "{}", e),
            GovernorError::Treasury(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GovernorError {}

impl From<MarketError> for GovernorError {
    fn from(e: MarketError) -> Self {
        GovernorError::Market(e)
    }
}

impl From<OracleError> for GovernorError {
    fn from(e: OracleError) -> Self {
        GovernorError::Oracle(e)
    }
}

impl From<TreasuryError> for GovernorError {
    fn from(e: TreasuryError) -> Self {
        GovernorError::Treasury(e)
    }
}

impl GovernorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernorError::Unauthorized(_) => ErrorKind::Authorization,
            GovernorError::AlreadyExecuted(_) => ErrorKind::Duplicate,
            GovernorError::Market(e) => e.kind(),
            GovernorError::Oracle(e) => e.kind(),
            GovernorError::Treasury(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

// ============================================================================
// GOVERNOR
// ============================================================================

/// Market parameters supplied at activation.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationSpec {
    pub collateral_asset: String,
    pub liquidity_amount: f64,
    pub liquidity_param: f64,
    pub trading_period_secs: u64,
    #[serde(default)]
    pub bet_type: crate::market::BetType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Governor {
    pub proposals: HashMap<u64, GovernanceProposal>,
    next_proposal_id: u64,
    pub config: GovernorConfig,
}

impl Governor {
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            proposals: HashMap::new(),
            // proposal ids start at 1; market ids are the ones carrying the
            // zero sentinel
            next_proposal_id: 1,
            config,
        }
    }

    pub fn proposal(&self, proposal_id: u64) -> Option<&GovernanceProposal> {
        self.proposals.get(&proposal_id)
    }

    fn require_mut(&mut self, proposal_id: u64) -> Result<&mut GovernanceProposal, GovernorError> {
        self.proposals
            .get_mut(&proposal_id)
            .ok_or(GovernorError::ProposalNotFound(proposal_id))
    }

    /// Register a proposal at `Submitted`.
    pub fn create_proposal(
        &mut self,
        clock: &dyn Clock,
        proposer: &str,
        title: &str,
        description: &str,
        recipient: &str,
        funding_amount: f64,
        designated_reporter: &str,
    ) -> Result<u64, GovernorError> {
        if funding_amount <= 0.0 || !funding_amount.is_finite() {
            return Err(GovernorError::InvalidFunding(funding_amount));
        }
        if designated_reporter.is_empty() {
            return Err(GovernorError::MissingReporter);
        }

        let id = self.next_proposal_id;
        self.proposals.insert(
            id,
            GovernanceProposal {
                id,
                title: title.to_string(),
                description: description.to_string(),
                proposer: proposer.to_string(),
                recipient: recipient.to_string(),
                funding_amount,
                designated_reporter: designated_reporter.to_string(),
                phase: ProposalPhase::Submitted,
                market_id: None,
                execution_time: None,
                executed: false,
                final_pass_value: None,
                final_fail_value: None,
                created_at: clock.now(),
            },
        );
        self.next_proposal_id += 1;

        tracing::info!(proposal = id, proposer, funding_amount, "proposal created");
        Ok(id)
    }

    /// Move a submitted proposal under review.
    pub fn begin_review(
        &mut self,
        capabilities: &CapabilityRegistry,
        caller: &str,
        proposal_id: u64,
    ) -> Result<(), GovernorError> {
        if !capabilities.has_capability(caller, Capability::ReviewProposal) {
            return Err(GovernorError::Unauthorized(caller.to_string()));
        }
        self.require_mut(proposal_id)?.advance(ProposalPhase::UnderReview)
    }

    /// Approve for trading: deploys the conditional market pair with the
    /// caller's liquidity and opens trading.
    pub fn activate_proposal(
        &mut self,
        markets: &mut MarketController,
        ledger: &mut CollateralLedger,
        positions: &mut ConditionalLedger,
        capabilities: &CapabilityRegistry,
        clock: &dyn Clock,
        caller: &str,
        proposal_id: u64,
        spec: &ActivationSpec,
    ) -> Result<u64, GovernorError> {
        if !capabilities.has_capability(caller, Capability::ActivateProposal) {
            return Err(GovernorError::Unauthorized(caller.to_string()));
        }
        {
            let proposal = self
                .proposals
                .get(&proposal_id)
                .ok_or(GovernorError::ProposalNotFound(proposal_id))?;
            if proposal.phase != ProposalPhase::UnderReview {
                return Err(GovernorError::IllegalPhase { proposal_id, phase: proposal.phase });
            }
        }

        let deploy = DeploySpec {
            proposal_id,
            collateral_asset: spec.collateral_asset.clone(),
            liquidity_amount: spec.liquidity_amount,
            liquidity_param: spec.liquidity_param,
            trading_period_secs: spec.trading_period_secs,
            bet_type: spec.bet_type,
        };
        let market_id =
            markets.deploy_market_pair(ledger, positions, capabilities, clock, caller, &deploy)?;

        let proposal = self.require_mut(proposal_id)?;
        proposal.market_id = Some(market_id);
        proposal.advance(ProposalPhase::Active)?;
        proposal.advance(ProposalPhase::Trading)?;
        Ok(market_id)
    }

    /// Close the market and hand the proposal to the oracle protocol.
    /// Requires the trading period to have elapsed.
    pub fn move_to_resolution(
        &mut self,
        markets: &mut MarketController,
        oracle: &mut OracleManager,
        clock: &dyn Clock,
        proposal_id: u64,
    ) -> Result<(), GovernorError> {
        let (market_id, reporter) = {
            let proposal = self
                .proposals
                .get(&proposal_id)
                .ok_or(GovernorError::ProposalNotFound(proposal_id))?;
            if proposal.phase != ProposalPhase::Trading {
                return Err(GovernorError::IllegalPhase { proposal_id, phase: proposal.phase });
            }
            let market_id = proposal.market_id.ok_or(GovernorError::NoMarket(proposal_id))?;
            (market_id, proposal.designated_reporter.clone())
        };

        markets.end_trading(clock, market_id)?;
        oracle.open_resolution(clock, proposal_id, &reporter)?;
        self.require_mut(proposal_id)?.advance(ProposalPhase::Resolution)
    }

    /// Compare the finalized welfare values, resolve the market, and either
    /// schedule execution behind the timelock or reject. Ties reject.
    pub fn finalize_proposal(
        &mut self,
        markets: &mut MarketController,
        positions: &mut ConditionalLedger,
        oracle: &OracleManager,
        clock: &dyn Clock,
        proposal_id: u64,
    ) -> Result<ProposalPhase, GovernorError> {
        let (market_id, pass_value, fail_value) = {
            let proposal = self
                .proposals
                .get(&proposal_id)
                .ok_or(GovernorError::ProposalNotFound(proposal_id))?;
            if proposal.phase != ProposalPhase::Resolution {
                return Err(GovernorError::IllegalPhase { proposal_id, phase: proposal.phase });
            }
            let market_id = proposal.market_id.ok_or(GovernorError::NoMarket(proposal_id))?;
            let (pass_value, fail_value) = oracle
                .final_values(proposal_id)
                .ok_or(GovernorError::ResolutionNotFinal(proposal_id))?;
            (market_id, pass_value, fail_value)
        };

        markets.resolve_market(positions, market_id, pass_value, fail_value)?;

        let timelock = self.config.timelock_secs;
        let now = clock.now();
        let proposal = self.require_mut(proposal_id)?;
        proposal.final_pass_value = Some(pass_value);
        proposal.final_fail_value = Some(fail_value);

        if pass_value > fail_value {
            proposal.execution_time = Some(now + timelock);
            proposal.advance(ProposalPhase::Execution)?;
            Ok(ProposalPhase::Execution)
        } else {
            proposal.advance(ProposalPhase::Rejected)?;
            Ok(ProposalPhase::Rejected)
        }
    }

    /// Perform the funding transfer, once, after the timelock.
    pub fn execute_proposal(
        &mut self,
        treasury: &mut Treasury,
        ledger: &mut CollateralLedger,
        clock: &dyn Clock,
        proposal_id: u64,
    ) -> Result<(), GovernorError> {
        let now = clock.now();
        let (recipient, amount) = {
            let proposal = self
                .proposals
                .get(&proposal_id)
                .ok_or(GovernorError::ProposalNotFound(proposal_id))?;
            if proposal.executed {
                return Err(GovernorError::AlreadyExecuted(proposal_id));
            }
            if proposal.phase != ProposalPhase::Execution {
                return Err(GovernorError::IllegalPhase { proposal_id, phase: proposal.phase });
            }
            let execution_time =
                proposal.execution_time.ok_or(GovernorError::IllegalPhase {
                    proposal_id,
                    phase: proposal.phase,
                })?;
            if now < execution_time {
                return Err(GovernorError::TimelockActive { now, execution_time });
            }
            (proposal.recipient.clone(), proposal.funding_amount)
        };

        // funds are validated before any effect is committed
        if treasury.available() < amount {
            return Err(GovernorError::Treasury(TreasuryError::InsufficientFunds {
                available: treasury.available(),
                requested: amount,
            }));
        }

        // effects before interaction: the executed flag and terminal phase
        // land before the transfer is issued
        {
            let proposal = self.require_mut(proposal_id)?;
            proposal.executed = true;
            proposal.advance(ProposalPhase::Completed)?;
        }

        treasury.withdraw(&recipient, amount, |account, amt| {
            let _ = ledger.credit(account, amt);
        })?;
        ledger.record(
            TxType::TreasuryTransfer,
            "treasury",
            Some(&recipient),
            amount,
            None,
            now,
            Some(format!("proposal {} funding", proposal_id)),
        );

        tracing::info!(proposal = proposal_id, recipient = %recipient, amount, "proposal executed");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::NullificationRegistry;
    use crate::clock::ManualClock;
    use crate::market::BetType;
    use crate::oracle::{OracleConfig, QueuedDisputeOracle, DEFAULT_REPORT_BOND};

    const DAY: u64 = 24 * 60 * 60;

    struct Harness {
        ledger: CollateralLedger,
        positions: ConditionalLedger,
        markets: MarketController,
        oracle: OracleManager,
        governor: Governor,
        treasury: Treasury,
        capabilities: CapabilityRegistry,
        #[allow(dead_code)]
        nullification: NullificationRegistry,
        dispute: QueuedDisputeOracle,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let mut ledger = CollateralLedger::new();
        ledger.credit("council", 10_000.0).unwrap();
        ledger.credit("reporter", 1_000.0).unwrap();

        let mut capabilities = CapabilityRegistry::new();
        for cap in [
            Capability::ReviewProposal,
            Capability::ActivateProposal,
            Capability::DeployMarket,
        ] {
            capabilities.grant("council", cap);
        }

        Harness {
            ledger,
            positions: ConditionalLedger::new(),
            markets: MarketController::new(),
            oracle: OracleManager::new(OracleConfig::default()),
            governor: Governor::new(GovernorConfig::default()),
            treasury: Treasury::new(5_000.0),
            capabilities,
            nullification: NullificationRegistry::new(),
            dispute: QueuedDisputeOracle::new(),
            clock: ManualClock::new(1_000_000),
        }
    }

    fn activation() -> ActivationSpec {
        ActivationSpec {
            collateral_asset: "GOV".to_string(),
            liquidity_amount: 1_000.0,
            liquidity_param: 100.0,
            trading_period_secs: 7 * DAY,
            bet_type: BetType::WelfareMetric,
        }
    }

    /// Drive a proposal through Submitted..Resolution with a finalized,
    /// unchallenged report of (pass, fail).
    fn drive_to_finalized_report(h: &mut Harness, pass: f64, fail: f64) -> u64 {
        let id = h
            .governor
            .create_proposal(
                &h.clock,
                "proposer",
                "Fund the relay",
                "Build it",
                "builder",
                2_000.0,
                "reporter",
            )
            .unwrap();
        h.governor.begin_review(&h.capabilities, "council", id).unwrap();
        h.governor
            .activate_proposal(
                &mut h.markets,
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "council",
                id,
                &activation(),
            )
            .unwrap();

        h.clock.advance(7 * DAY);
        h.governor
            .move_to_resolution(&mut h.markets, &mut h.oracle, &h.clock, id)
            .unwrap();

        h.oracle
            .submit_report(
                &mut h.ledger,
                &h.clock,
                "reporter",
                id,
                pass,
                fail,
                "ipfs://evidence",
                DEFAULT_REPORT_BOND,
            )
            .unwrap();
        h.clock.advance(2 * DAY);
        h.oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, id)
            .unwrap();
        id
    }

    #[test]
    fn test_phases_advance_in_order_only() {
        let mut h = harness();
        let id = h
            .governor
            .create_proposal(&h.clock, "p", "t", "d", "r", 100.0, "reporter")
            .unwrap();

        // cannot activate straight from Submitted
        let err = h
            .governor
            .activate_proposal(
                &mut h.markets,
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "council",
                id,
                &activation(),
            )
            .unwrap_err();
        assert!(matches!(err, GovernorError::IllegalPhase { .. }));

        // review is permissioned
        let err = h.governor.begin_review(&h.capabilities, "rando", id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_move_to_resolution_waits_for_trading_end() {
        let mut h = harness();
        let id = h
            .governor
            .create_proposal(&h.clock, "p", "t", "d", "r", 100.0, "reporter")
            .unwrap();
        h.governor.begin_review(&h.capabilities, "council", id).unwrap();
        h.governor
            .activate_proposal(
                &mut h.markets,
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "council",
                id,
                &activation(),
            )
            .unwrap();

        let err = h
            .governor
            .move_to_resolution(&mut h.markets, &mut h.oracle, &h.clock, id)
            .unwrap_err();
        assert!(matches!(err, GovernorError::Market(MarketError::TradingNotOver { .. })));
    }

    #[test]
    fn test_pass_wins_schedules_timelocked_execution() {
        let mut h = harness();
        let id = drive_to_finalized_report(&mut h, 100.0, 50.0);

        let phase = h
            .governor
            .finalize_proposal(&mut h.markets, &mut h.positions, &h.oracle, &h.clock, id)
            .unwrap();
        assert_eq!(phase, ProposalPhase::Execution);

        // timelock still active
        let err = h
            .governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap_err();
        assert!(matches!(err, GovernorError::TimelockActive { .. }));

        h.clock.advance(DEFAULT_TIMELOCK_SECS);
        h.governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap();

        assert_eq!(h.treasury.available(), 3_000.0);
        assert_eq!(h.ledger.balance("builder"), 2_000.0);
        let proposal = h.governor.proposal(id).unwrap();
        assert!(proposal.executed);
        assert_eq!(proposal.phase, ProposalPhase::Completed);
    }

    #[test]
    fn test_fail_or_tie_rejects() {
        let mut h = harness();
        let id = drive_to_finalized_report(&mut h, 50.0, 50.0);

        let phase = h
            .governor
            .finalize_proposal(&mut h.markets, &mut h.positions, &h.oracle, &h.clock, id)
            .unwrap();
        assert_eq!(phase, ProposalPhase::Rejected);
        assert!(h.governor.proposal(id).unwrap().phase.is_terminal());

        // rejected proposals cannot execute
        let err = h
            .governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap_err();
        assert!(matches!(err, GovernorError::IllegalPhase { .. }));
    }

    #[test]
    fn test_finalize_requires_oracle_finality() {
        let mut h = harness();
        let id = h
            .governor
            .create_proposal(&h.clock, "p", "t", "d", "r", 100.0, "reporter")
            .unwrap();
        h.governor.begin_review(&h.capabilities, "council", id).unwrap();
        h.governor
            .activate_proposal(
                &mut h.markets,
                &mut h.ledger,
                &mut h.positions,
                &h.capabilities,
                &h.clock,
                "council",
                id,
                &activation(),
            )
            .unwrap();
        h.clock.advance(7 * DAY);
        h.governor
            .move_to_resolution(&mut h.markets, &mut h.oracle, &h.clock, id)
            .unwrap();

        let err = h
            .governor
            .finalize_proposal(&mut h.markets, &mut h.positions, &h.oracle, &h.clock, id)
            .unwrap_err();
        assert!(matches!(err, GovernorError::ResolutionNotFinal(_)));
    }

    #[test]
    fn test_double_execution_is_structurally_impossible() {
        let mut h = harness();
        let id = drive_to_finalized_report(&mut h, 100.0, 50.0);
        h.governor
            .finalize_proposal(&mut h.markets, &mut h.positions, &h.oracle, &h.clock, id)
            .unwrap();
        h.clock.advance(DEFAULT_TIMELOCK_SECS);
        h.governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap();

        let balance_after_first = h.treasury.available();
        let err = h
            .governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(h.treasury.available(), balance_after_first);
    }

    #[test]
    fn test_insufficient_treasury_surfaces_before_any_effect() {
        let mut h = harness();
        h.treasury = Treasury::new(100.0); // less than the 2000 funding ask
        let id = drive_to_finalized_report(&mut h, 100.0, 50.0);
        h.governor
            .finalize_proposal(&mut h.markets, &mut h.positions, &h.oracle, &h.clock, id)
            .unwrap();
        h.clock.advance(DEFAULT_TIMELOCK_SECS);

        let err = h
            .governor
            .execute_proposal(&mut h.treasury, &mut h.ledger, &h.clock, id)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Economic);
        let proposal = h.governor.proposal(id).unwrap();
        assert!(!proposal.executed);
        assert_eq!(proposal.phase, ProposalPhase::Execution);
    }
}
