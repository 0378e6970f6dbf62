// ============================================================================
// Oracle Resolution Protocol
// ============================================================================
//
// Produces the canonical (pass_value, fail_value) pair for a proposal via a
// bonded, multi-stage process instead of a single trusted oracle call:
//
//   Unreported -> DesignatedReporting -> OpenChallenge -> Dispute -> Finalized
//
// The designated reporter posts values with an exact bond. Anyone may
// challenge inside a fixed window with a counter-bond. An unchallenged report
// finalizes to the reporter's values and refunds the bond; a challenged one
// finalizes to the challenger's values and pays both bonds to the challenger
// unless it was escalated, in which case an external adjudicator supplies the
// values and the bonds follow whoever the adjudication agrees with.
//
// The stage only ever moves forward, through one transition function.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::access::{Capability, CapabilityRegistry};
use crate::clock::Clock;
use crate::errors::ErrorKind;
use crate::ledger::{CollateralLedger, LedgerError, TxType};

// ============================================================================
// CONFIG
// ============================================================================

/// Escrow account holding posted bonds until finalization.
pub const ORACLE_ESCROW_ACCOUNT: &str = "oracle:escrow";

pub const DEFAULT_REPORT_BOND: f64 = 100.0;
pub const DEFAULT_CHALLENGE_BOND: f64 = 150.0;
pub const DEFAULT_CHALLENGE_PERIOD_SECS: u64 = 2 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Exact bond a report must post.
    pub report_bond: f64,
    /// Exact bond a challenge must post.
    pub challenge_bond: f64,
    /// Challenge window length after the report timestamp.
    pub challenge_period_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            report_bond: DEFAULT_REPORT_BOND,
            challenge_bond: DEFAULT_CHALLENGE_BOND,
            challenge_period_secs: DEFAULT_CHALLENGE_PERIOD_SECS,
        }
    }
}

impl OracleConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            report_bond: std::env::var("ORACLE_REPORT_BOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.report_bond),
            challenge_bond: std::env::var("ORACLE_CHALLENGE_BOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.challenge_bond),
            challenge_period_secs: std::env::var("ORACLE_CHALLENGE_PERIOD_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.challenge_period_secs),
        }
    }
}

// ============================================================================
// STAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    Unreported,
    DesignatedReporting,
    OpenChallenge,
    Dispute,
    Finalized,
}

impl ResolutionStage {
    fn can_transition_to(self, next: ResolutionStage) -> bool {
        use ResolutionStage::*;
        matches!(
            (self, next),
            (Unreported, DesignatedReporting)
                | (DesignatedReporting, OpenChallenge)
                | (DesignatedReporting, Finalized)
                | (OpenChallenge, Dispute)
                | (OpenChallenge, Finalized)
                | (Dispute, Finalized)
        )
    }
}

impl std::fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolutionStage::Unreported => "unreported",
            ResolutionStage::DesignatedReporting => "designated_reporting",
            ResolutionStage::OpenChallenge => "open_challenge",
            ResolutionStage::Dispute => "dispute",
            ResolutionStage::Finalized => "finalized",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// Write-once report by the designated reporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub reporter: String,
    pub pass_value: f64,
    pub fail_value: f64,
    pub evidence_ref: String,
    pub bond: f64,
    pub timestamp: u64,
}

/// At most one challenge, valid only inside the challenge window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub challenger: String,
    pub counter_pass_value: f64,
    pub counter_fail_value: f64,
    pub evidence_ref: String,
    pub bond: f64,
    pub timestamp: u64,
}

/// Resolution record for one proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub proposal_id: u64,
    pub designated_reporter: String,
    pub stage: ResolutionStage,
    pub report: Option<Report>,
    pub challenge: Option<Challenge>,
    pub final_pass_value: Option<f64>,
    pub final_fail_value: Option<f64>,
    pub opened_at: u64,
    pub finalized_at: Option<u64>,
}

impl Resolution {
    fn advance(&mut self, next: ResolutionStage) -> Result<(), OracleError> {
        if !self.stage.can_transition_to(next) {
            return Err(OracleError::IllegalStage {
                proposal_id: self.proposal_id,
                stage: self.stage,
            });
        }
        tracing::info!(
            proposal = self.proposal_id,
            from = %self.stage,
            to = %next,
            "resolution transition"
        );
        self.stage = next;
        Ok(())
    }
}

/// Values adopted at finalization, plus where the bonds went.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedOutcome {
    pub proposal_id: u64,
    pub pass_value: f64,
    pub fail_value: f64,
    /// (account, amount) bond payouts issued from escrow.
    pub bond_payouts: Vec<(String, f64)>,
}

/// External dispute adjudicator, modeled abstractly as an injected source of
/// values. The protocol never reasons about how it decides.
pub trait DisputeOracle {
    fn resolve_dispute(&self, proposal_id: u64) -> Option<(f64, f64)>;
}

/// In-memory adjudicator: outcomes are posted out-of-band, finalization
/// blocks until one exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueuedDisputeOracle {
    outcomes: HashMap<u64, (f64, f64)>,
}

impl QueuedDisputeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_outcome(&mut self, proposal_id: u64, pass_value: f64, fail_value: f64) {
        self.outcomes.insert(proposal_id, (pass_value, fail_value));
    }
}

impl DisputeOracle for QueuedDisputeOracle {
    fn resolve_dispute(&self, proposal_id: u64) -> Option<(f64, f64)> {
        self.outcomes.get(&proposal_id).copied()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OracleError {
    NotOpened(u64),
    AlreadyOpened(u64),
    IllegalStage { proposal_id: u64, stage: ResolutionStage },
    AlreadyReported(u64),
    AlreadyChallenged(u64),
    AlreadyFinalized(u64),
    NotDesignatedReporter { proposal_id: u64, caller: String },
    InvalidValue(f64),
    BondMismatch { required: f64, provided: f64 },
    WindowClosed { closed_at: u64, now: u64 },
    WindowOpen { closes_at: u64, now: u64 },
    DisputePending(u64),
    Unauthorized(String),
    Ledger(LedgerError),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::NotOpened(id) => write!(f, "No resolution opened for proposal {}", id),
            OracleError::AlreadyOpened(id) => {
                write!(f, "Resolution already opened for proposal {}", id)
            }
            OracleError::IllegalStage { proposal_id, stage } => {
                write!(f, "Proposal {} resolution is at stage {}", proposal_id, stage)
            }
            OracleError::AlreadyReported(id) => write!(f, "Proposal {} already reported", id),
            OracleError::AlreadyChallenged(id) => write!(f, "Proposal {} already challenged", id),
            OracleError::AlreadyFinalized(id) => write!(f, "Proposal {} already finalized", id),
            OracleError::NotDesignatedReporter { proposal_id, caller } => write!(
                f,
                "{} is not the designated reporter for proposal {}",
                caller, proposal_id
            ),
            OracleError::InvalidValue(v) => write!(f, "Invalid reported value: {}", v),
            OracleError::BondMismatch { required, provided } => {
                write!(f, "Bond mismatch: required {}, provided {}", required, provided)
            }
            OracleError::WindowClosed { closed_at, now } => {
                write!(f, "Challenge window closed at {} (now {})", closed_at, now)
            }
            OracleError::WindowOpen { closes_at, now } => {
                write!(f, "Challenge window open until {} (now {})", closes_at, now)
            }
            OracleError::DisputePending(id) => {
                write!(f, "Dispute for proposal {} awaits external adjudication", id)
            }
            OracleError::Unauthorized(caller) => write!(f, "Unauthorized: {}", caller),
            OracleError::Ledger(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OracleError {}

impl From<LedgerError> for OracleError {
    fn from(e: LedgerError) -> Self {
        OracleError::Ledger(e)
    }
}

impl OracleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::AlreadyOpened(_)
            | OracleError::AlreadyReported(_)
            | OracleError::AlreadyChallenged(_)
            | OracleError::AlreadyFinalized(_) => ErrorKind::Duplicate,
            OracleError::NotDesignatedReporter { .. } | OracleError::Unauthorized(_) => {
                ErrorKind::Authorization
            }
            OracleError::BondMismatch { .. } => ErrorKind::Economic,
            OracleError::Ledger(e) => e.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

// ============================================================================
// MANAGER
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleManager {
    pub resolutions: HashMap<u64, Resolution>,
    pub config: OracleConfig,
}

impl OracleManager {
    pub fn new(config: OracleConfig) -> Self {
        Self { resolutions: HashMap::new(), config }
    }

    pub fn resolution(&self, proposal_id: u64) -> Option<&Resolution> {
        self.resolutions.get(&proposal_id)
    }

    pub fn is_finalized(&self, proposal_id: u64) -> bool {
        self.resolutions
            .get(&proposal_id)
            .map(|r| r.stage == ResolutionStage::Finalized)
            .unwrap_or(false)
    }

    /// Finalized (pass, fail) values, if any.
    pub fn final_values(&self, proposal_id: u64) -> Option<(f64, f64)> {
        let resolution = self.resolutions.get(&proposal_id)?;
        match (resolution.final_pass_value, resolution.final_fail_value) {
            (Some(p), Some(f)) => Some((p, f)),
            _ => None,
        }
    }

    /// Open a resolution at `Unreported` with its designated reporter.
    pub fn open_resolution(
        &mut self,
        clock: &dyn Clock,
        proposal_id: u64,
        designated_reporter: &str,
    ) -> Result<(), OracleError> {
        if self.resolutions.contains_key(&proposal_id) {
            return Err(OracleError::AlreadyOpened(proposal_id));
        }
        self.resolutions.insert(
            proposal_id,
            Resolution {
                proposal_id,
                designated_reporter: designated_reporter.to_string(),
                stage: ResolutionStage::Unreported,
                report: None,
                challenge: None,
                final_pass_value: None,
                final_fail_value: None,
                opened_at: clock.now(),
                finalized_at: None,
            },
        );
        Ok(())
    }

    fn require_mut(&mut self, proposal_id: u64) -> Result<&mut Resolution, OracleError> {
        self.resolutions
            .get_mut(&proposal_id)
            .ok_or(OracleError::NotOpened(proposal_id))
    }

    /// Post the designated report with its exact bond.
    pub fn submit_report(
        &mut self,
        ledger: &mut CollateralLedger,
        clock: &dyn Clock,
        caller: &str,
        proposal_id: u64,
        pass_value: f64,
        fail_value: f64,
        evidence_ref: &str,
        bond: f64,
    ) -> Result<(), OracleError> {
        let required = self.config.report_bond;
        let resolution = self.require_mut(proposal_id)?;

        if resolution.report.is_some() {
            return Err(OracleError::AlreadyReported(proposal_id));
        }
        if resolution.stage != ResolutionStage::Unreported {
            return Err(OracleError::IllegalStage { proposal_id, stage: resolution.stage });
        }
        if resolution.designated_reporter != caller {
            return Err(OracleError::NotDesignatedReporter {
                proposal_id,
                caller: caller.to_string(),
            });
        }
        for value in [pass_value, fail_value] {
            if value < 0.0 || !value.is_finite() {
                return Err(OracleError::InvalidValue(value));
            }
        }
        if bond != required {
            return Err(OracleError::BondMismatch { required, provided: bond });
        }

        let now = clock.now();
        ledger.transfer(caller, ORACLE_ESCROW_ACCOUNT, bond)?;
        ledger.record(
            TxType::BondPost,
            caller,
            Some(ORACLE_ESCROW_ACCOUNT),
            bond,
            None,
            now,
            Some(format!("report bond, proposal {}", proposal_id)),
        );

        resolution.report = Some(Report {
            reporter: caller.to_string(),
            pass_value,
            fail_value,
            evidence_ref: evidence_ref.to_string(),
            bond,
            timestamp: now,
        });
        resolution.advance(ResolutionStage::DesignatedReporting)
    }

    /// Challenge the report with counter-values, strictly inside the window.
    pub fn challenge_report(
        &mut self,
        ledger: &mut CollateralLedger,
        clock: &dyn Clock,
        caller: &str,
        proposal_id: u64,
        counter_pass_value: f64,
        counter_fail_value: f64,
        evidence_ref: &str,
        bond: f64,
    ) -> Result<(), OracleError> {
        let required = self.config.challenge_bond;
        let period = self.config.challenge_period_secs;
        let resolution = self.require_mut(proposal_id)?;

        if resolution.challenge.is_some() {
            return Err(OracleError::AlreadyChallenged(proposal_id));
        }
        if resolution.stage != ResolutionStage::DesignatedReporting {
            return Err(OracleError::IllegalStage { proposal_id, stage: resolution.stage });
        }
        let report = resolution
            .report
            .as_ref()
            .ok_or(OracleError::IllegalStage { proposal_id, stage: ResolutionStage::Unreported })?;

        // valid strictly before report_time + period; at the boundary the
        // window has closed
        let closes_at = report.timestamp + period;
        let now = clock.now();
        if now >= closes_at {
            return Err(OracleError::WindowClosed { closed_at: closes_at, now });
        }
        for value in [counter_pass_value, counter_fail_value] {
            if value < 0.0 || !value.is_finite() {
                return Err(OracleError::InvalidValue(value));
            }
        }
        if bond != required {
            return Err(OracleError::BondMismatch { required, provided: bond });
        }

        ledger.transfer(caller, ORACLE_ESCROW_ACCOUNT, bond)?;
        ledger.record(
            TxType::BondPost,
            caller,
            Some(ORACLE_ESCROW_ACCOUNT),
            bond,
            None,
            now,
            Some(format!("challenge bond, proposal {}", proposal_id)),
        );

        resolution.challenge = Some(Challenge {
            challenger: caller.to_string(),
            counter_pass_value,
            counter_fail_value,
            evidence_ref: evidence_ref.to_string(),
            bond,
            timestamp: now,
        });
        resolution.advance(ResolutionStage::OpenChallenge)
    }

    /// Escalate a challenged resolution to external adjudication.
    pub fn escalate_dispute(
        &mut self,
        capabilities: &CapabilityRegistry,
        caller: &str,
        proposal_id: u64,
    ) -> Result<(), OracleError> {
        if !capabilities.has_capability(caller, Capability::EscalateDispute) {
            return Err(OracleError::Unauthorized(caller.to_string()));
        }
        let resolution = self.require_mut(proposal_id)?;
        resolution.advance(ResolutionStage::Dispute)
    }

    /// Finalize the resolution and settle bonds from escrow.
    pub fn finalize_resolution(
        &mut self,
        ledger: &mut CollateralLedger,
        clock: &dyn Clock,
        dispute_oracle: &dyn DisputeOracle,
        proposal_id: u64,
    ) -> Result<FinalizedOutcome, OracleError> {
        let period = self.config.challenge_period_secs;
        let now = clock.now();
        let resolution = self.require_mut(proposal_id)?;

        let (pass_value, fail_value, payouts): (f64, f64, Vec<(String, f64)>) =
            match resolution.stage {
                ResolutionStage::Finalized => {
                    return Err(OracleError::AlreadyFinalized(proposal_id))
                }
                ResolutionStage::Unreported => {
                    return Err(OracleError::IllegalStage { proposal_id, stage: resolution.stage })
                }
                ResolutionStage::DesignatedReporting => {
                    let report = resolution.report.as_ref().ok_or(OracleError::IllegalStage {
                        proposal_id,
                        stage: ResolutionStage::Unreported,
                    })?;
                    let closes_at = report.timestamp + period;
                    if now < closes_at {
                        return Err(OracleError::WindowOpen { closes_at, now });
                    }
                    // unchallenged: adopt the report, refund the bond
                    (
                        report.pass_value,
                        report.fail_value,
                        vec![(report.reporter.clone(), report.bond)],
                    )
                }
                ResolutionStage::OpenChallenge => {
                    // challenged, not escalated: the challenger's values stand
                    // and both bonds go to the challenger
                    let report = resolution.report.as_ref().ok_or(OracleError::IllegalStage {
                        proposal_id,
                        stage: ResolutionStage::Unreported,
                    })?;
                    let challenge =
                        resolution.challenge.as_ref().ok_or(OracleError::IllegalStage {
                            proposal_id,
                            stage: ResolutionStage::DesignatedReporting,
                        })?;
                    (
                        challenge.counter_pass_value,
                        challenge.counter_fail_value,
                        vec![(challenge.challenger.clone(), report.bond + challenge.bond)],
                    )
                }
                ResolutionStage::Dispute => {
                    let (pass, fail) = dispute_oracle
                        .resolve_dispute(proposal_id)
                        .ok_or(OracleError::DisputePending(proposal_id))?;
                    let report = resolution.report.as_ref().ok_or(OracleError::IllegalStage {
                        proposal_id,
                        stage: ResolutionStage::Unreported,
                    })?;
                    let challenge =
                        resolution.challenge.as_ref().ok_or(OracleError::IllegalStage {
                            proposal_id,
                            stage: ResolutionStage::DesignatedReporting,
                        })?;
                    let total = report.bond + challenge.bond;
                    // bonds follow whoever the adjudication agrees with
                    let winner = if pass == challenge.counter_pass_value
                        && fail == challenge.counter_fail_value
                    {
                        challenge.challenger.clone()
                    } else {
                        report.reporter.clone()
                    };
                    (pass, fail, vec![(winner, total)])
                }
            };

        resolution.advance(ResolutionStage::Finalized)?;
        resolution.final_pass_value = Some(pass_value);
        resolution.final_fail_value = Some(fail_value);
        resolution.finalized_at = Some(now);

        for (account, amount) in &payouts {
            ledger.transfer(ORACLE_ESCROW_ACCOUNT, account, *amount)?;
            ledger.record(
                TxType::BondPayout,
                ORACLE_ESCROW_ACCOUNT,
                Some(account),
                *amount,
                None,
                now,
                Some(format!("bond payout, proposal {}", proposal_id)),
            );
        }

        tracing::info!(
            proposal = proposal_id,
            pass_value,
            fail_value,
            "resolution finalized"
        );

        Ok(FinalizedOutcome { proposal_id, pass_value, fail_value, bond_payouts: payouts })
    }

    /// Idempotent batch variant of finalize: already-finalized and not-ready
    /// ids are skipped, never errors. Returns the ids finalized this call.
    pub fn finalize_pending(
        &mut self,
        ledger: &mut CollateralLedger,
        clock: &dyn Clock,
        dispute_oracle: &dyn DisputeOracle,
        proposal_ids: &[u64],
    ) -> Vec<u64> {
        let mut finalized = Vec::new();
        for &id in proposal_ids {
            if self.is_finalized(id) {
                continue;
            }
            if self
                .finalize_resolution(ledger, clock, dispute_oracle, id)
                .is_ok()
            {
                finalized.push(id);
            }
        }
        finalized
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
        oracle: OracleManager,
        capabilities: CapabilityRegistry,
        dispute: QueuedDisputeOracle,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let mut ledger = CollateralLedger::new();
        ledger.credit("reporter", 1_000.0).unwrap();
        ledger.credit("challenger", 1_000.0).unwrap();

        let mut capabilities = CapabilityRegistry::new();
        capabilities.grant("arbiter", Capability::EscalateDispute);

        let mut oracle = OracleManager::new(OracleConfig::default());
        let clock = ManualClock::new(1_000_000);
        oracle.open_resolution(&clock, 1, "reporter").unwrap();

        Harness { ledger, oracle, capabilities, dispute: QueuedDisputeOracle::new(), clock }
    }

    fn report(h: &mut Harness, pass: f64, fail: f64) {
        h.oracle
            .submit_report(
                &mut h.ledger,
                &h.clock,
                "reporter",
                1,
                pass,
                fail,
                "ipfs://evidence",
                DEFAULT_REPORT_BOND,
            )
            .unwrap();
    }

    fn challenge(h: &mut Harness, pass: f64, fail: f64) {
        h.oracle
            .challenge_report(
                &mut h.ledger,
                &h.clock,
                "challenger",
                1,
                pass,
                fail,
                "ipfs://counter",
                DEFAULT_CHALLENGE_BOND,
            )
            .unwrap();
    }

    #[test]
    fn test_report_requires_designated_reporter_and_exact_bond() {
        let mut h = harness();

        let err = h
            .oracle
            .submit_report(&mut h.ledger, &h.clock, "impostor", 1, 1.0, 2.0, "", 100.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = h
            .oracle
            .submit_report(&mut h.ledger, &h.clock, "reporter", 1, 1.0, 2.0, "", 99.0)
            .unwrap_err();
        assert!(matches!(err, OracleError::BondMismatch { .. }));

        report(&mut h, 100.0, 50.0);
        assert_eq!(h.ledger.balance("reporter"), 900.0);
        assert_eq!(h.ledger.balance(ORACLE_ESCROW_ACCOUNT), 100.0);

        // write-once
        let err = h
            .oracle
            .submit_report(&mut h.ledger, &h.clock, "reporter", 1, 2.0, 1.0, "", 100.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn test_challenge_window_boundary() {
        let mut h = harness();
        report(&mut h, 100.0, 50.0);

        // exactly at report_time + period the window has closed
        h.clock.advance(DEFAULT_CHALLENGE_PERIOD_SECS);
        let err = h
            .oracle
            .challenge_report(
                &mut h.ledger,
                &h.clock,
                "challenger",
                1,
                80.0,
                60.0,
                "",
                DEFAULT_CHALLENGE_BOND,
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::WindowClosed { .. }));
    }

    #[test]
    fn test_challenge_one_second_before_close_succeeds() {
        let mut h = harness();
        report(&mut h, 100.0, 50.0);

        h.clock.advance(DEFAULT_CHALLENGE_PERIOD_SECS - 1);
        challenge(&mut h, 80.0, 60.0);
        assert_eq!(
            h.oracle.resolution(1).unwrap().stage,
            ResolutionStage::OpenChallenge
        );
    }

    #[test]
    fn test_unchallenged_finalize_refunds_reporter() {
        let mut h = harness();
        report(&mut h, 100.0, 50.0);

        // window still open
        let err = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::WindowOpen { .. }));

        h.clock.advance(DEFAULT_CHALLENGE_PERIOD_SECS);
        let outcome = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap();

        assert_eq!((outcome.pass_value, outcome.fail_value), (100.0, 50.0));
        assert_eq!(h.ledger.balance("reporter"), 1_000.0);
        assert!(h.oracle.is_finalized(1));
    }

    #[test]
    fn test_challenged_finalize_pays_challenger_both_bonds() {
        let mut h = harness();
        report(&mut h, 1_000.0, 500.0);
        h.clock.advance(DAY);
        challenge(&mut h, 800.0, 600.0);

        let outcome = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap();

        assert_eq!((outcome.pass_value, outcome.fail_value), (800.0, 600.0));
        // challenger posted 150 and receives 250 total
        assert_eq!(h.ledger.balance("challenger"), 1_100.0);
        assert_eq!(h.ledger.balance("reporter"), 900.0);
        assert_eq!(h.ledger.balance(ORACLE_ESCROW_ACCOUNT), 0.0);
    }

    #[test]
    fn test_escalated_dispute_adopts_adjudicated_values() {
        let mut h = harness();
        report(&mut h, 1_000.0, 500.0);
        h.clock.advance(DAY);
        challenge(&mut h, 800.0, 600.0);

        // escalation is permissioned
        let err = h
            .oracle
            .escalate_dispute(&h.capabilities, "challenger", 1)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        h.oracle.escalate_dispute(&h.capabilities, "arbiter", 1).unwrap();

        // adjudication pending
        let err = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::DisputePending(_)));

        // adjudicator sides with the original report
        h.dispute.post_outcome(1, 1_000.0, 500.0);
        let outcome = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap();

        assert_eq!((outcome.pass_value, outcome.fail_value), (1_000.0, 500.0));
        // reporter gets both bonds back
        assert_eq!(h.ledger.balance("reporter"), 1_150.0);
        assert_eq!(h.ledger.balance("challenger"), 850.0);
    }

    #[test]
    fn test_dispute_siding_with_challenger_routes_bonds_to_them() {
        let mut h = harness();
        report(&mut h, 1_000.0, 500.0);
        challenge(&mut h, 800.0, 600.0);
        h.oracle.escalate_dispute(&h.capabilities, "arbiter", 1).unwrap();

        h.dispute.post_outcome(1, 800.0, 600.0);
        h.oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap();

        assert_eq!(h.ledger.balance("challenger"), 1_100.0);
        assert_eq!(h.ledger.balance("reporter"), 900.0);
    }

    #[test]
    fn test_finalize_twice_fails_without_state_change() {
        let mut h = harness();
        report(&mut h, 100.0, 50.0);
        h.clock.advance(DEFAULT_CHALLENGE_PERIOD_SECS);
        h.oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap();

        let before = h.ledger.balance("reporter");
        let err = h
            .oracle
            .finalize_resolution(&mut h.ledger, &h.clock, &h.dispute, 1)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(h.ledger.balance("reporter"), before);
    }

    #[test]
    fn test_finalize_pending_is_idempotent() {
        let mut h = harness();
        h.oracle.open_resolution(&h.clock, 2, "reporter").unwrap();
        report(&mut h, 100.0, 50.0);
        h.clock.advance(DEFAULT_CHALLENGE_PERIOD_SECS);

        // proposal 2 is unreported (not ready), proposal 9 unknown
        let finalized = h
            .oracle
            .finalize_pending(&mut h.ledger, &h.clock, &h.dispute, &[1, 2, 9]);
        assert_eq!(finalized, vec![1]);

        // reprocessing already-handled ids is a no-op, not an error
        let finalized = h
            .oracle
            .finalize_pending(&mut h.ledger, &h.clock, &h.dispute, &[1, 2, 9]);
        assert!(finalized.is_empty());
    }

    #[test]
    fn test_stage_never_moves_backward() {
        let mut h = harness();
        report(&mut h, 100.0, 50.0);
        challenge(&mut h, 80.0, 60.0);

        // a second report can't rewind the stage
        let err = h
            .oracle
            .submit_report(&mut h.ledger, &h.clock, "reporter", 1, 5.0, 5.0, "", 100.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        // escalation is only legal from OpenChallenge
        h.oracle.escalate_dispute(&h.capabilities, "arbiter", 1).unwrap();
        let err = h
            .oracle
            .escalate_dispute(&h.capabilities, "arbiter", 1)
            .unwrap_err();
        assert!(matches!(err, OracleError::IllegalStage { .. }));
    }
}
