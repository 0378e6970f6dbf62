/// Futarchy Market Protocol
/// Exports all modules for use as a library crate

pub mod access;
pub mod app_state;
pub mod clock;
pub mod conditional;
pub mod errors;
pub mod governor;
pub mod handlers;
pub mod ledger;
pub mod market;
pub mod models;
pub mod oracle;
pub mod treasury;

// Re-export from conditional (position ledger)
pub use conditional::{
    condition_id, execute_merge, execute_redeem, execute_split, position_id, Condition,
    ConditionalError, ConditionalLedger, PairOperation, PositionInfo, RedeemLeg, RedeemSummary,
    Side, OUTCOME_SLOT_COUNT,
};

// Re-export from market (LMSR + lifecycle controller)
pub use market::{
    market_account, BetType, DeploySpec, LmsrError, LmsrPool, Market, MarketController,
    MarketError, MarketStatus, TradeReceipt, COLLATERAL_DP, CONTROLLER_ORACLE_REF,
    MAX_TRADING_PERIOD_SECS, MIN_TRADING_PERIOD_SECS, NO_MARKET,
};

// Re-export from oracle (bonded resolution protocol)
pub use oracle::{
    Challenge, DisputeOracle, FinalizedOutcome, OracleConfig, OracleError, OracleManager,
    QueuedDisputeOracle, Report, Resolution, ResolutionStage, DEFAULT_CHALLENGE_BOND,
    DEFAULT_CHALLENGE_PERIOD_SECS, DEFAULT_REPORT_BOND, ORACLE_ESCROW_ACCOUNT,
};

// Re-export from governor (proposal phase machine)
pub use governor::{
    ActivationSpec, GovernanceProposal, Governor, GovernorConfig, GovernorError, ProposalPhase,
    DEFAULT_TIMELOCK_SECS,
};

pub use access::{Capability, CapabilityRegistry, NullificationRegistry};
pub use app_state::{AppState, SharedState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::ErrorKind;
pub use ledger::{CollateralLedger, LedgerError, LedgerTx, TxType};
pub use treasury::{Treasury, TreasuryError};
