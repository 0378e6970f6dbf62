// Application state: every subsystem behind one lock.
//
// The execution model is single-writer and strictly serial: each handler
// locks the state, runs one complete operation, and releases. Failed
// preconditions return before any mutation, so every operation is atomic.

use std::sync::{Arc, Mutex};

use crate::access::{CapabilityRegistry, NullificationRegistry};
use crate::clock::{Clock, SystemClock};
use crate::conditional::ConditionalLedger;
use crate::governor::{Governor, GovernorConfig};
use crate::ledger::CollateralLedger;
use crate::market::MarketController;
use crate::oracle::{OracleConfig, OracleManager, QueuedDisputeOracle};
use crate::treasury::Treasury;

pub type SharedState = Arc<Mutex<AppState>>;

pub const DEFAULT_TREASURY_FUNDS: f64 = 1_000_000.0;

pub struct AppState {
    pub ledger: CollateralLedger,
    pub positions: ConditionalLedger,
    pub markets: MarketController,
    pub oracle: OracleManager,
    pub governor: Governor,
    pub treasury: Treasury,
    pub capabilities: CapabilityRegistry,
    pub nullification: NullificationRegistry,
    pub dispute: QueuedDisputeOracle,
    pub clock: Arc<dyn Clock>,

    /// Human-readable activity feed, newest last.
    pub activity: Vec<String>,
}

impl AppState {
    /// State wired from environment configuration and the wall clock.
    pub fn new() -> Self {
        dotenv::dotenv().ok();

        let admin = std::env::var("FUTARCHY_ADMIN_ACCOUNT").unwrap_or_else(|_| "council".to_string());
        let treasury_funds = std::env::var("TREASURY_INITIAL_FUNDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TREASURY_FUNDS);

        tracing::info!(admin = %admin, treasury_funds, "initializing protocol state");

        Self::with_clock(
            Arc::new(SystemClock),
            &admin,
            treasury_funds,
            OracleConfig::from_env(),
            GovernorConfig::from_env(),
        )
    }

    /// State with an injected clock and explicit configuration.
    pub fn with_clock(
        clock: Arc<dyn Clock>,
        admin: &str,
        treasury_funds: f64,
        oracle_config: OracleConfig,
        governor_config: GovernorConfig,
    ) -> Self {
        Self {
            ledger: CollateralLedger::new(),
            positions: ConditionalLedger::new(),
            markets: MarketController::new(),
            oracle: OracleManager::new(oracle_config),
            governor: Governor::new(governor_config),
            treasury: Treasury::new(treasury_funds),
            capabilities: CapabilityRegistry::with_admin(admin),
            nullification: NullificationRegistry::new(),
            dispute: QueuedDisputeOracle::new(),
            clock,
            activity: Vec::new(),
        }
    }

    pub fn log_activity(&mut self, emoji: &str, action: &str, details: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {} {} | {}", timestamp, emoji, action, details);
        tracing::info!("{}", entry);
        self.activity.push(entry);
        if self.activity.len() > 1000 {
            self.activity.remove(0);
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
