// Request payloads for the HTTP API.
//
// Responses are assembled as JSON in the handlers; only the inbound shapes
// need named types.

use serde::Deserialize;

use crate::conditional::Side;
use crate::governor::ActivationSpec;
use crate::market::DeploySpec;

// ===== MARKETS =====

#[derive(Debug, Clone, Deserialize)]
pub struct DeployMarketRequest {
    pub caller: String,
    #[serde(flatten)]
    pub spec: DeploySpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchDeployRequest {
    pub caller: String,
    pub specs: Vec<DeploySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveMarketRequest {
    pub pass_value: f64,
    pub fail_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveItem {
    pub market_id: u64,
    pub pass_value: f64,
    pub fail_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResolveRequest {
    pub resolutions: Vec<ResolveItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub caller: String,
    pub side: Side,
    pub amount: f64,
}

// ===== POSITIONS =====

#[derive(Debug, Clone, Deserialize)]
pub struct PairRequest {
    pub caller: String,
    pub condition_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedeemPositionsRequest {
    pub caller: String,
    pub condition_id: String,
    pub sides: Vec<Side>,
}

// ===== ORACLE =====

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub caller: String,
    pub pass_value: f64,
    pub fail_value: f64,
    #[serde(default)]
    pub evidence_ref: String,
    pub bond: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeRequest {
    pub caller: String,
    pub counter_pass_value: f64,
    pub counter_fail_value: f64,
    #[serde(default)]
    pub evidence_ref: String,
    pub bond: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizePendingRequest {
    pub proposal_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisputeOutcomeRequest {
    pub caller: String,
    pub pass_value: f64,
    pub fail_value: f64,
}

// ===== GOVERNANCE =====

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProposalRequest {
    pub proposer: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub recipient: String,
    pub funding_amount: f64,
    pub designated_reporter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivateProposalRequest {
    pub caller: String,
    #[serde(flatten)]
    pub spec: ActivationSpec,
}

// ===== LEDGER =====

#[derive(Debug, Clone, Deserialize)]
pub struct FaucetRequest {
    pub account: String,
    pub amount: f64,
}
