// HTTP request handlers.
//
// Each handler locks the shared state, runs exactly one core operation, and
// maps the result to JSON. Core errors carry their taxonomy kind, which
// decides the status code: validation 400, economic 402, authorization 403,
// duplicate 409.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::conditional::{execute_merge, execute_redeem, execute_split};
use crate::errors::ErrorKind;
use crate::governor::GovernanceProposal;
use crate::ledger::TxType;
use crate::market::Market;
use crate::models::*;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn failure(kind: ErrorKind, message: String) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "success": false, "kind": kind, "error": message })))
}

fn market_json(market: &Market) -> Value {
    let (price_pass, price_fail) = market.pool.prices();
    json!({
        "id": market.id,
        "proposal_id": market.proposal_id,
        "collateral_asset": market.collateral_asset,
        "liquidity_param": market.pool.b,
        "total_liquidity": market.total_liquidity,
        "trading_end_time": market.trading_end_time,
        "status": market.status,
        "bet_type": market.bet_type,
        "condition_id": market.condition_id,
        "pass_position_id": market.pass_position_id,
        "fail_position_id": market.fail_position_id,
        "price_pass": price_pass,
        "price_fail": price_fail,
        "pass_value": market.pass_value,
        "fail_value": market.fail_value,
        "resolved": market.resolved,
    })
}

fn proposal_json(proposal: &GovernanceProposal) -> Value {
    json!({
        "id": proposal.id,
        "title": proposal.title,
        "description": proposal.description,
        "proposer": proposal.proposer,
        "recipient": proposal.recipient,
        "funding_amount": proposal.funding_amount,
        "designated_reporter": proposal.designated_reporter,
        "phase": proposal.phase,
        "market_id": proposal.market_id,
        "execution_time": proposal.execution_time,
        "executed": proposal.executed,
        "final_pass_value": proposal.final_pass_value,
        "final_fail_value": proposal.final_fail_value,
    })
}

// ===== HEALTH =====

pub async fn health_check() -> &'static str {
    "Futarchy Market Protocol - Online"
}

// ===== MARKET ENDPOINTS =====

pub async fn deploy_market(
    State(state): State<SharedState>,
    Json(request): Json<DeployMarketRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.markets.deploy_market_pair(
        &mut app.ledger,
        &mut app.positions,
        &app.capabilities,
        clock.as_ref(),
        &request.caller,
        &request.spec,
    ) {
        Ok(market_id) => {
            app.log_activity(
                "📊",
                "MARKET_DEPLOYED",
                &format!("market {} for proposal {}", market_id, request.spec.proposal_id),
            );
            Ok(Json(json!({ "success": true, "market_id": market_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn batch_deploy_markets(
    State(state): State<SharedState>,
    Json(request): Json<BatchDeployRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.markets.batch_deploy_markets(
        &mut app.ledger,
        &mut app.positions,
        &app.capabilities,
        clock.as_ref(),
        &request.caller,
        &request.specs,
    ) {
        Ok(market_ids) => {
            app.log_activity("📊", "BATCH_DEPLOY", &format!("{} markets", market_ids.len()));
            Ok(Json(json!({ "success": true, "market_ids": market_ids })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn end_trading(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.markets.end_trading(clock.as_ref(), market_id) {
        Ok(()) => {
            app.log_activity("🔒", "TRADING_ENDED", &format!("market {}", market_id));
            Ok(Json(json!({ "success": true, "market_id": market_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn cancel_market(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
    Json(request): Json<CallerRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    match app
        .markets
        .cancel_market(&app.capabilities, &request.caller, market_id)
    {
        Ok(()) => {
            app.log_activity("🚫", "MARKET_CANCELLED", &format!("market {}", market_id));
            Ok(Json(json!({ "success": true, "market_id": market_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn resolve_market(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
    Json(request): Json<ResolveMarketRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    match app.markets.resolve_market(
        &mut app.positions,
        market_id,
        request.pass_value,
        request.fail_value,
    ) {
        Ok(()) => {
            app.log_activity(
                "✅",
                "MARKET_RESOLVED",
                &format!(
                    "market {} pass={} fail={}",
                    market_id, request.pass_value, request.fail_value
                ),
            );
            Ok(Json(json!({ "success": true, "market_id": market_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn batch_resolve_markets(
    State(state): State<SharedState>,
    Json(request): Json<BatchResolveRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    let items: Vec<(u64, f64, f64)> = request
        .resolutions
        .iter()
        .map(|r| (r.market_id, r.pass_value, r.fail_value))
        .collect();

    match app.markets.batch_resolve_markets(&mut app.positions, &items) {
        Ok(()) => {
            app.log_activity("✅", "BATCH_RESOLVE", &format!("{} markets", items.len()));
            Ok(Json(json!({ "success": true, "resolved": items.len() })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn buy_tokens(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
    Json(request): Json<TradeRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.markets.buy_tokens(
        &mut app.ledger,
        &mut app.positions,
        &app.nullification,
        clock.as_ref(),
        &request.caller,
        market_id,
        request.side,
        request.amount,
    ) {
        Ok(receipt) => {
            app.log_activity(
                "🎯",
                "BUY",
                &format!(
                    "{} bought {} {} on market {} for {}",
                    request.caller, request.amount, request.side, market_id, receipt.collateral
                ),
            );
            Ok(Json(json!({ "success": true, "trade": receipt })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn sell_tokens(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
    Json(request): Json<TradeRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.markets.sell_tokens(
        &mut app.ledger,
        &mut app.positions,
        &app.nullification,
        clock.as_ref(),
        &request.caller,
        market_id,
        request.side,
        request.amount,
    ) {
        Ok(receipt) => {
            app.log_activity(
                "💱",
                "SELL",
                &format!(
                    "{} sold {} {} on market {} for {}",
                    request.caller, request.amount, request.side, market_id, receipt.collateral
                ),
            );
            Ok(Json(json!({ "success": true, "trade": receipt })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn get_markets(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    let mut markets: Vec<Value> = app.markets.markets.values().map(market_json).collect();
    markets.sort_by_key(|m| m["id"].as_u64());
    Json(json!({ "markets": markets }))
}

pub async fn get_market(
    State(state): State<SharedState>,
    Path(market_id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let app = state.lock().unwrap();
    let market = app.markets.market(market_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(market_json(market)))
}

// ===== POSITION ENDPOINTS =====

pub async fn split_position(
    State(state): State<SharedState>,
    Json(request): Json<PairRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let now = app.clock.now();

    let ledger = &mut app.ledger;
    let result = execute_split(
        &mut app.positions,
        &request.caller,
        &request.condition_id,
        request.amount,
        |account, amount| ledger.debit(account, amount).map_err(|e| e.to_string()),
    );

    match result {
        Ok(op) => {
            app.ledger.record(
                TxType::Split,
                &request.caller,
                None,
                request.amount,
                None,
                now,
                None,
            );
            Ok(Json(json!({ "success": true, "position": op })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn merge_positions(
    State(state): State<SharedState>,
    Json(request): Json<PairRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let now = app.clock.now();

    let ledger = &mut app.ledger;
    let result = execute_merge(
        &mut app.positions,
        &request.caller,
        &request.condition_id,
        request.amount,
        |account, amount| ledger.credit(account, amount).map_err(|e| e.to_string()),
    );

    match result {
        Ok(op) => {
            app.ledger.record(
                TxType::Merge,
                &request.caller,
                None,
                request.amount,
                None,
                now,
                None,
            );
            Ok(Json(json!({ "success": true, "position": op })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn redeem_positions(
    State(state): State<SharedState>,
    Json(request): Json<RedeemPositionsRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let now = app.clock.now();

    let ledger = &mut app.ledger;
    let result = execute_redeem(
        &mut app.positions,
        &request.caller,
        &request.condition_id,
        &request.sides,
        |account, amount| ledger.credit(account, amount).map_err(|e| e.to_string()),
    );

    match result {
        Ok(summary) => {
            app.ledger.record(
                TxType::Redeem,
                &request.caller,
                None,
                summary.total_payout,
                None,
                now,
                None,
            );
            app.log_activity(
                "💰",
                "REDEEM",
                &format!("{} redeemed {} collateral", request.caller, summary.total_payout),
            );
            Ok(Json(json!({ "success": true, "redemption": summary })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn get_positions(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({
        "account": account,
        "positions": app.positions.positions_of(&account),
    }))
}

// ===== ORACLE ENDPOINTS =====

pub async fn submit_report(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<ReportRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.oracle.submit_report(
        &mut app.ledger,
        clock.as_ref(),
        &request.caller,
        proposal_id,
        request.pass_value,
        request.fail_value,
        &request.evidence_ref,
        request.bond,
    ) {
        Ok(()) => {
            app.log_activity(
                "📝",
                "REPORT",
                &format!(
                    "proposal {} reported pass={} fail={}",
                    proposal_id, request.pass_value, request.fail_value
                ),
            );
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn challenge_report(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<ChallengeRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.oracle.challenge_report(
        &mut app.ledger,
        clock.as_ref(),
        &request.caller,
        proposal_id,
        request.counter_pass_value,
        request.counter_fail_value,
        &request.evidence_ref,
        request.bond,
    ) {
        Ok(()) => {
            app.log_activity("⚔️", "CHALLENGE", &format!("proposal {} challenged", proposal_id));
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn escalate_dispute(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<CallerRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    match app
        .oracle
        .escalate_dispute(&app.capabilities, &request.caller, proposal_id)
    {
        Ok(()) => {
            app.log_activity("⚖️", "ESCALATED", &format!("proposal {}", proposal_id));
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn finalize_resolution(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    let dispute = app.dispute.clone();
    match app
        .oracle
        .finalize_resolution(&mut app.ledger, clock.as_ref(), &dispute, proposal_id)
    {
        Ok(outcome) => {
            app.log_activity(
                "🏁",
                "RESOLUTION_FINAL",
                &format!(
                    "proposal {} pass={} fail={}",
                    proposal_id, outcome.pass_value, outcome.fail_value
                ),
            );
            Ok(Json(json!({ "success": true, "outcome": outcome })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn finalize_pending_resolutions(
    State(state): State<SharedState>,
    Json(request): Json<FinalizePendingRequest>,
) -> Json<Value> {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    let dispute = app.dispute.clone();
    let finalized = app.oracle.finalize_pending(
        &mut app.ledger,
        clock.as_ref(),
        &dispute,
        &request.proposal_ids,
    );
    Json(json!({ "success": true, "finalized": finalized }))
}

pub async fn get_resolution(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let app = state.lock().unwrap();
    let resolution = app.oracle.resolution(proposal_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "resolution": resolution })))
}

pub async fn post_dispute_outcome(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<DisputeOutcomeRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    if !app
        .capabilities
        .has_capability(&request.caller, crate::access::Capability::Administer)
    {
        return Err(failure(
            ErrorKind::Authorization,
            format!("Unauthorized: {}", request.caller),
        ));
    }

    app.dispute
        .post_outcome(proposal_id, request.pass_value, request.fail_value);
    Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
}

// ===== GOVERNANCE ENDPOINTS =====

pub async fn create_proposal(
    State(state): State<SharedState>,
    Json(request): Json<CreateProposalRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.governor.create_proposal(
        clock.as_ref(),
        &request.proposer,
        &request.title,
        &request.description,
        &request.recipient,
        request.funding_amount,
        &request.designated_reporter,
    ) {
        Ok(proposal_id) => {
            app.log_activity(
                "🗳️",
                "PROPOSAL_CREATED",
                &format!("proposal {} \"{}\"", proposal_id, request.title),
            );
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn begin_review(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<CallerRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;

    match app
        .governor
        .begin_review(&app.capabilities, &request.caller, proposal_id)
    {
        Ok(()) => Ok(Json(json!({ "success": true, "proposal_id": proposal_id }))),
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn activate_proposal(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
    Json(request): Json<ActivateProposalRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.governor.activate_proposal(
        &mut app.markets,
        &mut app.ledger,
        &mut app.positions,
        &app.capabilities,
        clock.as_ref(),
        &request.caller,
        proposal_id,
        &request.spec,
    ) {
        Ok(market_id) => {
            app.log_activity(
                "🚀",
                "PROPOSAL_ACTIVATED",
                &format!("proposal {} trading on market {}", proposal_id, market_id),
            );
            Ok(Json(json!({
                "success": true,
                "proposal_id": proposal_id,
                "market_id": market_id,
            })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn move_to_resolution(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.governor.move_to_resolution(
        &mut app.markets,
        &mut app.oracle,
        clock.as_ref(),
        proposal_id,
    ) {
        Ok(()) => {
            app.log_activity("⏳", "RESOLUTION_OPEN", &format!("proposal {}", proposal_id));
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn finalize_proposal(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.governor.finalize_proposal(
        &mut app.markets,
        &mut app.positions,
        &app.oracle,
        clock.as_ref(),
        proposal_id,
    ) {
        Ok(phase) => {
            app.log_activity(
                "🏛️",
                "PROPOSAL_FINALIZED",
                &format!("proposal {} -> {}", proposal_id, phase),
            );
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id, "phase": phase })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn execute_proposal(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let clock = app.clock.clone();

    match app.governor.execute_proposal(
        &mut app.treasury,
        &mut app.ledger,
        clock.as_ref(),
        proposal_id,
    ) {
        Ok(()) => {
            app.log_activity("💸", "PROPOSAL_EXECUTED", &format!("proposal {}", proposal_id));
            Ok(Json(json!({ "success": true, "proposal_id": proposal_id })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn get_proposals(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    let mut proposals: Vec<Value> = app.governor.proposals.values().map(proposal_json).collect();
    proposals.sort_by_key(|p| p["id"].as_u64());
    Json(json!({ "proposals": proposals }))
}

pub async fn get_proposal(
    State(state): State<SharedState>,
    Path(proposal_id): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let app = state.lock().unwrap();
    let proposal = app.governor.proposal(proposal_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(proposal_json(proposal)))
}

// ===== LEDGER ENDPOINTS =====

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({ "account": account, "balance": app.ledger.balance(&account) }))
}

pub async fn faucet(
    State(state): State<SharedState>,
    Json(request): Json<FaucetRequest>,
) -> ApiResult {
    let mut guard = state.lock().unwrap();
    let app = &mut *guard;
    let now = app.clock.now();

    match app.ledger.credit(&request.account, request.amount) {
        Ok(()) => {
            app.ledger.record(
                TxType::Faucet,
                "faucet",
                Some(&request.account),
                request.amount,
                None,
                now,
                None,
            );
            Ok(Json(json!({
                "success": true,
                "account": request.account,
                "balance": app.ledger.balance(&request.account),
            })))
        }
        Err(e) => Err(failure(e.kind(), e.to_string())),
    }
}

pub async fn get_activity(State(state): State<SharedState>) -> Json<Value> {
    let app = state.lock().unwrap();
    Json(json!({ "activity": app.activity }))
}
