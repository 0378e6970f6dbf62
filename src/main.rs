// Futarchy Market Protocol - Main Entry Point
// Conditional markets, bonded oracle resolution, and timelocked governance
// behind one HTTP API.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};

use futarchy_market::app_state::{AppState, SharedState};
use futarchy_market::handlers::*;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    println!("\n═══════════════════════════════════════════════");
    println!("       🏛️  Futarchy Market Protocol");
    println!("═══════════════════════════════════════════════\n");

    let state: SharedState = Arc::new(Mutex::new(AppState::new()));

    let app = Router::new()
        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(get_markets))
        .route("/markets/deploy", post(deploy_market))
        .route("/markets/deploy-batch", post(batch_deploy_markets))
        .route("/markets/resolve-batch", post(batch_resolve_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/end-trading", post(end_trading))
        .route("/markets/:id/cancel", post(cancel_market))
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/markets/:id/buy", post(buy_tokens))
        .route("/markets/:id/sell", post(sell_tokens))
        // ===== POSITION ENDPOINTS =====
        .route("/positions/split", post(split_position))
        .route("/positions/merge", post(merge_positions))
        .route("/positions/redeem", post(redeem_positions))
        .route("/positions/:account", get(get_positions))
        // ===== ORACLE ENDPOINTS =====
        .route("/oracle/finalize-pending", post(finalize_pending_resolutions))
        .route("/oracle/:proposal_id", get(get_resolution))
        .route("/oracle/:proposal_id/report", post(submit_report))
        .route("/oracle/:proposal_id/challenge", post(challenge_report))
        .route("/oracle/:proposal_id/escalate", post(escalate_dispute))
        .route("/oracle/:proposal_id/finalize", post(finalize_resolution))
        .route("/oracle/:proposal_id/dispute-outcome", post(post_dispute_outcome))
        // ===== GOVERNANCE ENDPOINTS =====
        .route("/proposals", get(get_proposals))
        .route("/proposals", post(create_proposal))
        .route("/proposals/:id", get(get_proposal))
        .route("/proposals/:id/review", post(begin_review))
        .route("/proposals/:id/activate", post(activate_proposal))
        .route("/proposals/:id/move-to-resolution", post(move_to_resolution))
        .route("/proposals/:id/finalize", post(finalize_proposal))
        .route("/proposals/:id/execute", post(execute_proposal))
        // ===== LEDGER ENDPOINTS =====
        .route("/balance/:account", get(get_balance))
        .route("/faucet", post(faucet))
        .route("/activity", get(get_activity))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port: u16 = std::env::var("FUTARCHY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4321);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("📋 Available Endpoints:");
    println!("   POST /proposals                       - Submit a governance proposal");
    println!("   POST /proposals/:id/review            - Move a proposal under review");
    println!("   POST /proposals/:id/activate          - Deploy its market pair, open trading");
    println!("   POST /proposals/:id/move-to-resolution- Close trading, open oracle resolution");
    println!("   POST /proposals/:id/finalize          - Compare values, schedule or reject");
    println!("   POST /proposals/:id/execute           - Timelocked treasury transfer");
    println!("   POST /markets/:id/buy|sell            - Trade PASS/FAIL at LMSR prices");
    println!("   POST /positions/split|merge|redeem    - Conditional position operations");
    println!("   POST /oracle/:id/report|challenge     - Bonded reporting");
    println!("   GET  /markets, /proposals, /activity  - State inspection");
    println!("\n🚀 Serving on http://{}\n", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
