// ============================================================================
// Redemption
// ============================================================================
//
// After a condition resolves, holders burn positions for collateral:
//
//   payout = balance * numerator[side] / (numerator[pass] + numerator[fail])
//
// With `[1,0]` the PASS side redeems 1:1 and FAIL burns worthless; `[1,1]`
// (a tie) pays both sides half a unit per position.
//
// ============================================================================

use serde::Serialize;

use super::{ConditionalError, ConditionalLedger, Side};

/// Outcome of a redemption, for callers and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct RedeemSummary {
    pub condition_id: String,
    pub owner: String,
    /// (side, burned amount, collateral paid) per requested index.
    pub legs: Vec<RedeemLeg>,
    pub total_payout: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemLeg {
    pub side: Side,
    pub burned: f64,
    pub payout: f64,
}

/// Burn the owner's full balance of each requested side and pay collateral.
///
/// Redeeming a side with zero balance is a no-op leg, not an error, so the
/// call is safely repeatable.
pub fn execute_redeem<F>(
    ledger: &mut ConditionalLedger,
    owner: &str,
    condition_id: &str,
    sides: &[Side],
    credit_collateral: F,
) -> Result<RedeemSummary, ConditionalError>
where
    F: FnOnce(&str, f64) -> Result<(), String>,
{
    let condition = ledger
        .condition(condition_id)
        .ok_or_else(|| ConditionalError::UnknownCondition(condition_id.to_string()))?;

    let numerators = condition
        .payout_numerators
        .ok_or_else(|| ConditionalError::NotResolved(condition_id.to_string()))?;
    let denominator: u32 = numerators.iter().sum();

    let mut legs = Vec::new();
    let mut total_payout = 0.0;

    for &side in sides {
        let balance = ledger.balance(owner, condition_id, side);
        if balance <= 0.0 {
            legs.push(RedeemLeg { side, burned: 0.0, payout: 0.0 });
            continue;
        }

        let payout = balance * numerators[side.index()] as f64 / denominator as f64;
        ledger.debit_position(owner, condition_id, side, balance)?;
        ledger.release_escrow(condition_id, payout);

        total_payout += payout;
        legs.push(RedeemLeg { side, burned: balance, payout });
    }

    if total_payout > 0.0 {
        credit_collateral(owner, total_payout).map_err(ConditionalError::Collateral)?;
    }

    Ok(RedeemSummary {
        condition_id: condition_id.to_string(),
        owner: owner.to_string(),
        legs,
        total_payout,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::split::execute_split;
    use super::*;

    fn ok_collateral(_account: &str, _amount: f64) -> Result<(), String> {
        Ok(())
    }

    fn prepared_with_holdings() -> (ConditionalLedger, String) {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();
        execute_split(&mut ledger, "alice", &cid, 100.0, ok_collateral).unwrap();
        (ledger, cid)
    }

    #[test]
    fn test_redeem_requires_resolution() {
        let (mut ledger, cid) = prepared_with_holdings();

        let err =
            execute_redeem(&mut ledger, "alice", &cid, &[Side::Pass], ok_collateral).unwrap_err();
        assert!(matches!(err, ConditionalError::NotResolved(_)));
    }

    #[test]
    fn test_winner_redeems_full_value() {
        let (mut ledger, cid) = prepared_with_holdings();
        ledger.report_payouts("controller", &cid, [1, 0]).unwrap();

        let mut paid = 0.0;
        let summary = execute_redeem(&mut ledger, "alice", &cid, &[Side::Pass], |_, amt| {
            paid = amt;
            Ok(())
        })
        .unwrap();

        assert_eq!(summary.total_payout, 100.0);
        assert_eq!(paid, 100.0);
        assert_eq!(ledger.balance("alice", &cid, Side::Pass), 0.0);
    }

    #[test]
    fn test_loser_redeems_nothing() {
        let (mut ledger, cid) = prepared_with_holdings();
        ledger.report_payouts("controller", &cid, [1, 0]).unwrap();

        let summary =
            execute_redeem(&mut ledger, "alice", &cid, &[Side::Fail], ok_collateral).unwrap();

        assert_eq!(summary.total_payout, 0.0);
        // losing positions burn out
        assert_eq!(ledger.balance("alice", &cid, Side::Fail), 0.0);
    }

    #[test]
    fn test_tie_pays_half_per_side() {
        let (mut ledger, cid) = prepared_with_holdings();
        ledger.report_payouts("controller", &cid, [1, 1]).unwrap();

        let summary = execute_redeem(
            &mut ledger,
            "alice",
            &cid,
            &[Side::Pass, Side::Fail],
            ok_collateral,
        )
        .unwrap();

        // 100 of each side at numerators [1,1] -> 50 + 50
        assert_eq!(summary.total_payout, 100.0);
        assert_eq!(summary.legs[0].payout, 50.0);
        assert_eq!(summary.legs[1].payout, 50.0);
    }

    #[test]
    fn test_redeem_twice_is_noop() {
        let (mut ledger, cid) = prepared_with_holdings();
        ledger.report_payouts("controller", &cid, [0, 1]).unwrap();

        execute_redeem(&mut ledger, "alice", &cid, &[Side::Fail], ok_collateral).unwrap();
        let second =
            execute_redeem(&mut ledger, "alice", &cid, &[Side::Fail], ok_collateral).unwrap();

        assert_eq!(second.total_payout, 0.0);
    }
}
