// ============================================================================
// Split & Merge
// ============================================================================
//
// Splitting locks collateral 1:1 and mints complementary positions:
//
//   1 collateral -> 1 PASS + 1 FAIL
//
// Merging is the exact inverse. Both are legal before and after resolution;
// the escrow backing the pair never moves until a merge or redemption burns
// it out.
//
// Collateral movement is injected as closures so this module stays a leaf:
// callers decide which ledger account pays or receives.
//
// ============================================================================

use serde::Serialize;

use super::{ConditionalError, ConditionalLedger, Side};

/// Outcome of a split or merge, for callers and API responses.
#[derive(Debug, Clone, Serialize)]
pub struct PairOperation {
    pub condition_id: String,
    pub owner: String,
    /// Collateral locked (split) or released (merge).
    pub amount: f64,
    pub pass_balance: f64,
    pub fail_balance: f64,
}

/// Lock `amount` collateral and credit `owner` with `amount` of each side.
///
/// `debit_collateral` is called exactly once, before any position is minted;
/// if it fails nothing changes.
pub fn execute_split<F>(
    ledger: &mut ConditionalLedger,
    owner: &str,
    condition_id: &str,
    amount: f64,
    debit_collateral: F,
) -> Result<PairOperation, ConditionalError>
where
    F: FnOnce(&str, f64) -> Result<(), String>,
{
    if amount <= 0.0 || !amount.is_finite() {
        return Err(ConditionalError::InvalidAmount(amount));
    }
    if ledger.condition(condition_id).is_none() {
        return Err(ConditionalError::UnknownCondition(condition_id.to_string()));
    }

    debit_collateral(owner, amount).map_err(ConditionalError::Collateral)?;

    ledger.credit_position(owner, condition_id, Side::Pass, amount);
    ledger.credit_position(owner, condition_id, Side::Fail, amount);
    ledger.add_escrow(condition_id, amount);

    Ok(PairOperation {
        condition_id: condition_id.to_string(),
        owner: owner.to_string(),
        amount,
        pass_balance: ledger.balance(owner, condition_id, Side::Pass),
        fail_balance: ledger.balance(owner, condition_id, Side::Fail),
    })
}

/// Burn `amount` of each side and release `amount` collateral to `owner`.
///
/// Fails if the owner lacks `amount` of either side. Both burns are checked
/// before either happens, so a failure leaves balances untouched.
pub fn execute_merge<F>(
    ledger: &mut ConditionalLedger,
    owner: &str,
    condition_id: &str,
    amount: f64,
    credit_collateral: F,
) -> Result<PairOperation, ConditionalError>
where
    F: FnOnce(&str, f64) -> Result<(), String>,
{
    if amount <= 0.0 || !amount.is_finite() {
        return Err(ConditionalError::InvalidAmount(amount));
    }
    if ledger.condition(condition_id).is_none() {
        return Err(ConditionalError::UnknownCondition(condition_id.to_string()));
    }

    for side in [Side::Pass, Side::Fail] {
        let available = ledger.balance(owner, condition_id, side);
        if available < amount {
            return Err(ConditionalError::InsufficientPosition {
                side,
                available,
                requested: amount,
            });
        }
    }

    ledger.debit_position(owner, condition_id, Side::Pass, amount)?;
    ledger.debit_position(owner, condition_id, Side::Fail, amount)?;
    ledger.release_escrow(condition_id, amount);

    credit_collateral(owner, amount).map_err(ConditionalError::Collateral)?;

    Ok(PairOperation {
        condition_id: condition_id.to_string(),
        owner: owner.to_string(),
        amount,
        pass_balance: ledger.balance(owner, condition_id, Side::Pass),
        fail_balance: ledger.balance(owner, condition_id, Side::Fail),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_collateral(_account: &str, _amount: f64) -> Result<(), String> {
        Ok(())
    }

    #[test]
    fn test_split_mints_equal_pair() {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();

        let result = execute_split(&mut ledger, "alice", &cid, 100.0, ok_collateral).unwrap();

        assert_eq!(result.pass_balance, 100.0);
        assert_eq!(result.fail_balance, 100.0);
        assert_eq!(ledger.escrowed(&cid), 100.0);
        assert_eq!(
            ledger.total_supply(&cid, Side::Pass),
            ledger.total_supply(&cid, Side::Fail)
        );
    }

    #[test]
    fn test_split_requires_collateral() {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();

        let result = execute_split(&mut ledger, "alice", &cid, 100.0, |_, _| {
            Err("no funds".to_string())
        });

        assert!(result.is_err());
        assert_eq!(ledger.balance("alice", &cid, Side::Pass), 0.0);
        assert_eq!(ledger.escrowed(&cid), 0.0);
    }

    #[test]
    fn test_split_then_merge_round_trips() {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();

        execute_split(&mut ledger, "alice", &cid, 50.0, ok_collateral).unwrap();
        execute_merge(&mut ledger, "alice", &cid, 50.0, ok_collateral).unwrap();

        assert_eq!(ledger.balance("alice", &cid, Side::Pass), 0.0);
        assert_eq!(ledger.balance("alice", &cid, Side::Fail), 0.0);
        assert_eq!(ledger.escrowed(&cid), 0.0);
    }

    #[test]
    fn test_merge_needs_both_sides() {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();

        execute_split(&mut ledger, "alice", &cid, 50.0, ok_collateral).unwrap();
        // give away the FAIL leg, merge must now fail
        ledger
            .transfer_position("alice", "bob", &cid, Side::Fail, 30.0)
            .unwrap();

        let err = execute_merge(&mut ledger, "alice", &cid, 50.0, ok_collateral).unwrap_err();
        assert!(matches!(
            err,
            ConditionalError::InsufficientPosition { side: Side::Fail, .. }
        ));
        // PASS leg untouched by the failed merge
        assert_eq!(ledger.balance("alice", &cid, Side::Pass), 50.0);
    }

    #[test]
    fn test_split_allowed_after_resolution() {
        let mut ledger = ConditionalLedger::new();
        let cid = ledger.prepare_condition("controller", "q", 2).unwrap();
        ledger.report_payouts("controller", &cid, [1, 0]).unwrap();

        // collateral is still escrowed 1:1, so splitting stays legal
        let result = execute_split(&mut ledger, "alice", &cid, 10.0, ok_collateral);
        assert!(result.is_ok());
    }
}
