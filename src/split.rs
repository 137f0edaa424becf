//! Split strategies.
//!
//! Every strategy turns an expense total and its participant input into one
//! [`ExpenseShare`] per participant. They share one allocation rule: all
//! participants but the last get their rounded portion, the last gets
//! whatever is left, so the shares always sum to the total exactly.

use crate::error::{EngineError, Result};
use crate::expense::{Expense, ExpenseId, ExpenseShare, ParticipantInput, SplitPolicy, UserId};
use crate::money::{percentage_of, portion, remainder, Money};
use indexmap::IndexMap;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Splits `total` among the participants according to `policy`.
///
/// Validation happens up front; on error no share is produced.
pub fn split(
    expense_id: ExpenseId,
    total: Money,
    policy: SplitPolicy,
    input: &ParticipantInput,
) -> Result<Vec<ExpenseShare>> {
    debug!("Splitting expense {} of {} using {}", expense_id, total, policy);

    match policy {
        SplitPolicy::Equal => split_equal(expense_id, total, &input.participants()),
        SplitPolicy::Percentage => {
            split_by_percentage(expense_id, total, weights(policy, input)?)
        }
        SplitPolicy::FixedAmount => split_custom(expense_id, total, weights(policy, input)?),
        SplitPolicy::Shares => split_by_shares(expense_id, total, weights(policy, input)?),
    }
}

/// Splits an expense using its own id, amount and policy.
pub fn split_expense(expense: &Expense, input: &ParticipantInput) -> Result<Vec<ExpenseShare>> {
    split(expense.id, expense.amount, expense.policy, input)
}

/// Recomputes the shares of an edited expense.
///
/// Participants present in both `existing` and the new split keep their
/// payment status and timestamp.
pub fn resplit(
    expense: &Expense,
    input: &ParticipantInput,
    existing: &[ExpenseShare],
) -> Result<Vec<ExpenseShare>> {
    let mut shares = split_expense(expense, input)?;

    for share in &mut shares {
        let previous = existing
            .iter()
            .find(|old| old.expense_id == expense.id && old.user_id == share.user_id);
        if let Some(old) = previous {
            share.paid = old.paid;
            share.paid_at = old.paid_at;
        }
    }

    debug!(
        "Recalculated {} shares for expense {}",
        shares.len(),
        expense.id
    );
    Ok(shares)
}

/// Divides `total` equally. The last participant absorbs the rounding
/// remainder.
pub fn split_equal(
    expense_id: ExpenseId,
    total: Money,
    participants: &[UserId],
) -> Result<Vec<ExpenseShare>> {
    check_total(total)?;
    if participants.is_empty() {
        return Err(EngineError::invalid("No participants provided for expense split"));
    }

    let mut seen = HashSet::with_capacity(participants.len());
    if let Some(duplicate) = participants.iter().find(|id| !seen.insert(**id)) {
        return Err(EngineError::invalid(format!(
            "Participant {} listed more than once",
            duplicate
        )));
    }

    let count = Decimal::from(participants.len());
    let each = portion(total, Decimal::ONE, count).ok_or_else(overflow)?;
    let portions: Vec<(UserId, Decimal)> = participants.iter().map(|&id| (id, each)).collect();

    let shares = with_derived_percentages(expense_id, total, allocate(total, &portions)?);

    debug!("Split {} equally among {} participants", total, participants.len());
    Ok(shares)
}

/// Divides `total` by percentages that must sum to exactly 100.
///
/// Each share keeps its input percentage verbatim.
pub fn split_by_percentage(
    expense_id: ExpenseId,
    total: Money,
    percentages: &IndexMap<UserId, Decimal>,
) -> Result<Vec<ExpenseShare>> {
    check_total(total)?;
    if percentages.is_empty() {
        return Err(EngineError::invalid("No percentage shares provided"));
    }
    if let Some((user, pct)) = percentages
        .iter()
        .find(|(_, pct)| **pct < Decimal::ZERO || **pct > Decimal::ONE_HUNDRED)
    {
        return Err(EngineError::invalid(format!(
            "Percentage {} for participant {} must be between 0 and 100",
            pct, user
        )));
    }

    let sum: Decimal = percentages.values().sum();
    if sum != Decimal::ONE_HUNDRED {
        return Err(EngineError::invalid(format!(
            "Percentages must sum to 100%, got {}",
            sum
        )));
    }

    let portions = weighted_portions(total, percentages, Decimal::ONE_HUNDRED)?;

    let shares = allocate(total, &portions)?
        .into_iter()
        .map(|(user, amount)| ExpenseShare::new(expense_id, user, amount, percentages[&user]))
        .collect();

    debug!(
        "Split {} by percentages among {} participants",
        total,
        percentages.len()
    );
    Ok(shares)
}

/// Uses caller-supplied amounts that must already sum to `total`.
pub fn split_custom(
    expense_id: ExpenseId,
    total: Money,
    amounts: &IndexMap<UserId, Decimal>,
) -> Result<Vec<ExpenseShare>> {
    check_total(total)?;
    if amounts.is_empty() {
        return Err(EngineError::invalid("No custom amounts provided"));
    }

    let mut exact = Vec::with_capacity(amounts.len());
    for (&user, &amount) in amounts {
        let money = Money::exact(amount)
            .filter(|m| !m.is_negative())
            .ok_or_else(|| {
                EngineError::invalid(format!(
                    "Custom amount {} for participant {} must be a non-negative whole-cent value",
                    amount, user
                ))
            })?;
        exact.push((user, money));
    }

    let sum: Money = exact.iter().map(|(_, m)| *m).sum();
    if sum != total {
        return Err(EngineError::invalid(format!(
            "Custom amounts must sum to total expense amount {}, got {}",
            total, sum
        )));
    }

    let shares = with_derived_percentages(expense_id, total, exact);

    debug!(
        "Split {} by custom amounts among {} participants",
        total,
        amounts.len()
    );
    Ok(shares)
}

/// Divides `total` in proportion to share ratios. The last participant
/// absorbs the rounding remainder.
pub fn split_by_shares(
    expense_id: ExpenseId,
    total: Money,
    ratios: &IndexMap<UserId, Decimal>,
) -> Result<Vec<ExpenseShare>> {
    check_total(total)?;
    if ratios.is_empty() {
        return Err(EngineError::invalid("No share ratios provided"));
    }
    if let Some((user, weight)) = ratios.iter().find(|(_, w)| **w < Decimal::ZERO) {
        return Err(EngineError::invalid(format!(
            "Share ratio {} for participant {} must not be negative",
            weight, user
        )));
    }

    let total_weight: Decimal = ratios.values().sum();
    if total_weight <= Decimal::ZERO {
        return Err(EngineError::invalid("Total shares must be greater than zero"));
    }

    let portions = weighted_portions(total, ratios, total_weight)?;

    let shares = with_derived_percentages(expense_id, total, allocate(total, &portions)?);

    debug!("Split {} by shares among {} participants", total, ratios.len());
    Ok(shares)
}

/// Rounds every portion but the last; the last participant receives the
/// remainder so that the amounts add up to `total`.
fn allocate(total: Money, portions: &[(UserId, Decimal)]) -> Result<Vec<(UserId, Money)>> {
    let Some(((last, _), rest)) = portions.split_last() else {
        return Err(EngineError::invalid("No participants provided for expense split"));
    };

    let mut allocated: Vec<(UserId, Money)> = rest
        .iter()
        .map(|&(user, exact)| (user, Money::new(exact)))
        .collect();

    let last_amount = remainder(total, allocated.iter().map(|(_, amount)| *amount));
    if last_amount.is_negative() {
        return Err(EngineError::invalid(format!(
            "Total {} is too small to split among {} participants",
            total,
            portions.len()
        )));
    }

    allocated.push((*last, last_amount));
    Ok(allocated)
}

/// Exact portion of `total` for each weight, relative to `denominator`.
fn weighted_portions(
    total: Money,
    weights: &IndexMap<UserId, Decimal>,
    denominator: Decimal,
) -> Result<Vec<(UserId, Decimal)>> {
    weights
        .iter()
        .map(|(&user, &weight)| {
            let exact = portion(total, weight, denominator).ok_or_else(overflow)?;
            Ok((user, exact))
        })
        .collect()
}

/// Builds shares whose percentage is derived from the allocated amount.
fn with_derived_percentages(
    expense_id: ExpenseId,
    total: Money,
    allocated: Vec<(UserId, Money)>,
) -> Vec<ExpenseShare> {
    allocated
        .into_iter()
        .map(|(user, amount)| {
            ExpenseShare::new(expense_id, user, amount, percentage_of(amount, total))
        })
        .collect()
}

fn check_total(total: Money) -> Result<()> {
    if total.is_negative() {
        return Err(EngineError::invalid(format!(
            "Expense total {} must not be negative",
            total
        )));
    }
    Ok(())
}

fn weights(policy: SplitPolicy, input: &ParticipantInput) -> Result<&IndexMap<UserId, Decimal>> {
    match input {
        ParticipantInput::Weighted(weights) => Ok(weights),
        ParticipantInput::Members(_) => Err(EngineError::invalid(format!(
            "{} requires a weight for every participant",
            policy
        ))),
    }
}

fn overflow() -> EngineError {
    EngineError::invalid("Amount out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn amounts(shares: &[ExpenseShare]) -> Vec<String> {
        shares.iter().map(|s| s.amount.to_string()).collect()
    }

    fn weighted(pairs: &[(UserId, Decimal)]) -> IndexMap<UserId, Decimal> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_equal_split_gives_remainder_to_last() {
        let shares = split_equal(1, money("100.00"), &[1, 2, 3]).unwrap();

        assert_eq!(amounts(&shares), vec!["33.33", "33.33", "33.34"]);
        assert_eq!(shares.iter().map(|s| s.user_id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(shares[0].percentage, dec!(33.33));
        assert_eq!(shares[2].percentage, dec!(33.34));
        assert!(shares.iter().all(|s| s.expense_id == 1 && !s.paid));
    }

    #[test]
    fn test_equal_split_order_decides_who_absorbs_remainder() {
        let shares = split_equal(1, money("100.00"), &[3, 1, 2]).unwrap();
        assert_eq!(shares[2].user_id, 2);
        assert_eq!(shares[2].amount, money("33.34"));
    }

    #[test]
    fn test_equal_split_single_participant() {
        let shares = split_equal(1, money("12.34"), &[9]).unwrap();
        assert_eq!(amounts(&shares), vec!["12.34"]);
        assert_eq!(shares[0].percentage, dec!(100));
    }

    #[test]
    fn test_equal_split_rejects_empty_and_duplicates() {
        assert!(matches!(
            split_equal(1, money("10"), &[]),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            split_equal(1, money("10"), &[1, 2, 1]),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_equal_split_zero_total() {
        let shares = split_equal(1, Money::ZERO, &[1, 2]).unwrap();
        assert_eq!(amounts(&shares), vec!["0.00", "0.00"]);
        assert!(shares.iter().all(|s| s.percentage.is_zero()));
    }

    #[test]
    fn test_equal_split_rejects_negative_remainder() {
        // 0.05 / 7 rounds up to 0.01, six of those already exceed the total
        let err = split_equal(1, money("0.05"), &[1, 2, 3, 4, 5, 6, 7]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_percentage_split() {
        let pcts = weighted(&[(1, dec!(50)), (2, dec!(30)), (3, dec!(20))]);
        let shares = split_by_percentage(1, money("200.00"), &pcts).unwrap();

        assert_eq!(amounts(&shares), vec!["100.00", "60.00", "40.00"]);
        assert_eq!(shares[1].percentage, dec!(30));
    }

    #[test]
    fn test_percentage_split_keeps_input_percentage() {
        let pcts = weighted(&[(1, dec!(33.333)), (2, dec!(33.333)), (3, dec!(33.334))]);
        let shares = split_by_percentage(1, money("10.00"), &pcts).unwrap();

        assert_eq!(amounts(&shares), vec!["3.33", "3.33", "3.34"]);
        assert_eq!(shares[0].percentage, dec!(33.333));
        assert_eq!(shares[2].percentage, dec!(33.334));
    }

    #[test]
    fn test_percentage_split_must_sum_to_100() {
        let pcts = weighted(&[(1, dec!(60)), (2, dec!(30)), (3, dec!(5))]);
        assert!(matches!(
            split_by_percentage(1, money("200.00"), &pcts),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_percentage_split_rejects_out_of_range() {
        let pcts = weighted(&[(1, dec!(150)), (2, dec!(-50))]);
        assert!(matches!(
            split_by_percentage(1, money("10.00"), &pcts),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_custom_split() {
        let custom = weighted(&[(1, dec!(25.00)), (2, dec!(25.00))]);
        let shares = split_custom(1, money("50.00"), &custom).unwrap();

        assert_eq!(amounts(&shares), vec!["25.00", "25.00"]);
        assert_eq!(shares[0].percentage, dec!(50));
    }

    #[test]
    fn test_custom_split_must_sum_exactly() {
        let custom = weighted(&[(1, dec!(25.00)), (2, dec!(24.99))]);
        assert!(matches!(
            split_custom(1, money("50.00"), &custom),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_custom_split_rejects_sub_cent_and_negative_amounts() {
        let custom = weighted(&[(1, dec!(25.005)), (2, dec!(24.995))]);
        assert!(split_custom(1, money("50.00"), &custom).is_err());

        let custom = weighted(&[(1, dec!(60)), (2, dec!(-10))]);
        assert!(split_custom(1, money("50.00"), &custom).is_err());
    }

    #[test]
    fn test_shares_split() {
        let ratios = weighted(&[(1, dec!(1)), (2, dec!(1)), (3, dec!(2))]);
        let shares = split_by_shares(1, money("100.00"), &ratios).unwrap();
        assert_eq!(amounts(&shares), vec!["25.00", "25.00", "50.00"]);
        assert_eq!(shares[2].percentage, dec!(50));

        let ratios = weighted(&[(1, dec!(1)), (2, dec!(1)), (3, dec!(1))]);
        let shares = split_by_shares(1, money("100.00"), &ratios).unwrap();
        assert_eq!(amounts(&shares), vec!["33.33", "33.33", "33.34"]);
    }

    #[test]
    fn test_shares_split_rejects_non_positive_total_weight() {
        let ratios = weighted(&[(1, dec!(0)), (2, dec!(0))]);
        assert!(matches!(
            split_by_shares(1, money("100.00"), &ratios),
            Err(EngineError::InvalidInput { .. })
        ));

        let ratios = weighted(&[(1, dec!(2)), (2, dec!(-1))]);
        assert!(split_by_shares(1, money("100.00"), &ratios).is_err());
    }

    #[test]
    fn test_dispatch_requires_weights_for_weighted_policies() {
        let input = ParticipantInput::Members(vec![1, 2]);
        for policy in [SplitPolicy::Percentage, SplitPolicy::FixedAmount, SplitPolicy::Shares] {
            assert!(matches!(
                split(1, money("10"), policy, &input),
                Err(EngineError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_dispatch_equal_accepts_weighted_input() {
        let input: ParticipantInput = [(5, dec!(7)), (6, dec!(1))].into_iter().collect();
        let shares = split(1, money("10.01"), SplitPolicy::Equal, &input).unwrap();
        assert_eq!(amounts(&shares), vec!["5.01", "5.00"]);
    }

    #[test]
    fn test_negative_total_rejected() {
        let input = ParticipantInput::Members(vec![1]);
        assert!(split(1, money("-5"), SplitPolicy::Equal, &input).is_err());
    }

    #[test]
    fn test_resplit_preserves_payment_status() {
        let at = chrono::Utc::now();
        let mut expense = Expense::new(4, 1, 1, money("90"), SplitPolicy::Equal).unwrap();
        let input = ParticipantInput::Members(vec![1, 2, 3]);
        let mut shares = split_expense(&expense, &input).unwrap();
        shares[1].mark_paid(at);

        expense.amount = money("120");
        let input = ParticipantInput::Members(vec![1, 2, 4]);
        let updated = resplit(&expense, &input, &shares).unwrap();

        assert_eq!(amounts(&updated), vec!["40.00", "40.00", "40.00"]);
        assert!(!updated[0].paid);
        assert!(updated[1].paid);
        assert_eq!(updated[1].paid_at, Some(at));
        assert!(!updated[2].paid);
    }
}
