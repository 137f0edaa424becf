//! Net balance aggregation.
//!
//! Balances are always derived from expenses and shares, never stored.

use crate::expense::{Expense, ExpenseShare, GroupId, UserId};
use crate::money::{round_percentage, Money};
use indexmap::IndexSet;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A participant's aggregate position across a set of expenses.
///
/// A positive `net_balance` means the group owes the participant money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetBalance {
    pub user: UserId,

    /// Sum of the participant's unpaid shares.
    pub total_owed: Money,

    /// Sum of the expenses the participant paid for.
    pub total_paid: Money,

    /// `total_paid - total_owed`.
    pub net_balance: Money,
}

impl NetBalance {
    pub fn new(user: UserId, total_owed: Money, total_paid: Money) -> Self {
        NetBalance {
            user,
            total_owed,
            total_paid,
            net_balance: total_paid - total_owed,
        }
    }

    /// Balance with only a net position, as fed to the settlement optimizer.
    pub fn from_net(user: UserId, net_balance: Money) -> Self {
        if net_balance.is_negative() {
            NetBalance::new(user, net_balance.abs(), Money::ZERO)
        } else {
            NetBalance::new(user, Money::ZERO, net_balance)
        }
    }

    pub fn is_creditor(&self) -> bool {
        self.net_balance.is_positive()
    }

    pub fn is_debtor(&self) -> bool {
        self.net_balance.is_negative()
    }

    pub fn is_even(&self) -> bool {
        self.net_balance.is_zero()
    }
}

/// Computes the net balance of one participant.
///
/// Shares count towards `total_owed` only while unpaid. Expenses count
/// towards `total_paid` regardless of the status of their shares.
pub fn compute_balance(user: UserId, expenses: &[Expense], shares: &[ExpenseShare]) -> NetBalance {
    let total_owed: Money = shares
        .iter()
        .filter(|s| s.user_id == user && !s.paid)
        .map(|s| s.amount)
        .sum();

    let total_paid: Money = expenses
        .iter()
        .filter(|e| e.paid_by == user)
        .map(|e| e.amount)
        .sum();

    NetBalance::new(user, total_owed, total_paid)
}

/// Computes a balance for every participant that paid an expense or holds a
/// share, in order of first appearance (expenses first, then shares).
pub fn compute_group_balances(expenses: &[Expense], shares: &[ExpenseShare]) -> Vec<NetBalance> {
    let users: IndexSet<UserId> = expenses
        .iter()
        .map(|e| e.paid_by)
        .chain(shares.iter().map(|s| s.user_id))
        .collect();

    let balances: Vec<NetBalance> = users
        .into_iter()
        .map(|user| compute_balance(user, expenses, shares))
        .collect();

    debug!(
        "Computed {} balances from {} expenses and {} shares",
        balances.len(),
        expenses.len(),
        shares.len()
    );
    balances
}

/// Debtor → (creditor → amount owed).
pub type UserDebts = BTreeMap<UserId, BTreeMap<UserId, Money>>;

/// Aggregates, for every unpaid share of the group's expenses, what the
/// share owner owes the expense payer.
///
/// Shares owned by the payer and shares of unknown or foreign expenses are
/// skipped.
pub fn calculate_user_debts(
    group: GroupId,
    shares: &[ExpenseShare],
    expenses: &[Expense],
) -> UserDebts {
    let payers: HashMap<_, _> = expenses
        .iter()
        .filter(|e| e.group_id == group)
        .map(|e| (e.id, e.paid_by))
        .collect();

    let mut debts = UserDebts::new();
    for share in shares.iter().filter(|s| !s.paid) {
        let Some(&payer) = payers.get(&share.expense_id) else {
            continue;
        };
        if payer == share.user_id {
            continue;
        }

        *debts
            .entry(share.user_id)
            .or_default()
            .entry(payer)
            .or_insert(Money::ZERO) += share.amount;
    }

    debts
}

/// Aggregate figures for one group's expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group: GroupId,
    pub total_amount: Money,
    pub total_expenses: usize,
    pub settled_expenses: usize,

    /// Expense amounts per category.
    pub category_totals: BTreeMap<String, Money>,
}

impl GroupSummary {
    pub fn from_expenses(group: GroupId, expenses: &[Expense], shares: &[ExpenseShare]) -> Self {
        let own: Vec<&Expense> = expenses.iter().filter(|e| e.group_id == group).collect();

        let mut category_totals: BTreeMap<String, Money> = BTreeMap::new();
        for expense in &own {
            *category_totals
                .entry(expense.category.clone())
                .or_insert(Money::ZERO) += expense.amount;
        }

        GroupSummary {
            group,
            total_amount: own.iter().map(|e| e.amount).sum(),
            total_expenses: own.len(),
            settled_expenses: own.iter().filter(|e| e.is_settled(shares)).count(),
            category_totals,
        }
    }

    pub fn pending_expenses(&self) -> usize {
        self.total_expenses - self.settled_expenses
    }

    /// Settled expenses as a percentage of all expenses, rounded to 2
    /// decimal places. Zero for a group without expenses.
    pub fn settlement_percentage(&self) -> Decimal {
        if self.total_expenses == 0 {
            return Decimal::ZERO;
        }
        let settled = Decimal::from(self.settled_expenses) * Decimal::ONE_HUNDRED;
        round_percentage(settled / Decimal::from(self.total_expenses))
    }
}
