//! Debt settlement planning.
//!
//! Greedy matching: every debtor, in input order, pays the creditor with the
//! largest outstanding credit until its debt is cleared. The plan holds at
//! most `creditors + debtors - 1` transfers; it is not guaranteed minimal.

use crate::balance::NetBalance;
use crate::error::{EngineError, Result};
use crate::expense::UserId;
use crate::money::Money;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A single proposed payment from one participant to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebtSettlement {
    /// Paying participant (debtor).
    pub from: UserId,

    /// Receiving participant (creditor).
    pub to: UserId,

    /// Always positive.
    pub amount: Money,
}

impl DebtSettlement {
    pub fn new(from: UserId, to: UserId, amount: Money) -> Self {
        DebtSettlement { from, to, amount }
    }
}

/// Settlement behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettlementConfig {
    /// Reject balances whose credits and debts do not cancel out.
    ///
    /// When `false` such input is planned as far as possible and the
    /// leftover is only reported at warn level.
    pub strict: bool,
}

impl SettlementConfig {
    pub fn strict() -> Self {
        SettlementConfig { strict: true }
    }
}

/// Plans transfers that bring every net balance to zero.
#[derive(Debug, Clone, Default)]
pub struct SettlementOptimizer {
    config: SettlementConfig,
}

impl SettlementOptimizer {
    pub fn new(config: SettlementConfig) -> Self {
        SettlementOptimizer { config }
    }

    pub fn config(&self) -> SettlementConfig {
        self.config
    }

    /// Produces the ordered settlement plan for `balances`.
    ///
    /// Repeated entries for the same participant are netted first, so nobody
    /// pays themselves. Zero nets are ignored. Creditor ties are broken by
    /// input order.
    pub fn optimize(&self, balances: &[NetBalance]) -> Result<Vec<DebtSettlement>> {
        debug!("Optimizing debts for {} users", balances.len());

        let mut nets: IndexMap<UserId, Money> = IndexMap::new();
        for balance in balances {
            *nets.entry(balance.user).or_insert(Money::ZERO) += balance.net_balance;
        }

        let creditors: IndexMap<UserId, Money> = nets
            .iter()
            .filter(|(_, net)| net.is_positive())
            .map(|(&user, &net)| (user, net))
            .collect();
        let debtors: IndexMap<UserId, Money> = nets
            .iter()
            .filter(|(_, net)| net.is_negative())
            .map(|(&user, &net)| (user, net.abs()))
            .collect();

        let credits: Money = creditors.values().sum();
        let debts: Money = debtors.values().sum();
        if self.config.strict && credits != debts {
            return Err(EngineError::PreconditionViolated { credits, debts });
        }

        // Largest remaining credit first, earliest creditor on ties.
        let mut heap: BinaryHeap<(Money, Reverse<usize>)> = creditors
            .values()
            .enumerate()
            .map(|(idx, &credit)| (credit, Reverse(idx)))
            .collect();

        let mut settlements = Vec::new();
        let mut unsettled_debt = Money::ZERO;

        for (&debtor, &debt) in &debtors {
            let mut remaining = debt;

            while remaining.is_positive() {
                let Some((credit, Reverse(idx))) = heap.pop() else {
                    break;
                };
                let Some((&creditor, _)) = creditors.get_index(idx) else {
                    continue;
                };

                let amount = remaining.min(credit);
                settlements.push(DebtSettlement::new(debtor, creditor, amount));
                remaining -= amount;

                let left = credit - amount;
                if left.is_positive() {
                    heap.push((left, Reverse(idx)));
                }
            }

            unsettled_debt += remaining;
        }

        let unsettled_credit: Money = heap.iter().map(|(credit, _)| *credit).sum();
        if !unsettled_debt.is_zero() || !unsettled_credit.is_zero() {
            warn!(
                "Balances do not sum to zero (credits {}, debts {}), leaving {} debt and {} credit",
                credits, debts, unsettled_debt, unsettled_credit
            );
        }

        debug!("Generated {} debt settlements", settlements.len());
        Ok(settlements)
    }
}

/// Plans settlements with the default (lenient) configuration.
pub fn optimize(balances: &[NetBalance]) -> Vec<DebtSettlement> {
    // Lenient mode never fails.
    SettlementOptimizer::default()
        .optimize(balances)
        .unwrap_or_default()
}
