//! Ledger processing.
//!
//! Reads one group's expenses, participants and payments from CSV, runs them
//! through the split, balance and settlement stages, and writes the result
//! back as CSV. Invalid rows are logged and skipped.

use crate::balance::{
    calculate_user_debts, compute_group_balances, GroupSummary, NetBalance, UserDebts,
};
use crate::error::{EngineError, Result};
use crate::expense::{Expense, ExpenseId, ExpenseShare, GroupId, ParticipantInput, UserId};
use crate::money::Money;
use crate::record::{EntryKind, LedgerEntry, LedgerRecord};
use crate::settlement::{DebtSettlement, SettlementConfig, SettlementOptimizer};
use crate::split::split_expense;
use chrono::Utc;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use indexmap::IndexMap;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::io::{Read, Write};

/// Group id assigned to every expense of a ledger file.
pub const LEDGER_GROUP: GroupId = 1;

/// An expense as declared in the ledger, before it is split.
#[derive(Debug)]
struct PendingExpense {
    expense: Expense,

    /// Participants in row order, with their optional weight.
    participants: Vec<(UserId, Option<Decimal>)>,
}

impl PendingExpense {
    /// Builds the participant input the expense's policy expects.
    fn input(&self) -> Result<ParticipantInput> {
        if !self.expense.policy.is_weighted() {
            return Ok(ParticipantInput::Members(
                self.participants.iter().map(|(user, _)| *user).collect(),
            ));
        }

        let mut weights = IndexMap::with_capacity(self.participants.len());
        for &(user, weight) in &self.participants {
            let weight = weight.ok_or_else(|| {
                EngineError::invalid(format!("participant {} has no weight", user))
            })?;
            if weights.insert(user, weight).is_some() {
                return Err(EngineError::invalid(format!(
                    "participant {} listed more than once",
                    user
                )));
            }
        }
        Ok(ParticipantInput::Weighted(weights))
    }
}

/// Accumulates ledger rows and produces a [`LedgerReport`].
pub struct LedgerEngine {
    config: SettlementConfig,

    /// Declared expenses in file order.
    expenses: IndexMap<ExpenseId, PendingExpense>,

    /// Paid markers, applied once every expense is split.
    payments: Vec<(ExpenseId, UserId, usize)>,
}

impl LedgerEngine {
    /// Creates a new empty engine.
    pub fn new(config: SettlementConfig) -> Self {
        LedgerEngine {
            config,
            expenses: IndexMap::new(),
            payments: Vec::new(),
        }
    }

    /// Processes ledger rows from a CSV reader in streaming fashion.
    ///
    /// Invalid records are logged at warn level and skipped.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        for (row_idx, result) in csv_reader.deserialize::<LedgerRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            match result.map_err(EngineError::from).and_then(|r| r.parse()) {
                Ok(entry) => {
                    if let Err(e) = self.process_entry(entry, row_num) {
                        warn!("{}", e);
                    }
                }
                Err(e) => {
                    warn!("Row {}: {}", row_num, e);
                }
            }
        }

        Ok(())
    }

    /// Processes a single parsed ledger entry.
    fn process_entry(&mut self, entry: LedgerEntry, row: usize) -> Result<()> {
        match entry.kind {
            EntryKind::Expense { amount, policy } => {
                if self.expenses.contains_key(&entry.expense) {
                    return Err(EngineError::InvalidRecord {
                        row,
                        message: format!("duplicate expense id {}", entry.expense),
                    });
                }

                let expense = Expense::new(entry.expense, LEDGER_GROUP, entry.user, amount, policy)
                    .map_err(|e| EngineError::InvalidRecord {
                        row,
                        message: e.to_string(),
                    })?;
                self.expenses.insert(
                    entry.expense,
                    PendingExpense {
                        expense,
                        participants: Vec::new(),
                    },
                );
                debug!(
                    "Row {}: Expense {} of {} paid by {}",
                    row, entry.expense, amount, entry.user
                );
            }
            EntryKind::Share(weight) => {
                let pending = self.expenses.get_mut(&entry.expense).ok_or_else(|| {
                    EngineError::InvalidRecord {
                        row,
                        message: format!("share references unknown expense {}", entry.expense),
                    }
                })?;
                pending.participants.push((entry.user, weight));
            }
            EntryKind::Paid => {
                self.payments.push((entry.expense, entry.user, row));
            }
        }

        Ok(())
    }

    /// Splits every expense, applies payments and plans the settlement.
    ///
    /// Expenses that fail to split are logged and left out. Fails only when
    /// the optimizer runs in strict mode and the balances do not cancel out.
    pub fn settle(&self) -> Result<LedgerReport> {
        let mut expenses = Vec::with_capacity(self.expenses.len());
        let mut shares = Vec::new();

        for pending in self.expenses.values() {
            let split = pending
                .input()
                .and_then(|input| split_expense(&pending.expense, &input));
            match split {
                Ok(expense_shares) => {
                    expenses.push(pending.expense.clone());
                    shares.extend(expense_shares);
                }
                Err(e) => {
                    warn!("Expense {} skipped: {}", pending.expense.id, e);
                }
            }
        }

        let now = Utc::now();
        for &(expense_id, user, row) in &self.payments {
            match shares
                .iter_mut()
                .find(|s| s.expense_id == expense_id && s.user_id == user)
            {
                Some(share) => share.mark_paid(now),
                None => warn!(
                    "Row {}: No share of expense {} for participant {}, ignoring payment",
                    row, expense_id, user
                ),
            }
        }

        let balances = compute_group_balances(&expenses, &shares);
        let settlements = SettlementOptimizer::new(self.config).optimize(&balances)?;
        let debts = calculate_user_debts(LEDGER_GROUP, &shares, &expenses);
        let summary = GroupSummary::from_expenses(LEDGER_GROUP, &expenses, &shares);

        debug!(
            "Group {}: {} expenses totalling {} in {} categories, {}% settled",
            summary.group,
            summary.total_expenses,
            summary.total_amount,
            summary.category_totals.len(),
            summary.settlement_percentage()
        );

        Ok(LedgerReport {
            expenses,
            shares,
            balances,
            settlements,
            debts,
            summary,
        })
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new(SettlementConfig::default())
    }
}

/// Everything derived from one ledger.
#[derive(Debug, Clone)]
pub struct LedgerReport {
    pub expenses: Vec<Expense>,
    pub shares: Vec<ExpenseShare>,
    pub balances: Vec<NetBalance>,
    pub settlements: Vec<DebtSettlement>,
    pub debts: UserDebts,
    pub summary: GroupSummary,
}

impl LedgerReport {
    /// Writes the settlement plan as `from,to,amount`.
    pub fn write_settlements<W: Write>(&self, writer: W) -> Result<()> {
        write_rows(writer, &["from", "to", "amount"], &self.settlements)
    }

    /// Writes net balances as `user,total_owed,total_paid,net_balance`.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        write_rows(
            writer,
            &["user", "total_owed", "total_paid", "net_balance"],
            &self.balances,
        )
    }

    /// Writes the pairwise debt map as `debtor,creditor,amount`, sorted by
    /// debtor then creditor.
    pub fn write_debts<W: Write>(&self, writer: W) -> Result<()> {
        let rows: Vec<(UserId, UserId, Money)> = self
            .debts
            .iter()
            .flat_map(|(&debtor, owed)| {
                owed.iter()
                    .map(move |(&creditor, &amount)| (debtor, creditor, amount))
            })
            .collect();
        write_rows(writer, &["debtor", "creditor", "amount"], &rows)
    }
}

/// Writes a header followed by one serialized row per item. The header is
/// written even when there are no rows.
fn write_rows<W: Write, T: serde::Serialize>(
    writer: W,
    header: &[&str],
    rows: &[T],
) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record(header)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
