//! Expense, share and split policy models.

use crate::error::{EngineError, Result};
use crate::money::Money;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Participant (user) identifier.
pub type UserId = u64;

/// Expense identifier.
pub type ExpenseId = u64;

/// Group identifier.
pub type GroupId = u64;

/// Currency assumed when none is given.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "Other";

const MAX_CATEGORY_LEN: usize = 50;

/// How an expense is divided among its participants.
///
/// Carries no payload: the weights (percentages, amounts or ratios) are
/// supplied per call through [`ParticipantInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitPolicy {
    /// Same amount for everyone.
    #[default]
    Equal,

    /// Weights are percentages that must sum to 100.
    Percentage,

    /// Weights are amounts that must sum to the expense total.
    FixedAmount,

    /// Weights are ratios relative to their sum.
    Shares,
}

impl SplitPolicy {
    pub const ALL: [SplitPolicy; 4] = [
        SplitPolicy::Equal,
        SplitPolicy::Percentage,
        SplitPolicy::FixedAmount,
        SplitPolicy::Shares,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SplitPolicy::Equal => "Equal Split",
            SplitPolicy::Percentage => "Percentage Split",
            SplitPolicy::FixedAmount => "Custom Amount",
            SplitPolicy::Shares => "By Shares",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SplitPolicy::Equal => "Split equally among all participants",
            SplitPolicy::Percentage => "Split based on custom percentages",
            SplitPolicy::FixedAmount => "Custom amounts for each participant",
            SplitPolicy::Shares => "Split based on share ratios",
        }
    }

    /// Returns `true` if the policy needs a weight per participant.
    pub fn is_weighted(&self) -> bool {
        !matches!(self, SplitPolicy::Equal)
    }
}

impl FromStr for SplitPolicy {
    type Err = EngineError;

    /// Accepts the tag (`equal`, `percentage`, `fixed`, `shares`, plus the
    /// aliases `custom` and `by_shares`) or the display name, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase();

        let policy = match tag.as_str() {
            "equal" => Some(SplitPolicy::Equal),
            "percentage" => Some(SplitPolicy::Percentage),
            "fixed" | "fixed_amount" | "custom" => Some(SplitPolicy::FixedAmount),
            "shares" | "by_shares" => Some(SplitPolicy::Shares),
            _ => SplitPolicy::ALL
                .into_iter()
                .find(|p| p.display_name().eq_ignore_ascii_case(&tag)),
        };

        policy.ok_or_else(|| EngineError::UnsupportedSplitType(s.trim().to_string()))
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Participants of a single split call.
///
/// Order is load-bearing: the last participant in iteration order receives
/// the rounding remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantInput {
    /// Plain ordered participant list, used by [`SplitPolicy::Equal`].
    Members(Vec<UserId>),

    /// Participant → weight in insertion order.
    Weighted(IndexMap<UserId, Decimal>),
}

impl ParticipantInput {
    /// Number of participants (duplicates included).
    pub fn len(&self) -> usize {
        match self {
            ParticipantInput::Members(ids) => ids.len(),
            ParticipantInput::Weighted(weights) => weights.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Participant ids in input order.
    pub fn participants(&self) -> Vec<UserId> {
        match self {
            ParticipantInput::Members(ids) => ids.clone(),
            ParticipantInput::Weighted(weights) => weights.keys().copied().collect(),
        }
    }
}

impl From<Vec<UserId>> for ParticipantInput {
    fn from(ids: Vec<UserId>) -> Self {
        ParticipantInput::Members(ids)
    }
}

impl From<IndexMap<UserId, Decimal>> for ParticipantInput {
    fn from(weights: IndexMap<UserId, Decimal>) -> Self {
        ParticipantInput::Weighted(weights)
    }
}

impl FromIterator<(UserId, Decimal)> for ParticipantInput {
    fn from_iter<T: IntoIterator<Item = (UserId, Decimal)>>(iter: T) -> Self {
        ParticipantInput::Weighted(iter.into_iter().collect())
    }
}

/// A shared cost paid by one group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,

    /// Member who paid the full amount.
    pub paid_by: UserId,

    /// Total amount, never negative.
    pub amount: Money,

    /// Three-letter upper-case currency code.
    pub currency: String,

    /// Free-form grouping label, never blank.
    pub category: String,

    pub policy: SplitPolicy,
}

impl Expense {
    /// Creates an expense in the default currency.
    ///
    /// Fails with [`EngineError::InvalidAmount`] if `amount` is negative or
    /// larger than [`Money::MAX`].
    pub fn new(
        id: ExpenseId,
        group_id: GroupId,
        paid_by: UserId,
        amount: Money,
        policy: SplitPolicy,
    ) -> Result<Self> {
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "expense {} has negative amount {}",
                id, amount
            )));
        }
        if !amount.in_range() {
            return Err(EngineError::InvalidAmount(format!(
                "expense {} amount {} exceeds {}",
                id,
                amount,
                Money::MAX
            )));
        }

        Ok(Expense {
            id,
            group_id,
            paid_by,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            policy,
        })
    }

    /// Replaces the currency code. Blank input falls back to the default.
    pub fn with_currency(mut self, currency: &str) -> Result<Self> {
        let code = currency.trim();
        if code.is_empty() {
            self.currency = DEFAULT_CURRENCY.to_string();
            return Ok(self);
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::InvalidCurrency(code.to_string()));
        }
        self.currency = code.to_ascii_uppercase();
        Ok(self)
    }

    /// Replaces the category. Blank input falls back to the default.
    pub fn with_category(mut self, category: &str) -> Result<Self> {
        let name = category.trim();
        if name.chars().count() > MAX_CATEGORY_LEN {
            return Err(EngineError::invalid(format!(
                "category '{}' exceeds {} characters",
                name, MAX_CATEGORY_LEN
            )));
        }
        self.category = if name.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            name.to_string()
        };
        Ok(self)
    }

    /// Returns `true` once every share of this expense has been paid.
    ///
    /// An expense without shares is never settled.
    pub fn is_settled(&self, shares: &[ExpenseShare]) -> bool {
        let mut own = shares.iter().filter(|s| s.expense_id == self.id).peekable();
        own.peek().is_some() && own.all(|s| s.paid)
    }
}

/// One participant's portion of a single expense.
///
/// Uniquely keyed by `(expense_id, user_id)`. Only the payment status
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseShare {
    pub expense_id: ExpenseId,
    pub user_id: UserId,

    /// Owed amount, never negative.
    pub amount: Money,

    /// Portion of the expense total, in percent.
    pub percentage: Decimal,

    pub paid: bool,

    /// Set while `paid` is true.
    pub paid_at: Option<DateTime<Utc>>,
}

impl ExpenseShare {
    /// Creates an unpaid share.
    pub fn new(expense_id: ExpenseId, user_id: UserId, amount: Money, percentage: Decimal) -> Self {
        ExpenseShare {
            expense_id,
            user_id,
            amount,
            percentage,
            paid: false,
            paid_at: None,
        }
    }

    /// Marks the share as paid. A share already paid keeps its original
    /// timestamp.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        if !self.paid {
            self.paid_at = Some(at);
        }
        self.paid = true;
    }

    pub fn mark_unpaid(&mut self) {
        self.paid = false;
        self.paid_at = None;
    }

    /// Returns `true` if the participant still owes a non-zero amount.
    pub fn is_owed(&self) -> bool {
        self.amount.is_positive() && !self.paid
    }
}
