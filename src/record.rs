//! Ledger record models for CSV parsing.

use crate::error::{EngineError, Result};
use crate::expense::{ExpenseId, SplitPolicy, UserId};
use crate::money::Money;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

/// Raw ledger row as read from CSV.
///
/// The `amount` and `split` columns are optional; which ones are required
/// depends on the row type.
#[derive(Debug, Deserialize)]
pub struct LedgerRecord {
    /// Row type: expense, share, paid
    #[serde(rename = "type")]
    pub row_type: String,

    /// Expense the row refers to
    pub expense: ExpenseId,

    /// Payer (expense rows) or participant (share and paid rows)
    pub user: UserId,

    /// Total (expense rows) or weight (share rows)
    #[serde(default)]
    pub amount: Option<String>,

    /// Split policy tag (expense rows only)
    #[serde(default)]
    pub split: Option<String>,
}

impl LedgerRecord {
    /// Parses the raw CSV record into a typed entry.
    pub fn parse(&self) -> Result<LedgerEntry> {
        let row_type = self.row_type.trim().to_lowercase();

        let kind = match row_type.as_str() {
            "expense" => {
                let amount = self.parse_total()?;
                let policy = match non_blank(&self.split) {
                    Some(tag) => SplitPolicy::from_str(tag)?,
                    None => SplitPolicy::default(),
                };
                EntryKind::Expense { amount, policy }
            }
            "share" => EntryKind::Share(self.parse_weight()?),
            "paid" => EntryKind::Paid,
            other => {
                return Err(EngineError::invalid(format!("unknown row type '{}'", other)));
            }
        };

        Ok(LedgerEntry {
            expense: self.expense,
            user: self.user,
            kind,
        })
    }

    /// Parses the expense total, which must fit in whole cents and stay
    /// within [`Money::MAX`].
    fn parse_total(&self) -> Result<Money> {
        let raw = non_blank(&self.amount)
            .ok_or_else(|| EngineError::InvalidAmount("missing expense amount".to_string()))?;
        let value = Decimal::from_str(raw)
            .map_err(|e| EngineError::InvalidAmount(format!("{}: {}", raw, e)))?;
        Money::exact(value).ok_or_else(|| {
            EngineError::InvalidAmount(format!(
                "{} is not a whole-cent amount of at most {}",
                raw,
                Money::MAX
            ))
        })
    }

    /// Parses the optional share weight.
    fn parse_weight(&self) -> Result<Option<Decimal>> {
        non_blank(&self.amount)
            .map(|raw| {
                Decimal::from_str(raw)
                    .map_err(|e| EngineError::invalid(format!("bad weight '{}': {}", raw, e)))
            })
            .transpose()
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A parsed ledger row ready for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub expense: ExpenseId,
    pub user: UserId,
    pub kind: EntryKind,
}

/// Row type variants with associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Declares an expense paid in full by `user`.
    Expense { amount: Money, policy: SplitPolicy },

    /// Adds `user` as the next participant, with an optional weight.
    Share(Option<Decimal>),

    /// Marks the share of `user` as paid.
    Paid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(row_type: &str, amount: Option<&str>, split: Option<&str>) -> LedgerRecord {
        LedgerRecord {
            row_type: row_type.to_string(),
            expense: 10,
            user: 2,
            amount: amount.map(str::to_string),
            split: split.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_expense() {
        let entry = record("expense", Some("100.5"), Some("percentage")).parse().unwrap();
        assert_eq!(entry.expense, 10);
        assert_eq!(entry.user, 2);
        match entry.kind {
            EntryKind::Expense { amount, policy } => {
                assert_eq!(amount.to_string(), "100.50");
                assert_eq!(policy, SplitPolicy::Percentage);
            }
            _ => panic!("Expected Expense"),
        }
    }

    #[test]
    fn test_parse_expense_defaults_to_equal() {
        let entry = record("  Expense ", Some(" 12 "), None).parse().unwrap();
        assert!(matches!(
            entry.kind,
            EntryKind::Expense {
                policy: SplitPolicy::Equal,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_expense_rejects_bad_amounts() {
        assert!(matches!(
            record("expense", None, None).parse(),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            record("expense", Some("abc"), None).parse(),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            record("expense", Some("1.005"), None).parse(),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            record("expense", Some("50000000000000000000000000000"), None).parse(),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_parse_expense_rejects_unknown_policy() {
        assert!(matches!(
            record("expense", Some("10"), Some("random")).parse(),
            Err(EngineError::UnsupportedSplitType(_))
        ));
    }

    #[test]
    fn test_parse_share_with_and_without_weight() {
        let entry = record("share", Some("33.5"), None).parse().unwrap();
        assert_eq!(entry.kind, EntryKind::Share(Some(dec!(33.5))));

        let entry = record("share", Some("  "), None).parse().unwrap();
        assert_eq!(entry.kind, EntryKind::Share(None));

        assert!(record("share", Some("x"), None).parse().is_err());
    }

    #[test]
    fn test_parse_paid() {
        let entry = record("paid", None, None).parse().unwrap();
        assert_eq!(entry.kind, EntryKind::Paid);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(matches!(
            record("refund", Some("10"), None).parse(),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
