//! # Split Engine
//!
//! Divides shared expenses among participants and plans how a group settles
//! the resulting debts.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: 2 decimal places via `rust_decimal`, never floats
//! - **Exact-sum splits**: shares always add up to the expense total; the last
//!   participant in input order absorbs the rounding remainder
//! - **Pure computation**: splitting, balance aggregation and settlement are
//!   stateless functions of their arguments
//! - **Deterministic output**: identical input always yields identical plans
//!
//! ## Example
//!
//! ```
//! use split_engine::{compute_group_balances, optimize, split_expense};
//! use split_engine::{Expense, Money, ParticipantInput, SplitPolicy};
//! use std::str::FromStr;
//!
//! let total = Money::from_str("100.00").unwrap();
//! let dinner = Expense::new(1, 1, 1, total, SplitPolicy::Equal).unwrap();
//! let shares = split_expense(&dinner, &ParticipantInput::Members(vec![1, 2, 3])).unwrap();
//! assert_eq!(shares[2].amount.to_string(), "33.34");
//!
//! let balances = compute_group_balances(&[dinner], &shares);
//! let plan = optimize(&balances);
//! assert_eq!(plan.len(), 2);
//! ```

pub mod balance;
pub mod error;
pub mod expense;
pub mod ledger;
pub mod money;
pub mod record;
pub mod settlement;
pub mod split;

pub use balance::{
    calculate_user_debts, compute_balance, compute_group_balances, GroupSummary, NetBalance,
    UserDebts,
};
pub use error::{EngineError, Result};
pub use expense::{
    Expense, ExpenseId, ExpenseShare, GroupId, ParticipantInput, SplitPolicy, UserId,
};
pub use ledger::{LedgerEngine, LedgerReport};
pub use money::Money;
pub use record::{EntryKind, LedgerEntry, LedgerRecord};
pub use settlement::{optimize, DebtSettlement, SettlementConfig, SettlementOptimizer};
pub use split::{resplit, split, split_expense};
