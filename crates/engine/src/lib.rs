//! Ledger engine for construction project finances.
//!
//! Projects own parties (clients/vendors) and transactions (income/expense).
//! Every transaction write goes through the ledger operations in
//! [`Engine`], which keep the project accumulators (`total_income_minor`,
//! `total_expense_minor`, `balance_minor`) in step with the active
//! transaction rows.

pub use commands::{
    CreatePartyCmd, CreateProjectCmd, CreateTransactionCmd, PartyPatch, ProjectPatch,
    TransactionPatch, UpdateTransactionCmd,
};
pub use error::{EngineError, ErrorKind};
pub use ops::{
    Engine, EngineBuilder, PartyTotals, ProjectSummary, TransactionListFilter, TransactionPage,
    TransactionSummary,
};
pub use parties::{Contact, Party, PartyCategory};
pub use policy::is_compatible;
pub use projects::{Project, ProjectStatus, ProjectTotals};
pub use totals::TotalsDelta;
pub use transactions::{Transaction, TransactionKind};
pub use users::password_digest;

mod commands;
mod error;
mod ops;
mod parties;
mod policy;
mod projects;
mod totals;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
