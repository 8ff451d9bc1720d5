//! Signed deltas applied to project accumulators.
//!
//! Every ledger write is expressed as a `TotalsDelta`: creating adds the
//! amount to the accumulator of its kind, deleting subtracts it, and updating
//! is a reversal of the stored values followed by a re-application of the new
//! ones. Deltas are relative, so they can be pushed to the store as
//! `column = column + delta`.
//!
//! All arithmetic is checked: `None` means the result does not fit in an
//! `i64` and the write has to be refused.

use crate::{ProjectTotals, TransactionKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TotalsDelta {
    pub income_minor: i64,
    pub expense_minor: i64,
}

impl TotalsDelta {
    /// Delta produced by recording `amount_minor` of `kind`.
    pub fn apply(kind: TransactionKind, amount_minor: i64) -> Self {
        match kind {
            TransactionKind::Income => Self {
                income_minor: amount_minor,
                expense_minor: 0,
            },
            TransactionKind::Expense => Self {
                income_minor: 0,
                expense_minor: amount_minor,
            },
        }
    }

    /// Delta that cancels a previously recorded `amount_minor` of `kind`.
    pub fn reverse(kind: TransactionKind, amount_minor: i64) -> Self {
        Self::apply(kind, -amount_minor)
    }

    /// Reversal of `(old_kind, old_amount)` followed by `(new_kind, new_amount)`.
    pub fn replace(
        old_kind: TransactionKind,
        old_amount_minor: i64,
        new_kind: TransactionKind,
        new_amount_minor: i64,
    ) -> Option<Self> {
        Self::reverse(old_kind, old_amount_minor).then(Self::apply(new_kind, new_amount_minor))
    }

    pub fn then(self, other: Self) -> Option<Self> {
        Some(Self {
            income_minor: self.income_minor.checked_add(other.income_minor)?,
            expense_minor: self.expense_minor.checked_add(other.expense_minor)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.income_minor == 0 && self.expense_minor == 0
    }

    /// In-memory counterpart of the store-side increment.
    ///
    /// `None` when an accumulator or the balance would leave the `i64` range.
    pub fn applied_to(&self, totals: ProjectTotals) -> Option<ProjectTotals> {
        let income = totals.total_income_minor.checked_add(self.income_minor)?;
        let expense = totals.total_expense_minor.checked_add(self.expense_minor)?;
        income.checked_sub(expense)?;
        Some(ProjectTotals::new(income, expense))
    }
}
