//! Party type policy: which transaction kind a party category accepts.
//!
//! `CLIENT` parties only pay in (income), `VENDOR` parties only get paid
//! (expense). The rule is checked when a transaction is created and again
//! whenever its kind changes, always against the transaction's own party.

use crate::{EngineError, PartyCategory, ResultEngine, TransactionKind};

/// Returns `true` when `kind` may reference a party of `category`.
pub fn is_compatible(category: PartyCategory, kind: TransactionKind) -> bool {
    matches!(
        (category, kind),
        (PartyCategory::Client, TransactionKind::Income)
            | (PartyCategory::Vendor, TransactionKind::Expense)
    )
}

pub(crate) fn ensure_compatible(category: PartyCategory, kind: TransactionKind) -> ResultEngine<()> {
    if !is_compatible(category, kind) {
        return Err(EngineError::KindMismatch(format!(
            "{} party cannot take {} transactions",
            category.as_str(),
            kind.as_str()
        )));
    }
    Ok(())
}
