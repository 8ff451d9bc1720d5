//! Command and patch structs for engine operations.
//!
//! Write operations take one of these instead of long argument lists. Patch
//! types model partial updates explicitly: every field is optional and
//! validated on its own, nothing is merged blindly.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Contact, PartyCategory, ProjectStatus, TransactionKind};

/// Create a project.
#[derive(Clone, Debug)]
pub struct CreateProjectCmd {
    pub owner_id: String,
    pub title: String,
    pub code: String,
    pub budget_minor: i64,
    pub status: ProjectStatus,
}

impl CreateProjectCmd {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: title.into(),
            code: code.into(),
            budget_minor: 0,
            status: ProjectStatus::default(),
        }
    }

    #[must_use]
    pub fn budget_minor(mut self, budget_minor: i64) -> Self {
        self.budget_minor = budget_minor;
        self
    }

    #[must_use]
    pub fn status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a project. Totals are not patchable.
#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub code: Option<String>,
    pub budget_minor: Option<i64>,
    pub status: Option<ProjectStatus>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.code.is_none()
            && self.budget_minor.is_none()
            && self.status.is_none()
    }
}

/// Create a party under a project.
#[derive(Clone, Debug)]
pub struct CreatePartyCmd {
    pub project_id: Uuid,
    pub user_id: String,
    pub name: String,
    pub category: PartyCategory,
    pub contact: Contact,
}

impl CreatePartyCmd {
    #[must_use]
    pub fn new(
        project_id: Uuid,
        user_id: impl Into<String>,
        name: impl Into<String>,
        category: PartyCategory,
    ) -> Self {
        Self {
            project_id,
            user_id: user_id.into(),
            name: name.into(),
            category,
            contact: Contact::default(),
        }
    }

    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = contact;
        self
    }
}

/// Partial update of a party.
///
/// The category is immutable. For contact fields `Some("")` clears the value.
#[derive(Clone, Debug, Default)]
pub struct PartyPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Record an income or expense against a party.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub project_id: Uuid,
    pub party_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Defaults to the creation time.
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub user_id: String,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        project_id: Uuid,
        party_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            party_id,
            kind,
            amount_minor,
            occurred_at: None,
            note: None,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Partial update of a transaction. The party cannot change.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// `Some("")` clears the note.
    pub note: Option<String>,
}

impl TransactionPatch {
    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Update an existing transaction.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub patch: TransactionPatch,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid, user_id: impl Into<String>, patch: TransactionPatch) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            patch,
        }
    }
}
