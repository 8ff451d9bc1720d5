//! Request and response bodies of the HTTP API.
//!
//! Amounts are always integer minor units (`*_minor`). Timestamps sent by
//! clients are RFC3339 with an offset; responses are in UTC.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        /// Always `false`.
        pub success: bool,
        pub message: String,
        pub status: u16,
        /// Internal detail, only filled by debug builds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub detail: Option<String>,
    }
}

pub mod project {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ProjectStatus {
        Planned,
        Active,
        Completed,
        OnHold,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectNew {
        pub title: String,
        pub code: String,
        /// Defaults to 0.
        pub budget_minor: Option<i64>,
        /// Defaults to `PLANNED`.
        pub status: Option<ProjectStatus>,
    }

    /// Partial update. Absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProjectUpdate {
        pub title: Option<String>,
        pub code: Option<String>,
        pub budget_minor: Option<i64>,
        pub status: Option<ProjectStatus>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProjectDelete {
        /// Also delete the parties of the project.
        #[serde(default)]
        pub force: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectView {
        pub id: Uuid,
        pub title: String,
        pub code: String,
        pub status: ProjectStatus,
        pub budget_minor: i64,
        pub total_income_minor: i64,
        pub total_expense_minor: i64,
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectListResponse {
        pub projects: Vec<ProjectView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyTotalsView {
        pub party_id: Uuid,
        pub name: String,
        pub category: super::party::PartyCategory,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProjectSummaryResponse {
        pub project: ProjectView,
        /// `budget - total_expense`.
        pub budget_remaining_minor: i64,
        pub parties: Vec<PartyTotalsView>,
    }
}

pub mod party {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum PartyCategory {
        Client,
        Vendor,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyNew {
        pub name: String,
        pub category: PartyCategory,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
    }

    /// Partial update. The category cannot change; an empty string clears a
    /// contact field.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PartyUpdate {
        pub name: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyView {
        pub id: Uuid,
        pub project_id: Uuid,
        pub name: String,
        pub category: PartyCategory,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PartyListResponse {
        pub parties: Vec<PartyView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub project_id: Uuid,
        pub party_id: Uuid,
        pub kind: TransactionKind,
        /// Must be > 0.
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset. Defaults to now.
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub note: Option<String>,
    }

    /// Partial update. The party cannot change.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        /// An empty string clears the note.
        pub note: Option<String>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub project_id: Option<Uuid>,
        pub party_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        /// Inclusive lower bound on `occurred_at`.
        pub from: Option<DateTime<FixedOffset>>,
        /// Exclusive upper bound on `occurred_at`.
        pub to: Option<DateTime<FixedOffset>>,
        /// Default 50, max 500.
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub project_id: Uuid,
        pub party_id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        pub note: Option<String>,
        pub created_by: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Figures over the whole filtered set, not only the returned page.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionSummary {
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub summary: TransactionSummary,
    }
}
