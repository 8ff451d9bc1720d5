//! The `Project` is the unit of ownership: it holds parties and transactions
//! by reference, and carries the running totals of its ledger.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "PLANNED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::OnHold => "ON_HOLD",
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "PLANNED" => Ok(Self::Planned),
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            "ON_HOLD" => Ok(Self::OnHold),
            other => Err(EngineError::InvalidInput(format!(
                "invalid project status: {other}"
            ))),
        }
    }
}

/// Persisted accumulators of a project.
///
/// `balance_minor` is always `total_income_minor - total_expense_minor`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTotals {
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub balance_minor: i64,
}

impl ProjectTotals {
    pub fn new(total_income_minor: i64, total_expense_minor: i64) -> Self {
        Self {
            total_income_minor,
            total_expense_minor,
            balance_minor: total_income_minor - total_expense_minor,
        }
    }

    /// Net profit is the same figure as the balance.
    pub fn net_profit_minor(&self) -> i64 {
        self.balance_minor
    }

    pub fn is_consistent(&self) -> bool {
        self.balance_minor == self.total_income_minor - self.total_expense_minor
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub code: String,
    pub budget_minor: i64,
    pub totals: ProjectTotals,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub code: String,
    pub code_norm: String,
    pub budget_minor: i64,
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub balance_minor: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::parties::Entity")]
    Parties,
}

impl Related<super::parties::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Project {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "project")?,
            owner_id: model.owner_id,
            title: model.title,
            code: model.code,
            budget_minor: model.budget_minor,
            totals: ProjectTotals {
                total_income_minor: model.total_income_minor,
                total_expense_minor: model.total_expense_minor,
                balance_minor: model.balance_minor,
            },
            status: ProjectStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Project> for ActiveModel {
    fn from(project: &Project) -> Self {
        Self {
            id: ActiveValue::Set(project.id.to_string()),
            owner_id: ActiveValue::Set(project.owner_id.clone()),
            title: ActiveValue::Set(project.title.clone()),
            code: ActiveValue::Set(project.code.clone()),
            code_norm: ActiveValue::Set(crate::util::normalize_key(&project.code)),
            budget_minor: ActiveValue::Set(project.budget_minor),
            total_income_minor: ActiveValue::Set(project.totals.total_income_minor),
            total_expense_minor: ActiveValue::Set(project.totals.total_expense_minor),
            balance_minor: ActiveValue::Set(project.totals.balance_minor),
            status: ActiveValue::Set(project.status.as_str().to_string()),
            created_at: ActiveValue::Set(project.created_at),
            updated_at: ActiveValue::Set(project.updated_at),
        }
    }
}

pub(crate) fn validate_budget(budget_minor: i64) -> ResultEngine<()> {
    if budget_minor < 0 {
        return Err(EngineError::InvalidAmount(
            "budget_minor must be >= 0".to_string(),
        ));
    }
    Ok(())
}
