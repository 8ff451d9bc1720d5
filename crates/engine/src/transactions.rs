//! Transaction primitives.
//!
//! A `Transaction` is an income or expense recorded against a party of a
//! project. Its amount feeds the project accumulators; removal only sets
//! `deleted_at`, the row is kept.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
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
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl Transaction {
    pub fn new(
        project_id: Uuid,
        party_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
        created_by: String,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            party_id,
            kind,
            amount_minor,
            occurred_at,
            note,
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub project_id: String,
    pub party_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub occurred_at: DateTimeUtc,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            project_id: ActiveValue::Set(tx.project_id.to_string()),
            party_id: ActiveValue::Set(tx.party_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            note: ActiveValue::Set(tx.note.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
            deleted_at: ActiveValue::Set(tx.deleted_at),
            deleted_by: ActiveValue::Set(tx.deleted_by.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            project_id: parse_uuid(&model.project_id, "project")?,
            party_id: parse_uuid(&model.party_id, "party")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            occurred_at: model.occurred_at,
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_non_positive_amounts() {
        for amount in [0, -1, -500] {
            let res = Transaction::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                TransactionKind::Income,
                amount,
                Utc::now(),
                None,
                "alice".to_string(),
            );
            assert_eq!(
                res,
                Err(EngineError::InvalidAmount(
                    "amount_minor must be > 0".to_string()
                ))
            );
        }
    }

    #[test]
    fn kind_roundtrips_through_storage_string() {
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            assert_eq!(TransactionKind::try_from(kind.as_str()), Ok(kind));
        }
        assert!(TransactionKind::try_from("refund").is_err());
    }
}
