//! Parties are the clients and vendors of a project.
//!
//! The category is fixed at creation: it decides which transaction kind can
//! reference the party (see [`crate::policy`]).

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartyCategory {
    Client,
    Vendor,
}

impl PartyCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "CLIENT",
            Self::Vendor => "VENDOR",
        }
    }
}

impl TryFrom<&str> for PartyCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CLIENT" => Ok(Self::Client),
            "VENDOR" => Ok(Self::Vendor),
            other => Err(EngineError::InvalidInput(format!(
                "invalid party category: {other}"
            ))),
        }
    }
}

/// Optional contact details of a party.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub category: PartyCategory,
    pub contact: Contact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "parties")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub name_norm: String,
    pub category: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Project,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Party {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "party")?,
            project_id: parse_uuid(&model.project_id, "project")?,
            name: model.name,
            category: PartyCategory::try_from(model.category.as_str())?,
            contact: Contact {
                phone: model.phone,
                email: model.email,
                address: model.address,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&Party> for ActiveModel {
    fn from(party: &Party) -> Self {
        Self {
            id: ActiveValue::Set(party.id.to_string()),
            project_id: ActiveValue::Set(party.project_id.to_string()),
            name: ActiveValue::Set(party.name.clone()),
            name_norm: ActiveValue::Set(crate::util::normalize_key(&party.name)),
            category: ActiveValue::Set(party.category.as_str().to_string()),
            phone: ActiveValue::Set(party.contact.phone.clone()),
            email: ActiveValue::Set(party.contact.email.clone()),
            address: ActiveValue::Set(party.contact.address.clone()),
            created_at: ActiveValue::Set(party.created_at),
            updated_at: ActiveValue::Set(party.updated_at),
        }
    }
}
