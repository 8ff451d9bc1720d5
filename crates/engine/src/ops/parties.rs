use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CreatePartyCmd, EngineError, Party, PartyPatch, ResultEngine, parties, transactions,
    util::{
        apply_optional_text_patch, normalize_key, normalize_optional_text,
        normalize_required_name, validate_email,
    },
};

use super::{Engine, with_tx};

impl Engine {
    async fn ensure_party_name_free(
        &self,
        db: &DatabaseTransaction,
        project_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = parties::Entity::find()
            .filter(parties::Column::ProjectId.eq(project_id.to_string()))
            .filter(parties::Column::NameNorm.eq(normalize_key(name)));
        if let Some(id) = except {
            query = query.filter(parties::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }

    /// Add a client or vendor to a project owned by `cmd.user_id`.
    pub async fn create_party(&self, cmd: CreatePartyCmd) -> ResultEngine<Party> {
        let name = normalize_required_name(&cmd.name, "party name")?;
        validate_email(cmd.contact.email.as_deref())?;

        let now = Utc::now();
        let party = Party {
            id: Uuid::new_v4(),
            project_id: cmd.project_id,
            name,
            category: cmd.category,
            contact: crate::Contact {
                phone: normalize_optional_text(cmd.contact.phone.as_deref()),
                email: normalize_optional_text(cmd.contact.email.as_deref()),
                address: normalize_optional_text(cmd.contact.address.as_deref()),
            },
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            self.require_project_owner(&db_tx, cmd.project_id, &cmd.user_id)
                .await?;
            self.ensure_party_name_free(&db_tx, cmd.project_id, &party.name, None)
                .await?;
            parties::ActiveModel::from(&party)
                .insert(&db_tx)
                .await
                .map_err(EngineError::on_conflict(&party.name))?;
            Ok(party)
        })
    }

    pub async fn party(&self, party_id: Uuid, user_id: &str) -> ResultEngine<Party> {
        with_tx!(self, |db_tx| {
            self.require_owned_party(&db_tx, party_id, user_id).await
        })
    }

    /// Parties of a project, ordered by name.
    pub async fn list_parties(&self, project_id: Uuid, user_id: &str) -> ResultEngine<Vec<Party>> {
        with_tx!(self, |db_tx| {
            self.require_project_owner(&db_tx, project_id, user_id)
                .await?;
            let models = parties::Entity::find()
                .filter(parties::Column::ProjectId.eq(project_id.to_string()))
                .order_by_asc(parties::Column::NameNorm)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Party::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Rename a party or change its contact details.
    ///
    /// The category cannot change: existing transactions were validated
    /// against it.
    pub async fn update_party(
        &self,
        party_id: Uuid,
        user_id: &str,
        patch: PartyPatch,
    ) -> ResultEngine<Party> {
        let name = patch
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "party name"))
            .transpose()?;
        validate_email(patch.email.as_deref())?;

        with_tx!(self, |db_tx| {
            let mut party = self.require_owned_party(&db_tx, party_id, user_id).await?;

            if let Some(name) = name {
                self.ensure_party_name_free(&db_tx, party.project_id, &name, Some(party.id))
                    .await?;
                party.name = name;
            }
            party.contact.phone =
                apply_optional_text_patch(party.contact.phone.take(), patch.phone.as_deref());
            party.contact.email =
                apply_optional_text_patch(party.contact.email.take(), patch.email.as_deref());
            party.contact.address =
                apply_optional_text_patch(party.contact.address.take(), patch.address.as_deref());
            party.updated_at = Utc::now();

            parties::ActiveModel::from(&party)
                .update(&db_tx)
                .await
                .map_err(EngineError::on_conflict(&party.name))?;
            Ok(party)
        })
    }

    /// Delete a party that no active transaction references.
    pub async fn delete_party(&self, party_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let party = self.require_owned_party(&db_tx, party_id, user_id).await?;

            let active = transactions::Entity::find()
                .filter(transactions::Column::PartyId.eq(party.id.to_string()))
                .filter(transactions::Column::DeletedAt.is_null())
                .count(&db_tx)
                .await?;
            if active > 0 {
                return Err(EngineError::InvalidState(format!(
                    "party has {active} active transactions"
                )));
            }

            parties::Entity::delete_by_id(party.id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
