//! Ownership resolution.
//!
//! A user reaches parties and transactions only through projects they own.
//! Anything outside that chain is reported as `KeyNotFound`, exactly like a
//! missing row, so other users' data never leaks through error messages.

use std::collections::HashSet;

use sea_orm::{DatabaseTransaction, QueryFilter, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Party, Project, ResultEngine, Transaction, parties, projects, transactions,
    util::parse_uuid,
};

use super::{Engine, with_tx};

impl Engine {
    pub(super) async fn owned_project_ids_in(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<HashSet<Uuid>> {
        let ids: Vec<String> = projects::Entity::find()
            .select_only()
            .column(projects::Column::Id)
            .filter(projects::Column::OwnerId.eq(user_id.to_string()))
            .into_tuple()
            .all(db)
            .await?;

        ids.iter().map(|id| parse_uuid(id, "project")).collect()
    }

    pub(super) async fn require_project_owner(
        &self,
        db: &DatabaseTransaction,
        project_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<projects::Model> {
        let model = projects::Entity::find_by_id(project_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("project not exists".to_string()))?;
        if model.owner_id != user_id {
            return Err(EngineError::KeyNotFound("project not exists".to_string()));
        }
        Ok(model)
    }

    /// The party must belong to `project_id`; a party of another project is
    /// reported as missing.
    pub(super) async fn require_party_in_project(
        &self,
        db: &DatabaseTransaction,
        project_id: Uuid,
        party_id: Uuid,
    ) -> ResultEngine<Party> {
        let model = parties::Entity::find_by_id(party_id.to_string())
            .filter(parties::Column::ProjectId.eq(project_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("party not exists".to_string()))?;
        Party::try_from(model)
    }

    /// Resolves a party through the ownership of its project.
    pub(super) async fn require_owned_party(
        &self,
        db: &DatabaseTransaction,
        party_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Party> {
        let model = parties::Entity::find_by_id(party_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("party not exists".to_string()))?;
        let party = Party::try_from(model)?;
        self.require_project_owner(db, party.project_id, user_id)
            .await
            .map_err(|err| match err {
                EngineError::KeyNotFound(_) => {
                    EngineError::KeyNotFound("party not exists".to_string())
                }
                other => other,
            })?;
        Ok(party)
    }

    pub(super) async fn resolve_owned_transaction_in(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let owned = self.owned_project_ids_in(db, user_id).await?;
        if owned.is_empty() {
            return Err(EngineError::KeyNotFound(
                "transaction not exists".to_string(),
            ));
        }

        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::DeletedAt.is_null())
            .filter(transactions::Column::ProjectId.is_in(owned.iter().map(Uuid::to_string)))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Every project id owned by `user_id`.
    ///
    /// All transaction reads and writes are scoped to this set.
    pub async fn owned_project_ids(&self, user_id: &str) -> ResultEngine<HashSet<Uuid>> {
        with_tx!(self, |db_tx| self.owned_project_ids_in(&db_tx, user_id).await)
    }

    /// Fetch a non-deleted transaction whose project is owned by `user_id`.
    ///
    /// Returns `KeyNotFound` when the transaction is missing, soft-deleted, or
    /// belongs to someone else's project.
    pub async fn resolve_owned_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            self.resolve_owned_transaction_in(&db_tx, user_id, transaction_id)
                .await
        })
    }

    /// Return a project owned by `user_id`.
    pub async fn project(&self, project_id: Uuid, user_id: &str) -> ResultEngine<Project> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_project_owner(&db_tx, project_id, user_id)
                .await?;
            Project::try_from(model)
        })
    }
}
