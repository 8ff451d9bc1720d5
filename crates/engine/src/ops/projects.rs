use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CreateProjectCmd, EngineError, PartyCategory, Project, ProjectPatch, ProjectTotals,
    ResultEngine, TransactionKind, parties, projects,
    projects::validate_budget,
    transactions,
    util::{normalize_key, normalize_required_name, parse_uuid},
};

use super::{Engine, with_tx};

/// Activity of one party, aggregated from its active transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyTotals {
    pub party_id: Uuid,
    pub name: String,
    pub category: PartyCategory,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub count: u64,
}

/// Persisted project accumulators next to a per-party breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub project: Project,
    /// `budget - total_expense`, negative when over budget.
    pub budget_remaining_minor: i64,
    pub parties: Vec<PartyTotals>,
}

#[derive(Debug, FromQueryResult)]
struct PartyKindAggregate {
    party_id: String,
    kind: String,
    total_minor: Option<i64>,
    count: i64,
}

impl Engine {
    async fn ensure_code_free(
        &self,
        db: &DatabaseTransaction,
        owner_id: &str,
        code: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = projects::Entity::find()
            .filter(projects::Column::OwnerId.eq(owner_id.to_string()))
            .filter(projects::Column::CodeNorm.eq(normalize_key(code)));
        if let Some(id) = except {
            query = query.filter(projects::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(code.to_string()));
        }
        Ok(())
    }

    /// Add a new project with zeroed totals.
    pub async fn create_project(&self, cmd: CreateProjectCmd) -> ResultEngine<Project> {
        let title = normalize_required_name(&cmd.title, "project title")?;
        let code = normalize_required_name(&cmd.code, "project code")?;
        validate_budget(cmd.budget_minor)?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            owner_id: cmd.owner_id,
            title,
            code,
            budget_minor: cmd.budget_minor,
            totals: ProjectTotals::default(),
            status: cmd.status,
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            self.ensure_code_free(&db_tx, &project.owner_id, &project.code, None)
                .await?;
            projects::ActiveModel::from(&project)
                .insert(&db_tx)
                .await
                .map_err(EngineError::on_conflict(&project.code))?;
            Ok(project)
        })
    }

    /// Projects owned by `user_id`, most recent first.
    pub async fn list_projects(&self, user_id: &str) -> ResultEngine<Vec<Project>> {
        let models = projects::Entity::find()
            .filter(projects::Column::OwnerId.eq(user_id.to_string()))
            .order_by_desc(projects::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Project::try_from).collect()
    }

    /// Update title, code, budget or status. Totals are left untouched.
    pub async fn update_project(
        &self,
        project_id: Uuid,
        user_id: &str,
        patch: ProjectPatch,
    ) -> ResultEngine<Project> {
        let title = patch
            .title
            .as_deref()
            .map(|t| normalize_required_name(t, "project title"))
            .transpose()?;
        let code = patch
            .code
            .as_deref()
            .map(|c| normalize_required_name(c, "project code"))
            .transpose()?;
        if let Some(budget) = patch.budget_minor {
            validate_budget(budget)?;
        }

        with_tx!(self, |db_tx| {
            let model = self
                .require_project_owner(&db_tx, project_id, user_id)
                .await?;
            let mut project = Project::try_from(model)?;
            if patch.is_empty() {
                return Ok(project);
            }

            let mut active = projects::ActiveModel {
                id: ActiveValue::Set(project.id.to_string()),
                ..Default::default()
            };
            if let Some(code) = code {
                self.ensure_code_free(&db_tx, user_id, &code, Some(project.id))
                    .await?;
                active.code_norm = ActiveValue::Set(normalize_key(&code));
                active.code = ActiveValue::Set(code.clone());
                project.code = code;
            }
            if let Some(title) = title {
                active.title = ActiveValue::Set(title.clone());
                project.title = title;
            }
            if let Some(budget) = patch.budget_minor {
                active.budget_minor = ActiveValue::Set(budget);
                project.budget_minor = budget;
            }
            if let Some(status) = patch.status {
                active.status = ActiveValue::Set(status.as_str().to_string());
                project.status = status;
            }
            project.updated_at = Utc::now();
            active.updated_at = ActiveValue::Set(project.updated_at);
            active
                .update(&db_tx)
                .await
                .map_err(EngineError::on_conflict(&project.code))?;

            Ok(project)
        })
    }

    /// Delete a project.
    ///
    /// Without `force` the project must have no parties. With `force` its
    /// parties are deleted too; transaction rows are left in place and become
    /// unreachable.
    pub async fn delete_project(
        &self,
        project_id: Uuid,
        user_id: &str,
        force: bool,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_project_owner(&db_tx, project_id, user_id)
                .await?;

            let party_count = parties::Entity::find()
                .filter(parties::Column::ProjectId.eq(project_id.to_string()))
                .count(&db_tx)
                .await?;
            if party_count > 0 {
                if !force {
                    return Err(EngineError::InvalidState(format!(
                        "project has {party_count} parties, delete them first or force"
                    )));
                }
                parties::Entity::delete_many()
                    .filter(parties::Column::ProjectId.eq(project_id.to_string()))
                    .exec(&db_tx)
                    .await?;
            }

            projects::Entity::delete_by_id(project_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(%project_id, force, party_count, "project deleted");
            Ok(())
        })
    }

    /// Project totals plus what each party contributed.
    ///
    /// Parties without active transactions are listed with zero figures.
    pub async fn project_summary(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<ProjectSummary> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_project_owner(&db_tx, project_id, user_id)
                .await?;
            let project = Project::try_from(model)?;

            let party_models = parties::Entity::find()
                .filter(parties::Column::ProjectId.eq(project_id.to_string()))
                .order_by_asc(parties::Column::NameNorm)
                .all(&db_tx)
                .await?;

            let rows: Vec<PartyKindAggregate> = transactions::Entity::find()
                .select_only()
                .column(transactions::Column::PartyId)
                .column(transactions::Column::Kind)
                .column_as(transactions::Column::AmountMinor.sum(), "total_minor")
                .column_as(transactions::Column::Id.count(), "count")
                .filter(transactions::Column::ProjectId.eq(project_id.to_string()))
                .filter(transactions::Column::DeletedAt.is_null())
                .group_by(transactions::Column::PartyId)
                .group_by(transactions::Column::Kind)
                .into_model::<PartyKindAggregate>()
                .all(&db_tx)
                .await?;

            let mut by_party: HashMap<Uuid, (i64, i64, u64)> = HashMap::new();
            for row in rows {
                let party_id = parse_uuid(&row.party_id, "party")?;
                let entry = by_party.entry(party_id).or_default();
                let total = row.total_minor.unwrap_or(0);
                let acc = match TransactionKind::try_from(row.kind.as_str())? {
                    TransactionKind::Income => &mut entry.0,
                    TransactionKind::Expense => &mut entry.1,
                };
                *acc = acc.checked_add(total).ok_or_else(|| {
                    EngineError::InvalidState("party totals out of range".to_string())
                })?;
                entry.2 += u64::try_from(row.count).unwrap_or(0);
            }

            let mut parties = Vec::with_capacity(party_models.len());
            for party_model in party_models {
                let party = crate::Party::try_from(party_model)?;
                let (income_minor, expense_minor, count) =
                    by_party.get(&party.id).copied().unwrap_or_default();
                parties.push(PartyTotals {
                    party_id: party.id,
                    name: party.name,
                    category: party.category,
                    income_minor,
                    expense_minor,
                    count,
                });
            }

            Ok(ProjectSummary {
                budget_remaining_minor: project.budget_minor - project.totals.total_expense_minor,
                project,
                parties,
            })
        })
    }
}
