//! Transaction writes and the project accumulators they drive.
//!
//! Every write that changes an amount goes through [`apply_totals_delta`],
//! which pushes a relative increment to the project row in a single UPDATE.
//! The totals write and the transaction row write share one DB transaction:
//! either both land or neither does.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CreateTransactionCmd, EngineError, Project, ResultEngine, TotalsDelta, Transaction,
    TransactionKind, UpdateTransactionCmd, policy::ensure_compatible, projects, transactions,
    util::{apply_optional_text_patch, normalize_optional_text},
};

use super::{Engine, with_tx};

/// Adds `delta` to the accumulators of `project_id`.
///
/// The balance is rebuilt from the pre-update column values in the same
/// statement, so `balance = total_income - total_expense` holds after every
/// call no matter how many writers race on the row. A delta that would push
/// an accumulator out of the `i64` range is refused before anything is
/// written; SQLite would otherwise store the column as REAL.
pub(super) async fn apply_totals_delta(
    db: &DatabaseTransaction,
    project_id: Uuid,
    delta: TotalsDelta,
) -> ResultEngine<()> {
    let current = projects::Entity::find_by_id(project_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("project not exists".to_string()))?;
    let totals = crate::ProjectTotals {
        total_income_minor: current.total_income_minor,
        total_expense_minor: current.total_expense_minor,
        balance_minor: current.balance_minor,
    };
    if delta.applied_to(totals).is_none() {
        return Err(EngineError::InvalidAmount(
            "project totals would exceed the supported range".to_string(),
        ));
    }

    let res = projects::Entity::update_many()
        .col_expr(
            projects::Column::TotalIncomeMinor,
            Expr::col(projects::Column::TotalIncomeMinor).add(delta.income_minor),
        )
        .col_expr(
            projects::Column::TotalExpenseMinor,
            Expr::col(projects::Column::TotalExpenseMinor).add(delta.expense_minor),
        )
        .col_expr(
            projects::Column::BalanceMinor,
            Expr::col(projects::Column::TotalIncomeMinor)
                .add(delta.income_minor)
                .sub(Expr::col(projects::Column::TotalExpenseMinor))
                .sub(delta.expense_minor),
        )
        .col_expr(projects::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(projects::Column::Id.eq(project_id.to_string()))
        .exec(db)
        .await?;

    if res.rows_affected == 0 {
        return Err(EngineError::KeyNotFound("project not exists".to_string()));
    }
    tracing::debug!(
        %project_id,
        income_minor = delta.income_minor,
        expense_minor = delta.expense_minor,
        "applied totals delta"
    );
    Ok(())
}

fn log_write_error(op: &'static str, err: &EngineError) {
    if let EngineError::Database(db_err) = err {
        tracing::error!(op, error = %db_err, "ledger write failed, rolled back");
    }
}

impl Engine {
    /// Record a new income or expense.
    ///
    /// Checks run in order and the first failure wins: project ownership,
    /// party membership, category/kind compatibility, positive amount.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        self.create_transaction_in(cmd)
            .await
            .inspect_err(|err| log_write_error("create_transaction", err))
    }

    async fn create_transaction_in(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            self.require_project_owner(&db_tx, cmd.project_id, &cmd.user_id)
                .await?;
            let party = self
                .require_party_in_project(&db_tx, cmd.project_id, cmd.party_id)
                .await?;
            ensure_compatible(party.category, cmd.kind)?;

            let tx = Transaction::new(
                cmd.project_id,
                cmd.party_id,
                cmd.kind,
                cmd.amount_minor,
                cmd.occurred_at.unwrap_or_else(Utc::now),
                normalize_optional_text(cmd.note.as_deref()),
                cmd.user_id.clone(),
            )?;

            apply_totals_delta(
                &db_tx,
                tx.project_id,
                TotalsDelta::apply(tx.kind, tx.amount_minor),
            )
            .await?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            Ok(tx)
        })
    }

    /// Update kind, amount, date or note of an owned transaction.
    ///
    /// The stored amount is reversed and the new one re-applied, so a kind
    /// change moves the amount between accumulators.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        self.update_transaction_in(cmd)
            .await
            .inspect_err(|err| log_write_error("update_transaction", err))
    }

    async fn update_transaction_in(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let current = self
                .resolve_owned_transaction_in(&db_tx, &cmd.user_id, cmd.transaction_id)
                .await?;
            let patch = cmd.patch;

            let kind = patch.kind.unwrap_or(current.kind);
            if kind != current.kind {
                let party = self
                    .require_party_in_project(&db_tx, current.project_id, current.party_id)
                    .await?;
                ensure_compatible(party.category, kind)?;
            }

            let amount_minor = patch.amount_minor.unwrap_or(current.amount_minor);
            if amount_minor <= 0 {
                return Err(EngineError::InvalidAmount(
                    "amount_minor must be > 0".to_string(),
                ));
            }

            let delta = TotalsDelta::replace(current.kind, current.amount_minor, kind, amount_minor)
                .ok_or_else(|| {
                    EngineError::InvalidAmount("amount_minor out of range".to_string())
                })?;
            if !delta.is_zero() {
                apply_totals_delta(&db_tx, current.project_id, delta).await?;
            }

            let updated = Transaction {
                kind,
                amount_minor,
                occurred_at: patch.occurred_at.unwrap_or(current.occurred_at),
                note: apply_optional_text_patch(current.note.clone(), patch.note.as_deref()),
                updated_at: Utc::now(),
                ..current
            };

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(updated.id.to_string()),
                kind: ActiveValue::Set(updated.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(updated.amount_minor),
                occurred_at: ActiveValue::Set(updated.occurred_at),
                note: ActiveValue::Set(updated.note.clone()),
                updated_at: ActiveValue::Set(updated.updated_at),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            Ok(updated)
        })
    }

    /// Soft-delete an owned transaction and take its amount out of the totals.
    ///
    /// The row is kept with `deleted_at`/`deleted_by` set. Deleting twice
    /// returns `KeyNotFound`.
    pub async fn soft_delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.soft_delete_transaction_in(transaction_id, user_id)
            .await
            .inspect_err(|err| log_write_error("soft_delete_transaction", err))
    }

    async fn soft_delete_transaction_in(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let current = self
                .resolve_owned_transaction_in(&db_tx, user_id, transaction_id)
                .await?;

            apply_totals_delta(
                &db_tx,
                current.project_id,
                TotalsDelta::reverse(current.kind, current.amount_minor),
            )
            .await?;

            let now = Utc::now();
            let active = transactions::ActiveModel {
                id: ActiveValue::Set(current.id.to_string()),
                deleted_at: ActiveValue::Set(Some(now)),
                deleted_by: ActiveValue::Set(Some(user_id.to_string())),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            Ok(())
        })
    }

    /// Rebuild the accumulators of a project from its active transactions.
    ///
    /// Writes absolute values, so it also repairs totals that drifted through
    /// direct edits of the store.
    pub async fn recompute_project_totals(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Project> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_project_owner(&db_tx, project_id, user_id)
                .await?;

            let rows = super::transactions::kind_aggregates(
                transactions::Entity::find()
                    .filter(transactions::Column::ProjectId.eq(project_id.to_string()))
                    .filter(transactions::Column::DeletedAt.is_null()),
            )
            .all(&db_tx)
            .await?;

            let mut income: i64 = 0;
            let mut expense: i64 = 0;
            for row in rows {
                let total = row.total_minor.unwrap_or(0);
                let acc = match TransactionKind::try_from(row.kind.as_str())? {
                    TransactionKind::Income => &mut income,
                    TransactionKind::Expense => &mut expense,
                };
                *acc = acc.checked_add(total).ok_or_else(|| {
                    EngineError::InvalidState("project totals out of range".to_string())
                })?;
            }

            let mut project = Project::try_from(model)?;
            let before = project.totals;
            project.totals = crate::ProjectTotals::new(income, expense);
            project.updated_at = Utc::now();

            let active = projects::ActiveModel {
                id: ActiveValue::Set(project.id.to_string()),
                total_income_minor: ActiveValue::Set(project.totals.total_income_minor),
                total_expense_minor: ActiveValue::Set(project.totals.total_expense_minor),
                balance_minor: ActiveValue::Set(project.totals.balance_minor),
                updated_at: ActiveValue::Set(project.updated_at),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            if before != project.totals {
                tracing::warn!(
                    %project_id,
                    ?before,
                    after = ?project.totals,
                    "project totals drifted, rewritten from transactions"
                );
            }
            Ok(project)
        })
    }
}
