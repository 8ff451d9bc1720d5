use chrono::{DateTime, Utc};
use sea_orm::{
    FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Select, SelectModel, Selector,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, TransactionKind, transactions};

use super::{Engine, with_tx};

const DEFAULT_LIST_LIMIT: u64 = 50;
const MAX_LIST_LIMIT: u64 = 500;

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
/// Soft-deleted transactions are never returned.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub project_id: Option<Uuid>,
    pub party_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Page size, 50 when absent, at most 500.
    pub limit: Option<u64>,
}

impl TransactionListFilter {
    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidInput(
            "invalid range: from must be < to".to_string(),
        ));
    }
    let limit = filter.limit();
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(EngineError::InvalidInput(format!(
            "limit must be between 1 and {MAX_LIST_LIMIT}"
        )));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        self = self.filter(transactions::Column::DeletedAt.is_null());
        if let Some(party_id) = filter.party_id {
            self = self.filter(transactions::Column::PartyId.eq(party_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        self
    }
}

/// One `GROUP BY project_id, kind` row.
///
/// Grouping by project keeps every SQL sum within one project's accumulator,
/// which never leaves the `i64` range.
#[derive(Debug, FromQueryResult)]
pub(super) struct KindAggregate {
    pub kind: String,
    pub total_minor: Option<i64>,
    pub count: i64,
}

/// Sum and count of `query` per project and transaction kind.
pub(super) fn kind_aggregates(
    query: Select<transactions::Entity>,
) -> Selector<SelectModel<KindAggregate>> {
    query
        .select_only()
        .column(transactions::Column::Kind)
        .column_as(transactions::Column::AmountMinor.sum(), "total_minor")
        .column_as(transactions::Column::Id.count(), "count")
        .group_by(transactions::Column::ProjectId)
        .group_by(transactions::Column::Kind)
        .into_model::<KindAggregate>()
}

/// Income/expense figures computed over a filtered set of transactions.
///
/// Independent of the persisted project accumulators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub income_minor: i64,
    pub expense_minor: i64,
    pub net_minor: i64,
    pub count: u64,
}

impl TransactionSummary {
    fn from_aggregates(rows: Vec<KindAggregate>) -> ResultEngine<Self> {
        let out_of_range =
            || EngineError::InvalidState("transaction summary out of range".to_string());
        let mut summary = Self::default();
        for row in rows {
            let total = row.total_minor.unwrap_or(0);
            let acc = match TransactionKind::try_from(row.kind.as_str())? {
                TransactionKind::Income => &mut summary.income_minor,
                TransactionKind::Expense => &mut summary.expense_minor,
            };
            *acc = acc.checked_add(total).ok_or_else(out_of_range)?;
            summary.count += u64::try_from(row.count).unwrap_or(0);
        }
        summary.net_minor = summary
            .income_minor
            .checked_sub(summary.expense_minor)
            .ok_or_else(out_of_range)?;
        Ok(summary)
    }
}

/// A page of transactions plus the summary of everything the filter matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub summary: TransactionSummary,
}

impl Engine {
    /// Lists active transactions of the projects owned by `user_id`.
    ///
    /// Newest first by `(occurred_at DESC, id DESC)`. The summary covers the
    /// whole filtered set, not only the returned page. Filtering on a project
    /// the user does not own returns `KeyNotFound`.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<TransactionPage> {
        validate_list_filter(filter)?;

        with_tx!(self, |db_tx| {
            let owned = self.owned_project_ids_in(&db_tx, user_id).await?;
            let scope: Vec<String> = match filter.project_id {
                Some(project_id) if owned.contains(&project_id) => vec![project_id.to_string()],
                Some(_) => {
                    return Err(EngineError::KeyNotFound("project not exists".to_string()));
                }
                None => owned.iter().map(Uuid::to_string).collect(),
            };
            if scope.is_empty() {
                return Ok(TransactionPage::default());
            }

            let models = transactions::Entity::find()
                .filter(transactions::Column::ProjectId.is_in(scope.clone()))
                .apply_tx_filters(filter)
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(filter.limit())
                .all(&db_tx)
                .await?;
            let transactions = models
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let aggregates = kind_aggregates(
                transactions::Entity::find()
                    .filter(transactions::Column::ProjectId.is_in(scope))
                    .apply_tx_filters(filter),
            )
            .all(&db_tx)
            .await?;

            Ok(TransactionPage {
                transactions,
                summary: TransactionSummary::from_aggregates(aggregates)?,
            })
        })
    }

    /// Return one active transaction owned (through its project) by `user_id`.
    pub async fn transaction(&self, transaction_id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        self.resolve_owned_transaction(user_id, transaction_id).await
    }
}
