//! Transactions API endpoints

use api_types::transaction::{
    TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionNew,
    TransactionSummary, TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{AuthUser, ServerError, server::ServerState};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn parse_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn transaction_view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        project_id: tx.project_id,
        party_id: tx.party_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        occurred_at: tx.occurred_at,
        note: tx.note,
        created_by: tx.created_by,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<TransactionNew>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let Json(payload) = payload?;

    let mut cmd = engine::CreateTransactionCmd::new(
        payload.project_id,
        payload.party_id,
        parse_kind(payload.kind),
        payload.amount_minor,
        user.username,
    );
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at.with_timezone(&Utc));
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }

    let tx = state.engine.create_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(transaction_view(tx))))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    query: Result<Query<TransactionList>, QueryRejection>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let Query(query) = query?;

    let filter = engine::TransactionListFilter {
        project_id: query.project_id,
        party_id: query.party_id,
        kind: query.kind.map(parse_kind),
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        limit: query.limit,
    };

    let page = state
        .engine
        .list_transactions(&user.username, &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page
            .transactions
            .into_iter()
            .map(transaction_view)
            .collect(),
        summary: TransactionSummary {
            income_minor: page.summary.income_minor,
            expense_minor: page.summary.expense_minor,
            net_minor: page.summary.net_minor,
            count: page.summary.count,
        },
    }))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TransactionView>, ServerError> {
    let Path(id) = id?;
    let tx = state.engine.transaction(id, &user.username).await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TransactionUpdate>, JsonRejection>,
) -> Result<Json<TransactionView>, ServerError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let patch = engine::TransactionPatch {
        kind: payload.kind.map(parse_kind),
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
        note: payload.note,
    };
    let tx = state
        .engine
        .update_transaction(engine::UpdateTransactionCmd::new(id, user.username, patch))
        .await?;
    Ok(Json(transaction_view(tx)))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ServerError> {
    let Path(id) = id?;
    state
        .engine
        .soft_delete_transaction(id, &user.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
