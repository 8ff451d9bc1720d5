//! Projects API endpoints

use api_types::{
    party::PartyCategory as ApiCategory,
    project::{
        PartyTotalsView, ProjectDelete, ProjectListResponse, ProjectNew,
        ProjectStatus as ApiStatus, ProjectSummaryResponse, ProjectUpdate, ProjectView,
    },
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

use crate::{AuthUser, ServerError, server::ServerState};

fn map_status(status: engine::ProjectStatus) -> ApiStatus {
    match status {
        engine::ProjectStatus::Planned => ApiStatus::Planned,
        engine::ProjectStatus::Active => ApiStatus::Active,
        engine::ProjectStatus::Completed => ApiStatus::Completed,
        engine::ProjectStatus::OnHold => ApiStatus::OnHold,
    }
}

fn parse_status(status: ApiStatus) -> engine::ProjectStatus {
    match status {
        ApiStatus::Planned => engine::ProjectStatus::Planned,
        ApiStatus::Active => engine::ProjectStatus::Active,
        ApiStatus::Completed => engine::ProjectStatus::Completed,
        ApiStatus::OnHold => engine::ProjectStatus::OnHold,
    }
}

pub(crate) fn map_category(category: engine::PartyCategory) -> ApiCategory {
    match category {
        engine::PartyCategory::Client => ApiCategory::Client,
        engine::PartyCategory::Vendor => ApiCategory::Vendor,
    }
}

fn project_view(project: engine::Project) -> ProjectView {
    ProjectView {
        id: project.id,
        title: project.title,
        code: project.code,
        status: map_status(project.status),
        budget_minor: project.budget_minor,
        total_income_minor: project.totals.total_income_minor,
        total_expense_minor: project.totals.total_expense_minor,
        balance_minor: project.totals.balance_minor,
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<ProjectNew>, JsonRejection>,
) -> Result<(StatusCode, Json<ProjectView>), ServerError> {
    let Json(payload) = payload?;

    let mut cmd = engine::CreateProjectCmd::new(user.username, payload.title, payload.code);
    if let Some(budget) = payload.budget_minor {
        cmd = cmd.budget_minor(budget);
    }
    if let Some(status) = payload.status {
        cmd = cmd.status(parse_status(status));
    }

    let project = state.engine.create_project(cmd).await?;
    Ok((StatusCode::CREATED, Json(project_view(project))))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<ProjectListResponse>, ServerError> {
    let projects = state.engine.list_projects(&user.username).await?;
    Ok(Json(ProjectListResponse {
        projects: projects.into_iter().map(project_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProjectView>, ServerError> {
    let Path(id) = id?;
    let project = state.engine.project(id, &user.username).await?;
    Ok(Json(project_view(project)))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProjectUpdate>, JsonRejection>,
) -> Result<Json<ProjectView>, ServerError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let patch = engine::ProjectPatch {
        title: payload.title,
        code: payload.code,
        budget_minor: payload.budget_minor,
        status: payload.status.map(parse_status),
    };
    let project = state
        .engine
        .update_project(id, &user.username, patch)
        .await?;
    Ok(Json(project_view(project)))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ProjectDelete>, QueryRejection>,
) -> Result<StatusCode, ServerError> {
    let Path(id) = id?;
    let Query(query) = query?;
    state
        .engine
        .delete_project(id, &user.username, query.force)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recompute(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProjectView>, ServerError> {
    let Path(id) = id?;
    let project = state
        .engine
        .recompute_project_totals(id, &user.username)
        .await?;
    Ok(Json(project_view(project)))
}

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProjectSummaryResponse>, ServerError> {
    let Path(id) = id?;
    let summary = state.engine.project_summary(id, &user.username).await?;

    Ok(Json(ProjectSummaryResponse {
        project: project_view(summary.project),
        budget_remaining_minor: summary.budget_remaining_minor,
        parties: summary
            .parties
            .into_iter()
            .map(|p| PartyTotalsView {
                party_id: p.party_id,
                name: p.name,
                category: map_category(p.category),
                income_minor: p.income_minor,
                expense_minor: p.expense_minor,
                count: p.count,
            })
            .collect(),
    }))
}
