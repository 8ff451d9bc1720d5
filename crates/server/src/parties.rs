//! Parties API endpoints

use api_types::party::{
    PartyCategory as ApiCategory, PartyListResponse, PartyNew, PartyUpdate, PartyView,
};
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

use crate::{AuthUser, ServerError, projects::map_category, server::ServerState};

fn party_view(party: engine::Party) -> PartyView {
    PartyView {
        id: party.id,
        project_id: party.project_id,
        name: party.name,
        category: map_category(party.category),
        phone: party.contact.phone,
        email: party.contact.email,
        address: party.contact.address,
        created_at: party.created_at,
        updated_at: party.updated_at,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    project_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PartyNew>, JsonRejection>,
) -> Result<(StatusCode, Json<PartyView>), ServerError> {
    let Path(project_id) = project_id?;
    let Json(payload) = payload?;

    let category = match payload.category {
        ApiCategory::Client => engine::PartyCategory::Client,
        ApiCategory::Vendor => engine::PartyCategory::Vendor,
    };
    let cmd = engine::CreatePartyCmd::new(project_id, user.username, payload.name, category)
        .contact(engine::Contact {
            phone: payload.phone,
            email: payload.email,
            address: payload.address,
        });

    let party = state.engine.create_party(cmd).await?;
    Ok((StatusCode::CREATED, Json(party_view(party))))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    project_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PartyListResponse>, ServerError> {
    let Path(project_id) = project_id?;
    let parties = state
        .engine
        .list_parties(project_id, &user.username)
        .await?;
    Ok(Json(PartyListResponse {
        parties: parties.into_iter().map(party_view).collect(),
    }))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PartyView>, ServerError> {
    let Path(id) = id?;
    let party = state.engine.party(id, &user.username).await?;
    Ok(Json(party_view(party)))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PartyUpdate>, JsonRejection>,
) -> Result<Json<PartyView>, ServerError> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let patch = engine::PartyPatch {
        name: payload.name,
        phone: payload.phone,
        email: payload.email,
        address: payload.address,
    };
    let party = state.engine.update_party(id, &user.username, patch).await?;
    Ok(Json(party_view(party)))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ServerError> {
    let Path(id) = id?;
    state.engine.delete_party(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
