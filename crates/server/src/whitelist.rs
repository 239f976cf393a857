//! Whitelist API endpoints. Owner only.

use api_types::whitelist::{WhitelistEntryView, WhitelistNew, WhitelistResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{ServerError, mapping, server::Caller, server::ServerState};

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<WhitelistResponse>, ServerError> {
    let entries = state
        .engine
        .list_whitelist(&caller.id)
        .await?
        .into_iter()
        .map(mapping::whitelist_entry)
        .collect();
    Ok(Json(WhitelistResponse { entries }))
}

pub async fn add(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<WhitelistNew>,
) -> Result<(StatusCode, Json<WhitelistEntryView>), ServerError> {
    let entry = state
        .engine
        .add_whitelist_entry(&caller.id, &payload.email, payload.note.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(mapping::whitelist_entry(entry))))
}

pub async fn remove(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(email): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_whitelist_entry(&caller.id, &email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
