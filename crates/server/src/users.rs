//! Session, profile and user management endpoints.

use api_types::user::{
    AvatarUploaded, ProfileUpdate, StatusUpdate, UserList, UserListResponse, UserView,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;

use crate::{ServerError, mapping, server::Caller, server::ServerState};

#[derive(Debug, Deserialize)]
pub struct UploadName {
    pub name: String,
}

pub(crate) fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Resolves the identity headers to a stored user, creating it on first
/// sign-in.
pub async fn session(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.sign_in(&caller.identity()).await?;
    Ok(Json(mapping::user(user)))
}

pub async fn me(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&caller.id).await?;
    Ok(Json(mapping::user(user)))
}

pub async fn update_profile(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_profile(&caller.id, &payload.display_name)
        .await?;
    Ok(Json(mapping::user(user)))
}

pub async fn upload_avatar(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(upload): Query<UploadName>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<AvatarUploaded>), ServerError> {
    let avatar_url = state
        .engine
        .upload_avatar(&caller.id, &upload.name, &content_type(&headers), body.to_vec())
        .await?;
    Ok((StatusCode::CREATED, Json(AvatarUploaded { avatar_url })))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<UserList>,
) -> Result<Json<UserListResponse>, ServerError> {
    let users = state
        .engine
        .list_users(&caller.id, query.status.map(mapping::engine_status))
        .await?
        .into_iter()
        .map(mapping::user)
        .collect();
    Ok(Json(UserListResponse { users }))
}

pub async fn set_status(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(target_id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .set_user_status(&caller.id, &target_id, mapping::engine_status(payload.status))
        .await?;
    Ok(Json(mapping::user(user)))
}

pub async fn promote(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(target_id): Path<String>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.promote_to_staff(&caller.id, &target_id).await?;
    Ok(Json(mapping::user(user)))
}

pub async fn demote(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(target_id): Path<String>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.demote_to_member(&caller.id, &target_id).await?;
    Ok(Json(mapping::user(user)))
}
