//! Categories API endpoints.

use api_types::category::{
    CategoryCreate, CategoryList, CategoryListResponse, CategoryUpdate, CategoryView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, mapping, server::Caller, server::ServerState};

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<CategoryList>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let include_inactive = query.include_inactive.unwrap_or(false);
    let categories = state
        .engine
        .list_categories(&caller.id, include_inactive)
        .await?
        .into_iter()
        .map(mapping::category)
        .collect();

    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&caller.id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(mapping::category(category))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    if payload.name.is_none() && payload.is_active.is_none() {
        return Err(ServerError::Generic(
            "provide at least one of name or is_active".to_string(),
        ));
    }

    let engine = &state.engine;
    let mut category = None;
    if let Some(name) = payload.name.as_deref() {
        category = Some(engine.rename_category(&caller.id, category_id, name).await?);
    }
    if let Some(active) = payload.is_active {
        category = Some(
            engine
                .set_category_active(&caller.id, category_id, active)
                .await?,
        );
    }

    category
        .map(|category| Json(mapping::category(category)))
        .ok_or_else(|| ServerError::Generic("nothing to update".to_string()))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_category(&caller.id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
