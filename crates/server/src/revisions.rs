//! Audit log endpoint

use api_types::revision::{RevisionList, RevisionListResponse};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{ServerError, mapping, server::Caller, server::ServerState};

const DEFAULT_PAGE: u64 = 50;
const MAX_PAGE: u64 = 200;

pub async fn audit_log(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<RevisionList>,
) -> Result<Json<RevisionListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let (revisions, next_cursor) = state
        .engine
        .audit_log_page(&caller.id, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(RevisionListResponse {
        revisions: revisions.into_iter().map(mapping::revision).collect(),
        next_cursor,
    }))
}
