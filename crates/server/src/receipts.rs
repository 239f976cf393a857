//! Receipts API endpoints

use api_types::{
    receipt::{FileView, ReceiptListResponse, ReceiptNew, ReceiptQuery, ReceiptUpdate, ReceiptView},
    revision::RevisionView,
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use engine::{CreateReceiptCmd, FileInput, UpdateReceiptCmd};
use uuid::Uuid;

use crate::{
    ServerError, mapping,
    server::{Caller, ServerState},
    users::{UploadName, content_type},
};

/// Filtered receipts with their total and groupings.
pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<ReceiptListResponse>, ServerError> {
    let view = state
        .engine
        .receipt_view(&caller.id, &mapping::filter(query))
        .await?;
    Ok(Json(mapping::receipt_list(view)))
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Json(payload): Json<ReceiptNew>,
) -> Result<(StatusCode, Json<ReceiptView>), ServerError> {
    let cmd = CreateReceiptCmd {
        user_id: caller.id,
        owner_user_id: payload.owner_user_id,
        category_id: payload.category_id,
        amount: payload.amount,
        receipt_date: payload.receipt_date,
        currency: payload
            .currency
            .map(|currency| mapping::currency_code(currency).to_string()),
        file: payload.file.map(|file| FileInput {
            name: file.name,
            content_type: file.content_type,
            size: file.size,
        }),
    };
    let receipt = state.engine.create_receipt(cmd).await?;
    Ok((StatusCode::CREATED, Json(mapping::receipt(receipt))))
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
) -> Result<Json<ReceiptView>, ServerError> {
    let receipt = state.engine.receipt(receipt_id, &caller.id).await?;
    Ok(Json(mapping::receipt(receipt)))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
    Json(payload): Json<ReceiptUpdate>,
) -> Result<Json<ReceiptView>, ServerError> {
    let cmd = UpdateReceiptCmd {
        receipt_id,
        user_id: caller.id,
        category_id: payload.category_id,
        amount: payload.amount,
        receipt_date: payload.receipt_date,
        currency: payload
            .currency
            .map(|currency| mapping::currency_code(currency).to_string()),
    };
    let receipt = state.engine.update_receipt(cmd).await?;
    Ok(Json(mapping::receipt(receipt)))
}

/// Uploads the receipt scan; the raw body is the file.
pub async fn attach_file(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
    Query(upload): Query<UploadName>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FileView>, ServerError> {
    let file = state
        .engine
        .attach_receipt_file(
            receipt_id,
            &caller.id,
            &upload.name,
            &content_type(&headers),
            body.to_vec(),
        )
        .await?;
    Ok(Json(mapping::file(file)))
}

pub async fn soft_delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .soft_delete_receipt(receipt_id, &caller.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn history(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(receipt_id): Path<Uuid>,
) -> Result<Json<Vec<RevisionView>>, ServerError> {
    let revisions = state
        .engine
        .receipt_history(receipt_id, &caller.id)
        .await?
        .into_iter()
        .map(mapping::revision)
        .collect();
    Ok(Json(revisions))
}

pub async fn export(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Query(query): Query<ReceiptQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let csv = state
        .engine
        .export_receipts(&caller.id, &mapping::filter(query))
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"receipts.csv\"",
            ),
        ],
        csv,
    ))
}
