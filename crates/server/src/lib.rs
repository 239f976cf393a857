use api_types::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{Caller, ServerState, router, run, run_with_listener, spawn_with_listener};

mod categories;
mod mapping;
mod receipts;
mod revisions;
mod server;
mod users;
mod whitelist;

pub mod types {
    pub mod user {
        pub use api_types::user::{
            AvatarUploaded, ProfileUpdate, Role, StatusUpdate, UserList, UserListResponse,
            UserStatus, UserView,
        };
    }

    pub mod whitelist {
        pub use api_types::whitelist::{WhitelistEntryView, WhitelistNew, WhitelistResponse};
    }

    pub mod category {
        pub use api_types::category::{
            CategoryCreate, CategoryList, CategoryListResponse, CategoryUpdate, CategoryView,
        };
    }

    pub mod receipt {
        pub use api_types::receipt::{
            CategoryTotalView, FileNew, FileView, MonthTotalView, ReceiptListResponse,
            ReceiptNew, ReceiptQuery, ReceiptUpdate, ReceiptView,
        };
    }

    pub mod revision {
        pub use api_types::revision::{RevisionList, RevisionListResponse, RevisionView};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Unauthorized,
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::Conflict(_) | EngineError::InvalidState(_) => {
            StatusCode::CONFLICT
        }
        EngineError::Database(_) | EngineError::Storage(_) | EngineError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        other if other.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Storage(msg) => {
            tracing::error!("storage error: {msg}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing principal headers".to_string(),
            ),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflicts_map_to_409() {
        for err in [
            EngineError::ExistingKey("x".to_string()),
            EngineError::Conflict("x".to_string()),
            EngineError::InvalidState("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let res = ServerError::from(EngineError::InvalidCursor("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_storage_maps_to_500() {
        let res = ServerError::from(EngineError::Storage("disk".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_principal_maps_to_401() {
        let res = ServerError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
