use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, categories, receipts, revisions, users, whitelist};
use engine::{Engine, Identity};

static PRINCIPAL_ID_HEADER: HeaderName = HeaderName::from_static("x-principal-id");
static PRINCIPAL_EMAIL_HEADER: HeaderName = HeaderName::from_static("x-principal-email");
static PRINCIPAL_NAME_HEADER: HeaderName = HeaderName::from_static("x-principal-name");
static PRINCIPAL_AVATAR_HEADER: HeaderName = HeaderName::from_static("x-principal-avatar");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the authenticated principal id.
///
/// The upstream identity provider sets "x-principal-id" on every request it
/// lets through.
#[derive(Debug)]
struct PrincipalId(String);

impl Header for PrincipalId {
    fn name() -> &'static HeaderName {
        &PRINCIPAL_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(PrincipalId(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-principal-id header"),
        }
    }
}

/// The caller as asserted by the identity headers.
///
/// Only `id` is required; the rest is used on `POST /session`.
#[derive(Clone, Debug)]
pub struct Caller {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Caller {
    pub fn identity(&self) -> Identity {
        Identity {
            principal_id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

async fn identify(
    principal: Option<TypedHeader<PrincipalId>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(PrincipalId(id))) = principal else {
        return Err(ServerError::Unauthorized);
    };

    let headers = request.headers();
    let caller = Caller {
        email: header_text(headers, &PRINCIPAL_EMAIL_HEADER).unwrap_or_default(),
        display_name: header_text(headers, &PRINCIPAL_NAME_HEADER).unwrap_or_default(),
        avatar_url: header_text(headers, &PRINCIPAL_AVATAR_HEADER),
        id,
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

fn body_limit(engine: &Engine) -> usize {
    // File limit plus one: oversized uploads are rejected by the engine.
    usize::try_from(engine.policy().max_file_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(1)
}

pub fn router(state: ServerState) -> Router {
    let limit = body_limit(&state.engine);
    Router::new()
        .route("/session", post(users::session))
        .route("/me", get(users::me).patch(users::update_profile))
        .route("/me/avatar", post(users::upload_avatar))
        .route("/users", get(users::list))
        .route("/users/{id}/status", post(users::set_status))
        .route("/users/{id}/promote", post(users::promote))
        .route("/users/{id}/demote", post(users::demote))
        .route("/whitelist", get(whitelist::list).post(whitelist::add))
        .route(
            "/whitelist/{email}",
            axum::routing::delete(whitelist::remove),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{id}",
            patch(categories::update).delete(categories::delete),
        )
        .route("/receipts", get(receipts::list).post(receipts::create))
        .route("/receipts/{id}", get(receipts::get).patch(receipts::update))
        .route("/receipts/{id}/file", put(receipts::attach_file))
        .route("/receipts/{id}/delete", post(receipts::soft_delete))
        .route("/receipts/{id}/history", get(receipts::history))
        .route("/revisions", get(revisions::audit_log))
        .route("/export", get(receipts::export))
        .route_layer(middleware::from_fn(identify))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
