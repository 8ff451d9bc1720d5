use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, parties, projects, transactions};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// The authenticated caller, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        tracing::warn!(uri = %request.uri(), "request without credentials");
        return Err(ServerError::Unauthorized);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        tracing::warn!(username = auth_header.username(), "rejected empty credentials");
        return Err(ServerError::Unauthorized);
    }

    let Some(username) = state
        .engine
        .verify_credentials(auth_header.username(), auth_header.password())
        .await?
    else {
        tracing::warn!(username = auth_header.username(), "rejected credentials");
        return Err(ServerError::Unauthorized);
    };

    request.extensions_mut().insert(AuthUser { username });
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/projects", post(projects::create).get(projects::list))
        .route(
            "/projects/{id}",
            get(projects::get)
                .patch(projects::update)
                .delete(projects::delete),
        )
        .route("/projects/{id}/recompute", post(projects::recompute))
        .route("/projects/{id}/summary", get(projects::summary))
        .route(
            "/projects/{id}/parties",
            post(parties::create).get(parties::list),
        )
        .route(
            "/parties/{id}",
            get(parties::get)
                .patch(parties::update)
                .delete(parties::delete),
        )
        .route(
            "/transactions",
            post(transactions::create).get(transactions::list),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
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
