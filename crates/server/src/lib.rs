use api_types::error::ErrorResponse;
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::{EngineError, ErrorKind};

pub use server::{AuthUser, ServerState, router, run, run_with_listener, spawn_with_listener};

mod parties;
mod projects;
mod server;
mod transactions;

pub mod types {
    pub mod project {
        pub use api_types::project::{
            PartyTotalsView, ProjectDelete, ProjectListResponse, ProjectNew, ProjectStatus,
            ProjectSummaryResponse, ProjectUpdate, ProjectView,
        };
    }

    pub mod party {
        pub use api_types::party::{
            PartyCategory, PartyListResponse, PartyNew, PartyUpdate, PartyView,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            TransactionKind, TransactionList, TransactionListResponse, TransactionNew,
            TransactionSummary, TransactionUpdate, TransactionView,
        };
    }

    pub mod error {
        pub use api_types::error::ErrorResponse;
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Malformed request: bad JSON, query string or path id.
    BadRequest(String),
    Unauthorized,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Message shown to the client, plus internal detail for debug builds.
fn message_for_engine_error(err: EngineError) -> (String, Option<String>) {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            (
                "internal server error".to_string(),
                cfg!(debug_assertions).then(|| db_err.to_string()),
            )
        }
        other => (other.to_string(), None),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, message, detail) = match self {
            ServerError::Engine(err) => {
                let status = status_for_engine_error(&err);
                let (message, detail) = message_for_engine_error(err);
                (status, message, detail)
            }
            ServerError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "invalid or missing credentials".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            success: false,
            message,
            status: status.as_u16(),
            detail,
        };
        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}
