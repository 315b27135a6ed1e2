use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dataset not found")]
    DatasetNotFound,

    #[error("Data element not found")]
    ElementNotFound,

    #[error("Dataset with name '{name}' already exists")]
    DatasetNameTaken { name: String },

    #[error("Dataset with this name already exists")]
    DatasetRenameConflict,

    #[error("Data element '{name}' already exists in this dataset")]
    ElementNameTaken { name: String },

    #[error("Duplicate element name in dataset")]
    ElementRenameConflict,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {message}")]
    Pool { message: String },

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::DatasetNotFound | Error::ElementNotFound => StatusCode::NOT_FOUND,
            Error::DatasetNameTaken { .. }
            | Error::DatasetRenameConflict
            | Error::ElementNameTaken { .. }
            | Error::ElementRenameConflict => StatusCode::CONFLICT,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Database(_)
            | Error::Pool { .. }
            | Error::Migration { .. }
            | Error::Config { .. }
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::Validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
