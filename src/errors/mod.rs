use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty name")]
    EmptyName,

    #[error("No person stored")]
    PersonNotFound,

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Unknown revision: {0}")]
    UnknownRevision(String),

    #[error("Cannot upgrade to {target}, already at newer revision {current}")]
    TargetBehindCurrent { target: String, current: String },

    #[error("Invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Cannot downgrade {requested} step(s), only {applied} applied")]
    DowngradePastBase { requested: usize, applied: usize },

    #[error("Libsql : {0}")]
    Libsql(#[from] libsql::Error),

    #[error("Deserialization : {0}")]
    De(#[from] de::value::Error),

    #[error("IO : {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse : {0}")]
    Toml(#[from] toml::de::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::EmptyName => (StatusCode::BAD_REQUEST, "The name provided is empty."),
            Error::PersonNotFound => (StatusCode::NOT_FOUND, "No person has been stored yet."),
            _ => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusCode::INTERNAL_SERVER_ERROR
                        .canonical_reason()
                        .unwrap_or("Internal Server Error"),
                )
            }
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(
            Error::EmptyName.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::PersonNotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn storage_errors_are_internal() {
        let err = Error::UnknownRevision("deadbeef".to_string());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
