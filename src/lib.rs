use axum::{Json, Router, middleware, routing::get};
use futures::TryStreamExt;
use libsql::de::from_row;
use libsql::{Builder, Connection, Database};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::DatabaseConfig;
use crate::errors::{Error, Result};
use crate::handlers::{
    cors::append_cors_headers,
    greeting::{greet_first_person, hello_world},
};

pub mod config;
pub mod errors;
pub mod handlers;
pub mod migrations;
pub mod model;
pub mod seed;

#[derive(Clone)]
pub struct AppState {
    pub conn: Connection,
}

pub async fn into_rows<T>(rows: libsql::Rows) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let items = rows
        .into_stream()
        .map_err(Error::from)
        .and_then(|r| async move { from_row::<T>(&r).map_err(Error::from) })
        .try_collect::<Vec<_>>()
        .await?;
    Ok(items)
}

/// Opens the configured database and hands back one connection to it.
///
/// With Turso credentials configured the local file is an embedded replica
/// and is synced before the connection is returned.
pub async fn open_database(config: &DatabaseConfig) -> Result<(Database, Connection)> {
    let db = match config.remote() {
        Some((url, token)) => {
            let db =
                Builder::new_remote_replica(&config.path, url.to_string(), token.to_string())
                    .build()
                    .await?;
            db.sync().await?;
            tracing::info!(path = %config.path, "synced remote replica");
            db
        }
        None => Builder::new_local(&config.path).build().await?,
    };
    let conn = db.connect()?;
    Ok((db, conn))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// The JSON hello app. Every response, including 404s and 405s, carries the
/// blanket CORS headers.
pub fn basics_app() -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(middleware::from_fn(append_cors_headers))
}

/// The database-backed hello app.
pub fn hello_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(greet_first_person))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::greeting::{create_persons_table, first_person, insert_person};

    #[tokio::test]
    async fn local_database_persists_between_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("example.db").to_string_lossy().into_owned(),
            ..DatabaseConfig::default()
        };

        {
            let (_db, conn) = open_database(&config).await.unwrap();
            create_persons_table(&conn).await.unwrap();
            insert_person(&conn, "Amy").await.unwrap();
        }

        let (_db, conn) = open_database(&config).await.unwrap();
        let person = first_person(&conn).await.unwrap().expect("person should persist");
        assert_eq!(person.name, "Amy");
    }
}
