use std::fmt;

use crate::{
    AppState,
    errors::{Error, Result},
    model::PERSONS,
};
use axum::{Json, extract::State};
use libsql::de::from_row;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Person ID: {}, name: {}>", self.id, self.name)
    }
}

// =========================Query functions=========================
pub async fn create_persons_table(conn: &libsql::Connection) -> Result<()> {
    conn.execute(&PERSONS.create_sql(true)?, ()).await?;
    Ok(())
}

pub async fn first_person(conn: &libsql::Connection) -> Result<Option<Person>> {
    let mut query = conn
        .query("SELECT id, name FROM persons ORDER BY id LIMIT 1", ())
        .await?;
    let person = query.next().await?; //None if the table is empty
    person
        .map(|row| from_row(&row).map_err(Error::from))
        .transpose()
}

pub async fn insert_person(conn: &libsql::Connection, name: &str) -> Result<Person> {
    if name.trim().is_empty() {
        return Err(Error::EmptyName);
    }
    conn.execute("INSERT INTO persons (name) VALUES (?1)", [name])
        .await?;
    Ok(Person {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

// =========================Handlers=========================
pub async fn hello_world() -> Json<Value> {
    Json(json!({ "message": "HELLO WORLD" }))
}

pub async fn greet_first_person(State(state): State<AppState>) -> Result<String> {
    let person = first_person(&state.conn)
        .await?
        .ok_or(Error::PersonNotFound)?;
    tracing::debug!(%person, "greeting first person");
    Ok(format!("Hello {}", person.name))
}
