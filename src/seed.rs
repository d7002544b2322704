//! Table seeding: drop (optionally), create, insert fixed rows, read them back.

use std::fmt;

use libsql::Connection;
use serde::{Deserialize, Deserializer};

use crate::{
    errors::Result,
    into_rows,
    model::{TODO_COLUMNS, TableSchema, quote_ident},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub table: &'static str,
    /// Drop the table before creating it. Without this the table is only
    /// created when missing and re-inserting existing ids fails.
    pub drop_existing: bool,
    pub rows: &'static [(i64, bool)],
}

pub const TODOS_PLAN: SeedPlan = SeedPlan {
    table: "todos",
    drop_existing: true,
    rows: &[(1, true), (2, false), (3, true), (4, true), (5, false)],
};

pub const TABLE2_PLAN: SeedPlan = SeedPlan {
    table: "table2",
    drop_existing: false,
    rows: &[(1, true)],
};

impl SeedPlan {
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            name: self.table,
            columns: TODO_COLUMNS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Todo {
    pub id: i64,
    #[serde(deserialize_with = "bool_from_int")]
    pub completed: bool,
}

// SQLite keeps BOOLEAN columns as 0/1 integers.
fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(i64::deserialize(deserializer)? != 0)
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let completed = if self.completed { "True" } else { "False" };
        write!(f, "({}, {})", self.id, completed)
    }
}

/// Runs `plan` inside one transaction and returns every row of the table.
///
/// Nothing is kept when any statement fails: the transaction is rolled back
/// when it is dropped uncommitted.
pub async fn run_seed(conn: &Connection, plan: &SeedPlan) -> Result<Vec<Todo>> {
    let table = quote_ident(plan.table)?;
    let create = plan.schema().create_sql(!plan.drop_existing)?;

    let tx = conn.transaction().await?;
    if plan.drop_existing {
        tx.execute(&format!("DROP TABLE IF EXISTS {table}"), ())
            .await?;
    }
    tx.execute(&create, ()).await?;

    let insert = format!("INSERT INTO {table} (id, completed) VALUES (?1, ?2)");
    for &(id, completed) in plan.rows {
        tx.execute(&insert, libsql::params![id, i64::from(completed)])
            .await?;
    }

    let rows = tx
        .query(&format!("SELECT id, completed FROM {table}"), ())
        .await?;
    let todos: Vec<Todo> = into_rows(rows).await?;
    tx.commit().await?;

    tracing::info!(table = plan.table, rows = todos.len(), "seeded table");
    Ok(todos)
}
