//! Reversible schema revisions.
//!
//! Revisions form a chain through `down_revision`. The revision currently
//! applied is stored as the single row of `_schema_version`; an empty table
//! means the database is at base. Every revision runs in its own
//! transaction together with the version bump, so a failed step leaves
//! both the schema and the recorded version untouched.

use libsql::Connection;

use crate::{
    errors::{Error, Result},
    model::{Column, ColumnType, TableSchema, quote_ident},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOp {
    CreateTable(TableSchema),
    DropTable(&'static str),
    AddColumn {
        table: &'static str,
        column: Column,
    },
    DropColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl SchemaOp {
    pub fn sql(&self) -> Result<String> {
        let sql = match self {
            SchemaOp::CreateTable(schema) => schema.create_sql(false)?,
            SchemaOp::DropTable(table) => format!("DROP TABLE {}", quote_ident(table)?),
            SchemaOp::AddColumn { table, column } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(table)?,
                column.definition()
            ),
            SchemaOp::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quote_ident(table)?,
                quote_ident(column)?
            ),
        };
        Ok(sql)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Revision {
    pub id: &'static str,
    pub down_revision: Option<&'static str>,
    pub message: &'static str,
    pub upgrade: &'static [SchemaOp],
    pub downgrade: &'static [SchemaOp],
}

pub const VENUE: TableSchema = TableSchema {
    name: "Venue",
    columns: &[
        Column::primary_key("id"),
        Column::nullable("name", ColumnType::String),
        Column::nullable("city", ColumnType::String),
        Column::nullable("state", ColumnType::String),
        Column::nullable("address", ColumnType::String),
        Column::nullable("phone", ColumnType::String),
        Column::nullable("image_link", ColumnType::String),
        Column::nullable("facebook_link", ColumnType::String),
    ],
};

/// Oldest first.
pub const REVISIONS: &[Revision] = &[
    Revision {
        id: "199af702c4eb",
        down_revision: None,
        message: "create venue table",
        upgrade: &[SchemaOp::CreateTable(VENUE)],
        downgrade: &[SchemaOp::DropTable("Venue")],
    },
    Revision {
        id: "f3e477c80527",
        down_revision: Some("199af702c4eb"),
        message: "add venue genres, seeking talent and web link",
        upgrade: &[
            SchemaOp::AddColumn {
                table: "Venue",
                column: Column::nullable("genres", ColumnType::String),
            },
            SchemaOp::AddColumn {
                table: "Venue",
                column: Column::nullable("seeking_talent", ColumnType::Boolean),
            },
            SchemaOp::AddColumn {
                table: "Venue",
                column: Column::nullable("web_link", ColumnType::String),
            },
        ],
        downgrade: &[
            SchemaOp::DropColumn {
                table: "Venue",
                column: "web_link",
            },
            SchemaOp::DropColumn {
                table: "Venue",
                column: "seeking_talent",
            },
            SchemaOp::DropColumn {
                table: "Venue",
                column: "genres",
            },
        ],
    },
];

async fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _schema_version (
            version_num VARCHAR(32) NOT NULL PRIMARY KEY
        )",
        (),
    )
    .await?;
    Ok(())
}

/// The revision currently applied, `None` at base.
pub async fn current(conn: &Connection) -> Result<Option<String>> {
    let mut tables = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_schema_version'",
            (),
        )
        .await?;
    if tables.next().await?.is_none() {
        return Ok(None);
    }
    let mut rows = conn
        .query("SELECT version_num FROM _schema_version LIMIT 1", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get::<String>(0)?)),
        None => Ok(None),
    }
}

// Number of revisions of `revisions` already applied.
async fn applied_count(conn: &Connection, revisions: &[Revision]) -> Result<usize> {
    match current(conn).await? {
        None => Ok(0),
        Some(version) => revisions
            .iter()
            .position(|r| r.id == version)
            .map(|idx| idx + 1)
            .ok_or(Error::UnknownRevision(version)),
    }
}

async fn apply(conn: &Connection, ops: &[SchemaOp], version: Option<&str>) -> Result<()> {
    ensure_version_table(conn).await?;
    let tx = conn.transaction().await?;
    for op in ops {
        tx.execute(&op.sql()?, ()).await?;
    }
    tx.execute("DELETE FROM _schema_version", ()).await?;
    if let Some(version) = version {
        tx.execute(
            "INSERT INTO _schema_version (version_num) VALUES (?1)",
            [version],
        )
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Applies pending revisions up to `target` (head when `None`) and returns
/// the ids applied, oldest first.
pub async fn upgrade(conn: &Connection, target: Option<&str>) -> Result<Vec<&'static str>> {
    upgrade_within(conn, REVISIONS, target).await
}

/// Reverts the newest `steps` revisions and returns their ids, newest first.
pub async fn downgrade(conn: &Connection, steps: usize) -> Result<Vec<&'static str>> {
    downgrade_within(conn, REVISIONS, steps).await
}

async fn upgrade_within(
    conn: &Connection,
    revisions: &'static [Revision],
    target: Option<&str>,
) -> Result<Vec<&'static str>> {
    let end = match target {
        None => revisions.len(),
        Some(id) => {
            revisions
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| Error::UnknownRevision(id.to_string()))?
                + 1
        }
    };
    let start = applied_count(conn, revisions).await?;
    if end < start {
        return Err(Error::TargetBehindCurrent {
            target: revisions[end - 1].id.to_string(),
            current: revisions[start - 1].id.to_string(),
        });
    }

    let mut applied = Vec::new();
    for revision in revisions.iter().take(end).skip(start) {
        tracing::info!(revision = revision.id, message = revision.message, "upgrading");
        apply(conn, revision.upgrade, Some(revision.id)).await?;
        applied.push(revision.id);
    }
    if applied.is_empty() {
        tracing::debug!("schema already at target revision");
    }
    Ok(applied)
}

async fn downgrade_within(
    conn: &Connection,
    revisions: &'static [Revision],
    steps: usize,
) -> Result<Vec<&'static str>> {
    let applied = applied_count(conn, revisions).await?;
    if steps > applied {
        return Err(Error::DowngradePastBase {
            requested: steps,
            applied,
        });
    }

    let mut reverted = Vec::new();
    for revision in revisions[applied - steps..applied].iter().rev() {
        tracing::info!(revision = revision.id, message = revision.message, "downgrading");
        apply(conn, revision.downgrade, revision.down_revision).await?;
        reverted.push(revision.id);
    }
    Ok(reverted)
}
