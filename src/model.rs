//! Schema definitions shared by the handlers, the seeding job and the
//! migrations. Each table is a plain record that renders its own DDL.

use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    String,
    Boolean,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::String => "VARCHAR",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub default: Option<&'static str>,
}

impl Column {
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
            primary_key: true,
            nullable: false,
            default: None,
        }
    }

    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: true,
            default: None,
        }
    }

    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: false,
            default: None,
        }
    }

    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.ty.sql());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        def
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn create_sql(&self, if_not_exists: bool) -> Result<String> {
        let name = quote_ident(self.name)?;
        let columns = self
            .columns
            .iter()
            .map(Column::definition)
            .collect::<Vec<_>>()
            .join(", ");
        let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
        Ok(format!("CREATE TABLE {guard}{name} ({columns})"))
    }
}

pub const PERSONS: TableSchema = TableSchema {
    name: "persons",
    columns: &[
        Column::primary_key("id"),
        Column::required("name", ColumnType::String),
    ],
};

/// Columns of every seeded todo table, whatever the table is called.
pub const TODO_COLUMNS: &[Column] = &[
    Column::primary_key("id"),
    Column::required("completed", ColumnType::Boolean).with_default("FALSE"),
];

/// Identifiers cannot be bound as parameters, so they are checked and quoted.
pub fn quote_ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(Error::InvalidTableName(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_table_ddl() {
        let schema = TableSchema {
            name: "todos",
            columns: TODO_COLUMNS,
        };
        assert_eq!(
            schema.create_sql(false).unwrap(),
            "CREATE TABLE \"todos\" (id INTEGER PRIMARY KEY, completed BOOLEAN NOT NULL DEFAULT FALSE)"
        );
    }

    #[test]
    fn persons_ddl_is_guarded() {
        assert_eq!(
            PERSONS.create_sql(true).unwrap(),
            "CREATE TABLE IF NOT EXISTS \"persons\" (id INTEGER PRIMARY KEY, name VARCHAR NOT NULL)"
        );
    }

    #[test]
    fn nullable_column_has_no_constraint() {
        let column = Column::nullable("seeking_talent", ColumnType::Boolean);
        assert_eq!(column.definition(), "seeking_talent BOOLEAN");
    }

    #[test]
    fn rejects_suspicious_identifiers() {
        for name in ["", "1todos", "todos; DROP TABLE persons", "to\"dos", "a b"] {
            assert!(
                matches!(quote_ident(name), Err(Error::InvalidTableName(_))),
                "{name:?} should be rejected"
            );
        }
        assert_eq!(quote_ident("Venue").unwrap(), "\"Venue\"");
        assert_eq!(quote_ident("_schema_version").unwrap(), "\"_schema_version\"");
    }
}
