//! SQLite executor backed by rusqlite.

use super::Executor;
use crate::error::Result;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Executor over a single SQLite connection.
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    /// Open the database named by the part of a DSN after `sqlite:`.
    ///
    /// An empty target or `:memory:` opens an in-memory database.
    pub fn open(target: &str) -> Result<Self> {
        let conn = if target.is_empty() || target == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(target)?
        };
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }
}

impl Executor for SqliteExecutor {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        let affected = stmt.execute(params_from_iter(params.iter().map(to_sql_value)))?;
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Map::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), from_value_ref(row.get_ref(idx)?));
            }
            result.push(record);
        }
        Ok(result)
    }

    fn last_insert_id(&mut self) -> Result<i64> {
        Ok(self.conn.last_insert_rowid())
    }

    /// Drop every user table.
    fn cleanup(&mut self) -> Result<()> {
        let tables = self.table_names()?;
        if tables.is_empty() {
            return Ok(());
        }

        let mut batch = String::from("PRAGMA foreign_keys=OFF;\n");
        for table in &tables {
            batch.push_str(&format!("DROP TABLE IF EXISTS \"{}\";\n", table.replace('"', "\"\"")));
        }
        batch.push_str("PRAGMA foreign_keys=ON;");
        self.conn.execute_batch(&batch)?;

        debug!(tables = tables.len(), "Dropped SQLite tables");
        Ok(())
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
