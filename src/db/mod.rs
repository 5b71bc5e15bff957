//! Database driver used to seed and clean databases between test runs.
//!
//! [`Driver::create`] picks a [`Dialect`] from the DSN prefix. The driver
//! builds parameterized statements in that dialect and hands them to an
//! [`Executor`]. SQLite connections are opened directly; other dialects take
//! an executor supplied by the caller.

pub mod dialect;
pub mod script;
pub mod sqlite;

pub use dialect::{Dialect, provider};
pub use script::{ScriptSplitter, split_statements};
pub use sqlite::SqliteExecutor;

use crate::error::{ConfigurationError, Result};
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Primary key column assumed for every table.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

static DBNAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)dbname=(.*);").ok());

/// Runs SQL against a live connection.
pub trait Executor {
    /// Run one or more raw statements without parameters.
    fn exec(&mut self, sql: &str) -> Result<()>;

    /// Run a parameterized statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Run a parameterized query, returning each row as a column mapping.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>>;

    /// Id generated by the most recent insert.
    fn last_insert_id(&mut self) -> Result<i64>;

    /// Remove data left by previous runs.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Dialect-aware statement builder bound to a connection.
pub struct Driver {
    dialect: Dialect,
    dsn: String,
    user: String,
    password: String,
    executor: Box<dyn Executor>,
    /// Most recent statement run by [`Driver::load`]
    last_statement: Option<String>,
    /// Table name to primary key column
    primary_columns: HashMap<String, String>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("dialect", &self.dialect)
            .field("dsn", &self.dsn)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Connect using the dialect named by the DSN prefix.
    ///
    /// Only `sqlite:` DSNs open a connection here. Every other scheme,
    /// recognised or not, fails with
    /// [`ErrorCode::UnsupportedDialect`](crate::error::ErrorCode). Unknown
    /// schemes still map to [`Dialect::Generic`], but the statement builders
    /// for that and every other non-SQLite dialect are only reachable through
    /// [`Driver::with_executor`] with a caller-supplied [`Executor`].
    pub fn create(dsn: &str, user: &str, password: &str) -> Result<Self> {
        let dialect = Dialect::from_dsn(dsn);
        let executor: Box<dyn Executor> = match dialect {
            Dialect::Sqlite => {
                let target = dsn.split_once(':').map(|(_, rest)| rest).unwrap_or("");
                Box::new(SqliteExecutor::open(target)?)
            }
            _ => return Err(ConfigurationError::unsupported_dialect(provider(dsn)).into()),
        };
        Ok(Self::with_executor(dsn, user, password, executor))
    }

    /// Build a driver over an existing connection.
    pub fn with_executor(
        dsn: &str,
        user: &str,
        password: &str,
        executor: Box<dyn Executor>,
    ) -> Self {
        let dialect = Dialect::from_dsn(dsn);
        debug!(dialect = %dialect, "Created database driver");
        Self {
            dialect,
            dsn: dsn.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            executor,
            last_statement: None,
            primary_columns: HashMap::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Database name from a `dbname=...;` DSN segment.
    pub fn database_name(&self) -> Option<&str> {
        let re = DBNAME_RE.as_ref()?;
        re.captures(&self.dsn)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Statement most recently run by [`Driver::load`].
    pub fn last_statement(&self) -> Option<&str> {
        self.last_statement.as_deref()
    }

    /// Quote an identifier for this dialect.
    pub fn quoted_name(&self, name: &str) -> String {
        self.dialect.quote_name(name)
    }

    pub fn cleanup(&mut self) -> Result<()> {
        self.executor.cleanup()
    }

    /// Run a dump given as lines, honouring `DELIMITER` directives.
    ///
    /// Returns the number of statements executed.
    pub fn load<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Result<usize> {
        let mut splitter = ScriptSplitter::new();
        let mut executed = 0;

        for line in lines {
            let Some(statement) = splitter.push_line(line) else {
                continue;
            };
            debug!(statement = %statement, "Executing dump statement");
            self.executor.exec(&statement)?;
            self.last_statement = Some(statement);
            executed += 1;
        }

        if let Some(rest) = splitter.remainder() {
            warn!(
                delimiter = %splitter.delimiter(),
                "Ignoring unterminated statement at end of dump: {}", rest
            );
        }
        Ok(executed)
    }

    /// Run a dump given as one string.
    pub fn load_script(&mut self, sql: &str) -> Result<usize> {
        self.load(sql.lines())
    }

    /// `INSERT` statement with one placeholder per column of `data`.
    pub fn insert(&self, table: &str, data: &Map<String, Value>) -> String {
        let columns: Vec<String> = data.keys().map(|c| self.quoted_name(c)).collect();
        let placeholders = vec!["?"; data.len()];
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quoted_name(table),
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// `SELECT` statement filtered by `criteria`.
    ///
    /// Null criteria become `IS NULL` conditions and are left out of the
    /// returned parameters; the rest bind in order.
    pub fn select(
        &self,
        column: &str,
        table: &str,
        criteria: &Map<String, Value>,
    ) -> (String, Vec<Value>) {
        let (where_clause, params) = self.where_clause(criteria);
        let query = format!("select {} from {} {}", column, self.quoted_name(table), where_clause);
        (query, params)
    }

    fn where_clause(&self, criteria: &Map<String, Value>) -> (String, Vec<Value>) {
        if criteria.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut conditions = Vec::with_capacity(criteria.len());
        let mut params = Vec::with_capacity(criteria.len());
        for (column, value) in criteria {
            if value.is_null() {
                conditions.push(format!("{} IS NULL ", self.quoted_name(column)));
            } else {
                conditions.push(format!("{} = ? ", self.quoted_name(column)));
                params.push(value.clone());
            }
        }
        (format!("WHERE {}", conditions.join("AND ")), params)
    }

    /// Delete one row by primary key.
    pub fn delete_query(&mut self, table: &str, id: &Value, primary_key: &str) -> Result<usize> {
        let query = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.quoted_name(table),
            self.quoted_name(primary_key)
        );
        self.execute_query(&query, std::slice::from_ref(id))
    }

    /// Insert a row and return the generated id.
    pub fn insert_row(&mut self, table: &str, data: &Map<String, Value>) -> Result<i64> {
        let query = self.insert(table, data);
        let params: Vec<Value> = data.values().cloned().collect();
        self.execute_query(&query, &params)?;
        self.last_insert_id(table)
    }

    /// Fetch rows matching `criteria`.
    pub fn fetch(
        &mut self,
        column: &str,
        table: &str,
        criteria: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>> {
        let (query, params) = self.select(column, table, criteria);
        self.executor.query(&query, &params)
    }

    pub fn execute_query(&mut self, query: &str, params: &[Value]) -> Result<usize> {
        debug!(query = %query, params = params.len(), "Executing query");
        self.executor.execute(query, params)
    }

    pub fn last_insert_id(&mut self, _table: &str) -> Result<i64> {
        self.executor.last_insert_id()
    }

    /// Primary key column of `table`.
    ///
    /// Always [`DEFAULT_PRIMARY_KEY`]; keys are not read from the schema.
    pub fn primary_column(&mut self, table: &str) -> &str {
        self.primary_columns
            .entry(table.to_string())
            .or_insert_with(|| DEFAULT_PRIMARY_KEY.to_string())
    }

    /// Forget cached primary key columns.
    pub fn flush_primary_column_cache(&mut self) -> bool {
        self.primary_columns.clear();
        self.primary_columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records statements instead of running them.
    #[derive(Default, Clone)]
    struct Recorder {
        log: Rc<RefCell<Vec<(String, Vec<Value>)>>>,
    }

    impl Executor for Recorder {
        fn exec(&mut self, sql: &str) -> Result<()> {
            self.log.borrow_mut().push((sql.to_string(), Vec::new()));
            Ok(())
        }

        fn execute(&mut self, sql: &str, params: &[Value]) -> Result<usize> {
            self.log.borrow_mut().push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Map<String, Value>>> {
            Ok(Vec::new())
        }

        fn last_insert_id(&mut self) -> Result<i64> {
            Ok(42)
        }
    }

    fn recording_driver(dsn: &str) -> (Driver, Recorder) {
        let recorder = Recorder::default();
        let driver = Driver::with_executor(dsn, "root", "", Box::new(recorder.clone()));
        (driver, recorder)
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn test_create_rejects_dialects_without_client() {
        let err = Driver::create("mysql:host=localhost;dbname=app;", "root", "").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UnsupportedDialect));
    }

    #[test]
    fn test_unknown_scheme_uses_generic_builders_via_executor() {
        let err = Driver::create("odbc:warehouse", "", "").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::UnsupportedDialect));

        let (driver, _) = recording_driver("odbc:warehouse");
        assert_eq!(driver.dialect(), Dialect::Generic);
        assert_eq!(driver.quoted_name("dbo.users"), "\"dbo\".\"users\"");
    }

    #[test]
    fn test_create_sqlite_in_memory() {
        let driver = Driver::create("sqlite::memory:", "", "").unwrap();
        assert_eq!(driver.dialect(), Dialect::Sqlite);
    }

    #[test]
    fn test_insert_statement() {
        let (driver, _) = recording_driver("pgsql:host=db");
        let sql = driver.insert("public.users", &map(json!({"name": "davert", "email": "d@x.test"})));
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"users\" (\"name\", \"email\") VALUES (?, ?)"
        );
    }

    #[test]
    fn test_select_with_null_criteria() {
        let (driver, _) = recording_driver("odbc:whatever");
        let (sql, params) = driver.select(
            "count(*)",
            "users",
            &map(json!({"name": "davert", "deleted_at": null})),
        );
        assert_eq!(
            sql,
            "select count(*) from \"users\" WHERE \"name\" = ? AND \"deleted_at\" IS NULL "
        );
        assert_eq!(params, vec![json!("davert")]);
    }

    #[test]
    fn test_select_without_criteria() {
        let (driver, _) = recording_driver("mysql:host=db");
        let (sql, params) = driver.select("*", "users", &Map::new());
        assert_eq!(sql, "select * from `users` ");
        assert!(params.is_empty());
    }

    #[test]
    fn test_delete_query_executes() {
        let (mut driver, recorder) = recording_driver("sqlsrv:Server=db");
        let pk = driver.primary_column("users").to_string();
        driver.delete_query("dbo.users", &json!(7), &pk).unwrap();

        let log = recorder.log.borrow();
        assert_eq!(log[0].0, "DELETE FROM [dbo].[users] WHERE [id] = ?");
        assert_eq!(log[0].1, vec![json!(7)]);
    }

    #[test]
    fn test_load_tracks_last_statement() {
        let (mut driver, recorder) = recording_driver("mysql:host=db");
        let executed = driver
            .load_script("CREATE TABLE a (id INT);\n-- comment\nINSERT INTO a VALUES (1);\nSELECT")
            .unwrap();
        assert_eq!(executed, 2);
        assert_eq!(driver.last_statement(), Some("INSERT INTO a VALUES (1)"));
        assert_eq!(recorder.log.borrow().len(), 2);
    }

    #[test]
    fn test_database_name() {
        let (driver, _) = recording_driver("mysql:host=localhost;dbname=testdb;");
        assert_eq!(driver.database_name(), Some("testdb"));

        let (driver, _) = recording_driver("mysql:host=localhost;dbname=testdb");
        assert_eq!(driver.database_name(), None);
    }

    #[test]
    fn test_primary_column_cache() {
        let (mut driver, _) = recording_driver("sqlite::memory:");
        assert_eq!(driver.primary_column("users"), "id");
        assert!(driver.flush_primary_column_cache());
    }

    #[test]
    fn test_insert_row_returns_id() {
        let (mut driver, recorder) = recording_driver("oci:dbname=xe");
        let id = driver
            .insert_row("users", &map(json!({"name": "a"})))
            .unwrap();
        assert_eq!(id, 42);
        assert_eq!(recorder.log.borrow()[0].1, vec![json!("a")]);
    }
}
