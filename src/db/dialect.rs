//! SQL dialects recognised from a DSN prefix.

use std::fmt;

/// Database dialect, selected by the scheme part of a DSN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    MySql,
    PostgreSql,
    MsSql,
    Oracle,
    /// Generic driver over the `sqlsrv` client
    SqlSrv,
    /// Generic driver over the `oci` client
    Oci,
    /// Anything else
    Generic,
}

impl Dialect {
    /// Pick the dialect for a provider name, falling back to [`Dialect::Generic`].
    pub fn from_provider(provider: &str) -> Self {
        match provider {
            "sqlite" => Dialect::Sqlite,
            "mysql" => Dialect::MySql,
            "pgsql" => Dialect::PostgreSql,
            "mssql" => Dialect::MsSql,
            "oracle" => Dialect::Oracle,
            "sqlsrv" => Dialect::SqlSrv,
            "oci" => Dialect::Oci,
            _ => Dialect::Generic,
        }
    }

    /// Pick the dialect for a full DSN.
    pub fn from_dsn(dsn: &str) -> Self {
        Self::from_provider(provider(dsn))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::PostgreSql => "pgsql",
            Dialect::MsSql => "mssql",
            Dialect::Oracle => "oracle",
            Dialect::SqlSrv => "sqlsrv",
            Dialect::Oci => "oci",
            Dialect::Generic => "generic",
        }
    }

    /// Opening and closing identifier quotes.
    fn quotes(&self) -> (&'static str, &'static str) {
        match self {
            Dialect::MySql => ("`", "`"),
            Dialect::MsSql | Dialect::SqlSrv => ("[", "]"),
            _ => ("\"", "\""),
        }
    }

    /// Quote an identifier, wrapping each dot-separated segment.
    ///
    /// `schema.table` becomes `"schema"."table"` in the default dialect.
    pub fn quote_name(&self, name: &str) -> String {
        let (open, close) = self.quotes();
        let separator = format!("{}.{}", close, open);
        format!("{}{}{}", open, name.replace('.', &separator), close)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DSN scheme: everything before the first colon, or empty without one.
pub fn provider(dsn: &str) -> &str {
    dsn.split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_extraction() {
        assert_eq!(provider("mysql:host=localhost;dbname=test"), "mysql");
        assert_eq!(provider("sqlite::memory:"), "sqlite");
        assert_eq!(provider("no-scheme"), "");
    }

    #[test]
    fn test_dispatch_by_prefix() {
        assert_eq!(Dialect::from_dsn("sqlite:tests/_data/db.sqlite"), Dialect::Sqlite);
        assert_eq!(Dialect::from_dsn("mysql:host=127.0.0.1"), Dialect::MySql);
        assert_eq!(Dialect::from_dsn("pgsql:host=db"), Dialect::PostgreSql);
        assert_eq!(Dialect::from_dsn("mssql:host=db"), Dialect::MsSql);
        assert_eq!(Dialect::from_dsn("oracle:dbname=x"), Dialect::Oracle);
        assert_eq!(Dialect::from_dsn("sqlsrv:Server=db"), Dialect::SqlSrv);
        assert_eq!(Dialect::from_dsn("oci:dbname=//db/xe"), Dialect::Oci);
        assert_eq!(Dialect::from_dsn("odbc:dsn"), Dialect::Generic);
        assert_eq!(Dialect::from_dsn("MYSQL:host=x"), Dialect::Generic);
    }

    #[test]
    fn test_quote_name_per_dialect() {
        assert_eq!(Dialect::Generic.quote_name("users"), "\"users\"");
        assert_eq!(Dialect::PostgreSql.quote_name("public.users"), "\"public\".\"users\"");
        assert_eq!(Dialect::MySql.quote_name("app.users"), "`app`.`users`");
        assert_eq!(Dialect::SqlSrv.quote_name("dbo.users"), "[dbo].[users]");
    }
}
