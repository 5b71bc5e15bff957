//! `sql` subcommand: seed a database from a dump script.

use crate::db::Driver;
use crate::error::{Error, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum SqlCommand {
    /// Run a dump script against a database
    Load(LoadArgs),
}

/// Arguments for `sql load`
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Data source name, e.g. `sqlite:tests/_data/app.db`
    #[arg(long)]
    pub dsn: String,

    #[arg(long, default_value = "")]
    pub user: String,

    #[arg(long, default_value = "", env = "CODECEPT_DB_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Remove existing tables before loading
    #[arg(long)]
    pub cleanup: bool,

    /// Dump file to run
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Run a `sql` subcommand, returning the text to print.
pub fn run(command: &SqlCommand) -> Result<String> {
    match command {
        SqlCommand::Load(args) => load(args),
    }
}

fn load(args: &LoadArgs) -> Result<String> {
    let script = std::fs::read_to_string(&args.file).map_err(|e| Error::io(&args.file, e))?;
    let mut driver = Driver::create(&args.dsn, &args.user, &args.password)?;
    if args.cleanup {
        driver.cleanup()?;
    }

    let executed = driver.load_script(&script)?;
    info!(
        file = %args.file.display(),
        dialect = %driver.dialect(),
        statements = executed,
        "Loaded dump"
    );
    Ok(format!("{} statements executed\n", executed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_into_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump.sql");
        std::fs::write(
            &dump,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\nINSERT INTO users (name) VALUES ('davert');\n",
        )
        .unwrap();
        let db = dir.path().join("app.db");

        let args = LoadArgs {
            dsn: format!("sqlite:{}", db.display()),
            user: String::new(),
            password: String::new(),
            cleanup: true,
            file: dump,
        };
        let out = run(&SqlCommand::Load(args)).unwrap();
        assert_eq!(out, "2 statements executed\n");
        assert!(db.exists());
    }

    #[test]
    fn test_missing_dump_is_io_error() {
        let args = LoadArgs {
            dsn: "sqlite::memory:".to_string(),
            user: String::new(),
            password: String::new(),
            cleanup: false,
            file: PathBuf::from("/nonexistent/dump.sql"),
        };
        assert!(matches!(run(&SqlCommand::Load(args)), Err(Error::Io { .. })));
    }
}
