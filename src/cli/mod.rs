//! CLI command definitions for codecept-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod sql;

use crate::config::Configuration;
use crate::error::Result;
use crate::format::{OutputFormat, format_names, format_paths};
use clap::{Parser, Subcommand};
use serde_json::Value;
use sql::SqlCommand;
use std::path::PathBuf;

/// Inspect layered test-suite configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the project configuration file or directory
    #[arg(short, long, global = true, env = "CODECEPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for printed trees
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged project configuration
    Show,

    /// List discovered suites
    Suites,

    /// Print the resolved settings of a suite
    Suite { name: String },

    /// Print every environment staged for a suite
    Envs { suite: String },

    /// List the modules enabled for a suite
    Modules { suite: String },

    /// Print resolved project directories
    Paths,

    /// Database seeding helpers
    #[command(subcommand)]
    Sql(SqlCommand),
}

/// Run a command, returning the text to print.
pub fn run(cli: &Cli) -> Result<String> {
    if let Command::Sql(command) = &cli.command {
        return sql::run(command);
    }

    let configuration = Configuration::load(cli.config.as_deref())?;
    run_with(&configuration, &cli.command, cli.format)
}

/// Run a configuration command against an already loaded project.
pub fn run_with(
    configuration: &Configuration,
    command: &Command,
    format: OutputFormat,
) -> Result<String> {
    match command {
        Command::Show => format.render(configuration.config()),
        Command::Suites => Ok(format_names(configuration.suites())),
        Command::Suite { name } => format.render(&configuration.suite_settings(name)?),
        Command::Envs { suite } => {
            let environments = configuration.suite_environments(suite)?;
            format.render(&Value::Object(environments))
        }
        Command::Modules { suite } => {
            let settings = configuration.suite_settings(suite)?;
            Ok(format_names(configuration.modules(&settings)?.as_slice()))
        }
        Command::Paths => {
            let output = configuration.output_dir()?;
            let tests = configuration.tests_dir();
            let data = configuration.data_dir();
            let support = configuration.support_dir();
            let envs = configuration.envs_dir();
            Ok(format_paths(&[
                ("project", Some(configuration.project_dir())),
                ("tests", tests.as_deref()),
                ("output", Some(output.as_path())),
                ("data", data.as_deref()),
                ("support", support.as_deref()),
                ("envs", envs.as_deref()),
            ]))
        }
        Command::Sql(command) => sql::run(command),
    }
}
