//! querygate
//!
//! Expand list parameters, run queries against configured SQLite destinations, and manage the
//! configuration file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use query_engine_execution::driver::Row;
use query_engine_sql::sql::{self, BoundParams, Params, Value};
use querygate_configuration::environment::ProcessEnvironment;
use querygate_configuration::version1::ParsedConfiguration;
use querygate_sqlite::{health, state};

#[derive(Parser, Debug)]
#[command(name = "querygate")]
#[command(about = "Run SQL with list parameters against configured databases")]
struct Args {
    /// Log filter, used when RUST_LOG is not set
    #[arg(long, env = "QUERYGATE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a query with its list parameters expanded.
    Expand {
        /// SQL using `?` or `:name` placeholders
        sql: String,
        /// Parameters as JSON: an array for `?`, an object for `:name`
        #[arg(long, default_value = "null")]
        params: String,
    },
    /// Run a query and print its rows as JSON.
    Query {
        /// Directory containing configuration.json
        #[arg(long, env = "QUERYGATE_CONFIGURATION_DIR", default_value = ".")]
        configuration: PathBuf,
        /// Destination to run against, the default one if omitted
        #[arg(long)]
        destination: Option<String>,
        sql: String,
        #[arg(long, default_value = "null")]
        params: String,
    },
    /// Check that a destination answers queries.
    Health {
        #[arg(long, env = "QUERYGATE_CONFIGURATION_DIR", default_value = ".")]
        configuration: PathBuf,
        #[arg(long)]
        destination: Option<String>,
    },
    /// Write an initial configuration and its JSON schema.
    Initialize {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the JSON schema of the configuration file.
    Schema,
}

pub fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Expand { sql, params } => {
            let query = sql::expand(&sql, parse_params(&params)?)?;
            let pretty = sqlformat::format(
                &query.sql,
                &sqlformat::QueryParams::None,
                sqlformat::FormatOptions::default(),
            );
            println!("{pretty}\n");
            println!("{}", serde_json::to_string_pretty(&params_json(&query.params)?)?);
        }
        Command::Query {
            configuration,
            destination,
            sql,
            params,
        } => {
            let mut state = load_state(&configuration)?;
            let connection = state.registry.conn(destination.as_deref())?;
            let rows = connection.rows(&sql, parse_params(&params)?)?;
            let rows = rows.iter().map(row_json).collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            tracing::info!(
                rows_affected = connection.row_count(),
                elapsed = ?connection.last_exec_time(),
                "done"
            );
            state.update_metrics();
            state.registry.reset()?;
        }
        Command::Health {
            configuration,
            destination,
        } => {
            let mut state = load_state(&configuration)?;
            health::health_check(state.registry.conn(destination.as_deref())?)?;
            state.update_metrics();
            println!("ok");
            state.registry.reset()?;
        }
        Command::Initialize { out_dir } => {
            querygate_configuration::write_parsed_configuration(
                &ParsedConfiguration::initial(),
                &out_dir,
            )?;
        }
        Command::Schema => {
            let schema = querygate_configuration::generate_latest_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

fn load_state(configuration_dir: &Path) -> anyhow::Result<state::State> {
    let parsed = querygate_configuration::parse_configuration(configuration_dir)?;
    let configuration =
        querygate_configuration::make_runtime_configuration(parsed, ProcessEnvironment)?;
    let mut metrics_registry = prometheus::Registry::new();
    Ok(state::create_state(configuration, &mut metrics_registry)?)
}

fn parse_params(json: &str) -> anyhow::Result<Params> {
    Ok(Params::from_json(serde_json::from_str(json)?)?)
}

fn params_json(params: &BoundParams) -> serde_json::Result<serde_json::Value> {
    match params {
        BoundParams::Positional(values) => serde_json::to_value(values),
        BoundParams::Named(values) => values
            .iter()
            .map(|(key, value)| Ok((key.clone(), serde_json::to_value(value)?)))
            .collect::<serde_json::Result<serde_json::Map<_, _>>>()
            .map(serde_json::Value::Object),
    }
}

fn row_json(row: &Row) -> serde_json::Result<serde_json::Value> {
    row.iter()
        .map(|(column, value): (&String, &Value)| Ok((column.clone(), serde_json::to_value(value)?)))
        .collect::<serde_json::Result<serde_json::Map<_, _>>>()
        .map(serde_json::Value::Object)
}
