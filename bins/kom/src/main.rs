mod config;
mod db;
mod error;

use clap::{Parser, Subcommand};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "kom", about = "InvenTree parts as SQLite virtual tables")]
struct Cli {
    /// Path to the SQLite database.
    #[arg(long, default_value = "kom.db", env = "KOM_DB")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one SQL statement and print its rows tab separated.
    Query {
        /// Print column names first.
        #[arg(long)]
        header: bool,
        sql: String,
    },
    /// Run a batch of SQL statements, e.g. a `CREATE VIRTUAL TABLE` script.
    Exec { sql: String },
    /// Manage the settings table a plugin reads its credentials from.
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Copy keys from a TOML file into the settings table.
    Import {
        /// Settings table name.
        #[arg(long, default_value = "kom_settings", env = "KOM_SETTINGS_TABLE")]
        table: String,
        /// TOML file with one `key = value` per setting.
        file: String,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut conn = db::open(&cli.db)?;

    match cli.command {
        Command::Query { header, sql } => {
            let mut out = std::io::stdout().lock();
            let rows = db::run_query(&conn, &sql, header, &mut out)?;
            tracing::debug!(rows, "query finished");
        }
        Command::Exec { sql } => {
            conn.execute_batch(&sql)?;
            tracing::info!(db = %cli.db, "statements executed");
        }
        Command::Settings {
            command: SettingsCommand::Import { table, file },
        } => {
            let entries = config::SettingsFile::load(&file)?.entries()?;
            let count = db::import_settings(&mut conn, &table, &entries)?;
            tracing::info!(%table, count, "settings imported");
        }
    }
    Ok(())
}

// Plain `main`: each virtual table drives its plugin on its own runtime, which
// cannot be nested inside another one.
fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "kom failed");
        std::process::exit(1);
    }
}
