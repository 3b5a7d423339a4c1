//! Command-line front end for materializing and inspecting string tables.

use std::io::{
    self,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use clap::{
    Parser,
    Subcommand,
};
use dynamic_localization::selector::TableHandle;
use dynamic_localization::{
    LocalizationError,
    LocalizationManager,
};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dynamic-l10n")]
#[command(version)]
#[command(about = "Materialize translation payloads into per-locale string tables")]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Operation to run
    #[command(subcommand)]
    command: Commands,

    /// Workspace holding `.dynamic-l10n.json`; relative paths resolve against it
    #[arg(long, short, value_name = "DIR", default_value = ".", global = true)]
    workspace: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a payload and write its tables
    Ingest {
        /// Payload JSON file, `-` for stdin
        #[arg(value_name = "PAYLOAD")]
        payload: PathBuf,

        /// Table to write; defaults to the configured table name
        #[arg(long, short)]
        table: Option<String>,
    },

    /// Delete the whole storage root
    Clean,

    /// Delete one table from every locale
    RemoveTable {
        /// Table name without extension
        #[arg(value_name = "TABLE")]
        table: String,
    },

    /// Show where lookups for a locale would read from
    Select {
        /// Locale identifier such as `de` or `en-US`
        #[arg(value_name = "LOCALE")]
        locale: String,

        /// Table name; defaults to the configured table name
        #[arg(long, short)]
        table: Option<String>,
    },

    /// Print the display text of keys for a locale
    Lookup {
        /// Locale identifier such as `de` or `en-US`
        #[arg(value_name = "LOCALE")]
        locale: String,

        /// Table name; defaults to the configured table name
        #[arg(long, short)]
        table: Option<String>,

        /// Keys to look up
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
    },
}

/// CLI failure
#[derive(Error, Debug)]
enum CliError {
    /// Library operation failed
    #[error(transparent)]
    Localization(#[from] LocalizationError),

    /// Payload file or stdin unreadable
    #[error("Failed to read payload {}: {source}", path.display())]
    ReadPayload {
        /// Payload path as given
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Writing to stdout failed
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());

    let mut stdout = io::stdout().lock();
    match run(cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "Command failed");
            let _ = writeln!(io::stderr().lock(), "error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` で出力レベルを制御する（既定は info）
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = log_file {
        let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = path.file_name().map_or_else(|| "dynamic-l10n.log".into(), ToOwned::to_owned);
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false).with_writer(writer).init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
        None
    }
}

/// サブコマンドを実行して結果を `out` に書く
fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    let mut manager = LocalizationManager::from_workspace(&cli.workspace)?;

    match cli.command {
        Commands::Ingest { payload, table } => {
            let json = read_payload(&payload)?;
            let table = table.unwrap_or_else(|| manager.table_name().to_string());
            for path in manager.create_localized_files(&json, &table)? {
                writeln!(out, "{}", path.display())?;
            }
        }
        Commands::Clean => {
            manager.clean()?;
            writeln!(out, "removed {}", manager.store().root().display())?;
        }
        Commands::RemoveTable { table } => {
            let removed = manager.remove_table(&table)?;
            writeln!(out, "removed {removed} file(s)")?;
        }
        Commands::Select { locale, table } => {
            if let Some(table) = table {
                manager.set_table_name(table);
            }
            manager.set_current_bundle(&locale);
            let kind = match manager.current_bundle() {
                TableHandle::Custom { .. } => "custom",
                TableHandle::Localized { .. } => "localized",
                TableHandle::Primary { .. } => "primary",
            };
            writeln!(out, "{kind}\t{}", manager.current_bundle().dir().display())?;
        }
        Commands::Lookup { locale, table, keys } => {
            if let Some(table) = table {
                manager.set_table_name(table);
            }
            manager.set_current_bundle(&locale);
            for key in keys {
                writeln!(out, "{key}\t{}", manager.localized_string(&key))?;
            }
        }
    }

    Ok(())
}

/// ペイロードを読み込む（`-` は標準入力）
fn read_payload(path: &Path) -> Result<String, CliError> {
    let result = if path == Path::new("-") {
        io::read_to_string(io::stdin())
    } else {
        std::fs::read_to_string(path)
    };
    result.map_err(|source| CliError::ReadPayload { path: path.to_path_buf(), source })
}
