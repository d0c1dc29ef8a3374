//! mssql-script-backup CLI - Dependency-ordered SQL Server script export.

use clap::error::ErrorKind;
use clap::Parser;
use mssql_script_backup::catalog::trusted_connection_string;
use mssql_script_backup::error::EXIT_ARGUMENT_ERROR;
use mssql_script_backup::{
    run_backup, BackupConfig, BackupError, DataPolicy, ExportKind, MssqlConnector, SchemaPolicy,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

/// Options that also accept the legacy `-name:value` form.
const LEGACY_VALUE_OPTIONS: [&str; 5] = ["type", "server", "connection", "output", "dbs"];

#[derive(Parser, Debug)]
#[command(name = "mssql-script-backup")]
#[command(about = "Export SQL Server schema and data as dependency-ordered scripts")]
#[command(version)]
struct Cli {
    /// What to export: all, schema or data [default: all]
    #[arg(long = "type", value_name = "KIND")]
    kind: Option<ExportKind>,

    /// Server name, connected with a trusted connection
    #[arg(long, conflicts_with = "connection")]
    server: Option<String>,

    /// ADO.NET connection string
    #[arg(long)]
    connection: Option<String>,

    /// Output path template, e.g. "out/{1}/{3}/{2}.{5}.sql"
    #[arg(long, value_name = "TEMPLATE")]
    output: Option<String>,

    /// Comma-separated database names to export
    #[arg(long, value_name = "NAMES")]
    dbs: Option<String>,

    /// Comma-separated table names to export
    #[arg(long, value_name = "NAMES")]
    tables: Option<String>,

    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Script objects in catalog order instead of dependency order
    #[arg(long)]
    no_dependencies: bool,

    /// Suppress progress output and the error prompt
    #[arg(long)]
    silent: bool,

    /// Output JSON summaries to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_legacy_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_ARGUMENT_ERROR),
            };
        }
    };

    let silent = cli.silent;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.exit_code() == EXIT_ARGUMENT_ERROR => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!("{}", e.format_detailed());
            eprintln!("Sorry an error occurred");
            eprintln!("{}", e);
            if !silent {
                wait_for_key();
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), BackupError> {
    let verbosity = if cli.silent { "error" } else { cli.verbosity.as_str() };
    setup_logging(verbosity, &cli.log_format).map_err(BackupError::Config)?;

    let config = build_config(&cli)?;
    if cli.silent {
        println!("Running...");
    }

    let connector = Arc::new(MssqlConnector::new(
        config.connection.connection_string.clone(),
    ));
    let summaries = run_backup(&config, connector).await?;

    for summary in &summaries {
        if cli.output_json {
            println!("{}", summary.to_json()?);
        } else {
            println!("{}", summary.summary());
        }
    }
    Ok(())
}

/// Merge the configuration file with command-line overrides.
fn build_config(cli: &Cli) -> Result<BackupConfig, BackupError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            let schema = SchemaPolicy::default().with_partitions();
            BackupConfig {
                data: DataPolicy::from_schema(&schema),
                schema,
                ..BackupConfig::default()
            }
        }
    };

    if let Some(server) = &cli.server {
        config.connection.connection_string = trusted_connection_string(server);
    }
    if let Some(connection) = &cli.connection {
        config.connection.connection_string = connection.clone();
    }
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(kind) = cli.kind {
        config.kind = kind;
    }
    if let Some(dbs) = &cli.dbs {
        config.databases = split_list(dbs);
    }
    if let Some(tables) = &cli.tables {
        config.tables = split_list(tables);
    }
    if cli.no_dependencies {
        config.schema.enforce_dependencies = false;
        config.data.enforce_dependencies = false;
    }

    if config.connection.connection_string.trim().is_empty() {
        return Err(BackupError::Argument(
            "Either -server:<name> or -connection:<connection string> is required".to_string(),
        ));
    }
    if config.output.trim().is_empty() {
        return Err(BackupError::Argument(
            "-output:<template> is required".to_string(),
        ));
    }

    config.validate()?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<BackupConfig, BackupError> {
    BackupConfig::load(path).map_err(|e| match e {
        BackupError::Io(err) => {
            BackupError::Config(format!("cannot read {}: {}", path.display(), err))
        }
        other => other,
    })
}

/// Split a comma-separated list, dropping whitespace and empty entries.
fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Rewrite `-type:data`, `-server:X`, ..., `-silent` into long flags.
fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut out = Vec::new();
    for arg in args.into_iter().map(Into::into) {
        match arg.to_str().and_then(legacy_flag) {
            Some(flag) => out.extend(flag.into_iter().map(OsString::from)),
            None => out.push(arg),
        }
    }
    out
}

fn legacy_flag(arg: &str) -> Option<Vec<String>> {
    let body = arg.strip_prefix('-').filter(|b| !b.starts_with('-'))?;
    if body.eq_ignore_ascii_case("silent") {
        return Some(vec!["--silent".to_string()]);
    }
    let (name, value) = body.split_once(':')?;
    let name = name.to_ascii_lowercase();
    if !LEGACY_VALUE_OPTIONS.contains(&name.as_str()) {
        return None;
    }
    Some(vec![format!("--{}", name), value.to_string()])
}

fn wait_for_key() {
    println!("Press any key to continue");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
