use std::sync::Arc;

use clap::Parser;
use querysmith_cli::commands::{cli, discover, map, query};
use querysmith_core::api::{AppConfig, AppContext, CliError, ErrorKind, LoggingConfig};
use querysmith_core::config::{apply_env_overrides, load_default, load_from};
use querysmith_plugins::services::PluginServicesFactory;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(target: "querysmith.cli", kind = e.kind().as_str(), error = %e);
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = load_config(&args)?;
    init_tracing(&cfg.logging).map_err(CliError::Config)?;

    let ctx = AppContext::new(cfg, Some(Arc::new(PluginServicesFactory)));
    dispatch(args, ctx).await
}

fn load_config(args: &cli::Args) -> Result<AppConfig, CliError> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => {
            let mut cfg =
                load_from(std::path::Path::new(path)).map_err(|e| CliError::Config(e.to_string()))?;
            apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
            cfg
        }
        None => load_default().map_err(|e| CliError::Config(e.to_string()))?,
    };

    // Command-line flags win over files and environment.
    if let Some(model) = &args.model {
        cfg.generation.model = model.clone();
    }
    if let Some(url) = &args.source_url {
        cfg.source.base_url = url.clone();
    }
    if let Some(key) = &args.source_api_key {
        cfg.source.api_key = key.clone();
    }
    Ok(cfg)
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 11: config error
    // 12: invalid input or arguments
    // 20: io error
    // 30: schema discovery or context error
    // 31: generation error
    // 32: execution rejected by the data source
    // 40: plan rejected by validation (returned as a normal exit code, not as an error)
    // 50: internal/uncategorized
    if let CliError::Io(_) = e {
        return 20;
    }
    match e.kind() {
        ErrorKind::Config => 11,
        ErrorKind::Input => 12,
        ErrorKind::Schema => 30,
        ErrorKind::Generation => 31,
        ErrorKind::Execution => 32,
        ErrorKind::Internal => 50,
    }
}

async fn dispatch(args: cli::Args, ctx: AppContext) -> Result<i32, CliError> {
    let pretty = args.pretty;
    match args.command {
        cli::Commands::Query(query_args) => query::handle_query(query_args, pretty, &ctx).await,
        cli::Commands::Map(map_args) => map::handle_map(map_args, pretty, &ctx).await,
        cli::Commands::Discover(discover_args) => {
            discover::handle_discover(discover_args, pretty, &ctx).await
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("querysmith"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("querysmith.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    // stdout carries the JSON result; logs always go to stderr.
    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
