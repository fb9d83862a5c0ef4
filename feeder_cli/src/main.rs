#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Feeder scale command line: runs one engine operation per invocation
//! against the configured store.

mod cli;
mod commands;
mod error_fmt;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use feeder_config::Config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "command failed");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;

    let engine = commands::build_engine(&cfg).wrap_err("building engine")?;
    commands::apply_feature_overrides(&engine, &cli.features)?;
    commands::run(&engine, cli.cmd, cli.json)
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            feeder_config::load_toml(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console logs go to stderr so command output on stdout stays parseable.
/// `[logging].file` adds a JSON-lines file sink with the configured rotation.
fn init_tracing(cli: &Cli, logging: &feeder_config::Logging) -> eyre::Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::new(spec),
        _ => {
            let level = cli
                .log_level
                .as_deref()
                .or(logging.level.as_deref())
                .unwrap_or("info");
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };

    let pretty = (!cli.json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));
    let json = cli
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create log directory {}", dir.display()))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .wrap_err("initialize logging")
}
