// SPDX-FileCopyrightText: 2026 Subarchive Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subarchive - archives broadcast channels into a paginated store.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod handlers;
mod list;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use subarchive_config::model::SubarchiveConfig;

/// Subarchive - archives broadcast channels into a paginated store.
#[derive(Parser, Debug)]
#[command(name = "subarchive", version, about, long_about = None)]
struct Cli {
    /// Load this configuration file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `log.level` (ignored when RUST_LOG is set).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync every configured channel and serve the read API.
    Serve,
    /// Print one archive page as JSON.
    List {
        /// Cursor from a previous page; 0 starts from the newest record.
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Page size; absent or non-positive uses the configured default.
        #[arg(long)]
        number: Option<i64>,
    },
    /// Resolve the configured channel names and print the handles.
    Resolve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => subarchive_config::load_and_validate_path(path),
        None => subarchive_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            subarchive_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }

    init_tracing(&config);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::List { offset, number } => list::run_list(&config, offset, number).await,
        Commands::Resolve => list::run_resolve(&config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "subarchive exited with an error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Crates whose logs follow `log.level`; everything else stays at warn.
const LOG_TARGETS: [&str; 8] = [
    "subarchive",
    "subarchive_core",
    "subarchive_config",
    "subarchive_feed",
    "subarchive_sync",
    "subarchive_storage",
    "subarchive_gateway",
    "subarchive_prometheus",
];

fn filter_directives(level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Logs go to stderr so `list` and `resolve` keep stdout machine-readable.
fn init_tracing(config: &SubarchiveConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.log.level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn directives_cover_every_crate() {
        let directives = filter_directives("debug");
        assert!(directives.starts_with("subarchive=debug,"));
        assert!(directives.contains("subarchive_sync=debug"));
        assert!(directives.ends_with(",warn"));
        assert!(tracing_subscriber::EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn cli_parses_list_flags() {
        let cli = Cli::parse_from([
            "subarchive",
            "--config",
            "/tmp/a.toml",
            "list",
            "--offset",
            "42",
            "--number",
            "5",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
        match cli.command {
            Commands::List { offset, number } => {
                assert_eq!(offset, 42);
                assert_eq!(number, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["subarchive", "serve", "--log-level", "trace"]);
        assert!(matches!(cli.command, Commands::Serve));
        assert_eq!(cli.log_level.as_deref(), Some("trace"));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = subarchive_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.storage.namespace, "z_subs_index_v3");
    }
}
