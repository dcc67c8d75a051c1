// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fieldcase - evidence collection and review for field technicians.
//!
//! This is the binary entry point: database maintenance, reporting and a
//! console shell that drives the workflow without a chat transport.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod shell;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldcase_config::FieldcaseConfig;
use fieldcase_core::types::{ChatId, now_utc};
use fieldcase_core::{FieldcaseError, StorageAdapter};
use fieldcase_storage::SqliteStorage;
use fieldcase_storage::queries::chat_config;
use fieldcase_workflow::render::parse_switch;

/// Fieldcase - evidence collection and review for field technicians.
#[derive(Parser, Debug)]
#[command(name = "fieldcase", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or upgrade the database schema.
    Migrate,
    /// Show case counts and the most recent cases.
    Status {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
        /// Number of recent cases to list.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show or set whether a chat requires reviewer approval.
    Approval {
        /// Chat id, e.g. -1001.
        #[arg(allow_hyphen_values = true)]
        chat: i64,
        /// on/off (also 1/0, true/false, yes/no). Omit to show the setting.
        value: Option<String>,
    },
    /// Drive the workflow from an interactive console.
    Shell {
        /// Chat the console messages are sent to.
        #[arg(long, default_value_t = -1001, allow_hyphen_values = true)]
        chat: i64,
        /// Actor ids treated as administrators of the console chat.
        #[arg(long = "admin", default_values_t = [7])]
        admins: Vec<i64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => fieldcase_config::load_and_validate_path(path),
        None => fieldcase_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            fieldcase_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.bot.log_level);

    let result = match cli.command {
        Some(Commands::Migrate) => run_migrate(&config).await,
        Some(Commands::Status { json, plain, limit }) => {
            status::run_status(&config, json, plain, limit).await
        }
        Some(Commands::Approval { chat, value }) => {
            run_approval(&config, ChatId(chat), value.as_deref()).await
        }
        Some(Commands::Shell { chat, admins }) => {
            shell::run_shell(config, ChatId(chat), admins).await
        }
        None => {
            println!("fieldcase: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_migrate(config: &FieldcaseConfig) -> Result<(), FieldcaseError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    storage.close().await?;
    println!("database ready at {}", config.storage.database_path);
    Ok(())
}

async fn run_approval(
    config: &FieldcaseConfig,
    chat: ChatId,
    value: Option<&str>,
) -> Result<(), FieldcaseError> {
    let required = value
        .map(|v| {
            parse_switch(v).ok_or_else(|| {
                FieldcaseError::Validation(format!("expected on or off, got '{v}'"))
            })
        })
        .transpose()?;

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let db = storage.database()?;
    let current = match required {
        Some(required) => {
            let now = now_utc();
            db.transact(move |conn| {
                chat_config::set_approval_required(conn, chat, required, &now)?;
                Ok(required)
            })
            .await?
        }
        None => {
            db.read(move |conn| chat_config::approval_required(conn, chat))
                .await?
        }
    };
    storage.close().await?;

    let state = if current { "ON" } else { "OFF" };
    println!("approval for chat {chat}: {state}");
    Ok(())
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fieldcase={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
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
    fn binary_loads_config_defaults() {
        let config = fieldcase_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.bot.name, "fieldcase");
    }

    #[test]
    fn cli_parses_negative_chat_ids() {
        let cli = Cli::try_parse_from(["fieldcase", "approval", "-1001", "off"]).unwrap();
        match cli.command {
            Some(Commands::Approval { chat, value }) => {
                assert_eq!(chat, -1001);
                assert_eq!(value.as_deref(), Some("off"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn approval_setting_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = fieldcase_config::load_and_validate_str(&format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            dir.path().join("fc.db").display()
        ))
        .unwrap();
        let chat = ChatId(-5);
        run_approval(&config, chat, Some("off")).await.unwrap();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        let required = storage
            .database()
            .unwrap()
            .read(move |conn| chat_config::approval_required(conn, chat))
            .await
            .unwrap();
        assert!(!required);

        let err = run_approval(&config, chat, Some("maybe"))
            .await
            .unwrap_err();
        assert!(matches!(err, FieldcaseError::Validation(_)));
    }
}
