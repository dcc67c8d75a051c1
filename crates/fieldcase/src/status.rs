// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldcase status` command implementation.
//!
//! Reads the database directly and prints case counts per status plus the
//! most recent cases. `--json` emits the same data for scripting.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use fieldcase_config::FieldcaseConfig;
use fieldcase_core::types::{Case, CaseStatus};
use fieldcase_core::{FieldcaseError, StorageAdapter};
use fieldcase_storage::queries::cases;
use fieldcase_storage::{Database, SqliteStorage};
use serde::Serialize;

/// One line of the recent-cases listing.
#[derive(Debug, Serialize)]
pub struct CaseLine {
    pub id: i64,
    pub chat_id: i64,
    pub technician_id: i64,
    pub technician: Option<String>,
    pub status: String,
    pub phase: String,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl From<&Case> for CaseLine {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id.0,
            chat_id: case.chat_id.0,
            technician_id: case.technician_id.0,
            technician: case.technician_name.clone(),
            status: case.status.to_string(),
            phase: case.phase.to_string(),
            created_at: case.created_at.clone(),
            finished_at: case.finished_at.clone(),
        }
    }
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub counts: BTreeMap<String, i64>,
    pub recent: Vec<CaseLine>,
}

impl StatusResponse {
    fn count(&self, status: CaseStatus) -> i64 {
        self.counts.get(&status.to_string()).copied().unwrap_or(0)
    }
}

/// Gather counts and the `limit` most recent cases.
pub async fn collect_status(
    db: &Database,
    database_path: &str,
    limit: usize,
) -> Result<StatusResponse, FieldcaseError> {
    let (counts, recent) = db
        .read(move |conn| {
            let counts = cases::count_by_status(conn)?;
            let recent = cases::list_cases(conn, None, limit)?;
            Ok((counts, recent))
        })
        .await?;
    Ok(StatusResponse {
        database_path: database_path.to_string(),
        counts: counts.into_iter().collect(),
        recent: recent.iter().map(CaseLine::from).collect(),
    })
}

/// Run the `fieldcase status` command.
///
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &FieldcaseConfig,
    json: bool,
    plain: bool,
    limit: usize,
) -> Result<(), FieldcaseError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let response = collect_status(&storage.database()?, &config.storage.database_path, limit).await;
    storage.close().await?;
    let response = response?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&response, use_color);
    }
    Ok(())
}

fn print_status(response: &StatusResponse, use_color: bool) {
    println!();
    println!("  fieldcase status");
    println!("  {}", "-".repeat(35));
    println!("    Database: {}", response.database_path);

    let (open, closed, cancelled) = (
        response.count(CaseStatus::Open),
        response.count(CaseStatus::Closed),
        response.count(CaseStatus::Cancelled),
    );
    if use_color {
        use colored::Colorize;
        println!(
            "    Cases:    {} open, {} closed, {} cancelled",
            open.to_string().yellow(),
            closed.to_string().green(),
            cancelled.to_string().dimmed()
        );
    } else {
        println!("    Cases:    {open} open, {closed} closed, {cancelled} cancelled");
    }

    if response.recent.is_empty() {
        println!();
        println!("  No cases yet.");
        println!();
        return;
    }

    println!();
    for line in &response.recent {
        let technician = line.technician.as_deref().unwrap_or("-");
        let row = format!(
            "    #{:<5} chat {:<12} {:<10} {:<22} {}",
            line.id, line.chat_id, line.status, line.phase, technician
        );
        if use_color && line.status == CaseStatus::Open.to_string() {
            use colored::Colorize;
            println!("{}", row.yellow());
        } else {
            println!("{row}");
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcase_config::model::StorageConfig;
    use fieldcase_core::types::{ActorId, ChatId, Phase, now_utc};

    #[tokio::test]
    async fn collects_counts_and_recent_cases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.db").display().to_string();
        let storage = SqliteStorage::new(StorageConfig {
            database_path: path.clone(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        let db = storage.database().unwrap();
        db.transact(|conn| {
            let (chat, now) = (ChatId(-1), now_utc());
            cases::insert_case(conn, chat, ActorId(1), None, Phase::WaitTechnician, &now)?;
            cases::insert_case(conn, chat, ActorId(2), Some("bo"), Phase::WaitService, &now)?;
            Ok(())
        })
        .await
        .unwrap();

        let response = collect_status(&db, &path, 1).await.unwrap();
        assert_eq!(response.count(CaseStatus::Open), 2);
        assert_eq!(response.count(CaseStatus::Closed), 0);
        assert_eq!(response.recent.len(), 1);
        assert_eq!(response.recent[0].technician_id, 2);
        assert_eq!(response.recent[0].phase, "WAIT_SERVICE");
    }

    #[test]
    fn status_response_serializes() {
        let response = StatusResponse {
            database_path: "/tmp/fc.db".to_string(),
            counts: BTreeMap::from([("OPEN".to_string(), 3)]),
            recent: Vec::new(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"OPEN\":3"));
        assert!(json.contains("\"recent\":[]"));
    }
}
