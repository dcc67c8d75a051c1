// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fieldcase workflow.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use fieldcase_core::types::StepInfo;
use serde::{Deserialize, Serialize};

/// Top-level Fieldcase configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldcaseConfig {
    /// Bot identity and logging.
    #[serde(default)]
    pub bot: BotConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Step sequence, caps and form choices.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Destination chats for evidence copies and close summaries.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Display name used in logs and the shell banner.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bot_name() -> String {
    "fieldcase".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("fieldcase").join("fieldcase.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("fieldcase.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Step sequence and form configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowConfig {
    /// First evidence step; form fields occupy the steps before it.
    #[serde(default = "default_first_evidence_step")]
    pub first_evidence_step: u32,

    /// Last evidence step; approving it closes the case.
    #[serde(default = "default_last_evidence_step")]
    pub last_evidence_step: u32,

    /// Maximum number of items per attempt.
    #[serde(default = "default_max_media_per_attempt")]
    pub max_media_per_attempt: usize,

    /// Accepted technician names. Empty accepts any non-empty name.
    #[serde(default)]
    pub technicians: Vec<String>,

    /// Accepted service types.
    #[serde(default = "default_service_types")]
    pub service_types: Vec<String>,

    /// Titles and instructions per evidence step.
    #[serde(default = "default_steps")]
    pub steps: Vec<StepDefinition>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            first_evidence_step: default_first_evidence_step(),
            last_evidence_step: default_last_evidence_step(),
            max_media_per_attempt: default_max_media_per_attempt(),
            technicians: Vec::new(),
            service_types: default_service_types(),
            steps: default_steps(),
        }
    }
}

impl WorkflowConfig {
    /// Display data for an evidence step, with a generic fallback for steps
    /// that have no definition.
    pub fn step_info(&self, number: u32) -> StepInfo {
        match self.steps.iter().find(|s| s.number == number) {
            Some(def) => StepInfo {
                number,
                title: def.title.clone(),
                instructions: def.instructions.clone(),
            },
            None => StepInfo {
                number,
                title: format!("STEP {number}"),
                instructions: "Send the evidence for this step".to_string(),
            },
        }
    }

    /// Whether `number` is inside the evidence range.
    pub fn is_evidence_step(&self, number: u32) -> bool {
        (self.first_evidence_step..=self.last_evidence_step).contains(&number)
    }
}

fn default_first_evidence_step() -> u32 {
    5
}

fn default_last_evidence_step() -> u32 {
    15
}

fn default_max_media_per_attempt() -> usize {
    8
}

fn default_service_types() -> Vec<String> {
    ["NEW INSTALLATION", "POST-SALE", "FAULT REPAIR"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_steps() -> Vec<StepDefinition> {
    [
        (
            5,
            "STEP 5 - FACADE",
            "Photo of the facade showing the street number or power meter",
        ),
        (6, "STEP 6 - CTO", "Wide photo of the labelled CTO or FAT"),
        (
            7,
            "STEP 7 - POWER AT CTO",
            "Photo of the power reading on the port in use",
        ),
        (
            8,
            "STEP 8 - LABELLED SEAL",
            "Photo of the cable tie labelled with the customer ID and port number",
        ),
        (
            9,
            "STEP 9 - DROP SPAN",
            "Photo of the drop span entering the premises",
        ),
        (
            10,
            "STEP 10 - ANCHORING",
            "Photo of the drop fibre anchoring point at the premises",
        ),
        (
            11,
            "STEP 11 - ROSETTE + POWER",
            "Photo of the open rosette and its power reading",
        ),
        (
            12,
            "STEP 12 - ONT MAC",
            "Photo of the ONT MAC label and any other equipment used",
        ),
        (13, "STEP 13 - ONT", "Wide photo of the working ONT"),
        (
            14,
            "STEP 14 - SPEED TEST",
            "Screenshot of the speed test with ID and date clearly visible",
        ),
        (
            15,
            "STEP 15 - INSTALLATION RECORD",
            "Photo of the completed installation record signed by the customer",
        ),
    ]
    .into_iter()
    .map(|(number, title, instructions)| StepDefinition {
        number,
        title: title.to_string(),
        instructions: instructions.to_string(),
    })
    .collect()
}

/// Title and instructions shown for one evidence step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StepDefinition {
    pub number: u32,
    pub title: String,
    pub instructions: String,
}

/// Routing table keyed by origin chat id.
///
/// Keys are strings because TOML table keys are; validation checks that
/// each one parses as a chat id.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    #[serde(default)]
    pub chats: BTreeMap<String, ChatRouteConfig>,
}

/// Destinations for one origin chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRouteConfig {
    /// Chat that receives a captioned copy of every evidence item.
    #[serde(default)]
    pub evidence: Option<i64>,

    /// Chat that receives the close summary.
    #[serde(default)]
    pub summary: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_evidence_step() {
        let workflow = WorkflowConfig::default();
        for n in workflow.first_evidence_step..=workflow.last_evidence_step {
            assert!(workflow.steps.iter().any(|s| s.number == n), "step {n}");
        }
        assert_eq!(workflow.max_media_per_attempt, 8);
    }

    #[test]
    fn step_info_falls_back_for_unknown_step() {
        let workflow = WorkflowConfig {
            steps: Vec::new(),
            ..WorkflowConfig::default()
        };
        let info = workflow.step_info(9);
        assert_eq!(info.title, "STEP 9");
    }

    #[test]
    fn routing_tables_deserialize() {
        let toml_str = r#"
[routing.chats."-1001"]
evidence = -2002
summary = -3003

[routing.chats."-1009"]
summary = -3003
"#;
        let config: FieldcaseConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.routing.chats.len(), 2);
        assert_eq!(config.routing.chats["-1001"].evidence, Some(-2002));
        assert_eq!(config.routing.chats["-1009"].evidence, None);
    }

    #[test]
    fn step_definitions_deny_unknown_fields() {
        let toml_str = r#"
[[workflow.steps]]
number = 5
title = "FACADE"
instructions = "photo"
hint = "bad"
"#;
        assert!(toml::from_str::<FieldcaseConfig>(toml_str).is_err());
    }
}
