// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: step ranges, caps, roster
//! uniqueness and routing keys.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::FieldcaseConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &FieldcaseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let workflow = &config.workflow;
    if workflow.first_evidence_step == 0 {
        errors.push(ConfigError::validation(
            "workflow.first_evidence_step must be at least 1",
        ));
    }
    if workflow.first_evidence_step > workflow.last_evidence_step {
        errors.push(ConfigError::validation(format!(
            "workflow.first_evidence_step ({}) must not exceed workflow.last_evidence_step ({})",
            workflow.first_evidence_step, workflow.last_evidence_step
        )));
    }
    if workflow.max_media_per_attempt == 0 {
        errors.push(ConfigError::validation(
            "workflow.max_media_per_attempt must be at least 1",
        ));
    }

    let mut seen_steps = HashSet::new();
    for step in &workflow.steps {
        if !workflow.is_evidence_step(step.number) {
            errors.push(ConfigError::validation(format!(
                "workflow.steps entry {} is outside the evidence range {}..={}",
                step.number, workflow.first_evidence_step, workflow.last_evidence_step
            )));
        }
        if !seen_steps.insert(step.number) {
            errors.push(ConfigError::validation(format!(
                "duplicate step number {} in [[workflow.steps]]",
                step.number
            )));
        }
    }

    let mut seen_technicians = HashSet::new();
    for name in &workflow.technicians {
        if name.trim().is_empty() {
            errors.push(ConfigError::validation(
                "workflow.technicians must not contain empty names",
            ));
        } else if !seen_technicians.insert(name.trim()) {
            errors.push(ConfigError::validation(format!(
                "duplicate technician `{name}` in workflow.technicians"
            )));
        }
    }

    if workflow.service_types.iter().any(|s| s.trim().is_empty()) {
        errors.push(ConfigError::validation(
            "workflow.service_types must not contain empty names",
        ));
    }

    for key in config.routing.chats.keys() {
        if key.trim().parse::<i64>().is_err() {
            errors.push(ConfigError::validation(format!(
                "routing.chats key `{key}` is not a chat id"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatRouteConfig, StepDefinition};

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors.iter().any(|e| match e {
            ConfigError::Validation { message } => message.contains(needle),
            _ => false,
        })
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&FieldcaseConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FieldcaseConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn inverted_range_and_zero_cap_are_both_reported() {
        let mut config = FieldcaseConfig::default();
        config.workflow.first_evidence_step = 20;
        config.workflow.max_media_per_attempt = 0;
        config.workflow.steps.clear();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "must not exceed"));
        assert!(has_message(&errors, "max_media_per_attempt"));
    }

    #[test]
    fn step_outside_range_and_duplicates_fail() {
        let mut config = FieldcaseConfig::default();
        config.workflow.steps.push(StepDefinition {
            number: 16,
            title: "EXTRA".into(),
            instructions: "x".into(),
        });
        config.workflow.steps.push(StepDefinition {
            number: 5,
            title: "AGAIN".into(),
            instructions: "x".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "outside the evidence range"));
        assert!(has_message(&errors, "duplicate step number 5"));
    }

    #[test]
    fn duplicate_technicians_fail() {
        let mut config = FieldcaseConfig::default();
        config.workflow.technicians = vec!["ANA ROJAS".into(), "ANA ROJAS".into()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate technician"));
    }

    #[test]
    fn non_numeric_routing_key_fails() {
        let mut config = FieldcaseConfig::default();
        config
            .routing
            .chats
            .insert("ops-group".into(), ChatRouteConfig::default());
        config
            .routing
            .chats
            .insert("-100200".into(), ChatRouteConfig::default());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(has_message(&errors, "ops-group"));
    }
}
