// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fieldcase.toml` > `~/.config/fieldcase/fieldcase.toml`
//! > `/etc/fieldcase/fieldcase.toml` with environment variable overrides via
//! the `FIELDCASE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::model::FieldcaseConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/fieldcase/fieldcase.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "fieldcase.toml";

/// Path of the per-user configuration file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fieldcase").join("fieldcase.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fieldcase/fieldcase.toml` (system-wide)
/// 3. `~/.config/fieldcase/fieldcase.toml` (user XDG config)
/// 4. `./fieldcase.toml` (local directory)
/// 5. `FIELDCASE_*` environment variables
pub fn load_config() -> Result<FieldcaseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// No file lookup and no environment overrides; used by tests.
pub fn load_config_from_str(toml_content: &str) -> Result<FieldcaseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FieldcaseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FieldcaseConfig, figment::Error> {
    debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(FieldcaseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FieldcaseConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `FIELDCASE_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `FIELDCASE_WORKFLOW_MAX_MEDIA_PER_ATTEMPT` must map to
/// `workflow.max_media_per_attempt`. Figment hands over the key with its
/// original case, so it is lowered first. Routing tables are file-only.
fn env_provider() -> Env {
    Env::prefixed("FIELDCASE_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("bot_", "bot.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("workflow_", "workflow.", 1);
        mapped.into()
    })
}
