// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route resolver built once from the routing configuration.

use std::collections::HashMap;

use fieldcase_config::model::RoutingConfig;
use fieldcase_core::types::{ChatId, Routes};
use fieldcase_core::{FieldcaseError, RouteResolver};

/// Immutable origin-chat to destination table.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteResolver {
    routes: HashMap<ChatId, Routes>,
}

impl StaticRouteResolver {
    pub fn from_config(config: &RoutingConfig) -> Result<Self, FieldcaseError> {
        let mut routes = HashMap::with_capacity(config.chats.len());
        for (origin, destinations) in &config.chats {
            let origin: i64 = origin.trim().parse().map_err(|_| {
                FieldcaseError::Config(format!("routing key `{origin}` is not a chat id"))
            })?;
            routes.insert(
                ChatId(origin),
                Routes {
                    evidence_chat: destinations.evidence.map(ChatId),
                    summary_chat: destinations.summary.map(ChatId),
                },
            );
        }
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteResolver for StaticRouteResolver {
    fn resolve(&self, origin: ChatId) -> Routes {
        self.routes.get(&origin).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcase_config::model::ChatRouteConfig;

    #[test]
    fn unknown_origin_has_no_destinations() {
        let mut config = RoutingConfig::default();
        config.chats.insert(
            "-1001".into(),
            ChatRouteConfig {
                evidence: Some(-2002),
                summary: None,
            },
        );
        let resolver = StaticRouteResolver::from_config(&config).unwrap();
        assert_eq!(
            resolver.resolve(ChatId(-1001)),
            Routes {
                evidence_chat: Some(ChatId(-2002)),
                summary_chat: None,
            }
        );
        assert_eq!(resolver.resolve(ChatId(5)), Routes::default());
    }

    #[test]
    fn non_numeric_origin_is_a_config_error() {
        let mut config = RoutingConfig::default();
        config.chats.insert("ops".into(), Default::default());
        let err = StaticRouteResolver::from_config(&config).unwrap_err();
        assert!(matches!(err, FieldcaseError::Config(_)));
    }
}
