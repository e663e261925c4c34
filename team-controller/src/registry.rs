//! Connector registry - maps resource kinds to their connectors.

use std::collections::HashMap;
use std::sync::Arc;
use team_provider::credentials::UsageTracker;
use team_provider::ResourceKind;

use crate::connector::ExternalConnector;
use crate::connectors::github::config::ClientResolver;
use crate::connectors::github::TeamConnector;

/// Connectors available to the controller, one per resource kind.
#[derive(Clone, Default)]
pub struct Registry {
    connectors: HashMap<ResourceKind, Arc<dyn ExternalConnector>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connector under its kind, replacing any previous one.
    pub fn register(&mut self, connector: Arc<dyn ExternalConnector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    pub fn get(&self, kind: ResourceKind) -> Option<Arc<dyn ExternalConnector>> {
        self.connectors.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = self.connectors.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

/// Registry with every connector this provider ships: GitHub teams.
pub fn github_registry(resolver: Arc<dyn ClientResolver>, usage: Arc<dyn UsageTracker>) -> Registry {
    let mut registry = Registry::new();
    registry.register(Arc::new(TeamConnector::new(resolver, usage)));
    registry
}
