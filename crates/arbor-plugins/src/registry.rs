//! Plugin loading by name

use std::collections::BTreeMap;

use thiserror::Error;

use crate::builtin::{E2E_APP_LINK, E2eAppLinkProcessor};
use crate::plugin::Plugin;

#[derive(Debug, Error, PartialEq)]
pub enum PluginError {
    #[error("unknown plugin '{0}'")]
    Unknown(String),
}

/// Resolves the configured plugin names into plugin objects, in order.
pub trait PluginLoader: Send + Sync {
    fn load(&self, names: &[String]) -> Result<Vec<Plugin>, PluginError>;
}

type PluginFactory = Box<dyn Fn() -> Plugin + Send + Sync>;

/// Name -> factory table.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(E2E_APP_LINK, || Plugin::new(E2E_APP_LINK, E2eAppLinkProcessor));
        registry
    }

    /// Register or replace a factory.
    pub fn register(&mut self, name: impl Into<String>, factory: impl Fn() -> Plugin + Send + Sync + 'static) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl PluginLoader for PluginRegistry {
    fn load(&self, names: &[String]) -> Result<Vec<Plugin>, PluginError> {
        names
            .iter()
            .map(|name| {
                self.factories
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| PluginError::Unknown(name.clone()))
            })
            .collect()
    }
}
