use crate::error::{EngineError, Result};
use crate::navigation::DynamicNavPlugin;
use crate::plugin::Plugin;
use crate::plugins::{ExtractPlugin, FetchPlugin, InsertPlugin, SelectPlugin, UpsertPlugin};
use crate::site::PluginDefinition;
use std::collections::BTreeMap;

type PluginFactory = Box<dyn Fn(&PluginDefinition) -> Result<Box<dyn Plugin>> + Send + Sync>;

/// Maps plugin names to constructors. Pipelines are instantiated from the
/// site's stored plugin list through this registry, so an unknown name is
/// caught before the crawl starts rather than mid-run.
pub struct PluginRegistry {
    factories: BTreeMap<&'static str, PluginFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in plugin.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("select", |def| {
            Ok(Box::new(SelectPlugin::from_opts(&def.opts)))
        });
        registry.register("fetch", |def| {
            Ok(Box::new(FetchPlugin::from_opts(&def.opts)?))
        });
        registry.register("extract", |def| {
            Ok(Box::new(ExtractPlugin::from_opts(&def.opts)))
        });
        registry.register("insert", |def| {
            Ok(Box::new(InsertPlugin::from_opts(&def.opts)))
        });
        registry.register("upsert", |_def| Ok(Box::new(UpsertPlugin)));
        registry.register("dynamic-nav", |def| {
            Ok(Box::new(DynamicNavPlugin::from_opts(&def.opts)))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(&PluginDefinition) -> Result<Box<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(name, Box::new(factory));
    }

    /// Instantiate a plugin from its stored definition.
    pub fn resolve(&self, def: &PluginDefinition) -> Result<Box<dyn Plugin>> {
        let factory = self
            .factories
            .get(def.name.as_str())
            .ok_or_else(|| EngineError::UnknownPlugin(def.name.clone()))?;
        factory(def)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
