use crate::dedup::DedupFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default dedup filter sizing for new sites.
pub const DEFAULT_FILTER_CAPACITY: usize = 50_000;
pub const DEFAULT_FILTER_FPP: f64 = 0.001;

/// Declarative description of one pipeline step: a plugin name plus its
/// options bag. Instantiated into a live plugin by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub name: String,
    #[serde(default)]
    pub opts: Map<String, Value>,
}

impl PluginDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            opts: Map::new(),
        }
    }

    pub fn with_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.opts.insert(key.into(), value);
        self
    }
}

/// Handle to the automation surface (tab/session) a site is bound to while
/// crawling. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHandle(pub u64);

/// One crawl target. The plugin list order is the execution order and must
/// not change mid-crawl; the dedup filter bitset persists with the site row.
#[derive(Debug, Clone)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub seed_url: String,
    pub plugins: Vec<PluginDefinition>,
    pub filter: DedupFilter,
    pub resource_count: u64,
    pub page: Option<PageHandle>,
}

impl Site {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        seed_url: impl Into<String>,
        plugins: Vec<PluginDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            seed_url: seed_url.into(),
            plugins,
            filter: DedupFilter::create(DEFAULT_FILTER_CAPACITY, DEFAULT_FILTER_FPP, None),
            resource_count: 0,
            page: None,
        }
    }

    /// Serializable view passed to page-bound plugins over the automation
    /// round trip. The filter bitset stays on this side.
    pub fn remote_state(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "seedUrl": self.seed_url,
            "resourceCount": self.resource_count,
        })
    }
}
