//! Site crawl engine: a per-site crawl loop driving an ordered plugin
//! pipeline, with probabilistic URL dedup and click-driven discovery of
//! dynamic single-page-application content.
//!
//! The engine owns the crawl semantics; persistence and page automation are
//! external collaborators behind the [`store::ResourceStore`] and
//! [`automation::PageAutomation`] traits.

pub mod automation;
pub mod crawl;
pub mod dedup;
pub mod error;
pub mod navigation;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod resource;
pub mod site;
pub mod store;
pub mod testing;

pub use automation::{NullAutomation, PageAutomation};
pub use crawl::crawl_site;
pub use dedup::DedupFilter;
pub use error::{EngineError, Result};
pub use pipeline::Pipeline;
pub use plugin::{CrawlContext, OptSpec, Plugin};
pub use registry::PluginRegistry;
pub use resource::{Resource, ResourcePatch};
pub use site::{PageHandle, PluginDefinition, Site};
pub use store::ResourceStore;
