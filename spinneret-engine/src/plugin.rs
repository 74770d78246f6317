use crate::automation::PageAutomation;
use crate::error::Result;
use crate::resource::{Resource, ResourcePatch};
use crate::site::Site;
use crate::store::ResourceStore;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Everything a plugin may touch during one crawl step: the owning site
/// (filter bitset and counter included) and the external collaborators.
pub struct CrawlContext<'a> {
    pub site: &'a mut Site,
    pub store: &'a dyn ResourceStore,
    pub automation: &'a dyn PageAutomation,
}

/// One configurable option a plugin recognizes. Consumed by the admin
/// collaborator to render configuration forms; the engine itself only reads
/// the resulting options bag.
#[derive(Debug, Clone, Serialize)]
pub struct OptSpec {
    pub name: &'static str,
    pub kind: &'static str,
    pub default: Value,
    pub help: &'static str,
}

/// The uniform contract every crawl step implements.
///
/// `test` is a pure predicate and must be safe to call repeatedly; `apply`
/// may have side effects. Returning `None` from `apply` is a distinct signal
/// from returning an empty patch: from the first plugin in a pipeline it
/// means "nothing left to crawl".
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn opts_schema(&self) -> Vec<OptSpec>;

    /// `Some(script)` declares that this plugin must run against rendered
    /// page content; the pipeline then delegates test+apply through the page
    /// automation collaborator instead of calling the methods below.
    fn page_script(&self) -> Option<&str> {
        None
    }

    async fn test(&self, ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool>;

    async fn apply(
        &mut self,
        ctx: &mut CrawlContext<'_>,
        resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>>;
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plugin({})", self.name())
    }
}
