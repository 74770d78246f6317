use crate::error::Result;
use crate::resource::Resource;
use crate::site::Site;
use async_trait::async_trait;

/// The persistent resource store, consumed by the built-in plugins. The
/// engine only needs these operations; the embedded database behind them is
/// an external collaborator.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Next not-in-progress resource in creation order. With no frequency,
    /// only never-crawled resources are eligible; with one, resources whose
    /// last crawl is older than `frequency_hours` are eligible again.
    async fn get_next_to_crawl(
        &self,
        site_id: &str,
        frequency_hours: Option<f64>,
    ) -> Result<Option<Resource>>;

    /// Persist a batch of newly discovered URLs at `depth` together with the
    /// site's already-updated filter bitset and resource counter, as one
    /// atomic unit. A resource row must never exist without its filter bits
    /// nor the other way around.
    async fn commit_discoveries(&self, site: &Site, urls: &[String], depth: u32) -> Result<()>;

    /// Update an existing resource row (matched by id).
    async fn update(&self, resource: &Resource) -> Result<()>;

    /// Insert a new resource row, returning its id.
    async fn save(&self, resource: &Resource) -> Result<i64>;
}
