use crate::automation::PageAutomation;
use crate::error::Result;
use crate::options::opt_duration_ms;
use crate::pipeline::Pipeline;
use crate::plugin::CrawlContext;
use crate::registry::PluginRegistry;
use crate::site::Site;
use crate::store::ResourceStore;
use tracing::{debug, info};

/// Crawl one site to completion: instantiate its plugin list once, then call
/// the pipeline until the selection step finds nothing eligible.
///
/// Termination thresholds (max depth, max resource count, re-crawl
/// frequency) live inside individual plugins' `test`, never here. The only
/// loop-level knob is the optional inter-iteration `delay` from the plugin
/// options, which throttles request rate.
pub async fn crawl_site(
    site: &mut Site,
    registry: &PluginRegistry,
    store: &dyn ResourceStore,
    automation: &dyn PageAutomation,
) -> Result<()> {
    let mut pipeline = Pipeline::from_definitions(&site.plugins, registry)?;
    let delay = site
        .plugins
        .iter()
        .find_map(|def| opt_duration_ms(&def.opts, "delay"));

    info!("starting crawl of '{}' ({})", site.name, site.seed_url);

    let mut processed = 0usize;
    let mut ctx = CrawlContext {
        site,
        store,
        automation,
    };

    loop {
        match pipeline.crawl_one_resource(&mut ctx).await? {
            Some(resource) => {
                processed += 1;
                debug!("crawled {} (depth {})", resource.url, resource.depth);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
            None => break,
        }
    }

    info!(
        "crawl of '{}' complete, {} resources processed",
        ctx.site.name, processed
    );
    Ok(())
}
