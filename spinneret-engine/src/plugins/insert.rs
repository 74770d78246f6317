use crate::error::{EngineError, Result};
use crate::options::{opt_u32, opt_u64};
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

const DEFAULT_MAX_DEPTH: u32 = 3;

/// Inserts newly discovered URLs (from `info["urls"]`) as resources at
/// depth + 1. Each candidate is checked against the site's dedup filter
/// first; survivors are recorded in the filter and persisted together with
/// the updated bitset and resource counter as one atomic unit.
///
/// `max_depth` and `max_resources` are enforced here, in `test`, so the
/// crawl loop itself stays unbounded.
pub struct InsertPlugin {
    max_depth: u32,
    max_resources: Option<u64>,
}

impl InsertPlugin {
    pub fn from_opts(opts: &Map<String, Value>) -> Self {
        Self {
            max_depth: opt_u32(opts, "max_depth").unwrap_or(DEFAULT_MAX_DEPTH),
            max_resources: opt_u64(opts, "max_resources"),
        }
    }
}

#[async_trait]
impl Plugin for InsertPlugin {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        vec![
            OptSpec {
                name: "max_depth",
                kind: "number",
                default: json!(DEFAULT_MAX_DEPTH),
                help: "Do not insert resources beyond this hop count from the seed",
            },
            OptSpec {
                name: "max_resources",
                kind: "number",
                default: Value::Null,
                help: "Stop inserting once the site holds this many resources",
            },
        ]
    }

    async fn test(&self, ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        let Some(resource) = resource else {
            return Ok(false);
        };
        let within_depth = resource.depth < self.max_depth;
        let within_count = self
            .max_resources
            .is_none_or(|max| ctx.site.resource_count < max);
        Ok(within_depth && within_count && resource.info.contains_key("urls"))
    }

    async fn apply(
        &mut self,
        ctx: &mut CrawlContext<'_>,
        resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        let resource = resource.ok_or_else(|| EngineError::Plugin {
            plugin: "insert".to_string(),
            message: "applied without a selected resource".to_string(),
        })?;

        let urls: Vec<&str> = resource
            .info
            .get("urls")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        // Sequential filter check-then-add so a URL repeated inside one
        // batch is only admitted once.
        let mut admitted = Vec::new();
        for url in urls {
            if !ctx.site.filter.test(url) {
                ctx.site.filter.add(url);
                admitted.push(url.to_string());
            }
        }

        // All duplicates: leave the filter bitset unwritten.
        if admitted.is_empty() {
            return Ok(Some(ResourcePatch::default()));
        }

        ctx.site.resource_count += admitted.len() as u64;
        ctx.store
            .commit_discoveries(ctx.site, &admitted, resource.depth + 1)
            .await?;

        debug!(
            "inserted {} new resources at depth {}",
            admitted.len(),
            resource.depth + 1
        );
        Ok(Some(ResourcePatch::default()))
    }
}
