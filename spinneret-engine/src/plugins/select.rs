use crate::error::Result;
use crate::options::opt_f64;
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Claims the next not-in-progress resource in creation order. With a
/// `frequency` option, already-crawled resources become eligible again once
/// their last crawl is older than that many hours. Returning `None` ends the
/// owning crawl loop. The `delay` option is consumed by the loop itself.
pub struct SelectPlugin {
    frequency_hours: Option<f64>,
}

impl SelectPlugin {
    pub fn from_opts(opts: &Map<String, Value>) -> Self {
        Self {
            frequency_hours: opt_f64(opts, "frequency"),
        }
    }
}

#[async_trait]
impl Plugin for SelectPlugin {
    fn name(&self) -> &'static str {
        "select"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        vec![
            OptSpec {
                name: "delay",
                kind: "number",
                default: json!(0),
                help: "Milliseconds to wait between crawl iterations",
            },
            OptSpec {
                name: "frequency",
                kind: "number",
                default: Value::Null,
                help: "Re-crawl resources older than this many hours",
            },
        ]
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_none())
    }

    async fn apply(
        &mut self,
        ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        let Some(mut resource) = ctx
            .store
            .get_next_to_crawl(&ctx.site.id, self.frequency_hours)
            .await?
        else {
            return Ok(None);
        };

        resource.in_progress = true;
        ctx.store.update(&resource).await?;

        Ok(Some(ResourcePatch::from_resource(&resource)))
    }
}
