use crate::error::{EngineError, Result};
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch, current_timestamp};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

const BODY_SAMPLE_BYTES: usize = 1024;

/// Final pipeline step: persists the crawled resource, clears the
/// in-progress flag and stamps the crawl time. The full response body is
/// replaced by a 1 KiB sample before hitting the store.
pub struct UpsertPlugin;

#[async_trait]
impl Plugin for UpsertPlugin {
    fn name(&self) -> &'static str {
        "upsert"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some())
    }

    async fn apply(
        &mut self,
        ctx: &mut CrawlContext<'_>,
        resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        let resource = resource.ok_or_else(|| EngineError::Plugin {
            plugin: "upsert".to_string(),
            message: "applied without a selected resource".to_string(),
        })?;

        let mut persisted = resource.clone();
        persisted.in_progress = false;
        persisted.crawled_at = current_timestamp();
        sample_body(&mut persisted.info);

        let id = match persisted.id {
            Some(_) => {
                ctx.store.update(&persisted).await?;
                persisted.id
            }
            None => Some(ctx.store.save(&persisted).await?),
        };

        Ok(Some(ResourcePatch {
            id,
            info: Some(persisted.info),
            in_progress: Some(false),
            crawled_at: Some(persisted.crawled_at),
            ..Default::default()
        }))
    }
}

fn sample_body(info: &mut Map<String, Value>) {
    if let Some(Value::String(body)) = info.remove("body") {
        let mut end = body.len().min(BODY_SAMPLE_BYTES);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        info.insert("body_sample".to_string(), json!(&body[..end]));
    }
}
