use crate::error::{EngineError, Result};
use crate::options::opt_u64;
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Fetches the resource's URL over HTTP, recording the media type, status
/// code and response body. Dynamically discovered resources (non-empty click
/// path) are skipped: their content only exists behind simulated clicks.
pub struct FetchPlugin {
    client: Client,
}

impl FetchPlugin {
    pub fn from_opts(opts: &Map<String, Value>) -> Result<Self> {
        let timeout_secs = opt_u64(opts, "timeout").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = Client::builder()
            .user_agent("Spinneret/0.2 (https://github.com/trapdoorsec/spinneret)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Plugin for FetchPlugin {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        vec![OptSpec {
            name: "timeout",
            kind: "number",
            default: json!(DEFAULT_TIMEOUT_SECS),
            help: "Request timeout in seconds",
        }]
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some_and(|r| r.actions.is_empty()))
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        let resource = resource.ok_or_else(|| EngineError::Plugin {
            plugin: "fetch".to_string(),
            message: "applied without a selected resource".to_string(),
        })?;
        debug!("fetching {}", resource.url);

        let response = self.client.get(&resource.url).send().await?;
        let status = response.status().as_u16();
        let media_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string());
        let body = response.text().await?;

        let patch = ResourcePatch {
            media_type,
            ..Default::default()
        }
        .with_info_entry("status", json!(status))
        .with_info_entry("body", json!(body));

        Ok(Some(patch))
    }
}
