use crate::error::{EngineError, Result};
use crate::plugin::{CrawlContext, Plugin};
use crate::registry::PluginRegistry;
use crate::resource::{Resource, ResourcePatch};
use crate::site::PluginDefinition;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

enum StepOutcome {
    /// The plugin's test declined; the running resource is unchanged.
    Skipped,
    Produced(Option<ResourcePatch>),
}

/// An ordered list of instantiated plugins executed against one (site,
/// resource) pair per `crawl_one_resource` call.
pub struct Pipeline {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Pipeline {
    pub fn from_definitions(defs: &[PluginDefinition], registry: &PluginRegistry) -> Result<Self> {
        let plugins = defs
            .iter()
            .map(|def| registry.resolve(def))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { plugins })
    }

    pub fn from_plugins(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    /// Run the full plugin list once. The first plugin's apply result becomes
    /// the running resource (`None` means nothing left to crawl); every later
    /// plugin's patch is merged into it, with a deep merge for `info`.
    ///
    /// A plugin error aborts the remaining pipeline, clears the claimed
    /// resource's in-progress flag so it can be retried, logs the offending
    /// plugin and URL, and propagates.
    pub async fn crawl_one_resource(
        &mut self,
        ctx: &mut CrawlContext<'_>,
    ) -> Result<Option<Resource>> {
        let mut resource: Option<Resource> = None;

        for (position, plugin) in self.plugins.iter_mut().enumerate() {
            let name = plugin.name();

            let outcome = if let Some(script) = plugin.page_script() {
                run_remote(script, ctx, resource.as_ref()).await
            } else {
                match plugin.test(ctx, resource.as_ref()).await {
                    Ok(true) => plugin.apply(ctx, resource.as_ref()).await.map(StepOutcome::Produced),
                    Ok(false) => Ok(StepOutcome::Skipped),
                    Err(err) => Err(err),
                }
            };

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    release_claimed(ctx, resource.take(), name, &err).await;
                    return Err(err);
                }
            };

            match outcome {
                StepOutcome::Skipped => {
                    debug!("plugin '{}' skipped", name);
                }
                StepOutcome::Produced(Some(patch)) => match resource.as_mut() {
                    Some(resource) => resource.merge(patch),
                    None => resource = Some(Resource::from_patch(&ctx.site.id, patch)?),
                },
                StepOutcome::Produced(None) => {
                    if position == 0 {
                        return Ok(None);
                    }
                    // A later plugin exhausted its branch (dynamic
                    // navigation). Release the claimed resource and end the
                    // crawl the same way.
                    if let Some(mut claimed) = resource.take() {
                        claimed.in_progress = false;
                        ctx.store.update(&claimed).await?;
                    }
                    debug!("plugin '{}' reported exhaustion, ending crawl", name);
                    return Ok(None);
                }
            }
        }

        Ok(resource)
    }
}

/// Delegate test+apply of a page-bound plugin through the automation
/// collaborator, serialized site/resource state in, serialized patch out.
async fn run_remote(
    script: &str,
    ctx: &CrawlContext<'_>,
    resource: Option<&Resource>,
) -> Result<StepOutcome> {
    let page = ctx
        .site
        .page
        .ok_or_else(|| EngineError::Automation("site has no bound page".to_string()))?;

    let args = json!({
        "site": ctx.site.remote_state(),
        "resource": resource,
    });
    let value = ctx.automation.run_in_page(page, script, args).await?;

    Ok(match value {
        Value::Null => StepOutcome::Produced(None),
        Value::Object(ref map) if map.get("skipped").and_then(Value::as_bool) == Some(true) => {
            StepOutcome::Skipped
        }
        other => StepOutcome::Produced(Some(serde_json::from_value(other)?)),
    })
}

async fn release_claimed(
    ctx: &CrawlContext<'_>,
    claimed: Option<Resource>,
    plugin: &str,
    err: &EngineError,
) {
    match claimed {
        Some(mut claimed) => {
            claimed.in_progress = false;
            if let Err(update_err) = ctx.store.update(&claimed).await {
                warn!("failed to release {}: {}", claimed.url, update_err);
            }
            error!("plugin '{}' failed for {}: {}", plugin, claimed.url, err);
        }
        None => error!("plugin '{}' failed: {}", plugin, err),
    }
}
