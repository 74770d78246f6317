// Tests for pipeline execution semantics

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use spinneret_engine::error::{EngineError, Result};
use spinneret_engine::plugins::SelectPlugin;
use spinneret_engine::testing::{MemoryStore, ScriptedAutomation};
use spinneret_engine::{
    CrawlContext, NullAutomation, OptSpec, PageHandle, Pipeline, Plugin, PluginDefinition,
    PluginRegistry, Resource, ResourcePatch, Site, crawl_site,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Test Plugins
// ============================================================================

/// First-position producer yielding `total` resources, then `None`.
struct CountingProducer {
    total: usize,
    produced: usize,
}

#[async_trait]
impl Plugin for CountingProducer {
    fn name(&self) -> &'static str {
        "counting-producer"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_none())
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        if self.produced == self.total {
            return Ok(None);
        }
        self.produced += 1;
        Ok(Some(ResourcePatch {
            url: Some(format!("http://example.com/{}", self.produced)),
            ..Default::default()
        }))
    }
}

/// Counts how many times `apply` runs against a selected resource.
struct ApplyCounter {
    applies: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin for ApplyCounter {
    fn name(&self) -> &'static str {
        "apply-counter"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some())
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(Some(ResourcePatch::default()))
    }
}

/// Contributes one info key.
struct InfoTag {
    key: &'static str,
    value: Value,
}

#[async_trait]
impl Plugin for InfoTag {
    fn name(&self) -> &'static str {
        "info-tag"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some())
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        Ok(Some(
            ResourcePatch::default().with_info_entry(self.key, self.value.clone()),
        ))
    }
}

/// Always fails its apply.
struct FailingPlugin;

#[async_trait]
impl Plugin for FailingPlugin {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some())
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        Err(EngineError::Plugin {
            plugin: "failing".to_string(),
            message: "intentional failure".to_string(),
        })
    }
}

/// Page-bound plugin, delegated through the automation surface.
struct RemotePlugin;

#[async_trait]
impl Plugin for RemotePlugin {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        Vec::new()
    }

    fn page_script(&self) -> Option<&str> {
        Some("annotatePage(site, resource)")
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, _resource: Option<&Resource>) -> Result<bool> {
        Ok(false)
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        _resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        Ok(None)
    }
}

fn test_site() -> Site {
    let mut site = Site::new("s1", "test", "http://example.com/", Vec::new());
    site.page = Some(PageHandle(1));
    site
}

// ============================================================================
// Pipeline Semantics Tests
// ============================================================================

#[tokio::test]
async fn test_first_plugin_none_ends_without_later_invocations() {
    let applies = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(CountingProducer {
            total: 0,
            produced: 0,
        }),
        Box::new(ApplyCounter {
            applies: applies.clone(),
        }),
    ]);

    let mut site = test_site();
    let store = MemoryStore::new();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &NullAutomation,
    };

    let result = pipeline.crawl_one_resource(&mut ctx).await.unwrap();
    assert!(result.is_none());
    assert_eq!(applies.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_later_plugins_run_once_per_produced_resource() {
    let applies = Arc::new(AtomicUsize::new(0));
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(CountingProducer {
            total: 5,
            produced: 0,
        }),
        Box::new(ApplyCounter {
            applies: applies.clone(),
        }),
    ]);

    let mut site = test_site();
    let store = MemoryStore::new();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &NullAutomation,
    };

    let mut crawled = 0;
    while pipeline.crawl_one_resource(&mut ctx).await.unwrap().is_some() {
        crawled += 1;
    }

    assert_eq!(crawled, 5);
    assert_eq!(applies.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_selection_only_pipeline_drains_store_then_ends() {
    let urls: Vec<String> = (1..=5)
        .map(|n| format!("http://example.com/page-{n}"))
        .collect();
    let store = MemoryStore::with_resources(
        urls.iter().map(|url| Resource::new("s1", url, 0)).collect(),
    );
    let mut pipeline =
        Pipeline::from_plugins(vec![Box::new(SelectPlugin::from_opts(&Map::new()))]);

    let mut site = test_site();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &NullAutomation,
    };

    let mut invocations = 0;
    let mut claimed = Vec::new();
    loop {
        invocations += 1;
        match pipeline.crawl_one_resource(&mut ctx).await.unwrap() {
            Some(resource) => claimed.push(resource.url),
            None => break,
        }
    }

    // Five Some returns in creation order, then the terminal None.
    assert_eq!(invocations, 6);
    assert_eq!(claimed, urls);
    assert!(store.resources().iter().all(|r| r.in_progress));
}

#[tokio::test]
async fn test_patches_merge_info_across_plugins() {
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(CountingProducer {
            total: 1,
            produced: 0,
        }),
        Box::new(InfoTag {
            key: "title",
            value: json!("Home"),
        }),
        Box::new(InfoTag {
            key: "status",
            value: json!(200),
        }),
    ]);

    let mut site = test_site();
    let store = MemoryStore::new();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &NullAutomation,
    };

    let resource = pipeline.crawl_one_resource(&mut ctx).await.unwrap().unwrap();
    assert_eq!(resource.info["title"], json!("Home"));
    assert_eq!(resource.info["status"], json!(200));
}

#[tokio::test]
async fn test_plugin_error_releases_claimed_resource() {
    let store =
        MemoryStore::with_resources(vec![Resource::new("s1", "http://example.com/", 0)]);
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(SelectPlugin::from_opts(&Map::new())),
        Box::new(FailingPlugin),
    ]);

    let mut site = test_site();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &NullAutomation,
    };

    let err = pipeline.crawl_one_resource(&mut ctx).await.unwrap_err();
    assert!(matches!(err, EngineError::Plugin { .. }));

    // The claimed resource must be retryable again.
    let released = &store.resources()[0];
    assert!(!released.in_progress);
}

// ============================================================================
// Remote Delegation Tests
// ============================================================================

#[tokio::test]
async fn test_remote_plugin_round_trip() {
    let automation = ScriptedAutomation::new()
        .with_remote_result(json!({ "info": { "annotated": true } }));
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(CountingProducer {
            total: 1,
            produced: 0,
        }),
        Box::new(RemotePlugin),
    ]);

    let mut site = test_site();
    let store = MemoryStore::new();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &automation,
    };

    let resource = pipeline.crawl_one_resource(&mut ctx).await.unwrap().unwrap();
    assert_eq!(resource.info["annotated"], json!(true));

    let calls = automation.remote_calls();
    assert_eq!(calls.len(), 1);
    let (code, args) = &calls[0];
    assert_eq!(code, "annotatePage(site, resource)");
    assert_eq!(args["site"]["id"], json!("s1"));
    assert_eq!(args["resource"]["url"], json!("http://example.com/1"));
}

#[tokio::test]
async fn test_remote_skipped_leaves_resource_unchanged() {
    let automation = ScriptedAutomation::new().with_remote_result(json!({ "skipped": true }));
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(CountingProducer {
            total: 1,
            produced: 0,
        }),
        Box::new(RemotePlugin),
    ]);

    let mut site = test_site();
    let store = MemoryStore::new();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &automation,
    };

    let resource = pipeline.crawl_one_resource(&mut ctx).await.unwrap().unwrap();
    assert!(resource.info.is_empty());
}

#[tokio::test]
async fn test_remote_null_ends_crawl_and_releases_claim() {
    let store =
        MemoryStore::with_resources(vec![Resource::new("s1", "http://example.com/", 0)]);
    let automation = ScriptedAutomation::new().with_remote_result(Value::Null);
    let mut pipeline = Pipeline::from_plugins(vec![
        Box::new(SelectPlugin::from_opts(&Map::new())),
        Box::new(RemotePlugin),
    ]);

    let mut site = test_site();
    let mut ctx = CrawlContext {
        site: &mut site,
        store: &store,
        automation: &automation,
    };

    let result = pipeline.crawl_one_resource(&mut ctx).await.unwrap();
    assert!(result.is_none());
    assert!(!store.resources()[0].in_progress);
}

// ============================================================================
// Full Static Crawl Tests
// ============================================================================

#[tokio::test]
async fn test_static_crawl_against_mock_server() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;

    let index = r#"<html><body>
        <a href="/a">A</a>
        <a href="/b">B</a>
        <a href="/a">A again</a>
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(index, "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;
    for leaf in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(leaf))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>leaf</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;
    }

    let seed = format!("{}/", server.uri());
    let plugins = vec![
        PluginDefinition::new("select"),
        PluginDefinition::new("fetch"),
        PluginDefinition::new("extract"),
        PluginDefinition::new("insert"),
        PluginDefinition::new("upsert"),
    ];
    let mut site = Site::new("s1", "mock", &seed, plugins);
    site.filter.add(&seed);
    site.resource_count = 1;

    let store = MemoryStore::with_resources(vec![Resource::new("s1", &seed, 0)]);
    let registry = PluginRegistry::builtin();

    crawl_site(&mut site, &registry, &store, &NullAutomation)
        .await
        .unwrap();

    let resources = store.resources();
    assert_eq!(resources.len(), 3);
    for resource in &resources {
        assert!(!resource.in_progress);
        assert_ne!(resource.crawled_at, 0);
        assert_eq!(resource.info["status"], json!(200));
        assert!(resource.info.get("body").is_none());
        assert!(resource.info.get("body_sample").is_some());
    }

    // The duplicate "/a" link was filtered; depths follow the hop count.
    assert_eq!(resources[0].depth, 0);
    assert!(resources[1..].iter().all(|r| r.depth == 1));
    assert_eq!(site.resource_count, 3);
}
