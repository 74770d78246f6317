//! In-memory test doubles for the engine's two external collaborators.
//!
//! Used by the engine's own integration tests and by downstream crates that
//! want to exercise pipelines without a database or a live browser page.

use crate::automation::PageAutomation;
use crate::error::{EngineError, Result};
use crate::resource::{NEVER_CRAWLED, Resource, current_timestamp};
use crate::site::{PageHandle, Site};
use crate::store::ResourceStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Snapshot of one `commit_discoveries` call.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub urls: Vec<String>,
    pub depth: u32,
    pub resource_count: u64,
    pub filter_bits: Vec<u8>,
}

/// Resource store backed by a `Vec`, with sequential ids in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    resources: Mutex<Vec<Resource>>,
    commits: Mutex<Vec<CommitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: Vec<Resource>) -> Self {
        let store = Self::new();
        {
            let mut held = store.resources.lock().unwrap();
            for (i, mut resource) in resources.into_iter().enumerate() {
                resource.id = Some(i as i64 + 1);
                held.push(resource);
            }
        }
        store
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.resources.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_next_to_crawl(
        &self,
        site_id: &str,
        frequency_hours: Option<f64>,
    ) -> Result<Option<Resource>> {
        let resources = self.resources.lock().unwrap();
        let now = current_timestamp();
        let next = resources
            .iter()
            .filter(|r| r.site_id == site_id && !r.in_progress)
            .find(|r| match frequency_hours {
                None => r.crawled_at == NEVER_CRAWLED,
                Some(hours) => {
                    r.crawled_at == NEVER_CRAWLED
                        || (now - r.crawled_at) as f64 >= hours * 3600.0
                }
            })
            .cloned();
        Ok(next)
    }

    async fn commit_discoveries(&self, site: &Site, urls: &[String], depth: u32) -> Result<()> {
        let mut resources = self.resources.lock().unwrap();
        let mut next_id = resources.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        for url in urls {
            let mut resource = Resource::new(&site.id, url, depth);
            resource.id = Some(next_id);
            next_id += 1;
            resources.push(resource);
        }
        self.commits.lock().unwrap().push(CommitRecord {
            urls: urls.to_vec(),
            depth,
            resource_count: site.resource_count,
            filter_bits: site.filter.bits().to_vec(),
        });
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> Result<()> {
        let mut resources = self.resources.lock().unwrap();
        let slot = resources
            .iter_mut()
            .find(|r| r.id == resource.id)
            .ok_or_else(|| EngineError::Store(format!("no resource with id {:?}", resource.id)))?;
        *slot = resource.clone();
        Ok(())
    }

    async fn save(&self, resource: &Resource) -> Result<i64> {
        let mut resources = self.resources.lock().unwrap();
        let id = resources.iter().filter_map(|r| r.id).max().unwrap_or(0) + 1;
        let mut resource = resource.clone();
        resource.id = Some(id);
        resources.push(resource);
        Ok(id)
    }
}

/// Automation surface fed from scripted queues.
///
/// `page_text` pops queued snapshots and repeats the last one once the queue
/// runs dry; `query_visible_text` answers from a fixed selector map;
/// `run_in_page` pops queued results. Clicks and navigations are logged.
#[derive(Default)]
pub struct ScriptedAutomation {
    page_texts: Mutex<VecDeque<String>>,
    last_page_text: Mutex<String>,
    candidates: Mutex<HashMap<String, Vec<String>>>,
    remote_results: Mutex<VecDeque<Value>>,
    clicks: Mutex<Vec<(String, String)>>,
    navigations: Mutex<Vec<String>>,
    remote_calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the page-text snapshots `page_text` will return, in order.
    pub fn with_page_texts(self, texts: &[&str]) -> Self {
        *self.page_texts.lock().unwrap() = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Fix the visible texts reported for `selector`.
    pub fn with_candidates(self, selector: &str, texts: &[&str]) -> Self {
        self.candidates.lock().unwrap().insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Queue a result for the next `run_in_page` call.
    pub fn with_remote_result(self, value: Value) -> Self {
        self.remote_results.lock().unwrap().push_back(value);
        self
    }

    pub fn clicks(&self) -> Vec<(String, String)> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn remote_calls(&self) -> Vec<(String, Value)> {
        self.remote_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageAutomation for ScriptedAutomation {
    async fn navigate(&self, _page: PageHandle, url: &str) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn run_in_page(&self, _page: PageHandle, code: &str, args: Value) -> Result<Value> {
        self.remote_calls
            .lock()
            .unwrap()
            .push((code.to_string(), args));
        self.remote_results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::Automation("no scripted remote result left".to_string()))
    }

    async fn query_visible_text(&self, _page: PageHandle, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn click_by_text(&self, _page: PageHandle, selector: &str, text: &str) -> Result<bool> {
        let exists = self
            .candidates
            .lock()
            .unwrap()
            .get(selector)
            .is_some_and(|texts| texts.iter().any(|t| t == text));
        if exists {
            self.clicks
                .lock()
                .unwrap()
                .push((selector.to_string(), text.to_string()));
        }
        Ok(exists)
    }

    async fn wait_for_stability(&self, _page: PageHandle, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn page_text(&self, _page: PageHandle) -> Result<String> {
        let mut queue = self.page_texts.lock().unwrap();
        match queue.pop_front() {
            Some(text) => {
                *self.last_page_text.lock().unwrap() = text.clone();
                Ok(text)
            }
            None => Ok(self.last_page_text.lock().unwrap().clone()),
        }
    }
}
