use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel for a resource that has never been crawled.
pub const NEVER_CRAWLED: i64 = 0;

pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One crawlable unit: a URL plus everything the pipeline has learned about it.
///
/// Dynamically discovered resources additionally carry the click path
/// (`actions`) that reproduces them from the seed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Option<i64>,
    pub site_id: String,
    pub url: String,
    pub depth: u32,
    pub media_type: Option<String>,
    #[serde(default)]
    pub info: Map<String, Value>,
    pub in_progress: bool,
    pub crawled_at: i64,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Resource {
    pub fn new(site_id: impl Into<String>, url: impl Into<String>, depth: u32) -> Self {
        Self {
            id: None,
            site_id: site_id.into(),
            url: url.into(),
            depth,
            media_type: None,
            info: Map::new(),
            in_progress: false,
            crawled_at: NEVER_CRAWLED,
            actions: Vec::new(),
        }
    }

    /// Build a resource from the patch produced by the first plugin in a
    /// pipeline. The patch must carry a URL; everything else defaults.
    pub fn from_patch(site_id: &str, patch: ResourcePatch) -> crate::error::Result<Self> {
        let url = patch
            .url
            .clone()
            .ok_or_else(|| crate::error::EngineError::InvalidUrl("pipeline patch has no URL".to_string()))?;
        let mut resource = Resource::new(site_id, url, patch.depth.unwrap_or(0));
        resource.merge(patch);
        Ok(resource)
    }

    /// Shallow field-wise merge of a partial result, with a deep merge for
    /// the `info` map so several extraction plugins can each contribute keys.
    pub fn merge(&mut self, patch: ResourcePatch) {
        if let Some(id) = patch.id {
            self.id = Some(id);
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(depth) = patch.depth {
            self.depth = depth;
        }
        if let Some(media_type) = patch.media_type {
            self.media_type = Some(media_type);
        }
        if let Some(info) = patch.info {
            merge_info(&mut self.info, info);
        }
        if let Some(in_progress) = patch.in_progress {
            self.in_progress = in_progress;
        }
        if let Some(crawled_at) = patch.crawled_at {
            self.crawled_at = crawled_at;
        }
        if let Some(actions) = patch.actions {
            self.actions = actions;
        }
    }
}

/// Partial resource returned by a plugin's `apply`. `None` fields leave the
/// running resource untouched; set fields overwrite (deep-merging `info`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcePatch {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub depth: Option<u32>,
    pub media_type: Option<String>,
    pub info: Option<Map<String, Value>>,
    pub in_progress: Option<bool>,
    pub crawled_at: Option<i64>,
    pub actions: Option<Vec<String>>,
}

impl ResourcePatch {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            id: resource.id,
            url: Some(resource.url.clone()),
            depth: Some(resource.depth),
            media_type: resource.media_type.clone(),
            info: Some(resource.info.clone()),
            in_progress: Some(resource.in_progress),
            crawled_at: Some(resource.crawled_at),
            actions: Some(resource.actions.clone()),
        }
    }

    pub fn with_info_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.info
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Recursive object merge: nested objects merge key-wise, identical keys with
/// non-object values resolve last-writer-wins.
pub fn merge_info(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, incoming) in src {
        let merged = match dst.remove(&key) {
            Some(Value::Object(mut existing)) => match incoming {
                Value::Object(obj) => {
                    merge_info(&mut existing, obj);
                    Value::Object(existing)
                }
                other => other,
            },
            _ => incoming,
        };
        dst.insert(key, merged);
    }
}
