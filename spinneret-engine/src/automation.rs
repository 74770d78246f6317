use crate::error::{EngineError, Result};
use crate::site::PageHandle;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// The page automation collaborator: a live rendered page the engine can
/// execute instrumented code against. The engine depends only on this
/// contract, never on how the messages are transported.
///
/// Round-trip protocol for `run_in_page` when the pipeline delegates a
/// page-bound plugin: `args` is `{"site": ..., "resource": Resource|null}`,
/// and the result is `null` (apply returned nothing), `{"skipped": true}`
/// (the plugin's test declined), or a `ResourcePatch` object.
#[async_trait]
pub trait PageAutomation: Send + Sync {
    async fn navigate(&self, page: PageHandle, url: &str) -> Result<()>;

    /// Execute instrumented code against the page and return its result.
    async fn run_in_page(&self, page: PageHandle, code: &str, args: Value) -> Result<Value>;

    /// Visible text of every element matching `selector`, in document order.
    async fn query_visible_text(&self, page: PageHandle, selector: &str) -> Result<Vec<String>>;

    /// Click the first element matching `selector` whose visible text equals
    /// `text`. `false` means no such element exists anymore.
    async fn click_by_text(&self, page: PageHandle, selector: &str, text: &str) -> Result<bool>;

    /// Resolve once no childList mutation has occurred for a quiet period,
    /// or after `timeout` at the latest. Guarantees forward progress on
    /// pages with perpetual background mutation.
    async fn wait_for_stability(&self, page: PageHandle, timeout: Duration) -> Result<()>;

    /// Visible text of the page's root container, the fingerprint input.
    async fn page_text(&self, page: PageHandle) -> Result<String>;
}

/// Automation surface for pipelines with no page-bound plugin. Every call
/// fails, which the pipeline treats like a torn-down tab: fatal for the
/// current crawl invocation, recoverable on the next.
pub struct NullAutomation;

impl NullAutomation {
    fn unavailable<T>() -> Result<T> {
        Err(EngineError::Automation(
            "no automation surface bound".to_string(),
        ))
    }
}

#[async_trait]
impl PageAutomation for NullAutomation {
    async fn navigate(&self, _page: PageHandle, _url: &str) -> Result<()> {
        Self::unavailable()
    }

    async fn run_in_page(&self, _page: PageHandle, _code: &str, _args: Value) -> Result<Value> {
        Self::unavailable()
    }

    async fn query_visible_text(&self, _page: PageHandle, _selector: &str) -> Result<Vec<String>> {
        Self::unavailable()
    }

    async fn click_by_text(&self, _page: PageHandle, _selector: &str, _text: &str) -> Result<bool> {
        Self::unavailable()
    }

    async fn wait_for_stability(&self, _page: PageHandle, _timeout: Duration) -> Result<()> {
        Self::unavailable()
    }

    async fn page_text(&self, _page: PageHandle) -> Result<String> {
        Self::unavailable()
    }
}
