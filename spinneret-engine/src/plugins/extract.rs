use crate::error::{EngineError, Result};
use crate::options::{opt_bool, opt_str};
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

/// Extracts outbound links from the fetched HTML body into `info["urls"]`,
/// plus optional named text captures (`captures` option: name -> CSS
/// selector) into `info` so downstream plugins and the store see them.
pub struct ExtractPlugin {
    same_origin: bool,
    captures: Vec<(String, String)>,
}

impl ExtractPlugin {
    pub fn from_opts(opts: &Map<String, Value>) -> Self {
        let captures = opts
            .get("captures")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(name, sel)| {
                        sel.as_str().map(|sel| (name.clone(), sel.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            same_origin: opt_bool(opts, "same_origin").unwrap_or(true),
            captures,
        }
    }

    fn extract(&self, html: &str, base: &str) -> Result<(Vec<String>, Map<String, Value>)> {
        let document = Html::parse_document(html);
        let base_url =
            Url::parse(base).map_err(|e| EngineError::InvalidUrl(format!("{}: {}", base, e)))?;
        let base_host = base_url.host_str().map(str::to_string);

        let link_selector = Selector::parse("a[href]")
            .map_err(|e| EngineError::InvalidSelector(e.to_string()))?;

        let mut urls = Vec::new();
        for element in document.select(&link_selector) {
            if let Some(href) = element.value().attr("href")
                && let Some(resolved) = resolve_url(&base_url, href)
            {
                if self.same_origin && !same_host(&resolved, base_host.as_deref()) {
                    continue;
                }
                if !urls.contains(&resolved) {
                    urls.push(resolved);
                }
            }
        }

        let mut captured = Map::new();
        for (name, selector) in &self.captures {
            let selector = Selector::parse(selector)
                .map_err(|e| EngineError::InvalidSelector(format!("{}: {}", name, e)))?;
            let text: Vec<String> = document
                .select(&selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            captured.insert(name.clone(), json!(text.join("\n")));
        }

        Ok((urls, captured))
    }
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    // Skip empty, javascript:, mailto:, tel: and fragment-only links.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn same_host(url: &str, base_host: Option<&str>) -> bool {
    let Some(base_host) = base_host else {
        return false;
    };
    if let Ok(parsed) = Url::parse(url)
        && let Some(host) = parsed.host_str()
    {
        return host == base_host || host.ends_with(&format!(".{}", base_host));
    }
    false
}

#[async_trait]
impl Plugin for ExtractPlugin {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        vec![
            OptSpec {
                name: "same_origin",
                kind: "bool",
                default: json!(true),
                help: "Only keep links on the resource's own host",
            },
            OptSpec {
                name: "captures",
                kind: "text",
                default: json!({}),
                help: "Named CSS selectors whose visible text lands in the resource info",
            },
        ]
    }

    async fn test(&self, _ctx: &CrawlContext<'_>, resource: Option<&Resource>) -> Result<bool> {
        Ok(resource.is_some_and(|r| {
            r.media_type.as_deref().is_some_and(|mt| mt.contains("text/html"))
                && r.info.get("body").is_some_and(Value::is_string)
        }))
    }

    async fn apply(
        &mut self,
        _ctx: &mut CrawlContext<'_>,
        resource: Option<&Resource>,
    ) -> Result<Option<ResourcePatch>> {
        let resource = resource.ok_or_else(|| EngineError::Plugin {
            plugin: "extract".to_string(),
            message: "applied without a selected resource".to_string(),
        })?;
        let body = resource
            .info
            .get("body")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let (urls, mut captured) = self.extract(body, &resource.url)?;
        debug!("extracted {} links from {}", urls.len(), resource.url);

        captured.insert("urls".to_string(), json!(urls));
        Ok(Some(ResourcePatch {
            info: Some(captured),
            ..Default::default()
        }))
    }
}
