use crate::error::{EngineError, Result};
use crate::navigation::fingerprint::fingerprint;
use crate::navigation::tree::{NavTree, NodeId};
use crate::options::{opt_bool, opt_duration_ms, opt_str};
use crate::plugin::{CrawlContext, OptSpec, Plugin};
use crate::resource::{Resource, ResourcePatch};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

const DEFAULT_STABILITY_TIMEOUT: Duration = Duration::from_millis(1000);

/// One navigation level: a CSS selector whose matches are the click targets
/// at that depth. A content-bearing level means arriving there exposes
/// extractable content and navigation pauses.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorLevel {
    pub selector: String,
    pub content: bool,
}

/// Parse the newline-separated selector option. A trailing `# content`
/// marker (whitespace before the `#`, so id selectors like `div#content`
/// stay intact) flags the level as content-bearing.
pub fn parse_selector_levels(raw: &str) -> Vec<SelectorLevel> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let marker = line.rfind('#').and_then(|i| {
                let (head, tail) = line.split_at(i);
                let is_marker = tail[1..].trim().eq_ignore_ascii_case("content")
                    && head.ends_with(char::is_whitespace);
                is_marker.then(|| head.trim_end().to_string())
            });
            Some(match marker {
                Some(selector) => SelectorLevel {
                    selector,
                    content: true,
                },
                None => SelectorLevel {
                    selector: line.to_string(),
                    content: false,
                },
            })
        })
        .collect()
}

/// Discovers content on single-page applications reachable only through
/// simulated clicks, without revisiting the same UI state twice unless
/// configured to.
///
/// Acts as the resource-producing (first) pipeline step: the first `apply`
/// navigates to the seed, records the pre-click fingerprint on the tree
/// root and yields the initial page; each later `apply` resumes from the
/// active node, clicks its way to the next content-bearing state and yields
/// that state's click path as a new resource identity. Exhausting every
/// backtracking option from the root returns `None`, ending the crawl.
pub struct DynamicNavPlugin {
    levels: Vec<SelectorLevel>,
    revisit: bool,
    stability_timeout: Duration,
    tree: Option<NavTree>,
    active: NodeId,
}

impl DynamicNavPlugin {
    pub fn from_opts(opts: &Map<String, Value>) -> Self {
        let levels = parse_selector_levels(opt_str(opts, "selectors").unwrap_or_default());
        Self {
            levels,
            revisit: opt_bool(opts, "revisit").unwrap_or(false),
            stability_timeout: opt_duration_ms(opts, "stability_timeout")
                .unwrap_or(DEFAULT_STABILITY_TIMEOUT),
            tree: None,
            active: NavTree::new(0).root(),
        }
    }
}

/// Whether `key` at child level `level_idx` under `parent` may be clicked.
/// A brand-new key always may; an existing content-bearing child only with
/// `revisit` on and no duplicate on its last visit; an existing
/// non-content child only as a "return" navigation out of a content-bearing
/// parent (e.g. a cancel button).
fn valid_candidate(
    tree: &NavTree,
    levels: &[SelectorLevel],
    revisit: bool,
    parent: NodeId,
    key: &str,
    level_idx: usize,
) -> bool {
    let Some(child) = tree.child_by_key(parent, key) else {
        return true;
    };
    if levels[level_idx].content {
        return revisit && !tree.node(child).last_visit_duplicate;
    }
    let parent_node = tree.node(parent);
    parent_node.level > 0 && levels[parent_node.level - 1].content
}

fn content_patch(ctx: &CrawlContext<'_>, actions: Vec<String>) -> ResourcePatch {
    ResourcePatch {
        url: Some(ctx.site.seed_url.clone()),
        depth: Some(actions.len() as u32),
        actions: Some(actions),
        ..Default::default()
    }
}

#[async_trait]
impl Plugin for DynamicNavPlugin {
    fn name(&self) -> &'static str {
        "dynamic-nav"
    }

    fn opts_schema(&self) -> Vec<OptSpec> {
        vec![
            OptSpec {
                name: "selectors",
                kind: "text",
                default: json!(""),
                help: "One CSS selector per line, one navigation level each; \
                       append '# content' to mark a level content-bearing",
            },
            OptSpec {
                name: "revisit",
                kind: "bool",
                default: json!(false),
                help: "Allow re-clicking content-bearing targets that did not last duplicate",
            },
            OptSpec {
                name: "stability_timeout",
                kind: "number",
                default: json!(DEFAULT_STABILITY_TIMEOUT.as_millis() as u64),
                help: "Milliseconds of DOM quiet to wait for after each click",
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
        let page = ctx
            .site
            .page
            .ok_or_else(|| EngineError::Automation("site has no bound page".to_string()))?;
        let automation = ctx.automation;

        // First apply: load the seed, fingerprint the pre-click state, and
        // yield the initial page with an empty click path.
        if self.tree.is_none() {
            automation.navigate(page, &ctx.site.seed_url).await?;
            automation
                .wait_for_stability(page, self.stability_timeout)
                .await?;
            let initial = fingerprint(&automation.page_text(page).await?);
            let tree = NavTree::new(initial);
            self.active = tree.root();
            self.tree = Some(tree);
            debug!("dynamic navigation started at {}", ctx.site.seed_url);
            return Ok(Some(content_patch(ctx, Vec::new())));
        }

        let revisit = self.revisit;
        let levels = &self.levels;
        let Some(tree) = self.tree.as_mut() else {
            return Ok(None);
        };

        let mut parent = self.active;
        loop {
            let parent_level = tree.node(parent).level;

            // Deepest level reached: nothing below this node, go back up.
            if parent_level >= levels.len() {
                match tree.node(parent).parent {
                    Some(up) => {
                        parent = up;
                        continue;
                    }
                    None => {
                        self.active = parent;
                        return Ok(None);
                    }
                }
            }

            let level_selector = levels[parent_level].selector.clone();
            let texts = automation.query_visible_text(page, &level_selector).await?;
            let candidate = texts
                .into_iter()
                .find(|key| valid_candidate(tree, levels, revisit, parent, key, parent_level));

            let Some(key) = candidate else {
                match tree.node(parent).parent {
                    Some(up) => {
                        parent = up;
                        continue;
                    }
                    None => {
                        self.active = parent;
                        debug!("dynamic navigation exhausted");
                        return Ok(None);
                    }
                }
            };

            if !automation.click_by_text(page, &level_selector, &key).await? {
                return Err(EngineError::Automation(format!(
                    "click target '{}' disappeared before it could be clicked",
                    key
                )));
            }
            automation
                .wait_for_stability(page, self.stability_timeout)
                .await?;
            let snapshot = fingerprint(&automation.page_text(page).await?);

            let node = match tree.child_by_key(parent, &key) {
                Some(node) => node,
                None => tree.add_child(parent, key.clone()),
            };
            tree.node_mut(node).clicks += 1;

            if let Some(owner) = tree.find_fingerprint(snapshot) {
                // The click reproduced an already-known state: converge on
                // the node holding that fingerprint instead of growing a
                // duplicate branch, and keep navigating from there.
                tree.node_mut(node).last_visit_duplicate = true;
                debug!("duplicate snapshot after clicking '{}'", key);
                self.active = owner;
                parent = owner;
                continue;
            }

            tree.record_fingerprint(node, snapshot);
            tree.node_mut(node).last_visit_duplicate = false;

            if levels[parent_level].content {
                self.active = node;
                let actions = tree.path_keys(node, revisit);
                debug!("content reached via {:?}", actions);
                return Ok(Some(content_patch(ctx, actions)));
            }
            parent = node;
        }
    }
}
