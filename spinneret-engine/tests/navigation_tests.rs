// Tests for click-driven dynamic navigation

use serde_json::json;
use spinneret_engine::testing::{MemoryStore, ScriptedAutomation};
use spinneret_engine::{PageHandle, PluginDefinition, PluginRegistry, Site, crawl_site};

fn dynamic_site(selectors: &str, revisit: bool) -> Site {
    let plugins = vec![
        PluginDefinition::new("dynamic-nav")
            .with_opt("selectors", json!(selectors))
            .with_opt("revisit", json!(revisit)),
        PluginDefinition::new("upsert"),
    ];
    let mut site = Site::new("s1", "spa", "http://spa.example.com/", plugins);
    site.page = Some(PageHandle(7));
    site
}

// ============================================================================
// Single Content Level Tests
// ============================================================================

// A "More" button that appends content twice and then stops changing the
// page. The crawl must yield the initial page plus the two distinct states
// and end on the first duplicate snapshot.
#[tokio::test]
async fn test_more_button_crawl_stops_on_duplicate_state() {
    let automation = ScriptedAutomation::new()
        .with_page_texts(&["", "first batch", "second batch"])
        .with_candidates(".more", &["More"]);
    let store = MemoryStore::new();
    let registry = PluginRegistry::builtin();
    let mut site = dynamic_site(".more # content", true);

    crawl_site(&mut site, &registry, &store, &automation)
        .await
        .unwrap();

    let resources = store.resources();
    assert_eq!(resources.len(), 3);

    let actions: Vec<&[String]> = resources.iter().map(|r| r.actions.as_slice()).collect();
    assert!(actions[0].is_empty());
    assert_eq!(actions[1], ["More#1"]);
    assert_eq!(actions[2], ["More#2"]);

    for resource in &resources {
        assert_eq!(resource.url, "http://spa.example.com/");
        assert_eq!(resource.depth, resource.actions.len() as u32);
        assert!(!resource.in_progress);
        assert_ne!(resource.crawled_at, 0);
    }

    // The third click reproduced the second state; no fourth resource.
    assert_eq!(automation.clicks().len(), 3);
    assert_eq!(automation.navigations(), ["http://spa.example.com/"]);
}

#[tokio::test]
async fn test_without_revisit_each_target_is_clicked_once() {
    let automation = ScriptedAutomation::new()
        .with_page_texts(&["", "expanded"])
        .with_candidates(".more", &["More"]);
    let store = MemoryStore::new();
    let registry = PluginRegistry::builtin();
    let mut site = dynamic_site(".more # content", false);

    crawl_site(&mut site, &registry, &store, &automation)
        .await
        .unwrap();

    let resources = store.resources();
    assert_eq!(resources.len(), 2);
    assert!(resources[0].actions.is_empty());
    // No click counters without revisit.
    assert_eq!(resources[1].actions, ["More"]);
    assert_eq!(automation.clicks().len(), 1);
}

// ============================================================================
// Two Level Menu Tests
// ============================================================================

#[tokio::test]
async fn test_menu_then_item_levels_visit_every_leaf() {
    let automation = ScriptedAutomation::new()
        .with_page_texts(&["root", "menu open", "item one", "item two"])
        .with_candidates(".menu", &["Files"])
        .with_candidates(".item", &["One", "Two"]);
    let store = MemoryStore::new();
    let registry = PluginRegistry::builtin();
    let mut site = dynamic_site(".menu\n.item # content", false);

    crawl_site(&mut site, &registry, &store, &automation)
        .await
        .unwrap();

    let resources = store.resources();
    assert_eq!(resources.len(), 3);
    assert!(resources[0].actions.is_empty());
    assert_eq!(resources[1].actions, ["Files", "One"]);
    assert_eq!(resources[2].actions, ["Files", "Two"]);
    assert_eq!(resources[1].depth, 2);

    let clicks = automation.clicks();
    assert_eq!(
        clicks,
        vec![
            (".menu".to_string(), "Files".to_string()),
            (".item".to_string(), "One".to_string()),
            (".item".to_string(), "Two".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_state_converges_instead_of_branching() {
    // Clicking "Two" lands on the same state "One" already produced; the
    // walker must not record it as a second resource.
    let automation = ScriptedAutomation::new()
        .with_page_texts(&["root", "shared", "shared"])
        .with_candidates(".item", &["One", "Two"]);
    let store = MemoryStore::new();
    let registry = PluginRegistry::builtin();
    let mut site = dynamic_site(".item # content", false);

    crawl_site(&mut site, &registry, &store, &automation)
        .await
        .unwrap();

    let resources = store.resources();
    assert_eq!(resources.len(), 2);
    assert!(resources[0].actions.is_empty());
    assert_eq!(resources[1].actions, ["One"]);
}
