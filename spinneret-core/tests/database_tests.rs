// Tests for the site database

use spinneret_engine::resource::{Resource, current_timestamp};
use spinneret_engine::site::PluginDefinition;
use spinneret_engine::store::ResourceStore;
use spinneret_core::data::Database;
use spinneret_core::store::SqliteStore;
use serde_json::json;
use tempfile::TempDir;

fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("test.db")).unwrap();
    (dir, db)
}

fn default_plugins() -> Vec<PluginDefinition> {
    vec![
        PluginDefinition::new("select"),
        PluginDefinition::new("fetch").with_opt("timeout", json!(5)),
        PluginDefinition::new("upsert"),
    ]
}

// ============================================================================
// Site Round Trip Tests
// ============================================================================

#[test]
fn test_create_site_seeds_first_resource() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    assert_eq!(site.resource_count, 1);
    assert!(site.filter.test("http://example.com/"));

    let resources = db.resources_for_site(&site.id).unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].url, "http://example.com/");
    assert_eq!(resources[0].depth, 0);
    assert_eq!(resources[0].crawled_at, 0);
}

#[test]
fn test_load_site_round_trips_plugins_and_filter() {
    let (_dir, mut db) = test_db();
    db.create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    let loaded = db.load_site("blog").unwrap().unwrap();
    assert_eq!(loaded.name, "blog");
    assert_eq!(loaded.seed_url, "http://example.com/");
    assert_eq!(loaded.plugins.len(), 3);
    assert_eq!(loaded.plugins[1].name, "fetch");
    assert_eq!(loaded.plugins[1].opts["timeout"], json!(5));

    // The filter bitset survives the round trip.
    assert!(loaded.filter.test("http://example.com/"));
    assert!(!loaded.filter.test("http://example.com/other"));
}

#[test]
fn test_load_unknown_site_is_none() {
    let (_dir, db) = test_db();
    assert!(db.load_site("missing").unwrap().is_none());
}

#[test]
fn test_list_and_remove_sites() {
    let (_dir, mut db) = test_db();
    db.create_site("one", "http://one.example/", default_plugins())
        .unwrap();
    db.create_site("two", "http://two.example/", default_plugins())
        .unwrap();

    let sites = db.list_sites().unwrap();
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].name, "one");

    assert!(db.remove_site("one").unwrap());
    assert!(!db.remove_site("one").unwrap());
    assert_eq!(db.list_sites().unwrap().len(), 1);
}

#[test]
fn test_remove_site_cascades_to_resources() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    db.remove_site("blog").unwrap();
    assert!(db.resources_for_site(&site.id).unwrap().is_empty());
}

// ============================================================================
// Resource Selection Tests
// ============================================================================

#[test]
fn test_next_to_crawl_creation_order() {
    let (_dir, mut db) = test_db();
    let mut site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    site.resource_count += 2;
    db.insert_discoveries(
        &site,
        &[
            "http://example.com/a".to_string(),
            "http://example.com/b".to_string(),
        ],
        1,
    )
    .unwrap();

    let next = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    assert_eq!(next.url, "http://example.com/");

    // Claiming it moves selection on.
    let mut claimed = next;
    claimed.in_progress = true;
    db.update_resource(&claimed).unwrap();

    let next = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    assert_eq!(next.url, "http://example.com/a");
}

#[test]
fn test_crawled_resources_not_reselected_without_frequency() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    let mut seed = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    seed.crawled_at = current_timestamp();
    db.update_resource(&seed).unwrap();

    assert!(db.next_to_crawl(&site.id, None).unwrap().is_none());
}

#[test]
fn test_frequency_makes_stale_resources_eligible() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    let mut seed = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    seed.crawled_at = current_timestamp() - 7200;
    db.update_resource(&seed).unwrap();

    // Crawled two hours ago: stale for a 1h frequency, fresh for a 24h one.
    assert!(db.next_to_crawl(&site.id, Some(1.0)).unwrap().is_some());
    assert!(db.next_to_crawl(&site.id, Some(24.0)).unwrap().is_none());
}

// ============================================================================
// Discovery Commit Tests
// ============================================================================

#[test]
fn test_insert_discoveries_persists_rows_and_filter() {
    let (_dir, mut db) = test_db();
    let mut site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    site.filter.add("http://example.com/a");
    site.resource_count += 1;
    db.insert_discoveries(&site, &["http://example.com/a".to_string()], 1)
        .unwrap();

    let reloaded = db.load_site("blog").unwrap().unwrap();
    assert_eq!(reloaded.resource_count, 2);
    assert!(reloaded.filter.test("http://example.com/a"));

    let resources = db.resources_for_site(&site.id).unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[1].depth, 1);
}

#[test]
fn test_duplicate_static_url_is_ignored() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    // Same (site, url, actions) triple as the seed row.
    db.insert_discoveries(&site, &["http://example.com/".to_string()], 1)
        .unwrap();
    assert_eq!(db.resources_for_site(&site.id).unwrap().len(), 1);
}

#[test]
fn test_same_url_with_distinct_click_paths_coexists() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("spa", "http://example.com/", default_plugins())
        .unwrap();

    let mut dynamic = Resource::new(&site.id, "http://example.com/", 1);
    dynamic.actions = vec!["More#1".to_string()];
    let id = db.save_resource(&dynamic).unwrap();
    assert!(id > 0);

    assert_eq!(db.resources_for_site(&site.id).unwrap().len(), 2);
}

// ============================================================================
// Resource Update Tests
// ============================================================================

#[test]
fn test_update_resource_round_trips_info() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    let mut seed = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    seed.media_type = Some("text/html".to_string());
    seed.info.insert("status".to_string(), json!(200));
    seed.info.insert("title".to_string(), json!("Home"));
    seed.crawled_at = current_timestamp();
    db.update_resource(&seed).unwrap();

    let stored = &db.resources_for_site(&site.id).unwrap()[0];
    assert_eq!(stored.media_type.as_deref(), Some("text/html"));
    assert_eq!(stored.info["status"], json!(200));
    assert_eq!(stored.info["title"], json!("Home"));
}

#[test]
fn test_reset_in_progress() {
    let (_dir, mut db) = test_db();
    let site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();

    let mut seed = db.next_to_crawl(&site.id, None).unwrap().unwrap();
    seed.in_progress = true;
    db.update_resource(&seed).unwrap();
    assert!(db.next_to_crawl(&site.id, None).unwrap().is_none());

    assert_eq!(db.reset_in_progress(&site.id).unwrap(), 1);
    assert!(db.next_to_crawl(&site.id, None).unwrap().is_some());
}

// ============================================================================
// Store Adapter Tests
// ============================================================================

#[tokio::test]
async fn test_sqlite_store_adapter() {
    let dir = TempDir::new().unwrap();
    let mut db = Database::new(&dir.path().join("test.db")).unwrap();
    let mut site = db
        .create_site("blog", "http://example.com/", default_plugins())
        .unwrap();
    let store = SqliteStore::new(db);

    let mut seed = store
        .get_next_to_crawl(&site.id, None)
        .await
        .unwrap()
        .unwrap();
    seed.in_progress = true;
    store.update(&seed).await.unwrap();

    site.filter.add("http://example.com/a");
    site.resource_count += 1;
    store
        .commit_discoveries(&site, &["http://example.com/a".to_string()], 1)
        .await
        .unwrap();

    let next = store
        .get_next_to_crawl(&site.id, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.url, "http://example.com/a");
}
