use rusqlite::{Connection, OptionalExtension, Result, params};
use spinneret_engine::dedup::DedupFilter;
use spinneret_engine::resource::{Resource, current_timestamp};
use spinneret_engine::site::{
    DEFAULT_FILTER_CAPACITY, DEFAULT_FILTER_FPP, PluginDefinition, Site,
};
use std::fs;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

/// Site row as listed without inflating the full filter bitset.
#[derive(Debug, Clone)]
pub struct SiteSummary {
    pub id: String,
    pub name: String,
    pub seed_url: String,
    pub resource_count: u64,
    pub created_at: i64,
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Optimize for concurrent writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Crawl targets
            CREATE TABLE IF NOT EXISTS sites (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    seed_url TEXT NOT NULL,
    plugins TEXT NOT NULL,            -- JSON array of plugin definitions
    filter_bits BLOB NOT NULL,        -- dedup filter bitset
    filter_capacity INTEGER NOT NULL,
    filter_fpp REAL NOT NULL,
    resource_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- Everything discovered on a site
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id TEXT NOT NULL,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL DEFAULT 0,
    media_type TEXT,
    info TEXT NOT NULL DEFAULT '{}',  -- JSON object
    in_progress BOOLEAN NOT NULL DEFAULT 0,
    crawled_at INTEGER NOT NULL DEFAULT 0,
    actions TEXT NOT NULL DEFAULT '[]',  -- JSON click path

    FOREIGN KEY(site_id) REFERENCES sites(id) ON DELETE CASCADE,
    UNIQUE(site_id, url, actions)
);

CREATE INDEX IF NOT EXISTS idx_resources_site ON resources(site_id);
CREATE INDEX IF NOT EXISTS idx_resources_next ON resources(site_id, in_progress, crawled_at);
CREATE INDEX IF NOT EXISTS idx_resources_media_type ON resources(media_type);
            ",
        )?;
        Ok(())
    }

    // Site management

    /// Create a site with its seed resource. The seed URL goes into the
    /// dedup filter and the resource table in the same transaction, so a
    /// site never exists half-initialized.
    pub fn create_site(
        &mut self,
        name: &str,
        seed_url: &str,
        plugins: Vec<PluginDefinition>,
    ) -> Result<Site> {
        let site_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();
        let plugins_json = serde_json::to_string(&plugins).map_err(json_err)?;

        let mut site = Site::new(&site_id, name, seed_url, plugins);
        site.filter.add(seed_url);
        site.resource_count = 1;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sites (id, name, seed_url, plugins, filter_bits, filter_capacity, filter_fpp, resource_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &site_id,
                name,
                seed_url,
                &plugins_json,
                site.filter.bits(),
                DEFAULT_FILTER_CAPACITY as i64,
                DEFAULT_FILTER_FPP,
                1_i64,
                timestamp,
            ],
        )?;
        tx.execute(
            "INSERT INTO resources (site_id, url, depth) VALUES (?1, ?2, 0)",
            params![&site_id, seed_url],
        )?;
        tx.commit()?;

        Ok(site)
    }

    pub fn load_site(&self, name: &str) -> Result<Option<Site>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, seed_url, plugins, filter_bits, filter_capacity, filter_fpp, resource_count
             FROM sites WHERE name = ?1",
        )?;

        let row = stmt
            .query_row(params![name], |row| {
                let plugins_json: String = row.get(3)?;
                let bits: Vec<u8> = row.get(4)?;
                let capacity: i64 = row.get(5)?;
                let fpp: f64 = row.get(6)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    plugins_json,
                    bits,
                    capacity,
                    fpp,
                    row.get::<_, i64>(7)?,
                ))
            })
            .optional()?;

        let Some((id, name, seed_url, plugins_json, bits, capacity, fpp, count)) = row else {
            return Ok(None);
        };
        let plugins: Vec<PluginDefinition> =
            serde_json::from_str(&plugins_json).map_err(json_err)?;

        let mut site = Site::new(id, name, seed_url, plugins);
        site.filter = DedupFilter::create(capacity as usize, fpp, Some(bits));
        site.resource_count = count as u64;
        Ok(Some(site))
    }

    pub fn list_sites(&self) -> Result<Vec<SiteSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, seed_url, resource_count, created_at FROM sites ORDER BY created_at",
        )?;

        let sites = stmt
            .query_map([], |row| {
                Ok(SiteSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    seed_url: row.get(2)?,
                    resource_count: row.get::<_, i64>(3)? as u64,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(sites)
    }

    /// Remove a site and (via cascade) all its resources. Returns whether a
    /// row was actually deleted.
    pub fn remove_site(&self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sites WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }

    // Resource operations

    pub fn next_to_crawl(
        &self,
        site_id: &str,
        frequency_hours: Option<f64>,
    ) -> Result<Option<Resource>> {
        let (sql, cutoff) = match frequency_hours {
            None => (
                "SELECT id, site_id, url, depth, media_type, info, in_progress, crawled_at, actions
                 FROM resources
                 WHERE site_id = ?1 AND in_progress = 0 AND crawled_at = 0
                 ORDER BY id LIMIT 1",
                0_i64,
            ),
            Some(hours) => (
                "SELECT id, site_id, url, depth, media_type, info, in_progress, crawled_at, actions
                 FROM resources
                 WHERE site_id = ?1 AND in_progress = 0 AND crawled_at <= ?2
                 ORDER BY id LIMIT 1",
                current_timestamp() - (hours * 3600.0) as i64,
            ),
        };

        let mut stmt = self.conn.prepare(sql)?;
        let resource = match frequency_hours {
            None => stmt.query_row(params![site_id], row_to_resource).optional()?,
            Some(_) => stmt
                .query_row(params![site_id, cutoff], row_to_resource)
                .optional()?,
        };
        Ok(resource)
    }

    /// Persist a batch of discovered URLs at `depth` together with the
    /// site's updated filter bitset and resource counter. One transaction:
    /// either all rows and the bitset land, or none do.
    pub fn insert_discoveries(&mut self, site: &Site, urls: &[String], depth: u32) -> Result<()> {
        let tx = self.conn.transaction()?;
        for url in urls {
            tx.execute(
                "INSERT OR IGNORE INTO resources (site_id, url, depth) VALUES (?1, ?2, ?3)",
                params![&site.id, url, depth as i64],
            )?;
        }
        tx.execute(
            "UPDATE sites SET filter_bits = ?1, resource_count = ?2 WHERE id = ?3",
            params![site.filter.bits(), site.resource_count as i64, &site.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn update_resource(&self, resource: &Resource) -> Result<()> {
        let info_json = serde_json::to_string(&resource.info).map_err(json_err)?;
        let actions_json = serde_json::to_string(&resource.actions).map_err(json_err)?;
        self.conn.execute(
            "UPDATE resources
             SET url = ?1, depth = ?2, media_type = ?3, info = ?4, in_progress = ?5, crawled_at = ?6, actions = ?7
             WHERE id = ?8",
            params![
                &resource.url,
                resource.depth as i64,
                &resource.media_type,
                &info_json,
                resource.in_progress,
                resource.crawled_at,
                &actions_json,
                resource.id,
            ],
        )?;
        Ok(())
    }

    pub fn save_resource(&self, resource: &Resource) -> Result<i64> {
        let info_json = serde_json::to_string(&resource.info).map_err(json_err)?;
        let actions_json = serde_json::to_string(&resource.actions).map_err(json_err)?;
        self.conn.execute(
            "INSERT INTO resources (site_id, url, depth, media_type, info, in_progress, crawled_at, actions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &resource.site_id,
                &resource.url,
                resource.depth as i64,
                &resource.media_type,
                &info_json,
                resource.in_progress,
                resource.crawled_at,
                &actions_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Clear in-progress flags left behind by an interrupted crawl.
    pub fn reset_in_progress(&self, site_id: &str) -> Result<usize> {
        self.conn.execute(
            "UPDATE resources SET in_progress = 0 WHERE site_id = ?1 AND in_progress = 1",
            params![site_id],
        )
    }

    pub fn resources_for_site(&self, site_id: &str) -> Result<Vec<Resource>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site_id, url, depth, media_type, info, in_progress, crawled_at, actions
             FROM resources WHERE site_id = ?1 ORDER BY id",
        )?;

        let resources = stmt
            .query_map(params![site_id], row_to_resource)?
            .collect::<Result<Vec<_>>>()?;
        Ok(resources)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_resource(row: &rusqlite::Row<'_>) -> Result<Resource> {
    let info_json: String = row.get(5)?;
    let actions_json: String = row.get(8)?;
    Ok(Resource {
        id: Some(row.get(0)?),
        site_id: row.get(1)?,
        url: row.get(2)?,
        depth: row.get::<_, i64>(3)? as u32,
        media_type: row.get(4)?,
        info: serde_json::from_str(&info_json).unwrap_or_default(),
        in_progress: row.get(6)?,
        crawled_at: row.get(7)?,
        actions: serde_json::from_str(&actions_json).unwrap_or_default(),
    })
}

fn json_err(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}
