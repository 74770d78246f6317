// Report generation from database

use crate::data::Database;
use rusqlite::Result;
use serde::{Deserialize, Serialize};
use spinneret_engine::resource::Resource;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub site_name: String,
    pub seed_url: String,
    pub created_at: i64,
    pub total_resources: usize,
    pub crawled_resources: usize,
    pub pending_resources: usize,
    pub dynamic_resources: usize,
    pub media_type_counts: BTreeMap<String, usize>,
    pub resources: Vec<ResourceLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLine {
    pub url: String,
    pub depth: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub crawled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub actions: Vec<String>,
}

pub fn gather_report_data(db: &Database, site_name: &str) -> Result<Option<ReportData>> {
    let Some(summary) = db
        .list_sites()?
        .into_iter()
        .find(|s| s.name == site_name)
    else {
        return Ok(None);
    };

    let resources = db.resources_for_site(&summary.id)?;

    let crawled = resources.iter().filter(|r| r.crawled_at != 0).count();
    let dynamic = resources.iter().filter(|r| !r.actions.is_empty()).count();

    let mut media_type_counts = BTreeMap::new();
    for resource in &resources {
        if let Some(mt) = &resource.media_type {
            *media_type_counts.entry(mt.clone()).or_insert(0) += 1;
        }
    }

    let lines = resources.iter().map(resource_line).collect::<Vec<_>>();

    Ok(Some(ReportData {
        site_name: summary.name,
        seed_url: summary.seed_url,
        created_at: summary.created_at,
        total_resources: resources.len(),
        crawled_resources: crawled,
        pending_resources: resources.len() - crawled,
        dynamic_resources: dynamic,
        media_type_counts,
        resources: lines,
    }))
}

fn resource_line(resource: &Resource) -> ResourceLine {
    ResourceLine {
        url: resource.url.clone(),
        depth: resource.depth,
        media_type: resource.media_type.clone(),
        crawled: resource.crawled_at != 0,
        actions: resource.actions.clone(),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                         SPINNERET SITE CRAWL REPORT\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    report.push_str(&format!("Site:         {}\n", data.site_name));
    report.push_str(&format!("Seed URL:     {}\n", data.seed_url));
    report.push_str(&format!(
        "Created:      {}\n",
        format_timestamp(data.created_at)
    ));
    report.push_str(&format!("Resources:    {}\n", data.total_resources));
    report.push_str(&format!(
        "Crawled:      {} ({} pending)\n",
        data.crawled_resources, data.pending_resources
    ));
    if data.dynamic_resources > 0 {
        report.push_str(&format!(
            "Dynamic:      {} (click-discovered)\n",
            data.dynamic_resources
        ));
    }
    report.push('\n');

    if !data.media_type_counts.is_empty() {
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
        report.push_str("MEDIA TYPES\n");
        report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
        for (media_type, count) in &data.media_type_counts {
            report.push_str(&format!("  {:<40} {}\n", media_type, count));
        }
        report.push('\n');
    }

    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("SITE MAP\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str(&generate_sitemap(&data.resources));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report.push_str("                              End of Report\n");
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Spinneret",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "site": {
                "name": data.site_name,
                "seed_url": data.seed_url,
                "created_at": format_iso8601_timestamp(data.created_at)
            },
            "summary": {
                "total_resources": data.total_resources,
                "crawled": data.crawled_resources,
                "pending": data.pending_resources,
                "dynamic": data.dynamic_resources,
                "media_types": data.media_type_counts
            },
            "resources": data.resources
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Path component of a URL, without query or fragment. Unparsable input
/// falls back to "/".
pub fn extract_url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => "/".to_string(),
    }
}

fn generate_sitemap(resources: &[ResourceLine]) -> String {
    if resources.is_empty() {
        return "  (empty)\n".to_string();
    }

    let mut result = String::new();
    for (i, line) in resources.iter().enumerate() {
        let prefix = if i == resources.len() - 1 {
            "└── "
        } else {
            "├── "
        };

        let marker = if line.crawled { "✓" } else { "·" };
        let display = if line.actions.is_empty() {
            extract_url_path(&line.url)
        } else {
            format!("{} [{}]", extract_url_path(&line.url), line.actions.join(" > "))
        };
        let media = line
            .media_type
            .as_deref()
            .and_then(|mt| mt.split('/').nth(1))
            .unwrap_or("?");

        result.push_str(&format!("{}{}  [{}] {}\n", prefix, display, marker, media));
    }

    result
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}
