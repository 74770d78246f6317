use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use spinneret_core::data::Database;
use spinneret_core::report::{
    ReportFormat, gather_report_data, generate_json_report, generate_text_report, save_report,
};
use spinneret_core::store::SqliteStore;
use spinneret_engine::automation::NullAutomation;
use spinneret_engine::crawl_site;
use spinneret_engine::registry::PluginRegistry;
use spinneret_engine::site::PluginDefinition;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub fn print_banner() {
    println!(
        "{}",
        r#"
             o     o
              \___/
         ___ /o   o\ ___
  ~~~~~~/   \\ = //   \~~~~~~
        \___/ \_/ \___/
   s p i n n e r e t
"#
        .bright_cyan()
    );
    println!(
        "  {} v{}\n",
        "a plugin-pipeline site crawler".bright_white(),
        env!("CARGO_PKG_VERSION")
    );
}

// Helper functions shared by the handlers

/// The conventional static-crawl pipeline.
pub fn default_plugins() -> Vec<PluginDefinition> {
    vec![
        PluginDefinition::new("select"),
        PluginDefinition::new("fetch"),
        PluginDefinition::new("extract"),
        PluginDefinition::new("insert"),
        PluginDefinition::new("upsert"),
    ]
}

/// Parse a comma-separated plugin list, validating every name against the
/// registry before anything touches the database.
pub fn parse_plugin_spec(spec: &str) -> Result<Vec<PluginDefinition>, String> {
    let registry = PluginRegistry::builtin();
    let known = registry.names();

    let defs: Vec<PluginDefinition> = spec
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(PluginDefinition::new)
        .collect();

    if defs.is_empty() {
        return Err("plugin list is empty".to_string());
    }
    for def in &defs {
        if !known.contains(&def.name.as_str()) {
            return Err(format!(
                "unknown plugin '{}' (available: {})",
                def.name,
                known.join(", ")
            ));
        }
    }
    Ok(defs)
}

/// Load full plugin definitions (names plus options) from a JSON file.
pub fn load_plugins_file(path: &PathBuf) -> Result<Vec<PluginDefinition>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read plugins file {}: {}", path.display(), e))?;
    let defs: Vec<PluginDefinition> = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid plugins file {}: {}", path.display(), e))?;
    if defs.is_empty() {
        return Err(format!("No plugins defined in {}", path.display()));
    }
    Ok(defs)
}

/// Expand `~` in a database path argument.
pub fn expand_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

fn open_database(args: &ArgMatches) -> Database {
    let raw = args.get_one::<String>("db").expect("clap provides default");
    let path = expand_db_path(raw);
    if !Database::exists(&path) {
        eprintln!(
            "{} No database at {}. Run `spinneret init` first.",
            "✗".red().bold(),
            path.display()
        );
        std::process::exit(1);
    }
    match Database::new(&path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} Failed to open database: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush().unwrap();
    let mut response = String::new();
    io::stdin().read_line(&mut response).unwrap();
    response.trim().to_lowercase()
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  SPINNERET INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir_arg = args.get_one::<String>("PATH").expect("clap provides default");
    let force = args.get_flag("force");
    let expanded = shellexpand::tilde(dir_arg);
    let config_dir = Path::new(expanded.as_ref());
    let db_loc = config_dir.join("spinneret.db");
    let db_path = db_loc.as_path();

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A database already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            db_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Overwrite it? [y/N]:");
        println!();
        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return;
        }
    }

    fs::create_dir_all(config_dir).expect("Failed to create config directory");

    if Database::exists(db_path) {
        Database::drop(db_path).expect("Failed to remove existing database");
        println!("{} Existing database removed", "✓".green().bold());
    }

    println!("{} Creating database...", "→".blue());
    Database::new(db_path).expect("Failed to create database");

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
}

pub fn handle_site_add(args: &ArgMatches) {
    let name = args.get_one::<String>("name").expect("required by clap");
    let url = args.get_one::<Url>("url").expect("required by clap");

    let plugins = if let Some(path) = args.get_one::<PathBuf>("plugins-file") {
        match load_plugins_file(path) {
            Ok(defs) => defs,
            Err(e) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
    } else if let Some(spec) = args.get_one::<String>("plugins") {
        match parse_plugin_spec(spec) {
            Ok(defs) => defs,
            Err(e) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
    } else {
        default_plugins()
    };

    let mut db = open_database(args);
    match db.create_site(name, url.as_str(), plugins) {
        Ok(site) => {
            println!(
                "{} Site '{}' added ({})",
                "✓".green().bold(),
                site.name.bright_white(),
                site.seed_url
            );
            println!(
                "  Pipeline: {}",
                site.plugins
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" → ")
            );
        }
        Err(e) => {
            eprintln!("{} Failed to add site: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_site_list(args: &ArgMatches) {
    let db = open_database(args);
    let sites = match db.list_sites() {
        Ok(sites) => sites,
        Err(e) => {
            eprintln!("{} Failed to list sites: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if sites.is_empty() {
        println!("No sites yet. Add one with `spinneret site add`.");
        return;
    }

    println!(
        "{:<20} {:<40} {:>10}",
        "NAME".bold(),
        "SEED URL".bold(),
        "RESOURCES".bold()
    );
    for site in sites {
        println!(
            "{:<20} {:<40} {:>10}",
            site.name, site.seed_url, site.resource_count
        );
    }
}

pub fn handle_site_remove(args: &ArgMatches) {
    let name = args.get_one::<String>("name").expect("required by clap");
    let db = open_database(args);

    match db.remove_site(name) {
        Ok(true) => println!("{} Site '{}' removed", "✓".green().bold(), name),
        Ok(false) => {
            eprintln!("{} No site named '{}'", "✗".red().bold(), name);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Failed to remove site: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_crawl(args: &ArgMatches) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let name = args.get_one::<String>("site").expect("required by clap");
    let db = open_database(args);

    let mut site = match db.load_site(name) {
        Ok(Some(site)) => site,
        Ok(None) => {
            eprintln!("{} No site named '{}'", "✗".red().bold(), name);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Failed to load site: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Interrupted crawls leave claims behind; clear them before starting.
    if let Ok(reset) = db.reset_in_progress(&site.id)
        && reset > 0
    {
        println!("{} Released {} stale claims", "→".yellow(), reset);
    }

    if site.plugins.iter().any(|p| p.name == "dynamic-nav") {
        println!(
            "{} Pipeline contains 'dynamic-nav' but no page automation surface is attached; \
             those steps will fail",
            "⚠".yellow().bold()
        );
    }

    println!("\n🕷️  Crawling '{}' ({})", site.name, site.seed_url);
    println!(
        "Pipeline: {}\n",
        site.plugins
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(" → ")
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("crawling...");

    let registry = PluginRegistry::builtin();
    let store = SqliteStore::new(db);

    match crawl_site(&mut site, &registry, &store, &NullAutomation).await {
        Ok(()) => {
            spinner.finish_and_clear();
            println!("\n{} Crawl complete!\n", "✓".green().bold());

            let db = store.into_inner();
            if let Ok(resources) = db.resources_for_site(&site.id) {
                let crawled = resources.iter().filter(|r| r.crawled_at != 0).count();
                println!("  Resources known:   {}", resources.len());
                println!("  Resources crawled: {}", crawled);
            }
            println!("\nRun `spinneret report --site {}` for details.", site.name);
        }
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_report(args: &ArgMatches) {
    let name = args.get_one::<String>("site").expect("required by clap");
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .expect("clap validates the format");
    let output = args.get_one::<PathBuf>("output");

    let db = open_database(args);
    let data = match gather_report_data(&db, name) {
        Ok(Some(data)) => data,
        Ok(None) => {
            eprintln!("{} No site named '{}'", "✗".red().bold(), name);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Failed to gather report data: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let content = match format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => match generate_json_report(&data) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("{} Failed to serialize report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
    };

    match output {
        Some(path) => {
            if let Err(e) = save_report(&content, path) {
                eprintln!("{} Failed to save report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            println!("{} Report saved to {}", "✓".green().bold(), path.display());
        }
        None => print!("{}", content),
    }
}

pub fn handle_plugin_list() {
    let registry = PluginRegistry::builtin();

    println!("{}", "Built-in plugins:".bold());
    for name in registry.names() {
        let plugin = registry
            .resolve(&PluginDefinition::new(name))
            .expect("registry resolves its own names");
        println!("\n  {}", name.bright_white().bold());
        for opt in plugin.opts_schema() {
            println!(
                "    --{:<20} {:<8} {}",
                opt.name,
                format!("[{}]", opt.kind),
                opt.help
            );
        }
    }
    println!();
}
