use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

const DEFAULT_DB: &str = "~/.config/spinneret/spinneret.db";

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("spinneret")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("spinneret")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the spinneret database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the spinneret database")
                        .default_value("~/.config/spinneret/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("site")
                .about("Manage crawl sites")
                .subcommand(
                    command!("add")
                        .about("Adds a site with its plugin pipeline")
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the site"),
                        )
                        .arg(
                            arg!(-u --"url" <URL>)
                                .required(true)
                                .help("The seed URL the crawl starts from")
                                .value_parser(clap::value_parser!(Url)),
                        )
                        .arg(
                            arg!(-p --"plugins" <NAMES>)
                                .required(false)
                                .help("Comma-separated plugin pipeline (default: select,fetch,extract,insert,upsert)"),
                        )
                        .arg(
                            arg!(--"plugins-file" <PATH>)
                                .required(false)
                                .help("JSON file with the full plugin definitions, including options")
                                .value_parser(clap::value_parser!(std::path::PathBuf))
                                .conflicts_with("plugins"),
                        )
                        .arg(
                            arg!(-d --"db" <PATH>)
                                .required(false)
                                .help("Path to the spinneret database")
                                .default_value(DEFAULT_DB),
                        ),
                )
                .subcommand(
                    command!("list").about("List all sites").arg(
                        arg!(-d --"db" <PATH>)
                            .required(false)
                            .help("Path to the spinneret database")
                            .default_value(DEFAULT_DB),
                    ),
                )
                .subcommand(
                    command!("remove")
                        .about("Removes a site and everything crawled from it")
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the site"),
                        )
                        .arg(
                            arg!(-d --"db" <PATH>)
                                .required(false)
                                .help("Path to the spinneret database")
                                .default_value(DEFAULT_DB),
                        ),
                ),
        )
        .subcommand(
            command!("crawl")
                .about("Crawl a site to completion using its configured plugin pipeline")
                .arg(
                    arg!(-s --"site" <NAME>)
                        .required(true)
                        .help("The name of the site to crawl"),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Path to the spinneret database")
                        .default_value(DEFAULT_DB),
                ),
        )
        .subcommand(
            command!("report")
                .about("Generate a report of everything discovered on a site")
                .arg(
                    arg!(-s --"site" <NAME>)
                        .required(true)
                        .help("The name of the site to report on"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-d --"db" <PATH>)
                        .required(false)
                        .help("Path to the spinneret database")
                        .default_value(DEFAULT_DB),
                ),
        )
        .subcommand(
            command!("plugin")
                .about("Inspect the built-in plugins")
                .subcommand(command!("list").about("List all plugins and their options")),
        )
}
