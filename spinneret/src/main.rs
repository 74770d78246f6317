use commands::command_argument_builder;
use handlers::{
    handle_crawl, handle_init, handle_plugin_list, handle_report, handle_site_add,
    handle_site_list, handle_site_remove, print_banner,
};

mod commands;
mod handlers;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command),
        Some(("site", primary_command)) => match primary_command.subcommand() {
            Some(("add", secondary_command)) => handle_site_add(secondary_command),
            Some(("list", secondary_command)) => handle_site_list(secondary_command),
            Some(("remove", secondary_command)) => handle_site_remove(secondary_command),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        Some(("crawl", primary_command)) => handle_crawl(primary_command).await,
        Some(("report", primary_command)) => handle_report(primary_command),
        Some(("plugin", primary_command)) => match primary_command.subcommand() {
            Some(("list", _)) => handle_plugin_list(),
            _ => unreachable!("clap should ensure we don't get here"),
        },
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
