//! Config command implementations.

use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{Settings, Source};
use crate::error::Result;

/// Execute config commands.
///
/// # Errors
///
/// Returns an error if the configuration cannot be resolved.
pub fn execute(
    command: &ConfigCommands,
    api_url: Option<&str>,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    match command {
        ConfigCommands::Show => show(api_url, timeout, json),
    }
}

fn show(api_url: Option<&str>, timeout: Option<u64>, json: bool) -> Result<()> {
    let settings = Settings::resolve(api_url, timeout)?;

    if json {
        println!("{}", serde_json::to_string(&settings)?);
        return Ok(());
    }

    println!("API URL:     {} {}", settings.api_url, source_label(settings.api_url_source));
    println!(
        "Timeout:     {}s {}",
        settings.timeout_secs,
        source_label(settings.timeout_source)
    );
    match &settings.config_path {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} {}", path.display(), "(not found)".dimmed()),
        None => println!("Config file: {}", "(no home directory)".dimmed()),
    }
    Ok(())
}

fn source_label(source: Source) -> colored::ColoredString {
    let label = match source {
        Source::Flag => "(flag)",
        Source::Env => "(env)",
        Source::File => "(config file)",
        Source::Default => "(default)",
    };
    label.dimmed()
}
