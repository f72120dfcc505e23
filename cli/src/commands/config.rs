use anyhow::Result;
use colored::*;

use crate::settings::Settings;

/// Print the resolved settings. The session secret is never shown.
pub fn show(settings: &Settings, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(settings)?),
        "yaml" => print!("{}", serde_yaml::to_string(settings)?),
        _ => print_settings_text(settings),
    }
    Ok(())
}

fn print_settings_text(settings: &Settings) {
    println!("{}", "=== Inklog Configuration ===".bold());
    println!();
    match &settings.source {
        Some(source) => println!("Source: {}", source.display()),
        None => println!("Source: {}", "defaults and environment".italic()),
    }
    println!();

    let rows = [
        ("environment", settings.environment.clone()),
        ("data_dir", settings.data_dir.display().to_string()),
        ("database_path", settings.database_path().display().to_string()),
        ("max_connections", settings.max_connections.to_string()),
        ("host", settings.host.clone()),
        ("port", settings.port.to_string()),
        ("session.timeout_seconds", settings.session.timeout_seconds.to_string()),
        ("session.secure_cookies", settings.session.secure_cookies.to_string()),
        (
            "session.remember_me_lifetime_seconds",
            settings.session.remember_me_lifetime_seconds.to_string(),
        ),
    ];
    for (key, value) in rows {
        println!("  {}: {}", key.cyan(), value);
    }
}
