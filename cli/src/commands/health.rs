use anyhow::Result;
use colored::*;
use serde_json::json;

use crate::settings::Settings;

/// Execute the health check command
pub async fn execute(settings: &Settings, format: &str) -> Result<()> {
    let health_status = check_system_health(settings).await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&health_status)?),
        _ => print_health_status_text(&health_status),
    }

    Ok(())
}

/// Check the health of various system components
async fn check_system_health(settings: &Settings) -> serde_json::Value {
    let mut status = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {
            "database": check_database_health(settings).await,
            "configuration": check_configuration_health(settings),
            "server": check_server_health(settings).await,
        }
    });

    let all_healthy = status["components"]
        .as_object()
        .map(|components| {
            components
                .values()
                .all(|v| v["status"].as_str().unwrap_or("unknown") == "healthy")
        })
        .unwrap_or(false);
    if !all_healthy {
        status["status"] = json!("degraded");
    }

    status
}

/// Database file present, reachable and migrated
async fn check_database_health(settings: &Settings) -> serde_json::Value {
    let db_path = settings.database_path();
    let path = db_path.display().to_string();

    if !db_path.exists() {
        return json!({
            "status": "not_initialized",
            "message": "Database file does not exist yet",
            "path": path
        });
    }

    let db = match database::initialize_database(settings.database_config()).await {
        Ok(db) => db,
        Err(e) => {
            return json!({
                "status": "unhealthy",
                "message": format!("Database exists but cannot be accessed: {}", e),
                "path": path
            })
        }
    };

    let mut missing = Vec::new();
    for table in ["app_user", "blog_article", "blog_category", "tag"] {
        match db.table_exists(table).await {
            Ok(true) => {}
            Ok(false) => missing.push(table),
            Err(e) => {
                return json!({
                    "status": "unhealthy",
                    "message": format!("Failed to inspect schema: {}", e),
                    "path": path
                })
            }
        }
    }

    if missing.is_empty() {
        json!({
            "status": "healthy",
            "message": "Database is accessible and migrated",
            "path": path
        })
    } else {
        json!({
            "status": "warning",
            "message": "Tables are missing; run `inklog serve` once to migrate",
            "missing": missing,
            "path": path
        })
    }
}

fn check_configuration_health(settings: &Settings) -> serde_json::Value {
    let secret = if std::env::var("SESSION_SECRET_KEY").is_ok() {
        "set"
    } else {
        "missing"
    };
    let status = if secret == "missing" && settings.is_production() {
        "unhealthy"
    } else {
        "healthy"
    };

    json!({
        "status": status,
        "message": match &settings.source {
            Some(source) => format!("Loaded from {}", source.display()),
            None => "Using defaults and environment variables".to_string(),
        },
        "environment": settings.environment,
        "session_secret": secret
    })
}

/// Whether a server answers on the configured address
async fn check_server_health(settings: &Settings) -> serde_json::Value {
    let endpoint = format!("http://{}:{}", settings.host, settings.port);
    let url = format!("{}/health", endpoint);

    match reqwest::get(&url).await {
        Ok(response) if response.status().is_success() => json!({
            "status": "healthy",
            "message": "Server is running and responsive",
            "endpoint": endpoint
        }),
        Ok(response) => json!({
            "status": "unhealthy",
            "message": format!("Server returned status: {}", response.status()),
            "endpoint": endpoint
        }),
        Err(_) => json!({
            "status": "offline",
            "message": "Server is not running or not reachable",
            "endpoint": endpoint
        }),
    }
}

/// Print health status in a formatted text output
fn print_health_status_text(status: &serde_json::Value) {
    println!("{}", "=== Inklog System Health Check ===".bold());
    println!();

    let overall_status = status["status"].as_str().unwrap_or("unknown");
    let status_display = match overall_status {
        "healthy" => "HEALTHY".green().bold(),
        "degraded" => "DEGRADED".yellow().bold(),
        "unhealthy" => "UNHEALTHY".red().bold(),
        _ => "UNKNOWN".white().bold(),
    };

    println!("Overall Status: {}", status_display);
    println!("Timestamp: {}", status["timestamp"].as_str().unwrap_or(""));
    println!();

    println!("{}", "Components:".bold());
    println!("{}", "─".repeat(50));

    if let Some(components) = status["components"].as_object() {
        for (name, component) in components {
            let comp_status = component["status"].as_str().unwrap_or("unknown");
            let status_icon = match comp_status {
                "healthy" => "✓".green(),
                "unhealthy" => "✗".red(),
                "warning" => "⚠".yellow(),
                "offline" | "not_initialized" => "○".white(),
                _ => "?".white(),
            };

            println!(
                "{} {} ({})",
                status_icon,
                name.to_uppercase().bold(),
                comp_status
            );
            if let Some(message) = component["message"].as_str() {
                println!("  {}", message);
            }
            if let Some(missing) = component["missing"].as_array() {
                let tables: Vec<&str> = missing.iter().filter_map(|t| t.as_str()).collect();
                println!("  Missing tables: {}", tables.join(", "));
            }
            println!();
        }
    }
}
