use anyhow::{anyhow, Result};
use authz::RoleSet;
use colored::*;
use ::user::UserRepository;

use super::open_state;
use crate::settings::Settings;

/// Create an account from the command line
pub async fn create(
    settings: &Settings,
    email: &str,
    username: &str,
    password: &str,
    roles: &[String],
) -> Result<()> {
    let roles = RoleSet::parse(roles)?;
    let state = open_state(settings).await?;

    let user = state
        .users
        .create_user(email, username, password, roles)
        .await
        .map_err(|e| anyhow!("Could not create {}: {}", email, e))?;

    println!(
        "{} Created {} ({}) with roles {}",
        "✓".green(),
        user.email().bold(),
        user.username,
        user.role_tokens().join(", ")
    );
    Ok(())
}

/// List accounts
pub async fn list(settings: &Settings, format: &str) -> Result<()> {
    let state = open_state(settings).await?;
    let users = state.users.database().list().await?;

    match format {
        "json" => {
            let rows: Vec<serde_json::Value> = users
                .iter()
                .map(|user| {
                    serde_json::json!({
                        "id": user.id,
                        "email": user.email(),
                        "username": user.username,
                        "roles": user.role_tokens(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            if users.is_empty() {
                println!("{}", "No accounts yet.".yellow());
                return Ok(());
            }
            println!("{}", format!("{:<6} {:<32} {:<20} ROLES", "ID", "EMAIL", "USERNAME").bold());
            for user in &users {
                println!(
                    "{:<6} {:<32} {:<20} {}",
                    user.id.unwrap_or_default(),
                    user.email(),
                    user.username,
                    user.role_tokens().join(", ")
                );
            }
        }
    }
    Ok(())
}
