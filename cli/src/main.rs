use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod commands;
mod logging;
mod settings;

use commands::{config, health, serve, user};
use settings::Settings;

/// Inklog CLI - Command line interface for the Inklog blog
#[derive(Parser)]
#[command(name = "inklog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to bind (overrides the configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Account management commands
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check system health and status
    Health {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        #[arg(long, env = "INKLOG_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Role to grant, repeatable (admin, super_admin or ROLE_* tokens)
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// List accounts
    List {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved settings
    Show {
        /// Output format (json, yaml, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Commands::Serve { host, port } = cli.command {
        return serve::execute(settings, host, port, cli.verbose).await;
    }

    logging::init_console(cli.verbose);

    let result = match cli.command {
        Commands::Serve { .. } => Ok(()),
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                username,
                password,
                roles,
            } => user::create(&settings, &email, &username, &password, &roles).await,
            UserAction::List { format } => user::list(&settings, &format).await,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(&settings, &format),
        },
        Commands::Health { format } => health::execute(&settings, &format).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
