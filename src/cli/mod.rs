pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{config, GatewayConfig};
use crate::gateway::Gateway;

#[derive(Parser)]
#[command(name = "tourdesk")]
#[command(about = "TourDesk CLI - Command-line client for the TourDesk management API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "CRUD operations on business resources")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Payments, accessories and customers attached to a sale")]
    Sales {
        #[command(subcommand)]
        cmd: commands::sales::SalesCommands,
    },

    #[command(about = "Dashboard statistics and recent activity")]
    Dashboard {
        #[command(subcommand)]
        cmd: commands::dashboard::DashboardCommands,
    },

    #[command(about = "Notification management")]
    Notifications {
        #[command(subcommand)]
        cmd: commands::notifications::NotificationCommands,
    },

    #[command(about = "Inspect client configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Gateway over the persisted session, announcing forced logouts on stderr
fn connect(config: &GatewayConfig) -> anyhow::Result<(Gateway, crate::session::Subscription)> {
    let gateway = Gateway::from_config(config)?;
    let subscription = gateway.on_forced_logout(|event| {
        eprintln!("{} Run `tourdesk auth login` to continue.", event.message);
    });
    Ok((gateway, subscription))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = config();

    match cli.command {
        Commands::Config { cmd } => commands::config::handle(cmd, config, output_format),
        Commands::Auth { cmd } => {
            let (gateway, _subscription) = connect(config)?;
            commands::auth::handle(cmd, &gateway, output_format).await
        }
        Commands::Data { cmd } => {
            let (gateway, _subscription) = connect(config)?;
            commands::data::handle(cmd, &gateway, output_format).await
        }
        Commands::Sales { cmd } => {
            let (gateway, _subscription) = connect(config)?;
            commands::sales::handle(cmd, &gateway, output_format).await
        }
        Commands::Dashboard { cmd } => {
            let (gateway, _subscription) = connect(config)?;
            commands::dashboard::handle(cmd, &gateway, output_format).await
        }
        Commands::Notifications { cmd } => {
            let (gateway, _subscription) = connect(config)?;
            commands::notifications::handle(cmd, &gateway, output_format).await
        }
    }
}
