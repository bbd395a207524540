use clap::Subcommand;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::GatewayConfig;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the effective configuration")]
    Show,
}

pub fn handle(cmd: ConfigCommands, config: &GatewayConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let session_dir = config.config_dir()?;
            match output_format {
                OutputFormat::Json => {
                    let mut value = serde_json::to_value(config)?;
                    value["session"]["config_dir"] = json!(session_dir);
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Text => {
                    println!("Environment: {:?}", config.environment);
                    println!("API URL: {}", config.api.base_url);
                    println!("Request timeout: {}s", config.api.request_timeout_secs);
                    println!("Refresh timeout: {}s", config.auth.refresh_timeout_secs);
                    println!(
                        "Idle timeout: {}s (grace {}s)",
                        config.session.idle_timeout_secs, config.session.idle_grace_secs
                    );
                    println!("Session directory: {}", session_dir.display());
                }
            }
            Ok(())
        }
    }
}
