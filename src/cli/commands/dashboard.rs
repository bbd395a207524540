use clap::Subcommand;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::gateway::Gateway;

#[derive(Subcommand)]
pub enum DashboardCommands {
    #[command(about = "Show dashboard statistics")]
    Stats,

    #[command(about = "Show recent activity")]
    Activity {
        #[arg(long, help = "Maximum number of entries")]
        limit: Option<u32>,
    },
}

pub async fn handle(cmd: DashboardCommands, gateway: &Gateway, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DashboardCommands::Stats => {
            let stats = gateway.dashboard_stats().await?;
            output_value(&output_format, "stats", &stats)
        }
        DashboardCommands::Activity { limit } => {
            let activity = gateway.recent_activity(limit).await?;
            output_value(&output_format, "activities", &activity)
        }
    }
}
