use clap::Subcommand;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::gateway::Gateway;

#[derive(Subcommand)]
pub enum NotificationCommands {
    #[command(about = "Mark a notification as read")]
    Read {
        #[arg(help = "Notification ID")]
        id: String,
    },
}

pub async fn handle(cmd: NotificationCommands, gateway: &Gateway, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        NotificationCommands::Read { id } => {
            gateway.mark_notification_read(&id).await?;
            output_success(&output_format, &format!("Notification {} marked as read", id), None)
        }
    }
}
