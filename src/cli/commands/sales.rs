use clap::Subcommand;
use serde_json::json;

use crate::api::SaleLink;
use crate::cli::utils::{output_success, output_value, read_json_argument};
use crate::cli::OutputFormat;
use crate::gateway::Gateway;

#[derive(Subcommand)]
pub enum SalesCommands {
    #[command(about = "List items attached to a sale")]
    List {
        #[arg(value_enum, help = "Attached collection")]
        link: SaleLink,
        #[arg(help = "Sale ID")]
        sale_id: String,
    },

    #[command(about = "Attach an item to a sale")]
    Add {
        #[arg(value_enum, help = "Attached collection")]
        link: SaleLink,
        #[arg(help = "Sale ID")]
        sale_id: String,
        #[arg(long, help = "JSON body, or - to read stdin")]
        data: String,
    },

    #[command(about = "Detach an item from a sale")]
    Remove {
        #[arg(value_enum, help = "Attached collection")]
        link: SaleLink,
        #[arg(help = "Sale ID")]
        sale_id: String,
        #[arg(help = "Attached item ID")]
        item_id: String,
    },
}

pub async fn handle(cmd: SalesCommands, gateway: &Gateway, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SalesCommands::List { link, sale_id } => {
            let items = gateway.sale_links(sale_id, link).list().await?;
            output_value(&output_format, link.segment(), &items)
        }
        SalesCommands::Add { link, sale_id, data } => {
            let body = read_json_argument(&data)?;
            let item = gateway.sale_links(sale_id.as_str(), link).add(body).await?;
            output_success(
                &output_format,
                &format!("Added {} to sale {}", link.segment(), sale_id),
                Some(json!({ "item": item })),
            )
        }
        SalesCommands::Remove { link, sale_id, item_id } => {
            gateway.sale_links(sale_id.as_str(), link).remove(&item_id).await?;
            output_success(
                &output_format,
                &format!("Removed {} {} from sale {}", link.segment(), item_id, sale_id),
                None,
            )
        }
    }
}
