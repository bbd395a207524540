use clap::Subcommand;
use serde_json::json;

use crate::api::{ListQuery, Resource};
use crate::cli::utils::{output_success, output_value, read_json_argument};
use crate::cli::OutputFormat;
use crate::gateway::Gateway;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List records of a resource")]
    List {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(long, help = "Free-text search")]
        search: Option<String>,
        #[arg(long, help = "Page number")]
        page: Option<u32>,
        #[arg(long, help = "Page size")]
        limit: Option<u32>,
    },

    #[command(about = "Get a single record")]
    Get {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(help = "Record ID")]
        id: String,
    },

    #[command(about = "Create a record")]
    Create {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(long, help = "JSON body, or - to read stdin")]
        data: String,
    },

    #[command(about = "Update a record")]
    Update {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(help = "Record ID")]
        id: String,
        #[arg(long, help = "JSON body, or - to read stdin")]
        data: String,
    },

    #[command(about = "Delete a record")]
    Delete {
        #[arg(value_enum, help = "Resource name")]
        resource: Resource,
        #[arg(help = "Record ID")]
        id: String,
    },
}

pub async fn handle(cmd: DataCommands, gateway: &Gateway, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DataCommands::List { resource, search, page, limit } => {
            let records = gateway
                .resource(resource)
                .list(&ListQuery { search, page, limit })
                .await?;
            output_value(&output_format, collection_name(resource), &records)
        }
        DataCommands::Get { resource, id } => {
            let record = gateway.resource(resource).get(&id).await?;
            output_value(&output_format, collection_name(resource), &record)
        }
        DataCommands::Create { resource, data } => {
            let body = read_json_argument(&data)?;
            let record = gateway.resource(resource).create(body).await?;
            output_success(
                &output_format,
                &format!("Created record in {}", collection_name(resource)),
                Some(json!({ "record": record })),
            )
        }
        DataCommands::Update { resource, id, data } => {
            let body = read_json_argument(&data)?;
            let record = gateway.resource(resource).update(&id, body).await?;
            output_success(
                &output_format,
                &format!("Updated {} {}", collection_name(resource), id),
                Some(json!({ "record": record })),
            )
        }
        DataCommands::Delete { resource, id } => {
            gateway.resource(resource).delete(&id).await?;
            output_success(
                &output_format,
                &format!("Deleted {} {}", collection_name(resource), id),
                None,
            )
        }
    }
}

fn collection_name(resource: Resource) -> &'static str {
    resource.path().trim_start_matches('/')
}
