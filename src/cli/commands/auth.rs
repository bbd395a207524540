use clap::Subcommand;
use serde_json::json;
use std::io::Write;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::gateway::Gateway;
use crate::types::{Credentials, Registration, SessionUser};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the TourDesk API")]
    Login {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Register a new account and log in")]
    Register {
        #[arg(help = "Full name")]
        name: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Company name")]
        company: Option<String>,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and discard the stored session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh the token pair now")]
    Refresh,

    #[command(about = "Show current user information from the server")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, gateway: &Gateway, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password } => {
            let password = resolve_password(password)?;
            let user = gateway.auth().login(&Credentials { email, password }).await?;
            output_success(
                &output_format,
                &format!("Logged in as {}", user.email),
                Some(json!({ "user": user })),
            )
        }
        AuthCommands::Register { name, email, company, password } => {
            let password = resolve_password(password)?;
            let user = gateway
                .auth()
                .register(&Registration {
                    name,
                    email,
                    password,
                    company_name: company,
                })
                .await?;
            output_success(
                &output_format,
                &format!("Registered and logged in as {}", user.email),
                Some(json!({ "user": user })),
            )
        }
        AuthCommands::Logout => {
            gateway.auth().logout().await?;
            output_success(&output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let session = gateway.store().snapshot();
            match (session.tokens(), session.user) {
                (Some(_), Some(user)) => output_success(
                    &output_format,
                    &describe(&user),
                    Some(json!({ "authenticated": true, "user": user, "updatedAt": session.updated_at })),
                ),
                _ => output_error(&output_format, "Not logged in", Some("NOT_AUTHENTICATED")),
            }
        }
        AuthCommands::Refresh => {
            gateway.auth().refresh().await?;
            output_success(&output_format, "Token pair refreshed", None)
        }
        AuthCommands::Whoami => match gateway.auth().restore_session().await? {
            Some(user) => output_success(&output_format, &describe(&user), Some(json!({ "user": user }))),
            None => output_error(&output_format, "Not logged in", Some("NOT_AUTHENTICATED")),
        },
    }
}

fn describe(user: &SessionUser) -> String {
    match &user.company_name {
        Some(company) => format!("{} <{}> ({:?}, {})", user.name, user.email, user.role, company),
        None => format!("{} <{}> ({:?})", user.name, user.email, user.role),
    }
}

fn resolve_password(provided: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }

    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
