use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::{utils::output_success, OutputFormat};
use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a bearer token signed with JWT_SECRET")]
    Token {
        #[arg(help = "User id (token subject)")]
        uid: String,
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Lifetime in hours, at most one year (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

pub async fn handle(cmd: AuthCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Token { uid, email, hours } => {
            let hours = hours.unwrap_or(config.security.jwt_expiry_hours);
            let claims = Claims::new(uid, email, hours);
            let token = generate_jwt(&claims, &config.security.jwt_secret)?;

            match output_format {
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    output_format,
                    "Token issued",
                    Some(json!({ "token": token, "expiresAt": claims.exp })),
                )?,
            }
            Ok(())
        }
    }
}
