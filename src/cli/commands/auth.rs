use chrono::{TimeZone, Utc};
use clap::Subcommand;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Mint a signed token for a user id and store it")]
    Token {
        #[arg(help = "User id (JWT subject)")]
        user_id: Uuid,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
        #[arg(long, env = "SECURITY_JWT_SECRET", hide_env_values = true, help = "HS256 signing secret")]
        secret: String,
        #[arg(long, help = "Token lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Store a token issued elsewhere")]
    Set {
        #[arg(help = "Bearer token")]
        token: String,
    },

    #[command(about = "Show the stored token's subject and expiry")]
    Status,

    #[command(about = "Forget the stored token")]
    Logout,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Token { user_id, email, secret, hours } => {
            let hours = hours.unwrap_or(config::config().security.jwt_expiry_hours);
            let token = generate_jwt(&Claims::new(user_id, email, hours), &secret)?;
            store_token(token.clone())?;
            output_success(
                &output_format,
                &format!("Token stored for user {}", user_id),
                Some(json!({ "token": token })),
            )
        }
        AuthCommands::Set { token } => {
            let claims = inspect(&token)?;
            store_token(token)?;
            output_success(
                &output_format,
                &format!("Token stored for user {}", claims.sub),
                Some(json!({ "user_id": claims.sub })),
            )
        }
        AuthCommands::Status => {
            let env_config = load_environment_config()?;
            let Some(token) = env_config.token else {
                return match output_format {
                    OutputFormat::Json => output_json(&json!({ "authenticated": false })),
                    OutputFormat::Text => {
                        println!("Not authenticated");
                        Ok(())
                    }
                };
            };

            let claims = inspect(&token)?;
            let expired = claims.exp <= Utc::now().timestamp();
            let expires = Utc.timestamp_opt(claims.exp, 0).single();

            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "authenticated": !expired,
                    "user_id": claims.sub,
                    "email": claims.email,
                    "expires_at": expires,
                })),
                OutputFormat::Text => {
                    println!("User: {}", claims.sub);
                    if let Some(email) = &claims.email {
                        println!("Email: {}", email);
                    }
                    if let Some(expires) = expires {
                        let state = if expired { "expired" } else { "valid" };
                        println!("Token: {} (expires {})", state, expires.format("%Y-%m-%d %H:%M UTC"));
                    }
                    Ok(())
                }
            }
        }
        AuthCommands::Logout => {
            let mut env_config = load_environment_config()?;
            env_config.token = None;
            env_config.current_tenant = None;
            save_environment_config(&env_config)?;
            output_success(&output_format, "Logged out", None)
        }
    }
}

fn store_token(token: String) -> anyhow::Result<()> {
    let mut env_config = load_environment_config()?;
    env_config.token = Some(token);
    env_config.current_tenant = None;
    save_environment_config(&env_config)
}

/// Read claims without verifying the signature; the server verifies
fn inspect(token: &str) -> anyhow::Result<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| anyhow::anyhow!("Not a valid token: {}", e))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_reads_claims_signed_with_any_secret() {
        let user = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(user, None, 1), "server-side-secret").unwrap();
        assert_eq!(inspect(&token).unwrap().sub, user);
        assert!(inspect("not-a-token").is_err());
    }
}
