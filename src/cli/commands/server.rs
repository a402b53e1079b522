use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Point the CLI at a server URL")]
    Use {
        #[arg(help = "Server base URL, e.g. http://localhost:3000")]
        url: String,
    },

    #[command(about = "Show the selected server")]
    Current,

    #[command(about = "Check server health from the /health endpoint")]
    Health,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Use { url } => {
            let parsed = url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow::anyhow!("Server URL must use http or https"));
            }

            let mut env_config = load_environment_config()?;
            env_config.current_server = Some(url.trim_end_matches('/').to_string());
            env_config.last_health = None;
            save_environment_config(&env_config)?;

            output_success(
                &output_format,
                &format!("Switched to server '{}'", env_config.server_url()),
                Some(json!({ "current_server": env_config.server_url() })),
            )
        }
        ServerCommands::Current => {
            let env_config = load_environment_config()?;
            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "current_server": env_config.server_url(),
                    "last_health": env_config.last_health,
                })),
                OutputFormat::Text => {
                    println!("Current server: {}", env_config.server_url());
                    if let Some(health) = &env_config.last_health {
                        println!(
                            "Last health: {:?} at {}",
                            health.status,
                            health.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
                        );
                    }
                    Ok(())
                }
            }
        }
        ServerCommands::Health => {
            let mut env_config = load_environment_config()?;
            let client = ApiClient::from_env(&env_config)?;

            let (status, body) = match client.get_raw("/health").await {
                Ok(result) => result,
                Err(e) => {
                    env_config.last_health = Some(HealthRecord {
                        status: ServerStatus::Down,
                        checked_at: Utc::now(),
                    });
                    save_environment_config(&env_config)?;
                    return Err(anyhow::anyhow!("Server {} unreachable: {}", env_config.server_url(), e));
                }
            };

            let server_status = if status.is_success() { ServerStatus::Up } else { ServerStatus::Down };
            env_config.last_health = Some(HealthRecord {
                status: server_status,
                checked_at: Utc::now(),
            });
            save_environment_config(&env_config)?;

            match output_format {
                OutputFormat::Json => output_json(&body),
                OutputFormat::Text => {
                    let label = match server_status {
                        ServerStatus::Up => "UP",
                        ServerStatus::Down => "DOWN",
                    };
                    println!("{} {} (HTTP {})", env_config.server_url(), label, status.as_u16());
                    Ok(())
                }
            }
        }
    }
}
