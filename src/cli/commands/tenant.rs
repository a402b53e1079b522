use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::Tenant;
use crate::services::TenantContextView;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "List organizations you belong to")]
    List,

    #[command(about = "Show the current organization")]
    Current,

    #[command(about = "Switch to another organization (persistent selection)")]
    Use {
        #[arg(help = "Tenant id")]
        tenant: Uuid,
    },

    #[command(about = "Create an organization owned by you")]
    Create {
        #[arg(help = "Organization name")]
        name: String,
        #[arg(help = "Subdomain (lowercase letters, numbers, hyphens)")]
        subdomain: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut env_config = load_environment_config()?;
    let client = ApiClient::from_env(&env_config)?;

    match cmd {
        TenantCommands::List => {
            let context: TenantContextView = client.get("/api/tenants").await?;
            remember_current(&mut env_config, &context)?;

            match output_format {
                OutputFormat::Json => output_json(&context),
                OutputFormat::Text => {
                    if context.needs_onboarding {
                        println!("No organizations yet. Create one with 'careflow tenant create <name> <subdomain>'");
                        return Ok(());
                    }

                    let current = context.current_tenant.as_ref().map(|t| t.id);
                    println!("{:<38} {:<28} {:<16} {}", "ID", "NAME", "SUBDOMAIN", "ROLE");
                    println!("{}", "-".repeat(92));
                    for tenant in &context.tenants {
                        let marker = if Some(tenant.id) == current { "*" } else { " " };
                        let role = context
                            .memberships
                            .iter()
                            .find(|m| m.tenant_id == tenant.id)
                            .map(|m| format!("{:?}", m.role).to_lowercase())
                            .unwrap_or_else(|| "-".to_string());
                        println!("{}{:<37} {:<28} {:<16} {}", marker, tenant.id, tenant.name, tenant.subdomain, role);
                    }
                    Ok(())
                }
            }
        }
        TenantCommands::Current => {
            let context: TenantContextView = client.get("/api/tenants").await?;
            remember_current(&mut env_config, &context)?;

            match (&output_format, &context.current_tenant) {
                (OutputFormat::Json, _) => output_json(&json!({
                    "current_tenant": context.current_tenant,
                    "can_access_careflow": context.can_access_careflow,
                    "can_access_novumflow": context.can_access_novumflow,
                })),
                (OutputFormat::Text, Some(tenant)) => {
                    print_tenant(tenant);
                    println!("CareFlow: {}", if context.can_access_careflow { "enabled" } else { "disabled" });
                    println!("NovumFlow: {}", if context.can_access_novumflow { "enabled" } else { "disabled" });
                    Ok(())
                }
                (OutputFormat::Text, None) => {
                    println!("No current tenant set");
                    Ok(())
                }
            }
        }
        TenantCommands::Use { tenant } => {
            let context: TenantContextView = client
                .post("/api/tenants/switch", &json!({ "tenant_id": tenant }))
                .await?;
            remember_current(&mut env_config, &context)?;

            let name = context
                .current_tenant
                .as_ref()
                .map(|t| t.name.clone())
                .unwrap_or_else(|| tenant.to_string());
            output_success(
                &output_format,
                &format!("Switched to tenant '{}'", name),
                Some(json!({ "current_tenant": tenant })),
            )
        }
        TenantCommands::Create { name, subdomain } => {
            let tenant: Tenant = client
                .post("/api/tenants", &json!({ "name": name, "subdomain": subdomain }))
                .await?;
            output_success(
                &output_format,
                &format!("Tenant '{}' created ({})", tenant.name, tenant.id),
                Some(json!({ "tenant": tenant })),
            )
        }
    }
}

/// Persist whatever the server resolved so later calls stay on it
fn remember_current(env_config: &mut EnvironmentConfig, context: &TenantContextView) -> anyhow::Result<()> {
    let current = context.current_tenant.as_ref().map(|t| t.id);
    if env_config.current_tenant != current {
        env_config.current_tenant = current;
        save_environment_config(env_config)?;
    }
    Ok(())
}

fn print_tenant(tenant: &Tenant) {
    println!("Tenant: {}", tenant.name);
    println!("ID: {}", tenant.id);
    println!("Subdomain: {}", tenant.subdomain);
    println!("Tier: {:?}", tenant.subscription_tier);
    if let Some(status) = tenant.subscription_status {
        println!("Status: {:?}", status);
    }
}
