use std::collections::BTreeMap;

use clap::Subcommand;
use uuid::Uuid;

use crate::cli::client::ApiClient;
use crate::cli::config::load_environment_config;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::{ComplianceStatus, FleetSummary, ShiftEligibility};

#[derive(Subcommand)]
pub enum ComplianceCommands {
    #[command(about = "Compliance of one staff member")]
    Check {
        #[arg(help = "Staff id")]
        staff_id: Uuid,
    },

    #[command(about = "Compliance of every active staff member")]
    All,

    #[command(about = "Tenant-wide counts and staff needing attention")]
    Summary,

    #[command(about = "Whether a staff member may be assigned to a shift")]
    CanAssign {
        #[arg(help = "Staff id")]
        staff_id: Uuid,
    },
}

pub async fn handle(cmd: ComplianceCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::from_env(&load_environment_config()?)?;

    match cmd {
        ComplianceCommands::Check { staff_id } => {
            let status: ComplianceStatus = client.get(&format!("/api/compliance/staff/{}", staff_id)).await?;
            match output_format {
                OutputFormat::Json => output_json(&status),
                OutputFormat::Text => {
                    print_status(&status);
                    Ok(())
                }
            }
        }
        ComplianceCommands::All => {
            let statuses: BTreeMap<Uuid, ComplianceStatus> = client.get("/api/compliance/staff").await?;
            match output_format {
                OutputFormat::Json => output_json(&statuses),
                OutputFormat::Text => {
                    if statuses.is_empty() {
                        println!("No active staff");
                        return Ok(());
                    }
                    println!("{:<38} {:<18} {:<10} {}", "STAFF", "SCORE", "RTW", "COMPLIANT");
                    println!("{}", "-".repeat(78));
                    for (id, status) in &statuses {
                        println!(
                            "{:<38} {:<18} {:<10} {}",
                            id,
                            percentage_bar(status.compliance_percentage),
                            format!("{:?}", status.rtw_status).to_lowercase(),
                            if status.is_compliant { "yes" } else { "no" }
                        );
                    }
                    Ok(())
                }
            }
        }
        ComplianceCommands::Summary => {
            let summary: FleetSummary = client.get("/api/compliance/summary").await?;
            match output_format {
                OutputFormat::Json => output_json(&summary),
                OutputFormat::Text => {
                    println!("Staff: {}", summary.total_staff);
                    println!("Compliant: {}", summary.compliant);
                    println!("Partial: {}", summary.partial);
                    println!("Non-compliant: {}", summary.non_compliant);
                    println!("Overall: {}", percentage_bar(summary.overall_compliance_rate));
                    if !summary.attention.is_empty() {
                        println!();
                        println!("Needs attention:");
                        for staff in &summary.attention {
                            println!("  {} {}", percentage_bar(staff.compliance_percentage), staff.name);
                        }
                    }
                    Ok(())
                }
            }
        }
        ComplianceCommands::CanAssign { staff_id } => {
            let eligibility: ShiftEligibility = client
                .get(&format!("/api/compliance/staff/{}/shift-eligibility", staff_id))
                .await?;
            match output_format {
                OutputFormat::Json => output_json(&eligibility),
                OutputFormat::Text => {
                    if eligibility.allowed {
                        println!("✓ {} can be assigned", staff_id);
                    } else {
                        println!("✗ {}", eligibility.reason.as_deref().unwrap_or("Blocked"));
                    }
                    Ok(())
                }
            }
        }
    }
}

fn print_status(status: &ComplianceStatus) {
    println!("Staff: {}", status.staff_id);
    println!("Compliant: {}", if status.is_compliant { "yes" } else { "no" });
    println!("Score: {} ({:?})", percentage_bar(status.compliance_percentage), status.band());
    println!("Right to work: {:?}", status.rtw_status);
    println!("DBS: {:?}", status.dbs_status);
    println!("Training: {:?}", status.training_status);
    if !status.missing_documents.is_empty() {
        println!("Missing: {}", status.missing_documents.join(", "));
    }
    if !status.expired_documents.is_empty() {
        println!("Expired: {}", status.expired_documents.join(", "));
    }
    match status.last_synced_at {
        Some(at) => println!("Synced from NovumFlow: {}", at.format("%Y-%m-%d %H:%M UTC")),
        None if status.synced_from_novumflow => println!("Synced from NovumFlow"),
        None => println!("Not synced from NovumFlow"),
    }
}
