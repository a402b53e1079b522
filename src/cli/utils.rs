use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a value as pretty JSON
pub fn output_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a percentage as a fixed-width bar for text output
pub fn percentage_bar(percentage: u8) -> String {
    let filled = (usize::from(percentage.min(100)) + 5) / 10;
    format!("[{}{}] {:>3}%", "#".repeat(filled), ".".repeat(10 - filled), percentage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_rounds_to_tenths() {
        assert_eq!(percentage_bar(0), "[..........]   0%");
        assert_eq!(percentage_bar(55), "[######....]  55%");
        assert_eq!(percentage_bar(100), "[##########] 100%");
    }
}
