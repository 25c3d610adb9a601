//! Show account storage usage and plan.

use anyhow::Result;
use bridge_client::{AccountDetails, Credentials};

use super::{establish, Output};
use crate::config::ScenarioConfig;

/// Run the account command.
pub fn run(credentials: Credentials, scenario: &ScenarioConfig, output: Output) -> Result<()> {
    let session = establish(credentials, scenario)?;
    println!("{}", render(&session.root.to_string(), session.details.as_ref(), output)?);
    Ok(())
}

fn render(root: &str, details: Option<&AccountDetails>, output: Output) -> Result<String> {
    match output {
        Output::Json => {
            let value = serde_json::json!({
                "root": root,
                "account": details.map(|d| serde_json::json!({
                    "storage_used": d.storage_used,
                    "storage_max": d.storage_max,
                    "usage_percent": d.usage_percent(),
                    "pro_level": d.pro_level,
                })),
            });
            Ok(serde_json::to_string_pretty(&value)?)
        }
        Output::Text => {
            let mut lines = vec![format!("Root:      {}", root)];
            match details {
                Some(details) => {
                    lines.push(format!("Storage:   {}", details));
                    lines.push(format!("Pro level: {}", details.pro_level));
                }
                None => lines.push("Storage:   unavailable".to_string()),
            }
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_shows_usage_and_plan() {
        let details = AccountDetails::new(50, 100, 1);
        let text = render("AAAAAAAq", Some(&details), Output::Text).unwrap();
        assert!(text.contains("Storage:   50/100 (50%)"));
        assert!(text.contains("Pro level: 1"));
    }

    #[test]
    fn text_without_details() {
        let text = render("AAAAAAAq", None, Output::Text).unwrap();
        assert!(text.contains("unavailable"));
    }

    #[test]
    fn json_carries_percent() {
        let details = AccountDetails::new(1, 4, 0);
        let json = render("AAAAAAAq", Some(&details), Output::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["root"], "AAAAAAAq");
        assert_eq!(value["account"]["usage_percent"], 25);
    }

    #[test]
    fn json_without_details_is_null() {
        let json = render("AAAAAAAq", None, Output::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["account"].is_null());
    }
}
