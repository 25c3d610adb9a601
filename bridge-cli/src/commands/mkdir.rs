//! Create a folder under the root location.

use anyhow::{Context, Result};
use bridge_client::Credentials;

use super::{establish, Output};
use crate::config::ScenarioConfig;

/// Run the mkdir command.
pub fn run(
    credentials: Credentials,
    scenario: &ScenarioConfig,
    name: &str,
    output: Output,
) -> Result<()> {
    let mut session = establish(credentials, scenario)?;
    let created = session.sequencer.create_folder(name)?;

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        Output::Text => {
            let node = created
                .payload()
                .node()
                .context("Folder created but no handle reported")?;
            println!("Created {} under {}: {}", name, session.root, node);
        }
    }
    Ok(())
}
