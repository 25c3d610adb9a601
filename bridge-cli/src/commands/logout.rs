//! Run the session, then log out.

use anyhow::Result;
use bridge_client::Credentials;

use super::{establish, Output};
use crate::config::ScenarioConfig;

/// Run the logout command.
pub fn run(credentials: Credentials, scenario: &ScenarioConfig, output: Output) -> Result<()> {
    let mut session = establish(credentials, scenario)?;
    let outcome = session.sequencer.logout()?;

    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Output::Text => println!("Logged out"),
    }
    Ok(())
}
