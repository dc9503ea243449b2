pub mod apply;
pub mod get;

use anyhow::{Context, Result};
use ucikit::Client;

use crate::cli::ToolArgs;
use crate::config::Config;

/// Build a client from the config file and command-line overrides
fn client(config_path: Option<&std::path::Path>, tool: &ToolArgs) -> Result<Client> {
    let config = Config::load(config_path)?;
    let options = config.uci_options(tool);
    Client::with_options(&options).context("Cannot use uci")
}

/// Print a failure as JSON and exit
fn fail_json(err: &anyhow::Error) -> ! {
    let body = serde_json::json!({
        "changed": false,
        "failed": true,
        "msg": format!("{err:#}"),
    });
    println!("{body}");
    std::process::exit(1)
}
