//! `ucistate get` - read one value through uci

use anyhow::{Result, bail};
use ucikit::Address;

use crate::Context;
use crate::cli::GetArgs;

pub fn run(ctx: &Context, args: GetArgs) -> Result<()> {
    let address = Address::new(args.address.as_str());

    let value = match super::client(ctx.config.as_deref(), &args.tool)
        .and_then(|client| client.get(&address).map_err(Into::into))
    {
        Ok(value) => value,
        Err(e) if args.json => super::fail_json(&e),
        Err(e) => return Err(e),
    };

    if args.json {
        let body = serde_json::json!({ "address": address, "value": value });
        println!("{body}");
        return Ok(());
    }

    match value {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => bail!("{address}: entry not found"),
    }
}
