//! `ucistate apply` - converge one section, option or list member

use anyhow::{Context as AnyhowContext, Result};
use ucikit::{Outcome, Request, address};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let request = args.to_request();

    match apply(ctx, &args, &request) {
        Ok(outcome) if args.json => {
            println!("{}", serde_json::to_string(&outcome)?);
            Ok(())
        }
        Ok(outcome) => {
            report(ctx, &request, &outcome);
            Ok(())
        }
        Err(e) if args.json => super::fail_json(&e),
        Err(e) => Err(e),
    }
}

fn apply(ctx: &Context, args: &ApplyArgs, request: &Request) -> Result<Outcome> {
    let client = super::client(ctx.config.as_deref(), &args.tool)?;

    let outcome = if args.dry_run {
        client.check(request)
    } else {
        client.reconcile(request)
    };

    outcome.with_context(|| format!("Cannot reconcile {}", target(request)))
}

fn report(ctx: &Context, request: &Request, outcome: &Outcome) {
    if ctx.quiet {
        return;
    }

    let target = target(request);
    match (outcome.changed, outcome.dry_run) {
        (false, _) => ui::info(&format!("{target}: already {}", request.state)),
        (true, true) => ui::warn(&format!("{target}: would {}", outcome.plan.describe())),
        (true, false) => ui::success(&format!("{target}: {}", outcome.plan.describe())),
    }

    if ctx.verbose > 0 || outcome.dry_run {
        for command in &outcome.commands {
            ui::dim(&format!("uci {command}"));
        }
    }
}

/// The address a request points at, for messages
fn target(request: &Request) -> String {
    match address::derive(request) {
        Ok(addrs) => addrs.key.unwrap_or(addrs.section).to_string(),
        Err(_) => request.package.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target() {
        let req = Request::new("dhcp").section("lan").name("start");
        assert_eq!(target(&req), "dhcp.lan.start");

        let req = Request::new("dhcp").section_type("dnsmasq");
        assert_eq!(target(&req), "dhcp.@dnsmasq[0]");

        assert_eq!(target(&Request::new("dhcp")), "dhcp");
    }
}
