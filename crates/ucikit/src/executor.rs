//! Execution engine - observes the store, plans, and issues writes

use crate::address::{self, Addresses};
use crate::backend::Backend;
use crate::error::Result;
use crate::planner::{self, Plan};
use crate::types::{Observed, Outcome, ReconcileOptions, Request};

/// Read the current state of the addressed entry.
///
/// The section is only queried when the key is absent: an existing key
/// implies an existing section.
pub fn observe(backend: &dyn Backend, addrs: &Addresses) -> Result<Observed> {
    let key_value = match &addrs.key {
        Some(key) => backend.lookup(key)?,
        None => None,
    };

    let section_present = if key_value.is_some() {
        true
    } else {
        backend.lookup(&addrs.section)?.is_some()
    };

    Ok(Observed {
        key_value,
        section_present,
    })
}

/// Issue the writes of `plan`, followed by a single commit.
///
/// Nothing is written when the plan is a no-op or `options.dry_run` is set.
/// The first failing command aborts the run; nothing is retried.
pub fn execute(backend: &dyn Backend, plan: Plan, options: &ReconcileOptions) -> Result<Outcome> {
    let ops = plan.operations();

    let Some(package) = ops.first().map(|op| op.address().package().to_string()) else {
        return Ok(Outcome {
            changed: false,
            plan,
            commands: Vec::new(),
            dry_run: options.dry_run,
        });
    };

    let mut commands: Vec<String> = ops.iter().map(ToString::to_string).collect();
    commands.push(format!("commit {package}"));

    if options.dry_run {
        log::info!("would {}", plan.describe());
        return Ok(Outcome {
            changed: true,
            plan,
            commands,
            dry_run: true,
        });
    }

    for op in &ops {
        log::info!("uci {op}");
        backend.apply(op)?;
    }
    backend.commit(&package)?;

    Ok(Outcome {
        changed: true,
        plan,
        commands,
        dry_run: false,
    })
}

/// Bring the entry described by `request` to its desired state.
pub fn reconcile(
    backend: &dyn Backend,
    request: &Request,
    options: &ReconcileOptions,
) -> Result<Outcome> {
    request.validate()?;

    let addrs = address::derive(request)?;
    let observed = observe(backend, &addrs)?;
    log::debug!(
        "{} observed: value={:?} section_present={}",
        addrs.key.as_ref().unwrap_or(&addrs.section),
        observed.key_value,
        observed.section_present
    );

    let plan = planner::plan(request, &addrs, &observed)?;
    log::debug!("plan: {}", plan.describe());

    execute(backend, plan, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::error::Error;
    use crate::types::{Address, DesiredState, ItemKind};

    fn run(mock: &MockBackend, request: &Request) -> Result<Outcome> {
        reconcile(mock, request, &ReconcileOptions::default())
    }

    #[test]
    fn test_observe_skips_section_when_key_present() {
        let mock = MockBackend::new()
            .with_section("dhcp", "lan", "dhcp")
            .with_option("dhcp.lan.start", "100");
        let addrs = address::derive(&Request::new("dhcp").section("lan").name("start")).unwrap();

        let observed = observe(&mock, &addrs).unwrap();
        assert_eq!(observed.key_value.as_deref(), Some("100"));
        assert!(observed.section_present);
        assert_eq!(mock.commands(), vec!["get dhcp.lan.start"]);
    }

    #[test]
    fn test_observe_missing_key() {
        let mock = MockBackend::new().with_section("dhcp", "lan", "dhcp");
        let addrs = address::derive(&Request::new("dhcp").section("lan").name("start")).unwrap();

        let observed = observe(&mock, &addrs).unwrap();
        assert_eq!(observed.key_value, None);
        assert!(observed.section_present);
        assert_eq!(mock.commands(), vec!["get dhcp.lan.start", "get dhcp.lan"]);
    }

    #[test]
    fn test_observe_propagates_tool_errors() {
        let mock = MockBackend::new().fail_on("get ", "uci: Parse error");
        let addrs = address::derive(&Request::new("dhcp").section("lan")).unwrap();
        let err = observe(&mock, &addrs).unwrap_err();
        assert!(matches!(err, Error::ToolError { .. }));
    }

    #[test]
    fn test_set_in_existing_section() {
        let mock = MockBackend::new().with_section("dhcp", "lan", "dhcp");
        let req = Request::new("dhcp").section("lan").name("start").value("100");

        let outcome = run(&mock, &req).unwrap();
        assert!(outcome.changed);
        assert_eq!(
            outcome.commands,
            vec!["set dhcp.lan.start=100", "commit dhcp"]
        );
        assert_eq!(mock.mutations(), outcome.commands);
        assert_eq!(mock.get(&Address::new("dhcp.lan.start")).unwrap(), "100");
    }

    #[test]
    fn test_create_then_set_commits_once() {
        let mock = MockBackend::new().with_package("dhcp");
        let req = Request::new("dhcp")
            .section("computer")
            .section_type("host")
            .name("ip")
            .value("1.0.0.0");

        let outcome = run(&mock, &req).unwrap();
        assert!(outcome.changed);
        assert_eq!(
            mock.mutations(),
            vec![
                "set dhcp.computer=host",
                "set dhcp.computer.ip=1.0.0.0",
                "commit dhcp",
            ]
        );
        assert_eq!(mock.commits(), vec!["dhcp"]);
        assert!(mock.pending().is_empty());
    }

    #[test]
    fn test_noop_issues_no_writes() {
        let mock = MockBackend::new()
            .with_section("dhcp", "lan", "dhcp")
            .with_option("dhcp.lan.start", "100");
        let req = Request::new("dhcp").section("lan").name("start").value("100");

        let outcome = run(&mock, &req).unwrap();
        assert!(!outcome.changed);
        assert!(outcome.commands.is_empty());
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_dry_run_issues_no_writes() {
        let mock = MockBackend::new().with_section("dhcp", "lan", "dhcp");
        let req = Request::new("dhcp").section("lan").name("start").value("100");

        let outcome = reconcile(&mock, &req, &ReconcileOptions { dry_run: true }).unwrap();
        assert!(outcome.changed);
        assert!(outcome.dry_run);
        assert_eq!(
            outcome.commands,
            vec!["set dhcp.lan.start=100", "commit dhcp"]
        );
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let mock = MockBackend::new()
            .with_section("dhcp", "lan", "dhcp")
            .fail_on("set ", "uci: I/O error");
        let req = Request::new("dhcp").section("lan").name("start").value("100");

        let err = run(&mock, &req).unwrap_err();
        assert!(matches!(err, Error::ToolError { .. }));
        assert!(mock.commits().is_empty());
        assert_eq!(mock.mutations(), vec!["set dhcp.lan.start=100"]);
    }

    #[test]
    fn test_commit_failure() {
        let mock = MockBackend::new()
            .with_section("dhcp", "lan", "dhcp")
            .fail_on("commit ", "uci: Permission denied");
        let req = Request::new("dhcp").section("lan").name("start").value("100");

        let err = run(&mock, &req).unwrap_err();
        assert!(matches!(err, Error::CommitFailed { .. }));
    }

    #[test]
    fn test_delete_list_member() {
        let mock = MockBackend::new()
            .with_anonymous("firewall", "zone")
            .with_list("firewall.@zone[0].network", &["wan", "wan6"]);
        let req = Request::new("firewall")
            .section_type("zone")
            .name("network")
            .value("wan6")
            .item(ItemKind::List)
            .state(DesiredState::Absent);

        let outcome = run(&mock, &req).unwrap();
        assert!(outcome.changed);
        assert_eq!(
            mock.get(&Address::new("firewall.@zone[0].network")).unwrap(),
            "wan"
        );
        assert_eq!(mock.commits(), vec!["firewall"]);
    }

    #[test]
    fn test_invalid_request_touches_nothing() {
        let mock = MockBackend::new();
        let req = Request::new("dhcp").name("start").value("100");
        let err = run(&mock, &req).unwrap_err();
        assert!(matches!(err, Error::AmbiguousKey { .. }));
        assert!(mock.commands().is_empty());

        let req = Request::new("dhcp").section("lan").item(ItemKind::List);
        let err = run(&mock, &req).unwrap_err();
        assert!(matches!(err, Error::SectionAsList { .. }));
        assert!(mock.commands().is_empty());
    }
}
