//! Reconciliation planner - decides what to write
//!
//! [`plan`] is a pure function of the request, its derived addresses and a
//! fresh observation of the store. It performs no I/O; the executor turns
//! the resulting [`Plan`] into uci commands.

use crate::address::Addresses;
use crate::error::{Error, Result};
use crate::matcher::satisfied;
use crate::types::{Address, DesiredState, ItemKind, Observed, Request};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What has to happen for the store to match the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    /// Store already matches
    NoOp,
    /// Create a section of the given type
    CreateSection {
        section: Address,
        section_type: String,
    },
    /// Create a section, then set a value inside it, committed together
    CreateSectionThenSet {
        section: Address,
        section_type: String,
        key: Address,
        value: String,
        item: ItemKind,
    },
    /// Set an option or append a list member
    Set {
        key: Address,
        value: String,
        item: ItemKind,
    },
    /// Delete a whole section
    DeleteSection { section: Address },
    /// Delete an option, or one member of a list
    Delete {
        key: Address,
        value: Option<String>,
        item: ItemKind,
    },
}

/// A single mutating uci command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `uci set <address>=<value>`
    Set { address: Address, value: String },
    /// `uci add_list <address>=<value>`
    AddList { address: Address, value: String },
    /// `uci delete <address>`
    Delete { address: Address },
    /// `uci del_list <address>=<value>`
    DelList { address: Address, value: String },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Set { address, value } => write!(f, "set {address}={value}"),
            Op::AddList { address, value } => write!(f, "add_list {address}={value}"),
            Op::Delete { address } => write!(f, "delete {address}"),
            Op::DelList { address, value } => write!(f, "del_list {address}={value}"),
        }
    }
}

impl Op {
    /// Address the command writes to
    pub fn address(&self) -> &Address {
        match self {
            Op::Set { address, .. }
            | Op::AddList { address, .. }
            | Op::Delete { address }
            | Op::DelList { address, .. } => address,
        }
    }
}

impl Plan {
    /// Check if the plan leaves the store untouched
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    /// The writes of this plan, in execution order.
    ///
    /// Section creation always uses `set`, whatever the item kind.
    pub fn operations(&self) -> Vec<Op> {
        match self {
            Plan::NoOp => Vec::new(),
            Plan::CreateSection {
                section,
                section_type,
            } => vec![Op::Set {
                address: section.clone(),
                value: section_type.clone(),
            }],
            Plan::CreateSectionThenSet {
                section,
                section_type,
                key,
                value,
                item,
            } => vec![
                Op::Set {
                    address: section.clone(),
                    value: section_type.clone(),
                },
                set_op(key, value, *item),
            ],
            Plan::Set { key, value, item } => vec![set_op(key, value, *item)],
            Plan::DeleteSection { section } => vec![Op::Delete {
                address: section.clone(),
            }],
            Plan::Delete { key, value, item } => match (item, value) {
                (ItemKind::List, Some(value)) => vec![Op::DelList {
                    address: key.clone(),
                    value: value.clone(),
                }],
                _ => vec![Op::Delete {
                    address: key.clone(),
                }],
            },
        }
    }

    /// Short human-readable summary
    pub fn describe(&self) -> String {
        match self {
            Plan::NoOp => "no change".to_string(),
            Plan::CreateSection {
                section,
                section_type,
            } => format!("create section {section} of type {section_type}"),
            Plan::CreateSectionThenSet {
                section,
                section_type,
                key,
                value,
                ..
            } => format!("create section {section} of type {section_type}, set {key}={value}"),
            Plan::Set { key, value, item } => match item {
                ItemKind::Option => format!("set {key}={value}"),
                ItemKind::List => format!("add {value} to list {key}"),
            },
            Plan::DeleteSection { section } => format!("delete section {section}"),
            Plan::Delete { key, value, item } => match (item, value) {
                (ItemKind::List, Some(value)) => format!("remove {value} from list {key}"),
                _ => format!("delete {key}"),
            },
        }
    }
}

fn set_op(key: &Address, value: &str, item: ItemKind) -> Op {
    match item {
        ItemKind::Option => Op::Set {
            address: key.clone(),
            value: value.to_string(),
        },
        ItemKind::List => Op::AddList {
            address: key.clone(),
            value: value.to_string(),
        },
    }
}

/// Decide the plan for `request` against what was observed.
pub fn plan(request: &Request, addrs: &Addresses, observed: &Observed) -> Result<Plan> {
    if observed.key_value.is_some() && !observed.section_present {
        return Err(Error::InternalInvariantViolation(format!(
            "key of {} observed without its section",
            addrs.section
        )));
    }

    match (request.state, &addrs.key) {
        (DesiredState::Absent, None) => plan_absent_section(request, addrs, observed),
        (DesiredState::Absent, Some(key)) => plan_absent_key(request, key, observed),
        (DesiredState::Present, None) => plan_present_section(request, addrs, observed),
        (DesiredState::Present, Some(key)) => plan_present_key(request, addrs, key, observed),
    }
}

fn plan_absent_section(request: &Request, addrs: &Addresses, observed: &Observed) -> Result<Plan> {
    if observed.key_value.is_some() {
        return Err(Error::InternalInvariantViolation(format!(
            "value observed for section-only request on {}",
            addrs.section
        )));
    }

    if !observed.section_present {
        return Ok(Plan::NoOp);
    }

    if request.item == ItemKind::List {
        return match request.desired_value() {
            None => Err(Error::MissingValue {
                operation: "del_list",
                address: addrs.section.to_string(),
            }),
            Some(_) => Err(Error::SectionAsList {
                address: addrs.section.to_string(),
            }),
        };
    }

    Ok(Plan::DeleteSection {
        section: addrs.section.clone(),
    })
}

fn plan_absent_key(request: &Request, key: &Address, observed: &Observed) -> Result<Plan> {
    let desired = request.desired_value();

    if !satisfied(request.item, observed.key_value.as_deref(), desired) {
        return Ok(Plan::NoOp);
    }

    if request.item == ItemKind::List && desired.is_none() {
        return Err(Error::MissingValue {
            operation: "del_list",
            address: key.to_string(),
        });
    }

    Ok(Plan::Delete {
        key: key.clone(),
        value: desired.map(str::to_string),
        item: request.item,
    })
}

fn plan_present_section(request: &Request, addrs: &Addresses, observed: &Observed) -> Result<Plan> {
    match (observed.section_present, request.create) {
        (true, _) => Ok(Plan::NoOp),
        (false, false) => Err(Error::SectionMissing {
            address: addrs.section.to_string(),
        }),
        (false, true) => Ok(Plan::CreateSection {
            section: addrs.section.clone(),
            section_type: required_type(request, &addrs.section)?,
        }),
    }
}

fn plan_present_key(
    request: &Request,
    addrs: &Addresses,
    key: &Address,
    observed: &Observed,
) -> Result<Plan> {
    let desired = request.desired_value();

    match (
        observed.key_value.as_deref(),
        observed.section_present,
        request.create,
    ) {
        (Some(current), true, _) => {
            if satisfied(request.item, Some(current), desired) {
                Ok(Plan::NoOp)
            } else {
                Ok(Plan::Set {
                    key: key.clone(),
                    value: required_value(request, key)?,
                    item: request.item,
                })
            }
        }
        (None, true, true) => Ok(Plan::Set {
            key: key.clone(),
            value: required_value(request, key)?,
            item: request.item,
        }),
        (None, true, false) => Err(Error::KeyMissing {
            address: key.to_string(),
        }),
        (None, false, true) => {
            let section_type = required_type(request, &addrs.section)?;
            Ok(Plan::CreateSectionThenSet {
                section: addrs.section.clone(),
                section_type,
                key: key.clone(),
                value: required_value(request, key)?,
                item: request.item,
            })
        }
        (None, false, false) => Err(Error::SectionMissing {
            address: addrs.section.to_string(),
        }),
        (Some(_), false, _) => Err(Error::InternalInvariantViolation(format!(
            "unhandled observation for {key}"
        ))),
    }
}

fn required_type(request: &Request, section: &Address) -> Result<String> {
    request
        .section_type
        .as_ref()
        .filter(|t| !t.is_empty())
        .cloned()
        .ok_or_else(|| Error::TypeRequired {
            address: section.to_string(),
        })
}

fn required_value(request: &Request, key: &Address) -> Result<String> {
    let operation = match request.item {
        ItemKind::Option => "set",
        ItemKind::List => "add_list",
    };

    request
        .desired_value()
        .map(str::to_string)
        .ok_or_else(|| Error::MissingValue {
            operation,
            address: key.to_string(),
        })
}
