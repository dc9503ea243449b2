//! Core types for UCI reconciliation

use crate::error::{Error, Result};
use crate::planner::Plan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a name addresses a scalar option or a member of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Single scalar value (`uci set`)
    #[default]
    Option,
    /// Member of a multi-valued list (`uci add_list`)
    List,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Option => write!(f, "option"),
            Self::List => write!(f, "list"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "option" => Ok(Self::Option),
            "list" => Ok(Self::List),
            other => Err(Error::InvalidRequest(format!(
                "unknown item kind '{other}', expected option or list"
            ))),
        }
    }
}

/// Desired state of the target entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Entry must exist (with the given value, if any)
    #[default]
    Present,
    /// Entry must not exist (or not hold the given value)
    Absent,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl FromStr for DesiredState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(Error::InvalidRequest(format!(
                "unknown state '{other}', expected present or absent"
            ))),
        }
    }
}

/// Desired state of a single UCI section or option/list value.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Top-level namespace (config file), e.g. `dhcp`
    pub package: String,
    /// Named section, e.g. `lan`
    pub section: Option<String>,
    /// Section type, needed to address anonymous sections or to create one
    pub section_type: Option<String>,
    /// Ordinal among anonymous sections of `section_type`
    pub index: u32,
    /// Option or list name; `None` targets the section itself
    pub name: Option<String>,
    /// Desired value of `name`
    pub value: Option<String>,
    /// Scalar option or list member
    pub item: ItemKind,
    /// Present or absent
    pub state: DesiredState,
    /// Whether missing sections and keys may be created
    pub create: bool,
}

impl Request {
    /// Create a request for `package` with the defaults: index 0,
    /// option, present, creation allowed.
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            section: None,
            section_type: None,
            index: 0,
            name: None,
            value: None,
            item: ItemKind::Option,
            state: DesiredState::Present,
            create: true,
        }
    }

    pub fn section(mut self, section: &str) -> Self {
        self.section = Some(section.to_string());
        self
    }

    pub fn section_type(mut self, section_type: &str) -> Self {
        self.section_type = Some(section_type.to_string());
        self
    }

    pub fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn item(mut self, item: ItemKind) -> Self {
        self.item = item;
        self
    }

    pub fn state(mut self, state: DesiredState) -> Self {
        self.state = state;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Check the request before any address is derived or store queried.
    pub fn validate(&self) -> Result<()> {
        if self.package.trim().is_empty() {
            return Err(Error::InvalidRequest("package must not be empty".to_string()));
        }

        if self.item == ItemKind::List && self.name.is_none() {
            let section = self
                .section
                .clone()
                .or_else(|| self.section_type.as_ref().map(|t| format!("@{t}[{}]", self.index)));
            let address = match section {
                Some(section) => format!("{}.{section}", self.package),
                None => self.package.clone(),
            };
            return Err(Error::SectionAsList { address });
        }

        Ok(())
    }

    /// Desired value, treating an empty string as not supplied.
    pub fn desired_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// A UCI dot-path address such as `dhcp.lan.start` or `dhcp.@dnsmasq[0]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The package (first path component)
    pub fn package(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What the store looked like when the decision was made
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observed {
    /// Current value of the key, if a key is targeted and it exists
    pub key_value: Option<String>,
    /// Whether the enclosing section exists
    pub section_present: bool,
}

/// Options for a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Decide and report, but issue no writes
    pub dry_run: bool,
}

/// Result of a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the store was (or, in dry-run, would be) modified
    pub changed: bool,
    /// The decided plan
    pub plan: Plan,
    /// uci commands issued, in order (or that would be issued in dry-run)
    pub commands: Vec<String>,
    /// Whether this was a dry-run
    #[serde(default)]
    pub dry_run: bool,
}
