//! Backend abstraction for the UCI store.
//!
//! The [`Backend`] trait is the only way the reconciler touches the store,
//! allowing for different implementations (the real `uci` CLI, an
//! in-memory mock for testing).

pub mod uci;

use crate::error::{Error, Result};
use crate::planner::Op;
use crate::types::Address;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for UCI operations.
///
/// Writes are staged until [`Backend::commit`] is called for their package.
pub trait Backend: Send + Sync {
    /// Read the value at `address`.
    ///
    /// For a section this is its type, for a list the members separated by
    /// spaces with members containing whitespace in single quotes (see
    /// [`crate::matcher::list_members`]). Returns `Error::NotFound` when the
    /// entry does not exist.
    fn get(&self, address: &Address) -> Result<String>;

    /// Set an option, or create a section when `address` is a section and
    /// `value` its type.
    fn set(&self, address: &Address, value: &str) -> Result<()>;

    /// Append a member to a list.
    fn add_list(&self, address: &Address, value: &str) -> Result<()>;

    /// Delete an option, a whole list, or a section.
    fn delete(&self, address: &Address) -> Result<()>;

    /// Remove one member from a list.
    fn del_list(&self, address: &Address, value: &str) -> Result<()>;

    /// Persist staged writes of a package.
    fn commit(&self, package: &str) -> Result<()>;

    /// Read the value at `address`, mapping "entry not found" to `None`.
    ///
    /// An empty value counts as absent.
    fn lookup(&self, address: &Address) -> Result<Option<String>> {
        match self.get(address) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Issue a single planned write.
    fn apply(&self, op: &Op) -> Result<()> {
        match op {
            Op::Set { address, value } => self.set(address, value),
            Op::AddList { address, value } => self.add_list(address, value),
            Op::Delete { address } => self.delete(address),
            Op::DelList { address, value } => self.del_list(address, value),
        }
    }
}

/// Reject writes without a value before anything reaches the store.
pub(crate) fn ensure_value(operation: &'static str, address: &Address, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingValue {
            operation,
            address: address.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Mock backend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Option(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Section {
    name: Option<String>,
    section_type: String,
    entries: BTreeMap<String, Entry>,
}

#[derive(Debug, Default)]
struct Store {
    packages: BTreeMap<String, Vec<Section>>,
    pending: BTreeSet<String>,
    commits: Vec<String>,
    commands: Vec<String>,
    failures: Vec<(String, String)>,
}

#[derive(Clone, Copy)]
enum SectionRef<'a> {
    Named(&'a str),
    Anonymous { section_type: &'a str, index: i64 },
}

struct Path<'a> {
    package: &'a str,
    section: SectionRef<'a>,
    option: Option<&'a str>,
}

fn parse_path(address: &str) -> Option<Path<'_>> {
    let mut parts = address.splitn(3, '.');
    let package = parts.next().filter(|p| !p.is_empty())?;
    let section = parts.next().filter(|s| !s.is_empty())?;
    let option = parts.next();

    let section = if let Some(rest) = section.strip_prefix('@') {
        let (section_type, index) = rest.strip_suffix(']')?.split_once('[')?;
        SectionRef::Anonymous {
            section_type,
            index: index.parse().ok()?,
        }
    } else {
        SectionRef::Named(section)
    };

    Some(Path {
        package,
        section,
        option,
    })
}

fn find_section(sections: &[Section], section: &SectionRef<'_>) -> Option<usize> {
    match section {
        SectionRef::Named(name) => sections
            .iter()
            .position(|s| s.name.as_deref() == Some(*name)),
        SectionRef::Anonymous {
            section_type,
            index,
        } => {
            let matching: Vec<usize> = sections
                .iter()
                .enumerate()
                .filter(|(_, s)| s.section_type == *section_type)
                .map(|(i, _)| i)
                .collect();
            let position = if *index < 0 {
                matching.len() as i64 + index
            } else {
                *index
            };
            usize::try_from(position)
                .ok()
                .and_then(|i| matching.get(i).copied())
        }
    }
}

/// Quote a list member the way `uci get` prints it.
fn quote_member(member: &str) -> String {
    if member.chars().any(char::is_whitespace) {
        format!("'{}'", member.replace('\'', r"'\''"))
    } else {
        member.to_string()
    }
}

fn not_found(command: &str, address: &str) -> Error {
    Error::from_uci_output(command, address, "uci: Entry not found")
}

fn invalid(command: &str) -> Error {
    Error::ToolError {
        command: command.to_string(),
        stderr: "uci: Invalid argument".to_string(),
    }
}

impl Store {
    fn check_failure(&self, command: &str, package: &str) -> Result<()> {
        for (prefix, stderr) in &self.failures {
            if command.starts_with(prefix.as_str()) {
                if command.starts_with("commit ") {
                    return Err(Error::CommitFailed {
                        package: package.to_string(),
                        stderr: stderr.clone(),
                    });
                }
                return Err(Error::ToolError {
                    command: command.to_string(),
                    stderr: stderr.clone(),
                });
            }
        }
        Ok(())
    }

    fn section_mut(&mut self, command: &str, path: &Path<'_>) -> Result<&mut Section> {
        let sections = self
            .packages
            .get_mut(path.package)
            .ok_or_else(|| invalid(command))?;
        let idx = find_section(sections, &path.section).ok_or_else(|| invalid(command))?;
        Ok(&mut sections[idx])
    }

    fn get(&self, command: &str, address: &str) -> Result<String> {
        let path = parse_path(address).ok_or_else(|| invalid(command))?;
        let sections = self
            .packages
            .get(path.package)
            .ok_or_else(|| not_found(command, address))?;
        let section = find_section(sections, &path.section)
            .map(|i| &sections[i])
            .ok_or_else(|| not_found(command, address))?;

        match path.option {
            None => Ok(section.section_type.clone()),
            Some(option) => match section.entries.get(option) {
                Some(Entry::Option(value)) => Ok(value.clone()),
                Some(Entry::List(members)) => Ok(members
                    .iter()
                    .map(|m| quote_member(m))
                    .collect::<Vec<_>>()
                    .join(" ")),
                None => Err(not_found(command, address)),
            },
        }
    }

    fn set(&mut self, command: &str, address: &str, value: &str) -> Result<()> {
        let path = parse_path(address).ok_or_else(|| invalid(command))?;

        match path.option {
            Some(option) => {
                let section = self.section_mut(command, &path)?;
                section
                    .entries
                    .insert(option.to_string(), Entry::Option(value.to_string()));
            }
            None => {
                let sections = self
                    .packages
                    .get_mut(path.package)
                    .ok_or_else(|| invalid(command))?;
                match find_section(sections, &path.section) {
                    Some(idx) => sections[idx].section_type = value.to_string(),
                    None => match path.section {
                        SectionRef::Named(name) => sections.push(Section {
                            name: Some(name.to_string()),
                            section_type: value.to_string(),
                            entries: BTreeMap::new(),
                        }),
                        // uci can't create a section through a positional address
                        SectionRef::Anonymous { .. } => return Err(invalid(command)),
                    },
                }
            }
        }

        self.pending.insert(path.package.to_string());
        Ok(())
    }

    fn add_list(&mut self, command: &str, address: &str, value: &str) -> Result<()> {
        let path = parse_path(address).ok_or_else(|| invalid(command))?;
        let option = path.option.ok_or_else(|| invalid(command))?;
        let section = self.section_mut(command, &path)?;

        let entry = section
            .entries
            .remove(option)
            .unwrap_or(Entry::List(Vec::new()));
        let mut members = match entry {
            Entry::Option(existing) => vec![existing],
            Entry::List(members) => members,
        };
        members.push(value.to_string());
        section
            .entries
            .insert(option.to_string(), Entry::List(members));

        self.pending.insert(path.package.to_string());
        Ok(())
    }

    fn delete(&mut self, command: &str, address: &str) -> Result<()> {
        let path = parse_path(address).ok_or_else(|| invalid(command))?;
        let sections = self
            .packages
            .get_mut(path.package)
            .ok_or_else(|| not_found(command, address))?;
        let idx =
            find_section(sections, &path.section).ok_or_else(|| not_found(command, address))?;

        match path.option {
            None => {
                sections.remove(idx);
            }
            Some(option) => {
                if sections[idx].entries.remove(option).is_none() {
                    return Err(not_found(command, address));
                }
            }
        }

        self.pending.insert(path.package.to_string());
        Ok(())
    }

    fn del_list(&mut self, command: &str, address: &str, value: &str) -> Result<()> {
        let path = parse_path(address).ok_or_else(|| invalid(command))?;
        let option = path.option.ok_or_else(|| invalid(command))?;
        let section = self.section_mut(command, &path)?;

        let drop_option = match section.entries.get_mut(option) {
            Some(Entry::List(members)) => {
                members.retain(|m| m != value);
                false
            }
            Some(Entry::Option(existing)) => existing == value,
            None => return Err(not_found(command, address)),
        };
        if drop_option {
            section.entries.remove(option);
        }

        self.pending.insert(path.package.to_string());
        Ok(())
    }
}

/// In-memory backend for testing without a real `uci` binary.
///
/// Resolves named and `@type[index]` addresses the way uci does, reports
/// missing entries with uci's "Entry not found" message, and records every
/// command it receives. Clones share the same store.
///
/// ```
/// use ucikit::backend::{Backend, MockBackend};
/// use ucikit::Address;
///
/// let mock = MockBackend::new()
///     .with_section("dhcp", "lan", "dhcp")
///     .with_option("dhcp.lan.start", "100");
///
/// assert_eq!(mock.get(&Address::new("dhcp.lan.start")).unwrap(), "100");
/// assert_eq!(mock.get(&Address::new("dhcp.@dhcp[0]")).unwrap(), "dhcp");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    store: Arc<Mutex<Store>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an empty package (config file).
    pub fn with_package(self, package: &str) -> Self {
        self.lock()
            .packages
            .entry(package.to_string())
            .or_default();
        self
    }

    /// Add a named section, creating the package if needed.
    pub fn with_section(self, package: &str, name: &str, section_type: &str) -> Self {
        self.push_section(package, Some(name), section_type);
        self
    }

    /// Add an anonymous section, creating the package if needed.
    pub fn with_anonymous(self, package: &str, section_type: &str) -> Self {
        self.push_section(package, None, section_type);
        self
    }

    fn push_section(&self, package: &str, name: Option<&str>, section_type: &str) {
        self.lock()
            .packages
            .entry(package.to_string())
            .or_default()
            .push(Section {
                name: name.map(str::to_string),
                section_type: section_type.to_string(),
                entries: BTreeMap::new(),
            });
    }

    /// Set an option in an existing section without recording a command.
    ///
    /// # Panics
    ///
    /// Panics if the section does not exist.
    pub fn with_option(self, address: &str, value: &str) -> Self {
        {
            let mut store = self.lock();
            if let Err(e) = store.set("seed", address, value) {
                panic!("cannot seed {address}: {e}");
            }
            store.pending.clear();
        }
        self
    }

    /// Set a list in an existing section without recording a command.
    ///
    /// # Panics
    ///
    /// Panics if the section does not exist.
    pub fn with_list(self, address: &str, members: &[&str]) -> Self {
        {
            let mut store = self.lock();
            for member in members {
                if let Err(e) = store.add_list("seed", address, member) {
                    panic!("cannot seed {address}: {e}");
                }
            }
            store.pending.clear();
        }
        self
    }

    /// Make every command starting with `prefix` fail with `stderr`.
    pub fn fail_on(self, prefix: &str, stderr: &str) -> Self {
        self.lock()
            .failures
            .push((prefix.to_string(), stderr.to_string()));
        self
    }

    /// All commands received, in order, e.g. `get dhcp.lan.start`.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Commands other than `get`.
    pub fn mutations(&self) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter(|c| !c.starts_with("get "))
            .cloned()
            .collect()
    }

    /// Packages committed, in order.
    pub fn commits(&self) -> Vec<String> {
        self.lock().commits.clone()
    }

    /// Packages with writes that were not committed yet.
    pub fn pending(&self) -> Vec<String> {
        self.lock().pending.iter().cloned().collect()
    }

    /// Number of sections in a package.
    pub fn section_count(&self, package: &str) -> usize {
        self.lock().packages.get(package).map_or(0, Vec::len)
    }

    fn record(&self, command: String, package: &str) -> Result<MutexGuard<'_, Store>> {
        let mut store = self.lock();
        store.commands.push(command.clone());
        store.check_failure(&command, package)?;
        Ok(store)
    }
}

impl Backend for MockBackend {
    fn get(&self, address: &Address) -> Result<String> {
        let command = format!("get {address}");
        let store = self.record(command.clone(), address.package())?;
        store.get(&command, address.as_str())
    }

    fn set(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("set", address, value)?;
        let command = format!("set {address}={value}");
        let mut store = self.record(command.clone(), address.package())?;
        store.set(&command, address.as_str(), value)
    }

    fn add_list(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("add_list", address, value)?;
        let command = format!("add_list {address}={value}");
        let mut store = self.record(command.clone(), address.package())?;
        store.add_list(&command, address.as_str(), value)
    }

    fn delete(&self, address: &Address) -> Result<()> {
        let command = format!("delete {address}");
        let mut store = self.record(command.clone(), address.package())?;
        store.delete(&command, address.as_str())
    }

    fn del_list(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("del_list", address, value)?;
        let command = format!("del_list {address}={value}");
        let mut store = self.record(command.clone(), address.package())?;
        store.del_list(&command, address.as_str(), value)
    }

    fn commit(&self, package: &str) -> Result<()> {
        let mut store = self.record(format!("commit {package}"), package)?;
        store.pending.remove(package);
        store.commits.push(package.to_string());
        Ok(())
    }
}
