//! Real UCI CLI backend using `uci` commands.
//!
//! Commands are run with an argument vector, never through a shell, so
//! `uci set dhcp.lan.start=100` receives `dhcp.lan.start=100` as a single
//! argument and values need no quoting.

use crate::backend::{Backend, ensure_value};
use crate::error::{Error, Result};
use crate::types::Address;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Directories searched for `uci` when it is not on `PATH`.
pub const FALLBACK_DIRS: &[&str] = &["/sbin", "/bin"];

/// How to locate and invoke the uci binary
#[derive(Debug, Clone)]
pub struct UciOptions {
    /// Explicit path to the binary; skips the search when set
    pub binary: Option<PathBuf>,
    /// Alternative configuration directory (`uci -c`)
    pub confdir: Option<PathBuf>,
    /// Directories searched after `PATH`
    pub search_paths: Vec<PathBuf>,
}

impl Default for UciOptions {
    fn default() -> Self {
        Self {
            binary: None,
            confdir: None,
            search_paths: FALLBACK_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// Backend that executes real `uci` commands.
#[derive(Debug)]
pub struct UciBackend {
    binary: PathBuf,
    confdir: Option<PathBuf>,
}

impl UciBackend {
    /// Create a new UciBackend with the default search.
    ///
    /// Returns an error if uci is not installed.
    pub fn new() -> Result<Self> {
        Self::with_options(&UciOptions::default())
    }

    /// Create a UciBackend from explicit options.
    pub fn with_options(options: &UciOptions) -> Result<Self> {
        let binary = find_uci(options.binary.as_deref(), &options.search_paths)?;
        log::debug!("using uci binary at {}", binary.display());
        Ok(Self {
            binary,
            confdir: options.confdir.clone(),
        })
    }

    /// Run a uci command and return its output.
    fn run_uci(&self, args: &[&str]) -> Result<Output> {
        let mut command = Command::new(&self.binary);
        if let Some(confdir) = &self.confdir {
            command.arg("-c").arg(confdir);
        }

        log::trace!("uci {}", args.join(" "));

        command.args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolBinaryNotFound {
                    searched: self.binary.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })
    }

    /// Run a uci command and check for success.
    ///
    /// Only the line terminator is removed from stdout; other whitespace is
    /// part of the value.
    fn run_uci_checked(&self, args: &[&str], target: &str) -> Result<String> {
        let output = self.run_uci(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::from_uci_output(&args.join(" "), target, &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = stdout.strip_suffix('\n').unwrap_or(&stdout);
        Ok(value.to_string())
    }
}

impl Backend for UciBackend {
    fn get(&self, address: &Address) -> Result<String> {
        self.run_uci_checked(&["get", address.as_str()], address.as_str())
    }

    fn set(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("set", address, value)?;
        let assignment = format!("{address}={value}");
        self.run_uci_checked(&["set", &assignment], address.as_str())?;
        Ok(())
    }

    fn add_list(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("add_list", address, value)?;
        let assignment = format!("{address}={value}");
        self.run_uci_checked(&["add_list", &assignment], address.as_str())?;
        Ok(())
    }

    fn delete(&self, address: &Address) -> Result<()> {
        self.run_uci_checked(&["delete", address.as_str()], address.as_str())?;
        Ok(())
    }

    fn del_list(&self, address: &Address, value: &str) -> Result<()> {
        ensure_value("del_list", address, value)?;
        let assignment = format!("{address}={value}");
        self.run_uci_checked(&["del_list", &assignment], address.as_str())?;
        Ok(())
    }

    fn commit(&self, package: &str) -> Result<()> {
        let output = self.run_uci(&["commit", package])?;

        if !output.status.success() {
            return Err(Error::CommitFailed {
                package: package.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Locate the uci binary.
///
/// An explicit path must exist. Otherwise `PATH` is searched first, then
/// `search_paths` in order.
pub fn find_uci(explicit: Option<&Path>, search_paths: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::ToolBinaryNotFound {
            searched: path.display().to_string(),
        });
    }

    if let Ok(path) = which::which("uci") {
        return Ok(path);
    }

    search_paths
        .iter()
        .map(|dir| dir.join("uci"))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::ToolBinaryNotFound {
            searched: search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_binary_must_exist() {
        let err = find_uci(Some(Path::new("/nonexistent/uci")), &[]).unwrap_err();
        assert!(matches!(err, Error::ToolBinaryNotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/uci"));
    }

    #[test]
    fn test_explicit_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uci");
        std::fs::write(&path, "").unwrap();

        assert_eq!(find_uci(Some(path.as_path()), &[]).unwrap(), path);
    }

    #[test]
    fn test_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uci"), "").unwrap();

        // PATH may hold a real uci on OpenWrt hosts; either answer is valid
        let found = find_uci(None, &[PathBuf::from("/nonexistent"), dir.path().to_path_buf()])
            .unwrap();
        assert!(found.ends_with("uci"));
    }

    #[test]
    fn test_default_search_paths() {
        let options = UciOptions::default();
        assert_eq!(
            options.search_paths,
            vec![PathBuf::from("/sbin"), PathBuf::from("/bin")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_uci_script() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("uci");
        std::fs::write(
            &script,
            r#"#!/bin/sh
if [ "$1" = "-c" ]; then
    echo "confdir=$2 $3 $4"
    exit 0
fi
case "$1" in
    get)
        if [ "$2" = "dhcp.lan.start" ]; then echo "100"; exit 0; fi
        if [ "$2" = "dhcp.lan.domain" ]; then echo " lan  "; exit 0; fi
        if [ "$2" = "dhcp.lan.dhcp_option" ]; then echo "'x a' 'b y' 3"; exit 0; fi
        echo "uci: Entry not found" >&2; exit 1 ;;
    set)
        if [ "$2" = "dhcp.lan.start=100 200" ]; then exit 0; fi
        echo "uci: Invalid argument" >&2; exit 1 ;;
    commit)
        echo "uci: I/O error" >&2; exit 1 ;;
esac
echo "uci: Invalid argument" >&2
exit 1
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = UciBackend::with_options(&UciOptions {
            binary: Some(script.clone()),
            ..UciOptions::default()
        })
        .unwrap();

        let start = Address::new("dhcp.lan.start");
        assert_eq!(backend.get(&start).unwrap(), "100");
        assert_eq!(backend.get(&Address::new("dhcp.lan.domain")).unwrap(), " lan  ");
        assert_eq!(
            backend.get(&Address::new("dhcp.lan.dhcp_option")).unwrap(),
            "'x a' 'b y' 3"
        );
        assert_eq!(backend.lookup(&Address::new("dhcp.lan.end")).unwrap(), None);

        // The value travels as one argument, spaces included
        backend.set(&start, "100 200").unwrap();

        let err = backend.delete(&start).unwrap_err();
        assert!(matches!(err, Error::ToolError { .. }));
        assert!(err.to_string().contains("Invalid argument"));

        let err = backend.commit("dhcp").unwrap_err();
        assert!(matches!(err, Error::CommitFailed { .. }));

        let err = backend.set(&start, "").unwrap_err();
        assert!(matches!(err, Error::MissingValue { .. }));

        let backend = UciBackend::with_options(&UciOptions {
            binary: Some(script),
            confdir: Some(PathBuf::from("/tmp/uci-test")),
            ..UciOptions::default()
        })
        .unwrap();
        assert_eq!(
            backend.get(&start).unwrap(),
            "confdir=/tmp/uci-test get dhcp.lan.start"
        );
    }
}
