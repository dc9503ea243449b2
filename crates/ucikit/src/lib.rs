//! # ucikit
//!
//! Idempotent management of OpenWrt UCI configuration entries.
//!
//! Given the desired state of one section, option, or list member, this
//! crate reads the current state through `uci get`, decides the smallest
//! set of writes that converges the store, issues them, and commits the
//! package once. Running the same request again reports no change and
//! issues no write.
//!
//! ## Example
//!
//! ```no_run
//! use ucikit::{Client, Request};
//!
//! let client = Client::new().expect("uci not available");
//!
//! // dhcp.computer of type host with ip=1.0.0.0, created if missing
//! let request = Request::new("dhcp")
//!     .section("computer")
//!     .section_type("host")
//!     .name("ip")
//!     .value("1.0.0.0");
//!
//! let outcome = client.reconcile(&request).expect("reconcile failed");
//! println!("changed: {}", outcome.changed);
//! ```
//!
//! ## Testing
//!
//! [`backend::MockBackend`] keeps an in-memory store and records every
//! command, so the whole decision tree can be exercised without `uci`:
//!
//! ```
//! use ucikit::{Client, Request, backend::MockBackend};
//!
//! let mock = MockBackend::new().with_section("dhcp", "lan", "dhcp");
//! let client = Client::with_backend(Box::new(mock.clone()));
//!
//! let request = Request::new("dhcp").section("lan").name("start").value("100");
//! assert!(client.reconcile(&request).unwrap().changed);
//! assert!(!client.reconcile(&request).unwrap().changed);
//! ```

#![warn(clippy::all)]

pub mod address;
pub mod backend;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod planner;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use planner::{Op, Plan};
pub use types::{
    Address, DesiredState, ItemKind, Observed, Outcome, ReconcileOptions, Request,
};

use backend::Backend;
use backend::uci::{UciBackend, UciOptions};

/// High-level client for UCI reconciliation.
///
/// Holds no state between calls: every reconciliation reads the store
/// afresh.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client using the `uci` binary found on this system.
    pub fn new() -> Result<Self> {
        Ok(Self {
            backend: Box::new(UciBackend::new()?),
        })
    }

    /// Create a Client using a specific binary or configuration directory.
    pub fn with_options(options: &UciOptions) -> Result<Self> {
        Ok(Self {
            backend: Box::new(UciBackend::with_options(options)?),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Converge the entry described by `request`.
    pub fn reconcile(&self, request: &Request) -> Result<Outcome> {
        executor::reconcile(self.backend.as_ref(), request, &ReconcileOptions::default())
    }

    /// Decide what `reconcile` would do without writing anything.
    pub fn check(&self, request: &Request) -> Result<Outcome> {
        executor::reconcile(
            self.backend.as_ref(),
            request,
            &ReconcileOptions { dry_run: true },
        )
    }

    /// Read a value, `None` if the entry does not exist.
    pub fn get(&self, address: &Address) -> Result<Option<String>> {
        self.backend.lookup(address)
    }
}
