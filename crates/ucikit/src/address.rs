//! Address derivation for requests
//!
//! UCI addresses an entry either through a named section
//! (`package.section[.name]`) or through the position of an anonymous
//! section among sections of the same type (`package.@type[index][.name]`).
//! Names and values are passed through untouched; the backend passes them
//! as separate arguments so no escaping is needed here.

use crate::error::{Error, Result};
use crate::types::{Address, Request};

/// The two addresses derived from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addresses {
    /// Full path to the option/list, `None` when the request targets a section
    pub key: Option<Address>,
    /// Path to the enclosing section
    pub section: Address,
}

/// Derive the key and section addresses of a request.
///
/// A named section wins over `type`/`index` when both are given.
pub fn derive(request: &Request) -> Result<Addresses> {
    let section = if let Some(section) = &request.section {
        format!("{}.{}", request.package, section)
    } else if let Some(section_type) = &request.section_type {
        format!("{}.@{}[{}]", request.package, section_type, request.index)
    } else {
        return Err(Error::AmbiguousKey {
            package: request.package.clone(),
        });
    };

    let key = request
        .name
        .as_ref()
        .map(|name| Address::new(format!("{section}.{name}")));

    Ok(Addresses {
        key,
        section: Address::new(section),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_section() {
        let req = Request::new("dhcp").section("lan").name("start");
        let addrs = derive(&req).unwrap();
        assert_eq!(addrs.key.unwrap().as_str(), "dhcp.lan.start");
        assert_eq!(addrs.section.as_str(), "dhcp.lan");
    }

    #[test]
    fn test_named_section_only() {
        let req = Request::new("dhcp").section("computer2").section_type("host");
        let addrs = derive(&req).unwrap();
        assert!(addrs.key.is_none());
        assert_eq!(addrs.section.as_str(), "dhcp.computer2");
    }

    #[test]
    fn test_anonymous_section() {
        let req = Request::new("dhcp").section_type("dnsmasq").name("domain");
        let addrs = derive(&req).unwrap();
        assert_eq!(addrs.key.unwrap().as_str(), "dhcp.@dnsmasq[0].domain");
        assert_eq!(addrs.section.as_str(), "dhcp.@dnsmasq[0]");

        let req = Request::new("firewall").section_type("zone").index(2);
        let addrs = derive(&req).unwrap();
        assert_eq!(addrs.section.as_str(), "firewall.@zone[2]");
    }

    #[test]
    fn test_ambiguous() {
        let req = Request::new("dhcp").name("start").value("100");
        let err = derive(&req).unwrap_err();
        assert!(matches!(err, Error::AmbiguousKey { .. }));
        assert!(err.to_string().contains("dhcp"));
    }
}
