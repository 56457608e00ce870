//! Common types for netlinker route handles.
//!
//! - [`IpAddress`]: IPv4 and IPv6 addresses
//! - [`IpPrefix`]: IP network prefixes (CIDR notation)
//! - [`AddressFamily`]: `AF_*` families a route can belong to
//! - [`FamilyFilter`]: family restriction applied by filtered listings

mod family;
mod ip;

pub use family::{AddressFamily, FamilyFilter};
pub use ip::{IpAddress, IpPrefix};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid address family: {0}")]
    InvalidFamily(String),

    #[error("invalid route filter: {0}")]
    InvalidFilter(String),
}
