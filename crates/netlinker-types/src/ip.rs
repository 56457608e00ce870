//! IP address and prefix types with safe parsing.

use crate::{AddressFamily, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP address that can be either IPv4 or IPv6.
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are stored as `V4`, so they
/// compare equal to, and share a family with, the plain IPv4 form.
///
/// Serialises as its textual form so route fixtures stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IpAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl IpAddress {
    /// Returns the address family of this address.
    pub const fn family(&self) -> AddressFamily {
        match self {
            IpAddress::V4(_) => AddressFamily::V4,
            IpAddress::V6(_) => AddressFamily::V6,
        }
    }

    /// Returns the unspecified address of the given family.
    ///
    /// `V4` and `V6` are the only families with an IP form; everything else
    /// yields `None`.
    pub const fn unspecified(family: AddressFamily) -> Option<Self> {
        match family {
            AddressFamily::V4 => Some(IpAddress::V4(Ipv4Addr::UNSPECIFIED)),
            AddressFamily::V6 => Some(IpAddress::V6(Ipv6Addr::UNSPECIFIED)),
            AddressFamily::Unspec | AddressFamily::Mpls => None,
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpAddress::V4(addr) => addr.fmt(f),
            IpAddress::V6(addr) => addr.fmt(f),
        }
    }
}

impl FromStr for IpAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(IpAddress::from)
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
    }
}

impl TryFrom<String> for IpAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpAddress> for String {
    fn from(addr: IpAddress) -> Self {
        addr.to_string()
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => IpAddress::from(v4),
            IpAddr::V6(v6) => IpAddress::from(v6),
        }
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        IpAddress::V4(addr)
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        match addr.to_ipv4_mapped() {
            Some(v4) => IpAddress::V4(v4),
            None => IpAddress::V6(addr),
        }
    }
}

/// Length of the `::ffff:0:0/96` prefix that carries IPv4-mapped addresses.
const MAPPED_PREFIX_BITS: u8 = 96;

/// An IP prefix in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
///
/// The address is kept exactly as given; host bits are not masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    address: IpAddress,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a destination prefix, rejecting lengths wider than the
    /// address.
    pub fn new(address: IpAddress, prefix_len: u8) -> Result<Self, ParseError> {
        let bits = match address.family() {
            AddressFamily::V4 => 32,
            _ => 128,
        };
        if prefix_len > bits {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{}: a {} destination has at most {} prefix bits",
                address,
                prefix_len,
                address.family(),
                bits
            )));
        }
        Ok(IpPrefix {
            address,
            prefix_len,
        })
    }

    /// Creates the zero-length prefix (`0.0.0.0/0` or `::/0`) for a family.
    pub const fn default_route(family: AddressFamily) -> Option<Self> {
        match IpAddress::unspecified(family) {
            Some(address) => Some(IpPrefix {
                address,
                prefix_len: 0,
            }),
            None => None,
        }
    }

    /// Returns the network address of this prefix.
    pub const fn address(&self) -> &IpAddress {
        &self.address
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the address family of this prefix.
    pub const fn family(&self) -> AddressFamily {
        self.address.family()
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    /// Parses `address/len`. A mapped IPv4 prefix such as
    /// `::ffff:10.0.0.0/120` becomes `10.0.0.0/24`; mapped prefixes shorter
    /// than the mapping itself stay IPv6.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidIpPrefix(s.to_string());
        let (addr, len) = s.rsplit_once('/').ok_or_else(invalid)?;
        let prefix_len: u8 = len.parse().map_err(|_| invalid())?;

        match addr
            .parse::<IpAddr>()
            .map_err(|_| ParseError::InvalidIpAddress(addr.to_string()))?
        {
            IpAddr::V6(v6) if prefix_len < MAPPED_PREFIX_BITS => {
                IpPrefix::new(IpAddress::V6(v6), prefix_len)
            }
            IpAddr::V6(v6) => {
                let address = IpAddress::from(v6);
                let prefix_len = match address {
                    IpAddress::V4(_) => prefix_len - MAPPED_PREFIX_BITS,
                    IpAddress::V6(_) => prefix_len,
                };
                IpPrefix::new(address, prefix_len)
            }
            IpAddr::V4(v4) => IpPrefix::new(IpAddress::V4(v4), prefix_len),
        }
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> Self {
        prefix.to_string()
    }
}
