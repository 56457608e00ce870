//! Address families and the family filter used by route listings.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address family of a route or address.
///
/// Raw values match the Linux `AF_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AddressFamily {
    /// No family could be derived (`AF_UNSPEC`).
    Unspec = 0,
    /// IPv4 (`AF_INET`).
    V4 = 2,
    /// IPv6 (`AF_INET6`).
    V6 = 10,
    /// MPLS (`AF_MPLS`).
    Mpls = 28,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspec => "unspec",
            Self::V4 => "v4",
            Self::V6 => "v6",
            Self::Mpls => "mpls",
        };
        f.write_str(name)
    }
}

/// Top-level family restriction for filtered route listings.
///
/// `All` corresponds to the kernel's `FAMILY_ALL` (`AF_UNSPEC`); every other
/// value keeps only routes whose derived family is exactly that family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyFilter {
    #[default]
    All,
    V4,
    V6,
    Mpls,
}

impl FamilyFilter {
    /// Returns the family a route must have to pass, or `None` for `All`.
    pub const fn family(self) -> Option<AddressFamily> {
        match self {
            Self::All => None,
            Self::V4 => Some(AddressFamily::V4),
            Self::V6 => Some(AddressFamily::V6),
            Self::Mpls => Some(AddressFamily::Mpls),
        }
    }

    /// Returns true if a route of `family` passes this filter.
    pub fn admits(self, family: AddressFamily) -> bool {
        match self.family() {
            None => true,
            Some(wanted) => wanted == family,
        }
    }
}

impl fmt::Display for FamilyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family() {
            Some(family) => family.fmt(f),
            None => f.write_str("all"),
        }
    }
}

impl FromStr for FamilyFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "any" => Ok(Self::All),
            "v4" | "ipv4" | "inet" => Ok(Self::V4),
            "v6" | "ipv6" | "inet6" => Ok(Self::V6),
            "mpls" => Ok(Self::Mpls),
            _ => Err(ParseError::InvalidFamily(s.to_string())),
        }
    }
}
