//! Route filter mask and field projection.
//!
//! A [`RouteFilter`] selects which dimensions of a query route take part in a
//! filtered listing. Bit values are those of the kernel `RT_FILTER_*` flags,
//! so masks built by other tooling can be passed through unchanged.

use netlinker_types::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::route::Route;

/// Set of route dimensions selected for a filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteFilter(u64);

impl RouteFilter {
    /// Route protocol. Kept for bit compatibility; `project` ignores it.
    pub const PROTOCOL: Self = Self(1 << 0);
    /// Route scope. Kept for bit compatibility; `project` ignores it.
    pub const SCOPE: Self = Self(1 << 1);
    /// Route type. Kept for bit compatibility; `project` ignores it.
    pub const TYPE: Self = Self(1 << 2);
    /// Type of service. Kept for bit compatibility; `project` ignores it.
    pub const TOS: Self = Self(1 << 3);
    /// Ingress link index.
    pub const IIF: Self = Self(1 << 4);
    /// Egress link index.
    pub const OIF: Self = Self(1 << 5);
    /// Destination network.
    pub const DST: Self = Self(1 << 6);
    /// Preferred source.
    pub const SRC: Self = Self(1 << 7);
    /// Gateway.
    pub const GW: Self = Self(1 << 8);
    /// Routing table id.
    pub const TABLE: Self = Self(1 << 9);

    const NAMED: [(&'static str, Self); 10] = [
        ("protocol", Self::PROTOCOL),
        ("scope", Self::SCOPE),
        ("type", Self::TYPE),
        ("tos", Self::TOS),
        ("iif", Self::IIF),
        ("oif", Self::OIF),
        ("dst", Self::DST),
        ("src", Self::SRC),
        ("gw", Self::GW),
        ("table", Self::TABLE),
    ];

    /// The empty mask: every route matches an empty query.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wraps raw kernel flag bits. Unknown bits are kept and ignored.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw flag bits.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if every dimension in `other` is selected.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for RouteFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RouteFilter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Display for RouteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// Parses a `|` or `,` separated list of dimension names, e.g. `dst|gw`.
impl FromStr for RouteFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = Self::empty();
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("none") {
                continue;
            }
            let (_, flag) = Self::NAMED
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .ok_or_else(|| ParseError::InvalidFilter(part.to_string()))?;
            filter |= *flag;
        }
        Ok(filter)
    }
}

/// Projects `route` onto the dimensions selected by `filter`.
///
/// The result carries dst, gw, src, table, link_index and ilink_index only
/// when their dimension is selected; every other field is left unset.
pub fn project(route: &Route, filter: RouteFilter) -> Route {
    let mut projected = Route::default();

    if filter.contains(RouteFilter::DST) {
        projected.dst = route.dst;
    }
    if filter.contains(RouteFilter::GW) {
        projected.gw = route.gw;
    }
    if filter.contains(RouteFilter::SRC) {
        projected.src = route.src;
    }
    if filter.contains(RouteFilter::TABLE) {
        projected.table = route.table;
    }
    if filter.contains(RouteFilter::OIF) {
        projected.link_index = route.link_index;
    }
    if filter.contains(RouteFilter::IIF) {
        projected.ilink_index = route.ilink_index;
    }

    projected
}
