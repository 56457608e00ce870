//! Route descriptor types.
//!
//! A [`Route`] mirrors the subset of a kernel routing-table entry that route
//! handles understand. Every field is optional; `0` means "unset" for the
//! integer fields, as it does for the kernel.

use netlinker_types::{AddressFamily, IpAddress, IpPrefix};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MPLS label value (20 significant bits).
pub type MplsLabel = u32;

/// Rewrite destination carried by label-switched routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewDestination {
    /// Push or swap to this label stack, outermost first.
    Mpls(Vec<MplsLabel>),
    /// Forward via an address of a (possibly different) family.
    Via(IpAddress),
}

impl NewDestination {
    /// Returns the address family this destination belongs to.
    pub fn family(&self) -> AddressFamily {
        match self {
            NewDestination::Mpls(_) => AddressFamily::Mpls,
            NewDestination::Via(addr) => addr.family(),
        }
    }
}

impl fmt::Display for NewDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewDestination::Mpls(labels) => {
                let labels: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
                write!(f, "as {}", labels.join("/"))
            }
            NewDestination::Via(addr) => write!(f, "via {}", addr),
        }
    }
}

/// One alternative next hop of a multipath route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct NextHop {
    #[serde(skip_serializing_if = "is_zero")]
    pub link_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw: Option<IpAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_dst: Option<NewDestination>,
}

impl NextHop {
    /// Creates a next hop through a gateway.
    pub fn via(gw: IpAddress) -> Self {
        Self {
            gw: Some(gw),
            ..Default::default()
        }
    }

    /// Sets the egress interface index.
    pub fn with_link_index(mut self, link_index: u32) -> Self {
        self.link_index = link_index;
        self
    }

    /// Sets the rewrite destination.
    pub fn with_new_dst(mut self, new_dst: NewDestination) -> Self {
        self.new_dst = Some(new_dst);
        self
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("nexthop")?;
        if let Some(new_dst) = &self.new_dst {
            write!(f, " {}", new_dst)?;
        }
        if let Some(gw) = &self.gw {
            write!(f, " via {}", gw)?;
        }
        if self.link_index != 0 {
            write!(f, " dev {}", self.link_index)?;
        }
        Ok(())
    }
}

/// A route descriptor.
///
/// Equality (`PartialEq`) is full structural equality over every field. Route
/// handles use the looser identity in [`crate::routes_match`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    /// Destination network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<IpPrefix>,
    /// Preferred source address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<IpAddress>,
    /// Next-hop gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw: Option<IpAddress>,
    /// Rewrite destination for label-switched routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_dst: Option<NewDestination>,
    /// Egress interface index.
    #[serde(skip_serializing_if = "is_zero")]
    pub link_index: u32,
    /// Ingress interface index.
    #[serde(skip_serializing_if = "is_zero")]
    pub ilink_index: u32,
    /// Routing table id.
    #[serde(skip_serializing_if = "is_zero")]
    pub table: u32,
    /// Incoming MPLS label this route matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpls_dst: Option<MplsLabel>,
    /// Alternative next hops.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub multipath: Vec<NextHop>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Route {
    /// Creates an empty route. It is not acceptable to a handle until an
    /// identifying field is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the destination network.
    pub fn with_dst(mut self, dst: IpPrefix) -> Self {
        self.dst = Some(dst);
        self
    }

    /// Sets the preferred source address.
    pub fn with_src(mut self, src: IpAddress) -> Self {
        self.src = Some(src);
        self
    }

    /// Sets the gateway.
    pub fn with_gw(mut self, gw: IpAddress) -> Self {
        self.gw = Some(gw);
        self
    }

    /// Sets the rewrite destination.
    pub fn with_new_dst(mut self, new_dst: NewDestination) -> Self {
        self.new_dst = Some(new_dst);
        self
    }

    /// Sets the egress interface index.
    pub fn with_link_index(mut self, link_index: u32) -> Self {
        self.link_index = link_index;
        self
    }

    /// Sets the ingress interface index.
    pub fn with_ilink_index(mut self, ilink_index: u32) -> Self {
        self.ilink_index = ilink_index;
        self
    }

    /// Sets the routing table id.
    pub fn with_table(mut self, table: u32) -> Self {
        self.table = table;
        self
    }

    /// Sets the incoming MPLS label.
    pub fn with_mpls_dst(mut self, label: MplsLabel) -> Self {
        self.mpls_dst = Some(label);
        self
    }

    /// Appends a multipath next hop.
    pub fn with_next_hop(mut self, hop: NextHop) -> Self {
        self.multipath.push(hop);
        self
    }

    /// Returns the family used for top-level listing filters.
    ///
    /// Derived from the destination address, then the source, then the
    /// gateway; `Unspec` when none is set. MPLS routes without addresses are
    /// therefore `Unspec` here.
    pub fn family(&self) -> AddressFamily {
        if let Some(dst) = &self.dst {
            return dst.family();
        }
        if let Some(src) = &self.src {
            return src.family();
        }
        if let Some(gw) = &self.gw {
            return gw.family();
        }
        AddressFamily::Unspec
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.dst, self.mpls_dst) {
            (Some(dst), _) => write!(f, "{}", dst)?,
            (None, Some(label)) => write!(f, "{}", label)?,
            (None, None) => f.write_str("default")?,
        }
        if let Some(new_dst) = &self.new_dst {
            write!(f, " {}", new_dst)?;
        }
        if let Some(gw) = &self.gw {
            write!(f, " via {}", gw)?;
        }
        if self.link_index != 0 {
            write!(f, " dev {}", self.link_index)?;
        }
        if self.ilink_index != 0 {
            write!(f, " iif {}", self.ilink_index)?;
        }
        if let Some(src) = &self.src {
            write!(f, " src {}", src)?;
        }
        if self.table != 0 {
            write!(f, " table {}", self.table)?;
        }
        for hop in &self.multipath {
            write!(f, " {}", hop)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prefix(s: &str) -> IpPrefix {
        s.parse().unwrap()
    }

    fn ip(s: &str) -> IpAddress {
        s.parse().unwrap()
    }

    #[test]
    fn test_family_prefers_dst() {
        let route = Route::new()
            .with_dst(prefix("2001:db8::/64"))
            .with_gw(ip("10.0.0.1"));
        assert_eq!(route.family(), AddressFamily::V6);
    }

    #[test]
    fn test_family_falls_back_to_src_then_gw() {
        let route = Route::new().with_src(ip("10.0.0.2")).with_gw(ip("fe80::1"));
        assert_eq!(route.family(), AddressFamily::V4);

        let route = Route::new().with_gw(ip("fe80::1"));
        assert_eq!(route.family(), AddressFamily::V6);
    }

    #[test]
    fn test_family_unspec_for_label_route() {
        let route = Route::new().with_mpls_dst(100);
        assert_eq!(route.family(), AddressFamily::Unspec);
    }

    #[test]
    fn test_new_destination_family() {
        assert_eq!(
            NewDestination::Mpls(vec![100, 200]).family(),
            AddressFamily::Mpls
        );
        assert_eq!(
            NewDestination::Via(ip("2001:db8::1")).family(),
            AddressFamily::V6
        );
    }

    #[test]
    fn test_display() {
        let route = Route::new()
            .with_dst(prefix("10.10.20.0/24"))
            .with_gw(ip("10.10.10.254"))
            .with_link_index(3)
            .with_table(100);
        assert_eq!(
            route.to_string(),
            "10.10.20.0/24 via 10.10.10.254 dev 3 table 100"
        );

        let label = Route::new()
            .with_mpls_dst(100)
            .with_new_dst(NewDestination::Mpls(vec![200, 300]));
        assert_eq!(label.to_string(), "100 as 200/300");
    }

    #[test]
    fn test_serde_skips_unset_fields() {
        let route = Route::new()
            .with_dst(prefix("10.10.10.0/24"))
            .with_link_index(5);
        let json = serde_json::to_string(&route).unwrap();
        assert_eq!(json, r#"{"dst":"10.10.10.0/24","link_index":5}"#);

        let back: Route = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }

    #[test]
    fn test_serde_multipath() {
        let json = r#"{
            "dst": "10.1.0.0/16",
            "multipath": [
                {"gw": "10.0.0.1", "link_index": 2},
                {"gw": "10.0.0.2", "new_dst": {"mpls": [16]}}
            ]
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.multipath.len(), 2);
        assert_eq!(route.multipath[0], NextHop::via(ip("10.0.0.1")).with_link_index(2));
        assert_eq!(
            route.multipath[1].new_dst,
            Some(NewDestination::Mpls(vec![16]))
        );
    }
}
