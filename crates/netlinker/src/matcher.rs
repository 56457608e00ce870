//! Route identity comparison.

use crate::route::Route;

/// Returns true if `a` and `b` describe the same route.
///
/// Destination, source and gateway must be set on both or neither; when set
/// on both they must be equal. Destinations compare by IP only, so
/// `10.0.0.0/8` matches `10.0.0.0/24`. MPLS destination and egress link index
/// must be equal. Table, ingress link index, rewrite destination and
/// multipath are never compared, so selecting `TABLE` or `IIF` in a
/// [`crate::RouteFilter`] does not narrow a mock listing.
pub fn routes_match(a: &Route, b: &Route) -> bool {
    let dst_equal = match (&a.dst, &b.dst) {
        (Some(x), Some(y)) => x.address() == y.address(),
        (None, None) => true,
        _ => false,
    };

    dst_equal
        && a.src == b.src
        && a.gw == b.gw
        && a.mpls_dst == b.mpls_dst
        && a.link_index == b.link_index
}
