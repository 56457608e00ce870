//! Route descriptor validation.
//!
//! Runs before every add and delete, on both handle variants.

use netlinker_types::AddressFamily;

use crate::error::InvalidRoute;
use crate::route::Route;

/// Tracks the family baseline while a route's fields are examined in order.
#[derive(Debug, Default)]
struct FamilyBaseline(Option<AddressFamily>);

impl FamilyBaseline {
    /// Compares `found` against the baseline without changing it.
    fn check(&self, field: impl Into<String>, found: AddressFamily) -> Result<(), InvalidRoute> {
        match self.0 {
            Some(expected) if expected != found => Err(InvalidRoute::FamilyMismatch {
                field: field.into(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Compares `found` against the baseline, then makes it the baseline.
    fn establish(&mut self, field: &str, found: AddressFamily) -> Result<(), InvalidRoute> {
        self.check(field, found)?;
        self.0 = Some(found);
        Ok(())
    }
}

/// Checks that `route` is acceptable to a route handle.
///
/// A route needs at least one of dst, src, gw or mpls_dst. Fields are then
/// examined in a fixed order: `new_dst`, `src`, `gw`, and each multipath
/// hop's `gw` and `new_dst`. Only `src` and `gw` set the family baseline;
/// the others are compared against whatever baseline exists when they are
/// reached. The top-level `new_dst` is reached before any baseline is set and
/// so never fails, and `dst` takes no part in the family check at all.
pub fn validate_route(route: &Route) -> Result<(), InvalidRoute> {
    if route.dst.is_none() && route.src.is_none() && route.gw.is_none() && route.mpls_dst.is_none()
    {
        return Err(InvalidRoute::MissingIdentifier);
    }

    let mut baseline = FamilyBaseline::default();

    if let Some(new_dst) = &route.new_dst {
        baseline.check("new_dst", new_dst.family())?;
    }

    if let Some(src) = &route.src {
        baseline.establish("src", src.family())?;
    }

    if let Some(gw) = &route.gw {
        baseline.establish("gw", gw.family())?;
    }

    for (i, hop) in route.multipath.iter().enumerate() {
        if let Some(gw) = &hop.gw {
            baseline.check(format!("multipath[{}].gw", i), gw.family())?;
        }
        if let Some(new_dst) = &hop.new_dst {
            baseline.check(format!("multipath[{}].new_dst", i), new_dst.family())?;
        }
    }

    Ok(())
}
