//! In-memory route handle.
//!
//! [`MockHandle`] keeps routes in insertion order and answers the same
//! requests a kernel routing table would, without privileges or kernel
//! state. Identity for duplicate and delete checks is [`routes_match`].

use netlinker_types::FamilyFilter;
use tracing::{debug, instrument, trace};

use crate::error::{Result, RouteError};
use crate::filter::{project, RouteFilter};
use crate::handle::RouteHandle;
use crate::matcher::routes_match;
use crate::route::Route;
use crate::validate::validate_route;

/// Mock route handle backed by an ordered list of routes.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    routes: Vec<Route>,
}

impl MockHandle {
    /// Creates an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle seeded with `routes`, added one by one.
    ///
    /// Stops at the first route `route_add` rejects.
    pub fn with_routes<'a>(routes: impl IntoIterator<Item = &'a Route>) -> Result<Self> {
        let mut handle = Self::new();
        for route in routes {
            handle.route_add(route)?;
        }
        Ok(handle)
    }

    /// Returns the stored routes in insertion order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of stored routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn position(&self, route: &Route) -> Option<usize> {
        self.routes.iter().position(|stored| routes_match(stored, route))
    }
}

impl RouteHandle for MockHandle {
    #[instrument(skip_all, fields(route = %route))]
    fn route_add(&mut self, route: &Route) -> Result<()> {
        validate_route(route)?;

        if self.position(route).is_some() {
            return Err(RouteError::DuplicateRoute);
        }

        self.routes.push(route.clone());
        debug!(count = self.routes.len(), "Route added");
        Ok(())
    }

    #[instrument(skip_all, fields(route = %route))]
    fn route_del(&mut self, route: &Route) -> Result<()> {
        validate_route(route)?;

        let index = self.position(route).ok_or(RouteError::RouteNotFound)?;
        let removed = self.routes.remove(index);
        debug!(removed = %removed, count = self.routes.len(), "Route deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(family = %family, mask = %mask))]
    fn route_list_filtered(
        &self,
        family: FamilyFilter,
        query: Option<&Route>,
        mask: RouteFilter,
    ) -> Result<Vec<Route>> {
        let wanted = project(query.unwrap_or(&Route::default()), mask);

        let results: Vec<Route> = self
            .routes
            .iter()
            .filter(|stored| {
                if !family.admits(stored.family()) {
                    trace!(route = %stored, "Skipping route of other family");
                    return false;
                }
                routes_match(&project(stored, mask), &wanted)
            })
            .cloned()
            .collect();

        trace!(count = results.len(), "Filtered listing complete");
        Ok(results)
    }
}
