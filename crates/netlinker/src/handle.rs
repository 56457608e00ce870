//! The route handle capability set.

use netlinker_types::FamilyFilter;

use crate::error::Result;
use crate::filter::RouteFilter;
use crate::route::Route;

/// Routing-table operations shared by the kernel-backed and in-memory
/// handles.
///
/// Code that manipulates routes should take `impl RouteHandle` (or
/// `&mut dyn RouteHandle`) so tests can pass a [`crate::MockHandle`] where
/// production passes a [`crate::KernelHandle`].
///
/// Handles are not synchronised; wrap one in a mutex to share it between
/// threads.
pub trait RouteHandle {
    /// Adds `route`.
    ///
    /// Fails with `InvalidRoute` for malformed routes and `DuplicateRoute`
    /// when a matching route already exists.
    fn route_add(&mut self, route: &Route) -> Result<()>;

    /// Deletes the first route matching `route`.
    ///
    /// Fails with `InvalidRoute` for malformed routes and `RouteNotFound`
    /// when nothing matches.
    fn route_del(&mut self, route: &Route) -> Result<()>;

    /// Lists routes of `family` whose `mask`-selected dimensions match
    /// `query`. A missing query matches everything the mask lets through.
    fn route_list_filtered(
        &self,
        family: FamilyFilter,
        query: Option<&Route>,
        mask: RouteFilter,
    ) -> Result<Vec<Route>>;

    /// Lists every route of `family`.
    fn route_list(&self, family: FamilyFilter) -> Result<Vec<Route>> {
        self.route_list_filtered(family, None, RouteFilter::empty())
    }
}
