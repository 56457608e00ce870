//! Integration tests for the in-memory route handle
//!
//! Drives [`MockHandle`] through the public API only, the way code under test
//! would when it is handed a mock in place of a kernel handle.

use netlinker::{
    FamilyFilter, InvalidRoute, MockHandle, NetlinkerConfig, NextHop, Route, RouteError,
    RouteFilter, RouteHandle,
};
use pretty_assertions::assert_eq;

fn route(dst: &str, link_index: u32) -> Route {
    Route::new()
        .with_dst(dst.parse().expect("valid prefix"))
        .with_link_index(link_index)
}

/// Stand-in for production code written against the trait.
fn install_all(handle: &mut dyn RouteHandle, routes: &[Route]) -> Result<usize, RouteError> {
    for route in routes {
        handle.route_add(route)?;
    }
    Ok(routes.len())
}

fn routes_on_link<H: RouteHandle>(handle: &H, link_index: u32) -> Vec<Route> {
    let query = Route::new().with_link_index(link_index);
    handle
        .route_list_filtered(FamilyFilter::All, Some(&query), RouteFilter::OIF)
        .expect("listing never fails on a mock")
}

#[test]
fn test_add_list_delete_scenario() {
    let a = route("10.10.10.0/24", 5);
    let b = route("10.10.20.0/24", 5);
    let mut handle = MockHandle::new();

    handle.route_add(&a).unwrap();
    handle.route_add(&b).unwrap();
    assert_eq!(handle.len(), 2);

    assert!(routes_on_link(&handle, 2).is_empty());
    assert_eq!(routes_on_link(&handle, 5), vec![a.clone(), b.clone()]);

    let by_dst = handle
        .route_list_filtered(
            FamilyFilter::All,
            Some(&Route::new().with_dst("10.10.10.0/24".parse().unwrap())),
            RouteFilter::DST,
        )
        .unwrap();
    assert_eq!(by_dst, vec![a.clone()]);

    handle.route_del(&a).unwrap();
    assert_eq!(handle.len(), 1);

    let copy_of_b = by_dst_copy(&handle, &b);
    handle.route_del(&copy_of_b).unwrap();
    assert!(handle.is_empty());
}

fn by_dst_copy(handle: &MockHandle, wanted: &Route) -> Route {
    handle
        .route_list(FamilyFilter::All)
        .unwrap()
        .into_iter()
        .find(|r| r.dst == wanted.dst)
        .expect("route is stored")
}

#[test]
fn test_rejections_leave_store_unchanged() {
    let mut handle = MockHandle::new();
    let rt = route("10.10.10.0/24", 5);
    handle.route_add(&rt).unwrap();

    for _ in 0..3 {
        let err = handle.route_add(&rt).unwrap_err();
        assert!(matches!(err, RouteError::DuplicateRoute));
        assert!(err.is_rejection());
    }
    assert_eq!(handle.routes(), &[rt.clone()]);

    let err = handle.route_del(&route("10.10.30.0/24", 5)).unwrap_err();
    assert!(matches!(err, RouteError::RouteNotFound));
    assert_eq!(handle.routes(), &[rt]);
}

#[test]
fn test_add_then_delete_restores_store() {
    let mut handle = MockHandle::with_routes(&[route("10.0.0.0/24", 1)]).unwrap();
    let before = handle.routes().to_vec();

    let added = route("10.0.1.0/24", 1).with_gw("10.0.0.254".parse().unwrap());
    handle.route_add(&added).unwrap();

    // Table and prefix length do not take part in identity.
    let equivalent = route("10.0.1.0/25", 1)
        .with_gw("10.0.0.254".parse().unwrap())
        .with_table(100);
    handle.route_del(&equivalent).unwrap();

    assert_eq!(handle.routes(), before.as_slice());
}

#[test]
fn test_validation_gate() {
    let mut handle = MockHandle::new();
    let err = handle
        .route_add(&Route::new().with_link_index(5).with_table(10))
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::InvalidRoute(InvalidRoute::MissingIdentifier)
    ));

    let mixed = route("10.0.0.0/24", 1)
        .with_src("10.0.0.1".parse().unwrap())
        .with_gw("2001:db8::1".parse().unwrap());
    let err = handle.route_add(&mixed).unwrap_err();
    assert!(matches!(
        err,
        RouteError::InvalidRoute(InvalidRoute::FamilyMismatch { .. })
    ));
    assert!(handle.is_empty());
}

#[test]
fn test_family_filtering() {
    let mut handle = MockHandle::new();
    install_all(
        &mut handle,
        &[route("10.0.1.0/24", 1), route("10.0.2.0/24", 2)],
    )
    .unwrap();

    assert!(handle.route_list(FamilyFilter::V6).unwrap().is_empty());
    assert_eq!(handle.route_list(FamilyFilter::V4).unwrap().len(), 2);
    assert_eq!(handle.route_list(FamilyFilter::All).unwrap().len(), 2);

    handle.route_add(&route("2001:db8::/64", 1)).unwrap();
    assert_eq!(
        handle.route_list(FamilyFilter::V6).unwrap(),
        vec![route("2001:db8::/64", 1)]
    );
}

#[test]
fn test_mask_selects_dimensions() {
    // Differ only in link_index; the empty mask makes every query match.
    let first = route("10.0.1.0/24", 1).with_gw("10.0.0.254".parse().unwrap());
    let second = Route {
        link_index: 2,
        ..first.clone()
    };
    let mut handle = MockHandle::new();
    handle.route_add(&first).unwrap();
    handle.route_add(&second).unwrap();

    let query = Route::new().with_link_index(2);
    let oif = handle
        .route_list_filtered(FamilyFilter::All, Some(&query), RouteFilter::OIF)
        .unwrap();
    assert_eq!(oif, vec![second]);

    let unmasked = handle
        .route_list_filtered(FamilyFilter::All, Some(&query), RouteFilter::empty())
        .unwrap();
    assert_eq!(unmasked.len(), 2);
}

#[test]
fn test_missing_query_matches_unset_dimensions() {
    let unbound = route("10.0.1.0/24", 0);
    let bound = route("10.0.2.0/24", 3);
    let mut handle = MockHandle::new();
    handle.route_add(&unbound).unwrap();
    handle.route_add(&bound).unwrap();

    // No query is an empty route, so OIF only admits link_index 0.
    let found = handle
        .route_list_filtered(FamilyFilter::All, None, RouteFilter::OIF)
        .unwrap();
    assert_eq!(found, vec![unbound]);

    let found = handle
        .route_list_filtered(FamilyFilter::All, None, RouteFilter::DST)
        .unwrap();
    assert!(found.is_empty());

    let found = handle
        .route_list_filtered(FamilyFilter::All, None, RouteFilter::empty())
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_multipath_routes_are_stored_whole() {
    let ecmp = route("10.0.9.0/24", 0)
        .with_next_hop(NextHop::via("10.0.0.1".parse().unwrap()).with_link_index(1))
        .with_next_hop(NextHop::via("10.0.0.2".parse().unwrap()).with_link_index(2));
    let mut handle = MockHandle::new();
    handle.route_add(&ecmp).unwrap();

    let listed = handle.route_list(FamilyFilter::V4).unwrap();
    assert_eq!(listed, vec![ecmp]);
    assert_eq!(listed[0].multipath.len(), 2);
}

#[test]
fn test_fixture_seeding() {
    let config = NetlinkerConfig::from_toml_str(
        r#"
        [[routes]]
        dst = "10.10.10.0/24"
        link_index = 5

        [[routes]]
        dst = "10.10.20.0/24"
        gw = "10.10.10.254"
        link_index = 5
        "#,
    )
    .unwrap();

    let handle = config.seeded_handle().unwrap();
    assert_eq!(routes_on_link(&handle, 5).len(), 2);
    assert_eq!(handle.routes(), config.routes.as_slice());
}
