//! Route handles for netlinker.
//!
//! A [`RouteHandle`] adds, deletes and lists routes in a routing table.
//! Two implementations are provided:
//!
//! - [`KernelHandle`]: talks `NETLINK_ROUTE` to the running kernel (Linux only)
//! - [`MockHandle`]: keeps routes in memory, for tests that must not touch
//!   kernel state
//!
//! Both run every descriptor through [`validate_route`] first and report
//! failures as [`RouteError`].
//!
//! ```
//! use netlinker::{FamilyFilter, MockHandle, Route, RouteFilter, RouteHandle};
//!
//! let mut handle = MockHandle::new();
//! let route = Route::new()
//!     .with_dst("10.10.10.0/24".parse().unwrap())
//!     .with_link_index(5);
//! handle.route_add(&route).unwrap();
//!
//! let query = Route::new().with_link_index(5);
//! let found = handle
//!     .route_list_filtered(FamilyFilter::V4, Some(&query), RouteFilter::OIF)
//!     .unwrap();
//! assert_eq!(found, vec![route]);
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod handle;
pub mod kernel;
pub mod matcher;
pub mod mock;
pub mod route;
pub mod validate;

pub use config::{KernelConfig, LogFormat, LoggingConfig, NetlinkerConfig};
pub use error::{InvalidRoute, Result, RouteError};
pub use filter::{project, RouteFilter};
pub use handle::RouteHandle;
pub use kernel::KernelHandle;
pub use matcher::routes_match;
pub use mock::MockHandle;
pub use route::{MplsLabel, NewDestination, NextHop, Route};
pub use validate::validate_route;

pub use netlinker_types::{AddressFamily, FamilyFilter, IpAddress, IpPrefix, ParseError};
