//! Error types for route handle operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. The three
//! rejections (`InvalidRoute`, `DuplicateRoute`, `RouteNotFound`) never
//! change handle state.

use netlinker_types::{AddressFamily, ParseError};
use thiserror::Error;

/// Result type alias for route handle operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Reason a route descriptor was refused by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRoute {
    /// None of dst, src, gw or mpls_dst is set.
    #[error("missing identifier: one of dst, src, gw or mpls_dst must be set")]
    MissingIdentifier,

    /// An address-bearing field disagrees with the route's family.
    #[error("family mismatch: {field} is {found}, expected {expected}")]
    FamilyMismatch {
        /// The field that disagreed (e.g. "gw", "multipath[1].new_dst").
        field: String,
        /// The family established earlier in the route.
        expected: AddressFamily,
        /// The family of the offending field.
        found: AddressFamily,
    },
}

/// Errors that can occur during route handle operations.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The route descriptor is malformed.
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] InvalidRoute),

    /// A matching route is already present.
    #[error("route already exists")]
    DuplicateRoute,

    /// No stored route matches the request.
    #[error("route not found")]
    RouteNotFound,

    /// The kernel rejected or failed a netlink request.
    #[error("netlink operation failed: {operation}: {message}")]
    Netlink {
        /// The operation that failed (e.g. "add", "dump").
        operation: String,
        /// Error message.
        message: String,
    },

    /// The kernel-backed handle is not available on this platform.
    #[error("kernel route handle is not supported on this platform")]
    Unsupported,

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A textual address, prefix or filter could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl RouteError {
    /// Creates a netlink error.
    pub fn netlink(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Netlink {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true for the rejections a route handle reports about the
    /// request itself, as opposed to transport or configuration failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RouteError::InvalidRoute(_) | RouteError::DuplicateRoute | RouteError::RouteNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        assert_eq!(RouteError::DuplicateRoute.to_string(), "route already exists");
        assert_eq!(RouteError::RouteNotFound.to_string(), "route not found");

        let err = RouteError::from(InvalidRoute::MissingIdentifier);
        assert!(err.to_string().starts_with("invalid route: missing identifier"));
    }

    #[test]
    fn test_family_mismatch_display() {
        let err = InvalidRoute::FamilyMismatch {
            field: "gw".to_string(),
            expected: AddressFamily::V4,
            found: AddressFamily::V6,
        };
        assert_eq!(err.to_string(), "family mismatch: gw is v6, expected v4");
    }

    #[test]
    fn test_netlink_error() {
        let err = RouteError::netlink("add", "Operation not permitted");
        assert_eq!(
            err.to_string(),
            "netlink operation failed: add: Operation not permitted"
        );
    }

    #[test]
    fn test_is_rejection() {
        assert!(RouteError::DuplicateRoute.is_rejection());
        assert!(RouteError::RouteNotFound.is_rejection());
        assert!(RouteError::from(InvalidRoute::MissingIdentifier).is_rejection());
        assert!(!RouteError::Unsupported.is_rejection());
        assert!(!RouteError::config("bad").is_rejection());
    }

    #[test]
    fn test_parse_errors_convert() {
        fn parse_dst(text: &str) -> Result<netlinker_types::IpPrefix> {
            Ok(text.parse()?)
        }
        assert!(parse_dst("10.0.0.0/8").is_ok());
        assert!(matches!(parse_dst("10.0.0.0/99"), Err(RouteError::Parse(_))));
    }
}
