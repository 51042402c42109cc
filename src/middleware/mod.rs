pub mod auth;
pub mod endpoints;
pub mod query;
pub mod require_user;

pub use auth::{authenticate, resolve_user};
pub use endpoints::route_custom_endpoints;
pub use query::parse_query;
pub use require_user::require_user;
