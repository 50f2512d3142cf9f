//! Read access to registered entities over a checked-out connection.

mod crud;
pub use crud::{EntityQueries, EntityService};
