//! SQL builder: identifiers come from entity declarations only, values are bound as parameters.

mod builder;
pub use builder::*;
