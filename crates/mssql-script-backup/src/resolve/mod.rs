//! Object selection and ordering.
//!
//! - [`DatabaseSelector`]: which databases a run visits
//! - [`ObjectResolver`]: which objects of a database are in scope
//! - [`DependencyOrderer`]: the order those objects are scripted in

mod databases;
mod objects;
mod order;

pub use databases::DatabaseSelector;
pub use objects::{ObjectResolver, LEGACY_COMPATIBILITY_LEVEL};
pub use order::DependencyOrderer;
