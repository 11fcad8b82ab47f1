//! Document mapping over the datastore.
//!
//! Split into four small layers: [`filter`] models filter documents,
//! [`query`] renders them into parameterized SurrealQL, [`entity`] declares
//! document schemas and their row codecs, and [`repository`] ties the three
//! to a [`crate::store::StoreClient`].

pub mod entity;
pub mod filter;
pub mod query;
pub mod repository;

pub use entity::Entity;
pub use filter::{Filter, Op};
pub use query::FindOptions;
pub use repository::Repository;
