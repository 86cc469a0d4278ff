//! HTTP API for the catalog.

mod error;
mod extract;
mod routes;

pub use error::ErrorBody;
pub use routes::{router, SharedCatalog};
