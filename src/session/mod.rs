//! Authenticated access to the imagery catalog
//!
//! `SessionManager` owns both catalog connections (the search API and the
//! independent download session). Everything else goes through its
//! operations, never through the connections themselves.

mod catalog;
mod credentials;
mod manager;
pub mod m2m;

pub use catalog::{CatalogClient, CatalogProvider, DownloadClient};
pub use credentials::Credentials;
pub use m2m::M2mProvider;
pub use manager::{SessionManager, SessionState};
