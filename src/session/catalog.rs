//! Contracts between the session manager and a catalog backend
//!
//! A provider hands out two independently authenticated handles: one for
//! metadata queries and one for file downloads. The M2M implementation lives in
//! `session::m2m`; tests plug in their own.

use std::path::Path;

use serde_json::Value;

use crate::errors::{AuthenticationError, CatalogError};
use crate::search::SceneQuery;

use super::credentials::Credentials;

/// Authenticated handle for scene metadata queries
pub trait CatalogClient: Send {
    /// Run a scene search, returning one record per scene in catalog order.
    ///
    /// Records carry at least `entity_id`, `cloud_cover` and `acquisition_date`.
    fn search(&self, query: &SceneQuery) -> Result<Vec<Value>, CatalogError>;

    fn logout(&mut self) -> Result<(), CatalogError>;
}

/// Authenticated handle for scene file downloads
pub trait DownloadClient: Send {
    /// Download the scene file whose name ends in `file_suffix` (e.g. `SR_B4.TIF`) to `destination`.
    /// Returns the number of bytes written.
    fn download(&self, scene_id: &str, file_suffix: &str, destination: &Path) -> Result<u64, CatalogError>;

    fn logout(&mut self) -> Result<(), CatalogError>;
}

/// Opens the two catalog handles for a set of credentials
pub trait CatalogProvider {
    fn login_api(&self, credentials: &Credentials) -> Result<Box<dyn CatalogClient>, AuthenticationError>;

    fn login_download(&self, credentials: &Credentials) -> Result<Box<dyn DownloadClient>, AuthenticationError>;
}
