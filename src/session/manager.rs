//! Session lifecycle: open both catalog handles, check validity on every
//! operation, release them exactly once.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use serde_json::Value;

use crate::errors::{AuthenticationError, CatalogError, SessionError};
use crate::search::SceneQuery;

use super::catalog::{CatalogClient, CatalogProvider, DownloadClient};
use super::credentials::Credentials;

/// Validity of the catalog session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active {
        opened_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    Closed,
}

struct Connections {
    api: Option<Box<dyn CatalogClient>>,
    download: Option<Box<dyn DownloadClient>>,
    state: SessionState,
}

impl Connections {
    fn check(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Closed => Err(SessionError::Closed),
            SessionState::Active { expires_at, .. } if Utc::now() >= expires_at => {
                Err(SessionError::Expired(expires_at))
            }
            SessionState::Active { .. } => Ok(()),
        }
    }
}

/// Owner of the authenticated catalog and download sessions
///
/// Opened once per process. Both handles are logged out together by
/// [`SessionManager::close`], which also runs on drop, so release happens
/// however the owner goes away.
pub struct SessionManager {
    username: String,
    inner: Mutex<Connections>,
}

impl SessionManager {
    /// Log in to the catalog API and the download service
    ///
    /// If the download login fails the API session is logged out again before
    /// the error is returned; no half-open manager is ever exposed.
    pub fn open(provider: &dyn CatalogProvider, credentials: &Credentials, ttl: Duration) -> Result<Self, AuthenticationError> {
        info!("Opening catalog session for user '{}'", credentials.username);
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(AuthenticationError::InvalidLifetime(ttl.num_minutes()));
        }

        let mut api = provider.login_api(credentials)?;
        let download = match provider.login_download(credentials) {
            Ok(download) => download,
            Err(e) => {
                warn!("Download login failed, releasing API session: {}", e);
                if let Err(logout_err) = api.logout() {
                    error!("Logout after failed open failed: {}", logout_err);
                }
                return Err(e);
            }
        };

        let opened_at = Utc::now();
        let expires_at = opened_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        debug!("Catalog session valid until {}", expires_at);

        Ok(SessionManager {
            username: credentials.username.clone(),
            inner: Mutex::new(Connections {
                api: Some(api),
                download: Some(download),
                state: SessionState::Active { opened_at, expires_at },
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connections> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Whether operations would currently be accepted
    pub fn is_active(&self) -> bool {
        self.lock().check().is_ok()
    }

    /// Fail with the reason the session cannot be used, if any
    pub fn ensure_active(&self) -> Result<(), SessionError> {
        self.lock().check()
    }

    /// Run a scene search through the API session
    pub fn search_scenes(&self, query: &SceneQuery) -> Result<Vec<Value>, CatalogError> {
        let connections = self.lock();
        connections.check()?;
        let api = connections.api.as_ref().ok_or(SessionError::Closed)?;
        api.search(query)
    }

    /// Download a band file to `{dest_dir}/{scene_id}_{band}.TIF`
    pub fn download_scene(&self, scene_id: &str, band: &str, dest_dir: &Path) -> Result<PathBuf, CatalogError> {
        let destination = dest_dir.join(format!("{}_{}.TIF", scene_id, band));
        self.download_file(scene_id, &format!("{}.TIF", band), &destination)?;
        Ok(destination)
    }

    /// Download the MTL metadata sidecar to `{dest_dir}/{scene_id}_MTL.xml`
    pub fn download_sidecar(&self, scene_id: &str, dest_dir: &Path) -> Result<PathBuf, CatalogError> {
        let destination = dest_dir.join(format!("{}_MTL.xml", scene_id));
        self.download_file(scene_id, "MTL.xml", &destination)?;
        Ok(destination)
    }

    fn download_file(&self, scene_id: &str, suffix: &str, destination: &Path) -> Result<(), CatalogError> {
        let connections = self.lock();
        connections.check()?;
        let download = connections.download.as_ref().ok_or(SessionError::Closed)?;

        let bytes = download.download(scene_id, suffix, destination)?;
        info!("Downloaded {} ({} bytes) for scene {}", destination.display(), bytes, scene_id);
        Ok(())
    }

    /// Log out of both services
    ///
    /// Idempotent. Logout failures are logged and never returned.
    pub fn close(&self) {
        let mut connections = self.lock();
        if connections.state == SessionState::Closed {
            return;
        }
        connections.state = SessionState::Closed;

        if let Some(mut api) = connections.api.take() {
            if let Err(e) = api.logout() {
                error!("Catalog API logout failed: {}", e);
            }
        }
        if let Some(mut download) = connections.download.take() {
            if let Err(e) = download.logout() {
                error!("Download service logout failed: {}", e);
            }
        }
        info!("Catalog session for '{}' closed", self.username);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}
