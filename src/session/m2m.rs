//! USGS Machine-to-Machine (M2M) JSON API backend
//!
//! Every endpoint is a JSON POST answering with an envelope of the form
//! `{"data": ..., "errorCode": ..., "errorMessage": ...}`. After `login`,
//! requests carry the API key in the `X-Auth-Token` header. The API and the
//! download handle log in separately and hold their own keys.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{AuthenticationError, CatalogError};
use crate::search::SceneQuery;
use crate::utils::progress::ProgressTracker;

use super::catalog::{CatalogClient, CatalogProvider, DownloadClient};
use super::credentials::Credentials;

pub const DEFAULT_ENDPOINT: &str = "https://m2m.cr.usgs.gov/api/api/json/stable";

const AUTH_HEADER: &str = "X-Auth-Token";
const DOWNLOAD_LABEL: &str = "scenekit";
const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

impl Envelope {
    fn into_data(self) -> Result<Value, CatalogError> {
        match self.error_code {
            Some(code) => Err(CatalogError::Api {
                code,
                message: self.error_message.unwrap_or_default(),
            }),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// One logged-in M2M connection
struct Connection {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl Connection {
    fn login(endpoint: &str, timeout: Duration, credentials: &Credentials) -> Result<Self, AuthenticationError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scenekit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthenticationError::Unreachable(format!("cannot create HTTP client: {}", e)))?;

        let mut connection = Connection {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: None,
        };

        let body = json!({ "username": credentials.username, "password": credentials.password() });
        let data = connection.post("login", &body).map_err(|e| match e {
            CatalogError::Api { code, message } => AuthenticationError::Rejected {
                username: credentials.username.clone(),
                reason: format!("{}: {}", code, message),
            },
            other => AuthenticationError::Unreachable(other.to_string()),
        })?;

        match data {
            Value::String(key) if !key.is_empty() => {
                connection.api_key = Some(key);
                Ok(connection)
            }
            other => Err(AuthenticationError::Rejected {
                username: credentials.username.clone(),
                reason: format!("login returned no API key ({})", other),
            }),
        }
    }

    fn post(&self, endpoint: &str, body: &Value) -> Result<Value, CatalogError> {
        let url = format!("{}/{}", self.endpoint, endpoint);
        debug!("POST {}", url);

        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header(AUTH_HEADER, key);
        }

        let response = request.send()?;
        let status = response.status();
        let envelope: Envelope = response.json()
            .map_err(|e| CatalogError::Decode(format!("{} answered HTTP {}: {}", endpoint, status, e)))?;
        envelope.into_data()
    }

    fn logout(&mut self) -> Result<(), CatalogError> {
        if self.api_key.is_none() {
            return Ok(());
        }
        let result = self.post("logout", &Value::Null).map(|_| ());
        self.api_key = None;
        result
    }
}

/// Builds M2M connections for a catalog dataset
pub struct M2mProvider {
    endpoint: String,
    dataset: String,
    timeout: Duration,
}

impl M2mProvider {
    pub fn new(endpoint: &str, dataset: &str, timeout: Duration) -> Self {
        M2mProvider {
            endpoint: endpoint.to_string(),
            dataset: dataset.to_string(),
            timeout,
        }
    }
}

impl CatalogProvider for M2mProvider {
    fn login_api(&self, credentials: &Credentials) -> Result<Box<dyn CatalogClient>, AuthenticationError> {
        let connection = Connection::login(&self.endpoint, self.timeout, credentials)?;
        info!("Logged in to M2M API at {}", self.endpoint);
        Ok(Box::new(M2mCatalog { connection }))
    }

    fn login_download(&self, credentials: &Credentials) -> Result<Box<dyn DownloadClient>, AuthenticationError> {
        let connection = Connection::login(&self.endpoint, self.timeout, credentials)?;
        info!("Opened M2M download session");
        Ok(Box::new(M2mDownloader {
            connection,
            dataset: self.dataset.clone(),
        }))
    }
}

struct M2mCatalog {
    connection: Connection,
}

impl CatalogClient for M2mCatalog {
    fn search(&self, query: &SceneQuery) -> Result<Vec<Value>, CatalogError> {
        let data = self.connection.post("scene-search", &scene_search_body(query))?;
        let results = data.get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| CatalogError::Decode("scene-search response has no results array".to_string()))?;

        debug!("scene-search returned {} results", results.len());
        Ok(results.iter().map(scene_record).collect())
    }

    fn logout(&mut self) -> Result<(), CatalogError> {
        self.connection.logout()
    }
}

struct M2mDownloader {
    connection: Connection,
    dataset: String,
}

impl M2mDownloader {
    fn request_url(&self, scene_id: &str, file_suffix: &str) -> Result<String, CatalogError> {
        let options = self.connection.post("download-options", &json!({
            "datasetName": self.dataset,
            "entityIds": [scene_id],
            "includeSecondaryFileGroups": true,
        }))?;

        let (entity_id, product_id) = find_download(&options, file_suffix).ok_or_else(|| {
            CatalogError::Unavailable(format!("no downloadable *{} file for scene {}", file_suffix, scene_id))
        })?;

        let request = self.connection.post("download-request", &json!({
            "downloads": [{ "entityId": entity_id, "productId": product_id }],
            "label": DOWNLOAD_LABEL,
        }))?;

        if let Some(url) = available_url(&request) {
            return Ok(url);
        }
        let preparing = request.get("preparingDownloads")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if preparing > 0 {
            Err(CatalogError::Unavailable(format!("*{} of scene {} is still being prepared", file_suffix, scene_id)))
        } else {
            Err(CatalogError::Decode("download-request returned no download URL".to_string()))
        }
    }
}

impl DownloadClient for M2mDownloader {
    fn download(&self, scene_id: &str, file_suffix: &str, destination: &Path) -> Result<u64, CatalogError> {
        let url = self.request_url(scene_id, file_suffix)?;
        info!("Downloading *{} of scene {}", file_suffix, scene_id);

        let mut response = self.connection.http.get(&url).send()?.error_for_status()?;
        let tracker = ProgressTracker::for_bytes(response.content_length(), &format!("{} {}", scene_id, file_suffix));

        let partial = partial_path(destination);
        let written = match copy_to_file(&mut response, &partial, &tracker) {
            Ok(written) => written,
            Err(e) => {
                tracker.abandon("Failed");
                if let Err(cleanup) = fs::remove_file(&partial) {
                    warn!("Cannot remove partial download {}: {}", partial.display(), cleanup);
                }
                return Err(e);
            }
        };
        fs::rename(&partial, destination)?;
        tracker.finish();

        Ok(written)
    }

    fn logout(&mut self) -> Result<(), CatalogError> {
        self.connection.logout()
    }
}

fn copy_to_file(source: &mut dyn Read, path: &Path, tracker: &ProgressTracker) -> Result<u64, CatalogError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = source.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n])?;
        written += n as u64;
        tracker.increment(n as u64);
    }
    writer.flush()?;

    Ok(written)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Request body for `scene-search` around a single point
fn scene_search_body(query: &SceneQuery) -> Value {
    let point = json!({
        "latitude": query.coordinate.latitude(),
        "longitude": query.coordinate.longitude(),
    });

    json!({
        "datasetName": query.dataset,
        "maxResults": query.max_results,
        "sceneFilter": {
            "spatialFilter": {
                "filterType": "mbr",
                "lowerLeft": point,
                "upperRight": point,
            },
            "acquisitionFilter": {
                "start": query.window.start_string(),
                "end": query.window.end_string(),
            },
            "cloudCoverFilter": {
                "min": 0,
                "max": query.max_cloud_cover,
                "includeUnknown": true,
            },
        },
    })
}

/// Flatten an M2M search result into the record shape the search engine consumes
fn scene_record(result: &Value) -> Value {
    json!({
        "entity_id": result.get("entityId").cloned().unwrap_or(Value::Null),
        "display_id": result.get("displayId").cloned().unwrap_or(Value::Null),
        "cloud_cover": result.get("cloudCover").cloned().unwrap_or(Value::Null),
        "acquisition_date": result.pointer("/temporalCoverage/startDate").cloned().unwrap_or(Value::Null),
    })
}

/// Find `(entityId, productId)` of the available file whose display id ends in `file_suffix`
fn find_download(options: &Value, file_suffix: &str) -> Option<(String, String)> {
    let products = options.as_array()?;
    let files = products.iter().flat_map(|product| {
        let secondary = product.get("secondaryDownloads")
            .and_then(Value::as_array)
            .map(|s| s.iter().collect::<Vec<_>>())
            .unwrap_or_default();
        std::iter::once(product).chain(secondary)
    });

    for file in files {
        let available = file.get("available").and_then(Value::as_bool).unwrap_or(true);
        let display_id = file.get("displayId").and_then(Value::as_str).unwrap_or_default();
        if available && display_id.ends_with(file_suffix) {
            let Some(entity_id) = file.get("entityId").and_then(Value::as_str) else {
                continue;
            };
            let product_id = match file.get("id") {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => continue,
            };
            return Some((entity_id.to_string(), product_id));
        }
    }
    None
}

fn available_url(request: &Value) -> Option<String> {
    request.get("availableDownloads")?
        .as_array()?
        .iter()
        .find_map(|d| d.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;
    use crate::search::DateWindow;
    use chrono::NaiveDate;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn api_errors_come_from_the_envelope() {
        let envelope: Envelope = serde_json::from_value(json!({
            "requestId": 1, "data": null,
            "errorCode": "AUTH_INVALID", "errorMessage": "User credential denied"
        })).unwrap();

        match envelope.into_data() {
            Err(CatalogError::Api { code, message }) => {
                assert_eq!(code, "AUTH_INVALID");
                assert_eq!(message, "User credential denied");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn search_body_uses_point_mbr_and_date_strings() {
        let query = SceneQuery {
            dataset: "landsat_ot_c2_l2".into(),
            coordinate: Coordinate::new(34.05, -118.25).unwrap(),
            window: DateWindow::ending_on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 30).unwrap(),
            max_cloud_cover: 50.0,
            max_results: 100,
        };
        let body = scene_search_body(&query);

        assert_eq!(body["datasetName"], "landsat_ot_c2_l2");
        assert_eq!(body["sceneFilter"]["acquisitionFilter"]["start"], "2024-05-16");
        assert_eq!(body["sceneFilter"]["acquisitionFilter"]["end"], "2024-06-15");
        assert_eq!(body["sceneFilter"]["spatialFilter"]["lowerLeft"]["latitude"], 34.05);
        assert_eq!(body["sceneFilter"]["cloudCoverFilter"]["max"], 50.0);
    }

    #[test]
    fn flattens_search_results() {
        let record = scene_record(&json!({
            "entityId": "LC80410362024167LGN00",
            "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1",
            "cloudCover": "12.5",
            "temporalCoverage": { "startDate": "2024-06-15 00:00:00", "endDate": "2024-06-15 00:00:00" }
        }));

        assert_eq!(record["entity_id"], "LC80410362024167LGN00");
        assert_eq!(record["cloud_cover"], "12.5");
        assert_eq!(record["acquisition_date"], "2024-06-15 00:00:00");
    }

    #[test]
    fn finds_band_file_among_secondary_downloads() {
        let options = json!([{
            "id": "5e81f14f92acf9ef", "entityId": "LC80410362024167LGN00",
            "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1", "available": true,
            "secondaryDownloads": [
                { "id": "5e81f14f9", "entityId": "L2ST_B10_TIF", "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1_ST_B10.TIF", "available": true },
                { "id": "5e81f14fa", "entityId": "L2SR_B4_TIF", "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1_SR_B4.TIF", "available": true }
            ]
        }]);

        assert_eq!(
            find_download(&options, "SR_B4.TIF"),
            Some(("L2SR_B4_TIF".to_string(), "5e81f14fa".to_string()))
        );
        assert_eq!(find_download(&options, "SR_B7.TIF"), None);
    }

    #[test]
    fn entry_without_entity_id_does_not_end_the_scan() {
        let options = json!([{
            "id": "5e81f14f92acf9ef", "entityId": "LC80410362024167LGN00",
            "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1", "available": true,
            "secondaryDownloads": [
                { "id": "5e81f14f9", "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1_SR_B4.TIF", "available": true },
                { "id": "5e81f14fa", "entityId": "L2SR_B4_TIF", "displayId": "LC08_L2SP_041036_20240615_20240621_02_T1_SR_B4.TIF", "available": true }
            ]
        }]);

        assert_eq!(
            find_download(&options, "SR_B4.TIF"),
            Some(("L2SR_B4_TIF".to_string(), "5e81f14fa".to_string()))
        );
    }

    /// Answer a single HTTP request on a local port with `status` and `body`
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            loop {
                let read = stream.read(&mut buffer).unwrap();
                request.extend_from_slice(&buffer[..read]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text.lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if read == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status, body.len(), body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });

        endpoint
    }

    fn credentials() -> Credentials {
        Credentials::new("alice", "secret")
    }

    #[test]
    fn login_keeps_the_api_key() {
        let endpoint = serve_once("200 OK", r#"{"requestId": 1, "data": "a1b2c3", "errorCode": null}"#);
        let connection = Connection::login(&endpoint, Duration::from_secs(5), &credentials()).unwrap();
        assert_eq!(connection.api_key.as_deref(), Some("a1b2c3"));
    }

    #[test]
    fn login_api_error_is_rejected() {
        let endpoint = serve_once(
            "200 OK",
            r#"{"requestId": 1, "data": null, "errorCode": "AUTH_INVALID", "errorMessage": "User credential denied"}"#,
        );
        match Connection::login(&endpoint, Duration::from_secs(5), &credentials()) {
            Err(AuthenticationError::Rejected { username, reason }) => {
                assert_eq!(username, "alice");
                assert!(reason.starts_with("AUTH_INVALID"));
            }
            Err(other) => panic!("expected rejection, got {:?}", other),
            Ok(_) => panic!("expected rejection, got a connection"),
        }
    }

    #[test]
    fn login_without_key_is_rejected() {
        let endpoint = serve_once("200 OK", r#"{"requestId": 1, "data": null, "errorCode": null}"#);
        assert!(matches!(
            Connection::login(&endpoint, Duration::from_secs(5), &credentials()),
            Err(AuthenticationError::Rejected { .. })
        ));
    }

    #[test]
    fn login_against_non_json_answer_is_unreachable() {
        let endpoint = serve_once("502 Bad Gateway", "<html>Bad Gateway</html>");
        assert!(matches!(
            Connection::login(&endpoint, Duration::from_secs(5), &credentials()),
            Err(AuthenticationError::Unreachable(_))
        ));
    }

    #[test]
    fn login_against_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        assert!(matches!(
            Connection::login(&endpoint, Duration::from_secs(5), &credentials()),
            Err(AuthenticationError::Unreachable(_))
        ));
    }

    #[test]
    fn partial_download_keeps_the_full_name() {
        assert_eq!(partial_path(Path::new("/cache/LC08_SR_B4.TIF")), PathBuf::from("/cache/LC08_SR_B4.TIF.part"));
    }
}
