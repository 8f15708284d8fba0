//! Firebase backend adapter.
//!
//! Implements [`BackendPort`] over the two Firebase REST surfaces:
//!
//! | Port call                  | Service   | HTTP                              |
//! |----------------------------|-----------|-----------------------------------|
//! | `get_record`               | RTDB      | `GET   {host}{path}.json`         |
//! | `set_record`               | RTDB      | `PUT   {host}{path}.json`         |
//! | `update_record`            | RTDB      | `PATCH {host}{path}.json`         |
//! | `get_document`             | Firestore | `GET   …/documents/{path}`        |
//! | `patch_document`           | Firestore | `PATCH …/documents/{path}?updateMask…` |
//! | `create_document`          | Firestore | `POST  …/documents/{coll}?documentId=` |
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `embedded_svc` HTTP client over
//!   `EspHttpConnection` with the IDF certificate bundle.
//! - **all other targets**: an in-memory RTDB tree and document store
//!   with link and fault injection, used by host tests.
//!
//! A transport failure tears the client down; `is_ready()` then reports
//! `false` until [`BackendPort::reconnect`] succeeds.

use log::{debug, info, warn};
use serde_json::Value;

use crate::app::ports::BackendPort;
use crate::backend::firestore;
use crate::config::Secrets;
use crate::error::BackendError;

#[cfg(target_os = "espidf")]
use embedded_svc::http::Method;
#[cfg(target_os = "espidf")]
use embedded_svc::http::client::Client as HttpClient;
#[cfg(target_os = "espidf")]
use embedded_svc::io::Write;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};

#[cfg(not(target_os = "espidf"))]
use serde_json::Map;
#[cfg(not(target_os = "espidf"))]
use std::collections::BTreeMap;

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1/projects";

// ───────────────────────────────────────────────────────────────
// Endpoints
// ───────────────────────────────────────────────────────────────

/// Where the two databases live and how calls authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseEndpoints {
    /// RTDB host without scheme, e.g. `box-default-rtdb.firebaseio.com`.
    pub rtdb_host: String,
    /// RTDB `auth` query token (database secret or ID token).
    pub rtdb_auth: String,
    pub project_id: String,
    pub api_key: String,
}

impl FirebaseEndpoints {
    pub fn from_secrets(secrets: &Secrets) -> Self {
        Self {
            rtdb_host: secrets
                .firebase_host
                .trim_start_matches("https://")
                .trim_end_matches('/')
                .to_string(),
            rtdb_auth: secrets.firebase_auth.to_string(),
            project_id: secrets.firebase_project.to_string(),
            api_key: secrets.firebase_api_key.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.rtdb_host.is_empty() && !self.project_id.is_empty()
    }

    /// `https://{host}{path}.json[?auth=…]`.
    pub fn record_url(&self, path: &str) -> Result<String, BackendError> {
        check_record_path(path)?;
        let mut url = format!("https://{}{}.json", self.rtdb_host, path.trim_end_matches('/'));
        if !self.rtdb_auth.is_empty() {
            url.push_str("?auth=");
            url.push_str(&self.rtdb_auth);
        }
        Ok(url)
    }

    fn documents_root(&self) -> String {
        format!("{}/{}/databases/(default)/documents", FIRESTORE_BASE, self.project_id)
    }

    fn key_param(&self, first: bool) -> String {
        if self.api_key.is_empty() {
            String::new()
        } else {
            format!("{}key={}", if first { '?' } else { '&' }, self.api_key)
        }
    }

    /// Document URL for reads.
    pub fn document_url(&self, path: &str) -> Result<String, BackendError> {
        check_document_path(path)?;
        Ok(format!("{}/{}{}", self.documents_root(), path, self.key_param(true)))
    }

    /// Document URL for a merge-patch of the top-level keys in `fields`.
    pub fn patch_url(&self, path: &str, fields: &Value) -> Result<String, BackendError> {
        check_document_path(path)?;
        let mask = firestore::update_mask_query(fields);
        if mask.is_empty() {
            return Err(BackendError::Malformed);
        }
        Ok(format!(
            "{}/{}?{}{}",
            self.documents_root(),
            path,
            mask,
            self.key_param(false)
        ))
    }

    /// Collection URL for creating the document at `path` with its id.
    pub fn create_url(&self, path: &str) -> Result<String, BackendError> {
        check_document_path(path)?;
        let (collection, id) = path.rsplit_once('/').ok_or(BackendError::Rejected(400))?;
        Ok(format!(
            "{}/{}?documentId={}{}",
            self.documents_root(),
            collection,
            id,
            self.key_param(false)
        ))
    }
}

/// RTDB paths are absolute: `/a/b`.
fn check_record_path(path: &str) -> Result<(), BackendError> {
    if path.starts_with('/') && !path.contains("//") && !path.contains('.') {
        Ok(())
    } else {
        Err(BackendError::Rejected(400))
    }
}

/// Firestore document paths alternate collection/document: `c/d[/c/d…]`.
fn check_document_path(path: &str) -> Result<(), BackendError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() >= 2 && segments.len() % 2 == 0 && segments.iter().all(|s| !s.is_empty()) {
        Ok(())
    } else {
        Err(BackendError::Rejected(400))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Get,
    Put,
    Patch,
    Post,
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct FirebaseAdapter {
    endpoints: FirebaseEndpoints,
    #[cfg(target_os = "espidf")]
    client: Option<HttpClient<EspHttpConnection>>,
    #[cfg(target_os = "espidf")]
    timeout: core::time::Duration,

    /// Simulation: client initialised.
    #[cfg(not(target_os = "espidf"))]
    ready: bool,
    /// Simulation: network path to Firebase up.
    #[cfg(not(target_os = "espidf"))]
    link_up: bool,
    /// Simulation: every call fails with this until cleared.
    #[cfg(not(target_os = "espidf"))]
    fault: Option<BackendError>,
    #[cfg(not(target_os = "espidf"))]
    rtdb: Value,
    /// Simulation: documents stored in Firestore wire form.
    #[cfg(not(target_os = "espidf"))]
    documents: BTreeMap<String, Value>,
    #[cfg(not(target_os = "espidf"))]
    writes: u32,
}

impl FirebaseAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(endpoints: FirebaseEndpoints, timeout: core::time::Duration) -> Self {
        Self {
            endpoints,
            client: None,
            timeout,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(endpoints: FirebaseEndpoints) -> Self {
        Self {
            endpoints,
            ready: false,
            link_up: true,
            fault: None,
            rtdb: Value::Object(Map::new()),
            documents: BTreeMap::new(),
            writes: 0,
        }
    }

    pub fn endpoints(&self) -> &FirebaseEndpoints {
        &self.endpoints
    }

    fn rtdb_call(&mut self, verb: Verb, path: &str, body: Option<&Value>) -> Result<Value, BackendError> {
        let result = self.platform_rtdb(verb, path, body);
        self.after_call(verb, path, &result);
        result
    }

    fn firestore_call(
        &mut self,
        verb: Verb,
        path: &str,
        fields: Option<&Value>,
    ) -> Result<Value, BackendError> {
        let result = self.platform_firestore(verb, path, fields);
        self.after_call(verb, path, &result);
        result
    }

    fn after_call(&mut self, verb: Verb, path: &str, result: &Result<Value, BackendError>) {
        match result {
            Ok(_) => debug!("Firebase: {:?} {} ok", verb, path),
            Err(e) if e.is_connectivity() => {
                warn!("Firebase: {:?} {} -> {}, dropping client", verb, path, e);
                self.platform_teardown();
            }
            Err(e) => debug!("Firebase: {:?} {} -> {}", verb, path, e),
        }
    }

    // ── ESP-IDF transport ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), BackendError> {
        if !self.endpoints.is_configured() {
            warn!("Firebase: host or project not configured");
            return Err(BackendError::AuthFailure);
        }
        let config = HttpConfiguration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&config).map_err(|e| {
            warn!("Firebase: HTTP client init failed: {}", e);
            BackendError::Unreachable
        })?;
        self.client = Some(HttpClient::wrap(connection));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_teardown(&mut self) {
        self.client = None;
    }

    #[cfg(target_os = "espidf")]
    fn platform_ready(&self) -> bool {
        self.client.is_some()
    }

    #[cfg(target_os = "espidf")]
    fn platform_rtdb(&mut self, verb: Verb, path: &str, body: Option<&Value>) -> Result<Value, BackendError> {
        let url = self.endpoints.record_url(path)?;
        self.exchange(verb, &url, body)
    }

    #[cfg(target_os = "espidf")]
    fn platform_firestore(
        &mut self,
        verb: Verb,
        path: &str,
        fields: Option<&Value>,
    ) -> Result<Value, BackendError> {
        let empty = Value::Null;
        let fields = fields.unwrap_or(&empty);
        let url = match verb {
            Verb::Get => self.endpoints.document_url(path)?,
            Verb::Patch => self.endpoints.patch_url(path, fields)?,
            Verb::Post => self.endpoints.create_url(path)?,
            Verb::Put => return Err(BackendError::Rejected(405)),
        };
        let body = match verb {
            Verb::Get => None,
            _ => Some(firestore::to_document(fields)?),
        };
        let doc = self.exchange(verb, &url, body.as_ref())?;
        match verb {
            Verb::Get => firestore::from_document(&doc),
            _ => Ok(Value::Null),
        }
    }

    /// One HTTP round trip.  Returns the parsed JSON body (`Null` if empty).
    #[cfg(target_os = "espidf")]
    fn exchange(&mut self, verb: Verb, url: &str, body: Option<&Value>) -> Result<Value, BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::Unreachable)?;
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|_| BackendError::Malformed)?;
        let content_length = payload.as_ref().map(|p| p.len().to_string());

        let mut headers: Vec<(&str, &str)> = vec![("accept", "application/json")];
        if let Some(len) = content_length.as_deref() {
            headers.push(("content-type", "application/json"));
            headers.push(("content-length", len));
        }
        let method = match verb {
            Verb::Get => Method::Get,
            Verb::Put => Method::Put,
            Verb::Patch => Method::Patch,
            Verb::Post => Method::Post,
        };

        let mut request = client.request(method, url, &headers).map_err(transport_error)?;
        if let Some(payload) = &payload {
            request.write_all(payload).map_err(transport_error)?;
            request.flush().map_err(transport_error)?;
        }
        let mut response = request.submit().map_err(transport_error)?;
        let status = response.status();

        let mut raw = Vec::new();
        let mut buffer = [0_u8; 512];
        loop {
            match response.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => raw.extend_from_slice(&buffer[..n]),
                Err(e) => return Err(transport_error(e)),
            }
        }

        BackendError::from_status(status)?;
        if raw.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&raw).map_err(|_| BackendError::Malformed)
    }

    // ── Simulation ────────────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), BackendError> {
        if !self.link_up {
            return Err(BackendError::Unreachable);
        }
        self.ready = true;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_teardown(&mut self) {
        self.ready = false;
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ready(&self) -> bool {
        self.ready
    }

    #[cfg(not(target_os = "espidf"))]
    fn sim_check(&self) -> Result<(), BackendError> {
        if !self.ready || !self.link_up {
            return Err(BackendError::Unreachable);
        }
        self.fault.map_or(Ok(()), Err)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rtdb(&mut self, verb: Verb, path: &str, body: Option<&Value>) -> Result<Value, BackendError> {
        self.sim_check()?;
        check_record_path(path)?;
        let keys: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match verb {
            Verb::Get => Ok(tree_get(&self.rtdb, &keys).cloned().unwrap_or(Value::Null)),
            Verb::Put => {
                *tree_slot(&mut self.rtdb, &keys) = body.cloned().unwrap_or(Value::Null);
                self.writes += 1;
                Ok(Value::Null)
            }
            Verb::Patch => {
                let Some(Value::Object(fields)) = body else {
                    return Err(BackendError::Rejected(400));
                };
                merge_into(tree_slot(&mut self.rtdb, &keys), fields);
                self.writes += 1;
                Ok(Value::Null)
            }
            Verb::Post => Err(BackendError::Rejected(405)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_firestore(
        &mut self,
        verb: Verb,
        path: &str,
        fields: Option<&Value>,
    ) -> Result<Value, BackendError> {
        self.sim_check()?;
        check_document_path(path)?;
        match verb {
            Verb::Get => {
                let doc = self.documents.get(path).ok_or(BackendError::NotFound)?;
                firestore::from_document(doc)
            }
            Verb::Patch => {
                let incoming = firestore::to_document(fields.unwrap_or(&Value::Null))?;
                let doc = self
                    .documents
                    .entry(path.to_string())
                    .or_insert_with(|| serde_json::json!({ "fields": {} }));
                if let Some(Value::Object(new_fields)) = incoming.get("fields") {
                    merge_into(&mut doc["fields"], new_fields);
                }
                self.writes += 1;
                Ok(Value::Null)
            }
            Verb::Post => {
                if self.documents.contains_key(path) {
                    return Err(BackendError::Rejected(409));
                }
                let doc = firestore::to_document(fields.unwrap_or(&Value::Null))?;
                self.documents.insert(path.to_string(), doc);
                self.writes += 1;
                Ok(Value::Null)
            }
            Verb::Put => Err(BackendError::Rejected(405)),
        }
    }

    /// Take the simulated network path up or down.  Taking it down drops
    /// the client like a real transport failure would.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_link(&mut self, up: bool) {
        self.link_up = up;
        if !up {
            self.ready = false;
        }
    }

    /// Fail every call with `fault` (or stop failing with `None`).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_with(&mut self, fault: Option<BackendError>) {
        self.fault = fault;
    }

    /// Plain-JSON view of an RTDB record, `Null` if absent.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_record(&self, path: &str) -> Value {
        let keys: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        tree_get(&self.rtdb, &keys).cloned().unwrap_or(Value::Null)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_put_record(&mut self, path: &str, value: Value) {
        let keys: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        *tree_slot(&mut self.rtdb, &keys) = value;
    }

    /// Plain-JSON view of a document's fields.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_document(&self, path: &str) -> Option<Value> {
        self.documents
            .get(path)
            .and_then(|doc| firestore::from_document(doc).ok())
    }

    /// Store a document as if another client wrote it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_put_document(&mut self, path: &str, fields: &Value) {
        if let Ok(doc) = firestore::to_document(fields) {
            self.documents.insert(path.to_string(), doc);
        }
    }

    /// Paths of all stored documents under `collection/`.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_documents_in(&self, collection: &str) -> Vec<String> {
        let prefix = format!("{collection}/");
        self.documents
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Successful writes so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_writes(&self) -> u32 {
        self.writes
    }
}

#[cfg(target_os = "espidf")]
fn transport_error(e: esp_idf_svc::io::EspIOError) -> BackendError {
    let code = e.0.code();
    if code == esp_idf_svc::sys::ESP_ERR_TIMEOUT as i32
        || code == esp_idf_svc::sys::ESP_ERR_HTTP_EAGAIN as i32
    {
        BackendError::Timeout
    } else {
        BackendError::Unreachable
    }
}

#[cfg(not(target_os = "espidf"))]
fn tree_get<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(root, |node, key| node.get(*key))
}

/// Walk to `keys`, creating objects on the way.
#[cfg(not(target_os = "espidf"))]
fn tree_slot<'a>(root: &'a mut Value, keys: &[&str]) -> &'a mut Value {
    keys.iter().fold(root, |node, key| {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        &mut node[*key]
    })
}

#[cfg(not(target_os = "espidf"))]
fn merge_into(target: &mut Value, fields: &Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (k, v) in fields {
            map.insert(k.clone(), v.clone());
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BackendPort
// ───────────────────────────────────────────────────────────────

impl BackendPort for FirebaseAdapter {
    fn is_ready(&self) -> bool {
        self.platform_ready()
    }

    fn reconnect(&mut self) -> Result<(), BackendError> {
        self.platform_teardown();
        self.platform_connect()?;
        info!("Firebase: client ready (project '{}')", self.endpoints.project_id);
        Ok(())
    }

    fn get_record(&mut self, path: &str) -> Result<Value, BackendError> {
        self.rtdb_call(Verb::Get, path, None)
    }

    fn set_record(&mut self, path: &str, value: &Value) -> Result<(), BackendError> {
        self.rtdb_call(Verb::Put, path, Some(value)).map(drop)
    }

    fn update_record(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
        self.rtdb_call(Verb::Patch, path, Some(fields)).map(drop)
    }

    fn get_document(&mut self, path: &str) -> Result<Value, BackendError> {
        self.firestore_call(Verb::Get, path, None)
    }

    fn patch_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
        self.firestore_call(Verb::Patch, path, Some(fields)).map(drop)
    }

    fn create_document(&mut self, path: &str, fields: &Value) -> Result<(), BackendError> {
        self.firestore_call(Verb::Post, path, Some(fields)).map(drop)
    }
}
