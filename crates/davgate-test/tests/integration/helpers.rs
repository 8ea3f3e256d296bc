#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building a gate and Salvo service from an inline TOML document
//! - Making HTTP requests, including `WebDAV` extension methods
//! - Asserting on responses and on the files behind a principal's root
//!
//! ## Isolation
//! Every `TestGate` owns a fresh temporary directory. The placeholder `{root}`
//! in the TOML document is replaced by that directory before parsing, so tests
//! can run in parallel without sharing any files.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use salvo::http::header::HeaderName;
use salvo::http::{Method, ReqBody, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt, TestClient};
use tempfile::TempDir;

use davgate_test::app::app::api::routes;
use davgate_test::app::engine::LocalFsFactory;
use davgate_test::component::config::Settings;
use davgate_test::component::gate::{Gate, GateConfig};

const ROOT_PLACEHOLDER: &str = "{root}";
const TEST_UPLOAD_LIMIT: u64 = 1024;

/// A gate, its service and the temporary directory its roots live in.
pub struct TestGate {
    dir: TempDir,
    gate: Arc<Gate>,
    service: Service,
}

impl TestGate {
    /// Builds a gate from `toml`, with `{root}` replaced by a fresh temp directory.
    ///
    /// ## Panics
    /// Panics if the directory cannot be created or the document is invalid.
    #[must_use]
    pub fn new(toml: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let source = toml.replace(ROOT_PLACEHOLDER, &dir.path().display().to_string());

        let settings = Settings::from_toml(&source).expect("Test config should parse");
        let config = GateConfig::from_settings(&settings).expect("Test config should be valid");
        let factory = Arc::new(LocalFsFactory::new(TEST_UPLOAD_LIMIT));
        let gate = Arc::new(Gate::new(config, factory));
        let service = Service::new(routes(Arc::clone(&gate)));

        Self { dir, gate, service }
    }

    #[must_use]
    pub const fn service(&self) -> &Service {
        &self.service
    }

    #[must_use]
    pub const fn gate(&self) -> &Arc<Gate> {
        &self.gate
    }

    /// Absolute path of `relative` below the temp directory.
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative.trim_start_matches('/'))
    }

    /// Writes a file below the temp directory, creating parents.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(path, contents).expect("Failed to write file");
    }

    pub fn mkdir(&self, relative: &str) {
        std::fs::create_dir_all(self.path(relative)).expect("Failed to create dir");
    }

    #[must_use]
    pub fn read(&self, relative: &str) -> Option<String> {
        std::fs::read_to_string(self.path(relative)).ok()
    }

    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }
}

/// `Authorization` header value for Basic credentials.
#[must_use]
pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Stored secret for `password`, hashed with bcrypt at the lowest cost.
#[must_use]
pub fn bcrypt_secret(password: &str) -> String {
    davgate_test::component::auth::password::hash_password_bcrypt(password, 4)
        .expect("bcrypt hash")
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl TestRequest {
    /// Creates a new test request with the given method and path.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn extension(method: &str, path: &str) -> Self {
        Self::new(
            Method::from_bytes(method.as_bytes()).expect("Valid method"),
            path,
        )
    }

    #[must_use]
    pub fn options(path: &str) -> Self {
        Self::new(Method::OPTIONS, path)
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn head(path: &str) -> Self {
        Self::new(Method::HEAD, path)
    }

    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn propfind(path: &str) -> Self {
        Self::extension("PROPFIND", path)
    }

    #[must_use]
    pub fn proppatch(path: &str) -> Self {
        Self::extension("PROPPATCH", path)
    }

    #[must_use]
    pub fn mkcol(path: &str) -> Self {
        Self::extension("MKCOL", path)
    }

    #[must_use]
    pub fn copy(path: &str) -> Self {
        Self::extension("COPY", path)
    }

    /// Creates a MOVE request (`move` is a reserved keyword).
    #[must_use]
    pub fn move_resource(path: &str) -> Self {
        Self::extension("MOVE", path)
    }

    #[must_use]
    pub fn lock(path: &str) -> Self {
        Self::extension("LOCK", path)
    }

    #[must_use]
    pub fn unlock(path: &str) -> Self {
        Self::extension("UNLOCK", path)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn auth(self, username: &str, password: &str) -> Self {
        self.header("Authorization", &basic_auth(username, password))
    }

    #[must_use]
    pub fn origin(self, origin: &str) -> Self {
        self.header("Origin", origin)
    }

    #[must_use]
    pub fn depth(self, depth: &str) -> Self {
        self.header("Depth", depth)
    }

    /// Sets the Destination header for COPY/MOVE.
    #[must_use]
    pub fn destination(self, dest: &str) -> Self {
        self.header("Destination", &format!("http://127.0.0.1:5800{dest}"))
    }

    #[must_use]
    pub fn overwrite(self, value: bool) -> Self {
        self.header("Overwrite", if value { "T" } else { "F" })
    }

    /// Submits a lock token through the `If` header.
    #[must_use]
    pub fn lock_token(self, token: &str) -> Self {
        self.header("If", &format!("(<{token}>)"))
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets an XML request body.
    #[must_use]
    pub fn xml_body(self, xml: &str) -> Self {
        self.header("Content-Type", "application/xml; charset=utf-8")
            .body(xml.as_bytes().to_vec())
    }

    /// Sends the request to the test service and returns the response.
    ///
    /// ## Panics
    /// Panics if the request cannot be sent or the response cannot be read.
    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);

        let mut client = match self.method.as_str() {
            "GET" => TestClient::get(&url),
            "HEAD" => TestClient::head(&url),
            "PUT" => TestClient::put(&url),
            "DELETE" => TestClient::delete(&url),
            "OPTIONS" => TestClient::options(&url),
            _ => RequestBuilder::new(&url, self.method.clone()),
        };

        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        if let Some(body_bytes) = self.body {
            client = client.body(ReqBody::Once(body_bytes.into()));
        }

        let mut response = client.send(service).await;

        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Asserts that the response status matches the expected code.
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}; body:\n{}",
            self.status,
            self.body_string()
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    #[must_use]
    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        let value = self
            .get_header(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found in response"));
        assert_eq!(
            value, expected,
            "Header '{name}' expected '{expected}' but got '{value}'"
        );
        self
    }

    #[must_use]
    pub fn assert_header_exists(self, name: &str) -> Self {
        assert!(
            self.get_header(name).is_some(),
            "Header '{name}' not found in response"
        );
        self
    }

    #[must_use]
    pub fn assert_header_absent(self, name: &str) -> Self {
        assert!(
            self.get_header(name).is_none(),
            "Header '{name}' unexpectedly present in response"
        );
        self
    }

    #[must_use]
    pub fn assert_header_contains(self, name: &str, expected: &str) -> Self {
        let value = self
            .get_header(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found in response"));
        assert!(
            value.contains(expected),
            "Header '{name}' expected to contain '{expected}' but got '{value}'"
        );
        self
    }

    #[must_use]
    pub fn assert_body_contains(self, expected: &str) -> Self {
        let body = self.body_string();
        assert!(
            body.contains(expected),
            "Expected body to contain '{expected}' but got:\n{body}"
        );
        self
    }

    #[must_use]
    pub fn assert_body_not_contains(self, unexpected: &str) -> Self {
        let body = self.body_string();
        assert!(
            !body.contains(unexpected),
            "Expected body to NOT contain '{unexpected}' but got:\n{body}"
        );
        self
    }

    #[must_use]
    pub fn assert_body_empty(self) -> Self {
        assert!(
            self.body.is_empty(),
            "Expected empty body but got {} bytes",
            self.body.len()
        );
        self
    }

    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Token from a `Lock-Token: <...>` response header.
    #[must_use]
    pub fn lock_token(&self) -> Option<String> {
        self.get_header("Lock-Token")
            .map(|v| v.trim_matches(|c| c == '<' || c == '>').to_string())
    }

    #[must_use]
    pub fn count_multistatus_responses(&self) -> usize {
        self.body_string().matches("<D:response>").count()
    }
}

/// Minimal exclusive write `lockinfo` body.
#[must_use]
pub fn lockinfo(owner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<D:lockinfo xmlns:D="DAV:">
  <D:lockscope><D:exclusive/></D:lockscope>
  <D:locktype><D:write/></D:locktype>
  <D:owner>{owner}</D:owner>
</D:lockinfo>"#
    )
}
