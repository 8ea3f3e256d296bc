//! Cross-origin policy and header negotiation.

use salvo::http::HeaderMap;
use salvo::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, HeaderName, HeaderValue,
};

use davgate_core::config::CorsConfig;
use davgate_core::constants::WILDCARD;

/// Materialized CORS settings.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    credentials: bool,
    allowed_hosts: Vec<String>,
    allow_any_host: bool,
    allowed_headers: String,
    allowed_methods: String,
    exposed_headers: String,
}

/// Headers negotiated for one request. Empty when CORS does not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsHeaders {
    headers: Vec<(HeaderName, String)>,
}

impl CorsPolicy {
    #[must_use]
    pub fn from_config(config: &CorsConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            enabled: config.enabled,
            credentials: config.credentials,
            allow_any_host: config.allowed_hosts.iter().any(|h| h == WILDCARD),
            allowed_hosts: config.allowed_hosts,
            allowed_headers: config.allowed_headers.join(", "),
            allowed_methods: config.allowed_methods.join(", "),
            exposed_headers: config.exposed_headers.join(", "),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::from_config(&CorsConfig::default())
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a request with this `Origin` takes part in CORS at all. A
    /// preflight for such a request is answered without reaching authentication,
    /// even when the origin is not listed.
    #[must_use]
    pub fn applies(&self, origin: Option<&str>) -> bool {
        self.enabled && origin.is_some_and(|o| !o.is_empty())
    }

    /// ## Summary
    /// Decides which CORS headers a request from `origin` receives.
    ///
    /// Nothing is emitted when CORS is disabled, the request has no `Origin`,
    /// or the origin is not listed. A wildcard host list answers with `*`;
    /// otherwise the request origin is echoed back.
    #[must_use]
    pub fn negotiate(&self, origin: Option<&str>) -> CorsHeaders {
        let Some(origin) = origin.filter(|_| self.applies(origin)) else {
            return CorsHeaders::default();
        };

        let allow_origin = if self.allow_any_host {
            WILDCARD.to_string()
        } else if self.allowed_hosts.iter().any(|h| h == origin) {
            origin.to_string()
        } else {
            tracing::debug!(origin, "Origin not in allowed hosts");
            return CorsHeaders::default();
        };

        let mut headers = vec![
            (ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin),
            (ACCESS_CONTROL_ALLOW_HEADERS, self.allowed_headers.clone()),
            (ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods.clone()),
        ];
        if self.credentials {
            headers.push((ACCESS_CONTROL_ALLOW_CREDENTIALS, "true".to_string()));
        }
        if !self.exposed_headers.is_empty() {
            headers.push((ACCESS_CONTROL_EXPOSE_HEADERS, self.exposed_headers.clone()));
        }

        CorsHeaders { headers }
    }
}

impl CorsHeaders {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Writes the negotiated headers, skipping values that are not valid header text.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    target.insert(name.clone(), value);
                }
                Err(e) => {
                    tracing::warn!(header = %name, error = %e, "Skipping invalid CORS header value");
                }
            }
        }
    }
}
