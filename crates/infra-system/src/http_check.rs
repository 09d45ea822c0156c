// HTTP condition source
// One request per query; status or body is matched, never both.
use bytes::Bytes;
use regex::Regex;
use reqwest::{Client, Method, Response, Url};
use std::sync::Arc;
use tracing::debug;

use waitfor_core::port::DiagnosticSink;

/// Method used when none is configured
pub const DEFAULT_METHOD: &str = "HEAD";

/// Checks the response of an HTTP endpoint
///
/// Request failures of any kind (bad method, bad URL, refused connection,
/// unreadable body) make the query return `false`.
///
/// # Example
/// ```ignore
/// let mut check = HttpCheck::new("http://localhost:8080/health");
/// check.with_method("GET").with_header("accept", "application/json");
/// let healthy = check.matches_status(200).await;
/// ```
#[derive(Clone)]
pub struct HttpCheck {
    url: String,
    method: String,
    auth: Option<(String, String)>,
    headers: Vec<(String, String)>,
    data: Option<Bytes>,
    client: Client,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl HttpCheck {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            auth: None,
            headers: Vec::new(),
            data: None,
            client: Client::new(),
            sink: None,
        }
    }

    pub fn with_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.method = method.into();
        self
    }

    /// Basic auth credentials; an empty username disables auth
    pub fn with_auth(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        let username = username.into();
        self.auth = if username.is_empty() {
            None
        } else {
            Some((username, password.into()))
        };
        self
    }

    /// Set a header, replacing any previous value for the same name
    pub fn with_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Request body, re-sent on every query
    pub fn with_data(&mut self, data: impl Into<Bytes>) -> &mut Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_sink(&mut self, sink: Arc<dyn DiagnosticSink>) -> &mut Self {
        self.sink = Some(sink);
        self
    }

    /// True if the response status equals `status_code`
    ///
    /// The body is released unread.
    pub async fn matches_status(&self, status_code: u16) -> bool {
        let response = match self.response().await {
            Ok(response) => response,
            Err(e) => {
                self.emit(&e);
                return false;
            }
        };

        let status = response.status().as_u16();
        drop(response);

        debug!(url = %self.url, status, expected = status_code, "HTTP status received");
        self.emit(&format!("got HTTP status code {}", status));
        status == status_code
    }

    /// True if `regex` matches anywhere in the fully read response body
    pub async fn matches_body(&self, regex: &Regex) -> bool {
        let response = match self.response().await {
            Ok(response) => response,
            Err(e) => {
                self.emit(&e);
                return false;
            }
        };

        let status = response.status().as_u16();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                self.emit(&e.to_string());
                return false;
            }
        };
        let body = String::from_utf8_lossy(&body);

        debug!(url = %self.url, status, body_len = body.len(), "HTTP body received");
        self.emit(&format!("got HTTP status code {} and body:\n{}", status, body));
        regex.is_match(&body)
    }

    async fn response(&self) -> Result<Response, String> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|e| format!("invalid method '{}': {}", self.method, e))?;
        let url = Url::parse(&self.url).map_err(|e| format!("invalid url '{}': {}", self.url, e))?;

        let mut request = self.client.request(method, url);
        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(data) = &self.data {
            request = request.body(data.clone());
        }

        self.emit(&format!("curl {} {} ...", self.method, self.url));
        request.send().await.map_err(|e| e.to_string())
    }

    fn emit(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink.emit(line);
        }
    }
}
