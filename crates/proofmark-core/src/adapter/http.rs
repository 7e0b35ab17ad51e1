//! HTTP collaborator: the only way the engine reaches calendars, explorers,
//! and JSON-RPC endpoints.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

/// Default connect timeout for the reqwest-backed client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors raised by the HTTP collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HttpError {
    /// Connection-level failure: DNS, TLS, refused, reset.
    #[error("transport error for {url}: {detail}")]
    Transport {
        /// Request URL.
        url: String,
        /// Transport-layer detail.
        detail: String,
    },

    /// The request did not complete within its timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Request URL.
        url: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The URL could not be parsed or is not http(s).
    #[error("invalid url {url}: {detail}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What made it invalid.
        detail: String,
    },
}

impl HttpError {
    /// Whether the failure is worth retrying (connectivity, not protocol).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// The HTTP status code, when the error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Blocking HTTP collaborator.
///
/// Implementations return the response body on 2xx and map everything else
/// to an [`HttpError`]; per-request timeouts cover connect plus read.
pub trait HttpClient: Send + Sync {
    /// Performs a GET.
    ///
    /// # Errors
    ///
    /// Any [`HttpError`]; non-2xx statuses become [`HttpError::Status`].
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError>;

    /// Performs a POST with the given body and content type.
    ///
    /// # Errors
    ///
    /// Any [`HttpError`]; non-2xx statuses become [`HttpError::Status`].
    fn post(
        &self,
        url: &str,
        body: &[u8],
        content_type: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, HttpError>;
}

/// Production HTTP client backed by `reqwest::blocking`.
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    /// Creates the client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Transport`] if the underlying client cannot be
    /// constructed (TLS backend initialization).
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("proofmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| HttpError::Transport {
                url: String::new(),
                detail: err.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Parses the URL, extracting userinfo into explicit basic-auth parts.
    fn prepare(url: &str) -> Result<(reqwest::Url, Option<(String, Option<String>)>), HttpError> {
        let mut parsed = reqwest::Url::parse(url).map_err(|err| HttpError::InvalidUrl {
            url: url.to_string(),
            detail: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HttpError::InvalidUrl {
                url: url.to_string(),
                detail: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        let auth = if parsed.username().is_empty() {
            None
        } else {
            let user = parsed.username().to_string();
            let pass = parsed.password().map(ToString::to_string);
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            Some((user, pass))
        };
        Ok((parsed, auth))
    }

    fn send(
        &self,
        mut request: reqwest::blocking::RequestBuilder,
        url: &str,
        auth: Option<(String, Option<String>)>,
        timeout: Duration,
    ) -> Result<Vec<u8>, HttpError> {
        if let Some((user, pass)) = auth {
            request = request.basic_auth(user, pass);
        }
        let response = request.timeout(timeout).send().map_err(|err| {
            if err.is_timeout() {
                HttpError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                HttpError::Transport {
                    url: url.to_string(),
                    detail: err.to_string(),
                }
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| HttpError::Transport {
                url: url.to_string(),
                detail: err.to_string(),
            })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, HttpError> {
        let (parsed, auth) = Self::prepare(url)?;
        tracing::debug!(url, "http get");
        self.send(self.client.get(parsed), url, auth, timeout)
    }

    fn post(
        &self,
        url: &str,
        body: &[u8],
        content_type: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, HttpError> {
        let (parsed, auth) = Self::prepare(url)?;
        tracing::debug!(url, body_len = body.len(), "http post");
        let request = self
            .client
            .post(parsed)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_vec());
        self.send(request, url, auth, timeout)
    }
}

/// A recorded request made against [`MockHttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Request URL.
    pub url: String,
    /// POST body, empty for GET.
    pub body: Vec<u8>,
}

/// Deterministic in-memory HTTP client for tests.
///
/// Responses are queued per `(method, url)`; each request consumes one
/// queued response. Requests with nothing queued fail with a transport
/// error, and every request is recorded for assertion.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<(&'static str, String), Vec<Result<Vec<u8>, HttpError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockHttpClient {
    /// Creates an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a GET response for `url`.
    pub fn expect_get(&self, url: &str, response: Result<Vec<u8>, HttpError>) {
        self.queue("GET", url, response);
    }

    /// Queues a POST response for `url`.
    pub fn expect_post(&self, url: &str, response: Result<Vec<u8>, HttpError>) {
        self.queue("POST", url, response);
    }

    fn queue(&self, method: &'static str, url: &str, response: Result<Vec<u8>, HttpError>) {
        self.responses
            .lock()
            .expect("lock poisoned")
            .entry((method, url.to_string()))
            .or_default()
            .push(response);
    }

    /// All requests made so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// Number of requests made so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }

    fn serve(
        &self,
        method: &'static str,
        url: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, HttpError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.to_vec(),
            });
        let mut responses = self.responses.lock().expect("lock poisoned");
        match responses.get_mut(&(method, url.to_string())) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Err(HttpError::Transport {
                url: url.to_string(),
                detail: "no mock response queued".to_string(),
            }),
        }
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, HttpError> {
        self.serve("GET", url, &[])
    }

    fn post(
        &self,
        url: &str,
        body: &[u8],
        _content_type: &str,
        _timeout: Duration,
    ) -> Result<Vec<u8>, HttpError> {
        self.serve("POST", url, body)
    }
}
