use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use super::types::{ProbeFailure, ProbeResult, SiteProbe};
use crate::error::Result;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("vigil/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) reachability probe
///
/// Sends one GET per call and reports the status line only. Redirects are not
/// followed, so a 301 is reported as 301. The response body is never read.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe with the default 10 second timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a probe whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request `url` and report its status code or why there was none
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe_url(&self, url: &Url) -> ProbeResult {
        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(status, "Probe answered");
                ProbeResult::responded(status)
            }
            Err(e) => {
                let failure = classify_error(&e, self.timeout);
                debug!(error = %failure, "Probe failed");
                ProbeResult::failed(failure)
            }
        }
    }
}

#[async_trait]
impl SiteProbe for HttpProbe {
    async fn probe(&self, url: &Url) -> ProbeResult {
        self.probe_url(url).await
    }
}

/// Map a reqwest error onto the failure taxonomy
fn classify_error(error: &reqwest::Error, timeout: Duration) -> ProbeFailure {
    if error.is_timeout() {
        return ProbeFailure::Timeout {
            after_ms: timeout.as_millis() as u64,
        };
    }

    let message = error_chain_message(error);
    // The top-level message embeds the URL, so only the sources are inspected
    let causes = source_messages(error).join(": ").to_lowercase();

    if has_tls_source(error) || causes.contains("certificate") || causes.contains("handshake") {
        return ProbeFailure::Tls(message);
    }

    if causes.contains("dns error")
        || causes.contains("failed to lookup address")
        || causes.contains("name or service not known")
        || causes.contains("no such host")
    {
        return ProbeFailure::Dns(message);
    }

    ProbeFailure::Connection(message)
}

fn has_tls_source(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if err.downcast_ref::<native_tls::Error>().is_some() {
            return true;
        }
        source = err.source();
    }
    false
}

fn source_messages(error: &reqwest::Error) -> Vec<String> {
    let mut messages = Vec::new();
    let mut source = error.source();
    while let Some(err) = source {
        messages.push(err.to_string());
        source = err.source();
    }
    messages
}

/// Join an error and its distinct sources; reqwest's top-level message alone
/// rarely says what went wrong
fn error_chain_message(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    for text in source_messages(error) {
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn probe_status(server: &MockServer, status: u16, route: &str) -> ProbeResult {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;

        let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
        HttpProbe::new().unwrap().probe_url(&url).await
    }

    #[tokio::test]
    async fn test_reports_success_status() {
        let server = MockServer::start().await;
        assert_eq!(
            probe_status(&server, 200, "/").await,
            ProbeResult::responded(200)
        );
    }

    #[tokio::test]
    async fn test_error_statuses_are_responses() {
        let server = MockServer::start().await;
        assert_eq!(
            probe_status(&server, 503, "/down").await,
            ProbeResult::responded(503)
        );
        assert_eq!(
            probe_status(&server, 404, "/missing").await,
            ProbeResult::responded(404)
        );
    }

    #[tokio::test]
    async fn test_redirects_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let result = HttpProbe::new().unwrap().probe_url(&url).await;
        assert_eq!(result.status_code(), Some(301));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let probe = HttpProbe::with_timeout(Duration::from_millis(200)).unwrap();
        let result = probe.probe_url(&url).await;
        assert_eq!(
            result,
            ProbeResult::failed(ProbeFailure::Timeout { after_ms: 200 })
        );
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let result = HttpProbe::new().unwrap().probe_url(&url).await;
        assert!(matches!(
            result.failure(),
            Some(ProbeFailure::Connection(_))
        ));
    }
}
