use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

use super::der::parse_not_after;
use super::types::{CertificateFailure, CertificateInspect, CertificateResult};
use crate::validation::SiteTarget;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);
const SECONDS_PER_DAY: i64 = 86_400;

/// Reads the expiry date of a site's TLS certificate
#[derive(Debug, Clone)]
pub struct CertificateInspector {
    timeout: Duration,
}

impl Default for CertificateInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateInspector {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the timeout covering TCP connect plus TLS handshake
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Inspect the certificate of an https target; http targets are skipped
    #[instrument(skip(self, target), fields(host = %target.host, port = target.tls_port))]
    pub async fn inspect_certificate(&self, target: &SiteTarget) -> CertificateResult {
        if !target.is_https() {
            debug!("Plain http target, skipping certificate check");
            return CertificateResult::Skipped;
        }

        match timeout(self.timeout, self.read_not_after(&target.host, target.tls_port)).await {
            Ok(Ok(not_after)) => {
                let days_until_expiry = days_until(not_after, Utc::now());
                debug!(%not_after, days_until_expiry, "Certificate inspected");
                CertificateResult::Inspected {
                    not_after,
                    days_until_expiry,
                }
            }
            Ok(Err(failure)) => {
                debug!(error = %failure, "Certificate inspection failed");
                CertificateResult::Failed { failure }
            }
            // Dropping the timed-out future drops the socket with it
            Err(_) => CertificateResult::Failed {
                failure: CertificateFailure::Timeout {
                    after_ms: self.timeout.as_millis() as u64,
                },
            },
        }
    }

    async fn read_not_after(
        &self,
        host: &str,
        port: u16,
    ) -> std::result::Result<DateTime<Utc>, CertificateFailure> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true) // We want to see the cert even if invalid
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| CertificateFailure::Handshake(e.to_string()))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CertificateFailure::Connection(e.to_string()))?;

        let mut tls_stream = connector
            .connect(host, stream)
            .await
            .map_err(|e| CertificateFailure::Handshake(e.to_string()))?;

        let der = tls_stream
            .get_ref()
            .peer_certificate()
            .map_err(|e| CertificateFailure::Handshake(e.to_string()))?
            .ok_or(CertificateFailure::NoCertificate)?
            .to_der()
            .map_err(|e| CertificateFailure::Unreadable(e.to_string()))?;

        // Best-effort close_notify; the socket is closed when the stream drops either way
        let _ = timeout(SHUTDOWN_TIMEOUT, tls_stream.shutdown()).await;

        parse_not_after(&der).ok_or_else(|| {
            CertificateFailure::Unreadable("could not parse certificate validity".to_string())
        })
    }
}

#[async_trait]
impl CertificateInspect for CertificateInspector {
    async fn inspect(&self, target: &SiteTarget) -> CertificateResult {
        self.inspect_certificate(target).await
    }
}

/// Whole days from `now` until `not_after`, rounded up
///
/// A certificate expiring in 36 hours has 2 days left; one that expired
/// 36 hours ago has -1.
pub fn days_until(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (not_after - now).num_seconds();
    let days = secs.div_euclid(SECONDS_PER_DAY);
    if secs.rem_euclid(SECONDS_PER_DAY) > 0 {
        days + 1
    } else {
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_site_url;
    use chrono::TimeDelta;

    #[test]
    fn test_days_until_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_until(now + TimeDelta::days(45), now), 45);
        assert_eq!(days_until(now + TimeDelta::hours(36), now), 2);
        assert_eq!(days_until(now + TimeDelta::seconds(1), now), 1);
        assert_eq!(days_until(now, now), 0);
    }

    #[test]
    fn test_days_until_negative_not_clamped() {
        let now = Utc::now();
        assert_eq!(days_until(now - TimeDelta::hours(36), now), -1);
        assert_eq!(days_until(now - TimeDelta::days(3), now), -3);
        assert_eq!(days_until(now - TimeDelta::seconds(1), now), 0);
    }

    #[tokio::test]
    async fn test_http_target_is_skipped() {
        let target = parse_site_url("http://example.com").unwrap();
        let result = CertificateInspector::new().inspect_certificate(&target).await;
        assert_eq!(result, CertificateResult::Skipped);
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = parse_site_url(&format!("https://127.0.0.1:{}/", port)).unwrap();
        let result = CertificateInspector::new()
            .with_timeout(Duration::from_secs(2))
            .inspect_certificate(&target)
            .await;
        assert!(matches!(
            result,
            CertificateResult::Failed {
                failure: CertificateFailure::Connection(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_handshake_failure_on_plaintext_server() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n")
                    .await;
            }
        });

        let target = parse_site_url(&format!("https://127.0.0.1:{}/", port)).unwrap();
        let result = CertificateInspector::new()
            .with_timeout(Duration::from_secs(5))
            .inspect_certificate(&target)
            .await;
        assert!(matches!(
            result,
            CertificateResult::Failed {
                failure: CertificateFailure::Handshake(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let holder = tokio::spawn(async move {
            // Accept and hold the socket open without ever answering the ClientHello
            let accepted = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(accepted);
        });

        let target = parse_site_url(&format!("https://127.0.0.1:{}/", port)).unwrap();
        let result = CertificateInspector::new()
            .with_timeout(Duration::from_millis(200))
            .inspect_certificate(&target)
            .await;
        assert_eq!(
            result,
            CertificateResult::Failed {
                failure: CertificateFailure::Timeout { after_ms: 200 }
            }
        );
        holder.abort();
    }

    #[tokio::test]
    async fn test_reads_expiry_from_tls_server() {
        use tokio::io::AsyncReadExt;

        let identity = native_tls::Identity::from_pkcs8(
            include_bytes!("../../tests/fixtures/localhost.pem"),
            include_bytes!("../../tests/fixtures/localhost.key"),
        )
        .unwrap();
        let acceptor = tokio_native_tls::TlsAcceptor::from(
            native_tls::TlsAcceptor::builder(identity).build().unwrap(),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(socket).await.unwrap();
            // Drain until the client's close_notify or EOF
            let mut buf = [0u8; 256];
            while matches!(tls.read(&mut buf).await, Ok(n) if n > 0) {}
        });

        let target = parse_site_url(&format!("https://127.0.0.1:{}/", port)).unwrap();
        let before = Utc::now();
        let result = CertificateInspector::new()
            .with_timeout(Duration::from_secs(5))
            .inspect_certificate(&target)
            .await;
        let after = Utc::now();

        let expected = chrono::TimeZone::with_ymd_and_hms(&Utc, 2099, 12, 31, 23, 59, 59).unwrap();
        match result {
            CertificateResult::Inspected {
                not_after,
                days_until_expiry,
            } => {
                assert_eq!(not_after, expected);
                assert!(days_until_expiry <= days_until(expected, before));
                assert!(days_until_expiry >= days_until(expected, after));
            }
            other => panic!("expected an inspected certificate, got {:?}", other),
        }

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
