//! Site URL parsing and validation

use std::net::IpAddr;

use reqwest::Url;

use crate::error::{Result, VigilError};

const HTTPS_PORT: u16 = 443;

/// A monitored site's URL broken down into what the probes need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    /// The normalized, absolute URL that the HTTP probe requests
    pub url: Url,
    /// Hostname (or IP literal, without brackets) used for the TLS connection
    pub host: String,
    /// Port for the TLS connection (443 unless the URL names one)
    pub tls_port: u16,
}

impl SiteTarget {
    /// Whether a certificate check applies to this target
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }
}

/// Parse and validate a site URL
///
/// This function:
/// - Trims surrounding whitespace
/// - Assumes `https://` when the value has no scheme (bare domains are common
///   in hand-maintained site lists)
/// - Accepts only http and https
/// - Requires a host, and validates DNS labels when the host is not an IP
pub fn parse_site_url(raw: &str) -> Result<SiteTarget> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(raw, "empty URL"));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(raw, &e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(VigilError::UnsupportedScheme(other.to_string())),
    }

    let host = url
        .host_str()
        .ok_or_else(|| invalid(raw, "missing host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    if host.parse::<IpAddr>().is_err() {
        validate_hostname(&host).map_err(|reason| invalid(raw, reason))?;
    }

    let tls_port = if url.scheme() == "https" {
        url.port().unwrap_or(HTTPS_PORT)
    } else {
        HTTPS_PORT
    };

    Ok(SiteTarget {
        url,
        host,
        tls_port,
    })
}

fn validate_hostname(host: &str) -> std::result::Result<(), &'static str> {
    if host.is_empty() {
        return Err("missing host");
    }

    let valid = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err("host contains invalid characters");
    }

    // Check for consecutive dots or dots at start/end
    if host.contains("..") || host.starts_with('.') || host.ends_with('.') {
        return Err("host has an empty label");
    }

    for label in host.split('.') {
        if label.starts_with('-') || label.ends_with('-') {
            return Err("host label starts or ends with a hyphen");
        }
    }

    Ok(())
}

fn invalid(url: &str, reason: &str) -> VigilError {
    VigilError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https_url() {
        let target = parse_site_url("https://Example.com/status").unwrap();
        assert_eq!(target.host, "example.com");
        assert_eq!(target.tls_port, 443);
        assert!(target.is_https());
        assert_eq!(target.url.path(), "/status");
    }

    #[test]
    fn test_parse_http_url_is_not_https() {
        let target = parse_site_url("http://example.com").unwrap();
        assert!(!target.is_https());
    }

    #[test]
    fn test_bare_domain_assumes_https() {
        let target = parse_site_url("  www.example.com  ").unwrap();
        assert_eq!(target.url.as_str(), "https://www.example.com/");
        assert_eq!(target.host, "www.example.com");
    }

    #[test]
    fn test_explicit_port_used_for_tls() {
        let target = parse_site_url("https://example.com:8443/").unwrap();
        assert_eq!(target.tls_port, 8443);
    }

    #[test]
    fn test_ip_hosts() {
        let target = parse_site_url("http://127.0.0.1:8080/health").unwrap();
        assert_eq!(target.host, "127.0.0.1");

        let target = parse_site_url("https://[::1]/").unwrap();
        assert_eq!(target.host, "::1");
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(parse_site_url("").is_err());
        assert!(parse_site_url("   ").is_err());
        assert!(parse_site_url("https://").is_err());
        assert!(parse_site_url("https://-example.com").is_err());
        assert!(parse_site_url("https://example-.com").is_err());
        assert!(matches!(
            parse_site_url("ftp://example.com"),
            Err(VigilError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }
}
