use crate::certificate::{CertificateFailure, CertificateResult};
use crate::probe::{ProbeFailure, ProbeResult};

use super::types::HealthStatus;

/// Certificates with fewer days left than this degrade a site to PROBLEMATIC
pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

/// The first rule that matched for a pair of check results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding<'a> {
    ProbeFailed(&'a ProbeFailure),
    UnhealthyResponse(u16),
    CertificateFailed(&'a CertificateFailure),
    CertificateExpiring(i64),
    Healthy,
}

impl Finding<'_> {
    pub fn status(&self) -> HealthStatus {
        match self {
            Finding::ProbeFailed(_) => HealthStatus::Stopped,
            Finding::UnhealthyResponse(_)
            | Finding::CertificateFailed(_)
            | Finding::CertificateExpiring(_) => HealthStatus::Problematic,
            Finding::Healthy => HealthStatus::Running,
        }
    }

    /// Human-readable reason, `None` for healthy sites
    pub fn describe(&self) -> Option<String> {
        match self {
            Finding::ProbeFailed(failure) => Some(format!("probe {}", failure)),
            Finding::UnhealthyResponse(status) => Some(format!("HTTP status {}", status)),
            Finding::CertificateFailed(failure) => Some(format!("certificate check {}", failure)),
            Finding::CertificateExpiring(days) if *days < 0 => {
                Some(format!("certificate expired {} days ago", -days))
            }
            Finding::CertificateExpiring(days) => {
                Some(format!("certificate expires in {} days", days))
            }
            Finding::Healthy => None,
        }
    }
}

/// Reduces a probe result and a certificate result to one [`HealthStatus`]
///
/// Precedence, first match wins:
/// 1. probe failed outright -> STOPPED
/// 2. response status outside 2xx/3xx -> PROBLEMATIC
/// 3. certificate check failed -> PROBLEMATIC
/// 4. certificate expires within the window -> PROBLEMATIC
/// 5. otherwise -> RUNNING
///
/// A skipped certificate check (plain http) never degrades the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthEvaluator {
    expiry_window_days: i64,
}

impl Default for HealthEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthEvaluator {
    pub fn new() -> Self {
        Self {
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        }
    }

    pub fn with_expiry_window(mut self, days: i64) -> Self {
        self.expiry_window_days = days;
        self
    }

    pub fn expiry_window_days(&self) -> i64 {
        self.expiry_window_days
    }

    pub fn evaluate(&self, probe: &ProbeResult, cert: &CertificateResult) -> HealthStatus {
        self.classify(probe, cert).status()
    }

    pub fn classify<'a>(&self, probe: &'a ProbeResult, cert: &'a CertificateResult) -> Finding<'a> {
        let status = match probe {
            ProbeResult::Failed { failure } => return Finding::ProbeFailed(failure),
            ProbeResult::Responded { status } => *status,
        };

        if !(200..400).contains(&status) {
            return Finding::UnhealthyResponse(status);
        }

        match cert {
            CertificateResult::Failed { failure } => Finding::CertificateFailed(failure),
            CertificateResult::Inspected {
                days_until_expiry, ..
            } if *days_until_expiry < self.expiry_window_days => {
                Finding::CertificateExpiring(*days_until_expiry)
            }
            CertificateResult::Inspected { .. } | CertificateResult::Skipped => Finding::Healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use proptest::prelude::*;

    fn inspected(days: i64) -> CertificateResult {
        CertificateResult::Inspected {
            not_after: Utc::now() + TimeDelta::days(days),
            days_until_expiry: days,
        }
    }

    fn cert_failed() -> CertificateResult {
        CertificateResult::Failed {
            failure: CertificateFailure::NoCertificate,
        }
    }

    fn connection_failed() -> ProbeResult {
        ProbeResult::failed(ProbeFailure::Connection("refused".to_string()))
    }

    #[test]
    fn test_connection_failure_is_stopped_regardless_of_certificate() {
        let evaluator = HealthEvaluator::new();
        for cert in [
            inspected(365),
            inspected(10),
            inspected(-5),
            cert_failed(),
            CertificateResult::Skipped,
        ] {
            assert_eq!(
                evaluator.evaluate(&connection_failed(), &cert),
                HealthStatus::Stopped
            );
        }
        assert_eq!(
            evaluator.evaluate(
                &ProbeResult::failed(ProbeFailure::Timeout { after_ms: 10_000 }),
                &inspected(90)
            ),
            HealthStatus::Stopped
        );
    }

    #[test]
    fn test_ok_with_healthy_certificate_is_running() {
        let evaluator = HealthEvaluator::new();
        assert_eq!(
            evaluator.evaluate(&ProbeResult::responded(200), &inspected(45)),
            HealthStatus::Running
        );
    }

    #[test]
    fn test_ok_with_expiring_certificate_is_problematic() {
        let evaluator = HealthEvaluator::new();
        assert_eq!(
            evaluator.evaluate(&ProbeResult::responded(200), &inspected(10)),
            HealthStatus::Problematic
        );
    }

    #[test]
    fn test_server_error_is_problematic_regardless_of_certificate() {
        let evaluator = HealthEvaluator::new();
        for cert in [
            inspected(365),
            inspected(3),
            cert_failed(),
            CertificateResult::Skipped,
        ] {
            assert_eq!(
                evaluator.evaluate(&ProbeResult::responded(503), &cert),
                HealthStatus::Problematic
            );
        }
    }

    #[test]
    fn test_window_boundary() {
        let evaluator = HealthEvaluator::new();
        let ok = ProbeResult::responded(200);
        assert_eq!(evaluator.evaluate(&ok, &inspected(29)), HealthStatus::Problematic);
        assert_eq!(evaluator.evaluate(&ok, &inspected(30)), HealthStatus::Running);

        let strict = HealthEvaluator::new().with_expiry_window(60);
        assert_eq!(strict.evaluate(&ok, &inspected(45)), HealthStatus::Problematic);
    }

    #[test]
    fn test_redirect_counts_as_success_and_skipped_cert_is_not_a_failure() {
        let evaluator = HealthEvaluator::new();
        assert_eq!(
            evaluator.evaluate(&ProbeResult::responded(301), &CertificateResult::Skipped),
            HealthStatus::Running
        );
        assert_eq!(
            evaluator.evaluate(&ProbeResult::responded(200), &cert_failed()),
            HealthStatus::Problematic
        );
    }

    #[test]
    fn test_descriptions() {
        let evaluator = HealthEvaluator::new();
        let ok = ProbeResult::responded(200);
        let expired = inspected(-3);
        assert_eq!(
            evaluator.classify(&ok, &expired).describe().as_deref(),
            Some("certificate expired 3 days ago")
        );
        let healthy = inspected(100);
        assert_eq!(evaluator.classify(&ok, &healthy).describe(), None);
        let not_found = ProbeResult::responded(404);
        assert_eq!(
            evaluator.classify(&not_found, &healthy).describe().as_deref(),
            Some("HTTP status 404")
        );
    }

    fn probe_strategy() -> impl Strategy<Value = ProbeResult> {
        prop_oneof![
            (100u16..600).prop_map(ProbeResult::responded),
            (0u64..60_000).prop_map(|ms| ProbeResult::failed(ProbeFailure::Timeout { after_ms: ms })),
            "[a-z ]{0,12}".prop_map(|s| ProbeResult::failed(ProbeFailure::Dns(s))),
            "[a-z ]{0,12}".prop_map(|s| ProbeResult::failed(ProbeFailure::Connection(s))),
            "[a-z ]{0,12}".prop_map(|s| ProbeResult::failed(ProbeFailure::Tls(s))),
        ]
    }

    fn cert_strategy() -> impl Strategy<Value = CertificateResult> {
        prop_oneof![
            (-400i64..800).prop_map(inspected),
            Just(CertificateResult::Skipped),
            Just(cert_failed()),
            (0u64..60_000).prop_map(|ms| CertificateResult::Failed {
                failure: CertificateFailure::Timeout { after_ms: ms }
            }),
            "[a-z ]{0,12}".prop_map(|s| CertificateResult::Failed {
                failure: CertificateFailure::Handshake(s)
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_evaluation_is_deterministic(
            probe in probe_strategy(),
            cert in cert_strategy(),
            window in 0i64..120,
        ) {
            let evaluator = HealthEvaluator::new().with_expiry_window(window);
            let first = evaluator.evaluate(&probe, &cert);
            prop_assert_eq!(first, evaluator.evaluate(&probe.clone(), &cert.clone()));
        }

        #[test]
        fn prop_matches_precedence_table(
            probe in probe_strategy(),
            cert in cert_strategy(),
            window in 0i64..120,
        ) {
            let evaluator = HealthEvaluator::new().with_expiry_window(window);
            let expected = match (&probe, &cert) {
                (ProbeResult::Failed { .. }, _) => HealthStatus::Stopped,
                (ProbeResult::Responded { status }, _) if !(200..400).contains(status) => {
                    HealthStatus::Problematic
                }
                (_, CertificateResult::Failed { .. }) => HealthStatus::Problematic,
                (_, CertificateResult::Inspected { days_until_expiry, .. })
                    if *days_until_expiry < window => HealthStatus::Problematic,
                _ => HealthStatus::Running,
            };
            prop_assert_eq!(evaluator.evaluate(&probe, &cert), expected);
            prop_assert_eq!(
                evaluator.classify(&probe, &cert).describe().is_none(),
                expected == HealthStatus::Running
            );
        }
    }
}
