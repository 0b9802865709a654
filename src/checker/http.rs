// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - The Prober trait: "give me a URL, tell me if it's reachable"
// - HttpProber: the real implementation on top of reqwest
// - Rejects malformed URLs before any network traffic
// - Detects the usual failure modes (HTTP errors, timeout, DNS, refused)
//
// The engine only ever talks to the trait, so tests can swap in a fake
// prober that never touches the network.
//
// Rust concepts:
// - Traits: a shared interface for real and fake probers
// - BoxFuture: lets a trait method be async and still be used as dyn Prober
// - Error source chains: digging the io::Error out of a reqwest::Error
// =============================================================================

use anyhow::Result;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::io::ErrorKind;
use url::Url;

use super::status::LinkState;
use crate::config::ProbeConfig;

/// The two answers a probe can give
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Reachable,
    Unreachable,
}

impl From<Verdict> for LinkState {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Reachable => LinkState::Reachable,
            Verdict::Unreachable => LinkState::Unreachable,
        }
    }
}

/// Why a probe came back unreachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// No answer within the timeout
    Timeout,
    /// The host name could not be resolved
    DnsNotFound,
    /// The host actively refused the connection
    ConnectionRefused,
    /// The server answered with an error status code
    Http(u16),
    /// The text is not a URL we can request
    InvalidUrl,
    /// Anything else that went wrong on the way
    ConnectionFailed,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "Timeout"),
            ProbeFailure::DnsNotFound => write!(f, "Domain not found"),
            ProbeFailure::ConnectionRefused => write!(f, "Connection refused"),
            ProbeFailure::Http(code) => write!(f, "HTTP {}", code),
            ProbeFailure::InvalidUrl => write!(f, "Invalid URL format"),
            ProbeFailure::ConnectionFailed => write!(f, "Connection failed"),
        }
    }
}

/// The result of probing a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub verdict: Verdict,
    /// Response code, if the server answered at all
    pub http_status: Option<u16>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeOutcome {
    pub fn reachable(http_status: u16) -> Self {
        Self {
            verdict: Verdict::Reachable,
            http_status: Some(http_status),
            failure: None,
        }
    }

    pub fn unreachable(failure: ProbeFailure) -> Self {
        let http_status = match failure {
            ProbeFailure::Http(code) => Some(code),
            _ => None,
        };
        Self {
            verdict: Verdict::Unreachable,
            http_status,
            failure: Some(failure),
        }
    }
}

/// Something that can tell whether a URL is reachable.
///
/// An `Err` means the prober itself blew up (as opposed to the URL being
/// broken, which is reported inside `Ok`).
pub trait Prober: Send + Sync {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ProbeOutcome>>;
}

/// Probes URLs with real HTTP GET requests.
///
/// Cloning is cheap: the reqwest client is a reference-counted pool.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    // Builds the HTTP client once; every probe reuses its connection pool
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    // Checks a single link
    //
    // This function never fails: every problem becomes a ProbeFailure
    pub async fn check(&self, url: &str) -> ProbeOutcome {
        if Url::parse(url).is_err() {
            return ProbeOutcome::unreachable(ProbeFailure::InvalidUrl);
        }

        match self.client.get(url).send().await {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(url, error = %e, "probe transport error");
                ProbeOutcome::unreachable(categorize_error(&e))
            }
        }
    }
}

impl Prober for HttpProber {
    fn probe<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ProbeOutcome>> {
        Box::pin(async move { Ok(self.check(url).await) })
    }
}

// Turns an HTTP status code into an outcome
//
// HTTP status codes:
// - 200-399: the page (or its redirect) is there
// - 400-499: the server answered, but the page is missing or forbidden
// - 500-599: the server itself is broken
//
// Anything from 400 up is shown as unreachable with "HTTP <code>"
pub fn classify_status(code: u16) -> ProbeOutcome {
    if code < 400 {
        ProbeOutcome::reachable(code)
    } else {
        ProbeOutcome::unreachable(ProbeFailure::Http(code))
    }
}

// Categorizes different error types from reqwest
//
// reqwest wraps hyper which wraps std::io, so the useful detail is usually
// a few levels down the source() chain
fn categorize_error(error: &reqwest::Error) -> ProbeFailure {
    if error.is_timeout() {
        return ProbeFailure::Timeout;
    }
    if let Some(code) = error.status() {
        return ProbeFailure::Http(code.as_u16());
    }

    for cause in error_chain(error) {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            match io.kind() {
                ErrorKind::ConnectionRefused => return ProbeFailure::ConnectionRefused,
                ErrorKind::TimedOut => return ProbeFailure::Timeout,
                _ => {}
            }
        }
    }

    let description = error_chain(error)
        .map(|cause| cause.to_string().to_lowercase())
        .collect::<Vec<_>>()
        .join(": ");

    if is_dns_failure(&description) {
        ProbeFailure::DnsNotFound
    } else if description.contains("connection refused") {
        ProbeFailure::ConnectionRefused
    } else {
        ProbeFailure::ConnectionFailed
    }
}

fn error_chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(error), |&cause| cause.source())
}

fn is_dns_failure(description: &str) -> bool {
    description.contains("dns error")
        || description.contains("failed to lookup address")
        || description.contains("name or service not known")
        || description.contains("no such host")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn prober() -> HttpProber {
        HttpProber::new(&ProbeConfig {
            timeout: Duration::from_secs(1),
            user_agent: "link-notes-test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_success_and_redirect_are_reachable() {
        assert_eq!(classify_status(200).verdict, Verdict::Reachable);
        assert_eq!(classify_status(301).verdict, Verdict::Reachable);
        assert_eq!(classify_status(204).http_status, Some(204));
    }

    #[test]
    fn test_error_codes_are_unreachable() {
        let not_found = classify_status(404);
        assert_eq!(not_found.verdict, Verdict::Unreachable);
        assert_eq!(not_found.http_status, Some(404));
        assert_eq!(not_found.failure.unwrap().to_string(), "HTTP 404");

        let server = classify_status(503);
        assert_eq!(server.verdict, Verdict::Unreachable);
        assert_eq!(server.failure, Some(ProbeFailure::Http(503)));
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(ProbeFailure::Timeout.to_string(), "Timeout");
        assert_eq!(ProbeFailure::DnsNotFound.to_string(), "Domain not found");
        assert_eq!(ProbeFailure::ConnectionRefused.to_string(), "Connection refused");
        assert_eq!(ProbeFailure::ConnectionFailed.to_string(), "Connection failed");
    }

    #[test]
    fn test_dns_detection() {
        assert!(is_dns_failure("error sending request: dns error: failed to lookup address information"));
        assert!(!is_dns_failure("connection reset by peer"));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("error sending request")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn test_error_chain_walks_every_source() {
        let error = Wrapped(std::io::Error::new(ErrorKind::ConnectionRefused, "connection refused"));

        let chain: Vec<String> = error_chain(&error).map(|cause| cause.to_string()).collect();
        assert_eq!(chain, ["error sending request", "connection refused"]);

        let io = error_chain(&error).find_map(|cause| cause.downcast_ref::<std::io::Error>());
        assert_eq!(io.map(|e| e.kind()), Some(ErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn test_malformed_url_never_hits_network() {
        let outcome = prober().check("https://").await;
        assert_eq!(outcome.verdict, Verdict::Unreachable);
        assert_eq!(outcome.failure, Some(ProbeFailure::InvalidUrl));
        assert_eq!(outcome.http_status, None);
    }

    #[tokio::test]
    async fn test_refused_connection_is_classified() {
        // Port 9 on localhost is "discard"; nothing listens there in CI
        let outcome = prober().check("http://127.0.0.1:9/").await;
        assert_eq!(outcome.verdict, Verdict::Unreachable);
        assert!(matches!(
            outcome.failure,
            Some(ProbeFailure::ConnectionRefused | ProbeFailure::ConnectionFailed | ProbeFailure::Timeout)
        ));
    }
}
