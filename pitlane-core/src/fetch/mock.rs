//! Mock fetcher for tests.
//!
//! Rules match URLs by regex and return canned responses, optionally after a
//! simulated latency. Every request is recorded so tests can assert how many
//! times a module was actually fetched.

use super::{FetchError, FetchFuture, FetchResponse, ModuleFetcher};
use parking_lot::RwLock;
use regex::Regex;
use std::time::Duration;

/// A recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRecord {
    /// The requested URL.
    pub url: String,
}

/// A rule for matching and responding to fetches.
#[derive(Clone)]
pub struct MockFetchRule {
    /// URL pattern (regex).
    pub url_pattern: Regex,
    /// Response to return.
    pub response: FetchResponse,
    /// Simulated latency.
    pub latency: Option<Duration>,
    /// Number of times this rule should match (None = unlimited).
    pub times: Option<usize>,
    /// Number of times this rule has matched.
    matched_count: usize,
}

impl MockFetchRule {
    /// Create a new rule.
    ///
    /// # Panics
    /// Panics if `url_pattern` is not a valid regex.
    pub fn new(url_pattern: &str, response: FetchResponse) -> Self {
        Self {
            url_pattern: Regex::new(url_pattern).expect("Invalid URL regex pattern"),
            response,
            latency: None,
            times: None,
            matched_count: 0,
        }
    }

    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set the number of times this rule should match.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn matches(&self, url: &str) -> bool {
        if let Some(limit) = self.times {
            if self.matched_count >= limit {
                return false;
            }
        }
        self.url_pattern.is_match(url)
    }
}

impl std::fmt::Debug for MockFetchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFetchRule")
            .field("url_pattern", &self.url_pattern.as_str())
            .field("response_status", &self.response.status)
            .field("latency", &self.latency)
            .field("times", &self.times)
            .finish()
    }
}

/// Mock fetcher for testing.
///
/// # Example
///
/// ```
/// use pitlane_core::fetch::MockFetcher;
///
/// let mock = MockFetcher::new()
///     .on_url(r"^https://cars\.example\.com/rival\.wasm$")
///     .respond_bytes(b"\0asm\x01\0\0\0".to_vec())
///     .on_url(r"missing")
///     .respond_status(404);
/// assert_eq!(mock.request_count(), 0);
/// ```
pub struct MockFetcher {
    rules: RwLock<Vec<MockFetchRule>>,
    requests: RwLock<Vec<FetchRecord>>,
    fail_on_unmatched: bool,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            requests: RwLock::new(Vec::new()),
            fail_on_unmatched: true,
        }
    }

    /// Add a rule.
    pub fn rule(self, rule: MockFetchRule) -> Self {
        self.rules.write().push(rule);
        self
    }

    /// Set whether unmatched URLs fail (default) or answer 404.
    pub fn fail_on_unmatched(mut self, fail: bool) -> Self {
        self.fail_on_unmatched = fail;
        self
    }

    /// Fluent builder: start defining a rule for URLs matching `url_pattern`.
    pub fn on_url(self, url_pattern: &str) -> MockFetcherBuilder {
        MockFetcherBuilder {
            mock: self,
            url_pattern: url_pattern.to_string(),
            latency: None,
            times: None,
        }
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<FetchRecord> {
        self.requests.read().clone()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.requests.write().clear();
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Get the number of requests made for exactly `url`.
    pub fn request_count_for(&self, url: &str) -> usize {
        self.requests.read().iter().filter(|r| r.url == url).count()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleFetcher for MockFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        self.requests.write().push(FetchRecord {
            url: url.to_string(),
        });

        let mut rules = self.rules.write();
        let matched = rules.iter_mut().find(|rule| rule.matches(url));

        match matched {
            Some(rule) => {
                rule.matched_count += 1;
                let response = rule.response.clone();
                let latency = rule.latency;

                Box::pin(async move {
                    if let Some(delay) = latency {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(response)
                })
            }
            None => {
                if self.fail_on_unmatched {
                    let url = url.to_string();
                    Box::pin(async move { Err(FetchError::NoMockMatch { url }) })
                } else {
                    Box::pin(async move { Ok(FetchResponse::new(404, b"Not Found".to_vec())) })
                }
            }
        }
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Builder for fluent mock rule creation.
pub struct MockFetcherBuilder {
    mock: MockFetcher,
    url_pattern: String,
    latency: Option<Duration>,
    times: Option<usize>,
}

impl MockFetcherBuilder {
    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set the number of times this rule should match.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Set the response to return.
    pub fn respond(self, response: FetchResponse) -> MockFetcher {
        let mut rule = MockFetchRule::new(&self.url_pattern, response);
        rule.latency = self.latency;
        rule.times = self.times;
        self.mock.rule(rule)
    }

    /// Respond 200 with the given module bytes.
    pub fn respond_bytes(self, body: impl Into<Vec<u8>>) -> MockFetcher {
        self.respond(FetchResponse::ok(body))
    }

    /// Respond with an empty body and the given status.
    pub fn respond_status(self, status: u16) -> MockFetcher {
        self.respond(FetchResponse::new(status, Vec::new()))
    }
}
