//! Check client: the only component that talks to the remote checker.
//!
//! Three jobs, all about protecting the request budget and the pipeline:
//!
//! * cache raw results keyed by the exact submitted text (TTL + bounded
//!   capacity, oldest-first eviction, flushed wholesale on teardown);
//! * enforce a minimum interval between issued network calls, where a call
//!   requested too soon sleeps until eligible and a newer request supersedes
//!   a sleeping one (last-write-wins, never a queue);
//! * absorb every failure mode — transport error, non-2xx, HTTP 429,
//!   malformed body — into `None`. The caller's policy is simply "no
//!   annotations this cycle"; no error type ever crosses this boundary.

pub mod protocol;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use protocol::{CheckResponse, RawMatch, Replacement, Rule, RuleCategory};

/// Path appended to the user-supplied base URL unless already present.
pub const CHECK_PATH: &str = "/v2/check";
/// Freshness window for cached results.
pub const CACHE_TTL: Duration = Duration::from_secs(300);
/// Cache capacity; beyond this the oldest entry is evicted eagerly.
pub const CACHE_CAP: usize = 50;
/// Minimum spacing between consecutive issued network calls.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// Normalize a user-supplied base URL into the check endpoint: strip any
/// trailing slash, append [`CHECK_PATH`] unless the URL already ends in it.
pub fn normalize_endpoint(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with(CHECK_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{CHECK_PATH}")
    }
}

/// Form payload of one check request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckForm {
    pub text: String,
    pub language: String,
    pub api_key: Option<String>,
}

impl CheckForm {
    /// Field pairs in wire order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("text", self.text.clone()),
            ("language", self.language.clone()),
            ("enabledOnly", "false".to_string()),
        ];
        if let Some(key) = &self.api_key {
            pairs.push(("apiKey", key.clone()));
        }
        pairs
    }
}

/// Raw reply from the transport, before any interpretation.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Network seam. Production wraps `reqwest`; tests substitute an in-memory
/// recorder so every cache/spacing property runs without a socket.
#[async_trait]
pub trait CheckTransport: Send + Sync {
    async fn post_check(&self, endpoint: &str, form: &CheckForm) -> anyhow::Result<TransportReply>;
}

/// `reqwest`-backed transport, form-encoded POST.
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckTransport for HttpTransport {
    async fn post_check(&self, endpoint: &str, form: &CheckForm) -> anyhow::Result<TransportReply> {
        let response = self
            .http
            .post(endpoint)
            .form(&form.pairs())
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportReply { status, body })
    }
}

/// Internal failure taxonomy; absorbed into `None` before leaving the crate.
#[derive(Debug, Error)]
enum CheckFailure {
    #[error("rate limited (429)")]
    RateLimited,
    #[error("unexpected status {0}")]
    BadStatus(u16),
    #[error("transport failure: {0}")]
    Transport(anyhow::Error),
    #[error("malformed response body: {0}")]
    Malformed(serde_json::Error),
}

struct CachedCheck {
    response: CheckResponse,
    at: Instant,
}

struct ClientInner {
    endpoint: String,
    language: String,
    api_key: Option<String>,
    transport: Arc<dyn CheckTransport>,
    /// Insertion-ordered cache; linear scans are fine at this capacity.
    cache: Mutex<Vec<(String, CachedCheck)>>,
    /// Supersession counter for the rate spacer: each network-bound request
    /// takes a fresh generation, and a sleeper whose generation is no longer
    /// newest gives up without issuing.
    generation: AtomicU64,
    /// Earliest instant the next network call may be issued.
    next_eligible: Mutex<Option<Instant>>,
}

/// Cheap-clone handle to the shared client state.
#[derive(Clone)]
pub struct CheckClient {
    inner: Arc<ClientInner>,
}

impl CheckClient {
    pub fn new(config: &core_config::Config, transport: Arc<dyn CheckTransport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                endpoint: normalize_endpoint(&config.api_endpoint),
                language: config.language.as_code().to_string(),
                api_key: config.api_key.clone(),
                transport,
                cache: Mutex::new(Vec::new()),
                generation: AtomicU64::new(0),
                next_eligible: Mutex::new(None),
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Check `text`, consulting the cache first. Returns `None` for empty
    /// input, a superseded request, or any failure.
    pub async fn check(&self, text: &str) -> Option<CheckResponse> {
        if text.trim().is_empty() {
            return None;
        }
        if let Some(hit) = self.cache_lookup(text) {
            debug!(target: "check.cache", len = text.len(), "cache_hit");
            return Some(hit);
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Instant::now();
        let issue_at = {
            let eligible = self.inner.next_eligible.lock().ok()?;
            eligible.map_or(now, |at| at.max(now))
        };
        if issue_at > now {
            debug!(target: "check.client", wait_ms = (issue_at - now).as_millis() as u64, "deferred");
            tokio::time::sleep_until(issue_at).await;
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                debug!(target: "check.client", "superseded");
                return None;
            }
        }
        if let Ok(mut eligible) = self.inner.next_eligible.lock() {
            *eligible = Some(issue_at + MIN_REQUEST_INTERVAL);
        }

        match self.request(text).await {
            Ok(response) => {
                self.cache_insert(text, response.clone());
                Some(response)
            }
            Err(CheckFailure::RateLimited) => {
                debug!(target: "check.client", "rate_limited");
                None
            }
            Err(failure) => {
                warn!(target: "check.client", error = %failure, "check_failed");
                None
            }
        }
    }

    async fn request(&self, text: &str) -> Result<CheckResponse, CheckFailure> {
        let form = CheckForm {
            text: text.to_string(),
            language: self.inner.language.clone(),
            api_key: self.inner.api_key.clone(),
        };
        let reply = self
            .inner
            .transport
            .post_check(&self.inner.endpoint, &form)
            .await
            .map_err(CheckFailure::Transport)?;
        match reply.status {
            429 => Err(CheckFailure::RateLimited),
            s if !(200..300).contains(&s) => Err(CheckFailure::BadStatus(s)),
            _ => serde_json::from_str(&reply.body).map_err(CheckFailure::Malformed),
        }
    }

    fn cache_lookup(&self, text: &str) -> Option<CheckResponse> {
        let mut cache = self.inner.cache.lock().ok()?;
        let idx = cache.iter().position(|(key, _)| key == text)?;
        if cache[idx].1.at.elapsed() > CACHE_TTL {
            cache.remove(idx);
            return None;
        }
        Some(cache[idx].1.response.clone())
    }

    fn cache_insert(&self, text: &str, response: CheckResponse) {
        let Ok(mut cache) = self.inner.cache.lock() else {
            return;
        };
        cache.retain(|(key, _)| key != text);
        cache.push((
            text.to_string(),
            CachedCheck {
                response,
                at: Instant::now(),
            },
        ));
        while cache.len() > CACHE_CAP {
            cache.remove(0);
        }
    }

    /// Drop every cached result and the spacing deadline (plugin stop/start).
    pub fn flush(&self) {
        if let Ok(mut cache) = self.inner.cache.lock() {
            cache.clear();
        }
        if let Ok(mut eligible) = self.inner.next_eligible.lock() {
            *eligible = None;
        }
    }

    #[doc(hidden)]
    pub fn cached_entries(&self) -> usize {
        self.inner.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}
