// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Loading and caching of the leap-second schedule.
//!
//! [`LeapSecondStore`] performs the one blocking step of the crate: getting a
//! [`LeapSecondTable`] into memory.  It is memoized behind a mutex so that
//! concurrent first uses trigger a single load, and it is refreshed
//! according to [`SourceConfig`]:
//!
//! | Policy | Sources tried, in order |
//! |--------|-------------------------|
//! | [`RefreshPolicy::Offline`]  | cache file (any age) → embedded list |
//! | [`RefreshPolicy::OnDemand`] | fresh cache file → network → stale cache file → empty table (only if `tolerate_missing`) |
//!
//! A cache file is *fresh* while it is younger than `max_age` and its `#@`
//! expiry has not passed.  The memoized table is re-checked after `max_age`
//! or at its expiry, whichever comes first.
//!
//! Network access goes through the [`Fetch`] trait; [`HttpFetcher`] is the
//! production implementation (blocking `reqwest` with timeout and
//! exponential backoff).

use crate::error::{Error, Result};
use crate::instant::JulianInstant;
use crate::leap_seconds::LeapSecondTable;
use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Published copy of the IERS leap-second list.
pub const DEFAULT_LEAP_SECONDS_URL: &str = "https://data.iana.org/time-zones/tzdb/leap-seconds.list";

/// Re-check interval for a table that is already past its expiry.
const EXPIRED_RECHECK: Duration = Duration::from_secs(3_600);

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// When the store is allowed to go to the network.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Never fetch; use the cache file if present, else the embedded list.
    Offline,
    /// Fetch when no fresh cache file exists.
    #[default]
    OnDemand,
}

/// Exponential backoff between fetch attempts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No retries.
    pub const fn once() -> Self {
        Self {
            attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << doublings)
            .min(self.max_backoff)
    }
}

/// Where the leap-second list comes from and how long it stays valid.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub url: String,
    /// Local copy of the list; `None` disables the file cache.
    pub cache_path: Option<PathBuf>,
    /// Age after which a cache file or memoized table is reloaded.
    pub max_age: Duration,
    pub refresh: RefreshPolicy,
    /// Fall back to an empty table (TAI − UTC = 0) instead of failing.
    pub tolerate_missing: bool,
    pub retry: RetryPolicy,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LEAP_SECONDS_URL.to_string(),
            cache_path: default_cache_path(),
            max_age: Duration::from_secs(30 * 86_400),
            refresh: RefreshPolicy::OnDemand,
            tolerate_missing: false,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl SourceConfig {
    /// Defaults with the network disabled.
    pub fn offline() -> Self {
        Self {
            refresh: RefreshPolicy::Offline,
            ..Self::default()
        }
    }

    /// Defaults overlaid with environment variables:
    ///
    /// | Variable | Effect |
    /// |----------|--------|
    /// | `ASTRODATE_LEAP_SECONDS_URL` | source URL |
    /// | `ASTRODATE_CACHE_DIR` | directory holding `leap-seconds.list` |
    /// | `ASTRODATE_OFFLINE` | `1`/`true` selects [`RefreshPolicy::Offline`] |
    /// | `ASTRODATE_TOLERATE_MISSING` | `1`/`true` enables `tolerate_missing` |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ASTRODATE_LEAP_SECONDS_URL") {
            config.url = url;
        }
        if let Ok(dir) = std::env::var("ASTRODATE_CACHE_DIR") {
            config.cache_path = Some(PathBuf::from(dir).join(CACHE_FILE_NAME));
        }
        if let Some(offline) = env_flag("ASTRODATE_OFFLINE") {
            config.refresh = if offline {
                RefreshPolicy::Offline
            } else {
                RefreshPolicy::OnDemand
            };
        }
        if let Some(tolerate) = env_flag("ASTRODATE_TOLERATE_MISSING") {
            config.tolerate_missing = tolerate;
        }

        config
    }
}

const CACHE_FILE_NAME: &str = "leap-seconds.list";

/// `$HOME/.cache/astrodate/leap-seconds.list`, or `None` without `$HOME`.
pub fn default_cache_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join("astrodate")
            .join(CACHE_FILE_NAME),
    )
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    let flag = parse_flag(&value);
    if flag.is_none() {
        warn!("ignoring {}={:?}: expected a boolean", name, value);
    }
    flag
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Fetching
// ═══════════════════════════════════════════════════════════════════════════

/// Retrieves the raw bytes behind a URL.
pub trait Fetch: Send + Sync {
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] when the resource cannot be obtained.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) fetcher with timeout and retry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: String,
}

enum Failure {
    /// Worth another attempt (network error, 5xx).
    Transient(String),
    /// Retrying will not help (4xx, client setup).
    Permanent(String),
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            timeout,
            retry,
            user_agent: format!("astrodate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.timeout, config.retry)
    }

    fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, Failure> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Failure::Permanent(format!("failed to create HTTP client: {e}")))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| Failure::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(Failure::Permanent(format!("HTTP status {status}")));
        }
        if !status.is_success() {
            return Err(Failure::Transient(format!("HTTP status {status}")));
        }

        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(|e| Failure::Transient(format!("failed to read response: {e}")))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetch_once(url) {
                Ok(body) => return Ok(body),
                Err(Failure::Permanent(reason)) => {
                    return Err(Error::source_unavailable(url, reason));
                }
                Err(Failure::Transient(reason)) if attempt >= attempts => {
                    return Err(Error::source_unavailable(
                        url,
                        format!("{reason} (after {attempts} attempts)"),
                    ));
                }
                Err(Failure::Transient(reason)) => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "fetching {} failed (attempt {}/{}): {}; retrying in {:?}",
                        url, attempt, attempts, reason, delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LeapSecondStore
// ═══════════════════════════════════════════════════════════════════════════

struct Loaded {
    table: Arc<LeapSecondTable>,
    next_check: DateTime<Utc>,
}

/// Process-wide, lazily loaded leap-second schedule.
pub struct LeapSecondStore {
    config: SourceConfig,
    fetcher: Box<dyn Fetch>,
    state: Mutex<Option<Loaded>>,
}

impl std::fmt::Debug for LeapSecondStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeapSecondStore")
            .field("config", &self.config)
            .field("loaded", &self.state.try_lock().map(|s| s.is_some()))
            .finish()
    }
}

impl LeapSecondStore {
    /// Store fetching over HTTP.
    pub fn new(config: SourceConfig) -> Self {
        let fetcher = HttpFetcher::from_config(&config);
        Self::with_fetcher(config, fetcher)
    }

    /// Store using a custom [`Fetch`] implementation.
    pub fn with_fetcher(config: SourceConfig, fetcher: impl Fetch + 'static) -> Self {
        Self {
            config,
            fetcher: Box::new(fetcher),
            state: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The current table, loading it first if needed.
    ///
    /// Loading happens at most once per validity window; callers arriving
    /// while a load is in progress wait for it and share its result.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] when no table can be obtained and
    /// `tolerate_missing` is off.
    pub fn ensure_loaded(&self) -> Result<Arc<LeapSecondTable>> {
        self.load_with(false)
    }

    /// Force a reload, bypassing the memoized table and a fresh cache file.
    pub fn refresh(&self) -> Result<Arc<LeapSecondTable>> {
        self.load_with(true)
    }

    /// Drop the memoized table; the next [`ensure_loaded`](Self::ensure_loaded)
    /// reloads it.
    pub fn invalidate(&self) {
        *self.state.lock() = None;
    }

    fn load_with(&self, force: bool) -> Result<Arc<LeapSecondTable>> {
        let mut state = self.state.lock();
        let now = Utc::now();

        if !force {
            if let Some(loaded) = state.as_ref() {
                if now < loaded.next_check {
                    debug!("leap-second table cache hit");
                    return Ok(Arc::clone(&loaded.table));
                }
                debug!("leap-second table due for re-check");
            }
        }

        let loaded = self.load(now, force)?;
        let table = Arc::clone(&loaded.table);
        *state = Some(loaded);
        Ok(table)
    }

    fn load(&self, now: DateTime<Utc>, force: bool) -> Result<Loaded> {
        match self.config.refresh {
            RefreshPolicy::Offline => {
                let table = match self.read_cache() {
                    Some((table, _)) => table,
                    None => {
                        debug!("using embedded leap-second list");
                        LeapSecondTable::builtin()
                    }
                };
                Ok(Loaded {
                    table: Arc::new(table),
                    next_check: DateTime::<Utc>::MAX_UTC,
                })
            }
            RefreshPolicy::OnDemand => self.load_on_demand(now, force),
        }
    }

    fn load_on_demand(&self, now: DateTime<Utc>, force: bool) -> Result<Loaded> {
        let today = JulianInstant::from_datetime(now);

        if !force {
            if let Some((table, age)) = self.read_cache() {
                if age < self.config.max_age && !table.is_expired(&today) {
                    debug!("leap-second cache file is fresh ({:?} old)", age);
                    let next_check = next_check(now, &table, self.config.max_age - age);
                    return Ok(Loaded {
                        table: Arc::new(table),
                        next_check,
                    });
                }
            }
        }

        let err = match self.fetch_and_store() {
            Ok(table) => {
                let next_check = next_check(now, &table, self.config.max_age);
                return Ok(Loaded {
                    table: Arc::new(table),
                    next_check,
                });
            }
            Err(err) => err,
        };

        let retry_at = add_duration(now, EXPIRED_RECHECK.min(self.config.max_age));

        if let Some((table, age)) = self.read_cache() {
            warn!(
                "leap-second download failed ({}); using stale cache file ({:?} old)",
                err, age
            );
            return Ok(Loaded {
                table: Arc::new(table),
                next_check: retry_at,
            });
        }

        if self.config.tolerate_missing {
            warn!(
                "leap-second data unavailable ({}); assuming TAI − UTC = 0",
                err
            );
            return Ok(Loaded {
                table: Arc::new(LeapSecondTable::empty()),
                next_check: retry_at,
            });
        }

        Err(err)
    }

    fn fetch_and_store(&self) -> Result<LeapSecondTable> {
        info!("fetching leap-second list from {}", self.config.url);
        let bytes = self.fetcher.fetch(&self.config.url)?;
        let table = LeapSecondTable::from_bytes(&bytes)?;

        if let Some(path) = &self.config.cache_path {
            match write_atomically(path, &bytes) {
                Ok(()) => info!("cached leap-second list at {}", path.display()),
                Err(e) => warn!(
                    "failed to write leap-second cache {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        Ok(table)
    }

    /// Parsed cache file and its age; `None` if absent or unusable.
    fn read_cache(&self) -> Option<(LeapSecondTable, Duration)> {
        let path = self.config.cache_path.as_ref()?;

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no leap-second cache file at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("cannot read leap-second cache {}: {}", path.display(), e);
                return None;
            }
        };

        // Unknown or future modification times count as stale.
        let age = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or(Duration::MAX);

        match LeapSecondTable::from_bytes(&bytes) {
            Ok(table) => {
                debug!(
                    "loaded {} leap-second entries from {}",
                    table.len(),
                    path.display()
                );
                Some((table, age))
            }
            Err(e) => {
                warn!("ignoring leap-second cache {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Earliest of `now + ttl` and the table's own expiry.  Tables already past
/// their expiry are re-checked after [`EXPIRED_RECHECK`].
fn next_check(now: DateTime<Utc>, table: &LeapSecondTable, ttl: Duration) -> DateTime<Utc> {
    let by_age = add_duration(now, ttl);
    match table.expires().and_then(|e| e.to_unix_datetime()) {
        Some(expiry) if expiry > now => by_age.min(expiry),
        Some(_) => add_duration(now, EXPIRED_RECHECK.min(ttl)),
        None => by_age,
    }
}

fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Write to a sibling temporary file, then rename over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)
}

// ═══════════════════════════════════════════════════════════════════════════
// Process-wide store
// ═══════════════════════════════════════════════════════════════════════════

static GLOBAL: Lazy<LeapSecondStore> = Lazy::new(|| LeapSecondStore::new(SourceConfig::from_env()));

/// Shared store configured from the environment
/// (see [`SourceConfig::from_env`]).
pub fn global() -> &'static LeapSecondStore {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SAMPLE: &str = "#@ 6311433600\n2272060800 10\n3550089600 35\n3692217600 37\n";

    #[derive(Clone)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        body: Option<&'static str>,
    }

    impl CountingFetcher {
        fn serving(body: &'static str) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                body: Some(body),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                body: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(body.as_bytes().to_vec()),
                None => Err(Error::source_unavailable(url, "connection refused")),
            }
        }
    }

    fn config(dir: &Path, refresh: RefreshPolicy) -> SourceConfig {
        SourceConfig {
            url: "https://leap.invalid/leap-seconds.list".to_string(),
            cache_path: Some(dir.join(CACHE_FILE_NAME)),
            refresh,
            retry: RetryPolicy::once(),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn offline_without_cache_uses_embedded_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = CountingFetcher::serving(SAMPLE);
        let store =
            LeapSecondStore::with_fetcher(config(dir.path(), RefreshPolicy::Offline), fetcher.clone());

        let table = store.ensure_loaded().expect("embedded list");
        assert_eq!(table.len(), 28);
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn offline_prefers_cache_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CACHE_FILE_NAME), SAMPLE).expect("write cache");
        let store = LeapSecondStore::with_fetcher(
            config(dir.path(), RefreshPolicy::Offline),
            CountingFetcher::failing(),
        );

        let table = store.ensure_loaded().expect("cache file");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn on_demand_fetches_once_and_writes_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = CountingFetcher::serving(SAMPLE);
        let store =
            LeapSecondStore::with_fetcher(config(dir.path(), RefreshPolicy::OnDemand), fetcher.clone());

        let first = store.ensure_loaded().expect("fetched");
        let second = store.ensure_loaded().expect("memoized");
        assert_eq!(first.len(), 3);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(), 1);

        let cached = fs::read_to_string(dir.path().join(CACHE_FILE_NAME)).expect("cache file");
        assert_eq!(cached, SAMPLE);
        assert!(!dir.path().join("leap-seconds.tmp").exists());
    }

    #[test]
    fn fresh_cache_file_avoids_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CACHE_FILE_NAME), SAMPLE).expect("write cache");
        let fetcher = CountingFetcher::serving(SAMPLE);
        let store =
            LeapSecondStore::with_fetcher(config(dir.path(), RefreshPolicy::OnDemand), fetcher.clone());

        store.ensure_loaded().expect("cache file");
        assert_eq!(fetcher.calls(), 0);

        store.invalidate();
        store.ensure_loaded().expect("cache file again");
        assert_eq!(fetcher.calls(), 0);

        store.refresh().expect("forced fetch");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn cache_file_from_the_future_is_refetched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CACHE_FILE_NAME);
        fs::write(&path, SAMPLE).expect("write cache");
        let ahead = SystemTime::now() + Duration::from_secs(365 * 86_400);
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(ahead))
            .expect("set mtime");

        let fetcher = CountingFetcher::serving(SAMPLE);
        let store =
            LeapSecondStore::with_fetcher(config(dir.path(), RefreshPolicy::OnDemand), fetcher.clone());

        store.ensure_loaded().expect("refetched");
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn expired_cache_file_is_refetched() {
        let dir = tempfile::tempdir().expect("tempdir");
        // expiry 2014-01-01
        fs::write(
            dir.path().join(CACHE_FILE_NAME),
            "#@ 3597523200\n2272060800 10\n",
        )
        .expect("write cache");
        let fetcher = CountingFetcher::serving(SAMPLE);
        let store =
            LeapSecondStore::with_fetcher(config(dir.path(), RefreshPolicy::OnDemand), fetcher.clone());

        let table = store.ensure_loaded().expect("refetched");
        assert_eq!(table.len(), 3);
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn failure_without_fallback_is_source_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeapSecondStore::with_fetcher(
            config(dir.path(), RefreshPolicy::OnDemand),
            CountingFetcher::failing(),
        );

        let err = store.ensure_loaded().unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn failure_falls_back_to_stale_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CACHE_FILE_NAME), SAMPLE).expect("write cache");
        let mut cfg = config(dir.path(), RefreshPolicy::OnDemand);
        cfg.max_age = Duration::ZERO;
        let fetcher = CountingFetcher::failing();
        let store = LeapSecondStore::with_fetcher(cfg, fetcher.clone());

        let table = store.ensure_loaded().expect("stale cache");
        assert_eq!(table.len(), 3);
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn tolerated_failure_yields_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cfg = config(dir.path(), RefreshPolicy::OnDemand);
        cfg.tolerate_missing = true;
        let store = LeapSecondStore::with_fetcher(cfg, CountingFetcher::failing());

        let table = store.ensure_loaded().expect("tolerated");
        assert!(table.is_empty());
    }

    #[test]
    fn concurrent_first_use_fetches_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = CountingFetcher::serving(SAMPLE);
        let store = Arc::new(LeapSecondStore::with_fetcher(
            config(dir.path(), RefreshPolicy::OnDemand),
            fetcher.clone(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.ensure_loaded().map(|t| t.len()))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread").expect("loaded"), 3);
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let retry = RetryPolicy {
            attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(3),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_secs(1));
        assert_eq!(retry.backoff(3), Duration::from_secs(2));
        assert_eq!(retry.backoff(4), Duration::from_secs(3));
        assert_eq!(retry.backoff(40), Duration::from_secs(3));
    }

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, previous }
        }

        fn unset(key: &'static str) -> Self {
            let previous = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(previous) => std::env::set_var(self.key, previous),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn from_env_reads_every_variable() {
        let _lock = ENV_LOCK.lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let cache_dir = dir.path().to_str().expect("utf-8 path");
        let _url = EnvVarGuard::set("ASTRODATE_LEAP_SECONDS_URL", "https://mirror.invalid/leap.list");
        let _dir = EnvVarGuard::set("ASTRODATE_CACHE_DIR", cache_dir);
        let _offline = EnvVarGuard::set("ASTRODATE_OFFLINE", "yes");
        let _tolerate = EnvVarGuard::set("ASTRODATE_TOLERATE_MISSING", "1");

        let cfg = SourceConfig::from_env();
        assert_eq!(cfg.url, "https://mirror.invalid/leap.list");
        assert_eq!(cfg.cache_path, Some(dir.path().join(CACHE_FILE_NAME)));
        assert_eq!(cfg.refresh, RefreshPolicy::Offline);
        assert!(cfg.tolerate_missing);
    }

    #[test]
    fn from_env_keeps_defaults_for_unset_or_garbled_values() {
        let _lock = ENV_LOCK.lock();
        let _url = EnvVarGuard::unset("ASTRODATE_LEAP_SECONDS_URL");
        let _dir = EnvVarGuard::unset("ASTRODATE_CACHE_DIR");
        let _offline = EnvVarGuard::set("ASTRODATE_OFFLINE", "maybe");
        let _tolerate = EnvVarGuard::set("ASTRODATE_TOLERATE_MISSING", "off");

        let cfg = SourceConfig::from_env();
        let defaults = SourceConfig::default();
        assert_eq!(cfg.url, defaults.url);
        assert_eq!(cfg.cache_path, defaults.cache_path);
        assert_eq!(cfg.refresh, RefreshPolicy::OnDemand);
        assert!(!cfg.tolerate_missing);
    }

    #[test]
    fn flags_parse_leniently() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn next_check_honours_expiry() {
        let now = Utc::now();
        let table = LeapSecondTable::parse(SAMPLE).expect("parse");
        let ttl = Duration::from_secs(86_400);
        assert_eq!(next_check(now, &table, ttl), add_duration(now, ttl));

        let expired = LeapSecondTable::parse("#@ 3597523200\n2272060800 10\n").expect("parse");
        assert_eq!(
            next_check(now, &expired, ttl),
            add_duration(now, EXPIRED_RECHECK)
        );
    }

    #[test]
    fn unreachable_host_is_source_unavailable() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2), RetryPolicy::once());
        let err = fetcher.fetch("http://127.0.0.1:9/leap-seconds.list").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }), "{err}");
    }
}
