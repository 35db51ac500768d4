//! Manifest Bootstrapper
//!
//! Ensures the manifest content is cached locally, downloading it only when
//! the store is empty. Concurrent callers share one in-flight attempt and
//! all observe its result; once an attempt finishes, the next call starts a
//! fresh one (which is a cheap cache hit after a success).

use crate::manifest::content::CachedManifest;
use crate::manifest::descriptor::DataShapeError;
use crate::manifest::ManifestSource;
use crate::remote::TransportError;
use crate::store::{BlobStore, StoreError};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Where the bootstrapper is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapState {
    /// No attempt has run yet
    #[default]
    Unchecked,
    /// Looking for an existing record
    Checking,
    /// Cache miss, downloading descriptor and content
    Fetching,
    /// A record is in the store
    Cached,
    /// The last attempt failed; nothing was written
    Failed,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapState::Unchecked => "unchecked",
            BootstrapState::Checking => "checking",
            BootstrapState::Fetching => "fetching",
            BootstrapState::Cached => "cached",
            BootstrapState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a bootstrap attempt failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("Manifest download failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Manifest store failed: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    DataShape(#[from] DataShapeError),

    #[error("Bootstrap task stopped: {0}")]
    Task(String),
}

/// Result of a successful bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A record was already present; no network calls were made
    AlreadyCached { record_id: i64 },
    /// Content was downloaded and appended
    Fetched { record_id: i64 },
}

impl BootstrapOutcome {
    pub fn record_id(&self) -> i64 {
        match self {
            BootstrapOutcome::AlreadyCached { record_id }
            | BootstrapOutcome::Fetched { record_id } => *record_id,
        }
    }
}

type BootstrapResult = Result<BootstrapOutcome, BootstrapError>;
type Attempt = Shared<BoxFuture<'static, BootstrapResult>>;

/// Single-flight manifest cache bootstrapper
pub struct Bootstrapper<M, S> {
    source: Arc<M>,
    store: Arc<S>,
    locale: String,
    state: Arc<RwLock<BootstrapState>>,
    inflight: Mutex<Option<Attempt>>,
}

impl<M, S> Bootstrapper<M, S>
where
    M: ManifestSource + 'static,
    S: BlobStore + 'static,
{
    pub fn new(source: Arc<M>, store: Arc<S>, locale: impl Into<String>) -> Self {
        Self {
            source,
            store,
            locale: locale.into(),
            state: Arc::new(RwLock::new(BootstrapState::Unchecked)),
            inflight: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> BootstrapState {
        *self.state.read().await
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Make sure the manifest is cached
    ///
    /// Joins the in-flight attempt if there is one. The attempt runs on its
    /// own task, so it finishes even if every caller stops waiting. Failures
    /// are logged and returned; whether to surface them is up to the caller.
    pub async fn bootstrap(&self) -> BootstrapResult {
        let attempt = {
            let mut inflight = self.inflight.lock().await;
            match inflight.as_ref() {
                Some(attempt) if attempt.peek().is_none() => {
                    tracing::debug!("Joining in-flight manifest bootstrap");
                    attempt.clone()
                }
                _ => {
                    let task = tokio::spawn(run_attempt(
                        Arc::clone(&self.source),
                        Arc::clone(&self.store),
                        Arc::clone(&self.state),
                        self.locale.clone(),
                    ));
                    let attempt = async move {
                        task.await
                            .unwrap_or_else(|e| Err(BootstrapError::Task(e.to_string())))
                    }
                    .boxed()
                    .shared();
                    *inflight = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    /// The cached manifest, if one is stored
    pub async fn cached(&self) -> Result<Option<CachedManifest>, StoreError> {
        Ok(self.store.peek_first().await?.map(CachedManifest::new))
    }
}

async fn run_attempt<M, S>(
    source: Arc<M>,
    store: Arc<S>,
    state: Arc<RwLock<BootstrapState>>,
    locale: String,
) -> BootstrapResult
where
    M: ManifestSource,
    S: BlobStore,
{
    *state.write().await = BootstrapState::Checking;

    let result = check_then_fetch(source.as_ref(), store.as_ref(), &state, &locale).await;

    match &result {
        Ok(outcome) => {
            *state.write().await = BootstrapState::Cached;
            tracing::info!(record_id = outcome.record_id(), ?outcome, "Manifest cached");
        }
        Err(e) => {
            *state.write().await = BootstrapState::Failed;
            tracing::warn!(error = %e, "Manifest bootstrap failed");
        }
    }

    result
}

async fn check_then_fetch<M, S>(
    source: &M,
    store: &S,
    state: &RwLock<BootstrapState>,
    locale: &str,
) -> BootstrapResult
where
    M: ManifestSource,
    S: BlobStore,
{
    if let Some(record) = store.peek_first().await? {
        return Ok(BootstrapOutcome::AlreadyCached {
            record_id: record.id,
        });
    }

    *state.write().await = BootstrapState::Fetching;

    let descriptor = source.fetch_manifest_descriptor().await?;
    let content_path = descriptor.content_path(locale)?;
    tracing::info!(
        version = descriptor.version().unwrap_or("unknown"),
        locale,
        path = content_path,
        "Manifest not cached, downloading content"
    );

    let content = source.fetch_content(content_path).await?;
    let record_id = store.append(&content).await?;

    Ok(BootstrapOutcome::Fetched { record_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestDescriptor;
    use crate::remote::test_support::LogCapture;
    use crate::store::{CacheRecord, SqliteStore};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    type CallLog = Arc<StdMutex<Vec<&'static str>>>;

    struct FakeSource {
        descriptor: Result<Value, TransportError>,
        content: Result<Value, TransportError>,
        delay: Duration,
        log: CallLog,
    }

    impl FakeSource {
        fn healthy(log: CallLog) -> Self {
            Self {
                descriptor: Ok(json!({
                    "Response": {
                        "version": "1.0",
                        "jsonWorldContentPaths": { "en": "/common/destiny2_content/en.json" }
                    },
                    "ErrorCode": 1
                })),
                content: Ok(json!({ "DestinyClassDefinition": { "671679327": { "index": 1 } } })),
                delay: Duration::ZERO,
                log,
            }
        }

        fn calls(&self, name: &str) -> usize {
            self.log.lock().unwrap().iter().filter(|c| **c == name).count()
        }
    }

    #[async_trait]
    impl ManifestSource for FakeSource {
        async fn fetch_manifest_descriptor(&self) -> Result<ManifestDescriptor, TransportError> {
            self.log.lock().unwrap().push("descriptor");
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.descriptor.clone().map(ManifestDescriptor::new)
        }

        async fn fetch_content(&self, content_path: &str) -> Result<Value, TransportError> {
            assert_eq!(content_path, "/common/destiny2_content/en.json");
            self.log.lock().unwrap().push("content");
            self.content.clone()
        }
    }

    /// Real in-memory store that also records calls
    struct RecordingStore {
        inner: SqliteStore,
        fail_append: bool,
        log: CallLog,
    }

    impl RecordingStore {
        fn new(log: CallLog) -> Self {
            Self {
                inner: SqliteStore::open_in_memory("destinydata").unwrap(),
                fail_append: false,
                log,
            }
        }
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn append(&self, data: &Value) -> Result<i64, StoreError> {
            self.log.lock().unwrap().push("append");
            if self.fail_append {
                return Err(StoreError::Write("disk full".to_string()));
            }
            self.inner.append(data).await
        }

        async fn peek_first(&self) -> Result<Option<CacheRecord>, StoreError> {
            self.log.lock().unwrap().push("peek");
            self.inner.peek_first().await
        }
    }

    fn setup(
        configure: impl FnOnce(&mut FakeSource, &mut RecordingStore),
    ) -> (
        Bootstrapper<FakeSource, RecordingStore>,
        Arc<FakeSource>,
        Arc<RecordingStore>,
        CallLog,
    ) {
        let log: CallLog = Arc::default();
        let mut source = FakeSource::healthy(Arc::clone(&log));
        let mut store = RecordingStore::new(Arc::clone(&log));
        configure(&mut source, &mut store);

        let source = Arc::new(source);
        let store = Arc::new(store);
        let bootstrapper = Bootstrapper::new(Arc::clone(&source), Arc::clone(&store), "en");
        (bootstrapper, source, store, log)
    }

    #[tokio::test]
    async fn test_cold_start_fetches_in_order() {
        let (bootstrapper, _source, store, log) = setup(|_, _| {});
        assert_eq!(bootstrapper.state().await, BootstrapState::Unchecked);

        let outcome = bootstrapper.bootstrap().await.unwrap();

        assert!(matches!(outcome, BootstrapOutcome::Fetched { .. }));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["peek", "descriptor", "content", "append"]
        );
        assert_eq!(store.inner.count().await.unwrap(), 1);
        assert_eq!(bootstrapper.state().await, BootstrapState::Cached);

        let cached = bootstrapper.cached().await.unwrap().unwrap();
        assert_eq!(cached.record_id(), outcome.record_id());
        assert!(cached.definition("DestinyClassDefinition", 671679327).is_some());
    }

    #[tokio::test]
    async fn test_warm_start_makes_no_network_calls() {
        let (bootstrapper, source, store, _log) = setup(|_, _| {});
        let existing = store.inner.append(&json!({ "cached": true })).await.unwrap();

        let outcome = bootstrapper.bootstrap().await.unwrap();

        assert_eq!(
            outcome,
            BootstrapOutcome::AlreadyCached {
                record_id: existing
            }
        );
        assert_eq!(source.calls("descriptor"), 0);
        assert_eq!(source.calls("content"), 0);
        assert_eq!(bootstrapper.state().await, BootstrapState::Cached);
    }

    #[tokio::test]
    async fn test_repeated_bootstrap_appends_once() {
        let (bootstrapper, source, store, _log) = setup(|_, _| {});

        let first = bootstrapper.bootstrap().await.unwrap();
        let second = bootstrapper.bootstrap().await.unwrap();
        let third = bootstrapper.bootstrap().await.unwrap();

        assert!(matches!(first, BootstrapOutcome::Fetched { .. }));
        assert_eq!(
            second,
            BootstrapOutcome::AlreadyCached {
                record_id: first.record_id()
            }
        );
        assert_eq!(second, third);
        assert_eq!(source.calls("descriptor"), 1);
        assert_eq!(store.inner.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let (bootstrapper, source, store, _log) = setup(|source, _| {
            source.delay = Duration::from_millis(50);
        });

        let (a, b, c) = tokio::join!(
            bootstrapper.bootstrap(),
            bootstrapper.bootstrap(),
            bootstrapper.bootstrap()
        );

        let a = a.unwrap();
        assert!(matches!(a, BootstrapOutcome::Fetched { .. }));
        assert_eq!(b.unwrap(), a);
        assert_eq!(c.unwrap(), a);
        assert_eq!(source.calls("descriptor"), 1);
        assert_eq!(source.calls("content"), 1);
        assert_eq!(store.inner.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_failure() {
        let (bootstrapper, source, store, _log) = setup(|source, _| {
            source.delay = Duration::from_millis(50);
            source.descriptor = Err(TransportError::Timeout {
                url: "https://www.bungie.net/Platform/Destiny2/Manifest/".to_string(),
            });
        });

        let (a, b) = tokio::join!(bootstrapper.bootstrap(), bootstrapper.bootstrap());

        assert!(matches!(a, Err(BootstrapError::Transport(_))));
        assert_eq!(a, b);
        assert_eq!(source.calls("descriptor"), 1);
        assert_eq!(store.inner.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_attempt_still_completes() {
        let (bootstrapper, source, store, _log) = setup(|source, _| {
            source.delay = Duration::from_millis(50);
        });

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), bootstrapper.bootstrap()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(bootstrapper.state().await, BootstrapState::Cached);
        assert_eq!(store.inner.count().await.unwrap(), 1);

        let record_id = store.inner.peek_first().await.unwrap().unwrap().id;
        let outcome = bootstrapper.bootstrap().await.unwrap();
        assert_eq!(outcome.record_id(), record_id);
        assert_eq!(source.calls("descriptor"), 1);
        assert_eq!(source.calls("content"), 1);
    }

    #[tokio::test]
    async fn test_missing_locale_fails_without_writes() {
        let (bootstrapper, source, store, log) = setup(|source, _| {
            source.descriptor = Ok(json!({
                "Response": { "jsonWorldContentPaths": { "fr": "/fr.json" } }
            }));
        });

        let err = bootstrapper.bootstrap().await.unwrap_err();

        assert_eq!(
            err,
            BootstrapError::DataShape(DataShapeError::MissingLocale("en".to_string()))
        );
        assert_eq!(source.calls("content"), 0);
        assert!(!log.lock().unwrap().contains(&"append"));
        assert_eq!(store.inner.count().await.unwrap(), 0);
        assert_eq!(bootstrapper.state().await, BootstrapState::Failed);
    }

    #[tokio::test]
    async fn test_append_failure_is_returned() {
        let (bootstrapper, _source, store, _log) = setup(|_, store| {
            store.fail_append = true;
        });

        let err = bootstrapper.bootstrap().await.unwrap_err();
        assert!(matches!(err, BootstrapError::Store(StoreError::Write(_))));
        assert_eq!(store.inner.count().await.unwrap(), 0);
        assert_eq!(bootstrapper.state().await, BootstrapState::Failed);
    }

    #[tokio::test]
    async fn test_failed_attempt_can_be_retried_by_caller() {
        let (bootstrapper, source, _store, _log) = setup(|_, store| {
            store.fail_append = true;
        });

        assert!(bootstrapper.bootstrap().await.is_err());
        assert!(bootstrapper.bootstrap().await.is_err());
        assert_eq!(source.calls("descriptor"), 2);
    }

    #[tokio::test]
    async fn test_content_failure_is_logged_and_nothing_written() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.subscriber(tracing::Level::WARN));

        let (bootstrapper, source, store, _log) = setup(|source, _| {
            source.content = Err(TransportError::Status {
                url: "https://bungie.net/common/destiny2_content/en.json".to_string(),
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        });

        let err = bootstrapper.bootstrap().await.unwrap_err();

        assert!(matches!(err, BootstrapError::Transport(_)));
        assert_eq!(source.calls("content"), 1);
        assert_eq!(store.inner.count().await.unwrap(), 0);

        let output = capture.output();
        assert!(output.contains("Manifest bootstrap failed"), "{output}");
        assert!(output.contains("503"), "{output}");
    }
}
