//! Config-driven module registry for the proxy deployment.
//!
//! The catalog document is re-read according to a [`ReloadPolicy`]. A failed reload is reported
//! to the caller; the previously loaded registry is never served in its place.

use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{location::DocumentLocation, registry::ModuleRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Read the document on every call.
    Always,
    /// Re-read files when their modification time or size changes. Remote documents are
    /// fetched on every call.
    ///
    /// A file modified within [`MTIME_GRANULARITY`] of the last read is re-read on every call
    /// until it ages past that window, so same-size edits inside one timestamp tick are seen.
    OnChange,
    /// Re-read once the cached copy is older than the configured interval.
    Interval,
}

impl Default for ReloadPolicy {
    fn default() -> Self {
        Self::OnChange
    }
}

/// Coarsest file timestamp resolution we account for (FAT keeps 2s).
pub const MTIME_GRANULARITY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load module config from {location}: {cause}")]
/// The catalog document could not be read or parsed.
pub struct ConfigError {
    pub location: String,
    pub cause: String,
}

struct Cached {
    registry: Arc<ModuleRegistry>,
    loaded_at: Instant,
    /// Wall clock taken before the read started.
    read_started: SystemTime,
    fingerprint: Option<(SystemTime, u64)>,
}

pub struct ModuleCatalog {
    location: DocumentLocation,
    policy: ReloadPolicy,
    interval: Duration,
    http: reqwest::Client,
    cached: Mutex<Option<Cached>>,
}

impl ModuleCatalog {
    pub fn new(
        location: DocumentLocation,
        policy: ReloadPolicy,
        interval: Duration,
        http: reqwest::Client,
    ) -> Self {
        Self {
            location,
            policy,
            interval,
            http,
            cached: Mutex::new(None),
        }
    }

    pub fn location(&self) -> &DocumentLocation {
        &self.location
    }

    /// The registry to use for the current call, reloading per policy.
    ///
    /// The cache lock is only taken to look at or replace the cached copy; documents are read
    /// without it, so concurrent calls never queue behind one fetch.
    pub async fn current(&self) -> Result<Arc<ModuleRegistry>, ConfigError> {
        let uncached = match self.policy {
            ReloadPolicy::Always => true,
            ReloadPolicy::OnChange => matches!(self.location, DocumentLocation::Http(_)),
            ReloadPolicy::Interval => false,
        };
        if uncached {
            return self.load().await;
        }

        let fingerprint = match self.policy {
            ReloadPolicy::OnChange => self
                .location
                .fingerprint()
                .await
                .map_err(|err| self.config_error(err))?,
            _ => None,
        };

        if let Some(c) = self.cached.lock().await.as_ref() {
            if self.is_fresh(c, fingerprint) {
                return Ok(Arc::clone(&c.registry));
            }
        }

        let read_started = SystemTime::now();
        let registry = self.load().await?;
        tracing::info!(
            event = "catalog_reloaded",
            location = %self.location,
            modules = registry.len(),
            "module catalog loaded"
        );
        *self.cached.lock().await = Some(Cached {
            registry: Arc::clone(&registry),
            loaded_at: Instant::now(),
            read_started,
            fingerprint,
        });
        Ok(registry)
    }

    fn is_fresh(&self, cached: &Cached, fingerprint: Option<(SystemTime, u64)>) -> bool {
        match self.policy {
            ReloadPolicy::Always => false,
            ReloadPolicy::Interval => cached.loaded_at.elapsed() < self.interval,
            ReloadPolicy::OnChange => match (fingerprint, cached.fingerprint) {
                (Some(now), Some(then)) => {
                    now == then && then.0 + MTIME_GRANULARITY <= cached.read_started
                }
                _ => false,
            },
        }
    }

    async fn load(&self) -> Result<Arc<ModuleRegistry>, ConfigError> {
        let bytes = self
            .location
            .read_bytes(&self.http)
            .await
            .map_err(|err| self.config_error(err))?;
        let registry =
            ModuleRegistry::from_catalog_json(&bytes).map_err(|err| self.config_error(err))?;
        Ok(Arc::new(registry))
    }

    fn config_error(&self, err: anyhow::Error) -> ConfigError {
        ConfigError {
            location: self.location.to_string(),
            cause: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use axum::{extract::State, http::StatusCode, routing::get, Router};
    use tokio::sync::oneshot;

    use super::*;

    struct TempDoc(PathBuf);

    impl TempDoc {
        async fn new(contents: &str) -> Self {
            let path =
                std::env::temp_dir().join(format!("mcp-catalog-{}.json", uuid::Uuid::new_v4()));
            tokio::fs::write(&path, contents).await.unwrap();
            Self(path)
        }

        async fn write(&self, contents: &str) {
            tokio::fs::write(&self.0, contents).await.unwrap();
        }

        /// Push the modification time well outside the timestamp granularity window.
        fn age(&self) {
            std::fs::File::options()
                .write(true)
                .open(&self.0)
                .unwrap()
                .set_modified(SystemTime::now() - Duration::from_secs(60))
                .unwrap();
        }
    }

    impl Drop for TempDoc {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    const ONE: &str = r#"{ "add": { "url": "http://127.0.0.1:1/add", "method": "POST" } }"#;
    const SAME_SIZE: &str = r#"{ "sub": { "url": "http://127.0.0.1:1/sub", "method": "POST" } }"#;
    const TWO: &str = r#"{
  "add": { "url": "http://127.0.0.1:1/add", "method": "POST" },
  "multiply": { "url": "http://127.0.0.1:1/multiply", "method": "POST" }
}"#;

    fn catalog(doc: &TempDoc, policy: ReloadPolicy, interval: Duration) -> ModuleCatalog {
        ModuleCatalog::new(
            DocumentLocation::File(doc.0.clone()),
            policy,
            interval,
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn on_change_reuses_until_the_file_changes() {
        let doc = TempDoc::new(ONE).await;
        doc.age();
        let catalog = catalog(&doc, ReloadPolicy::OnChange, Duration::ZERO);

        let first = catalog.current().await.unwrap();
        let second = catalog.current().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        doc.write(TWO).await;
        let third = catalog.current().await.unwrap();
        assert_eq!(third.names(), vec!["add", "multiply"]);
    }

    #[tokio::test]
    async fn same_size_edit_right_after_a_read_is_seen() {
        let doc = TempDoc::new(ONE).await;
        let catalog = catalog(&doc, ReloadPolicy::OnChange, Duration::ZERO);
        assert_eq!(catalog.current().await.unwrap().names(), vec!["add"]);

        assert_eq!(SAME_SIZE.len(), ONE.len());
        doc.write(SAME_SIZE).await;
        assert_eq!(catalog.current().await.unwrap().names(), vec!["sub"]);
    }

    #[tokio::test]
    async fn always_sees_every_edit() {
        let doc = TempDoc::new(ONE).await;
        let catalog = catalog(&doc, ReloadPolicy::Always, Duration::ZERO);

        let first = catalog.current().await.unwrap();
        let second = catalog.current().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        doc.write(TWO).await;
        assert_eq!(catalog.current().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn interval_keeps_copy_until_it_expires() {
        let doc = TempDoc::new(ONE).await;
        let catalog = catalog(&doc, ReloadPolicy::Interval, Duration::from_secs(3600));

        assert_eq!(catalog.current().await.unwrap().len(), 1);
        doc.write(TWO).await;
        assert_eq!(catalog.current().await.unwrap().len(), 1);

        let expired = ModuleCatalog {
            interval: Duration::ZERO,
            ..catalog
        };
        assert_eq!(expired.current().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn broken_reload_is_an_error_not_a_stale_copy() {
        let doc = TempDoc::new(ONE).await;
        let catalog = catalog(&doc, ReloadPolicy::OnChange, Duration::ZERO);
        catalog.current().await.unwrap();

        doc.write("{ not json").await;
        let err = catalog.current().await.unwrap_err();
        assert!(err.to_string().starts_with("failed to load module config from "));
    }

    #[tokio::test]
    async fn missing_document_is_a_config_error() {
        let catalog = ModuleCatalog::new(
            DocumentLocation::File(PathBuf::from("/nonexistent/ms_modules.json")),
            ReloadPolicy::Always,
            Duration::ZERO,
            reqwest::Client::new(),
        );
        let err = catalog.current().await.unwrap_err();
        assert_eq!(err.location, "/nonexistent/ms_modules.json");
    }

    #[derive(Clone)]
    struct Served {
        doc: Arc<std::sync::Mutex<(StatusCode, String)>>,
        hits: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Served {
        fn new(contents: &str, delay: Duration) -> Self {
            Self {
                doc: Arc::new(std::sync::Mutex::new((StatusCode::OK, contents.to_string()))),
                hits: Arc::new(AtomicUsize::new(0)),
                delay,
            }
        }

        fn set(&self, status: StatusCode, contents: &str) {
            *self.doc.lock().unwrap() = (status, contents.to_string());
        }
    }

    async fn serve_doc(State(served): State<Served>) -> (StatusCode, String) {
        served.hits.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(served.delay).await;
        served.doc.lock().unwrap().clone()
    }

    async fn spawn_doc_server(served: Served) -> (url::Url, oneshot::Sender<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/ms_modules.json", get(serve_doc))
            .with_state(served);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });
        let url = url::Url::parse(&format!("http://{addr}/ms_modules.json")).unwrap();
        (url, shutdown_tx)
    }

    #[tokio::test]
    async fn remote_document_is_refetched_on_every_call() {
        let served = Served::new(ONE, Duration::ZERO);
        let (url, shutdown) = spawn_doc_server(served.clone()).await;
        let catalog = ModuleCatalog::new(
            DocumentLocation::Http(url),
            ReloadPolicy::OnChange,
            Duration::ZERO,
            reqwest::Client::new(),
        );

        let first = catalog.current().await.unwrap();
        let second = catalog.current().await.unwrap();
        assert_eq!(first.names(), vec!["add"]);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(served.hits.load(Ordering::SeqCst), 2);

        served.set(StatusCode::OK, TWO);
        assert_eq!(catalog.current().await.unwrap().names(), vec!["add", "multiply"]);

        served.set(StatusCode::INTERNAL_SERVER_ERROR, "down");
        let err = catalog.current().await.unwrap_err();
        assert!(err.location.ends_with("/ms_modules.json"), "{err}");
        assert!(err.cause.contains("status 500"), "{err}");
        assert_eq!(served.hits.load(Ordering::SeqCst), 4);

        let _ = shutdown.send(());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_do_not_queue_behind_one_fetch() {
        let delay = Duration::from_millis(300);
        let served = Served::new(ONE, delay);
        let (url, shutdown) = spawn_doc_server(served.clone()).await;
        let catalog = Arc::new(ModuleCatalog::new(
            DocumentLocation::Http(url),
            ReloadPolicy::OnChange,
            Duration::ZERO,
            reqwest::Client::new(),
        ));

        let started = Instant::now();
        let calls: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                tokio::spawn(async move { catalog.current().await })
            })
            .collect();
        for call in futures::future::join_all(calls).await {
            assert_eq!(call.unwrap().unwrap().len(), 1);
        }

        let elapsed = started.elapsed();
        assert!(elapsed < delay * 3, "fetches ran one at a time: {elapsed:?}");
        assert_eq!(served.hits.load(Ordering::SeqCst), 4);

        let _ = shutdown.send(());
    }
}
