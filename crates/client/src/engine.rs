//! The interception engine: one entry point per lifecycle or request event.
//!
//! ### Events
//! - [`InterceptionEngine::install`]: open the current generation and store the app shell
//! - [`InterceptionEngine::activate`]: delete stale generations, claim clients
//! - [`InterceptionEngine::fetch`]: classify a request and run its strategy
//! - [`InterceptionEngine::push`] / [`InterceptionEngine::notification_click`]
//! - [`InterceptionEngine::sync`]
//!
//! Requests are declined until activation has completed, leaving them to
//! the host's default network handling.

use std::sync::Arc;

use swcache_core::{AppConfig, Error, RequestDescriptor, RequestKey, Store};
use url::Url;

use crate::classify::{Classifier, ClassifierConfig, PolicyTag};
use crate::fetch::{Fetcher, resolve};
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, Transition, WorkerState};
use crate::maintainer::StoreMaintainer;
use crate::notify::{ClientAction, Notification, NotificationAction, NotificationDefaults, parse_push_payload};
use crate::strategy::{Served, StrategySelector};

/// Resolved engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub generation: String,
    pub origin: Url,
    /// Absolute URLs stored at install, in order.
    pub app_shell: Vec<Url>,
    pub shell_document: Url,
    pub image_placeholder: Option<Url>,
    pub classifier: ClassifierConfig,
    pub max_entry_bytes: usize,
    pub refresh_on_navigation: bool,
    pub notifications: NotificationDefaults,
}

impl EngineConfig {
    /// Resolve every configured path against the serving origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let classifier = ClassifierConfig::from_app_config(config)?;
        let origin = classifier.origin.clone();
        let resolve_path = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let app_shell = config.app_shell.iter().map(|p| resolve_path(p)).collect::<Result<Vec<_>, _>>()?;
        let shell_document = resolve_path(&config.shell_document)?;
        let image_placeholder = config.image_placeholder.as_deref().map(resolve_path).transpose()?;

        Ok(Self {
            generation: config.generation_name(),
            app_shell,
            shell_document,
            image_placeholder,
            max_entry_bytes: config.max_entry_bytes,
            refresh_on_navigation: config.refresh_on_navigation,
            notifications: NotificationDefaults {
                title: config.notification_title.clone(),
                icon: config.notification_icon.clone(),
                origin: origin.clone(),
            },
            origin,
            classifier,
        })
    }
}

/// Result of a fetch event.
#[derive(Debug)]
pub enum Interception {
    /// The engine answered the request.
    Respond(Served),
    /// Not handled; the host performs its default fetch.
    Declined,
}

impl Interception {
    pub fn into_served(self) -> Option<Served> {
        match self {
            Interception::Respond(served) => Some(served),
            Interception::Declined => None,
        }
    }
}

pub struct InterceptionEngine {
    config: EngineConfig,
    classifier: Classifier,
    fetcher: Arc<dyn Fetcher>,
    maintainer: Arc<StoreMaintainer>,
    strategies: StrategySelector,
    lifecycle: Lifecycle,
}

impl InterceptionEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn Store>, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let classifier = Classifier::new(config.classifier.clone())?;
        let maintainer = Arc::new(StoreMaintainer::new(store, config.generation.clone(), config.max_entry_bytes));
        let strategies = StrategySelector::new(
            Arc::clone(&fetcher),
            Arc::clone(&maintainer),
            RequestKey::new("GET", &config.shell_document),
            config.image_placeholder.as_ref().map(|url| RequestKey::new("GET", url)),
            config.refresh_on_navigation,
        );

        Ok(Self { config, classifier, fetcher, maintainer, strategies, lifecycle: Lifecycle::new() })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name of the generation this engine serves.
    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn clients_claimed(&self) -> bool {
        self.lifecycle.clients_claimed()
    }

    /// Open the current generation and store the app shell.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if the worker is already activating or active
    /// - `Error::InstallFailed` if any shell resource cannot be fetched or
    ///   stored; the worker returns to `uninstalled` and a generation created
    ///   by this call is removed
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _guard = self.lifecycle.begin(Transition::Install).await?;
        self.lifecycle.set(WorkerState::Installing);
        tracing::info!(generation = %self.config.generation, "installing");

        match self.populate_shell().await {
            Ok(created) => {
                self.lifecycle.skip_waiting();
                self.lifecycle.set(WorkerState::Installed);
                Ok(InstallReport {
                    generation: self.config.generation.clone(),
                    cached: self.config.app_shell.iter().map(Url::to_string).collect(),
                    created,
                    skip_waiting: self.lifecycle.is_skip_waiting(),
                })
            }
            Err(e) => {
                tracing::error!(generation = %self.config.generation, error = %e, "install failed");
                self.lifecycle.set(WorkerState::Uninstalled);
                Err(e)
            }
        }
    }

    async fn populate_shell(&self) -> Result<bool, Error> {
        let generation = self.maintainer.generation();
        let created = self
            .maintainer
            .open_generation()
            .await
            .map_err(|e| Error::InstallFailed(format!("opening {generation}: {e}")))?;

        if let Err(e) = self.maintainer.populate(self.fetcher.as_ref(), &self.config.app_shell).await {
            if created && let Err(cleanup) = self.maintainer.delete(generation).await {
                tracing::warn!(generation, error = %cleanup, "could not remove partial generation");
            }
            return Err(e);
        }
        Ok(created)
    }

    /// Delete every generation but the current one, then claim clients.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` unless the worker is `installed`
    /// - store errors while pruning; the worker stays `installed`
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _guard = self.lifecycle.begin(Transition::Activate).await?;
        self.lifecycle.set(WorkerState::Activating);
        tracing::info!(generation = %self.config.generation, "activating");

        match self.maintainer.prune().await {
            Ok(purged) => {
                self.lifecycle.claim_clients();
                self.lifecycle.set(WorkerState::Activated);
                Ok(ActivateReport {
                    generation: self.config.generation.clone(),
                    purged,
                    clients_claimed: self.lifecycle.clients_claimed(),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "activate failed");
                self.lifecycle.set(WorkerState::Installed);
                Err(e)
            }
        }
    }

    pub fn classify(&self, request: &RequestDescriptor) -> PolicyTag {
        self.classifier.classify(request)
    }

    /// Handle a fetch event.
    ///
    /// # Errors
    ///
    /// Network errors for `bypass` requests, and for `api` requests with no
    /// stored snapshot.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<Interception, Error> {
        if !self.lifecycle.is_active() {
            tracing::debug!(url = %request.url(), state = %self.state(), "declining fetch before activation");
            return Ok(Interception::Declined);
        }

        let tag = self.classify(request);
        let served = self.strategies.execute(tag, request).await?;
        tracing::debug!(
            method = request.method(),
            url = %request.url(),
            policy = %tag,
            source = ?served.source,
            status = served.response.status(),
            "served"
        );
        Ok(Interception::Respond(served))
    }

    /// Handle a push event. Malformed payloads are logged and dropped.
    pub fn push(&self, data: Option<&[u8]>) -> Option<Notification> {
        match parse_push_payload(data) {
            Ok(payload) => Some(Notification::from_payload(payload, &self.config.notifications)),
            Err(e) => {
                tracing::warn!(error = %e, "push event produced no notification");
                None
            }
        }
    }

    /// Handle a notification click.
    pub fn notification_click(&self, action: &str, url: Option<&str>) -> ClientAction {
        match NotificationAction::from_action(action) {
            Some(NotificationAction::Open) => {
                let target = url
                    .and_then(|raw| resolve(&self.config.origin, raw).ok())
                    .unwrap_or_else(|| self.config.origin.clone());
                ClientAction::OpenWindow { url: target.to_string() }
            }
            Some(NotificationAction::Close) => ClientAction::None,
            None => {
                tracing::warn!(action, "unknown notification action");
                ClientAction::None
            }
        }
    }

    /// Handle a background sync event.
    pub fn sync(&self, tag: &str) {
        tracing::info!(tag, "background sync");
    }

    /// Wait for pending write-backs.
    pub async fn flush(&self) {
        self.maintainer.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ResponseSource;
    use crate::testing::{CountingStore, FakeNetwork};
    use swcache_core::{Destination, RequestMode, Response};

    const ORIGIN: &str = "https://portfolio.example";

    fn app_config(version: &str) -> AppConfig {
        AppConfig {
            origin: ORIGIN.into(),
            cache_version: version.into(),
            app_shell: vec!["/".into(), "/index.html".into(), "/assets/icon-192x192.png".into()],
            ..Default::default()
        }
    }

    fn network() -> FakeNetwork {
        FakeNetwork::new()
            .route(&format!("{ORIGIN}/"), Response::new(200, "root"))
            .route(&format!("{ORIGIN}/index.html"), Response::new(200, "<html>shell</html>"))
            .route(&format!("{ORIGIN}/assets/icon-192x192.png"), Response::new(200, "icon"))
            .route(&format!("{ORIGIN}/style.css"), Response::new(200, "body{}").with_header("Content-Type", "text/css"))
            .route(&format!("{ORIGIN}/api/projects"), Response::new(500, "boom"))
            .route("https://dl.dropboxusercontent.com/video.mp4", Response::new(200, "video bytes"))
    }

    fn engine(version: &str, store: &Arc<CountingStore>, net: &Arc<FakeNetwork>) -> InterceptionEngine {
        let config = EngineConfig::from_app_config(&app_config(version)).unwrap();
        InterceptionEngine::new(config, store.clone(), net.clone()).unwrap()
    }

    async fn activated(version: &str, store: &Arc<CountingStore>, net: &Arc<FakeNetwork>) -> InterceptionEngine {
        let engine = engine(version, store, net);
        engine.install().await.unwrap();
        engine.activate().await.unwrap();
        engine
    }

    fn get(path: &str) -> RequestDescriptor {
        RequestDescriptor::parse("GET", &format!("{ORIGIN}{path}")).unwrap()
    }

    async fn serve(engine: &InterceptionEngine, request: &RequestDescriptor) -> Served {
        engine.fetch(request).await.unwrap().into_served().expect("request was declined")
    }

    #[test]
    fn test_engine_config_resolves_paths() {
        let config = EngineConfig::from_app_config(&app_config("v5")).unwrap();
        assert_eq!(config.generation, "site-v5");
        assert_eq!(config.shell_document.as_str(), "https://portfolio.example/index.html");
        assert_eq!(config.app_shell[0].as_str(), "https://portfolio.example/");
        assert_eq!(
            config.image_placeholder.map(|u| u.to_string()).as_deref(),
            Some("https://portfolio.example/assets/icon-192x192.png")
        );
    }

    #[tokio::test]
    async fn test_install_then_activate_leaves_one_generation() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        store.db.open_generation("site-v4").await.unwrap();
        store.db.open_generation("unrelated").await.unwrap();

        let engine = engine("v5", &store, &net);
        let report = engine.install().await.unwrap();
        assert!(report.created);
        assert!(report.skip_waiting);
        assert_eq!(report.cached.len(), 3);
        assert_eq!(engine.state(), WorkerState::Installed);

        let report = engine.activate().await.unwrap();
        assert_eq!(engine.state(), WorkerState::Activated);
        assert!(report.clients_claimed);
        assert_eq!(report.purged.len(), 2);
        assert_eq!(store.db.generation_names().await.unwrap(), vec!["site-v5".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_generation() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(FakeNetwork::new().route(&format!("{ORIGIN}/index.html"), Response::new(200, "shell")));

        let engine = engine("v5", &store, &net);
        let err = engine.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(_)));
        assert_eq!(engine.state(), WorkerState::Uninstalled);
        assert!(store.db.generation_names().await.unwrap().is_empty());

        let err = engine.activate().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { event: "activate", .. }));
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_generation_serving() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let v4 = activated("v4", &store, &net).await;

        net.set_online(false);
        let v5 = engine("v5", &store, &net);
        assert!(v5.install().await.is_err());
        assert_eq!(store.db.generation_names().await.unwrap(), vec!["site-v4".to_string()]);

        let served = serve(&v4, &get("/index.html").with_mode(RequestMode::Navigate)).await;
        assert_eq!(served.response.status(), 200);
    }

    #[tokio::test]
    async fn test_late_write_back_does_not_revive_old_generation() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let v4 = activated("v4", &store, &net).await;
        let v5 = activated("v5", &store, &net).await;
        assert_eq!(store.db.generation_names().await.unwrap(), vec!["site-v5".to_string()]);

        let served = serve(&v4, &get("/style.css")).await;
        assert_eq!(served.source, ResponseSource::Network);
        v4.flush().await;
        assert_eq!(store.db.generation_names().await.unwrap(), vec!["site-v5".to_string()]);

        net.set_online(false);
        let served = serve(&v5, &get("/style.css")).await;
        assert_eq!(served.source, ResponseSource::Offline);
        assert_eq!(served.response.status(), 503);
    }

    #[tokio::test]
    async fn test_fetch_declined_until_activated() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = engine("v5", &store, &net);

        assert!(matches!(engine.fetch(&get("/style.css")).await.unwrap(), Interception::Declined));
        engine.install().await.unwrap();
        assert!(matches!(engine.fetch(&get("/style.css")).await.unwrap(), Interception::Declined));
        engine.activate().await.unwrap();
        assert!(matches!(engine.fetch(&get("/style.css")).await.unwrap(), Interception::Respond(_)));
    }

    #[tokio::test]
    async fn test_install_rejected_after_activation() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;
        assert!(matches!(engine.install().await, Err(Error::InvalidState { event: "install", .. })));
    }

    #[tokio::test]
    async fn test_excluded_media_never_touches_store() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;
        let before = store.accesses();

        let request = RequestDescriptor::parse("GET", "https://dl.dropboxusercontent.com/video.mp4").unwrap();
        assert_eq!(engine.classify(&request), PolicyTag::Bypass);
        let served = serve(&engine, &request).await;
        engine.flush().await;

        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.body().as_ref(), b"video bytes");
        assert_eq!(store.accesses(), before);
    }

    #[tokio::test]
    async fn test_new_deployment_invalidates_old_snapshots() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let v1 = activated("v1", &store, &net).await;
        serve(&v1, &get("/style.css")).await;
        v1.flush().await;

        let key = get("/style.css").key();
        assert_eq!(store.db.entry_meta(&key).await.unwrap().len(), 1);

        activated("v2", &store, &net).await;
        assert!(store.db.entry_meta(&key).await.unwrap().is_empty());
        assert_eq!(store.db.generation_names().await.unwrap(), vec!["site-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_static_served_from_store_when_offline() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;

        let first = serve(&engine, &get("/style.css")).await;
        assert_eq!(first.source, ResponseSource::Network);
        engine.flush().await;

        net.set_online(false);
        let second = serve(&engine, &get("/style.css")).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body().as_ref(), b"body{}");
        assert_eq!(second.response.content_type(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_shell() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;
        net.set_online(false);

        let request = get("/projects/42").with_mode(RequestMode::Navigate);
        let served = serve(&engine, &request).await;
        assert_eq!(served.policy, PolicyTag::Navigation);
        assert_eq!(served.source, ResponseSource::Shell);
        assert_eq!(served.response.status(), 200);
        assert_eq!(served.response.body().as_ref(), b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_api_error_status_not_stored() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;

        let served = serve(&engine, &get("/api/projects")).await;
        assert_eq!(served.policy, PolicyTag::Api);
        assert_eq!(served.response.status(), 500);
        engine.flush().await;
        assert!(store.db.entry_meta(&get("/api/projects").key()).await.unwrap().is_empty());

        net.set_online(false);
        let err = engine.fetch(&get("/api/projects")).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_cache_miss_is_fetched_and_written_to_current() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = activated("v5", &store, &net).await;

        let served = serve(&engine, &get("/style.css").with_destination(Destination::Style)).await;
        assert_eq!(served.response.status(), 200);
        engine.flush().await;

        let meta = store.db.entry_meta(&get("/style.css").key()).await.unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].generation, "site-v5");
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let store = Arc::new(CountingStore::new().await);
        let net = Arc::new(network());
        let engine = engine("v5", &store, &net);

        assert!(engine.push(None).is_none());
        assert!(engine.push(Some(b"{not json")).is_none());

        let notification = engine.push(Some(br#"{"body":"New reel","url":"/reels/7"}"#)).unwrap();
        assert_eq!(notification.title, "New update");
        assert_eq!(notification.url, "https://portfolio.example/reels/7");

        assert_eq!(
            engine.notification_click("", Some(notification.url.as_str())),
            ClientAction::OpenWindow { url: "https://portfolio.example/reels/7".into() }
        );
        assert_eq!(engine.notification_click("close", Some(notification.url.as_str())), ClientAction::None);
        assert_eq!(
            engine.notification_click("open", None),
            ClientAction::OpenWindow { url: "https://portfolio.example/".into() }
        );
    }
}
