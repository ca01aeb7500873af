use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rmcp::model::CallToolResult;
use swcache_client::{EngineConfig, Fetcher, InterceptionEngine};
use swcache_core::{AppConfig, CacheDb, Error, RequestDescriptor, Response, Store};

pub const ORIGIN: &str = "https://portfolio.example";

pub struct StubFetcher {
    routes: HashMap<String, (u16, &'static str)>,
    online: AtomicBool,
}

impl StubFetcher {
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::NetworkFailure(format!("{}: offline", request.url())));
        }
        let (status, body) = self.routes.get(request.url().as_str()).copied().unwrap_or((404, "not found"));
        Ok(Response::new(status, body))
    }
}

pub struct Harness {
    pub engine: Arc<InterceptionEngine>,
    pub db: Arc<CacheDb>,
    pub net: Arc<StubFetcher>,
}

pub async fn harness(version: &str) -> Harness {
    harness_with(CacheDb::open_in_memory().await.unwrap(), version).await
}

pub async fn harness_with(db: CacheDb, version: &str) -> Harness {
    let app = AppConfig {
        origin: ORIGIN.into(),
        cache_version: version.into(),
        app_shell: vec!["/index.html".into(), "/assets/icon-192x192.png".into()],
        ..Default::default()
    };
    let routes = [
        (format!("{ORIGIN}/index.html"), (200, "<html>shell</html>")),
        (format!("{ORIGIN}/assets/icon-192x192.png"), (200, "icon")),
        (format!("{ORIGIN}/style.css"), (200, "body{}")),
        (format!("{ORIGIN}/api/projects"), (200, "[]")),
    ]
    .into_iter()
    .collect();
    let net = Arc::new(StubFetcher { routes, online: AtomicBool::new(true) });
    let db = Arc::new(db);
    let store: Arc<dyn Store> = db.clone();

    let config = EngineConfig::from_app_config(&app).unwrap();
    let engine = Arc::new(InterceptionEngine::new(config, store, net.clone()).unwrap());
    Harness { engine, db, net }
}

/// Parse the JSON text content of a tool result.
pub fn output(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
