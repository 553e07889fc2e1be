use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub url: String,
    pub locale: Option<String>,
    pub headers: FxHashMap<String, String>,
}

/// Per-render state handed to every component of one render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    request: Arc<RequestInfo>,
    store: Arc<Mutex<FxHashMap<String, JsonValue>>>,
}

impl RenderContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_request(RequestInfo { url: url.into(), ..Default::default() })
    }

    pub fn from_request(request: RequestInfo) -> Self {
        Self { request: Arc::new(request), store: Arc::new(Mutex::new(FxHashMap::default())) }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn url(&self) -> &str {
        &self.request.url
    }

    pub fn locale(&self) -> Option<&str> {
        self.request.locale.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.store.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.store.lock().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<JsonValue> {
        self.store.lock().remove(key)
    }
}
