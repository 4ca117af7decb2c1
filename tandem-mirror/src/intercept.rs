//! Response interception: which responses to catch, how their bodies are
//! rewritten, and the content-addressed cache that serves the results.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use crate::script_format::ScriptFormatter;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tandem_common::TandemError;
use tandem_config::{InterceptConfig, TransformKind};
use tracing::{debug, warn};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum InterceptError {
    #[error("transform failed: {0}")]
    Transform(String),

    #[error("invalid base64 body: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry: {0}")]
    Json(#[from] serde_json::Error),
}

/// DevTools `Network.ResourceType` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Document,
    Stylesheet,
    Image,
    Media,
    Font,
    Script,
    TextTrack,
    Xhr,
    Fetch,
    EventSource,
    WebSocket,
    Manifest,
    Other,
}

impl ResourceKind {
    const ALL: [ResourceKind; 13] = [
        ResourceKind::Document,
        ResourceKind::Stylesheet,
        ResourceKind::Image,
        ResourceKind::Media,
        ResourceKind::Font,
        ResourceKind::Script,
        ResourceKind::TextTrack,
        ResourceKind::Xhr,
        ResourceKind::Fetch,
        ResourceKind::EventSource,
        ResourceKind::WebSocket,
        ResourceKind::Manifest,
        ResourceKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Document => "Document",
            ResourceKind::Stylesheet => "Stylesheet",
            ResourceKind::Image => "Image",
            ResourceKind::Media => "Media",
            ResourceKind::Font => "Font",
            ResourceKind::Script => "Script",
            ResourceKind::TextTrack => "TextTrack",
            ResourceKind::Xhr => "XHR",
            ResourceKind::Fetch => "Fetch",
            ResourceKind::EventSource => "EventSource",
            ResourceKind::WebSocket => "WebSocket",
            ResourceKind::Manifest => "Manifest",
            ResourceKind::Other => "Other",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = TandemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TandemError::Config(format!("unknown resource kind `{s}`")))
    }
}

/// A URL pattern (`*`/`?` wildcards) restricted to one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptPattern {
    pub url_pattern: String,
    pub kind: ResourceKind,
}

impl InterceptPattern {
    pub fn from_config(config: &InterceptConfig) -> Result<Vec<Self>, TandemError> {
        config
            .patterns
            .iter()
            .map(|p| {
                Ok(Self {
                    url_pattern: p.url_pattern.clone(),
                    kind: p.resource_kind.parse()?,
                })
            })
            .collect()
    }
}

/// Rewrites an intercepted body before the browser receives it.
pub trait ContentTransform: Send + Sync {
    fn transform(&self, body: &[u8], mime: &str) -> Result<Vec<u8>, InterceptError>;
}

/// Leaves bodies untouched.
pub struct Passthrough;

impl ContentTransform for Passthrough {
    fn transform(&self, body: &[u8], _mime: &str) -> Result<Vec<u8>, InterceptError> {
        Ok(body.to_vec())
    }
}

pub fn transform_for(kind: TransformKind) -> Arc<dyn ContentTransform> {
    match kind {
        TransformKind::Passthrough => Arc::new(Passthrough),
        TransformKind::Format => Arc::new(ScriptFormatter::default()),
    }
}

/// Original mime type plus the transformed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub mime: String,
    pub payload: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    mime: String,
    data: String,
}

/// Transformed resources keyed by raw content and indexed by resource path.
///
/// Entries are immutable; racing writers for the same content store equal
/// values, so the last write simply wins.
pub struct ContentCache {
    by_content: DashMap<String, Arc<CacheEntry>>,
    by_path: DashMap<String, Arc<CacheEntry>>,
    transform: Arc<dyn ContentTransform>,
    cache_dir: Option<PathBuf>,
}

impl ContentCache {
    pub fn new(transform: Arc<dyn ContentTransform>) -> Self {
        Self {
            by_content: DashMap::new(),
            by_path: DashMap::new(),
            transform,
            cache_dir: None,
        }
    }

    /// Also persist entries as JSON files under `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn content_key(raw: &[u8]) -> String {
        blake3::hash(raw).to_hex().to_string()
    }

    /// Return the entry for `raw`, transforming it on first sight. Only
    /// scripts are transformed; a failed transform caches the raw body.
    pub async fn resolve(&self, url: &str, kind: ResourceKind, mime: &str, raw: &[u8]) -> Arc<CacheEntry> {
        let key = Self::content_key(raw);
        let entry = match self.by_content.get(&key) {
            Some(hit) => {
                debug!(target: "mirror.intercept", %url, "content cache hit");
                hit.clone()
            }
            None => {
                let payload = if kind == ResourceKind::Script {
                    self.transform.transform(raw, mime).unwrap_or_else(|e| {
                        warn!(target: "mirror.intercept", %url, error = %e, "transform failed; serving original");
                        raw.to_vec()
                    })
                } else {
                    raw.to_vec()
                };
                let entry = Arc::new(CacheEntry {
                    mime: mime.to_string(),
                    payload,
                });
                self.by_content.insert(key, entry.clone());
                entry
            }
        };

        if let Some(path) = resource_path(url) {
            let indexed = self
                .by_path
                .get(&path)
                .is_some_and(|known| Arc::ptr_eq(known.value(), &entry));
            if indexed {
                return entry;
            }
            if let Err(e) = self.persist(&path, &entry).await {
                warn!(target: "mirror.intercept", %path, error = %e, "cache entry not persisted");
            }
            self.by_path.insert(path, entry.clone());
        }
        entry
    }

    /// Entry for a resource path (or full URL), from memory or disk.
    pub async fn lookup(&self, path_or_url: &str) -> Option<Arc<CacheEntry>> {
        let path = resource_path(path_or_url)?;
        let hit = self.by_path.get(&path).map(|entry| entry.value().clone());
        if hit.is_some() {
            return hit;
        }
        match self.load(&path).await {
            Ok(Some(entry)) => {
                let entry = Arc::new(entry);
                self.by_path.insert(path, entry.clone());
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(target: "mirror.intercept", %path, error = %e, "cache file unreadable");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_content.is_empty()
    }

    fn file_for(&self, path: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        Some(dir.join(format!("{}.json", blake3::hash(path.as_bytes()).to_hex())))
    }

    async fn persist(&self, path: &str, entry: &CacheEntry) -> Result<(), InterceptError> {
        let Some(file) = self.file_for(path) else {
            return Ok(());
        };
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let stored = StoredEntry {
            mime: entry.mime.clone(),
            data: BASE64.encode(&entry.payload),
        };
        tokio::fs::write(file, serde_json::to_vec(&stored)?).await?;
        Ok(())
    }

    async fn load(&self, path: &str) -> Result<Option<CacheEntry>, InterceptError> {
        let Some(file) = self.file_for(path) else {
            return Ok(None);
        };
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredEntry = serde_json::from_slice(&bytes)?;
        Ok(Some(CacheEntry {
            mime: stored.mime,
            payload: BASE64.decode(stored.data)?,
        }))
    }
}

/// Cache index key: path plus `?query`. Relative inputs must start with `/`.
pub fn resource_path(path_or_url: &str) -> Option<String> {
    if path_or_url.starts_with('/') {
        let without_fragment = path_or_url.split('#').next().unwrap_or_default();
        return Some(without_fragment.to_string());
    }
    let url = Url::parse(path_or_url).ok()?;
    Some(match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    })
}

/// Headers for a fulfilled response: exactly these three.
pub fn fulfill_headers(mime: &str, body_len: usize) -> Vec<(String, String)> {
    vec![
        ("Connection".into(), "close".into()),
        ("Content-Length".into(), body_len.to_string()),
        ("Content-Type".into(), mime.into()),
    ]
}

pub fn is_redirect(status: u16) -> bool {
    (300..400).contains(&status)
}

/// Mime type from a `Content-Type` header value, without parameters.
pub fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

/// Payload served by the content-fetch endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchBody {
    Text(String),
    Base64(String),
}

/// Text mimes go out verbatim, everything else as base64 text.
pub fn encode_for_fetch(entry: &CacheEntry) -> FetchBody {
    if essence(&entry.mime).starts_with("text/") {
        if let Ok(text) = std::str::from_utf8(&entry.payload) {
            return FetchBody::Text(text.to_string());
        }
    }
    FetchBody::Base64(BASE64.encode(&entry.payload))
}
