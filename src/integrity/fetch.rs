//! Sources of the live bytes behind tracked resource paths.
//!
//! Paths in a manifest are URL-style (`/assets/index.js`). A fetcher maps
//! them onto wherever the cached application actually lives: a directory
//! on disk, or (with the `http-fetch` feature) an HTTP origin.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::errors::{Result, TrustVaultError};

/// Anything that can return the current bytes of a tracked resource.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

fn fetch_error(path: &str, reason: impl std::fmt::Display) -> TrustVaultError {
    TrustVaultError::FetchError {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// DirFetcher
// ---------------------------------------------------------------------------

/// Serves resource paths from a directory, like a static file server.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map `/a/b.js` to `<root>/a/b.js`, refusing anything that could
    /// climb out of the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return Err(fetch_error(path, "empty resource path"));
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(fetch_error(path, "path escapes the resource root"));
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceFetcher for DirFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        std::fs::read(&full).map_err(|e| fetch_error(path, e))
    }
}

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

/// In-memory resources, for embedders that already hold the bytes.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    resources: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the bytes served for `path`.
    pub fn put(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut map) = self.resources.lock() {
            map.insert(path.to_string(), bytes.into());
        }
    }

    /// Make `path` unreachable.
    pub fn remove(&self, path: &str) {
        if let Ok(mut map) = self.resources.lock() {
            map.remove(path);
        }
    }
}

impl ResourceFetcher for StaticFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let map = self
            .resources
            .lock()
            .map_err(|_| fetch_error(path, "resource table lock poisoned"))?;
        map.get(path)
            .cloned()
            .ok_or_else(|| fetch_error(path, "not found"))
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Fetches resources from an HTTP origin. Every call is a fresh
/// `no-cache` GET.
#[cfg(feature = "http-fetch")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
}

#[cfg(feature = "http-fetch")]
impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "http-fetch")]
impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut response = ureq::get(&url)
            .header("Cache-Control", "no-cache")
            .header(
                "User-Agent",
                &format!("trustvault/{}", env!("CARGO_PKG_VERSION")),
            )
            .call()
            .map_err(|e| fetch_error(path, e))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| fetch_error(path, e))
    }
}
