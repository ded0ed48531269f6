use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::error::ProbeError;

const MB: f64 = 1024.0 * 1024.0;

/// Resolves the size of a remote file, HTTP HEAD-equivalent.
pub trait SizeProbe {
    fn probe_mb(&self, url: &str) -> Result<f64, ProbeError>;
}

/// Cache of previously probed sizes keyed by URL/path, so re-runs do not
/// re-query the remote host for every file. Single-threaded access today;
/// the moka cache already tolerates concurrent readers if that changes.
pub struct SizeCache {
    inner: Cache<String, f64>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::new(10_000),
        }
    }

    pub fn get(&self, url: &str) -> Option<f64> {
        self.inner.get(url)
    }

    pub fn put(&self, url: &str, size_mb: f64) {
        self.inner.insert(url.to_string(), size_mb);
    }
}

impl Default for SizeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// HEAD-based probe reading the Content-Length header.
pub struct HttpSizeProbe {
    client: reqwest::blocking::Client,
}

impl HttpSizeProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProbeError::Request {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl SizeProbe for HttpSizeProbe {
    fn probe_mb(&self, url: &str) -> Result<f64, ProbeError> {
        let response = self
            .client
            .head(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProbeError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let bytes = response
            .content_length()
            .ok_or_else(|| ProbeError::MissingContentLength {
                url: url.to_string(),
            })?;

        let size_mb = bytes as f64 / MB;
        debug!(url, size_mb, "Probed remote file size");
        Ok(size_mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_roundtrip() {
        let cache = SizeCache::new();
        assert_eq!(cache.get("http://x/a.zip"), None);
        cache.put("http://x/a.zip", 12.5);
        assert_eq!(cache.get("http://x/a.zip"), Some(12.5));
    }
}
