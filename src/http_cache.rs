use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const CACHE_VERSION: u32 = 2;
const CACHE_DIR: &str = "pitchlens";
const CACHE_SUBDIR: &str = "http";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    url: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
    body: String,
}

/// Conditional-request disk cache. Each URL gets one entry file, holding the
/// body and its validators, named by the SHA-256 of the URL.
#[derive(Debug, Clone)]
pub struct HttpCache {
    dir: Option<PathBuf>,
}

impl Default for HttpCache {
    fn default() -> Self {
        Self { dir: default_dir() }
    }
}

impl HttpCache {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Every request goes to the network.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn fetch(&self, client: &Client, url: &str) -> Result<String> {
        let cached = self.load(url);

        let mut req = client.get(url);
        if let Some(entry) = cached.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = match req.send() {
            Ok(resp) => resp,
            Err(err) => {
                if let Some(entry) = cached {
                    warn!("request for {url} failed ({err}); serving cached copy");
                    return Ok(entry.body);
                }
                return Err(err).context("request failed");
            }
        };
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            if let Some(mut entry) = cached {
                debug!("not modified: {url}");
                entry.fetched_at = now_secs();
                self.store(&entry);
                return Ok(entry.body);
            }
            return Err(anyhow::anyhow!("received 304 without cache body"));
        }

        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {status} for {url}"));
        }

        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let entry = CacheEntry {
            version: CACHE_VERSION,
            url: url.to_string(),
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
            fetched_at: now_secs(),
            body,
        };
        self.store(&entry);
        Ok(entry.body)
    }

    fn path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        Some(dir.join(format!("{}.json", cache_key(url))))
    }

    fn load(&self, url: &str) -> Option<CacheEntry> {
        let raw = fs::read_to_string(self.path(url)?).ok()?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;
        if entry.version != CACHE_VERSION || entry.url != url {
            return None;
        }
        Some(entry)
    }

    fn store(&self, entry: &CacheEntry) {
        let Some(path) = self.path(&entry.url) else {
            return;
        };
        if let Err(err) = write_entry(&path, entry) {
            warn!("could not write http cache entry: {err:#}");
        }
    }
}

fn write_entry(path: &Path, entry: &CacheEntry) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create http cache dir")?;
    }
    let json = serde_json::to_string(entry).context("serialize http cache entry")?;
    // Unique per writer so concurrent fetches of one URL never share a tmp file.
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
    fs::write(&tmp, json).context("write http cache entry")?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err).context("swap http cache entry");
    }
    Ok(())
}

/// Hex SHA-256 of the URL.
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn default_dir() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_SUBDIR))
}

/// `$XDG_CACHE_HOME/pitchlens`, else `~/.cache/pitchlens`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_hex() {
        let a = cache_key("https://example.org/events/1.json");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, cache_key("https://example.org/events/1.json"));
        assert_ne!(a, cache_key("https://example.org/events/2.json"));
    }

    fn entry(url: &str, etag: &str, body: &str) -> CacheEntry {
        CacheEntry {
            version: CACHE_VERSION,
            url: url.to_string(),
            etag: Some(etag.to_string()),
            last_modified: None,
            fetched_at: 1,
            body: body.to_string(),
        }
    }

    #[test]
    fn stored_entry_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(dir.path());
        cache.store(&entry("https://example.org/x", "\"abc\"", "[1,2]"));
        let loaded = cache.load("https://example.org/x").unwrap();
        assert_eq!(loaded.body, "[1,2]");
        assert_eq!(loaded.etag.as_deref(), Some("\"abc\""));
        assert!(cache.load("https://example.org/y").is_none());
        assert!(HttpCache::disabled().load("https://example.org/x").is_none());
    }

    #[test]
    fn concurrent_stores_leave_one_consistent_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HttpCache::at(dir.path());
        let url = "https://example.org/events/9.json";
        std::thread::scope(|s| {
            for i in 0..8 {
                let cache = &cache;
                s.spawn(move || {
                    for _ in 0..20 {
                        cache.store(&entry(url, &format!("v{i}"), &format!("[{i}]")));
                    }
                });
            }
        });

        // Body and validator always come from the same write.
        let loaded = cache.load(url).unwrap();
        let i = loaded.etag.as_deref().unwrap().trim_start_matches('v');
        assert_eq!(loaded.body, format!("[{i}]"));
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
