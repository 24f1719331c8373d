//! Disk-backed blob cache keyed by call parameters.
//!
//! Each cache is a directory; each [`CacheKey`] is one file inside it holding
//! the JSON-serialized value. Entries are written once after a successful
//! fetch and never expire. Removing them is done by hand on the filesystem.
//!
//! A missing, unreadable or corrupt file is a miss: [`BlobCache::lookup`]
//! returns `None` and logs a warning for anything other than "not found", so
//! the next successful fetch simply overwrites the bad entry.

use std::fmt;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// One primitive parameter of a cached call.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheParam {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for CacheParam {
    fn from(value: &str) -> Self {
        CacheParam::Str(value.to_string())
    }
}

impl From<String> for CacheParam {
    fn from(value: String) -> Self {
        CacheParam::Str(value)
    }
}

impl From<i64> for CacheParam {
    fn from(value: i64) -> Self {
        CacheParam::Int(value)
    }
}

impl From<f64> for CacheParam {
    fn from(value: f64) -> Self {
        CacheParam::Float(value)
    }
}

/// Deterministic identity of a cache entry; also its file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns an ordered parameter list into a [`CacheKey`].
///
/// Implementations must be pure: equal lists give equal keys, and different
/// lists (including reordered ones) give different keys. Keys must be valid
/// single path components.
pub trait KeyEncoding {
    fn encode(params: &[CacheParam]) -> CacheKey;
}

/// `api_` followed by the parameters joined with `_`.
///
/// String parameters are percent-escaped for `%`, `_`, `/` and `\` so that a
/// separator can never appear inside a parameter. A string that would read as
/// a number also has its first character escaped (`"3"` becomes `%33`), so
/// strings and numbers never encode alike. Numbers never contain `%`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiKeyEncoding;

impl KeyEncoding for ApiKeyEncoding {
    fn encode(params: &[CacheParam]) -> CacheKey {
        let mut name = String::from("api");
        for param in params {
            name.push('_');
            match param {
                CacheParam::Str(s) => {
                    let numeric = s.parse::<f64>().is_ok();
                    for (i, c) in s.chars().enumerate() {
                        match c {
                            '%' => name.push_str("%25"),
                            '_' => name.push_str("%5F"),
                            '/' => name.push_str("%2F"),
                            '\\' => name.push_str("%5C"),
                            // A numeric string starts with an ASCII character
                            _ if i == 0 && numeric => name.push_str(&format!("%{:02X}", c as u32)),
                            _ => name.push(c),
                        }
                    }
                }
                CacheParam::Int(i) => name.push_str(&i.to_string()),
                // Whole floats keep a fractional digit so they never read as integers
                CacheParam::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                    name.push_str(&format!("{:.1}", f))
                }
                CacheParam::Float(f) => name.push_str(&f.to_string()),
            }
        }
        CacheKey(name)
    }
}

/// Generic key to JSON value store on disk.
///
/// `V` is the cached value type, `E` the key encoding. Distinct keys never
/// share a file, so concurrent access to different keys is independent. Two
/// concurrent stores on the same key race and the last writer wins.
pub struct BlobCache<V, E = ApiKeyEncoding> {
    root: PathBuf,
    _marker: PhantomData<fn() -> (V, E)>,
}

impl<V, E> fmt::Debug for BlobCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobCache").field("root", &self.root).finish()
    }
}

impl<V, E> BlobCache<V, E>
where
    V: Serialize + DeserializeOwned,
    E: KeyEncoding,
{
    /// Open (and create if needed) the cache directory at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _marker: PhantomData,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Encode call parameters with this cache's key encoding.
    pub fn key(&self, params: &[CacheParam]) -> CacheKey {
        E::encode(params)
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Read the value stored under `key`, or `None` on a miss.
    pub async fn lookup(&self, key: &CacheKey) -> Option<V> {
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[BlobCache] miss {}", key);
                return None;
            }
            Err(e) => {
                warn!("[BlobCache] Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!("[BlobCache] hit {} ({} bytes)", key, bytes.len());
                Some(value)
            }
            Err(e) => {
                warn!("[BlobCache] Ignoring corrupt entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write `value` under `key`, creating the cache directory if it is gone.
    pub async fn store(&self, key: &CacheKey, value: &V) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(key), &bytes).await?;
        debug!("[BlobCache] stored {} ({} bytes)", key, bytes.len());
        Ok(())
    }
}
