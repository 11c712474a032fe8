//! Dictionary store: spelling code → ordered candidate characters/words.
//!
//! The shipped dictionary is an FST key index plus a bincode payload vector,
//! both read-only. The bundled artifacts are copied into a writable working
//! directory before opening so the original assets are never touched. Until
//! loading completes (or if it fails) every lookup returns an empty list;
//! the store never surfaces an error to the interactive path.
//!
//! A small in-memory overlay accepts dynamic entries, which is also what the
//! flat-record and JSON importers feed.

use ahash::AHashMap;
use anyhow::{Context as _, Result};
use fst::Map;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::records;

/// Staged copy names inside the working directory.
const STAGED_FST: &str = "boshiamy.fst";
const STAGED_PAYLOAD: &str = "boshiamy.dict";

/// Spelling keys are matched case-insensitively: normalized (NFC, trimmed)
/// and folded to lowercase on both insert and lookup. Compiled key indexes
/// must therefore store lowercase keys.
fn fold_key(s: &str) -> String {
    crate::utils::normalize(s).to_lowercase()
}

/// One payload entry of the compiled dictionary.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DictEntry {
    pub text: String,
    pub weight: u32,
}

/// Loaded read-only artifacts: key index plus payload vector.
struct Artifacts {
    keys: Map<Vec<u8>>,
    payloads: Vec<Vec<DictEntry>>,
}

/// Spelling → candidates lookup store.
///
/// Cloning is cheap; clones share the underlying data, which is what lets the
/// loader run on a background thread while the input path keeps querying.
#[derive(Clone)]
pub struct DictionaryStore {
    artifacts: Arc<RwLock<Option<Artifacts>>>,
    overlay: Arc<RwLock<AHashMap<String, Vec<String>>>>,
    cache: Arc<Mutex<LruCache<String, Vec<String>>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl DictionaryStore {
    /// Create an empty store with the given lookup-cache capacity.
    pub fn new(cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            artifacts: Arc::new(RwLock::new(None)),
            overlay: Arc::new(RwLock::new(AHashMap::new())),
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether the compiled artifacts finished loading.
    pub fn is_ready(&self) -> bool {
        self.artifacts.read().map(|a| a.is_some()).unwrap_or(false)
    }

    /// Insert a dynamic mapping from spelling to candidate. Keys are
    /// case-insensitive.
    pub fn insert<K: Into<String>, V: Into<String>>(&self, key: K, candidate: V) {
        let key = fold_key(&key.into());
        if let Ok(mut overlay) = self.overlay.write() {
            overlay.entry(key.clone()).or_default().push(candidate.into());
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&key);
        }
    }

    /// Exact-match lookup. Returns candidates in the store's native order, or
    /// an empty list when the spelling is unknown or the store is not ready.
    pub fn lookup(&self, spelling: &str) -> Vec<String> {
        let key = fold_key(spelling);
        if key.is_empty() {
            return Vec::new();
        }

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return hit.clone();
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let (result, cacheable) = self.lookup_uncached(&key);
        trace!(
            key = %key,
            candidates = result.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "dictionary lookup"
        );

        // Negative results while the store is still loading must not stick.
        if cacheable {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, result.clone());
            }
        }
        result
    }

    fn lookup_uncached(&self, key: &str) -> (Vec<String>, bool) {
        if let Ok(overlay) = self.overlay.read() {
            if let Some(v) = overlay.get(key) {
                return (v.clone(), true);
            }
        }

        match self.artifacts.read() {
            Ok(guard) => match guard.as_ref() {
                Some(artifacts) => {
                    if let Some(idx) = artifacts.keys.get(key) {
                        if let Some(entries) = artifacts.payloads.get(idx as usize) {
                            return (entries.iter().map(|e| e.text.clone()).collect(), true);
                        }
                    }
                    (Vec::new(), true)
                }
                None => {
                    debug!(key = %key, "dictionary not ready, returning empty");
                    (Vec::new(), false)
                }
            },
            Err(_) => (Vec::new(), false),
        }
    }

    /// Cache statistics as a (hits, misses) tuple.
    pub fn cache_stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Load compiled artifacts directly from the given paths.
    pub fn load_artifacts<P: AsRef<Path>>(&self, fst_path: P, payload_path: P) -> Result<()> {
        let fst_path = fst_path.as_ref();
        let payload_path = payload_path.as_ref();

        let mut buf = Vec::new();
        File::open(fst_path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("open dictionary index {}", fst_path.display()))?;
        let keys = Map::new(buf).context("parse dictionary index")?;

        let mut buf = Vec::new();
        File::open(payload_path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("open dictionary payload {}", payload_path.display()))?;
        let payloads: Vec<Vec<DictEntry>> =
            bincode::deserialize(&buf).context("decode dictionary payload")?;

        if let Ok(mut slot) = self.artifacts.write() {
            *slot = Some(Artifacts { keys, payloads });
        }
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        Ok(())
    }

    /// Copy the bundled artifacts into `work_dir` and open the copies, so the
    /// originals are never mutated.
    pub fn open_bundled(
        &self,
        fst_src: &Path,
        payload_src: &Path,
        work_dir: &Path,
    ) -> Result<()> {
        fs::create_dir_all(work_dir)
            .with_context(|| format!("create working dir {}", work_dir.display()))?;
        let fst_dst = work_dir.join(STAGED_FST);
        let payload_dst = work_dir.join(STAGED_PAYLOAD);
        fs::copy(fst_src, &fst_dst)
            .with_context(|| format!("stage dictionary index from {}", fst_src.display()))?;
        fs::copy(payload_src, &payload_dst).with_context(|| {
            format!("stage dictionary payload from {}", payload_src.display())
        })?;
        self.load_artifacts(&fst_dst, &payload_dst)
    }

    /// Stage and open the bundled artifacts on a background thread.
    ///
    /// Failure is non-fatal: the store simply stays empty and lookups keep
    /// returning empty lists.
    pub fn load_in_background(&self, fst_src: PathBuf, payload_src: PathBuf, work_dir: PathBuf) {
        let store = self.clone();
        let spawned = std::thread::Builder::new()
            .name("boshiamy-dict".into())
            .spawn(move || {
                if let Err(e) = store.open_bundled(&fst_src, &payload_src, &work_dir) {
                    warn!("dictionary load failed, lookups degrade to empty: {e:#}");
                }
            });
        if let Err(e) = spawned {
            warn!("could not spawn dictionary loader: {e}");
        }
    }

    /// Import a flat `id, spelling, candidate` record table into the overlay.
    /// Returns the number of records loaded.
    pub fn load_delimited<R: BufRead>(&self, reader: R) -> std::io::Result<usize> {
        let entries = records::read_records(reader)?;
        let n = entries.len();
        for (key, value) in entries {
            self.insert(key, value);
        }
        Ok(n)
    }

    /// Import a JSON dictionary (`spelling → [candidates]`).
    pub fn load_json<R: Read>(&self, reader: R) -> Result<usize> {
        let table: HashMap<String, Vec<String>> =
            serde_json::from_reader(reader).context("decode JSON dictionary")?;
        let mut n = 0;
        for (key, values) in table {
            for value in values {
                self.insert(key.clone(), value);
                n += 1;
            }
        }
        Ok(n)
    }
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_returns_empty() {
        let store = DictionaryStore::new(16);
        assert!(!store.is_ready());
        assert!(store.lookup("abc").is_empty());
        assert!(store.lookup("").is_empty());
    }

    #[test]
    fn overlay_lookup_preserves_insertion_order() {
        let store = DictionaryStore::new(16);
        store.insert("ab", "一");
        store.insert("ab", "二");
        assert_eq!(store.lookup("ab"), vec!["一", "二"]);
        assert!(store.lookup("abc").is_empty());
    }

    #[test]
    fn lookup_normalizes_key() {
        let store = DictionaryStore::new(16);
        store.insert("ni", "你");
        assert_eq!(store.lookup("  ni "), vec!["你"]);
    }

    #[test]
    fn keys_fold_case_on_insert_and_lookup() {
        let store = DictionaryStore::new(16);
        // Bundled tables may carry uppercase key legends.
        store.insert("AB", "火");
        assert_eq!(store.lookup("ab"), vec!["火"]);
        assert_eq!(store.lookup("AB"), vec!["火"]);
    }

    #[test]
    fn zero_cache_capacity_falls_back_to_minimum() {
        let store = DictionaryStore::new(0);
        store.insert("ab", "字");
        assert_eq!(store.lookup("ab"), vec!["字"]);
        assert_eq!(store.lookup("ab"), vec!["字"]);
    }

    #[test]
    fn cache_counts_hits_after_repeat_lookup() {
        let store = DictionaryStore::new(16);
        store.insert("ab", "字");
        store.lookup("ab");
        store.lookup("ab");
        let (hits, misses) = store.cache_stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
    }

    #[test]
    fn load_delimited_records() {
        let store = DictionaryStore::new(16);
        let data = "1\tab\t甲\n2\tab\t乙\n3\tcd\t丙\n";
        let n = store.load_delimited(data.as_bytes()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(store.lookup("ab"), vec!["甲", "乙"]);
        assert_eq!(store.lookup("cd"), vec!["丙"]);
    }

    #[test]
    fn load_json_dictionary() {
        let store = DictionaryStore::new(16);
        let data = r#"{"ni": ["你", "妳"], "hao": ["好"]}"#;
        let n = store.load_json(data.as_bytes()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(store.lookup("ni"), vec!["你", "妳"]);
    }
}
