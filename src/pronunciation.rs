//! Pronunciation index: character → pronunciations and pronunciation → homophones.
//!
//! Both directions are built once at session start from flat record tables and
//! are read-only afterwards. Entry order follows data-source order with a
//! first-seen-wins dedup, so the first listed pronunciation of a character is
//! the one its data source considers primary.

use ahash::AHashMap;
use anyhow::{Context as _, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::records;

#[derive(Default)]
struct Inner {
    by_char: AHashMap<char, Vec<String>>,
    by_sound: AHashMap<String, Vec<String>>,
    ready: bool,
}

/// Two-way pronunciation lookup used by the homophone reverse-lookup flow.
///
/// Clones share the underlying tables.
#[derive(Clone, Default)]
pub struct PronunciationIndex {
    inner: Arc<RwLock<Inner>>,
}

impl PronunciationIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the bundled tables finished loading.
    pub fn is_ready(&self) -> bool {
        self.inner.read().map(|i| i.ready).unwrap_or(false)
    }

    /// Register one pronunciation for a character. Duplicates are ignored
    /// (first seen wins).
    pub fn add_pronunciation(&self, ch: char, pronunciation: &str) {
        if let Ok(mut inner) = self.inner.write() {
            let list = inner.by_char.entry(ch).or_default();
            if !list.iter().any(|p| p == pronunciation) {
                list.push(pronunciation.to_string());
            }
        }
    }

    /// Register one homophone character for a pronunciation. Duplicates are
    /// ignored (first seen wins).
    pub fn add_homophone(&self, pronunciation: &str, ch: char) {
        if let Ok(mut inner) = self.inner.write() {
            let list = inner.by_sound.entry(pronunciation.to_string()).or_default();
            if !list.iter().any(|c| c.chars().next() == Some(ch)) {
                list.push(ch.to_string());
            }
        }
    }

    /// All known pronunciations of `ch`, in data-source order.
    pub fn pronunciations(&self, ch: char) -> Vec<String> {
        match self.inner.read() {
            Ok(inner) => inner.by_char.get(&ch).cloned().unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// All characters sharing `pronunciation`, in data-source order.
    pub fn homophones(&self, pronunciation: &str) -> Vec<String> {
        match self.inner.read() {
            Ok(inner) => inner.by_sound.get(pronunciation).cloned().unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Load both tables. The character table holds `id, character,
    /// pronunciation` records; the homophone table holds `id, pronunciation,
    /// character` records.
    pub fn load_tables(&self, char_table: &Path, sound_table: &Path) -> Result<()> {
        let char_records = records::read_records(BufReader::new(
            File::open(char_table)
                .with_context(|| format!("open pronunciation table {}", char_table.display()))?,
        ))?;
        let sound_records = records::read_records(BufReader::new(
            File::open(sound_table)
                .with_context(|| format!("open homophone table {}", sound_table.display()))?,
        ))?;

        for (key, value) in &char_records {
            match key.chars().next() {
                Some(ch) if key.chars().count() == 1 => self.add_pronunciation(ch, value),
                _ => debug!(key = %key, "skipping non-single-character pronunciation record"),
            }
        }
        for (key, value) in &sound_records {
            match value.chars().next() {
                Some(ch) if value.chars().count() == 1 => self.add_homophone(key, ch),
                _ => debug!(key = %key, "skipping non-single-character homophone record"),
            }
        }

        if let Ok(mut inner) = self.inner.write() {
            inner.ready = true;
        }
        Ok(())
    }

    /// Load both tables on a background thread. Failure is non-fatal: the
    /// index stays empty and the homophone flow degrades to direct commits.
    pub fn load_in_background(&self, char_table: PathBuf, sound_table: PathBuf) {
        let index = self.clone();
        let spawned = std::thread::Builder::new()
            .name("boshiamy-pron".into())
            .spawn(move || {
                if let Err(e) = index.load_tables(&char_table, &sound_table) {
                    warn!("pronunciation index load failed, lookups degrade to empty: {e:#}");
                }
            });
        if let Err(e) = spawned {
            warn!("could not spawn pronunciation loader: {e}");
        }
    }
}

impl std::fmt::Debug for PronunciationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PronunciationIndex")
            .field("ready", &self.is_ready())
            .finish()
    }
}
