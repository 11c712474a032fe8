//! libboshiamy
//!
//! Input-processing engine for the Boshiamy (嘸蝦米) root-based Chinese input
//! method: root accumulation, dictionary-backed candidate resolution, the
//! homophone reverse-lookup flow, and associative-character learning.
//!
//! This crate is the algorithmic core only. Keyboard layout construction,
//! rendering and the host text-insertion API live outside; the engine talks to
//! them through plain data events (see `EngineContext`).
//!
//! Public API:
//! - `InputController` - top-level key routing and mode state
//! - `Engine` - dictionary, pronunciation index and association learner
//! - `DictionaryStore` - spelling code → ordered candidate lookup
//! - `PronunciationIndex` - character ↔ pronunciation ↔ homophone lookups
//! - `AssociationLearner` - learned (previous, next) character adjacencies
//! - `Config` - tuning constants and feature knobs

use serde::{Deserialize, Serialize};

pub mod spelling;
pub use spelling::Spelling;

pub(crate) mod records;

pub mod dictionary;
pub use dictionary::DictionaryStore;

pub mod pronunciation;
pub use pronunciation::PronunciationIndex;

pub mod assoc;
pub use assoc::{AssociationLearner, AssociationStore};

pub mod session;
pub use session::{ScriptMode, Session, ShiftState};

pub mod context;
pub use context::EngineContext;

pub mod editor;
pub use editor::{Editor, EditorResult, HomophoneEditor, RootEditor};

pub mod engine;
pub use engine::{DataPaths, Engine};

pub mod controller;
pub use controller::{InputController, Key, KeyLayout, KeyResult};

/// Engine configuration.
///
/// All product-tuning constants live here rather than as hard-coded values;
/// the association flush/decay/eviction numbers in particular are tuning
/// knobs, not semantics.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Key that starts a homophone reverse lookup while in phonetic mode.
    pub reverse_lookup_key: char,

    /// Flush the association buffer once it holds this many pairs.
    pub assoc_flush_threshold: usize,
    /// Flush the association buffer once this many seconds passed since the
    /// last flush, even if the size threshold was not reached.
    pub assoc_flush_interval_secs: u64,
    /// Amount subtracted from a pair's frequency when a commit is undone.
    /// Deliberately steeper than the +1 increment to bias against
    /// oscillating edits.
    pub assoc_decay_step: u32,
    /// Cleanup keeps a pair when `frequency >= assoc_min_keep_frequency`,
    /// regardless of age.
    pub assoc_min_keep_frequency: u32,
    /// Cleanup keeps a pair when it was used within this many days,
    /// regardless of frequency.
    pub assoc_max_idle_days: u64,
    /// Maximum number of associated characters returned per query.
    pub assoc_query_limit: usize,

    /// Maximum number of entries in the spelling → candidates lookup cache.
    pub max_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reverse_lookup_key: '\'',
            assoc_flush_threshold: 10,
            assoc_flush_interval_secs: 10,
            assoc_decay_step: 3,
            assoc_min_keep_frequency: 3,
            assoc_max_idle_days: 30,
            assoc_query_limit: 5,
            max_cache_size: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Maximum idle age in seconds before cleanup may evict a pair.
    pub fn assoc_max_idle_secs(&self) -> u64 {
        self.assoc_max_idle_days * 24 * 60 * 60
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}
