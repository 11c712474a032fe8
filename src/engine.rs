//! Engine aggregate: the shared read side (dictionary, pronunciation index)
//! plus the association learner, behind one `Arc` handed to the editors and
//! the controller.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::assoc::AssociationLearner;
use crate::dictionary::DictionaryStore;
use crate::pronunciation::PronunciationIndex;
use crate::Config;

/// Bundled dictionary index file name expected under the bundle directory.
const BUNDLE_FST: &str = "boshiamy.fst";
/// Bundled dictionary payload file name.
const BUNDLE_PAYLOAD: &str = "boshiamy.dict";
/// Character → pronunciation record table.
const BUNDLE_PRONUNCIATIONS: &str = "pronunciations.tsv";
/// Pronunciation → character record table.
const BUNDLE_HOMOPHONES: &str = "homophones.tsv";
/// Mutable association database, lives in the working directory.
const ASSOCIATION_DB: &str = "associations.redb";

/// Where the engine finds its data.
///
/// `bundle_dir` holds the shipped read-only assets; `work_dir` is writable
/// and receives the staged dictionary copy and the association database.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub bundle_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// Shared engine backend.
#[derive(Debug)]
pub struct Engine {
    dictionary: DictionaryStore,
    pronunciations: PronunciationIndex,
    associations: AssociationLearner,
    config: Config,
}

impl Engine {
    /// Open the engine against on-disk data. Dictionary and pronunciation
    /// loading happen on background threads; queries issued before they
    /// finish return empty results. The association cleanup pass is scheduled
    /// once, off the input path.
    pub fn open(paths: &DataPaths, config: Config) -> Arc<Self> {
        let dictionary = DictionaryStore::new(config.max_cache_size);
        dictionary.load_in_background(
            paths.bundle_dir.join(BUNDLE_FST),
            paths.bundle_dir.join(BUNDLE_PAYLOAD),
            paths.work_dir.clone(),
        );

        let pronunciations = PronunciationIndex::new();
        pronunciations.load_in_background(
            paths.bundle_dir.join(BUNDLE_PRONUNCIATIONS),
            paths.bundle_dir.join(BUNDLE_HOMOPHONES),
        );

        let associations =
            AssociationLearner::open(paths.work_dir.join(ASSOCIATION_DB), &config);
        associations.schedule_cleanup();

        info!(
            bundle = %paths.bundle_dir.display(),
            work = %paths.work_dir.display(),
            learning = associations.is_available(),
            "engine opened"
        );
        Arc::new(Self {
            dictionary,
            pronunciations,
            associations,
            config,
        })
    }

    /// Assemble an engine from already-built parts.
    pub fn with_parts(
        dictionary: DictionaryStore,
        pronunciations: PronunciationIndex,
        associations: AssociationLearner,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            dictionary,
            pronunciations,
            associations,
            config,
        })
    }

    /// Dictionary point query for a spelling.
    pub fn lookup(&self, spelling: &str) -> Vec<String> {
        self.dictionary.lookup(spelling)
    }

    /// Pronunciations of a single character.
    pub fn pronunciations_of(&self, ch: char) -> Vec<String> {
        self.pronunciations.pronunciations(ch)
    }

    /// Characters sharing a pronunciation.
    pub fn homophones_of(&self, pronunciation: &str) -> Vec<String> {
        self.pronunciations.homophones(pronunciation)
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    pub fn associations(&self) -> &AssociationLearner {
        &self.associations
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db(tag: &str) -> PathBuf {
        let unique_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("engine_{}_{}.redb", tag, unique_id))
    }

    /// In-memory backend shared by the editor and controller tests.
    ///
    /// Dictionary: ab → 火, abc → 金, de → 水.
    /// Pronunciations: 火 → huo3, 水 → shui3.
    /// Homophones: huo3 → 火 伙 夥 (shui3 has no homophone entry).
    pub(crate) fn test_backend() -> Arc<Engine> {
        let dictionary = DictionaryStore::new(16);
        dictionary.insert("ab", "火");
        dictionary.insert("abc", "金");
        dictionary.insert("de", "水");

        let pronunciations = PronunciationIndex::new();
        pronunciations.add_pronunciation('火', "huo3");
        pronunciations.add_pronunciation('水', "shui3");
        pronunciations.add_homophone("huo3", '火');
        pronunciations.add_homophone("huo3", '伙');
        pronunciations.add_homophone("huo3", '夥');

        let config = Config::default();
        let associations = AssociationLearner::open(temp_db("backend"), &config);
        Engine::with_parts(dictionary, pronunciations, associations, config)
    }

    #[test]
    fn engine_delegates_queries() {
        let engine = test_backend();
        assert_eq!(engine.lookup("ab"), vec!["火"]);
        assert_eq!(engine.pronunciations_of('火'), vec!["huo3"]);
        assert_eq!(engine.homophones_of("huo3"), vec!["火", "伙", "夥"]);
        assert!(engine.homophones_of("shui3").is_empty());
        assert!(engine.associations().is_available());
    }

    #[test]
    fn open_degrades_when_assets_missing() {
        let work = std::env::temp_dir().join(format!(
            "engine_open_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let paths = DataPaths {
            bundle_dir: PathBuf::from("/nonexistent/bundle"),
            work_dir: work,
        };
        let engine = Engine::open(&paths, Config::default());
        // Missing assets never fail session start; lookups are just empty.
        assert!(engine.lookup("ab").is_empty());
        assert!(engine.pronunciations_of('火').is_empty());
    }
}
