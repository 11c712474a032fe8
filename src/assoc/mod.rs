//! Associative-character learning.
//!
//! The learner observes committed single-character selections and remembers
//! which characters tend to follow which, so the engine can offer "next
//! likely character" suggestions after each commit. Recorded pairs sit in an
//! in-memory buffer and are flushed to the persistent store in batches, on a
//! background worker; a failed flush retains the buffer for retry.
//!
//! Association tracking is intentionally restricted to ideographic context:
//! commits after alphanumerics, punctuation (Western, CJK or fullwidth) or
//! Japanese kana record nothing.

pub mod store;
pub use store::AssociationStore;

mod worker;

use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::Config;

pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it.
/// Buffered pairs must never be silently dropped, poisoned or not.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Whether a character qualifies as meaningful preceding context for
/// association learning.
pub fn is_trackable(ch: char) -> bool {
    if ch.is_ascii_alphanumeric() || ch.is_ascii_punctuation() || ch.is_whitespace() {
        return false;
    }
    !matches!(ch as u32,
        0x2000..=0x206F      // general punctuation
        | 0x3000..=0x303F    // CJK symbols and punctuation
        | 0x3040..=0x309F    // hiragana
        | 0x30A0..=0x30FF    // katakana
        | 0x31F0..=0x31FF    // katakana phonetic extensions
        | 0xFE30..=0xFE4F    // CJK compatibility forms
        | 0xFF00..=0xFFEF    // fullwidth forms and halfwidth kana
    )
}

/// State shared between the input thread and the persistence worker.
pub(crate) struct Shared {
    pub(crate) store: AssociationStore,
    buffer: Mutex<Vec<(String, String)>>,
    last_flush: Mutex<Instant>,
    flush_threshold: usize,
    flush_interval: Duration,
    pub(crate) decay_step: u32,
    pub(crate) min_keep_frequency: u32,
    pub(crate) max_idle_secs: u64,
}

impl Shared {
    /// Drain the buffer into one store transaction. On failure the drained
    /// pairs are put back in front of anything recorded meanwhile, and the
    /// next trigger retries the whole batch. Returns true when the buffer is
    /// empty afterwards.
    pub(crate) fn flush(&self) -> bool {
        let pending = {
            let mut buffer = lock(&self.buffer);
            if buffer.is_empty() {
                return true;
            }
            std::mem::take(&mut *buffer)
        };
        match self.store.apply_batch(&pending, epoch_secs()) {
            Ok(()) => {
                debug!(flushed = pending.len(), "association buffer flushed");
                *lock(&self.last_flush) = Instant::now();
                true
            }
            Err(e) => {
                warn!(
                    retained = pending.len(),
                    "association flush failed, buffer retained for retry: {e}"
                );
                let mut buffer = lock(&self.buffer);
                let mut restored = pending;
                restored.append(&mut buffer);
                *buffer = restored;
                false
            }
        }
    }
}

struct Inner {
    shared: Arc<Shared>,
    jobs: mpsc::Sender<worker::Job>,
    handle: JoinHandle<()>,
}

/// Buffered, background-persisted association learner.
///
/// When the underlying store cannot be opened the learner constructs in a
/// disabled state: recording and querying become no-ops rather than failing
/// the session.
pub struct AssociationLearner {
    inner: Option<Inner>,
}

impl AssociationLearner {
    /// Open (or create) the store at `path` and start the persistence worker.
    pub fn open<P: AsRef<Path>>(path: P, config: &Config) -> Self {
        let store = match AssociationStore::open(&path) {
            Ok(store) => store,
            Err(e) => {
                warn!(
                    "association store unavailable, learning disabled: {e} ({})",
                    path.as_ref().display()
                );
                return Self { inner: None };
            }
        };
        let shared = Arc::new(Shared {
            store,
            buffer: Mutex::new(Vec::new()),
            last_flush: Mutex::new(Instant::now()),
            flush_threshold: config.assoc_flush_threshold.max(1),
            flush_interval: Duration::from_secs(config.assoc_flush_interval_secs),
            decay_step: config.assoc_decay_step,
            min_keep_frequency: config.assoc_min_keep_frequency,
            max_idle_secs: config.assoc_max_idle_secs(),
        });
        match worker::spawn(Arc::clone(&shared)) {
            Ok((jobs, handle)) => Self {
                inner: Some(Inner {
                    shared,
                    jobs,
                    handle,
                }),
            },
            Err(e) => {
                warn!("could not spawn association worker, learning disabled: {e}");
                Self { inner: None }
            }
        }
    }

    /// Whether the persistent store is open.
    pub fn is_available(&self) -> bool {
        self.inner.is_some()
    }

    /// Record one committed adjacency. Returns false when the pair was
    /// filtered out or learning is disabled.
    pub fn record(&self, previous: char, current: char) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };
        if !is_trackable(previous) {
            debug!(%previous, "preceding character not trackable, pair skipped");
            return false;
        }
        let shared = &inner.shared;
        let pending = {
            let mut buffer = lock(&shared.buffer);
            buffer.push((previous.to_string(), current.to_string()));
            buffer.len()
        };
        let since_flush = lock(&shared.last_flush).elapsed();
        if pending >= shared.flush_threshold || since_flush > shared.flush_interval {
            let _ = inner.jobs.send(worker::Job::Flush);
        }
        true
    }

    /// Ranked "next likely character" suggestions following `ch`. Flushes the
    /// buffer first so just-recorded pairs are always visible.
    pub fn query(&self, ch: char, limit: usize) -> Vec<String> {
        let Some(inner) = &self.inner else {
            return Vec::new();
        };
        inner.shared.flush();
        match inner.shared.store.top(&ch.to_string(), limit) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("association query failed: {e}");
                Vec::new()
            }
        }
    }

    /// Undo one recorded commit; fire-and-forget against the store.
    pub fn decrease(&self, previous: char, current: char) {
        if let Some(inner) = &self.inner {
            let _ = inner
                .jobs
                .send(worker::Job::Decrease(previous.to_string(), current.to_string()));
        }
    }

    /// Schedule the age/frequency eviction pass; intended once per session
    /// start, off the input-latency path.
    pub fn schedule_cleanup(&self) {
        if let Some(inner) = &self.inner {
            let _ = inner.jobs.send(worker::Job::Cleanup);
        }
    }

    /// Flush synchronously on the calling thread. Returns true when the
    /// buffer is empty afterwards.
    pub fn flush_now(&self) -> bool {
        match &self.inner {
            Some(inner) => inner.shared.flush(),
            None => true,
        }
    }

    /// Number of recorded pairs awaiting persistence.
    pub fn pending(&self) -> usize {
        match &self.inner {
            Some(inner) => lock(&inner.shared.buffer).len(),
            None => 0,
        }
    }
}

impl Drop for AssociationLearner {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let _ = inner.jobs.send(worker::Job::Shutdown);
            let _ = inner.handle.join();
        }
    }
}

impl std::fmt::Debug for AssociationLearner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationLearner")
            .field("available", &self.is_available())
            .field("pending", &self.pending())
            .finish()
    }
}
