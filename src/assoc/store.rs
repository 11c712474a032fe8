//! Persistent association-pair store.
//!
//! Maps (previous character, current character) to a frequency and a
//! last-used timestamp (epoch seconds) in a redb database. All writes are
//! transactional: a batch flush either commits whole or leaves the store
//! untouched so the caller can retry with the same buffer.

use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};

const PAIR_TABLE: TableDefinition<(&'static str, &'static str), (u32, u64)> =
    TableDefinition::new("association_pairs");

/// Upper bound for a single-character range scan; no one-character string
/// sorts above it.
const MAX_CHAR: &str = "\u{10FFFF}";

/// redb-backed store of learned character adjacencies.
pub struct AssociationStore {
    db: Database,
    path: PathBuf,
}

impl AssociationStore {
    /// Create or open the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, redb::Error> {
        if let Some(parent) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let db = Database::create(path.as_ref())?;
        Ok(Self {
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Apply a batch of recorded pairs in one transaction: existing pairs get
    /// `frequency += 1` and a refreshed timestamp, new pairs start at
    /// frequency 1.
    pub fn apply_batch(&self, pairs: &[(String, String)], now: u64) -> Result<(), redb::Error> {
        if pairs.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PAIR_TABLE)?;
            for (previous, current) in pairs {
                let key = (previous.as_str(), current.as_str());
                let next = match table.get(key)? {
                    Some(guard) => {
                        let (frequency, _) = guard.value();
                        (frequency.saturating_add(1), now)
                    }
                    None => (1, now),
                };
                table.insert(key, next)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Undo one recorded commit: delete the pair outright at frequency ≤ 1,
    /// otherwise subtract `step` (deleting if that reaches zero). The
    /// last-used timestamp is not refreshed by an undo.
    pub fn decrease(&self, previous: &str, current: &str, step: u32) -> Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PAIR_TABLE)?;
            let existing = table.get((previous, current))?.map(|g| g.value());
            if let Some((frequency, last_used)) = existing {
                if frequency <= 1 {
                    table.remove((previous, current))?;
                } else {
                    let next = frequency.saturating_sub(step);
                    if next == 0 {
                        table.remove((previous, current))?;
                    } else {
                        table.insert((previous, current), (next, last_used))?;
                    }
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove every pair that is both rarely used (`frequency <
    /// min_keep_frequency`) and stale (last used more than `max_idle_secs`
    /// ago). Returns the number of rows removed.
    pub fn cleanup(
        &self,
        now: u64,
        min_keep_frequency: u32,
        max_idle_secs: u64,
    ) -> Result<usize, redb::Error> {
        let txn = self.db.begin_write()?;
        let removed;
        {
            let mut table = txn.open_table(PAIR_TABLE)?;
            let mut stale: Vec<(String, String)> = Vec::new();
            for item in table.iter()? {
                let (key, value) = item?;
                let (previous, current) = key.value();
                let (frequency, last_used) = value.value();
                if frequency < min_keep_frequency && now.saturating_sub(last_used) > max_idle_secs
                {
                    stale.push((previous.to_string(), current.to_string()));
                }
            }
            removed = stale.len();
            for (previous, current) in &stale {
                table.remove((previous.as_str(), current.as_str()))?;
            }
        }
        txn.commit()?;
        Ok(removed)
    }

    /// The top `limit` characters recorded after `previous`, most recently
    /// used first and by descending frequency among equals.
    pub fn top(&self, previous: &str, limit: usize) -> Result<Vec<String>, redb::Error> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(PAIR_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows: Vec<(String, u32, u64)> = Vec::new();
        for item in table.range((previous, "")..=(previous, MAX_CHAR))? {
            let (key, value) = item?;
            let (_, current) = key.value();
            let (frequency, last_used) = value.value();
            if frequency > 0 {
                rows.push((current.to_string(), frequency, last_used));
            }
        }
        rows.sort_by(|a, b| b.2.cmp(&a.2).then(b.1.cmp(&a.1)));
        rows.truncate(limit);
        Ok(rows.into_iter().map(|(current, _, _)| current).collect())
    }

    /// Stored frequency for a pair, 0 when absent.
    pub fn frequency(&self, previous: &str, current: &str) -> Result<u32, redb::Error> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(PAIR_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        Ok(table.get((previous, current))?.map(|g| g.value().0).unwrap_or(0))
    }
}

impl std::fmt::Debug for AssociationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationStore")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> AssociationStore {
        let unique_id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("assoc_store_{}_{}.redb", tag, unique_id));
        AssociationStore::open(path).unwrap()
    }

    fn pair(previous: &str, current: &str) -> (String, String) {
        (previous.to_string(), current.to_string())
    }

    #[test]
    fn batch_inserts_then_increments() {
        let store = temp_store("incr");
        store.apply_batch(&[pair("天", "空")], 100).unwrap();
        assert_eq!(store.frequency("天", "空").unwrap(), 1);
        store.apply_batch(&[pair("天", "空")], 200).unwrap();
        assert_eq!(store.frequency("天", "空").unwrap(), 2);
    }

    #[test]
    fn decrease_deletes_at_frequency_one() {
        let store = temp_store("del");
        store.apply_batch(&[pair("天", "空")], 100).unwrap();
        store.decrease("天", "空", 3).unwrap();
        assert_eq!(store.frequency("天", "空").unwrap(), 0);
    }

    #[test]
    fn decrease_steps_down_by_three() {
        let store = temp_store("step");
        for i in 0..5 {
            store.apply_batch(&[pair("天", "空")], 100 + i).unwrap();
        }
        assert_eq!(store.frequency("天", "空").unwrap(), 5);
        store.decrease("天", "空", 3).unwrap();
        assert_eq!(store.frequency("天", "空").unwrap(), 2);
    }

    #[test]
    fn decrease_deletes_when_step_reaches_zero() {
        let store = temp_store("zero");
        store.apply_batch(&[pair("天", "空")], 1).unwrap();
        store.apply_batch(&[pair("天", "空")], 2).unwrap();
        store.decrease("天", "空", 3).unwrap();
        assert_eq!(store.frequency("天", "空").unwrap(), 0);
    }

    #[test]
    fn cleanup_requires_both_conditions() {
        let store = temp_store("cleanup");
        let day = 24 * 60 * 60;
        let now = 100 * day;
        let old = now - 40 * day;
        let recent = now - day;

        // Low frequency and stale: evicted.
        store.apply_batch(&[pair("甲", "乙")], old).unwrap();
        // High frequency but stale: survives.
        for _ in 0..3 {
            store.apply_batch(&[pair("丙", "丁")], old).unwrap();
        }
        // Low frequency but recent: survives.
        store.apply_batch(&[pair("戊", "己")], recent).unwrap();

        let removed = store.cleanup(now, 3, 30 * day).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.frequency("甲", "乙").unwrap(), 0);
        assert_eq!(store.frequency("丙", "丁").unwrap(), 3);
        assert_eq!(store.frequency("戊", "己").unwrap(), 1);
    }

    #[test]
    fn top_orders_by_recency_then_frequency() {
        let store = temp_store("top");
        // 後 used most recently, 前 most often but older.
        for t in [10, 20, 30] {
            store.apply_batch(&[pair("天", "前")], t).unwrap();
        }
        store.apply_batch(&[pair("天", "後")], 40).unwrap();
        store.apply_batch(&[pair("天", "同")], 30).unwrap();

        let top = store.top("天", 5).unwrap();
        assert_eq!(top[0], "後");
        // 前 and 同 share last_used = 30; 前 wins on frequency.
        assert_eq!(top[1], "前");
        assert_eq!(top[2], "同");
    }

    #[test]
    fn top_respects_limit_and_key_isolation() {
        let store = temp_store("limit");
        for (i, curr) in ["一", "二", "三", "四", "五", "六", "七"].iter().enumerate() {
            store.apply_batch(&[pair("天", curr)], i as u64).unwrap();
        }
        store.apply_batch(&[pair("地", "八")], 99).unwrap();

        let top = store.top("天", 5).unwrap();
        assert_eq!(top.len(), 5);
        assert!(!top.contains(&"八".to_string()));
        assert!(store.top("虛", 5).unwrap().is_empty());
    }
}
