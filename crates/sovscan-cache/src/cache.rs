use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// A proprietary target mirrored from the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub package_id: String,
    pub display_name: String,
    pub alternatives_count: u32,
}

/// A FOSS solution mirrored from the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionEntry {
    pub package_id: String,
    pub display_name: String,
}

/// Local mirror of catalog membership, backed by SQLite.
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Survives app restarts without a separate process
/// - Transactions give us all-or-nothing refreshes for free
///
/// The mirror is refreshed wholesale and invalidated wholesale: rows are
/// never edited one at a time. Point lookups treat absence as a plain
/// negative, never as an error.
pub struct CatalogCache {
    conn: Connection,
}

impl CatalogCache {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory cache, used by tests and as a throwaway when the on-disk
    /// database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS targets (
                package_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                alternatives_count INTEGER NOT NULL DEFAULT 0,
                cached_at INTEGER NOT NULL,
                refresh_seq INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS solutions (
                package_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                cached_at INTEGER NOT NULL,
                refresh_seq INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Replace both mirrors with a fresh snapshot from the remote catalog.
    ///
    /// Runs as a single transaction: upsert the new rows tagged with a new
    /// refresh sequence number, then prune rows from older refreshes. An
    /// interrupted refresh rolls back and leaves the previous mirror fully
    /// intact, so the cache can never end up half-empty. Pruning goes by
    /// sequence number, not timestamp, because two refreshes can land in
    /// the same second.
    pub fn replace(&mut self, targets: &[TargetEntry], solutions: &[SolutionEntry]) -> Result<()> {
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;

        let seq: i64 = tx
            .query_row(
                "SELECT value FROM meta WHERE key = 'refresh_seq'",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0)
            + 1;

        for target in targets {
            tx.execute(
                "INSERT INTO targets (package_id, display_name, alternatives_count, cached_at, refresh_seq)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(package_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     alternatives_count = excluded.alternatives_count,
                     cached_at = excluded.cached_at,
                     refresh_seq = excluded.refresh_seq",
                params![
                    target.package_id,
                    target.display_name,
                    target.alternatives_count,
                    now,
                    seq
                ],
            )?;
        }
        for solution in solutions {
            tx.execute(
                "INSERT INTO solutions (package_id, display_name, cached_at, refresh_seq)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(package_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     cached_at = excluded.cached_at,
                     refresh_seq = excluded.refresh_seq",
                params![solution.package_id, solution.display_name, now, seq],
            )?;
        }

        // Prune rows absent from this snapshot
        tx.execute("DELETE FROM targets WHERE refresh_seq < ?1", params![seq])?;
        tx.execute("DELETE FROM solutions WHERE refresh_seq < ?1", params![seq])?;

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('refresh_seq', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![seq],
        )?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('last_refresh', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![now],
        )?;

        tx.commit()?;
        info!(
            "Catalog mirror refreshed: {} targets, {} solutions",
            targets.len(),
            solutions.len()
        );
        Ok(())
    }

    /// When the mirror was last refreshed, if ever.
    pub fn last_refreshed_at(&self) -> Result<Option<DateTime<Utc>>> {
        let ts: Option<i64> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'last_refresh'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts.and_then(|t| DateTime::from_timestamp(t, 0)))
    }

    /// True iff the mirror was refreshed less than `ttl` before `now`.
    /// Never-populated caches are always stale.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> Result<bool> {
        match self.last_refreshed_at()? {
            Some(refreshed) => Ok(now - refreshed < ttl),
            None => Ok(false),
        }
    }

    pub fn is_valid(&self, ttl: Duration) -> Result<bool> {
        self.is_valid_at(Utc::now(), ttl)
    }

    /// Is this package a known proprietary target, per the mirror?
    pub fn is_target_cached(&self, package_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM targets WHERE package_id = ?1",
                params![package_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Is this package a known FOSS solution, per the mirror?
    pub fn is_solution_cached(&self, package_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM solutions WHERE package_id = ?1",
                params![package_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Cached alternatives count for a target; None when not mirrored.
    pub fn alternatives_count(&self, package_id: &str) -> Result<Option<u32>> {
        let count: Option<u32> = self
            .conn
            .query_row(
                "SELECT alternatives_count FROM targets WHERE package_id = ?1",
                params![package_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count)
    }

    pub fn target_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM targets", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn solution_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM solutions", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Unconditional wipe of both mirrors and the freshness marker.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM targets", [])?;
        tx.execute("DELETE FROM solutions", [])?;
        tx.execute("DELETE FROM meta WHERE key = 'last_refresh'", [])?;
        tx.commit()?;
        debug!("Catalog mirror cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_targets() -> Vec<TargetEntry> {
        vec![
            TargetEntry {
                package_id: "com.whatsapp".into(),
                display_name: "WhatsApp".into(),
                alternatives_count: 3,
            },
            TargetEntry {
                package_id: "com.instagram.android".into(),
                display_name: "Instagram".into(),
                alternatives_count: 1,
            },
        ]
    }

    fn sample_solutions() -> Vec<SolutionEntry> {
        vec![SolutionEntry {
            package_id: "org.thoughtcrime.securesms".into(),
            display_name: "Signal".into(),
        }]
    }

    #[test]
    fn fresh_cache_is_stale_and_empty() {
        let cache = CatalogCache::in_memory().unwrap();
        assert!(!cache.is_valid(Duration::hours(24)).unwrap());
        assert!(!cache.is_target_cached("com.whatsapp").unwrap());
        assert_eq!(cache.alternatives_count("com.whatsapp").unwrap(), None);
    }

    #[test]
    fn replace_populates_both_mirrors() {
        let mut cache = CatalogCache::in_memory().unwrap();
        cache
            .replace(&sample_targets(), &sample_solutions())
            .unwrap();

        assert!(cache.is_target_cached("com.whatsapp").unwrap());
        assert!(cache.is_target_cached("com.instagram.android").unwrap());
        assert!(cache
            .is_solution_cached("org.thoughtcrime.securesms")
            .unwrap());
        assert!(!cache.is_solution_cached("com.whatsapp").unwrap());
        assert_eq!(cache.alternatives_count("com.whatsapp").unwrap(), Some(3));
    }

    #[test]
    fn replace_prunes_rows_missing_from_snapshot() {
        let mut cache = CatalogCache::in_memory().unwrap();
        cache
            .replace(&sample_targets(), &sample_solutions())
            .unwrap();

        // Second refresh drops Instagram from the snapshot
        let smaller = vec![TargetEntry {
            package_id: "com.whatsapp".into(),
            display_name: "WhatsApp".into(),
            alternatives_count: 4,
        }];
        cache.replace(&smaller, &sample_solutions()).unwrap();

        assert!(cache.is_target_cached("com.whatsapp").unwrap());
        assert!(!cache.is_target_cached("com.instagram.android").unwrap());
        assert_eq!(cache.alternatives_count("com.whatsapp").unwrap(), Some(4));
        assert_eq!(cache.target_count().unwrap(), 1);
    }

    #[test]
    fn ttl_honours_a_simulated_clock() {
        let mut cache = CatalogCache::in_memory().unwrap();
        cache
            .replace(&sample_targets(), &sample_solutions())
            .unwrap();

        let ttl = Duration::hours(24);
        assert!(cache.is_valid(ttl).unwrap());

        let refreshed = cache.last_refreshed_at().unwrap().unwrap();
        // One second shy of the TTL: still valid
        assert!(cache
            .is_valid_at(refreshed + ttl - Duration::seconds(1), ttl)
            .unwrap());
        // Exactly the TTL: stale (strict less-than)
        assert!(!cache.is_valid_at(refreshed + ttl, ttl).unwrap());
        assert!(!cache
            .is_valid_at(refreshed + Duration::hours(25), ttl)
            .unwrap());
    }

    #[test]
    fn clear_wipes_rows_and_freshness() {
        let mut cache = CatalogCache::in_memory().unwrap();
        cache
            .replace(&sample_targets(), &sample_solutions())
            .unwrap();

        cache.clear().unwrap();

        assert_eq!(cache.target_count().unwrap(), 0);
        assert_eq!(cache.solution_count().unwrap(), 0);
        assert!(!cache.is_valid(Duration::hours(24)).unwrap());
        assert!(cache.last_refreshed_at().unwrap().is_none());
    }

    #[test]
    fn replace_with_empty_snapshot_empties_the_mirror() {
        let mut cache = CatalogCache::in_memory().unwrap();
        cache
            .replace(&sample_targets(), &sample_solutions())
            .unwrap();

        cache.replace(&[], &[]).unwrap();

        assert_eq!(cache.target_count().unwrap(), 0);
        // Still counts as a refresh: the catalog really is empty
        assert!(cache.is_valid(Duration::hours(24)).unwrap());
    }
}
