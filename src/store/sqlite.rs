//! SQLite-backed shared store for tabs living in different processes
//!
//! Every write bumps a global version column. Each open store polls for rows
//! with a version above the last one it has seen and turns them into
//! [`StorageEvent`]s. Removals leave a tombstone row (NULL value) so other
//! processes can observe them. Several writes to one key between two polls
//! coalesce into a single event carrying the latest value.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{SharedStore, StorageEvent, TabId};
use crate::error::StoreError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Default interval between change polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const EVENT_BUFFER_SIZE: usize = 256;

type Result<T> = std::result::Result<T, StoreError>;

/// Last version seen by this process plus the values it implied.
#[derive(Default)]
struct PollCursor {
    version: i64,
    snapshot: HashMap<String, String>,
}

/// Shared store persisted in a SQLite database file
pub struct SqliteStore {
    conn: Mutex<Connection>,
    cursor: Mutex<PollCursor>,
    sender: broadcast::Sender<StorageEvent>,
}

impl SqliteStore {
    /// Open or create the store at `path`.
    pub fn open_at(path: &Path) -> Result<Arc<Self>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Session store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch("DROP TABLE IF EXISTS kv;")?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT,
                version INTEGER NOT NULL,
                origin TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_kv_version ON kv(version);
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        let cursor = Self::load_cursor(&conn)?;
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            cursor: Mutex::new(cursor),
            sender,
        }))
    }

    fn load_cursor(conn: &Connection) -> Result<PollCursor> {
        let mut cursor = PollCursor::default();
        let mut stmt = conn.prepare("SELECT key, value, version FROM kv")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        for row in rows {
            let (key, value, version) = row?;
            cursor.version = cursor.version.max(version);
            if let Some(value) = value {
                cursor.snapshot.insert(key, value);
            }
        }
        Ok(cursor)
    }

    /// Spawn a background task polling for changes made by any process.
    ///
    /// The task stops once the store is dropped.
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else { break };
                if let Err(err) = store.poll() {
                    log::warn!("Session store poll failed: {}", err);
                }
            }
        })
    }

    /// Emit events for every change since the previous poll.
    ///
    /// Returns the number of events emitted.
    pub fn poll(&self) -> Result<usize> {
        let since = self
            .cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .version;

        let rows: Vec<(String, Option<String>, i64, String)> = {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            let mut stmt = conn.prepare(
                "SELECT key, value, version, origin FROM kv WHERE version > ?1 ORDER BY version",
            )?;
            let mapped = stmt.query_map(params![since], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            mapped.collect::<std::result::Result<_, _>>()?
        };

        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let mut emitted = 0;
        for (key, value, version, origin) in rows {
            cursor.version = cursor.version.max(version);
            let old_value = match &value {
                Some(v) => cursor.snapshot.insert(key.clone(), v.clone()),
                None => cursor.snapshot.remove(&key),
            };
            if old_value == value {
                continue;
            }

            let _ = self.sender.send(StorageEvent {
                key,
                old_value,
                new_value: value,
                origin: TabId::from(origin),
            });
            emitted += 1;
        }
        Ok(emitted)
    }
}

impl SharedStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let value: Option<Option<String>> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value.flatten())
    }

    fn set(&self, origin: &TabId, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO kv (key, value, version, origin)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(version), 0) + 1 FROM kv), ?3)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 version = excluded.version,
                 origin = excluded.origin
             WHERE kv.value IS NOT excluded.value",
            params![key, value, origin.as_str()],
        )?;
        Ok(())
    }

    fn remove(&self, origin: &TabId, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "UPDATE kv SET
                 value = NULL,
                 version = (SELECT COALESCE(MAX(version), 0) + 1 FROM kv),
                 origin = ?2
             WHERE key = ?1 AND value IS NOT NULL",
            params![key, origin.as_str()],
        )?;
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }
}
