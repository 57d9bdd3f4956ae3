//! SQLite implementation of the Journal trait.
//!
//! The durable journal for a deployment that must survive restarts. It uses
//! rusqlite with bundled SQLite; each call takes the connection mutex for the
//! duration of a short statement.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use ahin_kernel_core::{Block, BlockParts, Digest, DigestAlgorithm, Event, ExternalRef};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AnchoredEntry, Journal};

const META_DIGEST_ALGORITHM: &str = "digest_algorithm";

/// SQLite-based journal.
///
/// Thread-safe via internal Mutex.
pub struct SqliteJournal {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJournal {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                Some(format!("mutex poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }
}

fn digest_from_column(bytes: &[u8], column: &str) -> Result<Digest> {
    Digest::try_from(bytes)
        .map_err(|_| StoreError::InvalidData(format!("{column} is {} bytes, expected 32", bytes.len())))
}

fn encode_events(events: &[Event]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(events, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_events(bytes: &[u8]) -> Result<Vec<Event>> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{what} {value} exceeds i64")))
}

#[async_trait]
impl Journal for SqliteJournal {
    async fn digest_algorithm(&self) -> Result<Option<DigestAlgorithm>> {
        self.with_conn(|conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM journal_meta WHERE key = ?1",
                    params![META_DIGEST_ALGORITHM],
                    |row| row.get(0),
                )
                .optional()?;
            match value {
                Some(s) => Ok(Some(s.parse()?)),
                None => Ok(None),
            }
        })
    }

    async fn set_digest_algorithm(&self, algorithm: DigestAlgorithm) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO journal_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![META_DIGEST_ALGORITHM, algorithm.as_str()],
            )?;
            Ok(())
        })
    }

    async fn append_block(&self, block: &Block) -> Result<()> {
        let sequence = to_i64(block.sequence(), "sequence")?;
        let events = encode_events(block.events())?;

        self.with_conn(|conn| {
            let existing: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT block_hash FROM blocks WHERE sequence = ?1",
                    params![sequence],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                if existing.as_slice() == block.block_hash().as_bytes() {
                    return Ok(());
                }
                return Err(StoreError::Conflict {
                    sequence: block.sequence(),
                    existing: digest_from_column(&existing, "block_hash")?.to_string(),
                });
            }

            conn.execute(
                "INSERT INTO blocks (
                    sequence, block_hash, merkle_root, prev_block_hash,
                    timestamp, event_count, events
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    sequence,
                    &block.block_hash().as_bytes()[..],
                    &block.merkle_root().as_bytes()[..],
                    &block.prev_block_hash().as_bytes()[..],
                    block.timestamp(),
                    to_i64(block.event_count(), "event_count")?,
                    events,
                ],
            )?;
            Ok(())
        })
    }

    async fn mark_anchored(
        &self,
        sequence: u64,
        external_ref: &ExternalRef,
        anchored_at: i64,
    ) -> Result<()> {
        let seq = to_i64(sequence, "sequence")?;
        let ledger_block = to_i64(external_ref.ledger_block, "ledger_block")?;

        self.with_conn(|conn| {
            let known: Option<i64> = conn
                .query_row(
                    "SELECT sequence FROM blocks WHERE sequence = ?1",
                    params![seq],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_none() {
                return Err(StoreError::InvalidData(format!(
                    "cannot anchor unknown block {sequence}"
                )));
            }

            conn.execute(
                "INSERT OR IGNORE INTO anchors (sequence, tx_hash, ledger_block, anchored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![seq, external_ref.tx_hash, ledger_block, anchored_at],
            )?;
            Ok(())
        })
    }

    async fn load_blocks(&self) -> Result<Vec<BlockParts>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sequence, prev_block_hash, timestamp, events, block_hash
                 FROM blocks ORDER BY sequence ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(sequence, prev, timestamp, events, hash)| {
                    Ok(BlockParts {
                        sequence: u64::try_from(sequence).map_err(|_| {
                            StoreError::InvalidData(format!("negative sequence {sequence}"))
                        })?,
                        prev_block_hash: digest_from_column(&prev, "prev_block_hash")?,
                        timestamp,
                        events: decode_events(&events)?,
                        block_hash: digest_from_column(&hash, "block_hash")?,
                    })
                })
                .collect()
        })
    }

    async fn load_anchors(&self) -> Result<Vec<AnchoredEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sequence, tx_hash, ledger_block, anchored_at
                 FROM anchors ORDER BY sequence ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(sequence, tx_hash, ledger_block, anchored_at)| {
                    Ok(AnchoredEntry {
                        sequence: u64::try_from(sequence).map_err(|_| {
                            StoreError::InvalidData(format!("negative sequence {sequence}"))
                        })?,
                        external_ref: ExternalRef {
                            tx_hash,
                            ledger_block: u64::try_from(ledger_block).map_err(|_| {
                                StoreError::InvalidData(format!(
                                    "negative ledger block {ledger_block}"
                                ))
                            })?,
                        },
                        anchored_at,
                    })
                })
                .collect()
        })
    }
}
