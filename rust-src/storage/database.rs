//! SQLite persistence for daily and hourly measures.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row, ToSql};
use tracing::{debug, error, info, warn};

use super::HistoryQuery;
use crate::error::Result;
use crate::models::{encode_flags, DailyMeasure, HourlyMeasure, Measure};


/// A measure with a table of its own, keyed by `ts`.
pub trait StoredMeasure: Measure {
    const TABLE: &'static str;

    /// Insert, or overwrite every non-key column on a `ts` conflict.
    const UPSERT_SQL: &'static str;

    /// Plain overwrite used when the upsert trips a constraint.
    const UPDATE_SQL: &'static str;

    const SELECT_COLUMNS: &'static str;

    /// Column values in statement order, `ts` first.
    fn to_sql_values(&self) -> Vec<SqlValue>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}


impl StoredMeasure for DailyMeasure {
    const TABLE: &'static str = "daily_measure";

    const UPSERT_SQL: &'static str =
        "INSERT INTO daily_measure (ts, date, consumption, temperature, precipitation)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(ts) DO UPDATE SET
            date = excluded.date,
            consumption = excluded.consumption,
            temperature = excluded.temperature,
            precipitation = excluded.precipitation";

    const UPDATE_SQL: &'static str =
        "UPDATE daily_measure
         SET date = ?2, consumption = ?3, temperature = ?4, precipitation = ?5
         WHERE ts = ?1";

    const SELECT_COLUMNS: &'static str = "ts, consumption, temperature, precipitation";

    fn to_sql_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.ts),
            SqlValue::Text(self.iso_date.clone()),
            SqlValue::Real(self.consumption),
            SqlValue::from(self.temperature),
            SqlValue::from(self.precipitation),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let ts: i64 = row.get(0)?;
        DailyMeasure::from_stored(ts, row.get(1)?, row.get(2)?, row.get(3)?)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ts))
    }
}


impl StoredMeasure for HourlyMeasure {
    const TABLE: &'static str = "hourly_measure";

    const UPSERT_SQL: &'static str =
        "INSERT INTO hourly_measure (ts, date, consumption, leak, flags)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(ts) DO UPDATE SET
            date = excluded.date,
            consumption = excluded.consumption,
            leak = excluded.leak,
            flags = excluded.flags";

    const UPDATE_SQL: &'static str =
        "UPDATE hourly_measure
         SET date = ?2, consumption = ?3, leak = ?4, flags = ?5
         WHERE ts = ?1";

    const SELECT_COLUMNS: &'static str = "ts, consumption, leak, flags";

    fn to_sql_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.ts),
            SqlValue::Text(self.iso_date.clone()),
            SqlValue::Real(self.gallons),
            SqlValue::from(self.leak_gallons),
            SqlValue::from(encode_flags(self.flags.as_deref())),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let ts: i64 = row.get(0)?;
        HourlyMeasure::from_stored(ts, row.get(1)?, row.get(2)?, row.get(3)?)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(0, ts))
    }
}


/// Outcome of a save. Skipped rows were logged and left out of the commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub written: usize,
    pub skipped: usize,
}


/// Row counts and timestamp ranges per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub daily_rows: i64,
    pub hourly_rows: i64,
    pub daily_range: Option<(i64, i64)>,
    pub hourly_range: Option<(i64, i64)>,
}


/// Owner of the persisted measures.
pub struct HistoryStore {
    conn: Connection,
}


impl HistoryStore {
    /// Open (creating if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        debug!(path = %db_path.display(), "opened history store");
        Self::from_connection(conn)
    }

    /// A store that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Upsert `rows` by timestamp in one transaction.
    ///
    /// A constraint violation is retried once as a plain update; any other
    /// row-level failure is logged and the row skipped. The transaction is
    /// committed either way.
    pub fn save<M: StoredMeasure>(&mut self, rows: &[M]) -> Result<SaveSummary> {
        let mut summary = SaveSummary::default();
        if rows.is_empty() {
            return Ok(summary);
        }

        let tx = self.conn.transaction()?;

        for row in rows {
            let values = row.to_sql_values();
            let ts = row.timestamp();

            match tx.execute(M::UPSERT_SQL, params_from_iter(values.iter())) {
                Ok(_) => summary.written += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    warn!(table = M::TABLE, ts, "upsert hit a constraint, retrying as update");
                    match tx.execute(M::UPDATE_SQL, params_from_iter(values.iter())) {
                        Ok(n) if n > 0 => summary.written += 1,
                        Ok(_) => {
                            warn!(table = M::TABLE, ts, "no row to update, skipping");
                            summary.skipped += 1;
                        }
                        Err(e) => {
                            error!(table = M::TABLE, ts, error = %e, "update failed, skipping row");
                            summary.skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    error!(table = M::TABLE, ts, error = %e, "upsert failed, skipping row");
                    summary.skipped += 1;
                }
            }
        }

        tx.commit()?;

        info!(
            table = M::TABLE,
            written = summary.written,
            skipped = summary.skipped,
            "saved measures"
        );
        Ok(summary)
    }

    /// Read stored rows back, filtered, ordered and paged per `query`.
    pub fn get_history<M: StoredMeasure>(&self, query: &HistoryQuery) -> Result<Vec<M>> {
        let mut sql = format!("SELECT {} FROM {} WHERE 1=1", M::SELECT_COLUMNS, M::TABLE);
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(from_ts) = query.from_ts {
            sql.push_str(" AND ts >= ?");
            params_vec.push(Box::new(from_ts));
        }
        if let Some(to_ts) = query.to_ts {
            sql.push_str(" AND ts <= ?");
            params_vec.push(Box::new(to_ts));
        }

        sql.push_str(if query.ascending {
            " ORDER BY ts ASC"
        } else {
            " ORDER BY ts DESC"
        });

        match (query.effective_limit(), query.effective_offset()) {
            (Some(limit), Some(offset)) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params_vec.push(Box::new(limit));
                params_vec.push(Box::new(offset));
            }
            (Some(limit), None) => {
                sql.push_str(" LIMIT ?");
                params_vec.push(Box::new(limit));
            }
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params_vec.push(Box::new(offset));
            }
            (None, None) => {}
        }

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_refs.as_slice(), |row| M::from_row(row))?
            .collect::<rusqlite::Result<Vec<M>>>()?;

        Ok(rows)
    }

    /// Timestamp of the newest stored row.
    pub fn last_timestamp<M: StoredMeasure>(&self) -> Result<Option<i64>> {
        let sql = format!("SELECT MAX(ts) FROM {}", M::TABLE);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn count<M: StoredMeasure>(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", M::TABLE);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let (daily_rows, daily_range) = self.table_stats::<DailyMeasure>()?;
        let (hourly_rows, hourly_range) = self.table_stats::<HourlyMeasure>()?;

        Ok(StoreStats {
            daily_rows,
            hourly_rows,
            daily_range,
            hourly_range,
        })
    }

    fn table_stats<M: StoredMeasure>(&self) -> Result<(i64, Option<(i64, i64)>)> {
        let sql = format!("SELECT COUNT(*), MIN(ts), MAX(ts) FROM {}", M::TABLE);
        let (count, min, max): (i64, Option<i64>, Option<i64>) = self
            .conn
            .query_row(&sql, [], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;

        Ok((count, min.zip(max)))
    }
}


fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_measure (
            ts INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            consumption REAL NOT NULL,
            temperature REAL,
            precipitation REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS hourly_measure (
            ts INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            consumption REAL NOT NULL,
            leak REAL,
            flags TEXT
        )",
        [],
    )?;

    Ok(())
}
