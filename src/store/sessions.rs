//! SQLite-backed history of completed sessions.
//!
//! Provides:
//! - Appending completed sessions keyed by local calendar date
//! - Daily, weekly and monthly aggregates of work sessions
//! - Pruning of records older than a year

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::timer::CompletedSession;
use crate::types::{DayStat, StatsQuery, TimerMode};

use super::error::StoreError;

/// Records older than this many days are pruned on open.
pub const RETENTION_DAYS: i64 = 365;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Completed-session history.
pub struct SessionLog {
    conn: Mutex<Connection>,
}

impl SessionLog {
    /// Opens (or creates) the history database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, database or schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let log = Self::with_connection(Connection::open(path)?)?;

        let cutoff = Local::now().date_naive() - Duration::days(RETENTION_DAYS);
        let pruned = log.prune_before(cutoff)?;
        if pruned > 0 {
            info!("{}件の古いセッション記録を削除しました", pruned);
        }
        Ok(log)
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                mode      TEXT NOT NULL,
                elapsed   REAL NOT NULL,
                timestamp TEXT NOT NULL,
                date      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Appends `session`, stamped with the current local time.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record(&self, session: &CompletedSession) -> Result<i64, StoreError> {
        self.record_at(session, Local::now())
    }

    /// Appends `session` as completed at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn record_at(
        &self,
        session: &CompletedSession,
        at: DateTime<Local>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (mode, elapsed, timestamp, date) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.mode.as_str(),
                f64::from(session.elapsed_seconds),
                at.to_rfc3339(),
                at.format(DATE_FORMAT).to_string(),
            ],
        )?;
        debug!(
            "セッションを記録しました: {} ({}秒)",
            session.mode, session.elapsed_seconds
        );
        Ok(conn.last_insert_rowid())
    }

    /// Deletes records dated before `cutoff`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn prune_before(&self, cutoff: NaiveDate) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE date < ?1",
            params![cutoff.format(DATE_FORMAT).to_string()],
        )?;
        Ok(removed)
    }

    /// Aggregates work sessions on `date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn daily_stats(&self, date: NaiveDate) -> Result<DayStat, StoreError> {
        let date = date.format(DATE_FORMAT).to_string();
        let conn = self.conn()?;
        let (count, total_seconds): (i64, f64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(elapsed), 0)
             FROM sessions
             WHERE date = ?1 AND mode = ?2",
            params![date, TimerMode::Work.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DayStat {
            date,
            count,
            total_minutes: total_seconds / 60.0,
        })
    }

    /// Aggregates work sessions per day in `start..=end`. Days without
    /// sessions are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or the query fails.
    pub fn range_stats(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayStat>, StoreError> {
        if end < start {
            return Err(StoreError::InvalidDate(format!("{} > {}", start, end)));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, COUNT(*), COALESCE(SUM(elapsed), 0)
             FROM sessions
             WHERE date >= ?1 AND date <= ?2 AND mode = ?3
             GROUP BY date
             ORDER BY date",
        )?;

        let rows = stmt.query_map(
            params![
                start.format(DATE_FORMAT).to_string(),
                end.format(DATE_FORMAT).to_string(),
                TimerMode::Work.as_str(),
            ],
            |row| {
                let total_seconds: f64 = row.get(2)?;
                Ok(DayStat {
                    date: row.get(0)?,
                    count: row.get(1)?,
                    total_minutes: total_seconds / 60.0,
                })
            },
        )?;

        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Aggregates the seven days starting at `week_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn weekly_stats(&self, week_start: NaiveDate) -> Result<Vec<DayStat>, StoreError> {
        self.range_stats(week_start, week_start + Duration::days(6))
    }

    /// Aggregates a calendar month.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDate`] for an impossible year/month.
    pub fn monthly_stats(&self, year: i32, month: u32) -> Result<Vec<DayStat>, StoreError> {
        let invalid = || StoreError::InvalidDate(format!("{}-{:02}", year, month));
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if start.month() == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        self.range_stats(start, next - Duration::days(1))
    }

    /// Runs the aggregate selected by `query`.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying aggregate.
    pub fn query(&self, query: &StatsQuery) -> Result<Vec<DayStat>, StoreError> {
        match *query {
            StatsQuery::Day { date } => Ok(vec![self.daily_stats(date)?]),
            StatsQuery::Week { start } => self.weekly_stats(start),
            StatsQuery::Month { year, month } => self.monthly_stats(year, month),
        }
    }
}
