use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;

use crate::calendar::{Calendar, CalendarMonth, Event, GridError};
use crate::sync::wire::local_datetime;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Failed to create cache directory: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid month: {0}")]
    InvalidMonth(#[from] GridError),
}

/// Last known copy of calendars and month events, read when the server is unreachable.
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let cache = Self::new(Connection::open(path)?);
        cache.initialize()?;
        Ok(cache)
    }

    pub fn initialize(&self) -> Result<(), CacheError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id TEXT NOT NULL,
                calendar_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                start_at TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (calendar_id, id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS calendars (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn month_bounds(month: CalendarMonth) -> Result<(String, String), CacheError> {
        let (first, last) = month.date_range()?;
        let start = first.and_hms_opt(0, 0, 0).map(|d| local_datetime::format(&d));
        let end = last.and_hms_opt(23, 59, 59).map(|d| local_datetime::format(&d));
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(GridError::InvalidArgument(format!("no bounds for {}", month)).into()),
        }
    }

    /// Replaces the cached events of one calendar within one month.
    pub fn store_month(
        &self,
        calendar_id: &str,
        month: CalendarMonth,
        events: &[Event],
    ) -> Result<(), CacheError> {
        let (start, end) = Self::month_bounds(month)?;
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM events WHERE calendar_id = ?1 AND start_at >= ?2 AND start_at <= ?3",
            rusqlite::params![calendar_id, &start, &end],
        )?;

        for (position, event) in events
            .iter()
            .filter(|e| month.contains(e.start_date()))
            .enumerate()
        {
            let data = serde_json::to_string(event)?;
            tx.execute(
                "INSERT OR REPLACE INTO events (id, calendar_id, position, start_at, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    &event.id,
                    calendar_id,
                    position as i64,
                    local_datetime::format(&event.start_at),
                    &data,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!("Cached {} events for {} in {}", events.len(), calendar_id, month);
        Ok(())
    }

    pub fn load_month(&self, calendar_id: &str, month: CalendarMonth) -> Result<Vec<Event>, CacheError> {
        let (start, end) = Self::month_bounds(month)?;
        let mut stmt = self.conn.prepare(
            "SELECT data FROM events
             WHERE calendar_id = ?1 AND start_at >= ?2 AND start_at <= ?3
             ORDER BY position",
        )?;
        let rows = stmt.query_map(rusqlite::params![calendar_id, &start, &end], |row| {
            row.get::<_, String>(0)
        })?;

        let mut events = Vec::new();
        for data in rows {
            events.push(serde_json::from_str(&data?)?);
        }
        Ok(events)
    }

    pub fn delete_event(&self, id: &str) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn store_calendars(&self, calendars: &[Calendar]) -> Result<(), CacheError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM calendars", [])?;
        for (position, calendar) in calendars.iter().enumerate() {
            let data = serde_json::to_string(calendar)?;
            tx.execute(
                "INSERT INTO calendars (id, position, data) VALUES (?1, ?2, ?3)",
                rusqlite::params![&calendar.id, position as i64, &data],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_calendars(&self) -> Result<Vec<Calendar>, CacheError> {
        let mut stmt = self.conn.prepare("SELECT data FROM calendars ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut calendars = Vec::new();
        for data in rows {
            calendars.push(serde_json::from_str(&data?)?);
        }
        Ok(calendars)
    }

    pub fn delete_calendar(&self, id: &str) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM events WHERE calendar_id = ?1", [id])?;
        self.conn.execute("DELETE FROM calendars WHERE id = ?1", [id])?;
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> bool {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [table_name],
            |row| row.get(0),
        );
        result.unwrap_or(0) > 0
    }
}
