use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use thiserror::Error;

use crate::models::{EventDates, Genre, Image, PriceRange};
use crate::utils;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Event columns as stored, before genres and images are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub dates: EventDates,
    pub price_ranges: Vec<PriceRange>,
}

/// A full event row set to insert, used by seeding and organizer flows.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub organizer_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub dates: EventDates,
    pub price_ranges: Vec<PriceRange>,
    pub genres: Vec<String>,
    pub images: Vec<Image>,
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS events(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            organizer_id INTEGER,
            name TEXT NOT NULL,
            description TEXT,
            location TEXT,
            start_date_time TEXT,
            end_date_time TEXT
        );
        CREATE TABLE IF NOT EXISTS genres(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        );
        CREATE TABLE IF NOT EXISTS event_genres(
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
            PRIMARY KEY (event_id, genre_id)
        );
        CREATE TABLE IF NOT EXISTS event_images(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            ratio TEXT,
            width INTEGER,
            height INTEGER,
            url TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS event_price_ranges(
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            currency TEXT NOT NULL,
            min REAL NOT NULL,
            max REAL NOT NULL,
            PRIMARY KEY (event_id, currency)
        );
        CREATE INDEX IF NOT EXISTS idx_events_organizer ON events(organizer_id);",
    )
}

/// Synchronous event queries over one borrowed connection.
pub struct Store<'a> {
    conn: &'a Connection,
}

impl<'a> Store<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get_event_details(&self, id: i64) -> rusqlite::Result<Option<EventDetails>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, description, location, start_date_time, end_date_time
                 FROM events WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<DateTime<Utc>>>(3)?,
                        row.get::<_, Option<DateTime<Utc>>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((name, description, location, start, end)) = row else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT currency, min, max FROM event_price_ranges
             WHERE event_id = ?1 ORDER BY rowid",
        )?;
        let price_ranges = stmt
            .query_map(params![id], |row| {
                Ok(PriceRange::new(
                    row.get::<_, String>(0)?,
                    row.get(1)?,
                    row.get(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(EventDetails {
            name,
            description,
            location,
            dates: EventDates {
                start_date_time: start,
                end_date_time: end,
            },
            price_ranges,
        }))
    }

    pub fn get_event_genres(&self, id: i64) -> rusqlite::Result<Vec<Genre>> {
        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.external_id, g.name FROM event_genres eg
             JOIN genres g ON g.id = eg.genre_id
             WHERE eg.event_id = ?1 ORDER BY eg.rowid",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(Genre {
                id: row.get(0)?,
                external_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    pub fn get_event_images(&self, id: i64) -> rusqlite::Result<Vec<Image>> {
        let mut stmt = self.conn.prepare(
            "SELECT ratio, width, height, url FROM event_images
             WHERE event_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(Image {
                ratio: row.get(0)?,
                width: row.get(1)?,
                height: row.get(2)?,
                url: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    /// Ids of events tagged with any of `names` (case-insensitive).
    pub fn get_event_ids_with_genres(&self, names: &[String]) -> rusqlite::Result<Vec<i64>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT eg.event_id FROM event_genres eg
             JOIN genres g ON g.id = eg.genre_id
             WHERE g.name IN ({}) ORDER BY eg.event_id",
            placeholders(names.len())
        );
        self.query_ids(&sql, names)
    }

    /// Ids of events whose name or description contains `text`, ignoring case.
    /// A blank `text` matches nothing.
    pub fn get_event_ids_with_keyword(&self, text: &str) -> rusqlite::Result<Vec<i64>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.query_ids(
            "SELECT id FROM events
             WHERE instr(lower(name), lower(?1)) > 0
                OR instr(lower(coalesce(description, '')), lower(?1)) > 0
             ORDER BY id",
            [text.trim()],
        )
    }

    /// Ids of events tagged with none of `names`.
    pub fn get_event_ids_excluding_genres(&self, names: &[String]) -> rusqlite::Result<Vec<i64>> {
        if names.is_empty() {
            return self.query_ids("SELECT id FROM events ORDER BY id", [] as [&str; 0]);
        }
        let sql = format!(
            "SELECT id FROM events WHERE id NOT IN (
                SELECT eg.event_id FROM event_genres eg
                JOIN genres g ON g.id = eg.genre_id
                WHERE g.name IN ({})
             ) ORDER BY id",
            placeholders(names.len())
        );
        self.query_ids(&sql, names)
    }

    pub fn get_event_ids_by_organizer(&self, organizer_id: i64) -> rusqlite::Result<Vec<i64>> {
        self.query_ids(
            "SELECT id FROM events WHERE organizer_id = ?1 ORDER BY id",
            [organizer_id],
        )
    }

    pub fn count_events(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
    }

    pub fn insert_event(&self, event: &NewEvent) -> rusqlite::Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO events (organizer_id, name, description, location, start_date_time, end_date_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.organizer_id,
                event.name,
                event.description,
                event.location,
                event.dates.start_date_time,
                event.dates.end_date_time
            ],
        )?;
        let event_id = tx.last_insert_rowid();

        for name in &event.genres {
            tx.execute(
                "INSERT OR IGNORE INTO genres (name) VALUES (?1)",
                params![name],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO event_genres (event_id, genre_id)
                 SELECT ?1, id FROM genres WHERE name = ?2",
                params![event_id, name],
            )?;
        }

        for image in &event.images {
            tx.execute(
                "INSERT INTO event_images (event_id, ratio, width, height, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![event_id, image.ratio, image.width, image.height, image.url],
            )?;
        }

        for range in &event.price_ranges {
            tx.execute(
                "INSERT INTO event_price_ranges (event_id, currency, min, max)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(event_id, currency) DO UPDATE SET
                   min = MIN(min, excluded.min),
                   max = MAX(max, excluded.max)",
                params![event_id, range.currency, range.min, range.max],
            )?;
        }

        tx.commit()?;
        Ok(event_id)
    }

    /// Inserts a few sample events when the events table is empty.
    /// Returns how many were inserted.
    pub fn seed_if_empty(&self) -> rusqlite::Result<usize> {
        if self.count_events()? > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let samples = vec![
            sample_event("Campus Jazz Night", "Jazz", now + ChronoDuration::days(2)),
            sample_event("Spring Hackathon", "Technology", now + ChronoDuration::days(9)),
            sample_event("Intramural Finals", "Sports", now + ChronoDuration::days(16)),
        ];

        for event in &samples {
            self.insert_event(event)?;
        }

        Ok(samples.len())
    }

    fn query_ids<P>(&self, sql: &str, values: P) -> rusqlite::Result<Vec<i64>>
    where
        P: IntoIterator,
        P::Item: rusqlite::ToSql,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| row.get(0))?;
        rows.collect()
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn sample_event(name: &str, genre: &str, start: DateTime<Utc>) -> NewEvent {
    NewEvent {
        organizer_id: Some(1),
        name: name.to_string(),
        description: Some(format!("Sample {} event", genre.to_lowercase())),
        location: Some("Student Union ─ Boise, ID".to_string()),
        dates: EventDates {
            start_date_time: Some(start),
            end_date_time: Some(start + ChronoDuration::hours(3)),
        },
        price_ranges: vec![PriceRange::new("USD", 0.0, 15.0)],
        genres: vec![genre.to_string()],
        images: Vec::new(),
    }
}

/// Bounded pool of SQLite connections to one database file.
///
/// Each query checks a connection out for its own duration only; r2d2 puts
/// it back when the guard drops, whether the query succeeded or not.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: Pool<SqliteConnectionManager>,
}

impl ConnectionPool {
    /// Opens the database at `path`, creating the schema if needed.
    pub fn open(path: &Path, size: usize) -> Result<Self, StorageError> {
        utils::ensure_parent(path);
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(u32::try_from(size.max(1)).unwrap_or(u32::MAX))
            .connection_timeout(CHECKOUT_TIMEOUT)
            .build(manager)?;
        init_schema(&*pool.get()?)?;
        Ok(Self { pool })
    }

    /// Runs `query` against a pooled connection on the blocking thread pool.
    pub async fn with_store<F, T>(&self, query: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Store<'_>) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let conn = pool.get()?;
            Ok(query(&Store::new(&conn))?)
        })
        .await
        .map_err(|err| StorageError::Task(err.to_string()))?
    }
}
