use crate::challenge::{self, Challenge, Difficulty};
use crate::session::AttemptResult;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::path::Path;

pub type UserId = String;

/// Opaque store failure surfaced to the host. A failed insert never loses the
/// attempt; the session keeps its result so the host can resubmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "not found"),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Read side of the challenge catalog.
pub trait ChallengeStore {
    fn fetch_challenge(&self, id: &str) -> Result<Challenge, StoreError>;
    fn list_challenges(&self) -> Result<Vec<Challenge>, StoreError>;
}

/// Write/read side of attempt history.
pub trait AttemptStore {
    fn insert_attempt(&self, user_id: &str, result: &AttemptResult) -> Result<(), StoreError>;
    fn attempts_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>, StoreError>;
}

/// One persisted attempt row, newest first when listed.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub user_id: UserId,
    pub challenge_id: String,
    pub wpm: u32,
    pub accuracy_percent: u8,
    pub elapsed_secs: u32,
    pub completed: bool,
    pub created_at: DateTime<Local>,
}

/// Local sqlite-backed store for challenges and attempts.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at the default platform path.
    pub fn open_default() -> Result<Self, StoreError> {
        let db_path = crate::app_dirs::db_path()
            .ok_or_else(|| StoreError::Backend("no usable data directory".to_string()))?;
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("failed to create directory: {}", e)))?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS challenges (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                language TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                code TEXT NOT NULL,
                description TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS challenge_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                challenge_id TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                time_seconds INTEGER NOT NULL,
                completed BOOLEAN NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_user ON challenge_attempts(user_id)",
            [],
        )?;

        let store = SqliteStore { conn };
        store.seed_if_empty()?;
        Ok(store)
    }

    /// Populate the catalog with the embedded challenge set on first open.
    fn seed_if_empty(&self) -> Result<(), StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM challenges", [], |row| row.get(0))?;
        if count == 0 {
            for challenge in challenge::seed_challenges() {
                self.upsert_challenge(&challenge)?;
            }
        }
        Ok(())
    }

    pub fn upsert_challenge(&self, challenge: &Challenge) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO challenges (id, title, language, difficulty, code, description)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                language = excluded.language,
                difficulty = excluded.difficulty,
                code = excluded.code,
                description = excluded.description
            "#,
            params![
                challenge.id,
                challenge.title,
                challenge.language,
                challenge.difficulty.to_string(),
                challenge.code,
                challenge.description,
            ],
        )?;
        Ok(())
    }

    fn challenge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Challenge> {
        let difficulty: String = row.get("difficulty")?;
        Ok(Challenge {
            id: row.get("id")?,
            title: row.get("title")?,
            language: row.get("language")?,
            // unrecognized difficulty strings degrade to the default limit
            difficulty: difficulty
                .parse::<Difficulty>()
                .unwrap_or(Difficulty::Unknown),
            code: row.get("code")?,
            description: row.get("description")?,
        })
    }
}

impl ChallengeStore for SqliteStore {
    fn fetch_challenge(&self, id: &str) -> Result<Challenge, StoreError> {
        let challenge = self
            .conn
            .query_row(
                "SELECT id, title, language, difficulty, code, description
                 FROM challenges WHERE id = ?1",
                params![id],
                Self::challenge_from_row,
            )
            .optional()?;
        challenge.ok_or(StoreError::NotFound)
    }

    fn list_challenges(&self) -> Result<Vec<Challenge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, language, difficulty, code, description
             FROM challenges ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::challenge_from_row)?;
        let mut challenges = Vec::new();
        for row in rows {
            challenges.push(row?);
        }
        Ok(challenges)
    }
}

impl AttemptStore for SqliteStore {
    fn insert_attempt(&self, user_id: &str, result: &AttemptResult) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO challenge_attempts
            (user_id, challenge_id, wpm, accuracy, time_seconds, completed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                user_id,
                result.challenge_id,
                result.wpm,
                result.accuracy_percent,
                result.elapsed_secs,
                result.completed,
                Local::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn attempts_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, challenge_id, wpm, accuracy, time_seconds, completed, created_at
             FROM challenge_attempts WHERE user_id = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let created_at: String = row.get("created_at")?;
            Ok(AttemptRecord {
                user_id: row.get("user_id")?,
                challenge_id: row.get("challenge_id")?,
                wpm: row.get("wpm")?,
                accuracy_percent: row.get("accuracy")?,
                elapsed_secs: row.get("time_seconds")?,
                completed: row.get("completed")?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Local))
                    .unwrap_or_else(|_| Local::now()),
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
