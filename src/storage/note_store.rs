use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{NewNote, Note, NoteType, NoteUpdate};
use crate::error::Result;

const NOTES_DB: &str = "notes.db";
const SCHEMA_VERSION: &str = "1";

const NOTE_COLUMNS: &str =
    "id, title, content, note_type, recorded_time, timestamp, is_favorite, image_url";

/// SQLite-backed persistence for notes.
///
/// Every mutating method is a single statement, so each per-record operation
/// is atomic without extra locking. Concurrent writers to the same note are
/// last-write-wins.
pub struct NoteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl NoteStore {
    /// Open or create the notes database inside `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(NOTES_DB);
        let conn = Connection::open(&path)?;

        let store = Self {
            conn,
            path: Some(path),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a throwaway database that lives only as long as the store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, path: None };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                note_type TEXT NOT NULL CHECK (note_type IN ('text', 'audio')),
                recorded_time INTEGER NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                image_url TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes(timestamp)",
            [],
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            [SCHEMA_VERSION],
        )?;

        Ok(())
    }

    pub fn schema_version(&self) -> Result<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    /// Persist a new note, assigning its id and creation timestamp
    pub fn insert(&self, new: NewNote) -> Result<Note> {
        // Truncated so the returned value matches what a later read yields.
        let note = Note {
            id: Uuid::new_v4(),
            title: new.title,
            content: new.content,
            note_type: new.note_type,
            recorded_time: new.recorded_time,
            timestamp: Utc::now().trunc_subsecs(6),
            is_favorite: false,
            image_url: None,
        };

        self.conn.execute(
            "INSERT INTO notes
             (id, title, content, note_type, recorded_time, timestamp, is_favorite, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.note_type.to_string(),
                note.recorded_time as i64,
                format_timestamp(&note.timestamp),
                note.is_favorite,
                note.image_url,
            ],
        )?;

        Ok(note)
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id.to_string()],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// All notes, most recent first. Notes created within the same
    /// microsecond keep insertion order (newer first).
    pub fn list_recent(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY timestamp DESC, rowid DESC"
        ))?;

        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Apply title/content changes. Returns `None` when the note does not exist.
    pub fn update(&self, id: &Uuid, update: &NoteUpdate) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!(
                    "UPDATE notes
                     SET title = COALESCE(?2, title), content = COALESCE(?3, content)
                     WHERE id = ?1
                     RETURNING {NOTE_COLUMNS}"
                ),
                params![id.to_string(), update.title, update.content],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Flip `is_favorite` in place and return the result
    pub fn toggle_favorite(&self, id: &Uuid) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!(
                    "UPDATE notes SET is_favorite = NOT is_favorite
                     WHERE id = ?1
                     RETURNING {NOTE_COLUMNS}"
                ),
                [id.to_string()],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    pub fn set_image_url(&self, id: &Uuid, image_url: &str) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!(
                    "UPDATE notes SET image_url = ?2
                     WHERE id = ?1
                     RETURNING {NOTE_COLUMNS}"
                ),
                params![id.to_string(), image_url],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Remove a note. Returns whether a row was actually deleted.
    pub fn delete(&self, id: &Uuid) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;
        Ok(removed > 0)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    // Fixed-width so lexical order in SQL equals chronological order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    let note_type: String = row.get(3)?;
    let recorded_time: i64 = row.get(4)?;
    let timestamp: String = row.get(5)?;

    Ok(Note {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        title: row.get(1)?,
        content: row.get(2)?,
        note_type: note_type
            .parse::<NoteType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?,
        recorded_time: recorded_time.max(0) as u64,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
            .with_timezone(&Utc),
        is_favorite: row.get(6)?,
        image_url: row.get(7)?,
    })
}
