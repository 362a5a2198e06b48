use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "transcripts.sqlite3";

pub const KEY_STUDENTS: &str = "students";
pub const KEY_TRANSCRIPTS: &str = "transcripts";
pub const KEY_SETTINGS: &str = "settings";

/// Key-value snapshot store over SQLite. Each collection is one JSON array
/// under one key, read wholesale at workspace open and rewritten wholesale
/// after every mutation.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(workspace: &Path) -> anyhow::Result<Store> {
        std::fs::create_dir_all(workspace)
            .with_context(|| format!("failed to create workspace {}", workspace.display()))?;
        let path = workspace.join(DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Store { conn })
    }

    pub fn get_collection<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Vec<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        match raw {
            Some(text) => serde_json::from_str(&text)
                .with_context(|| format!("stored collection '{}' is invalid JSON", key)),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_collection<T: Serialize>(&self, key: &str, items: &[T]) -> anyhow::Result<()> {
        let text = serde_json::to_string(items)?;
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, &text),
        )?;
        Ok(())
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text).with_context(|| {
                format!("stored value '{}' is invalid JSON", key)
            })?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, &text),
        )?;
        Ok(())
    }
}
