//! On-device guest store, backed by sqlite.
//!
//! Roadmaps created without a signed-in identity live here. Ids are
//! `local_<millis>` and rows keep insertion order (rowid).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{Difficulty, RoadmapDraft, RoadmapId, SavedContent, SavedRoadmap};

const SCHEMA: &str = include_str!("migrations/001_initial.sql");

#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Persistence("database path has no parent directory".into()))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "skilltrail")
            .ok_or_else(|| Error::Persistence("could not determine data directory".into()))?;
        Self::open(dirs.data_dir().join("skilltrail.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a roadmap, minting a fresh time-based local id.
    ///
    /// Two saves inside the same millisecond would mint the same id, so the
    /// timestamp is bumped until the id is free. Ids still sort in creation
    /// order.
    pub fn insert(&self, draft: &RoadmapDraft) -> Result<RoadmapId> {
        let now = Utc::now();
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut millis = now.timestamp_millis();
        let id = loop {
            let candidate = RoadmapId::Local(format!("local_{millis}"));
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM roadmaps WHERE id = ?1",
                    [candidate.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_none() {
                break candidate;
            }
            millis += 1;
        };
        conn.execute(
            "INSERT INTO roadmaps (id, topic, goal, difficulty, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.as_str(),
                draft.topic,
                draft.goal,
                draft.difficulty.as_str(),
                serde_json::to_string(&draft.content)?,
                now.to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    pub fn get(&self, id: &RoadmapId) -> Result<Option<SavedRoadmap>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.query_row(
            "SELECT id, topic, goal, difficulty, content, created_at
             FROM roadmaps WHERE id = ?1",
            [id.as_str()],
            row_to_roadmap,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All local roadmaps, in insertion order.
    pub fn list(&self) -> Result<Vec<SavedRoadmap>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, topic, goal, difficulty, content, created_at
             FROM roadmaps ORDER BY rowid",
        )?;
        let roadmaps = stmt
            .query_map([], row_to_roadmap)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(roadmaps)
    }

    pub fn rename(&self, id: &RoadmapId, new_topic: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let changed = conn.execute(
            "UPDATE roadmaps SET topic = ?1 WHERE id = ?2",
            params![new_topic, id.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn delete(&self, id: &RoadmapId) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute("DELETE FROM roadmaps WHERE id = ?1", [id.as_str()])?;
        Ok(())
    }
}

fn row_to_roadmap(row: &rusqlite::Row<'_>) -> rusqlite::Result<SavedRoadmap> {
    let content: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(SavedRoadmap {
        id: RoadmapId::parse(&row.get::<_, String>(0)?),
        topic: row.get(1)?,
        goal: row.get(2)?,
        difficulty: Difficulty::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(Difficulty::Beginner),
        content: serde_json::from_str::<SavedContent>(&content).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
