use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{AikenError, Result};

// ============ Typed Records ============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: String,
    pub display_name: String,
    pub sort_order: i64,
}

/// A preset question as presented to the UI: the button label plus the id
/// of the knowledge record it resolves to.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PresetQuestion {
    pub question_text: String,
    pub knowledge_id: i64,
}

/// One fact statement of a knowledge record, joined with the parent
/// record's `success_title`. Facts are ordered by `sort_order`; the order
/// carries the narrative arc (context, success reasoning, failure anecdote)
/// and must reach the prompt builder untouched.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KnowledgeFact {
    pub id: i64,
    pub knowledge_id: i64,
    pub fact_type: String,
    pub experience_flag: ExperienceFlag,
    pub fact_text: String,
    pub sort_order: i64,
    pub success_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceFlag {
    Positive,
    Negative,
}

impl ExperienceFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceFlag::Positive => "positive",
            ExperienceFlag::Negative => "negative",
        }
    }

    pub fn from_str(s: &str) -> Option<ExperienceFlag> {
        match s.to_lowercase().as_str() {
            "positive" => Some(ExperienceFlag::Positive),
            "negative" => Some(ExperienceFlag::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Goal {
    pub user_id: String,
    pub category_id: String,
    pub goal_key: String,
    pub status: GoalStatus,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    Completed,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "not_started",
            GoalStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<GoalStatus> {
        match s {
            "not_started" => Some(GoalStatus::NotStarted),
            "completed" => Some(GoalStatus::Completed),
            _ => None,
        }
    }
}

// ============ Schema ============

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS knowledge_records (
    id INTEGER PRIMARY KEY,
    category_id TEXT NOT NULL REFERENCES categories(id),
    preset_question TEXT NOT NULL,
    success_title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS knowledge_facts (
    id INTEGER PRIMARY KEY,
    knowledge_id INTEGER NOT NULL REFERENCES knowledge_records(id),
    fact_type TEXT NOT NULL,
    experience_flag TEXT NOT NULL DEFAULT 'positive',
    fact_text TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_goals (
    user_id TEXT NOT NULL REFERENCES users(id),
    category_id TEXT NOT NULL REFERENCES categories(id),
    goal_key TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'not_started'
        CHECK (status IN ('not_started', 'completed')),
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, category_id, goal_key)
);

CREATE INDEX IF NOT EXISTS idx_records_category ON knowledge_records(category_id);
CREATE INDEX IF NOT EXISTS idx_facts_knowledge ON knowledge_facts(knowledge_id);
"#;

// ============ Seed Data ============

/// Bootstrap payload: one object per entity row, read once at startup.
/// Every insert is `INSERT OR IGNORE`, so re-running bootstrap against an
/// already-populated store neither duplicates rows nor fails.
#[derive(Debug, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub records: Vec<SeedRecord>,
    #[serde(default)]
    pub facts: Vec<SeedFact>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub id: String,
    pub display_name: String,
    pub sort_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct SeedRecord {
    pub id: i64,
    pub category_id: String,
    pub preset_question: String,
    pub success_title: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedFact {
    pub id: i64,
    pub knowledge_id: i64,
    pub fact_type: String,
    pub experience_flag: String,
    pub fact_text: String,
    pub sort_order: i64,
}

// ============ Database ============

/// Knowledge Store handle. Owns its connection; callers pass the handle
/// around explicitly rather than going through a module-level singleton.
/// Each logical operation acquires the connection for its whole duration
/// via `with_conn` and releases it on every exit path.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn).map_err(AikenError::from)
    }

    // ============ Bootstrap ============

    /// Load seed data from a JSON file and insert it. A malformed seed file
    /// is a startup configuration problem, not a store failure.
    pub fn bootstrap_from_file(&self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AikenError::Configuration(format!("cannot read seed file {}: {}", path.display(), e))
        })?;
        let seed: SeedData = serde_json::from_str(&raw).map_err(|e| {
            AikenError::Configuration(format!("malformed seed file {}: {}", path.display(), e))
        })?;
        self.bootstrap(&seed)
    }

    pub fn bootstrap(&self, seed: &SeedData) -> Result<()> {
        // Validate flags up front so a typo fails loudly at startup instead
        // of silently reading back as 'positive' later.
        for fact in &seed.facts {
            if ExperienceFlag::from_str(&fact.experience_flag).is_none() {
                return Err(AikenError::Configuration(format!(
                    "seed fact {} has unknown experience_flag '{}'",
                    fact.id, fact.experience_flag
                )));
            }
        }

        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            for user in &seed.users {
                tx.execute(
                    "INSERT OR IGNORE INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                    params![user.id, user.display_name, now],
                )?;
            }

            for cat in &seed.categories {
                tx.execute(
                    "INSERT OR IGNORE INTO categories (id, display_name, sort_order) VALUES (?1, ?2, ?3)",
                    params![cat.id, cat.display_name, cat.sort_order],
                )?;
            }

            for rec in &seed.records {
                tx.execute(
                    "INSERT OR IGNORE INTO knowledge_records (id, category_id, preset_question, success_title)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![rec.id, rec.category_id, rec.preset_question, rec.success_title],
                )?;
            }

            for fact in &seed.facts {
                tx.execute(
                    "INSERT OR IGNORE INTO knowledge_facts (id, knowledge_id, fact_type, experience_flag, fact_text, sort_order)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        fact.id,
                        fact.knowledge_id,
                        fact.fact_type,
                        fact.experience_flag.to_lowercase(),
                        fact.fact_text,
                        fact.sort_order
                    ],
                )?;
            }

            tx.commit()?;
            Ok(())
        })?;

        tracing::info!(
            users = seed.users.len(),
            categories = seed.categories.len(),
            records = seed.records.len(),
            facts = seed.facts.len(),
            "seed bootstrap complete"
        );
        Ok(())
    }

    // ============ Users ============

    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, display_name, created_at FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Create the user if missing; an existing row is left untouched.
    pub fn ensure_user(&self, user_id: &str, display_name: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, display_name, now],
            )?;
            Ok(())
        })
    }

    // ============ Categories & Presets ============

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, display_name, sort_order FROM categories ORDER BY sort_order ASC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    sort_order: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }

    /// Preset questions for one category. An empty result is a valid state
    /// (category has no presets yet), not an error.
    pub fn list_preset_questions(&self, category_id: &str) -> Result<Vec<PresetQuestion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT preset_question, id FROM knowledge_records WHERE category_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![category_id], |row| {
                Ok(PresetQuestion {
                    question_text: row.get(0)?,
                    knowledge_id: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    /// The stored button label for one knowledge record.
    pub fn get_preset_question(&self, knowledge_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT preset_question FROM knowledge_records WHERE id = ?1",
                params![knowledge_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// All facts for one knowledge record, in stored order, each joined
    /// with the record's success_title. An unknown id yields an empty vec;
    /// callers treat empty as "not found" and degrade to the apology reply.
    pub fn get_knowledge_facts(&self, knowledge_id: i64) -> Result<Vec<KnowledgeFact>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT f.id, f.knowledge_id, f.fact_type, f.experience_flag, f.fact_text, f.sort_order, r.success_title
                 FROM knowledge_facts f
                 JOIN knowledge_records r ON r.id = f.knowledge_id
                 WHERE f.knowledge_id = ?1
                 ORDER BY f.sort_order ASC",
            )?;
            let rows = stmt.query_map(params![knowledge_id], |row| {
                let flag: String = row.get(3)?;
                Ok(KnowledgeFact {
                    id: row.get(0)?,
                    knowledge_id: row.get(1)?,
                    fact_type: row.get(2)?,
                    experience_flag: ExperienceFlag::from_str(&flag)
                        .unwrap_or(ExperienceFlag::Positive),
                    fact_text: row.get(4)?,
                    sort_order: row.get(5)?,
                    success_title: row.get(6)?,
                })
            })?;
            rows.collect()
        })
    }

    // ============ Goals ============

    /// Goals for one (user, category) pair, lazily materialized: the first
    /// request seeds one row per known preset question in the category,
    /// defaulted to not_started. The seed uses `INSERT OR IGNORE` so a
    /// concurrent first-time caller racing on the same pair cannot fail on
    /// duplicate keys.
    pub fn get_user_goals(&self, user_id: &str, category_id: &str) -> Result<Vec<Goal>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM user_goals WHERE user_id = ?1 AND category_id = ?2",
                params![user_id, category_id],
                |row| row.get(0),
            )?;

            if existing == 0 {
                let now = Utc::now().to_rfc3339();
                let questions: Vec<String> = {
                    let mut stmt = tx.prepare(
                        "SELECT preset_question FROM knowledge_records WHERE category_id = ?1 ORDER BY id ASC",
                    )?;
                    let rows = stmt.query_map(params![category_id], |row| row.get(0))?;
                    rows.collect::<rusqlite::Result<Vec<String>>>()?
                };
                for question in &questions {
                    tx.execute(
                        "INSERT OR IGNORE INTO user_goals (user_id, category_id, goal_key, status, updated_at)
                         VALUES (?1, ?2, ?3, 'not_started', ?4)",
                        params![user_id, category_id, question, now],
                    )?;
                }
            }

            let goals = {
                let mut stmt = tx.prepare(
                    "SELECT user_id, category_id, goal_key, status, updated_at
                     FROM user_goals
                     WHERE user_id = ?1 AND category_id = ?2
                     ORDER BY goal_key ASC",
                )?;
                let rows = stmt.query_map(params![user_id, category_id], |row| {
                    let status: String = row.get(3)?;
                    Ok(Goal {
                        user_id: row.get(0)?,
                        category_id: row.get(1)?,
                        goal_key: row.get(2)?,
                        status: GoalStatus::from_str(&status).unwrap_or(GoalStatus::NotStarted),
                        updated_at: row.get(4)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<Goal>>>()?
            };

            tx.commit()?;
            Ok(goals)
        })
    }

    /// Unconditional status update. A missing row is a no-op, not an error.
    pub fn set_goal_status(&self, user_id: &str, goal_key: &str, status: GoalStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.with_conn(|conn| {
            conn.execute(
                "UPDATE user_goals SET status = ?1, updated_at = ?2 WHERE user_id = ?3 AND goal_key = ?4",
                params![status.as_str(), now, user_id, goal_key],
            )
        })?;
        if updated == 0 {
            tracing::debug!(user_id, goal_key, "set_goal_status matched no rows");
        }
        Ok(())
    }
}

// ============ Tests ============
