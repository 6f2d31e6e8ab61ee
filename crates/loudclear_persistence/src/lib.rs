use anyhow::Result;
use log::debug;
use loudclear_core::{Accessibility, ProgressStore, UserProgress};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 进度记录在 kv 表中的固定键
pub const PROGRESS_KEY: &str = "asl-learning-progress";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed progress record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// 数据库管理器
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 创建或打开数据库
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// 使用默认路径创建数据库
    pub fn default() -> Result<Self> {
        let data_dir = Self::get_data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join("loudclear.db");
        Self::new(db_path)
    }

    /// 获取数据目录路径
    pub fn get_data_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home).join(".loudclear").join("data"))
    }

    /// 初始化数据库表
    fn initialize(&self) -> Result<()> {
        // 进度记录（单条 JSON）
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        // 练习历史
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS practice_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_index INTEGER NOT NULL,
                lesson_word TEXT NOT NULL,
                accuracy INTEGER NOT NULL,
                session_score INTEGER NOT NULL,
                stars_awarded INTEGER NOT NULL,
                completed_at INTEGER NOT NULL
            )",
            [],
        )?;

        // 配置表
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practice_completed_at ON practice_sessions(completed_at)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_practice_lesson_word ON practice_sessions(lesson_word)",
            [],
        )?;

        Ok(())
    }

    /// 读取进度记录
    pub fn load_progress(&self) -> Result<Option<UserProgress>, PersistenceError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![PROGRESS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let mut progress: UserProgress = serde_json::from_str(&json)?;
                progress.normalize();
                Ok(Some(progress))
            }
            None => Ok(None),
        }
    }

    /// 整体覆盖进度记录
    pub fn save_progress(&self, progress: &UserProgress) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(progress)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![PROGRESS_KEY, json],
        )?;
        debug!("💾 保存进度: {} 字节", json.len());
        Ok(())
    }

    /// 保存练习记录
    pub fn save_practice(&self, record: &PracticeRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO practice_sessions (
                lesson_index, lesson_word, accuracy, session_score, stars_awarded, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.lesson_index as i64,
                &record.lesson_word,
                record.accuracy,
                record.session_score,
                record.stars_awarded,
                record.completed_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// 获取最近的练习记录
    pub fn get_recent_practice(&self, limit: usize) -> Result<Vec<PracticeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lesson_index, lesson_word, accuracy, session_score, stars_awarded, completed_at
             FROM practice_sessions
             ORDER BY completed_at DESC, id DESC
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map([limit as i64], PracticeRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 获取指定手语词汇的练习历史
    pub fn get_lesson_practice(&self, word: &str, limit: usize) -> Result<Vec<PracticeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lesson_index, lesson_word, accuracy, session_score, stars_awarded, completed_at
             FROM practice_sessions
             WHERE lesson_word = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2",
        )?;

        let records = stmt
            .query_map(params![word, limit as i64], PracticeRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 获取所有时间的练习统计
    pub fn get_practice_stats(&self) -> Result<PracticeStats> {
        let mut stmt = self.conn.prepare(
            "SELECT
                COUNT(*) as total_sessions,
                AVG(accuracy) as avg_accuracy,
                MAX(accuracy) as best_accuracy
             FROM practice_sessions",
        )?;

        let stats = stmt.query_row([], |row| {
            Ok(PracticeStats {
                total_sessions: row.get(0)?,
                avg_accuracy: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                best_accuracy: row.get::<_, Option<u8>>(2)?.unwrap_or(0),
            })
        })?;

        Ok(stats)
    }
}

impl ProgressStore for Database {
    fn load(&self) -> Result<Option<UserProgress>> {
        Ok(self.load_progress()?)
    }

    fn save(&self, progress: &UserProgress) -> Result<()> {
        Ok(self.save_progress(progress)?)
    }
}

/// 练习记录
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeRecord {
    pub id: i64,
    pub lesson_index: usize,
    pub lesson_word: String,
    pub accuracy: u8,
    pub session_score: u8,
    pub stars_awarded: u32,
    pub completed_at: i64,
}

impl PracticeRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lesson_index: row.get::<_, i64>(1)? as usize,
            lesson_word: row.get(2)?,
            accuracy: row.get(3)?,
            session_score: row.get(4)?,
            stars_awarded: row.get(5)?,
            completed_at: row.get(6)?,
        })
    }
}

/// 练习总体统计
#[derive(Debug, Clone)]
pub struct PracticeStats {
    pub total_sessions: i64,
    pub avg_accuracy: f64,
    pub best_accuracy: u8,
}

impl Database {
    /// 保存配置项
    pub fn save_config(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取配置项
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// 读取无障碍设置，缺失项视为关闭
    pub fn load_accessibility(&self) -> Result<Accessibility> {
        let flag = |key: &str| -> Result<bool> {
            Ok(self.get_config(key)?.as_deref() == Some("true"))
        };
        Ok(Accessibility {
            high_contrast: flag("high_contrast")?,
            reduced_motion: flag("reduced_motion")?,
        })
    }

    /// 保存无障碍设置
    pub fn save_accessibility(&self, settings: &Accessibility) -> Result<()> {
        self.save_config("high_contrast", &settings.high_contrast.to_string())?;
        self.save_config("reduced_motion", &settings.reduced_motion.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn record(word: &str, accuracy: u8, completed_at: i64) -> PracticeRecord {
        PracticeRecord {
            id: 0,
            lesson_index: 0,
            lesson_word: word.to_string(),
            accuracy,
            session_score: accuracy / 10,
            stars_awarded: if accuracy >= 85 { 15 } else { 8 },
            completed_at,
        }
    }

    #[test]
    fn test_database_creation() {
        let db = Database::new(":memory:").unwrap();
        assert!(db.load_progress().unwrap().is_none());
        let stats = db.get_practice_stats().unwrap();
        assert_eq!(stats.total_sessions, 0);
    }

    #[test]
    fn test_progress_round_trip() {
        let db = Database::new(":memory:").unwrap();

        let progress = UserProgress {
            signs_learned: 4,
            streak: 2,
            total_stars: 93,
            total_days: 5,
            average_accuracy: 85,
            current_lesson: 3,
            unlocked_achievements: vec!["first-sign".into(), "hello-world".into()],
            practice_scores: vec![8, 9],
            last_visit: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..Default::default()
        };

        db.save(&progress).unwrap();
        let loaded = db.load().unwrap().unwrap();
        assert_eq!(loaded, progress);

        // 再次保存覆盖旧记录
        let mut updated = loaded.clone();
        updated.total_stars += 10;
        db.save(&updated).unwrap();
        assert_eq!(db.load().unwrap().unwrap().total_stars, 103);
    }

    #[test]
    fn test_partial_record_backfilled() {
        let db = Database::new(":memory:").unwrap();
        db.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)",
                params![PROGRESS_KEY, r#"{"signsLearned":2,"practiceScores":[7,8,9]}"#],
            )
            .unwrap();

        let loaded = db.load_progress().unwrap().unwrap();
        assert_eq!(loaded.signs_learned, 2);
        assert_eq!(loaded.average_accuracy, 80);
        assert!(loaded.unlocked_achievements.is_empty());
        assert_eq!(loaded.last_visit, None);
    }

    #[test]
    fn test_malformed_record() {
        let db = Database::new(":memory:").unwrap();
        db.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, 'not json')",
                params![PROGRESS_KEY],
            )
            .unwrap();
        assert!(matches!(
            db.load_progress(),
            Err(PersistenceError::Malformed(_))
        ));
    }

    #[test]
    fn test_save_and_retrieve_practice() {
        let db = Database::new(":memory:").unwrap();
        let now = Utc::now().timestamp();

        let id = db.save_practice(&record("Hello", 92, now - 20)).unwrap();
        assert!(id > 0);
        db.save_practice(&record("Hello", 74, now - 10)).unwrap();
        db.save_practice(&record("Water", 88, now)).unwrap();

        let recent = db.get_recent_practice(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].lesson_word, "Water");
        assert_eq!(recent[1].accuracy, 74);

        let hello = db.get_lesson_practice("Hello", 10).unwrap();
        assert_eq!(hello.len(), 2);
        assert_eq!(hello[1].session_score, 9);

        let stats = db.get_practice_stats().unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.best_accuracy, 92);
        assert!((stats.avg_accuracy - 84.666).abs() < 0.01);
    }

    #[test]
    fn test_accessibility_settings() {
        let db = Database::new(":memory:").unwrap();
        assert_eq!(db.load_accessibility().unwrap(), Accessibility::default());

        let settings = Accessibility {
            high_contrast: true,
            reduced_motion: false,
        };
        db.save_accessibility(&settings).unwrap();
        assert_eq!(db.load_accessibility().unwrap(), settings);
        assert_eq!(db.get_config("high_contrast").unwrap().as_deref(), Some("true"));
    }
}
