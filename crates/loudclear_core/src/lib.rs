use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 难度等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// 课程定义：一个手语词汇
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    /// 排序键，同时用于用户课程覆盖内置课程
    pub id: u32,
    pub word: String,
    pub description: String,
    /// 展示用的符号（emoji）
    pub glyph: String,
    pub difficulty: Difficulty,
    pub category: String,
}

/// 成就判定类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    SignsLearned,
    Streak,
    Stars,
    PracticeSessions,
    Accuracy,
}

impl AchievementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::SignsLearned => "signs_learned",
            AchievementKind::Streak => "streak",
            AchievementKind::Stars => "stars",
            AchievementKind::PracticeSessions => "practice_sessions",
            AchievementKind::Accuracy => "accuracy",
        }
    }
}

/// 成就定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub requirement: u32,
    pub kind: AchievementKind,
}

impl Achievement {
    /// 当前进度是否满足该成就的条件
    pub fn is_satisfied_by(&self, progress: &UserProgress) -> bool {
        let value = match self.kind {
            AchievementKind::SignsLearned => progress.signs_learned,
            AchievementKind::Streak => progress.streak,
            AchievementKind::Stars => progress.total_stars,
            AchievementKind::PracticeSessions => progress.practice_sessions() as u32,
            AchievementKind::Accuracy => progress.average_accuracy,
        };
        value >= self.requirement
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("Lesson catalog is empty")]
    NoLessons,

    #[error("Duplicate lesson id: {0}")]
    DuplicateLesson(u32),

    #[error("Duplicate achievement id: {0}")]
    DuplicateAchievement(String),
}

/// 有序课程目录，顺序决定学习路径
#[derive(Debug, Clone)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
}

impl LessonCatalog {
    pub fn new(lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        if lessons.is_empty() {
            return Err(CatalogError::NoLessons);
        }
        let mut seen = HashSet::new();
        for lesson in &lessons {
            if !seen.insert(lesson.id) {
                return Err(CatalogError::DuplicateLesson(lesson.id));
            }
        }
        Ok(Self { lessons })
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Lesson> {
        self.lessons.get(index)
    }

    pub fn last_index(&self) -> usize {
        self.lessons.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter()
    }
}

/// 成就目录，按声明顺序评估
#[derive(Debug, Clone, Default)]
pub struct AchievementCatalog {
    achievements: Vec<Achievement>,
}

impl AchievementCatalog {
    pub fn new(achievements: Vec<Achievement>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for achievement in &achievements {
            if !seen.insert(achievement.id.as_str()) {
                return Err(CatalogError::DuplicateAchievement(achievement.id.clone()));
            }
        }
        Ok(Self { achievements })
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.iter()
    }
}

/// 用户进度记录（整体作为一条记录持久化）
///
/// 缺失字段在反序列化时取默认值，旧记录因此可以直接补齐新字段。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProgress {
    pub signs_learned: u32,
    pub streak: u32,
    pub total_stars: u32,
    pub total_days: u32,
    pub total_time: u32,
    pub average_accuracy: u32,
    pub current_lesson: usize,
    pub unlocked_achievements: Vec<String>,
    pub practice_scores: Vec<u8>,
    pub last_visit: Option<NaiveDate>,
}

impl UserProgress {
    pub fn is_unlocked(&self, achievement_id: &str) -> bool {
        self.unlocked_achievements.iter().any(|id| id == achievement_id)
    }

    pub fn practice_sessions(&self) -> usize {
        self.practice_scores.len()
    }

    /// 所有练习得分之和
    pub fn practice_total(&self) -> u32 {
        self.practice_scores.iter().map(|&s| s as u32).sum()
    }

    /// round(mean(practice_scores) * 10)，没有练习时为 0
    pub fn recompute_average_accuracy(&mut self) {
        let count = self.practice_scores.len() as u64;
        self.average_accuracy = if count == 0 {
            0
        } else {
            // 整数运算的四舍五入：(20 * sum + n) / (2 * n)
            let sum: u64 = self.practice_scores.iter().map(|&s| s as u64).sum();
            ((20 * sum + count) / (2 * count)) as u32
        };
    }

    /// 加载后修正：去掉重复的成就 id，并重新计算平均准确率
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.unlocked_achievements.retain(|id| seen.insert(id.clone()));
        self.recompute_average_accuracy();
    }
}

/// 单次练习结果
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeOutcome {
    pub lesson_word: String,
    /// 0 - 100
    pub accuracy: u8,
    /// floor(accuracy / 10)
    pub session_score: u8,
    pub stars_awarded: u32,
    pub unlocked: Vec<Achievement>,
}

/// 进度事件（用于 UI 反馈）
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    VisitRecorded {
        streak: u32,
        total_days: u32,
    },
    StarsAwarded {
        amount: u32,
        total: u32,
    },
    LessonAdvanced {
        index: usize,
        word: String,
    },
    CourseFinished,
    PracticeScored {
        accuracy: u8,
        stars: u32,
    },
    AchievementUnlocked {
        achievement: Achievement,
    },
    SaveFailed {
        reason: String,
    },
}

/// 无障碍设置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accessibility {
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

/// 进度持久化接口：读写一条完整记录
pub trait ProgressStore {
    /// 读取记录，不存在时返回 None
    fn load(&self) -> anyhow::Result<Option<UserProgress>>;

    /// 整体覆盖写入
    fn save(&self, progress: &UserProgress) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn achievement(id: &str, kind: AchievementKind, requirement: u32) -> Achievement {
        Achievement {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: "⭐".to_string(),
            requirement,
            kind,
        }
    }

    fn lesson(id: u32, word: &str) -> Lesson {
        Lesson {
            id,
            word: word.to_string(),
            description: String::new(),
            glyph: "👋".to_string(),
            difficulty: Difficulty::Easy,
            category: "greetings".to_string(),
        }
    }

    #[test]
    fn test_average_accuracy() {
        let mut progress = UserProgress {
            practice_scores: vec![7, 8, 9],
            ..Default::default()
        };
        progress.recompute_average_accuracy();
        assert_eq!(progress.average_accuracy, 80);

        // 7.5 * 10 = 75，8.333 * 10 = 83
        progress.practice_scores = vec![7, 8];
        progress.recompute_average_accuracy();
        assert_eq!(progress.average_accuracy, 75);
        progress.practice_scores = vec![8, 8, 9];
        progress.recompute_average_accuracy();
        assert_eq!(progress.average_accuracy, 83);
        // 8.35 * 10 = 83.5 向上取整
        progress.practice_scores = vec![9; 7];
        progress.practice_scores.extend([8; 13]);
        progress.recompute_average_accuracy();
        assert_eq!(progress.average_accuracy, 84);

        progress.practice_scores.clear();
        progress.recompute_average_accuracy();
        assert_eq!(progress.average_accuracy, 0);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let progress: UserProgress =
            serde_json::from_str(r#"{"signsLearned":3,"totalStars":40,"lastVisit":"2024-01-01"}"#)
                .unwrap();
        assert_eq!(progress.signs_learned, 3);
        assert_eq!(progress.total_stars, 40);
        assert_eq!(progress.streak, 0);
        assert!(progress.practice_scores.is_empty());
        assert_eq!(
            progress.last_visit,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_normalize_drops_duplicate_unlocks() {
        let mut progress = UserProgress {
            unlocked_achievements: vec!["first-sign".into(), "first-sign".into(), "streak-keeper".into()],
            practice_scores: vec![9, 9],
            average_accuracy: 12,
            ..Default::default()
        };
        progress.normalize();
        assert_eq!(progress.unlocked_achievements, vec!["first-sign", "streak-keeper"]);
        assert_eq!(progress.average_accuracy, 90);
    }

    #[test]
    fn test_achievement_predicates() {
        let progress = UserProgress {
            signs_learned: 3,
            streak: 2,
            total_stars: 50,
            practice_scores: vec![9; 20],
            average_accuracy: 90,
            ..Default::default()
        };
        assert!(achievement("a", AchievementKind::SignsLearned, 3).is_satisfied_by(&progress));
        assert!(!achievement("b", AchievementKind::SignsLearned, 4).is_satisfied_by(&progress));
        assert!(!achievement("c", AchievementKind::Streak, 3).is_satisfied_by(&progress));
        assert!(achievement("d", AchievementKind::Stars, 50).is_satisfied_by(&progress));
        assert!(achievement("e", AchievementKind::PracticeSessions, 20).is_satisfied_by(&progress));
        assert!(achievement("f", AchievementKind::Accuracy, 90).is_satisfied_by(&progress));
    }

    #[test]
    fn test_catalog_validation() {
        assert_eq!(LessonCatalog::new(vec![]).unwrap_err(), CatalogError::NoLessons);
        assert_eq!(
            LessonCatalog::new(vec![lesson(1, "Hello"), lesson(1, "Hi")]).unwrap_err(),
            CatalogError::DuplicateLesson(1)
        );
        let catalog = LessonCatalog::new(vec![lesson(1, "Hello"), lesson(2, "Yes")]).unwrap();
        assert_eq!(catalog.last_index(), 1);

        let err = AchievementCatalog::new(vec![
            achievement("x", AchievementKind::Stars, 1),
            achievement("x", AchievementKind::Streak, 1),
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateAchievement("x".into()));
    }
}
