pub mod clock;
pub mod companion;
pub mod scorer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use companion::{Companion, LearnerLevel};
pub use scorer::{RandomScorer, Scorer};

use chrono::NaiveDate;
use log::{debug, warn};
use loudclear_core::*;
use std::sync::mpsc;

#[cfg(feature = "persistence")]
use loudclear_persistence::{Database, PracticeRecord};

/// 完成一课奖励的星星
pub const LESSON_STARS: u32 = 10;
/// 解锁成就奖励的星星
pub const ACHIEVEMENT_BONUS: u32 = 20;

/// 按准确率档位奖励星星
pub fn practice_stars(accuracy: u8) -> u32 {
    if accuracy >= 85 {
        15
    } else if accuracy >= 70 {
        8
    } else {
        5
    }
}

/// `complete_lesson` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum LessonAdvance {
    /// 已前进到下一课
    Advanced {
        index: usize,
        lesson: Lesson,
        unlocked: Vec<Achievement>,
    },
    /// 已经是最后一课，没有下一课
    Finished { unlocked: Vec<Achievement> },
}

/// 学习路径中一课的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone)]
pub struct PathEntry<'a> {
    pub index: usize,
    pub lesson: &'a Lesson,
    pub status: PathStatus,
}

#[derive(Debug, Clone)]
pub struct BadgeEntry<'a> {
    pub achievement: &'a Achievement,
    pub unlocked: bool,
}

/// 进度引擎：持有用户进度记录和两份目录，实现连续天数、星星、
/// 准确率和成就的全部规则。
pub struct ProgressEngine<S: ProgressStore, C: Clock, R: Scorer> {
    progress: UserProgress,
    lessons: LessonCatalog,
    achievements: AchievementCatalog,
    // 当前课程游标（不持久化，进度中的 current_lesson 用于恢复）
    current_index: usize,

    store: S,
    clock: C,
    scorer: R,

    event_tx: Option<mpsc::Sender<ProgressEvent>>,
    save_warning: Option<String>,
    // 读取失败后禁止写回，避免默认值覆盖已保存的记录
    load_failed: bool,
}

impl<S: ProgressStore, C: Clock, R: Scorer> ProgressEngine<S, C, R> {
    /// 从存储加载进度；没有记录时使用默认值
    ///
    /// 读取失败时本次会话使用默认值，并且在 [`ProgressEngine::reload`]
    /// 成功之前不会写回存储。
    pub fn new(
        lessons: LessonCatalog,
        achievements: AchievementCatalog,
        store: S,
        clock: C,
        scorer: R,
        event_tx: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Self {
        assert!(!lessons.is_empty(), "lesson catalog must not be empty");

        let mut save_warning = None;
        let mut load_failed = false;
        let progress = match store.load() {
            Ok(Some(progress)) => {
                debug!(
                    "📖 加载进度: 已学 {} 个, {} 颗星",
                    progress.signs_learned, progress.total_stars
                );
                progress
            }
            Ok(None) => {
                debug!("🆕 未找到进度记录，使用默认值");
                UserProgress::default()
            }
            Err(e) => {
                warn!("⚠️ 读取进度失败，本次使用默认值: {:#}", e);
                save_warning = Some(format!("{:#}", e));
                load_failed = true;
                UserProgress::default()
            }
        };

        Self {
            progress,
            lessons,
            achievements,
            current_index: 0,
            store,
            clock,
            scorer,
            event_tx,
            save_warning,
            load_failed,
        }
    }

    /// 重新读取存储中的进度，成功后恢复写入
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let progress = self.store.load()?.unwrap_or_default();
        debug!(
            "🔄 重新加载进度: 已学 {} 个, {} 颗星",
            progress.signs_learned, progress.total_stars
        );
        self.progress = progress;
        self.load_failed = false;
        Ok(())
    }

    /// 存储读取是否失败（此时进度不会写回）
    pub fn is_read_only(&self) -> bool {
        self.load_failed
    }

    /// 记录今天的访问
    pub fn record_visit_today(&mut self) {
        let today = self.clock.today();
        self.record_visit(today);
    }

    /// 更新连续天数和累计天数
    pub fn record_visit(&mut self, today: NaiveDate) {
        match self.progress.last_visit {
            None => {
                // 首次访问
                self.progress.streak = 1;
                self.progress.total_days = 1;
            }
            Some(last) if last != today => {
                let days_diff = (today - last).num_days();
                if days_diff == 1 {
                    self.progress.streak += 1;
                    self.progress.total_days += 1;
                } else if days_diff > 1 {
                    // 连续中断
                    self.progress.streak = 1;
                    self.progress.total_days += 1;
                }
                // 时钟回拨：计数不变
            }
            Some(_) => {}
        }
        self.progress.last_visit = Some(today);

        debug!(
            "📅 访问 {}: 连续 {} 天, 累计 {} 天",
            today, self.progress.streak, self.progress.total_days
        );
        self.send_event(ProgressEvent::VisitRecorded {
            streak: self.progress.streak,
            total_days: self.progress.total_days,
        });
        self.persist();
    }

    /// 完成当前课程并前进到下一课
    ///
    /// `index` 必须是当前课程。最后一课返回 [`LessonAdvance::Finished`]，
    /// 不修改课程位置和已学数量。
    pub fn complete_lesson(&mut self, index: usize) -> LessonAdvance {
        assert!(
            index < self.lessons.len(),
            "lesson index {} out of range ({} lessons)",
            index,
            self.lessons.len()
        );
        assert_eq!(
            index, self.current_index,
            "only the active lesson can be completed"
        );

        if index == self.lessons.last_index() {
            let unlocked = self.unlock_satisfied();
            if !unlocked.is_empty() {
                self.persist();
            }
            debug!("🎉 全部课程完成");
            self.send_event(ProgressEvent::CourseFinished);
            return LessonAdvance::Finished { unlocked };
        }

        let next = index + 1;
        self.current_index = next;
        self.progress.current_lesson = next;
        self.progress.signs_learned = self.progress.signs_learned.max(next as u32 + 1);

        self.award_stars(LESSON_STARS);
        let unlocked = self.unlock_satisfied();
        self.persist();

        let lesson = self.current_lesson().clone();
        self.send_event(ProgressEvent::LessonAdvanced {
            index: next,
            word: lesson.word.clone(),
        });

        LessonAdvance::Advanced {
            index: next,
            lesson,
            unlocked,
        }
    }

    /// 对当前课程做一次练习评分
    pub fn record_practice(&mut self) -> PracticeOutcome {
        let lesson = match self.lessons.get(self.current_index) {
            Some(lesson) => lesson,
            None => unreachable!("cursor always points into the catalog"),
        };
        let lesson_word = lesson.word.clone();
        let accuracy = self.scorer.score(lesson).min(100);
        let session_score = accuracy / 10;
        self.progress.practice_scores.push(session_score);

        let stars_awarded = practice_stars(accuracy);
        self.award_stars(stars_awarded);

        self.progress.recompute_average_accuracy();
        let unlocked = self.unlock_satisfied();
        self.persist();

        debug!(
            "🎯 练习 \"{}\": 准确率 {}%, 得分 {}, +{} 星",
            lesson_word, accuracy, session_score, stars_awarded
        );
        self.send_event(ProgressEvent::PracticeScored {
            accuracy,
            stars: stars_awarded,
        });

        PracticeOutcome {
            lesson_word,
            accuracy,
            session_score,
            stars_awarded,
            unlocked,
        }
    }

    /// 增加星星（纯累加）
    pub fn award_stars(&mut self, amount: u32) {
        credit_stars(&mut self.progress, amount);
        debug!(
            "⭐ +{} stars awarded! Total: {}",
            amount, self.progress.total_stars
        );
        self.send_event(ProgressEvent::StarsAwarded {
            amount,
            total: self.progress.total_stars,
        });
    }

    /// 检查并解锁成就，返回本次新解锁的成就（按目录顺序）
    pub fn evaluate_achievements(&mut self) -> Vec<Achievement> {
        let unlocked = self.unlock_satisfied();
        if !unlocked.is_empty() {
            self.persist();
        }
        unlocked
    }

    /// 按目录顺序扫描一遍，每次都针对最新的进度重新判定，
    /// 前面成就的奖励星星可以让后面的星星类成就在同一遍中解锁。
    fn unlock_satisfied(&mut self) -> Vec<Achievement> {
        let mut unlocked = Vec::new();

        for achievement in self.achievements.iter() {
            if self.progress.is_unlocked(&achievement.id)
                || !achievement.is_satisfied_by(&self.progress)
            {
                continue;
            }

            self.progress
                .unlocked_achievements
                .push(achievement.id.clone());
            credit_stars(&mut self.progress, ACHIEVEMENT_BONUS);
            debug!("🏆 Achievement unlocked: {}", achievement.name);
            unlocked.push((achievement.clone(), self.progress.total_stars));
        }

        for (achievement, total) in &unlocked {
            self.send_event(ProgressEvent::StarsAwarded {
                amount: ACHIEVEMENT_BONUS,
                total: *total,
            });
            self.send_event(ProgressEvent::AchievementUnlocked {
                achievement: achievement.clone(),
            });
        }

        unlocked.into_iter().map(|(achievement, _)| achievement).collect()
    }

    fn persist(&mut self) {
        if self.load_failed {
            let reason = "stored progress could not be read; not overwriting it".to_string();
            warn!("⚠️ 跳过保存: 读取进度失败后不覆盖已有记录");
            self.send_event(ProgressEvent::SaveFailed {
                reason: reason.clone(),
            });
            self.save_warning = Some(reason);
            return;
        }
        if let Err(e) = self.store.save(&self.progress) {
            let reason = format!("{:#}", e);
            warn!("⚠️ 保存进度失败（内存中的进度仍然有效）: {}", reason);
            self.send_event(ProgressEvent::SaveFailed {
                reason: reason.clone(),
            });
            self.save_warning = Some(reason);
        }
    }

    /// 取出最近一次持久化失败的信息
    pub fn take_save_warning(&mut self) -> Option<String> {
        self.save_warning.take()
    }

    /// 从第一课开始
    pub fn start_learning(&mut self) -> &Lesson {
        self.current_index = 0;
        self.current_lesson()
    }

    /// 从上次的位置继续
    pub fn continue_progress(&mut self) -> &Lesson {
        self.current_index = self.progress.current_lesson.min(self.lessons.last_index());
        self.current_lesson()
    }

    /// 跳转到任意课程（不修改进度记录）
    pub fn select_lesson(&mut self, index: usize) -> &Lesson {
        assert!(
            index < self.lessons.len(),
            "lesson index {} out of range ({} lessons)",
            index,
            self.lessons.len()
        );
        self.current_index = index;
        self.current_lesson()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_lesson(&self) -> &Lesson {
        match self.lessons.get(self.current_index) {
            Some(lesson) => lesson,
            None => unreachable!("cursor always points into the catalog"),
        }
    }

    /// 当前课程在整个目录中的位置百分比
    pub fn lesson_progress_percent(&self) -> f32 {
        (self.current_index + 1) as f32 / self.lessons.len() as f32 * 100.0
    }

    /// 学习路径：每一课的完成状态
    pub fn learning_path(&self) -> Vec<PathEntry<'_>> {
        self.lessons
            .iter()
            .enumerate()
            .map(|(index, lesson)| {
                let status = if (index as u32) < self.progress.signs_learned {
                    PathStatus::Completed
                } else if index == self.current_index {
                    PathStatus::Current
                } else {
                    PathStatus::Upcoming
                };
                PathEntry {
                    index,
                    lesson,
                    status,
                }
            })
            .collect()
    }

    /// 成就墙：目录中每个成就及是否已解锁
    pub fn achievement_board(&self) -> Vec<BadgeEntry<'_>> {
        self.achievements
            .iter()
            .map(|achievement| BadgeEntry {
                achievement,
                unlocked: self.progress.is_unlocked(&achievement.id),
            })
            .collect()
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn lessons(&self) -> &LessonCatalog {
        &self.lessons
    }

    pub fn achievements(&self) -> &AchievementCatalog {
        &self.achievements
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn send_event(&self, event: ProgressEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn credit_stars(progress: &mut UserProgress, amount: u32) {
    progress.total_stars = progress.total_stars.saturating_add(amount);
}

#[cfg(feature = "persistence")]
pub type SqliteProgressEngine = ProgressEngine<Database, SystemClock, RandomScorer>;

#[cfg(feature = "persistence")]
impl<C: Clock, R: Scorer> ProgressEngine<Database, C, R> {
    /// 把一次练习写入历史表（需要启用 persistence feature）
    pub fn save_practice_history(&self, outcome: &PracticeOutcome) -> anyhow::Result<i64> {
        let record = PracticeRecord {
            id: 0,
            lesson_index: self.current_index,
            lesson_word: outcome.lesson_word.clone(),
            accuracy: outcome.accuracy,
            session_score: outcome.session_score,
            stars_awarded: outcome.stars_awarded,
            completed_at: chrono::Utc::now().timestamp(),
        };
        self.store.save_practice(&record)
    }
}
