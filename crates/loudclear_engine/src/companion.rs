use loudclear_core::{Lesson, UserProgress};
use rand::seq::SliceRandom;
use rand::Rng;

const GREETINGS: &[&str] = &[
    "Hi! I'm Alex, your AI learning companion. I'm here to help you learn ASL at your own pace. Ready to start?",
    "You're doing great! Remember, everyone learns at their own speed, and that's perfectly okay.",
    "ASL is a beautiful language. Each sign you learn opens up new ways to communicate!",
    "Take breaks when you need them. Learning should be fun and comfortable.",
    "I'm here to support you every step of the way. You've got this!",
    "Every small step forward is progress worth celebrating! 🌟",
];

const BEGINNER: &[&str] = &[
    "You're taking the first steps in learning ASL - that's amazing!",
    "Every expert was once a beginner. You're doing great!",
    "Learning a new language takes courage. I'm proud of you!",
];

const INTERMEDIATE: &[&str] = &[
    "You're making excellent progress! Your dedication shows.",
    "Your ASL skills are really developing well. Keep it up!",
    "I can see how much you've improved. You should be proud!",
];

const ADVANCED: &[&str] = &[
    "You're becoming fluent in ASL! That's incredible!",
    "Your mastery of these signs is impressive. Well done!",
    "You're an inspiration to other learners. Amazing work!",
];

const TIPS: &[&str] = &[
    "Practice in front of a mirror to see your hand movements clearly.",
    "Take breaks when you feel overwhelmed - learning should be comfortable.",
    "Try practicing signs throughout your day to reinforce memory.",
    "Remember that facial expressions are important in ASL too!",
    "Don't worry about perfect form at first - focus on the basic movement.",
    "Each person learns at their own pace, and that's perfectly normal.",
];

/// 学习者等级（按已学手语数划分）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl LearnerLevel {
    pub fn from_progress(progress: &UserProgress) -> Self {
        match progress.signs_learned {
            0..=4 => Self::Beginner,
            5..=7 => Self::Intermediate,
            _ => Self::Advanced,
        }
    }
}

/// 学习伙伴的提示语
pub struct Companion;

impl Companion {
    pub fn greeting<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
        pick(GREETINGS, rng)
    }

    pub fn encouraging_message<R: Rng + ?Sized>(progress: &UserProgress, rng: &mut R) -> &'static str {
        let pool = match LearnerLevel::from_progress(progress) {
            LearnerLevel::Beginner => BEGINNER,
            LearnerLevel::Intermediate => INTERMEDIATE,
            LearnerLevel::Advanced => ADVANCED,
        };
        pick(pool, rng)
    }

    pub fn personalized_tip<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
        pick(TIPS, rng)
    }

    pub fn lesson_prompt(lesson: &Lesson) -> String {
        format!(
            "Great! Let's learn the sign for \"{}\". {}",
            lesson.word, lesson.description
        )
    }

    pub fn practice_prompt(lesson: &Lesson) -> String {
        format!(
            "Show me the sign for \"{}\"! I'll use AI to analyze your gesture.",
            lesson.word
        )
    }
}

fn pick<R: Rng + ?Sized>(pool: &'static [&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}
