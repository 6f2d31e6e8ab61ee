use loudclear_core::Lesson;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 随机打分的下限（含）
pub const MIN_SIMULATED_ACCURACY: u8 = 70;
/// 随机打分的上限（含）
pub const MAX_SIMULATED_ACCURACY: u8 = 100;

/// 练习评分器：对当前课程的一次尝试给出 0 - 100 的准确率
///
/// 真实的手势识别模型可以实现同一个 trait 替换随机评分。
pub trait Scorer {
    fn score(&mut self, lesson: &Lesson) -> u8;
}

impl<F> Scorer for F
where
    F: FnMut(&Lesson) -> u8,
{
    fn score(&mut self, lesson: &Lesson) -> u8 {
        self(lesson)
    }
}

/// 均匀随机评分（模拟 AI 分析）
pub struct RandomScorer {
    rng: StdRng,
}

impl RandomScorer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for RandomScorer {
    fn score(&mut self, _lesson: &Lesson) -> u8 {
        self.rng
            .gen_range(MIN_SIMULATED_ACCURACY..=MAX_SIMULATED_ACCURACY)
    }
}
