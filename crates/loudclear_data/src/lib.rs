use anyhow::{Context, Result};
use log::debug;
use loudclear_core::{Achievement, AchievementCatalog, Lesson, LessonCatalog};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

/// 嵌入式课程资源
#[derive(RustEmbed)]
#[folder = "../../catalog/lessons"]
#[include = "*.ron"]
struct EmbeddedLessons;

/// 嵌入式成就资源
#[derive(RustEmbed)]
#[folder = "../../catalog/achievements"]
#[include = "*.ron"]
struct EmbeddedAchievements;

pub struct CatalogLoader {
    user_data_dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
}

impl CatalogLoader {
    pub fn new() -> Result<Self> {
        let user_data_dir = Self::get_user_data_dir()?;
        Self::with_user_dir(user_data_dir)
    }

    /// 使用指定的用户目录（测试或便携模式）
    pub fn with_user_dir(user_data_dir: impl Into<PathBuf>) -> Result<Self> {
        let user_data_dir = user_data_dir.into();

        for sub in ["lessons", "achievements"] {
            let dir = user_data_dir.join(sub);
            if !dir.exists() {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create user data dir: {:?}", dir))?;
                debug!("✅ 创建用户数据目录: {:?}", dir);
            }
        }

        Ok(Self {
            user_data_dir,
            watcher: None,
        })
    }

    /// 获取系统数据目录
    fn get_user_data_dir() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("无法获取数据目录"))?;

        #[cfg(target_os = "linux")]
        let base = dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("无法获取数据目录"))?;

        #[cfg(target_os = "windows")]
        let base = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("无法获取数据目录"))?;

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let base = PathBuf::from(".");

        Ok(base.join("LoudClear"))
    }

    fn lessons_dir(&self) -> PathBuf {
        self.user_data_dir.join("lessons")
    }

    fn achievements_dir(&self) -> PathBuf {
        self.user_data_dir.join("achievements")
    }

    /// 加载课程目录（用户目录覆盖内置资源）
    pub fn load_lessons(&self) -> Result<LessonCatalog> {
        let mut lessons_map: HashMap<u32, Lesson> = HashMap::new();

        // 1. 先加载嵌入式内置课程
        let builtin: Vec<Lesson> = load_embedded::<EmbeddedLessons, Lesson>()?;
        debug!("📚 加载嵌入式课程: {} 个", builtin.len());
        for lesson in builtin {
            lessons_map.insert(lesson.id, lesson);
        }

        // 2. 再加载用户课程（覆盖同 ID 的内置课程）
        let mut user_lessons: Vec<Lesson> = Vec::new();
        load_from_dir_recursive(&self.lessons_dir(), &mut user_lessons)?;
        if !user_lessons.is_empty() {
            debug!("📚 加载用户课程: {} 个", user_lessons.len());
        }
        for lesson in user_lessons {
            if lessons_map.contains_key(&lesson.id) {
                debug!("🔄 用户课程覆盖内置课程 ID: {}", lesson.id);
            }
            lessons_map.insert(lesson.id, lesson);
        }

        // 3. 排序返回
        let mut lessons: Vec<_> = lessons_map.into_values().collect();
        lessons.sort_by_key(|l| l.id);
        Ok(LessonCatalog::new(lessons)?)
    }

    /// 加载成就目录
    ///
    /// 每个文件是一个成就列表。用户文件中与内置同 id 的成就原位替换，
    /// 新 id 按文件顺序追加在末尾。
    pub fn load_achievements(&self) -> Result<AchievementCatalog> {
        let mut achievements: Vec<Achievement> =
            load_embedded::<EmbeddedAchievements, Vec<Achievement>>()?
                .into_iter()
                .flatten()
                .collect();
        debug!("🏆 加载嵌入式成就: {} 个", achievements.len());

        let mut user_lists: Vec<Vec<Achievement>> = Vec::new();
        load_from_dir_recursive(&self.achievements_dir(), &mut user_lists)?;
        for achievement in user_lists.into_iter().flatten() {
            match achievements.iter_mut().find(|a| a.id == achievement.id) {
                Some(existing) => {
                    debug!("🔄 用户成就覆盖内置成就: {}", achievement.id);
                    *existing = achievement;
                }
                None => achievements.push(achievement),
            }
        }

        Ok(AchievementCatalog::new(achievements)?)
    }

    /// 启动文件系统监听，自动检测目录变化（仅监听用户数据目录）
    pub fn start_watching<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                // 只关心 .ron 文件的变化
                let has_ron_change = event
                    .paths
                    .iter()
                    .any(|p| p.extension().and_then(|s| s.to_str()) == Some("ron"));

                if has_ron_change {
                    debug!("📂 检测到用户目录文件变化: {:?}", event.paths);
                    tx.send(()).ok();
                }
            }
        })?;

        // 内置目录编译到二进制，无需监听
        watcher.watch(&self.user_data_dir, RecursiveMode::Recursive)?;

        debug!("👀 开始监听用户目录: {:?}", self.user_data_dir);

        std::thread::spawn(move || {
            while rx.recv().is_ok() {
                callback();
            }
        });

        self.watcher = Some(watcher);
        Ok(())
    }

    /// 获取用户数据目录路径（供外部使用）
    pub fn user_data_dir(&self) -> &Path {
        &self.user_data_dir
    }
}

/// 从嵌入式资源解析所有 .ron 文件，按文件名排序
fn load_embedded<E: RustEmbed, T: DeserializeOwned>() -> Result<Vec<T>> {
    let mut names: Vec<_> = E::iter().filter(|name| name.ends_with(".ron")).collect();
    names.sort();

    let mut items = Vec::new();
    for name in names {
        if let Some(content) = E::get(&name) {
            let content_str = std::str::from_utf8(&content.data)
                .with_context(|| format!("Failed to decode embedded file: {}", name))?;

            let item: T = ron::from_str(content_str)
                .with_context(|| format!("Failed to parse embedded file: {}", name))?;

            items.push(item);
        }
    }

    Ok(items)
}

/// 递归加载目录中的所有 .ron 文件，按路径排序
fn load_from_dir_recursive<T: DeserializeOwned>(dir: &Path, items: &mut Vec<T>) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            load_from_dir_recursive(&path, items)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            let content = fs::read_to_string(&path)?;
            let item: T =
                ron::from_str(&content).with_context(|| format!("Failed to parse: {:?}", path))?;
            items.push(item);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loudclear_core::{AchievementKind, Difficulty};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "loudclear-data-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_embedded_lessons_load() {
        let loader = CatalogLoader::with_user_dir(temp_dir("lessons")).unwrap();
        let lessons = loader.load_lessons().expect("Failed to load embedded lessons");
        assert_eq!(lessons.len(), 10);
        assert_eq!(lessons.get(0).unwrap().word, "Hello");
        assert_eq!(lessons.get(5).unwrap().difficulty, Difficulty::Medium);
        assert_eq!(lessons.get(9).unwrap().word, "Love");
    }

    #[test]
    fn test_embedded_achievements_in_order() {
        let loader = CatalogLoader::with_user_dir(temp_dir("achievements")).unwrap();
        let achievements = loader.load_achievements().unwrap();
        let ids: Vec<_> = achievements.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "first-sign",
                "hello-world",
                "streak-keeper",
                "star-collector",
                "practice-master",
                "accuracy-ace",
                "dedicated-learner",
                "sign-master",
            ]
        );
        assert_eq!(
            achievements.get("star-collector").unwrap().kind,
            AchievementKind::Stars
        );
    }

    #[test]
    fn test_user_lesson_overrides_builtin() {
        let dir = temp_dir("override");
        let loader = CatalogLoader::with_user_dir(&dir).unwrap();
        fs::write(
            dir.join("lessons").join("hello.ron"),
            r#"(id: 1, word: "Hi", description: "Wave.", glyph: "👋", difficulty: Easy, category: "greetings")"#,
        )
        .unwrap();
        fs::write(
            dir.join("lessons").join("extra.ron"),
            r#"(id: 11, word: "Eat", description: "Tap your lips.", glyph: "🍎", difficulty: Medium, category: "needs")"#,
        )
        .unwrap();
        fs::write(
            dir.join("achievements").join("mine.ron"),
            r#"[(id: "first-sign", name: "Tiny Step", description: "", icon: "🌟", requirement: 2, kind: signs_learned),
                (id: "star-hoarder", name: "Star Hoarder", description: "", icon: "💫", requirement: 500, kind: stars)]"#,
        )
        .unwrap();

        let lessons = loader.load_lessons().unwrap();
        assert_eq!(lessons.len(), 11);
        assert_eq!(lessons.get(0).unwrap().word, "Hi");
        assert_eq!(lessons.get(10).unwrap().word, "Eat");

        let achievements = loader.load_achievements().unwrap();
        assert_eq!(achievements.len(), 9);
        let first = achievements.iter().next().unwrap();
        assert_eq!(first.name, "Tiny Step");
        assert_eq!(achievements.iter().last().unwrap().id, "star-hoarder");

        fs::remove_dir_all(&dir).ok();
    }
}
