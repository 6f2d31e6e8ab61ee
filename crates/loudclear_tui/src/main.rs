use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use loudclear_core::*;
use loudclear_data::CatalogLoader;
use loudclear_engine::{
    Companion, LessonAdvance, PathStatus, ProgressEngine, RandomScorer, SqliteProgressEngine,
    SystemClock,
};
use loudclear_persistence::{Database, PracticeRecord, PracticeStats};
use rand::rngs::ThreadRng;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

const DEMO_DELAY: Duration = Duration::from_millis(1500);
const DEMO_FOLLOW_UP_DELAY: Duration = Duration::from_millis(2000);
const ANALYSIS_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Home,
    Learn,
    Practice,
    Progress,
}

/// 模拟延迟中的操作
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Demo,
    DemoFollowUp,
    Analysis,
}

struct Modal {
    title: String,
    body: String,
}

// 主题颜色
struct Palette {
    text: Color,
    muted: Color,
    accent: Color,
    good: Color,
    warn: Color,
}

impl Palette {
    fn new(settings: &Accessibility) -> Self {
        if settings.high_contrast {
            Self {
                text: Color::White,
                muted: Color::White,
                accent: Color::Yellow,
                good: Color::LightGreen,
                warn: Color::LightRed,
            }
        } else {
            Self {
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                good: Color::Green,
                warn: Color::Yellow,
            }
        }
    }
}

struct App {
    engine: SqliteProgressEngine,
    event_rx: mpsc::Receiver<ProgressEvent>,
    section: Section,
    companion: String,
    encouragement: &'static str,
    tip: &'static str,
    practice_message: String,
    last_accuracy: Option<u8>,
    modals: VecDeque<Modal>,
    pending: Option<(Pending, Instant)>,
    settings: Accessibility,
    status: Option<String>,
    catalog_changed: Arc<AtomicBool>,
    history: Option<(PracticeStats, Vec<PracticeRecord>)>,
    rng: ThreadRng,
}

impl App {
    fn new(
        engine: SqliteProgressEngine,
        event_rx: mpsc::Receiver<ProgressEvent>,
        catalog_changed: Arc<AtomicBool>,
    ) -> Self {
        let settings = engine.store().load_accessibility().unwrap_or_else(|e| {
            warn!("⚠️ 读取设置失败: {:#}", e);
            Accessibility::default()
        });
        let mut rng = rand::thread_rng();
        let companion = Companion::greeting(&mut rng).to_string();

        let mut app = Self {
            engine,
            event_rx,
            section: Section::Home,
            companion,
            encouragement: "",
            tip: "",
            practice_message: String::new(),
            last_accuracy: None,
            modals: VecDeque::new(),
            pending: None,
            settings,
            status: None,
            catalog_changed,
            history: None,
            rng,
        };
        // 启动时记录访问（连续天数）
        app.engine.record_visit_today();
        app.drain_events();
        app.show_section(Section::Home);
        app
    }

    fn show_feedback(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.modals.push_back(Modal {
            title: title.into(),
            body: body.into(),
        });
    }

    fn delay(&self, duration: Duration) -> Duration {
        if self.settings.reduced_motion {
            Duration::ZERO
        } else {
            duration
        }
    }

    fn schedule(&mut self, pending: Pending, duration: Duration) {
        self.pending = Some((pending, Instant::now() + self.delay(duration)));
    }

    /// 处理引擎事件：成就解锁弹窗、保存失败提示
    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                ProgressEvent::AchievementUnlocked { achievement } => {
                    self.show_feedback(
                        "🏆 Achievement Unlocked!",
                        format!(
                            "{} {}: {}",
                            achievement.icon, achievement.name, achievement.description
                        ),
                    );
                }
                ProgressEvent::SaveFailed { reason } => {
                    self.status = Some(format!("⚠️ Progress not saved: {}", reason));
                }
                _ => {}
            }
        }
        if let Some(reason) = self.engine.take_save_warning() {
            self.status = Some(format!("⚠️ Progress not saved: {}", reason));
        }
    }

    fn show_section(&mut self, section: Section) {
        self.section = section;
        match section {
            Section::Learn => self.load_current_lesson(),
            Section::Practice => self.setup_practice_session(),
            Section::Progress => self.refresh_history(),
            Section::Home => {
                self.encouragement =
                    Companion::encouraging_message(self.engine.progress(), &mut self.rng);
                self.tip = Companion::personalized_tip(&mut self.rng);
            }
        }
    }

    fn load_current_lesson(&mut self) {
        self.companion = Companion::lesson_prompt(self.engine.current_lesson());
    }

    fn setup_practice_session(&mut self) {
        self.practice_message = Companion::practice_prompt(self.engine.current_lesson());
        self.last_accuracy = None;
    }

    fn refresh_history(&mut self) {
        let store = self.engine.store();
        self.history = match (store.get_practice_stats(), store.get_recent_practice(5)) {
            (Ok(stats), Ok(recent)) => Some((stats, recent)),
            (Err(e), _) | (_, Err(e)) => {
                warn!("⚠️ 读取练习历史失败: {:#}", e);
                None
            }
        };
    }

    fn start_learning(&mut self) {
        self.engine.start_learning();
        self.show_section(Section::Learn);
        self.show_feedback(
            "Welcome to your ASL learning journey! 🌟",
            "Let's start with your first sign.",
        );
    }

    fn continue_progress(&mut self) {
        self.engine.continue_progress();
        self.show_section(Section::Learn);
        self.show_feedback("Welcome back! 👋", "Let's continue your learning journey.");
    }

    fn next_sign(&mut self) {
        let index = self.engine.current_index();
        let advance = self.engine.complete_lesson(index);
        // 成就通知先于课程反馈入队
        self.drain_events();
        match advance {
            LessonAdvance::Advanced { lesson, .. } => {
                self.load_current_lesson();
                self.show_feedback(
                    "Excellent work! ⭐",
                    format!(
                        "You've earned 10 stars! Ready for \"{}\"?",
                        lesson.word
                    ),
                );
            }
            LessonAdvance::Finished { .. } => {
                self.show_feedback(
                    "Congratulations! 🎉",
                    "You've completed all available lessons! You're amazing!",
                );
            }
        }
    }

    fn finish_practice(&mut self) {
        let outcome = self.engine.record_practice();
        if let Err(e) = self.engine.save_practice_history(&outcome) {
            warn!("⚠️ 保存练习历史失败: {:#}", e);
        }
        self.drain_events();

        self.last_accuracy = Some(outcome.accuracy);
        let (title, body) = if outcome.accuracy >= 85 {
            (
                "Excellent! 🌟",
                format!(
                    "{}% accuracy! You've mastered the sign for \"{}\"!",
                    outcome.accuracy, outcome.lesson_word
                ),
            )
        } else if outcome.accuracy >= 70 {
            (
                "Good job! 👍",
                format!(
                    "{}% accuracy! Keep practicing to improve.",
                    outcome.accuracy
                ),
            )
        } else {
            (
                "Keep trying! 💪",
                format!(
                    "{}% accuracy. Don't worry, practice makes perfect!",
                    outcome.accuracy
                ),
            )
        };
        self.practice_message = body.clone();
        self.show_feedback(title, body);
    }

    /// 到期的模拟延迟
    fn tick(&mut self) {
        if self.catalog_changed.swap(false, Ordering::Relaxed) {
            self.status = Some("📂 Lesson files changed. Restart to load them.".to_string());
        }

        let Some((pending, due)) = self.pending else {
            return;
        };
        if Instant::now() < due {
            return;
        }
        self.pending = None;

        match pending {
            Pending::Demo => {
                self.show_feedback(
                    "Demo Playing! 🎬",
                    "Watch carefully and try to mimic the movement.",
                );
                self.schedule(Pending::DemoFollowUp, DEMO_FOLLOW_UP_DELAY);
            }
            Pending::DemoFollowUp => {
                self.companion =
                    "Did you see how the hand moves? Try practicing it yourself!".to_string();
            }
            Pending::Analysis => self.finish_practice(),
        }
    }

    fn is_loading(&self) -> bool {
        matches!(
            self.pending,
            Some((Pending::Demo, _)) | Some((Pending::Analysis, _))
        )
    }

    fn toggle_setting(&mut self, apply: impl FnOnce(&mut Accessibility)) {
        apply(&mut self.settings);
        if let Err(e) = self.engine.store().save_accessibility(&self.settings) {
            warn!("⚠️ 保存设置失败: {:#}", e);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true; // 退出
        }

        // 弹窗打开时只处理关闭
        if !self.modals.is_empty() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
                self.modals.pop_front();
            }
            return false;
        }

        if self.is_loading() {
            return false;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.show_section(Section::Home),
            KeyCode::Char('2') => self.show_section(Section::Learn),
            KeyCode::Char('3') => self.show_section(Section::Practice),
            KeyCode::Char('4') => self.show_section(Section::Progress),
            KeyCode::Char('t') => self.toggle_setting(|s| s.high_contrast = !s.high_contrast),
            KeyCode::Char('m') => self.toggle_setting(|s| s.reduced_motion = !s.reduced_motion),
            code => match (self.section, code) {
                (Section::Home, KeyCode::Char('s')) => self.start_learning(),
                (Section::Home, KeyCode::Char('c')) => self.continue_progress(),
                (Section::Learn, KeyCode::Char('d')) => self.schedule(Pending::Demo, DEMO_DELAY),
                (Section::Learn, KeyCode::Char('p')) => self.show_section(Section::Practice),
                (Section::Learn, KeyCode::Char('n')) => self.next_sign(),
                (Section::Practice, KeyCode::Enter) => {
                    self.practice_message = "AI is analyzing your gesture...".to_string();
                    self.schedule(Pending::Analysis, ANALYSIS_DELAY);
                }
                (Section::Practice, KeyCode::Char('s')) => {
                    self.show_feedback(
                        "No problem! 😊",
                        "You can practice anytime. Let's continue learning!",
                    );
                    self.show_section(Section::Learn);
                }
                _ => {}
            },
        }

        false
    }

    fn render(&self, frame: &mut Frame) {
        let palette = Palette::new(&self.settings);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Logo + 导航
                Constraint::Length(3), // 统计信息
                Constraint::Min(10),   // 内容区
                Constraint::Length(3), // 提示信息
            ])
            .split(frame.area());

        let nav = [
            (Section::Home, "1 Home"),
            (Section::Learn, "2 Learn"),
            (Section::Practice, "3 Practice"),
            (Section::Progress, "4 Progress"),
        ];
        let mut spans = vec![Span::styled(
            "🤟 LOUD & CLEAR   ",
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )];
        for (section, label) in nav {
            let style = if section == self.section {
                Style::default()
                    .fg(Color::Black)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.muted)
            };
            spans.push(Span::styled(format!(" {} ", label), style));
            spans.push(Span::raw(" "));
        }
        let header = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chunks[0]);

        let p = self.engine.progress();
        let stats_text = format!(
            "Signs: {}  |  🔥 Streak: {}  |  ⭐ Stars: {}  |  Days: {}  |  Time: {}  |  Accuracy: {}%",
            p.signs_learned, p.streak, p.total_stars, p.total_days, p.total_time, p.average_accuracy
        );
        let stats = Paragraph::new(stats_text)
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(stats, chunks[1]);

        match self.section {
            Section::Home => self.render_home(frame, chunks[2], &palette),
            Section::Learn => self.render_learn(frame, chunks[2], &palette),
            Section::Practice => self.render_practice(frame, chunks[2], &palette),
            Section::Progress => self.render_progress(frame, chunks[2], &palette),
        }

        self.render_footer(frame, chunks[3], &palette);

        if self.is_loading() {
            self.render_popup(frame, &palette, "Loading", "⏳ Please wait...");
        } else if let Some(modal) = self.modals.front() {
            self.render_popup(frame, &palette, &modal.title, &modal.body);
        }
    }

    fn render_home(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Learn American Sign Language, one sign at a time.",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("💬 {}", self.companion)),
            Line::from(""),
            Line::from(self.encouragement),
            Line::from(Span::styled(
                format!("Tip: {}", self.tip),
                Style::default().fg(palette.muted),
            )),
            Line::from(""),
            Line::from("[s] Start learning    [c] Continue where you left off"),
        ];
        let home = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Home"));
        frame.render_widget(home, area);
    }

    fn render_learn(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(3), Constraint::Length(4)])
            .split(area);

        let lesson = self.engine.current_lesson();
        let lines = vec![
            Line::from(""),
            Line::from(lesson.glyph.as_str()),
            Line::from(Span::styled(
                lesson.word.as_str(),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(lesson.description.as_str()),
            Line::from(Span::styled(
                format!("{} · {}", lesson.category, lesson.difficulty.as_str()),
                Style::default().fg(palette.muted),
            )),
        ];
        let card = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(
                        "Sign {} of {}",
                        self.engine.current_index() + 1,
                        self.engine.lessons().len()
                    ))
                    .title_alignment(Alignment::Center),
            );
        frame.render_widget(card, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(palette.good))
            .percent(self.engine.lesson_progress_percent().round().clamp(0.0, 100.0) as u16);
        frame.render_widget(gauge, chunks[1]);

        let companion = Paragraph::new(format!("💬 {}", self.companion))
            .style(Style::default().fg(palette.text))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Alex"));
        frame.render_widget(companion, chunks[2]);
    }

    fn render_practice(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let accuracy = self
            .last_accuracy
            .map(|a| format!("{}%", a))
            .unwrap_or_else(|| "0%".to_string());
        let lines = vec![
            Line::from(""),
            Line::from(self.engine.current_lesson().glyph.as_str()),
            Line::from(""),
            Line::from(self.practice_message.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                format!("Accuracy: {}", accuracy),
                Style::default()
                    .fg(palette.good)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "Practice score: {}",
                self.engine.progress().practice_total()
            )),
        ];
        let practice = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Practice")
                    .title_alignment(Alignment::Center),
            );
        frame.render_widget(practice, area);
    }

    fn render_progress(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let path: Vec<Line> = self
            .engine
            .learning_path()
            .into_iter()
            .map(|entry| {
                let (marker, style) = match entry.status {
                    PathStatus::Completed => ("✅", Style::default().fg(palette.good)),
                    PathStatus::Current => ("🔄", Style::default().fg(palette.accent)),
                    PathStatus::Upcoming => ("⏸️", Style::default().fg(palette.muted)),
                };
                Line::from(Span::styled(
                    format!(
                        "{} {} {} ({})",
                        marker, entry.lesson.glyph, entry.lesson.word, entry.lesson.category
                    ),
                    style,
                ))
            })
            .collect();
        let path = Paragraph::new(path)
            .block(Block::default().borders(Borders::ALL).title("Learning Path"));
        frame.render_widget(path, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(8)])
            .split(columns[1]);

        let badges: Vec<Line> = self
            .engine
            .achievement_board()
            .into_iter()
            .map(|badge| {
                let a = badge.achievement;
                if badge.unlocked {
                    Line::from(Span::styled(
                        format!("{} {} - {}", a.icon, a.name, a.description),
                        Style::default().fg(palette.good),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("🔒 {} - {}", a.name, a.description),
                        Style::default().fg(palette.muted),
                    ))
                }
            })
            .collect();
        let badges = Paragraph::new(badges)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Achievements"));
        frame.render_widget(badges, right[0]);

        let mut history = Vec::new();
        match &self.history {
            Some((stats, recent)) => {
                history.push(Line::from(format!(
                    "Sessions: {}  |  Avg: {:.1}%  |  Best: {}%",
                    stats.total_sessions, stats.avg_accuracy, stats.best_accuracy
                )));
                for record in recent {
                    history.push(Line::from(Span::styled(
                        format!(
                            "  {} → {}% (+{} ⭐)",
                            record.lesson_word, record.accuracy, record.stars_awarded
                        ),
                        Style::default().fg(palette.muted),
                    )));
                }
            }
            None => history.push(Line::from("No practice history yet.")),
        }
        let history = Paragraph::new(history)
            .block(Block::default().borders(Borders::ALL).title("Recent Practice"));
        frame.render_widget(history, right[1]);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let keys = match self.section {
            Section::Home => "[s] start  [c] continue",
            Section::Learn => "[d] demo  [p] practice  [n] next sign",
            Section::Practice => "[Enter] start  [s] skip",
            Section::Progress => "",
        };
        let mut spans = vec![Span::styled(
            format!(
                "{}  [1-4] sections  [t] contrast  [m] motion  [Esc] quit",
                keys
            ),
            Style::default().fg(palette.muted),
        )];
        if let Some(status) = &self.status {
            spans.push(Span::styled(
                format!("   {}", status),
                Style::default().fg(palette.warn),
            ));
        }
        let footer = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, area);
    }

    fn render_popup(&self, frame: &mut Frame, palette: &Palette, title: &str, body: &str) {
        let area = centered_rect(60, 30, frame.area());
        let popup = Paragraph::new(vec![
            Line::from(""),
            Line::from(body),
            Line::from(""),
            Line::from(Span::styled(
                "[Enter] OK",
                Style::default().fg(palette.muted),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(title)
                .title_alignment(Alignment::Center),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn event_loop<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| app.render(f))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press && app.handle_key(key_event) {
                    return Ok(());
                }
            }
        }
    }
}

fn run_app(mut app: App) -> Result<()> {
    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    // 恢复终端
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_path = data_dir.join("loudclear.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {:?}", log_path))?;

    // 终端被 TUI 占用，日志写入文件
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let data_dir = Database::get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data dir: {:?}", data_dir))?;
    init_logging(&data_dir)?;
    info!("🤟 Loud & Clear starting, data dir: {:?}", data_dir);

    let database = match Database::default() {
        Ok(db) => db,
        Err(e) => {
            warn!("⚠️ 无法打开数据库，使用内存数据库: {:#}", e);
            Database::new(":memory:")?
        }
    };

    // 加载课程和成就
    let mut loader = CatalogLoader::new()?;
    let lessons = loader.load_lessons()?;
    let achievements = loader.load_achievements()?;
    info!(
        "📚 {} lessons, {} achievements",
        lessons.len(),
        achievements.len()
    );

    let catalog_changed = Arc::new(AtomicBool::new(false));
    let flag = catalog_changed.clone();
    if let Err(e) = loader.start_watching(move || flag.store(true, Ordering::Relaxed)) {
        warn!("⚠️ 无法监听用户目录: {:#}", e);
    }

    let (event_tx, event_rx) = mpsc::channel();
    let engine = ProgressEngine::new(
        lessons,
        achievements,
        database,
        SystemClock,
        RandomScorer::new(),
        Some(event_tx),
    );

    let app = App::new(engine, event_rx, catalog_changed);
    run_app(app)?;

    info!("👋 Bye");
    Ok(())
}
