mod ui;

use clap::{Parser, Subcommand};
use codesist::auth::{Access, ConfigIdentity, IdentityProvider, RouteGuard};
use codesist::challenge::Challenge;
use codesist::clock::SessionClock;
use codesist::config::{ConfigStore, FileConfigStore};
use codesist::history;
use codesist::runtime::{AppEvent, Runner, TerminalEventSource};
use codesist::session::{AttemptResult, SessionError, TypingSession};
use codesist::store::{AttemptStore, ChallengeStore, SqliteStore};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use rand::seq::SliceRandom;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::error::Error;
use std::io;
use std::path::PathBuf;

/// type real code against the clock and track your speed
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
struct Cli {
    /// act as this user (overrides the configured username)
    #[clap(short, long)]
    user: Option<String>,

    /// path to the local database
    #[clap(long)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// run a typing attempt against a challenge
    Play {
        /// challenge id; omit to get a random one
        challenge_id: Option<String>,
    },
    /// list the available challenges
    List,
    /// show past attempts, aggregated per challenge
    History {
        /// write raw attempt rows to a csv file instead
        #[clap(long)]
        export: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Preview,
    Typing,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    /// nothing to persist yet
    Pending,
    Saved,
    /// insert failed; the result is retained for resubmission
    Failed(String),
}

#[derive(Debug)]
pub struct App {
    pub challenge: Challenge,
    pub clock: SessionClock,
    pub session: Option<TypingSession>,
    pub input: String,
    pub screen: Screen,
    pub outcome: Option<AttemptResult>,
    pub save_state: SaveState,
    pub notice: Option<String>,
}

impl App {
    pub fn new(challenge: Challenge) -> Self {
        let time_limit = challenge.time_limit_secs();
        Self {
            challenge,
            clock: SessionClock::idle(time_limit),
            session: None,
            input: String::new(),
            screen: Screen::Preview,
            outcome: None,
            save_state: SaveState::Pending,
            notice: None,
        }
    }

    pub fn start(&mut self) -> Result<(), Box<dyn Error>> {
        let session = TypingSession::begin(self.challenge.id.clone(), self.challenge.code.clone())?;
        self.clock = SessionClock::start(self.challenge.time_limit_secs())?;
        self.session = Some(session);
        self.input.clear();
        self.outcome = None;
        self.save_state = SaveState::Pending;
        self.notice = None;
        self.screen = Screen::Typing;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.clock.reset(self.challenge.time_limit_secs());
        self.session = None;
        self.input.clear();
        self.outcome = None;
        self.save_state = SaveState::Pending;
        self.notice = None;
        self.screen = Screen::Preview;
    }

    fn evaluate_input(&mut self) {
        let elapsed = self.clock.elapsed_secs();
        let typed = self.input.clone();
        if let Some(session) = self.session.as_mut() {
            if let Some(result) = session.on_input(&typed, elapsed) {
                self.finish(result);
            }
        }
    }

    pub fn push_char(&mut self, c: char) {
        if self.screen != Screen::Typing {
            return;
        }
        self.input.push(c);
        self.evaluate_input();
    }

    pub fn backspace(&mut self) {
        if self.screen != Screen::Typing {
            return;
        }
        self.input.pop();
        self.evaluate_input();
    }

    /// Explicit submit before the target is fully typed.
    pub fn submit(&mut self) {
        if self.screen != Screen::Typing {
            return;
        }
        let elapsed = self.clock.elapsed_secs();
        if let Some(session) = self.session.as_mut() {
            match session.complete(elapsed) {
                Ok(result) => self.finish(result),
                Err(SessionError::EmptyAttempt) => {
                    self.notice = Some("type something before submitting".to_string());
                }
                Err(err) => {
                    self.notice = Some(err.to_string());
                }
            }
        }
    }

    /// One scheduled second elapsed. Expiry finalizes whatever was typed;
    /// an untouched attempt is discarded rather than recorded.
    pub fn on_tick(&mut self) {
        if self.screen != Screen::Typing {
            return;
        }
        if self.clock.tick() {
            let elapsed = self.clock.elapsed_secs();
            if let Some(session) = self.session.as_mut() {
                match session.complete(elapsed) {
                    Ok(result) => {
                        self.notice = Some("time's up".to_string());
                        self.finish(result);
                    }
                    Err(_) => {
                        self.notice =
                            Some("time's up: nothing typed, attempt not recorded".to_string());
                        self.screen = Screen::Results;
                    }
                }
            }
        }
    }

    fn finish(&mut self, result: AttemptResult) {
        self.outcome = Some(result);
        self.screen = Screen::Results;
    }

    pub fn session_ref(&self) -> Option<&TypingSession> {
        self.session.as_ref()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = FileConfigStore::new().load();
    let identity = ConfigIdentity::new(cli.user.clone().or(config.username.clone()));
    let guard = RouteGuard::default();

    let store = open_store(&cli, config.db_path.clone())?;

    match cli.command.clone().unwrap_or(Command::Play { challenge_id: None }) {
        Command::List => {
            for challenge in store.list_challenges()? {
                println!(
                    "{:<12} {:<28} {:<12} {:<8} {}",
                    challenge.id,
                    challenge.title,
                    challenge.language,
                    challenge.difficulty.to_string(),
                    format_mmss(challenge.time_limit_secs()),
                );
            }
            Ok(())
        }
        Command::History { export } => {
            let user = require_user(&guard, "history", &identity)?;
            let records = store.attempts_for_user(&user)?;
            if let Some(path) = export {
                let file = std::fs::File::create(&path)?;
                history::export_csv(&records, file)?;
                println!("wrote {} attempts to {}", records.len(), path.display());
                return Ok(());
            }
            if records.is_empty() {
                println!("no attempts recorded for {}", user);
                return Ok(());
            }
            for summary in history::summarize(&records) {
                println!(
                    "{:<12} {:>3} attempts  best {:>3} wpm  avg {:>3}% acc  {:>2} completed  last {}",
                    summary.challenge_id,
                    summary.attempts,
                    summary.best_wpm,
                    summary.mean_accuracy,
                    summary.completed_count,
                    history::humanize_since(summary.last_attempt),
                );
            }
            Ok(())
        }
        Command::Play { challenge_id } => {
            let user = require_user(&guard, "play", &identity)?;
            let challenge = match challenge_id {
                Some(id) => store.fetch_challenge(&id)?,
                None => pick_random(&store)?,
            };
            run_tui(App::new(challenge), &store, &user)
        }
    }
}

fn open_store(cli: &Cli, configured: Option<PathBuf>) -> Result<SqliteStore, Box<dyn Error>> {
    let store = match cli.db.clone().or(configured) {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_default()?,
    };
    Ok(store)
}

fn require_user(
    guard: &RouteGuard,
    route: &str,
    identity: &ConfigIdentity,
) -> Result<String, Box<dyn Error>> {
    match guard.check(route, identity) {
        Access::Granted => identity
            .current_user()
            .ok_or_else(|| "no user".to_string().into()),
        Access::Denied => {
            Err("not signed in: pass --user or set \"username\" in the config file".into())
        }
    }
}

fn pick_random(store: &SqliteStore) -> Result<Challenge, Box<dyn Error>> {
    let challenges = store.list_challenges()?;
    let mut rng = rand::thread_rng();
    challenges
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| "no challenges available".into())
}

fn run_tui(mut app: App, store: &SqliteStore, user: &str) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, store, user);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &SqliteStore,
    user: &str,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(TerminalEventSource::new());

    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            AppEvent::Tick => {
                app.on_tick();
                persist_if_due(app, store, user);
            }
            AppEvent::Resize => {}
            AppEvent::Key(key) => {
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break;
                }
                match (app.screen.clone(), key.code) {
                    (_, KeyCode::Esc) => break,
                    (Screen::Preview, KeyCode::Enter) => app.start()?,
                    (Screen::Typing, KeyCode::Enter) => {
                        app.push_char('\n');
                        persist_if_due(app, store, user);
                    }
                    (Screen::Typing, KeyCode::Backspace) => app.backspace(),
                    (Screen::Typing, KeyCode::Char('s'))
                        if key.modifiers.contains(KeyModifiers::CONTROL) =>
                    {
                        app.submit();
                        persist_if_due(app, store, user);
                    }
                    (Screen::Typing, KeyCode::Char(c))
                        if !key.modifiers.contains(KeyModifiers::CONTROL) =>
                    {
                        // no copy/paste shortcuts; every character is typed
                        app.push_char(c);
                        persist_if_due(app, store, user);
                    }
                    (Screen::Results, KeyCode::Left) => app.reset(),
                    (Screen::Results, KeyCode::Char('s')) => {
                        // retry a failed save without re-typing
                        persist_if_due(app, store, user);
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

/// Insert the finalized result once; keep it around if the store fails so a
/// retry can resubmit the same attempt.
fn persist_if_due(app: &mut App, store: &SqliteStore, user: &str) {
    if app.screen != Screen::Results || app.save_state == SaveState::Saved {
        return;
    }
    let Some(result) = app.outcome.clone() else {
        return;
    };
    match store.insert_attempt(user, &result) {
        Ok(()) => app.save_state = SaveState::Saved,
        Err(err) => app.save_state = SaveState::Failed(err.to_string()),
    }
}

pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesist::challenge::Difficulty;
    use codesist::clock::ClockState;

    fn tiny_challenge() -> Challenge {
        Challenge {
            id: "t-1".to_string(),
            title: "Tiny".to_string(),
            language: "rust".to_string(),
            difficulty: Difficulty::Hard,
            code: "ab".to_string(),
            description: None,
        }
    }

    #[test]
    fn format_mmss_pads() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(65), "01:05");
        assert_eq!(format_mmss(1200), "20:00");
    }

    #[test]
    fn app_starts_on_preview_with_idle_clock() {
        let app = App::new(tiny_challenge());
        assert_eq!(app.screen, Screen::Preview);
        assert_eq!(app.clock.state(), ClockState::Idle);
        assert_eq!(app.clock.total_secs(), 600);
    }

    #[test]
    fn typing_the_target_reaches_results() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        app.push_char('a');
        assert_eq!(app.screen, Screen::Typing);
        app.push_char('b');
        assert_eq!(app.screen, Screen::Results);
        let outcome = app.outcome.as_ref().unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.accuracy_percent, 100);
    }

    #[test]
    fn backspace_clears_errors() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        app.push_char('a');
        app.push_char('x');
        let session = app.session_ref().unwrap();
        assert_eq!(session.error_positions().len(), 1);
        app.backspace();
        app.push_char('b');
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn submit_with_nothing_typed_is_rejected() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        app.submit();
        assert_eq!(app.screen, Screen::Typing);
        assert!(app.outcome.is_none());
        assert!(app.notice.is_some());
    }

    #[test]
    fn expiry_finalizes_partial_attempt() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        app.push_char('a');
        for _ in 0..600 {
            app.on_tick();
        }
        assert_eq!(app.screen, Screen::Results);
        let outcome = app.outcome.as_ref().unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.elapsed_secs, 600);
    }

    #[test]
    fn expiry_with_empty_input_records_nothing() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        for _ in 0..600 {
            app.on_tick();
        }
        assert_eq!(app.screen, Screen::Results);
        assert!(app.outcome.is_none());
        assert!(app.notice.is_some());
    }

    #[test]
    fn reset_returns_to_preview() {
        let mut app = App::new(tiny_challenge());
        app.start().unwrap();
        app.push_char('a');
        app.push_char('b');
        app.reset();
        assert_eq!(app.screen, Screen::Preview);
        assert_eq!(app.clock.state(), ClockState::Idle);
        assert!(app.session_ref().is_none());
        assert!(app.outcome.is_none());
    }
}
