mod logging;
mod ui;

use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
};

use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use ringside::{
    config::{
        ConfigField, ConfigStore, ConfigWatcher, Configuration, FileConfigStore,
        MemoryConfigStore, Step, MAX_ROUND_MINUTES, MAX_ROUND_SECONDS, PRESET_MINUTES,
    },
    cue::{CueScheduler, DEFAULT_WARNING_WINDOW},
    engine::{SettleToken, TimerEngine, TimingPolicy, Update},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TimerEvent},
    session::Status,
    sound::{BellPlayer, CuePlayer, SilentPlayer},
};

/// round and rest interval timer for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "An interval timer that alternates a round countdown with a rest countdown until stopped. Settings are remembered between runs."
)]
pub struct Cli {
    /// round length as MM:SS or plain seconds (saved as the new default)
    #[clap(short = 'r', long, value_parser = parse_round)]
    round: Option<u32>,

    /// rest length in minutes, tenths allowed (saved as the new default)
    #[clap(short = 'b', long)]
    rest: Option<f64>,

    /// audible ticks during the final N seconds of each phase
    #[clap(short = 'w', long, default_value_t = DEFAULT_WARNING_WINDOW)]
    warning_window: u32,

    /// how audio cues are played
    #[clap(short = 's', long, value_enum, default_value_t = SoundMode::Bell)]
    sound: SoundMode,

    /// settings file to use instead of the platform default
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// keep setting changes for this run only
    #[clap(long)]
    no_save: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum SoundMode {
    Off,
    Bell,
    Tone,
}

fn parse_round(raw: &str) -> Result<u32, String> {
    let max = MAX_ROUND_MINUTES * 60 + MAX_ROUND_SECONDS;
    let total = match raw.split_once(':') {
        Some((m, s)) => {
            let minutes: u32 = m.trim().parse().map_err(|_| format!("bad minutes `{m}`"))?;
            let seconds: u32 = s.trim().parse().map_err(|_| format!("bad seconds `{s}`"))?;
            if seconds > MAX_ROUND_SECONDS {
                return Err(format!("seconds must be below 60, got {seconds}"));
            }
            minutes
                .checked_mul(60)
                .and_then(|m| m.checked_add(seconds))
                .ok_or_else(|| format!("round `{raw}` is too long"))?
        }
        None => raw
            .trim()
            .parse()
            .map_err(|_| format!("expected MM:SS or seconds, got `{raw}`"))?,
    };
    if total > max {
        return Err(format!("round may be at most 99:59, got `{raw}`"));
    }
    Ok(total)
}

impl Cli {
    fn timing_policy(&self) -> TimingPolicy {
        TimingPolicy {
            cues: CueScheduler::new(self.warning_window),
            ..TimingPolicy::default()
        }
    }

    /// Applies `--round` and `--rest` on top of the stored settings.
    fn overrides(&self, stored: Configuration) -> Option<Configuration> {
        if self.round.is_none() && self.rest.is_none() {
            return None;
        }
        let rest = self.rest.unwrap_or(stored.rest_minutes);
        let cfg = match self.round {
            Some(total) => Configuration::from_round_seconds(total, rest),
            None => Configuration::new(stored.round_minutes, stored.round_seconds, rest),
        };
        Some(cfg)
    }
}

/// The settings backend picked on the command line.
#[derive(Debug)]
pub enum SettingsStore {
    File(FileConfigStore),
    Memory(MemoryConfigStore),
}

impl ConfigStore for SettingsStore {
    fn load(&self) -> Configuration {
        match self {
            SettingsStore::File(store) => store.load(),
            SettingsStore::Memory(store) => store.load(),
        }
    }

    fn save(&mut self, cfg: &Configuration) -> ringside::Result<()> {
        match self {
            SettingsStore::File(store) => store.save(cfg),
            SettingsStore::Memory(store) => store.save(cfg),
        }
    }

    fn reload(&self) -> Option<Configuration> {
        match self {
            SettingsStore::File(store) => store.reload(),
            SettingsStore::Memory(store) => store.reload(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Timer,
    Help,
}

/// Text being typed into a settings field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub field: ConfigField,
    pub buffer: String,
}

const MAX_EDIT_LEN: usize = 5;

#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Handled(Option<Update>),
    Quit,
}

pub struct App {
    pub engine: TimerEngine<SettingsStore>,
    pub player: Box<dyn CuePlayer>,
    pub state: AppState,
    pub focus: ConfigField,
    pub edit: Option<FieldEdit>,
}

impl App {
    pub fn new(engine: TimerEngine<SettingsStore>, player: Box<dyn CuePlayer>) -> Self {
        Self {
            engine,
            player,
            state: AppState::Timer,
            focus: ConfigField::RoundMinutes,
            edit: None,
        }
    }

    fn emit(&mut self, update: Option<Update>) -> Option<Update> {
        if let Some(cue) = update.and_then(|u| u.cue) {
            self.player.play(cue);
        }
        update
    }

    pub fn on_tick(&mut self) -> Option<Update> {
        let update = self.engine.tick();
        self.emit(update)
    }

    pub fn on_settle(&mut self, token: SettleToken) -> Option<Update> {
        let update = self.engine.settle(token);
        self.emit(update)
    }

    pub fn on_config_changed(&mut self) -> Update {
        self.engine.reload_config()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        if self.edit.is_some() {
            return KeyOutcome::Handled(self.on_edit_key(key));
        }

        match self.state {
            AppState::Help => {
                if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
                    self.state = AppState::Timer;
                } else if key.code == KeyCode::Char('q') {
                    return KeyOutcome::Quit;
                }
                KeyOutcome::Handled(None)
            }
            AppState::Timer => self.on_timer_key(key),
        }
    }

    fn on_timer_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let update = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char(' ') => {
                if self.engine.state().status == Status::Running {
                    self.engine.pause()
                } else {
                    self.engine.start()
                }
            }
            KeyCode::Char('r') => Some(self.engine.reset()),
            KeyCode::Tab => {
                self.focus = self.focus.next();
                None
            }
            KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('k') => {
                self.engine.adjust_config(self.focus, Step::Increment)
            }
            KeyCode::Down | KeyCode::Char('-') | KeyCode::Char('j') => {
                self.engine.adjust_config(self.focus, Step::Decrement)
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if !self.engine.state().status.is_active() {
                    self.edit = Some(FieldEdit {
                        field: self.focus,
                        buffer: String::new(),
                    });
                }
                None
            }
            KeyCode::Char('?') => {
                self.state = AppState::Help;
                None
            }
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                self.engine.select_preset(PRESET_MINUTES[idx])
            }
            _ => None,
        };
        KeyOutcome::Handled(update)
    }

    fn on_edit_key(&mut self, key: KeyEvent) -> Option<Update> {
        let edit = self.edit.as_mut()?;
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | 's' | 'm') => {
                if edit.buffer.len() < MAX_EDIT_LEN {
                    edit.buffer.push(c);
                }
                None
            }
            KeyCode::Backspace => {
                edit.buffer.pop();
                None
            }
            KeyCode::Enter => {
                let FieldEdit { field, buffer } = self.edit.take()?;
                self.engine.set_config(field, &buffer)
            }
            KeyCode::Esc => {
                self.edit = None;
                None
            }
            _ => None,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = logging::init();

    let mut store = if cli.no_save {
        let stored = match &cli.config {
            Some(path) => FileConfigStore::with_path(path).load(),
            None => FileConfigStore::new().load(),
        };
        SettingsStore::Memory(MemoryConfigStore::new(stored))
    } else {
        SettingsStore::File(match &cli.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        })
    };

    if let Some(cfg) = cli.overrides(store.load()) {
        store.save(&cfg)?;
    }

    let events = CrosstermEventSource::new();
    let _watcher = match &store {
        SettingsStore::File(file) => {
            let tx = events.sender();
            ConfigWatcher::spawn(file.path(), move || {
                let _ = tx.send(TimerEvent::ConfigChanged);
            })
            .map_err(|err| tracing::warn!(error = %err, "settings will not be watched"))
            .ok()
        }
        SettingsStore::Memory(_) => None,
    };

    let engine = TimerEngine::new(store, cli.timing_policy());
    let mut app = App::new(engine, build_player(cli.sound));
    let mut runner = Runner::new(events, FixedTicker::one_second());
    tracing::info!(sound = %cli.sound, config = ?app.engine.config(), "ringside starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &mut runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn build_player(mode: SoundMode) -> Box<dyn CuePlayer> {
    match mode {
        SoundMode::Off => Box::new(SilentPlayer),
        SoundMode::Bell => Box::new(BellPlayer::new(io::stdout())),
        SoundMode::Tone => tone_player(),
    }
}

#[cfg(feature = "tone")]
fn tone_player() -> Box<dyn CuePlayer> {
    Box::new(ringside::sound::TonePlayer::new(1.0))
}

#[cfg(not(feature = "tone"))]
fn tone_player() -> Box<dyn CuePlayer> {
    tracing::warn!("built without the `tone` feature, using the terminal bell");
    Box::new(BellPlayer::new(io::stdout()))
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &mut Runner<CrosstermEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let update = match runner.step() {
            TimerEvent::Tick => app.on_tick(),
            TimerEvent::Settle(token) => app.on_settle(token),
            TimerEvent::ConfigChanged => Some(app.on_config_changed()),
            TimerEvent::Resize => None,
            TimerEvent::Key(key) => match app.on_key(key) {
                KeyOutcome::Quit => break,
                KeyOutcome::Handled(update) => update,
            },
            TimerEvent::Closed => break,
        };

        if let Some(update) = &update {
            runner.track(update);
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    tracing::info!("ringside exiting");
    Ok(())
}
