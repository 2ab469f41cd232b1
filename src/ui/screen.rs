use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Countdown screen - renders the timer using the App widget
pub struct TimerScreen;

impl Screen for TimerScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// Key reference
pub struct HelpScreen;

const KEYS: [(&str, &str); 9] = [
    ("space", "start, pause or resume"),
    ("r", "reset to the start of a round"),
    ("tab", "move between round minutes, round seconds and rest"),
    ("↑ ↓ + -", "step the focused setting"),
    ("enter", "type a value for the focused setting (rest takes 1.5 or 30s)"),
    ("1-6", "round presets: 4, 5, 6, 7, 8 or 10 minutes"),
    ("?", "toggle this help"),
    ("q esc", "quit"),
    ("ctrl-c", "quit from anywhere"),
];

impl Screen for HelpScreen {
    fn render(&self, _app: &App, f: &mut Frame) {
        let area = f.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([
                Constraint::Min(KEYS.len() as u16 + 2),
                Constraint::Length(1),
            ])
            .split(area);

        let key_style = Style::default().add_modifier(Modifier::BOLD);
        let lines = KEYS
            .iter()
            .map(|(key, what)| {
                Line::from(vec![
                    Span::styled(format!("{key:>8}  "), key_style),
                    Span::raw(*what),
                ])
            })
            .collect::<Vec<_>>();

        let keys = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("keys"));
        f.render_widget(keys, chunks[0]);

        let footer = Paragraph::new(Span::styled(
            "Settings edits and presets are locked while the clock runs. (esc) back",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        f.render_widget(footer, chunks[1]);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Timer => Box::new(TimerScreen),
        AppState::Help => Box::new(HelpScreen),
    }
}
