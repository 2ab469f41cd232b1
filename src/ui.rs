pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};
use ringside::{
    config::{ConfigField, Configuration, PRESET_MINUTES},
    session::{Phase, Status, TimerState},
    util::format_clock,
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = self.engine.state();
        let config = self.engine.config();
        let window = self.engine.policy().cues.warning_window();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1), // phase badge
                Constraint::Length(1),
                Constraint::Length(1), // clock
                Constraint::Length(2),
                Constraint::Length(1), // settings
                Constraint::Length(1), // presets
                Constraint::Min(0),
                Constraint::Length(1), // key legend
            ])
            .split(area);

        Paragraph::new(Line::from(phase_badge(state)))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(Span::styled(
            format_clock(state.remaining_seconds),
            clock_style(state, window),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        Paragraph::new(settings_line(self, config))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

        Paragraph::new(preset_line(config))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);

        let legend = if self.edit.is_some() {
            "digits type · enter save · esc cancel"
        } else {
            "space start/pause · r reset · tab field · ↑↓ adjust · enter edit · ? help · q quit"
        };
        Paragraph::new(Span::styled(
            legend,
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[8], buf);
    }
}

fn phase_colour(phase: Phase) -> Color {
    match phase {
        Phase::Round => Color::Green,
        Phase::Rest => Color::Cyan,
    }
}

fn phase_badge(state: TimerState) -> Vec<Span<'static>> {
    let badge = Span::styled(
        format!(" {} ", state.phase),
        Style::default()
            .fg(Color::Black)
            .bg(phase_colour(state.phase))
            .add_modifier(Modifier::BOLD),
    );
    let status = match state.status {
        Status::Idle => "ready",
        Status::Running => "",
        Status::Paused => "paused",
        Status::Transitioning => "…",
    };
    let mut spans = vec![badge];
    if !status.is_empty() {
        spans.push(Span::styled(
            format!(" {status}"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    spans
}

/// The clock turns red in the warning window and flashes on even seconds.
fn clock_style(state: TimerState, window: u32) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    if state.status == Status::Running && state.in_warning_window(window) {
        let warn = base.fg(Color::Red);
        if state.remaining_seconds % 2 == 0 {
            warn.add_modifier(Modifier::REVERSED)
        } else {
            warn
        }
    } else {
        base.fg(phase_colour(state.phase))
    }
}

fn settings_line(app: &App, config: Configuration) -> Line<'static> {
    let locked = app.engine.state().status.is_active();
    let field = |field: ConfigField| -> Span<'static> {
        let (text, style) = match &app.edit {
            Some(edit) if edit.field == field => (
                format!("{}_", edit.buffer),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            _ if field == app.focus && !locked => (
                config.field_text(field),
                Style::default().add_modifier(Modifier::UNDERLINED | Modifier::BOLD),
            ),
            _ => (config.field_text(field), Style::default()),
        };
        let style = if locked {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        };
        Span::styled(text, style)
    };

    Line::from(vec![
        Span::raw("round "),
        field(ConfigField::RoundMinutes),
        Span::raw(":"),
        field(ConfigField::RoundSeconds),
        Span::raw("   rest "),
        field(ConfigField::RestMinutes),
    ])
}

fn preset_line(config: Configuration) -> Line<'static> {
    let spans = PRESET_MINUTES
        .iter()
        .enumerate()
        .flat_map(|(idx, &minutes)| {
            let selected = config.round_minutes == minutes && config.round_seconds == 0;
            let style = if selected {
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            [
                Span::styled(format!("{}:{}m", idx + 1, minutes), style),
                Span::raw("  "),
            ]
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}
