use crate::config::Config;
use crate::schedule::Block;
use crate::session::Session;
use crate::view::{
    available_controls, block_appearance, progress_fraction, remaining_label, shows_remaining,
    BlockAppearance,
};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block as Panel, BorderType, Borders, Gauge, Paragraph},
    Frame,
};
use spark_ipc::{Control, SessionStatus};

const BLOCK_ROW_HEIGHT: u16 = 2;

pub fn draw(f: &mut Frame, session: &Session, config: &Config) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, chunks[0], config);
    draw_blocks(f, chunks[1], session, config);
    draw_controls(f, chunks[2], session.status(), config);
    draw_footer(f, chunks[3], config);
}

fn draw_header(f: &mut Frame, area: Rect, config: &Config) {
    let theme = &config.theme;
    let text = Line::from(vec![
        Span::raw(format!("{} ", config.icons.header)),
        Span::styled(
            "SPARK Practice Timer",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(
            Panel::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(theme.track)),
        ),
        area,
    );
}

fn draw_blocks(f: &mut Frame, area: Rect, session: &Session, config: &Config) {
    let panel = Panel::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(config.theme.muted));
    let inner_area = panel.inner(area);
    f.render_widget(panel, area);

    let constraints: Vec<Constraint> = session
        .blocks()
        .iter()
        .map(|_| Constraint::Length(BLOCK_ROW_HEIGHT))
        .collect();
    let rows = Layout::default().constraints(constraints).split(inner_area);
    for (block, row) in session.blocks().iter().zip(rows.iter()) {
        draw_block(f, *row, block, session.status(), config);
    }
}

fn draw_block(f: &mut Frame, area: Rect, block: &Block, status: SessionStatus, config: &Config) {
    let theme = &config.theme;
    let icons = &config.icons;
    let appearance = block_appearance(block, status);
    let paused = appearance == BlockAppearance::Running && status != SessionStatus::Running;
    let (icon, color) = match appearance {
        BlockAppearance::Neutral => (&icons.pending, theme.foreground),
        BlockAppearance::Pending => (&icons.pending, theme.pending),
        BlockAppearance::Running if paused => (&icons.paused, theme.paused),
        BlockAppearance::Running => (&icons.running, theme.running),
        BlockAppearance::Done => (&icons.done, theme.done),
    };

    let lines = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let mut title_style = Style::default().fg(color);
    if appearance == BlockAppearance::Running {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!(" {} ", icon), Style::default().fg(color)),
            Span::styled(block.title().to_string(), title_style),
        ])),
        lines[0],
    );
    if shows_remaining(block, status) {
        f.render_widget(
            Paragraph::new(remaining_label(block))
                .style(Style::default().fg(theme.foreground))
                .alignment(Alignment::Right),
            lines[0],
        );
    }
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(color).bg(theme.track))
            .label("")
            .ratio(progress_fraction(block)),
        lines[1],
    );
}

fn draw_controls(f: &mut Frame, area: Rect, status: SessionStatus, config: &Config) {
    let theme = &config.theme;
    let mut spans = vec![Span::styled(
        format!(" {} ", status.to_string().to_uppercase()),
        Style::default()
            .bg(status_color(status, config))
            .fg(theme.background)
            .add_modifier(Modifier::BOLD),
    )];
    for control in available_controls(status) {
        spans.push(Span::raw(format!(" {} ", config.icons.separator)));
        spans.push(Span::styled(
            format!("{}:{}", key_label(*control), control_label(*control, status)),
            Style::default().fg(theme.foreground),
        ));
    }
    spans.push(Span::raw(format!(" {} ", config.icons.separator)));
    spans.push(Span::styled("q:quit", Style::default().fg(theme.muted)));

    f.render_widget(
        Paragraph::new(Line::from(spans)).block(
            Panel::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(theme.track)),
        ),
        area,
    );
}

fn draw_footer(f: &mut Frame, area: Rect, config: &Config) {
    f.render_widget(
        Paragraph::new(format!("{} www.sparkpractice.com", config.icons.header))
            .style(Style::default().fg(config.theme.muted))
            .alignment(Alignment::Center),
        area,
    );
}

fn status_color(status: SessionStatus, config: &Config) -> Color {
    let theme = &config.theme;
    match status {
        SessionStatus::Initial => theme.accent,
        SessionStatus::Running => theme.running,
        SessionStatus::Waiting | SessionStatus::Paused => theme.paused,
        SessionStatus::Ended => theme.done,
    }
}

fn key_label(control: Control) -> &'static str {
    match control {
        Control::Start => "s",
        Control::Pause | Control::Resume => "space",
        Control::Reset => "r",
    }
}

fn control_label(control: Control, status: SessionStatus) -> &'static str {
    match (control, status) {
        (Control::Start, _) => "start",
        (Control::Pause, _) => "stop",
        (Control::Resume, SessionStatus::Waiting) => "start next block",
        (Control::Resume, _) => "resume",
        (Control::Reset, _) => "reset",
    }
}

/// Maps a key press to the control it triggers in `status`, if that control
/// is currently available.
pub fn control_for_key(code: KeyCode, status: SessionStatus) -> Option<Control> {
    let control = match code {
        KeyCode::Char('s') => Control::Start,
        KeyCode::Char(' ') if status == SessionStatus::Running => Control::Pause,
        KeyCode::Char(' ') => Control::Resume,
        KeyCode::Char('r') => Control::Reset,
        _ => return None,
    };
    available_controls(status)
        .contains(&control)
        .then_some(control)
}
