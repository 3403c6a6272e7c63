use crate::{format_mmss, App, SaveState, Screen};
use codesist::session::TypingSession;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const LOW_TIME_SECS: u32 = 60;

pub fn draw(app: &App, f: &mut Frame) {
    match app.screen {
        Screen::Preview => draw_preview(app, f),
        Screen::Typing => draw_typing(app, f),
        Screen::Results => draw_results(app, f),
    }
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

/// Center a block as wide as the longest code line, capped to the frame.
fn centered_code_area(target: &str, area: Rect) -> Rect {
    let code_width = (target.lines().map(|l| l.width()).max().unwrap_or(0) as u16 + 4)
        .min(area.width);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(code_width),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

fn draw_preview(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let challenge = &app.challenge;
    let mut header_lines = vec![
        Line::from(Span::styled(challenge.title.clone(), bold())),
        Line::from(Span::raw(format!(
            "{} · {} · time limit {}",
            challenge.language,
            challenge.difficulty,
            format_mmss(challenge.time_limit_secs()),
        ))),
    ];
    if let Some(description) = &challenge.description {
        header_lines.push(Line::from(Span::styled(description.clone(), dim())));
    }
    let header = Paragraph::new(header_lines).alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    let code_area = centered_code_area(&challenge.code, chunks[1]);
    let code = Paragraph::new(
        challenge
            .code
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), dim())))
            .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::ALL))
    .wrap(Wrap { trim: false });
    f.render_widget(code, code_area);

    let footer = Paragraph::new(Span::styled("enter: start · esc: quit", dim()))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[2]);
}

fn draw_typing(app: &App, f: &mut Frame) {
    let Some(session) = app.session_ref() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let remaining = app.clock.remaining_secs();
    let timer_style = if remaining < LOW_TIME_SECS {
        Style::default().fg(Color::Red).patch(bold())
    } else {
        bold()
    };
    let error_count = session.error_positions().len();
    let status = Line::from(vec![
        Span::styled(format_mmss(remaining), timer_style),
        Span::raw("   "),
        Span::raw(format!("accuracy {}%", session.accuracy_percent())),
        Span::raw("   "),
        if error_count > 0 {
            Span::styled(
                format!(
                    "{} error{}",
                    error_count,
                    if error_count == 1 { "" } else { "s" }
                ),
                Style::default().fg(Color::Red),
            )
        } else {
            Span::styled("clean".to_string(), Style::default().fg(Color::Green))
        },
    ]);
    f.render_widget(Paragraph::new(status).alignment(Alignment::Center), chunks[0]);

    let progress = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .percent(session.progress_percent() as u16);
    f.render_widget(progress, chunks[1]);

    let code_area = centered_code_area(session.target(), chunks[2]);
    let code = Paragraph::new(prompt_lines(session)).wrap(Wrap { trim: false });
    f.render_widget(code, code_area);

    if let Some(notice) = &app.notice {
        let warn = Paragraph::new(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center);
        f.render_widget(warn, chunks[3]);
    }

    let footer = Paragraph::new(Span::styled("ctrl+s: submit · esc: quit", dim()))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[4]);
}

/// Style every target character by its evaluation: typed-correct green,
/// typed-error red (showing what was typed), cursor underlined, rest dim.
/// Newlines get a visible marker so misses at end of line stand out.
fn prompt_lines(session: &TypingSession) -> Vec<Line<'static>> {
    let green = Style::default().patch(bold()).fg(Color::Green);
    let red = Style::default().patch(bold()).fg(Color::Red);
    let cursor = dim().patch(bold()).add_modifier(Modifier::UNDERLINED);

    let typed: Vec<char> = session.typed().chars().collect();
    let errors = session.error_positions();

    let mut lines = Vec::new();
    let mut spans: Vec<Span> = Vec::new();

    for (idx, want) in session.target().chars().enumerate() {
        let (text, style) = if idx < typed.len() {
            if errors.contains(&idx) {
                (display_char(typed[idx]), red)
            } else {
                (display_char(want), green)
            }
        } else if idx == typed.len() {
            (display_char(want), cursor)
        } else {
            (display_char(want), dim().patch(bold()))
        };
        spans.push(Span::styled(text, style));
        if want == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }

    // overflow beyond the target is always an error
    let target_len = session.target().chars().count();
    for &ch in typed.iter().skip(target_len) {
        spans.push(Span::styled(display_char(ch), red));
    }

    if !spans.is_empty() {
        lines.push(Line::from(spans));
    }
    lines
}

fn display_char(c: char) -> String {
    match c {
        '\n' => "↵".to_string(),
        ' ' => " ".to_string(),
        '\t' => "⇥".to_string(),
        other => other.to_string(),
    }
}

fn draw_results(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    let mut body: Vec<Line> = Vec::new();
    match &app.outcome {
        Some(outcome) => {
            body.push(Line::from(Span::styled(
                format!(
                    "{} wpm   {}% acc   {} time",
                    outcome.wpm,
                    outcome.accuracy_percent,
                    format_mmss(outcome.elapsed_secs),
                ),
                bold(),
            )));
            body.push(Line::from(""));
            if outcome.completed {
                body.push(Line::from("you completed the entire challenge"));
            } else if let Some(session) = app.session_ref() {
                body.push(Line::from(format!(
                    "you typed {}% of the challenge",
                    session.progress_percent()
                )));
            }
            let encouragement = if outcome.wpm < 40 {
                "keep practicing to improve your speed"
            } else if outcome.wpm < 60 {
                "good job, you're making progress"
            } else {
                "excellent speed"
            };
            body.push(Line::from(Span::styled(encouragement, dim())));
        }
        None => {
            body.push(Line::from(Span::styled(
                "no result recorded",
                Style::default().fg(Color::Yellow),
            )));
        }
    }
    let summary = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(summary, chunks[0]);

    if let Some(notice) = &app.notice {
        let warn = Paragraph::new(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center);
        f.render_widget(warn, chunks[1]);
    }

    let save_line = match &app.save_state {
        SaveState::Saved => Span::styled("result saved", Style::default().fg(Color::Green)),
        SaveState::Failed(err) => Span::styled(
            format!("save failed ({}), press s to retry", err),
            Style::default().fg(Color::Red),
        ),
        SaveState::Pending => Span::raw(""),
    };
    f.render_widget(
        Paragraph::new(save_line).alignment(Alignment::Center),
        chunks[3],
    );

    let footer = Paragraph::new(Span::styled("←: try again · esc: quit", dim()))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[5]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_char_marks_whitespace() {
        assert_eq!(display_char('\n'), "↵");
        assert_eq!(display_char('\t'), "⇥");
        assert_eq!(display_char('a'), "a");
    }

    #[test]
    fn prompt_lines_splits_on_newlines() {
        let session = TypingSession::begin("c", "ab\ncd").unwrap();
        let lines = prompt_lines(&session);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn prompt_lines_includes_overflow() {
        let mut session = TypingSession::begin("c", "ab").unwrap();
        session.on_input("abxy", 1);
        let lines = prompt_lines(&session);
        // single target line plus two overflow spans
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 4);
    }
}
