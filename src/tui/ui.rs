use super::app::{App, Panel, ThemeKind};
use crate::data::Issue;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::tui::toast::{Toast, ToastVariant};

/// Palette derived from the persisted theme preference.
struct Palette {
    fg: Color,
    muted: Color,
    accent: Color,
    border: Color,
    focus: Color,
    success: Color,
    danger: Color,
    hold: Color,
}

impl Palette {
    fn for_theme(theme: ThemeKind) -> Self {
        match theme {
            ThemeKind::Dark => Self {
                fg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                border: Color::DarkGray,
                focus: Color::Cyan,
                success: Color::Green,
                danger: Color::Red,
                hold: Color::Yellow,
            },
            ThemeKind::Light => Self {
                fg: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                border: Color::Gray,
                focus: Color::Blue,
                success: Color::Green,
                danger: Color::Red,
                hold: Color::Magenta,
            },
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.theme);

    if !app.authenticated() {
        draw_token_screen(f, app, &palette);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Panels
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_header(f, app, &palette, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    draw_templates(f, app, &palette, panels[0]);
    draw_demos(f, app, &palette, panels[1]);
    draw_status_bar(f, app, &palette, chunks[2]);
    draw_toasts(f, app, &palette);

    if app.show_help {
        draw_help_popup(f, &palette);
    }
}

fn draw_token_screen(f: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(60, 9, f.area());
    let masked = "•".repeat(app.token_input.chars().count());

    let lines = vec![
        Line::from(Span::styled(
            "Authenticate",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Token: ", Style::default().fg(palette.fg)),
            Span::styled(masked, Style::default().fg(palette.fg)),
            Span::styled("▏", Style::default().fg(palette.accent)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Paste a fine-grained PAT with issues (read/write) and contents (read)",
            Style::default().fg(palette.muted),
        )),
        Line::from(Span::styled(
            "access to octodemo/bootstrap. Stored locally. Enter to continue, Esc to quit.",
            Style::default().fg(palette.muted),
        )),
    ];

    let block = Block::default()
        .title(" demodeck ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.focus));
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn draw_header(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let mut spans = vec![Span::styled(
        " demodeck ",
        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
    )];
    if let Some(user) = &app.current_user {
        spans.push(Span::styled(
            format!("— {} ", user),
            Style::default().fg(palette.muted),
        ));
    }
    if app.is_loading() {
        spans.push(Span::styled(
            format!("{} ", app.spinner_char()),
            Style::default().fg(palette.accent),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_templates(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let focused = app.panel == Panel::Templates;

    let items: Vec<ListItem> = if app.loading_templates {
        vec![ListItem::new(Line::from(Span::styled(
            "Loading templates...",
            Style::default().fg(palette.muted),
        )))]
    } else if app.templates.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No templates found",
            Style::default().fg(palette.muted),
        )))]
    } else {
        app.templates
            .iter()
            .map(|t| {
                let mut lines = vec![Line::from(Span::styled(
                    t.name.clone(),
                    Style::default().fg(palette.fg).add_modifier(Modifier::BOLD),
                ))];
                if let Some(about) = &t.about {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", about),
                        Style::default().fg(palette.muted),
                    )));
                }
                ListItem::new(lines)
            })
            .collect()
    };

    let border = if focused { palette.focus } else { palette.border };
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Templates ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(Style::default().bg(palette.accent).fg(Color::Black));

    let mut state = ListState::default();
    if focused && !app.templates.is_empty() {
        state.select(Some(app.selected_template));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn demo_line(app: &App, palette: &Palette, issue: &Issue) -> Vec<Line<'static>> {
    let pending = app.pending_ids.contains(&issue.id);

    let mut title_spans = vec![Span::styled(
        format!("#{} {}", issue.number, issue.title),
        if pending {
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC)
        } else {
            Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)
        },
    )];
    if issue.is_on_hold() {
        title_spans.push(Span::styled(
            " [hold]",
            Style::default().fg(palette.hold),
        ));
    }
    if pending {
        title_spans.push(Span::styled(
            format!(" {} pending", app.spinner_char()),
            Style::default().fg(palette.accent),
        ));
    }

    let mut detail = format!("  updated {}", issue.updated_at.format("%Y-%m-%d %H:%M"));
    if issue.demo_repo_url.is_some() {
        detail.push_str("  ↗ repo ready");
    }

    vec![
        Line::from(title_spans),
        Line::from(Span::styled(detail, Style::default().fg(palette.muted))),
    ]
}

fn draw_demos(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let focused = app.panel == Panel::Demos;

    let items: Vec<ListItem> = if app.demos.is_empty() {
        let text = if app.loading_demos {
            "Loading demos..."
        } else if app.current_user.is_none() {
            "Resolving identity..."
        } else {
            "No demo issues yet"
        };
        vec![ListItem::new(Line::from(Span::styled(
            text,
            Style::default().fg(palette.muted),
        )))]
    } else {
        app.demos
            .iter()
            .map(|issue| ListItem::new(demo_line(app, palette, issue)))
            .collect()
    };

    let border = if focused { palette.focus } else { palette.border };
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Your Demo Issues (open) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .highlight_style(Style::default().bg(palette.accent).fg(Color::Black));

    let mut state = ListState::default();
    if focused && !app.demos.is_empty() {
        state.select(Some(app.selected_demo));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_status_bar(f: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let line = if let Some(error) = &app.error_message {
        Line::from(Span::styled(
            format!(" {}", error),
            Style::default().fg(palette.danger),
        ))
    } else {
        Line::from(Span::styled(
            " tab panels · enter open · c close · h hold · r refresh · t theme · ? help · q quit",
            Style::default().fg(palette.muted),
        ))
    };
    f.render_widget(Paragraph::new(line), area);
}

fn toast_style(palette: &Palette, toast: &Toast) -> Style {
    match toast.variant {
        ToastVariant::Info => Style::default().fg(palette.accent),
        ToastVariant::Success => Style::default().fg(palette.success),
        ToastVariant::Error => Style::default().fg(palette.danger),
    }
}

/// Stacked in the bottom-right corner, newest at the bottom.
fn draw_toasts(f: &mut Frame, app: &App, palette: &Palette) {
    let area = f.area();
    let width = 44.min(area.width.saturating_sub(2));
    if width < 10 {
        return;
    }

    for (i, toast) in app.toasts.iter().rev().take(4).enumerate() {
        let height = 3;
        let bottom = area.height.saturating_sub(1 + (i as u16) * height);
        let Some(top) = bottom.checked_sub(height) else {
            break;
        };
        let rect = Rect {
            x: area.width.saturating_sub(width + 1),
            y: top,
            width,
            height,
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(toast_style(palette, toast));
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                toast.message.clone(),
                toast_style(palette, toast),
            )))
            .block(block)
            .wrap(Wrap { trim: true }),
            rect,
        );
    }
}

fn draw_help_popup(f: &mut Frame, palette: &Palette) {
    let area = centered_rect(52, 14, f.area());

    let rows = [
        ("tab", "switch between templates and demos"),
        ("j/k, ↓/↑", "move selection"),
        ("g / G", "first / last item"),
        ("enter, o", "open template form / demo repository"),
        ("c", "close the selected demo issue"),
        ("h", "toggle lifecycle hold"),
        ("r", "refresh the demo list"),
        ("t", "toggle light/dark theme"),
        ("L", "logout (forgets the stored token)"),
        ("q", "quit"),
    ];

    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(
                    format!(" {:<10}", key),
                    Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                ),
                Span::styled(*what, Style::default().fg(palette.fg)),
            ])
        })
        .collect();

    let block = Block::default()
        .title(" Keys ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.focus));
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Fixed-size popup centered in `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
