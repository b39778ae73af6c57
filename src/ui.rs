use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::nav::{Banner, ChoiceList, Confirm, Dialog, Layer, Overlay, TextPage};
use crate::shell::{FocusState, Shell};
use crate::view::TableView;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const BADGE: Color = Color::Rgb(30, 64, 175);
const OVERLAY: Color = Color::Rgb(55, 48, 163);

pub fn render(frame: &mut Frame, shell: &Shell) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], shell);
    render_body(frame, root[1], shell);
    render_footer(frame, root[2], shell);
}

fn render_header(frame: &mut Frame, area: Rect, shell: &Shell) {
    let left_line = build_left_header_line(shell);
    let right_line = build_right_header_line(shell);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width == 0 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_left_header_line(shell: &Shell) -> Line<'static> {
    let mut spans = vec![
        badge(" axe ", Color::Black, ACCENT),
        badge(format!(" {} ", shell.blade().name()), Color::White, BADGE),
    ];
    let current = shell.nav().current();
    for footer in shell.blade().footers() {
        let style = if footer.kind == current {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(59, 130, 246))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED).bg(BG)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!(" {} {} ", footer.index, footer.title),
            style,
        ));
    }
    Line::from(spans)
}

fn build_right_header_line(shell: &Shell) -> Line<'static> {
    let Some(view) = shell.focused_view() else {
        return Line::default();
    };
    let label = match view.refreshed_at() {
        Some(at) => format!(" {} · {} ", view.kind().title(), at.format("%H:%M:%S")),
        None => format!(" {} · loading ", view.kind().title()),
    };
    Line::from(badge(label, Color::White, BADGE))
}

fn badge(content: impl Into<String>, fg: Color, bg: Color) -> Span<'static> {
    Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    )
}

fn render_body(frame: &mut Frame, area: Rect, shell: &Shell) {
    let layers = shell.nav().layers();
    let base = layers
        .iter()
        .rposition(|layer| !layer.is_overlay())
        .unwrap_or_default();
    let mut banner = None;
    for layer in layers.iter().skip(base) {
        match layer {
            Layer::Table { kind, .. } => match shell.view(kind) {
                Some(view) => render_table(frame, area, view, !shell.nav().has_overlay()),
                None => render_placeholder(frame, area, kind),
            },
            Layer::Text(page) => render_text_page(frame, area, page),
            Layer::Overlay(Overlay::Status(status)) => banner = Some(status),
            Layer::Overlay(overlay) => render_overlay(frame, area, shell, overlay),
        }
    }
    if let Some(status) = banner {
        render_banner(frame, area, status);
    }
}

fn panel_block(title: impl Into<Line<'static>>, border: Color) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn render_placeholder(frame: &mut Frame, area: Rect, kind: &str) {
    let paragraph = Paragraph::new(format!("no view for {kind}"))
        .block(panel_block(kind.to_string(), MUTED))
        .style(Style::default().fg(MUTED));
    frame.render_widget(paragraph, area);
}

fn render_table(frame: &mut Frame, area: Rect, view: &TableView, focused: bool) {
    let headers = view.header();
    let rows = view.visible_rows();
    let mut title = format!("{} ({})", view.kind().title(), rows.len());
    if let Some(term) = view.search() {
        title.push_str(&format!(" /{term}"));
    }

    if !view.is_populated() {
        let paragraph = Paragraph::new("loading…")
            .block(panel_block(title, MUTED))
            .style(Style::default().fg(MUTED));
        frame.render_widget(paragraph, area);
        return;
    }

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.clone()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let body = rows.into_iter().map(|row| {
        Row::new(
            row.into_iter()
                .map(|column| Cell::from(column).style(Style::default().fg(Color::White))),
        )
    });

    let table = Table::new(body, column_constraints(headers.len()))
        .header(header_row)
        .block(panel_block(title, if focused { ACCENT } else { MUTED }))
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .cell_highlight_style(Style::default().fg(Color::Black).bg(ACCENT))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(view.selected_index());
    state.select_column(Some(view.selected_column()));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_text_page(frame: &mut Frame, area: Rect, page: &TextPage) {
    let viewport = area.height.saturating_sub(2).max(1) as usize;
    let top = text_window_top(page, viewport);
    let (text, background) = match &page.highlighted {
        Some(highlighted) => (
            Text::from(highlighted.lines.clone()),
            highlighted.background.unwrap_or(PANEL),
        ),
        None => (Text::from(page.body.join("\n")), PANEL),
    };
    let title = match page.follow {
        Some(_) => format!("{} [follow]", page.title),
        None => page.title.clone(),
    };
    let paragraph = Paragraph::new(text)
        .block(panel_block(title, ACCENT).style(Style::default().bg(background)))
        .style(Style::default().fg(Color::White))
        .scroll((top.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

// Streams keep the scroll line at the bottom of the viewport; static pages
// scroll from the top.
fn text_window_top(page: &TextPage, viewport: usize) -> usize {
    if page.follow.is_some() {
        page.scroll.saturating_sub(viewport.saturating_sub(1))
    } else {
        page.scroll
    }
}

fn render_overlay(frame: &mut Frame, area: Rect, shell: &Shell, overlay: &Overlay) {
    match overlay {
        Overlay::Menu => render_menu(frame, area, shell),
        Overlay::Search { input } => render_search(frame, area, input),
        Overlay::Dialog {
            dialog: Dialog::Choice(list),
            ..
        } => render_choice_list(frame, area, list),
        Overlay::Dialog {
            dialog: Dialog::Confirm(confirm),
            ..
        } => render_confirm(frame, area, confirm),
        Overlay::Status(banner) => render_banner(frame, area, banner),
    }
}

fn render_menu(frame: &mut Frame, area: Rect, shell: &Shell) {
    let popup = centered_rect(50, 60, area);
    frame.render_widget(Clear, popup);

    let mut lines = vec![Line::from(Span::styled(
        "pages",
        Style::default().fg(MUTED),
    ))];
    for footer in shell.blade().footers() {
        lines.push(key_line(footer.index, &footer.title));
    }
    if let Some(view) = shell.focused_view()
        && !view.actions().is_empty()
    {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "actions",
            Style::default().fg(MUTED),
        )));
        for action in view.actions() {
            lines.push(key_line(
                action.shortcut,
                &format!("{:<8} {}", action.name, action.description),
            ));
        }
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block("Menu", ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, popup);
}

fn key_line(key: char, label: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!(" {key} "),
            Style::default().fg(Color::Black).bg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {label}")),
    ])
}

fn render_search(frame: &mut Frame, area: Rect, input: &str) {
    let popup = centered_rect_lines(60, 3, area);
    frame.render_widget(Clear, popup);
    let line = Line::from(vec![
        Span::styled("/", Style::default().fg(WARN)),
        Span::raw(input.to_string()),
        Span::styled("▏", Style::default().fg(ACCENT)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(panel_block("Search", WARN)),
        popup,
    );
}

fn render_choice_list(frame: &mut Frame, area: Rect, list: &ChoiceList) {
    let height = (list.items.len() as u16).saturating_add(2);
    let popup = centered_rect_lines(50, height, area);
    frame.render_widget(Clear, popup);

    let lines = list
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let selected = index == list.selected;
            let marker = if selected { "> " } else { "  " };
            let shortcut = item
                .shortcut
                .map(|key| format!("({key}) "))
                .unwrap_or_default();
            let style = if selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!("{marker}{shortcut}{}", item.label), style),
                Span::styled(
                    if item.description.is_empty() {
                        String::new()
                    } else {
                        format!("  {}", item.description)
                    },
                    Style::default().fg(MUTED),
                ),
            ])
        })
        .collect::<Vec<_>>();

    frame.render_widget(
        Paragraph::new(lines).block(panel_block(list.title.clone(), ACCENT)),
        popup,
    );
}

fn render_confirm(frame: &mut Frame, area: Rect, confirm: &Confirm) {
    let popup = centered_rect_lines(60, 6, area);
    frame.render_widget(Clear, popup);

    let button = |label: &str, active: bool, color: Color| {
        let style = if active {
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        Span::styled(format!(" {label} "), style)
    };
    let lines = vec![
        Line::from(confirm.prompt.clone()),
        Line::from(""),
        Line::from(vec![
            button(&confirm.confirm_label, confirm.confirm_selected, ERROR),
            Span::raw("   "),
            button("Cancel", !confirm.confirm_selected, ACCENT),
        ])
        .alignment(Alignment::Center),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block("Confirm", WARN))
            .style(Style::default().fg(Color::White)),
        popup,
    );
}

fn render_banner(frame: &mut Frame, area: Rect, banner: &Banner) {
    let width = (banner.message.chars().count() as u16)
        .saturating_add(6)
        .min(area.width);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(4),
        width,
        height: 3.min(area.height),
    };
    let (title, color) = if banner.is_error {
        ("Error", ERROR)
    } else {
        ("Status", ACCENT)
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(banner.message.clone())
            .block(panel_block(title, color))
            .style(Style::default().fg(color)),
        popup,
    );
}

fn render_footer(frame: &mut Frame, area: Rect, shell: &Shell) {
    let mut spans = Vec::new();
    if let Some(Layer::Overlay(Overlay::Search { input })) = shell.nav().focused() {
        spans.push(badge(" search ", Color::Black, WARN));
        spans.push(Span::raw(format!(" /{input} ")));
    } else {
        let (label, bg) = focus_label(shell.focus_state());
        spans.push(badge(label, Color::White, bg));
        for (key, description) in shell.blade().shortcuts() {
            spans.push(Span::styled(
                format!(" {key}"),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!(" {description}"),
                Style::default().fg(MUTED),
            ));
        }
    }
    let line = compact_spans(spans, area.width as usize);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(BG)),
        area,
    );
}

fn focus_label(state: FocusState) -> (&'static str, Color) {
    match state {
        FocusState::Unpopulated => (" loading ", BADGE),
        FocusState::Populated => (" table ", Color::Rgb(17, 94, 89)),
        FocusState::ErrorOverlay => (" error ", Color::Rgb(127, 29, 29)),
        FocusState::MenuOverlay => (" menu ", OVERLAY),
        FocusState::SearchOverlay => (" search ", OVERLAY),
        FocusState::DialogOverlay => (" dialog ", OVERLAY),
        FocusState::TextPage => (" text ", BADGE),
        FocusState::DrillDown => (" drill ", Color::Rgb(17, 94, 89)),
    }
}

fn compact_spans(spans: Vec<Span<'static>>, max_chars: usize) -> Line<'static> {
    let mut used = 0usize;
    let mut kept = Vec::new();
    for span in spans {
        let width = span.content.chars().count();
        if used + width > max_chars {
            let remaining = max_chars.saturating_sub(used);
            if remaining > 0 {
                kept.push(Span::styled(
                    compact_text(&span.content, remaining),
                    span.style,
                ));
            }
            break;
        }
        used += width;
        kept.push(span);
    }
    Line::from(kept)
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

fn centered_rect_lines(percent_x: u16, lines: u16, area: Rect) -> Rect {
    let height = lines.min(area.height);
    let band = Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    };
    centered_rect(percent_x, 100, band)
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}
