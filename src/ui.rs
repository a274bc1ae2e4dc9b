use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table},
    Frame,
};
use crate::app::{App, Page};

pub fn render(f: &mut Frame, app: &mut App) {
    // 1. Layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body (Table or Logs)
        ])
        .split(f.area());

    // 2. Header
    let header_text = format!(
        " Namespace: {} | Pods: {} | [n] namespace  [tab] {}  [q] quit",
        app.namespace,
        app.pods.len(),
        match app.page {
            Page::Pods => "logs",
            Page::Logs => "pods",
        }
    );
    let header = Paragraph::new(header_text)
        .block(Block::default().borders(Borders::ALL).title(" podwatch "));
    f.render_widget(header, chunks[0]);

    // 3. Body
    match app.page {
        Page::Pods => render_pods(f, app, chunks[1]),
        Page::Logs => render_logs(f, app, chunks[1]),
    }

    // 4. Namespace picker on top of everything
    render_picker(f, app);
}

fn render_pods(f: &mut Frame, app: &mut App, area: Rect) {
    let header_cells = ["NAME", "STATUS", "AGE"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let table_header = Row::new(header_cells).height(1).bottom_margin(1);

    let now = Utc::now();
    let rows = app.pods.iter().map(|pod| {
        let [name, status, age] = pod.cells(now);

        // Colorize status
        let style = match status.as_str() {
            "Running" | "Succeeded" => Style::default().fg(Color::Green),
            "Pending" => Style::default().fg(Color::Yellow),
            _ => Style::default().fg(Color::Red),
        };

        Row::new(vec![
            Cell::from(name),
            Cell::from(status).style(style),
            Cell::from(age),
        ])
    });

    let table = Table::new(rows, [
        Constraint::Length(32),
        Constraint::Length(9),
        Constraint::Length(15),
    ])
    .header(table_header)
    .column_spacing(3)
    .row_highlight_style(Style::default().bg(Color::Blue))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)).title(" Pods "));

    f.render_stateful_widget(table, area, &mut app.table);
}

fn render_logs(f: &mut Frame, app: &App, area: Rect) {
    // Tail: only as many lines as fit inside the borders.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = app.logs.iter().skip(skip).map(|l| Line::from(l.as_str())).collect();

    let logs = Paragraph::new(lines)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title(" Logs "));
    f.render_widget(logs, area);
}

fn render_picker(f: &mut Frame, app: &mut App) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };
    let area = centered(f.area(), 50, 50);

    let items: Vec<ListItem> = if picker.items.is_empty() {
        vec![ListItem::new("Loading...")]
    } else {
        picker.items.iter().map(|n| ListItem::new(n.as_str())).collect()
    };
    let list = List::new(items)
        .highlight_style(Style::default().bg(Color::Blue))
        .block(Block::default().borders(Borders::ALL).title(" Namespaces "));

    f.render_widget(Clear, area);
    f.render_stateful_widget(list, area, &mut picker.state);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
