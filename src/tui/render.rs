use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use super::app::{format_rate, format_time_ns, truncate, TickerApp};
use crate::board::COLUMNS;
use crate::flap::FlapAnimator;

pub fn render(f: &mut Frame, app: &TickerApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // board
            Constraint::Length(1), // status
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_board(f, app, chunks[1]);
    render_status(f, app, chunks[2]);
    render_footer(f, chunks[3]);
}

fn render_header(f: &mut Frame, app: &TickerApp, area: Rect) {
    let (status_text, status_color) = if app.health.refreshing() {
        ("◌ refreshing", Color::Yellow)
    } else if app.last_alert.is_some() {
        ("✗ fetch failed", Color::Red)
    } else {
        ("● live", Color::Green)
    };

    let line = Line::from(vec![
        Span::styled(
            " Auction Ticker  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} items", app.board().len()),
            Style::default().fg(Color::White),
        ),
    ]);
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn flap_line(cells: &[FlapAnimator]) -> Line<'static> {
    let settled = Style::default().fg(Color::White).bg(Color::Black);
    let flipping = Style::default()
        .fg(Color::Yellow)
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    Line::from(
        cells
            .iter()
            .map(|flap| {
                let style = if flap.is_busy() { flipping } else { settled };
                Span::styled(flap.glyph().to_string(), style)
            })
            .collect::<Vec<_>>(),
    )
}

fn render_board(f: &mut Frame, app: &TickerApp, area: Rect) {
    let board = app.board();

    let header_cells = COLUMNS.iter().map(|c| {
        Cell::from(c.title).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = board
        .rows()
        .iter()
        .map(|row| Row::new(row.iter().map(|cells| Cell::from(flap_line(cells)))))
        .collect();

    // Columns grow with the widest value, never below the nominal width or title.
    let widths: Vec<Constraint> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let widest = board.rows().iter().map(|r| r[i].len()).max().unwrap_or(0);
            Constraint::Length(widest.max(c.width).max(c.title.len()) as u16)
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(2)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    " CURRENT BIDS ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        );
    f.render_widget(table, area);
}

fn render_status(f: &mut Frame, app: &TickerApp, area: Rect) {
    let mut spans = vec![
        Span::styled(" last refresh ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_time_ns(app.health.last_refresh_at_ns())),
        Span::raw("  │  "),
        Span::styled("flapping ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.busy().to_string()),
        Span::raw("  │  "),
        Span::styled("audio ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_rate(app.playback_rate())),
    ];
    if let Some(alert) = &app.last_alert {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(truncate(alert, 60), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh now"),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
