mod tui_app;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tui_app::{
    format_backing, format_opt_price, format_percent, format_price, format_time_ns, truncate,
    AppState, ConnectionStatus, DeltaRow, FundRow,
};

/// How often the dashboard polls the comparison API.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

type Term = Terminal<CrosstermBackend<io::Stdout>>;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build HTTP client");

    let mut app = AppState::new(base_url);
    app.refresh(&client).await;

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut app, &client).await;
    restore_terminal(&mut terminal)?;
    result
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Term,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let mut table_state = TableState::default();
    let mut last_fetch = Instant::now();

    loop {
        if last_fetch.elapsed() >= POLL_INTERVAL {
            app.refresh(client).await;
            last_fetch = Instant::now();
        }

        terminal.draw(|f| render(f, app, &mut table_state))?;

        // Short poll so the auto-refresh deadline is never missed by much.
        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                app.refresh(client).await;
                last_fetch = Instant::now();
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                app.force_server_refresh(client).await;
                app.refresh(client).await;
                last_fetch = Instant::now();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last_row = app.comparison.all_etfs.len().saturating_sub(1);
                let next = table_state.selected().map_or(0, |i| (i + 1).min(last_row));
                table_state.select(Some(next));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                table_state.select(Some(prev));
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // status bar
            Constraint::Length(3), // recommendation banner
            Constraint::Min(0),    // funds table
            Constraint::Length(1), // key hints
        ])
        .split(f.area());

    render_status_bar(f, app, chunks[0]);
    render_recommendation(f, app, chunks[1]);
    render_funds_table(f, app, table_state, chunks[2]);
    render_key_hints(f, chunks[3]);
}

fn render_status_bar(f: &mut Frame, app: &AppState, area: Rect) {
    let sep = || Span::raw("  │  ");

    let status = match &app.status {
        ConnectionStatus::Connected => {
            Span::styled("● connected", Style::default().fg(Color::Green))
        }
        ConnectionStatus::Connecting => {
            Span::styled("◌ connecting", Style::default().fg(Color::Yellow))
        }
        ConnectionStatus::Error(e) => Span::styled(
            format!("✗ {}", truncate(e, 40)),
            Style::default().fg(Color::Red),
        ),
    };

    let spot = app
        .comparison
        .spot_gram_gold_price
        .map_or("spot —".to_string(), |v| format!("spot {v:.2} TL/g"));

    let (fresh_label, fresh_color) = match app.health.quotes_fresh {
        Some(true) => ("fresh", Color::Green),
        Some(false) => ("stale", Color::Red),
        None => ("—", Color::DarkGray),
    };

    let last_fetch = app
        .health
        .last_refresh_at_ns
        .filter(|ns| *ns > 0)
        .map_or("no refresh yet".to_string(), |ns| {
            format!("last fetch {}", format_time_ns(ns))
        });

    let mut spans = vec![Span::styled(
        " BIST Gold Compare  ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    spans.push(status);
    spans.push(sep());
    spans.push(Span::styled(spot, Style::default().fg(Color::White)));
    spans.push(sep());
    spans.push(Span::styled(
        format!("{} quotes cached", app.health.cached_quotes.unwrap_or(0)),
        Style::default().fg(Color::White),
    ));
    spans.push(sep());
    spans.push(Span::styled(fresh_label, Style::default().fg(fresh_color)));
    spans.push(sep());
    spans.push(Span::styled(last_fetch, Style::default().fg(Color::DarkGray)));

    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(bar, area);
}

fn render_recommendation(f: &mut Frame, app: &AppState, area: Rect) {
    let (text, color) = if app.comparison.recommendation.is_empty() {
        ("waiting for data…".to_string(), Color::DarkGray)
    } else if app.comparison.cheapest.is_some() {
        (app.comparison.recommendation.clone(), Color::Green)
    } else {
        (app.comparison.recommendation.clone(), Color::Red)
    };

    let banner = Paragraph::new(Line::from(Span::styled(text, Style::default().fg(color))))
        .block(titled_block(" RECOMMENDATION "));
    f.render_widget(banner, area);
}

fn render_funds_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let cheapest = app.comparison.cheapest.as_ref().map(|c| c.symbol.as_str());

    let header = Row::new(
        [
            "#", "Symbol", "Fund", "Price", "Chg", "NAV", "Backing g", "TL/gram", "vs best",
        ]
        .iter()
        .map(|h| {
            Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        }),
    )
    .height(1);

    let rows: Vec<Row> = app
        .comparison
        .all_etfs
        .iter()
        .enumerate()
        .map(|(i, fund)| {
            let delta = app.comparison.price_difference.get(&fund.symbol);
            fund_row(i, fund, delta, cheapest)
        })
        .collect();

    let widths = [
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(titled_block(" FUNDS BY PRICE PER GRAM "))
        .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn fund_row(
    index: usize,
    fund: &FundRow,
    delta: Option<&DeltaRow>,
    cheapest: Option<&str>,
) -> Row<'static> {
    let rank = match delta {
        Some(_) => format!("{}", index + 1),
        None => "—".to_string(),
    };
    let per_gram = delta.map_or("—".to_string(), |d| format!("{:.4}", d.per_gram_price));
    let vs_best = delta.map_or("—".to_string(), |d| format!("+{:.2}%", d.percent_diff));

    let change_color = match fund.change_percent {
        Some(c) if c < 0.0 => Color::Red,
        Some(_) => Color::Green,
        None => Color::DarkGray,
    };
    let row_style = if Some(fund.symbol.as_str()) == cheapest {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else if delta.is_none() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Row::new(vec![
        Cell::from(rank).style(Style::default().fg(Color::DarkGray)),
        Cell::from(fund.symbol.clone()),
        Cell::from(truncate(&fund.name, 32)),
        Cell::from(format_price(fund.current_price)),
        Cell::from(format_percent(fund.change_percent)).style(Style::default().fg(change_color)),
        Cell::from(format_opt_price(fund.nav_price)),
        Cell::from(format_backing(fund.gold_backing_grams)),
        Cell::from(per_gram),
        Cell::from(vs_best),
    ])
    .style(row_style)
}

fn render_key_hints(f: &mut Frame, area: Rect) {
    let hint = |key: &'static str| Span::styled(key, Style::default().fg(Color::Yellow));
    let line = Line::from(vec![
        hint(" [q] "),
        Span::raw("quit  "),
        hint("[r] "),
        Span::raw("refresh view  "),
        hint("[f] "),
        Span::raw("force server fetch  "),
        hint("[↑↓ / j k] "),
        Span::raw("scroll  "),
        Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::White)), area);
}

fn titled_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}
