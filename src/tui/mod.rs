// src/tui/mod.rs
use crate::core::bot::{DCA_ALLOCATION_RANGE, GRID_COUNT_RANGE};
use crate::core::state::{BotSnapshot, SharedState};
use crate::types::{Command, Position, SentimentTag, Side, StrategyTag, UiEvent};
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::{io, time::Duration};
use tokio::sync::mpsc;

const HISTORY_LIMIT: usize = 20;

pub struct App {
    pub snapshot: Option<BotSnapshot>,
    pub fills: Vec<String>,
    pub messages: Vec<String>,
    pub selected: usize,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            fills: Vec::new(),
            messages: Vec::new(),
            selected: 0,
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Fill(fill) => {
                let msg = match fill.side {
                    Side::Buy => format!(
                        "{} BUY {:.8} at ${} ({})",
                        fill.time.with_timezone(&Local).format("%H:%M:%S"),
                        fill.size,
                        fill.price,
                        fill.strategy
                    ),
                    Side::Sell => format!(
                        "{} SELL {:.8} at ${} pnl {:+.8}",
                        fill.time.with_timezone(&Local).format("%H:%M:%S"),
                        fill.size,
                        fill.price,
                        fill.pnl.unwrap_or_default()
                    ),
                };
                push_bounded(&mut self.fills, msg);
            }
            UiEvent::Running(running) => {
                let msg = if running { "Bot started" } else { "Bot stopped" };
                push_bounded(&mut self.messages, msg.to_string());
            }
            UiEvent::Log(msg) => push_bounded(&mut self.messages, msg),
            UiEvent::TickerUpdate(_) | UiEvent::News(_) => {}
        }
    }

    pub fn set_snapshot(&mut self, snapshot: BotSnapshot) {
        let len = snapshot.positions.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
        self.snapshot = Some(snapshot);
    }

    pub fn selected_position(&self) -> Option<&Position> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.positions.get(self.selected))
    }

    /// Maps a key press to a controller command. Navigation keys only move
    /// the selection.
    pub fn on_key(&mut self, code: KeyCode) -> Option<Command> {
        let snapshot = self.snapshot.as_ref();
        match code {
            KeyCode::Char('q') => Some(Command::Quit),
            KeyCode::Char('s') => Some(Command::ToggleRunning),
            KeyCode::Char('b') => Some(Command::ManualBuy),
            KeyCode::Char('r') => Some(Command::Reset),
            KeyCode::Char('d') => Some(Command::ToggleStrategy(StrategyTag::Dca)),
            KeyCode::Char('g') => Some(Command::ToggleStrategy(StrategyTag::Grid)),
            KeyCode::Char('n') => Some(Command::ToggleStrategy(StrategyTag::NewsScalp)),
            KeyCode::Char('e') => Some(Command::ExportLog),
            KeyCode::Char('j') => Some(Command::ExportSnapshot),
            KeyCode::Char('+') | KeyCode::Char('=') => snapshot.map(|s| {
                let pct = s.strategies.dca.allocation_pct + 5.0;
                Command::SetDcaAllocation(pct.min(*DCA_ALLOCATION_RANGE.end()))
            }),
            KeyCode::Char('-') => snapshot.map(|s| {
                let pct = s.strategies.dca.allocation_pct - 5.0;
                Command::SetDcaAllocation(pct.max(*DCA_ALLOCATION_RANGE.start()))
            }),
            KeyCode::Char(']') => snapshot.map(|s| {
                Command::SetGridCount((s.strategies.grid.grids + 1).min(*GRID_COUNT_RANGE.end()))
            }),
            KeyCode::Char('[') => snapshot.map(|s| {
                Command::SetGridCount(
                    s.strategies
                        .grid
                        .grids
                        .saturating_sub(1)
                        .max(*GRID_COUNT_RANGE.start()),
                )
            }),
            KeyCode::Char('x') => match self.selected_position() {
                Some(p) if p.is_open() => Some(Command::ManualSell(p.id.clone())),
                Some(p) => {
                    let msg = format!("Position {} is already sold", p.id);
                    push_bounded(&mut self.messages, msg);
                    None
                }
                None => None,
            },
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            KeyCode::Down => {
                let len = snapshot.map(|s| s.positions.len()).unwrap_or(0);
                if self.selected + 1 < len {
                    self.selected += 1;
                }
                None
            }
            _ => None,
        }
    }
}

fn push_bounded(list: &mut Vec<String>, msg: String) {
    list.push(msg);
    if list.len() > HISTORY_LIMIT {
        list.remove(0);
    }
}

pub async fn run(
    state: SharedState,
    mut rx: mpsc::Receiver<UiEvent>,
    commands: mpsc::Sender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state, &mut rx, &commands).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    state: SharedState,
    rx: &mut mpsc::Receiver<UiEvent>,
    commands: &mpsc::Sender<Command>,
) -> anyhow::Result<()> {
    let mut app = App::new();

    loop {
        let snapshot = state.lock().await.snapshot();
        app.set_snapshot(snapshot);
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(command) = app.on_key(key.code) {
                        let quit = command == Command::Quit;
                        if commands.send(command).await.is_err() || quit {
                            break;
                        }
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
    }

    Ok(())
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(1),
        ])
        .split(f.size());

    let Some(snapshot) = app.snapshot.as_ref() else {
        f.render_widget(Paragraph::new("Waiting for data..."), chunks[0]);
        return;
    };

    render_header(f, chunks[0], snapshot);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5)])
        .split(body[0]);
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(left[0]);

    render_balances(f, panels[0], snapshot);
    render_strategies(f, panels[1], snapshot);
    render_positions(f, left[1], snapshot, app.selected);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(body[1]);

    let news: Vec<ListItem> = snapshot
        .news
        .iter()
        .map(|n| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", n.time.with_timezone(&Local).format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(n.title.clone()),
            ]))
        })
        .collect();
    f.render_widget(
        List::new(news).block(
            Block::default()
                .borders(Borders::ALL)
                .title("News & Sentiment"),
        ),
        right[0],
    );

    let log: Vec<ListItem> = snapshot
        .log
        .iter()
        .map(|l| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", l.local_time()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(l.message.clone()),
            ]))
        })
        .collect();
    f.render_widget(
        List::new(log).block(Block::default().borders(Borders::ALL).title("Activity Log")),
        right[1],
    );

    let messages: Vec<ListItem> = app
        .fills
        .iter()
        .rev()
        .map(|s| ListItem::new(Span::styled(s.clone(), Style::default().fg(Color::Green))))
        .chain(
            app.messages
                .iter()
                .rev()
                .map(|s| ListItem::new(Span::raw(s.clone()))),
        )
        .collect();
    f.render_widget(
        List::new(messages).block(Block::default().borders(Borders::ALL).title("System")),
        right[2],
    );

    let help = Paragraph::new(
        "s start/stop  b buy  x sell  r reset  d/g/n toggle  +/- DCA%  [/] grids  e csv  j json  q quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(help, chunks[2]);
}

fn render_header(f: &mut Frame, area: Rect, s: &BotSnapshot) {
    let (state_text, state_color) = if s.running {
        ("RUNNING", Color::Green)
    } else {
        ("STOPPED", Color::Red)
    };
    let sentiment_color = match s.sentiment.tag {
        SentimentTag::Positive => Color::Green,
        SentimentTag::Negative => Color::Red,
        SentimentTag::Neutral => Color::Gray,
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Strategy Bot [{}]", s.symbol),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Price: "),
        Span::styled(
            format!("${:.0}", s.price),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Sentiment: "),
        Span::styled(
            format!("{} ({})", s.sentiment.tag, s.sentiment.score),
            Style::default().fg(sentiment_color),
        ),
        Span::raw(" | "),
        Span::styled(
            state_text,
            Style::default()
                .fg(state_color)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(header, area);
}

fn render_balances(f: &mut Frame, area: Rect, s: &BotSnapshot) {
    let asset = &s.base_asset;
    let pnl_color = if s.stats.realized_pnl >= 0.0 {
        Color::Green
    } else {
        Color::Red
    };
    let lines = vec![
        Line::from(format!("Starting:  {:.8} {}", s.starting_balance, asset)),
        Line::from(format!("Available: {:.8} {}", s.balance, asset)),
        Line::from(format!(
            "Open: {} ({:.8} {})",
            s.stats.open_positions, s.stats.open_exposure, asset
        )),
        Line::from(Span::styled(
            format!("Realized: {:+.8} {}", s.stats.realized_pnl, asset),
            Style::default().fg(pnl_color),
        )),
        Line::from(format!(
            "Win rate: {:.1}% ({}/{})",
            s.stats.win_rate, s.stats.wins, s.stats.closed_positions
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Balance")),
        area,
    );
}

fn render_strategies(f: &mut Frame, area: Rect, s: &BotSnapshot) {
    let flag = |on: bool| if on { "ON " } else { "OFF" };
    let dca = &s.strategies.dca;
    let grid = &s.strategies.grid;
    let scalp = &s.strategies.scalp;
    let lines = vec![
        Line::from(format!(
            "DCA   [{}] alloc {}% | buy drop {}%",
            flag(dca.enabled),
            dca.allocation_pct,
            dca.buy_drop_pct
        )),
        Line::from(format!(
            "GRID  [{}] {}-{} x{} | alloc {}%",
            flag(grid.enabled),
            grid.min_price,
            grid.max_price,
            grid.grids,
            grid.allocation_pct
        )),
        Line::from(format!(
            "SCALP [{}] score >= {} | p {:.2} | alloc {}%",
            flag(scalp.enabled),
            scalp.score_threshold,
            scalp.probability,
            scalp.allocation_pct
        )),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Strategies")),
        area,
    );
}

fn render_positions(f: &mut Frame, area: Rect, s: &BotSnapshot, selected: usize) {
    let header = Row::new(vec!["ID", "Strategy", "Size", "Buy", "Sell", "P&L"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = s
        .positions
        .iter()
        .map(|p| {
            let strategy = match p.meta.grid_level {
                Some(level) => format!("{} (G:{})", p.strategy, level),
                None => p.strategy.to_string(),
            };
            let (sell, pnl) = match p.sell_price {
                Some(price) => (format!("${}", price), p.pnl_at(price)),
                None => ("-".to_string(), p.pnl_at(s.price)),
            };
            let style = if p.sold {
                Style::default().fg(Color::DarkGray)
            } else if pnl >= 0.0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            Row::new(vec![
                Cell::from(p.id.clone()),
                Cell::from(strategy),
                Cell::from(format!("{:.8}", p.size)),
                Cell::from(format!("${}", p.entry_price)),
                Cell::from(sell),
                Cell::from(format!("{:+.8}", pnl)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Length(18),
        Constraint::Length(11),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(11),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Positions"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut table_state = TableState::default();
    if !s.positions.is_empty() {
        table_state.select(Some(selected));
    }
    f.render_stateful_widget(table, area, &mut table_state);
}
