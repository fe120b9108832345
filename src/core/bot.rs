// src/core/bot.rs
use crate::config::AppConfig;
use crate::core::engine::{send_ui_event, TradingEngine};
use crate::core::state::{BotState, SharedState};
use crate::error::BotError;
use crate::simulators::{PriceSimulator, SentimentSimulator};
use crate::types::{Command, StrategyTag, UiEvent};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{error, info, warn};

pub const DCA_ALLOCATION_RANGE: RangeInclusive<f64> = 5.0..=80.0;
pub const GRID_COUNT_RANGE: RangeInclusive<usize> = 2..=20;

pub const LOG_EXPORT_FILE: &str = "bot_log.csv";
pub const SNAPSHOT_EXPORT_FILE: &str = "bot_snapshot.json";

/// Owns the periodic tasks and applies user commands to the shared state.
pub struct Bot {
    config: AppConfig,
    state: SharedState,
    ui_sender: mpsc::Sender<UiEvent>,
    rng: StdRng,
    tasks: Vec<JoinHandle<()>>,
}

impl Bot {
    pub fn new(config: AppConfig, ui_sender: mpsc::Sender<UiEvent>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = BotState::new(&config, StdRng::seed_from_u64(rng.gen())).shared();

        Self {
            config,
            state,
            ui_sender,
            rng,
            tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawns the price feed, sentiment feed and engine loops.
    pub async fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let price_period = Duration::from_millis(self.config.price.interval_ms);
        let sentiment_period = Duration::from_millis(self.config.sentiment.interval_ms);
        let engine_period = Duration::from_millis(self.config.engine.interval_ms);

        let price_sim = PriceSimulator::new(
            self.config.price.clone(),
            StdRng::seed_from_u64(self.rng.gen()),
        );
        let sentiment_sim = SentimentSimulator::new(
            self.config.sentiment.clone(),
            StdRng::seed_from_u64(self.rng.gen()),
        );
        let engine = TradingEngine::new(self.state.clone(), self.ui_sender.clone());

        self.tasks = vec![
            tokio::spawn(run_price_feed(
                self.state.clone(),
                price_sim,
                price_period,
                self.ui_sender.clone(),
            )),
            tokio::spawn(run_sentiment_feed(
                self.state.clone(),
                sentiment_sim,
                sentiment_period,
                self.ui_sender.clone(),
            )),
            tokio::spawn(engine.run(engine_period)),
        ];

        self.state.lock().await.running = true;
        info!("Bot started");
        send_ui_event(&self.ui_sender, UiEvent::Running(true));
    }

    /// Aborts the periodic tasks. A tick in progress finishes first since
    /// tasks are only cancelled at await points.
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        for task in &self.tasks {
            task.abort();
        }
        let _ = futures::future::join_all(self.tasks.drain(..)).await;

        self.state.lock().await.running = false;
        info!("Bot stopped");
        send_ui_event(&self.ui_sender, UiEvent::Running(false));
    }

    /// Applies one command. Returns `false` once the bot should shut down.
    pub async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.start().await,
            Command::Stop => self.stop().await,
            Command::ToggleRunning => {
                if self.is_running() {
                    self.stop().await;
                } else {
                    self.start().await;
                }
            }
            Command::ManualBuy => {
                let fill = self.state.lock().await.manual_buy();
                match fill {
                    Some(fill) => send_ui_event(&self.ui_sender, UiEvent::Fill(fill)),
                    None => warn!("Manual buy ignored: nothing to allocate"),
                }
            }
            Command::ManualSell(id) => {
                let fill = self.state.lock().await.manual_sell(&id);
                match fill {
                    Some(fill) => send_ui_event(&self.ui_sender, UiEvent::Fill(fill)),
                    None => warn!("Manual sell ignored: no open position {}", id),
                }
            }
            Command::Reset => {
                self.state.lock().await.reset();
                info!("Positions, balance and log reset");
                self.notify("Reset positions, balance and log".to_string());
            }
            Command::ToggleStrategy(tag) => self.toggle_strategy(tag).await,
            Command::SetDcaAllocation(pct) => {
                if !pct.is_finite() {
                    warn!("Ignoring DCA allocation {}", pct);
                    return true;
                }
                let pct = pct.clamp(*DCA_ALLOCATION_RANGE.start(), *DCA_ALLOCATION_RANGE.end());
                self.state
                    .lock()
                    .await
                    .strategies
                    .dca
                    .set_allocation_pct(pct);
                info!("DCA allocation set to {}%", pct);
            }
            Command::SetDcaDrop(pct) => {
                if !(pct.is_finite() && pct > 0.0) {
                    warn!("Ignoring DCA drop threshold {}", pct);
                    return true;
                }
                self.state.lock().await.strategies.dca.set_buy_drop_pct(pct);
                info!("DCA drop threshold set to {}%", pct);
            }
            Command::SetGridBand { min, max } => {
                if !(min.is_finite() && max.is_finite() && min > 0.0 && min < max) {
                    warn!("Ignoring grid band {} - {}", min, max);
                    return true;
                }
                self.state.lock().await.strategies.grid.set_band(min, max);
                info!("Grid band set to {} - {}", min, max);
            }
            Command::SetGridCount(grids) => {
                let grids = grids.clamp(*GRID_COUNT_RANGE.start(), *GRID_COUNT_RANGE.end());
                self.state.lock().await.strategies.grid.set_grids(grids);
                info!("Grid count set to {}", grids);
            }
            Command::ExportLog => match self.export_log().await {
                Ok(path) => self.notify(format!("Log exported to {}", path.display())),
                Err(e) => self.report(e),
            },
            Command::ExportSnapshot => match self.export_snapshot().await {
                Ok(path) => self.notify(format!("Snapshot exported to {}", path.display())),
                Err(e) => self.report(e),
            },
            Command::Quit => {
                self.stop().await;
                return false;
            }
        }
        true
    }

    /// Handles commands until `Quit` or until every sender is gone, then
    /// hands the stopped bot back for shutdown work such as exports.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Self {
        while let Some(command) = commands.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        self.stop().await;
        info!("Controller finished");
        self
    }

    pub async fn export_log(&self) -> Result<PathBuf, BotError> {
        let csv = self.state.lock().await.log.to_csv()?;
        let path = self.config.export_dir.join(LOG_EXPORT_FILE);
        write_export(path, csv.into_bytes()).await
    }

    pub async fn export_snapshot(&self) -> Result<PathBuf, BotError> {
        let snapshot = self.state.lock().await.snapshot();
        let data = serde_json::to_vec_pretty(&snapshot)?;
        let path = self.config.export_dir.join(SNAPSHOT_EXPORT_FILE);
        write_export(path, data).await
    }

    async fn toggle_strategy(&mut self, tag: StrategyTag) {
        let mut state = self.state.lock().await;
        match state.strategies.get_mut(tag) {
            Some(strategy) => {
                let enabled = !strategy.is_enabled();
                strategy.set_enabled(enabled);
                info!("{} {}", tag, if enabled { "enabled" } else { "disabled" });
            }
            None => warn!("{} has no automated rule to toggle", tag),
        }
    }

    fn notify(&self, message: String) {
        info!("{}", message);
        send_ui_event(&self.ui_sender, UiEvent::Log(message));
    }

    fn report(&self, err: BotError) {
        error!("{}", err);
        send_ui_event(&self.ui_sender, UiEvent::Log(format!("ERROR: {err}")));
    }
}

async fn write_export(path: PathBuf, data: Vec<u8>) -> Result<PathBuf, BotError> {
    let export_err = |source| BotError::Export {
        path: path.clone(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await.map_err(export_err)?;
    }
    tokio::fs::write(&path, data).await.map_err(export_err)?;
    Ok(path)
}

async fn run_price_feed(
    state: SharedState,
    mut simulator: PriceSimulator,
    period: Duration,
    ui_sender: mpsc::Sender<UiEvent>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let update = {
            let mut state = state.lock().await;
            let next = simulator.next_price(state.market.price, Utc::now().timestamp_millis());
            state.market.apply_price(next)
        };
        send_ui_event(&ui_sender, UiEvent::TickerUpdate(update));
    }
}

async fn run_sentiment_feed(
    state: SharedState,
    mut simulator: SentimentSimulator,
    period: Duration,
    ui_sender: mpsc::Sender<UiEvent>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let sentiment = simulator.next();
        let item = SentimentSimulator::headline(&sentiment);
        state
            .lock()
            .await
            .market
            .apply_sentiment(sentiment, item.clone());
        send_ui_event(&ui_sender, UiEvent::News(item));
    }
}
