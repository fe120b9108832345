// src/core/engine.rs
use crate::core::state::{BotState, SharedState};
use crate::types::{Fill, Side, StrategyTag, UiEvent};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct TradingEngine {
    state: SharedState,
    ui_sender: mpsc::Sender<UiEvent>,
}

impl TradingEngine {
    pub fn new(state: SharedState, ui_sender: mpsc::Sender<UiEvent>) -> Self {
        Self { state, ui_sender }
    }

    /// Runs one evaluation under the state lock and forwards fills to the UI.
    pub async fn tick(&self) -> Vec<Fill> {
        let fills = {
            let mut state = self.state.lock().await;
            evaluate(&mut state, Utc::now())
        };

        for fill in &fills {
            match fill.side {
                Side::Buy => debug!(
                    "Paper Buy: {:.8} @ ${} via {} (pos {})",
                    fill.size, fill.price, fill.strategy, fill.position_id
                ),
                Side::Sell => debug!(
                    "Paper Sell: pos {} @ ${} (pnl {:+.8})",
                    fill.position_id,
                    fill.price,
                    fill.pnl.unwrap_or_default()
                ),
            }
            send_ui_event(&self.ui_sender, UiEvent::Fill(fill.clone()));
        }
        fills
    }

    /// Ticks every `period`, first firing one period after the call.
    pub async fn run(self, period: Duration) {
        info!("Engine loop running every {:?}", period);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let fills = self.tick().await;
            debug!("Engine tick done, {} fill(s)", fills.len());
        }
    }
}

/// Evaluates the enabled strategies in order. Each strategy sees the ledger
/// after the previous strategy's signals were executed.
pub fn evaluate(state: &mut BotState, now: DateTime<Utc>) -> Vec<Fill> {
    let market = state.market.snapshot(now);
    let mut fills = Vec::new();

    for tag in StrategyTag::AUTOMATED {
        let signals = {
            let BotState {
                strategies, ledger, ..
            } = &mut *state;
            match strategies.get_mut(tag) {
                Some(strategy) if strategy.is_enabled() => strategy.evaluate(&market, ledger),
                _ => continue,
            }
        };

        fills.extend(signals.into_iter().filter_map(|s| state.execute(s)));
    }

    fills
}

pub(crate) fn send_ui_event(sender: &mpsc::Sender<UiEvent>, event: UiEvent) {
    match sender.try_send(event) {
        Ok(_) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {}
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!("UI Channel closed! Interface is likely dead.");
        }
    }
}
