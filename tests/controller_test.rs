use std::time::Duration;
use strategy_bot::core::bot::Bot;
use strategy_bot::types::{Command, StrategyTag, UiEvent};
use tokio::sync::mpsc;

mod common;
use common::test_config;

fn bot(dir: &tempfile::TempDir) -> (Bot, mpsc::Receiver<UiEvent>) {
    let (ui_tx, ui_rx) = mpsc::channel(1024);
    (Bot::new(test_config(dir.path()), ui_tx), ui_rx)
}

#[tokio::test]
async fn manual_buy_then_sell_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bot, mut ui_rx) = bot(&dir);
    let state = bot.state();

    assert!(bot.handle(Command::ManualBuy).await);
    let id = {
        let state = state.lock().await;
        assert!((state.ledger.balance() - 0.98).abs() < 1e-12);
        state.ledger.positions()[0].id.clone()
    };
    assert!(matches!(ui_rx.try_recv(), Ok(UiEvent::Fill(_))));

    assert!(bot.handle(Command::ManualSell(id.clone())).await);
    {
        let state = state.lock().await;
        assert!(state.ledger.get(&id).unwrap().sold);
        assert!((state.ledger.balance() - 1.0).abs() < 1e-12);
        assert_eq!(state.log.len(), 2);
    }

    // Second sell of the same position changes nothing.
    assert!(bot.handle(Command::ManualSell(id)).await);
    assert_eq!(state.lock().await.log.len(), 2);
}

#[tokio::test]
async fn reset_clears_positions_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bot, _ui_rx) = bot(&dir);
    bot.handle(Command::ManualBuy).await;
    bot.handle(Command::ManualBuy).await;

    bot.handle(Command::Reset).await;

    let state = bot.state();
    let state = state.lock().await;
    assert_eq!(state.ledger.balance(), 1.0);
    assert!(state.ledger.positions().is_empty());
    assert!(state.log.is_empty());
}

#[tokio::test]
async fn config_commands_clamp_and_ignore_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bot, _ui_rx) = bot(&dir);
    let state = bot.state();

    bot.handle(Command::SetDcaAllocation(95.0)).await;
    bot.handle(Command::SetGridCount(1)).await;
    bot.handle(Command::SetGridBand {
        min: 70_000.0,
        max: 65_000.0,
    })
    .await;
    bot.handle(Command::SetDcaDrop(f64::NAN)).await;
    bot.handle(Command::ToggleStrategy(StrategyTag::Grid)).await;
    bot.handle(Command::ToggleStrategy(StrategyTag::Manual)).await;

    let settings = state.lock().await.strategies.settings();
    assert_eq!(settings.dca.allocation_pct, 80.0);
    assert_eq!(settings.dca.buy_drop_pct, 3.0);
    assert_eq!(settings.grid.grids, 2);
    assert_eq!(settings.grid.min_price, 58_000.0);
    assert_eq!(settings.grid.max_price, 62_000.0);
    assert!(!settings.grid.enabled);

    bot.handle(Command::SetGridBand {
        min: 50_000.0,
        max: 55_000.0,
    })
    .await;
    let settings = state.lock().await.strategies.settings();
    assert_eq!(settings.grid.min_price, 50_000.0);
    assert_eq!(settings.grid.max_price, 55_000.0);
}

#[tokio::test]
async fn exports_log_csv_and_snapshot_json() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bot, _ui_rx) = bot(&dir);
    bot.handle(Command::ManualBuy).await;

    bot.handle(Command::ExportLog).await;
    bot.handle(Command::ExportSnapshot).await;

    let csv = std::fs::read_to_string(dir.path().join("bot_log.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Time,Message"));
    assert!(lines.next().unwrap().contains("BUY 0.02000000 BTC @ $60000 via MANUAL"));

    let json = std::fs::read_to_string(dir.path().join("bot_snapshot.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["positions"].as_array().unwrap().len(), 1);
    assert_eq!(value["positions"][0]["strategy"], "MANUAL");
    assert_eq!(value["symbol"], "BTCUSDT");
}

#[tokio::test]
async fn timers_run_only_while_started() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bot, mut ui_rx) = bot(&dir);
    let state = bot.state();

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(state.lock().await.market.last_update.is_none());

    bot.handle(Command::Start).await;
    assert!(bot.is_running());
    assert!(state.lock().await.running);
    tokio::time::sleep(Duration::from_millis(150)).await;

    bot.handle(Command::ToggleRunning).await;
    assert!(!bot.is_running());
    assert!(!state.lock().await.running);

    let (last_update, news) = {
        let state = state.lock().await;
        (state.market.last_update, state.market.news().count())
    };
    assert!(last_update.is_some());
    assert!(news > 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(state.lock().await.market.last_update, last_update);

    let mut saw_ticker = false;
    while let Ok(event) = ui_rx.try_recv() {
        saw_ticker |= matches!(event, UiEvent::TickerUpdate(_));
    }
    assert!(saw_ticker);
}

#[tokio::test]
async fn quit_stops_controller_loop() {
    let dir = tempfile::tempdir().unwrap();
    let (bot, _ui_rx) = bot(&dir);
    let state = bot.state();
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let controller = tokio::spawn(bot.run(cmd_rx));

    cmd_tx.send(Command::Start).await.unwrap();
    cmd_tx.send(Command::Quit).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), controller)
        .await
        .expect("controller did not stop")
        .unwrap();
    assert!(!state.lock().await.running);
}

#[tokio::test]
async fn exports_after_dashboard_quit() {
    let dir = tempfile::tempdir().unwrap();
    let (bot, _ui_rx) = bot(&dir);
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let controller = tokio::spawn(bot.run(cmd_rx));

    // Dashboard sends Quit on `q`, then shutdown sends Quit again.
    cmd_tx.send(Command::ManualBuy).await.unwrap();
    cmd_tx.send(Command::Quit).await.unwrap();
    let _ = cmd_tx.send(Command::Quit).await;
    drop(cmd_tx);

    let bot = tokio::time::timeout(Duration::from_secs(2), controller)
        .await
        .expect("controller did not stop")
        .unwrap();
    assert!(!bot.is_running());

    let log = bot.export_log().await.unwrap();
    let snapshot = bot.export_snapshot().await.unwrap();
    assert_eq!(log, dir.path().join("bot_log.csv"));
    let csv = std::fs::read_to_string(log).unwrap();
    assert!(csv.contains("via MANUAL"));
    let json = std::fs::read_to_string(snapshot).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["positions"].as_array().unwrap().len(), 1);
}
