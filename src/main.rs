// src/main.rs
use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use std::path::Path;
use std::time::Duration;
use strategy_bot::config::AppConfig;
use strategy_bot::core::bot::Bot;
use strategy_bot::tui;
use strategy_bot::types::{Command, UiEvent};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Simulated DCA / grid trading bot", long_about = None)]
struct Args {
    /// Settings file (extension optional); missing files fall back to defaults
    #[clap(short, long, default_value = "Settings")]
    config: String,
    /// Run without the dashboard, logging to stdout
    #[clap(long)]
    headless: bool,
    /// Stop a headless run after this many seconds instead of waiting for Ctrl+C
    #[clap(long)]
    duration_secs: Option<u64>,
    /// Start the timers immediately
    #[clap(long)]
    autostart: bool,
    /// Write the CSV log and JSON snapshot before exiting
    #[clap(long)]
    export_on_exit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&args.config).context("Failed to load configuration")?;
    let _guard = init_tracing(args.headless, &config.log_dir)?;

    info!(
        "Strategy bot for {} (starting balance {:.8} {})",
        config.symbol, config.starting_balance, config.base_asset
    );

    // 2. Create Channels
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 3. Initialize Components
    let bot = Bot::new(config.clone(), ui_tx);

    if args.headless {
        println!("========================================");
        println!("       STRATEGY BOT DEMO - v{}", env!("CARGO_PKG_VERSION"));
        println!("========================================");
        println!("Target: {}", config.symbol);
        println!("Mode:   📝 PAPER TRADING (simulated feed)");
        println!("========================================");
        return run_headless(bot, ui_rx, args.duration_secs, args.export_on_exit).await;
    }

    // 4. Run controller + dashboard
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let state = bot.state();
    let controller = tokio::spawn(bot.run(cmd_rx));

    if args.autostart {
        cmd_tx.send(Command::Start).await?;
    }

    let result = tui::run(state, ui_rx, cmd_tx.clone()).await;

    // The dashboard may already have sent Quit; a closed channel is fine here.
    let _ = cmd_tx.send(Command::Quit).await;
    drop(cmd_tx);
    let bot = controller.await?;

    if args.export_on_exit {
        export_all(&bot).await?;
    }

    if let Err(e) = &result {
        eprintln!("Fatal Dashboard Error: {}", e);
    }
    result
}

async fn export_all(bot: &Bot) -> anyhow::Result<()> {
    let log = bot.export_log().await?;
    let snap = bot.export_snapshot().await?;
    info!("Exported {} and {}", log.display(), snap.display());
    Ok(())
}

fn init_tracing(headless: bool, log_dir: &Path) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("strategy_bot=info"))?;

    if headless {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return Ok(None);
    }

    // The dashboard owns the terminal, so logs go to a file.
    let appender = tracing_appender::rolling::daily(log_dir, "strategy_bot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Ok(Some(guard))
}

async fn run_headless(
    mut bot: Bot,
    mut ui_rx: mpsc::Receiver<UiEvent>,
    duration_secs: Option<u64>,
    export_on_exit: bool,
) -> anyhow::Result<()> {
    let drain = tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            debug!("ui event: {:?}", event);
        }
    });

    bot.start().await;
    match duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => info!("Ctrl+C received"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("Ctrl+C received");
        }
    }
    bot.stop().await;

    let snapshot = bot.state().lock().await.snapshot();
    info!(
        "Final balance {:.8} {} | open {} | closed {} | win rate {:.1}% | realized {:+.8}",
        snapshot.balance,
        snapshot.base_asset,
        snapshot.stats.open_positions,
        snapshot.stats.closed_positions,
        snapshot.stats.win_rate,
        snapshot.stats.realized_pnl
    );

    if export_on_exit {
        export_all(&bot).await?;
    }

    drop(bot);
    drain.abort();
    Ok(())
}
