use std::path::Path;
use strategy_bot::config::AppConfig;

/// Fast, seeded configuration writing exports into `export_dir`.
pub fn test_config(export_dir: &Path) -> AppConfig {
    let mut config = AppConfig {
        starting_balance: 1.0,
        seed: Some(42),
        export_dir: export_dir.to_path_buf(),
        ..AppConfig::default()
    };
    config.price.interval_ms = 10;
    config.sentiment.interval_ms = 15;
    config.engine.interval_ms = 20;
    config
}
