//! Tarkov Sync - market data collector
//!
//! Syncs items, flea prices, slot sizes and key uses into SQLite. Runs
//! continuously on a fixed interval, or once with `--once`.

use clap::Parser;
use std::sync::Arc;
use tarkov_sync::{Config, CycleReport, Database, ItemValuer, MarketClient, Reconciler, Scheduler};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    log::info!("Starting tarkov_sync...");
    log::info!("Database path: {}", config.database.display());

    // Ensure parent directory exists
    if let Some(parent) = config.database.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    let db = match Database::open(&config.database) {
        Ok(db) => db,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let client = match MarketClient::new(&config.market_settings()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("Failed to create market client: {}", e);
            std::process::exit(1);
        }
    };

    let reconciler = Arc::new(Reconciler::new(&db));
    match reconciler.item_count() {
        Ok(count) => log::info!("{} items in database", count),
        Err(e) => log::warn!("Failed to count items: {}", e),
    }

    if config.once {
        if !run_sync(&reconciler, &client, &config).await {
            std::process::exit(1);
        }
        return;
    }

    log::info!(
        "Running in daemon mode, syncing every {} minute(s)",
        config.interval_minutes
    );
    let scheduler = Scheduler::new(config.initial_delay(), config.interval());
    let stats = scheduler
        .run(
            move || {
                let reconciler = Arc::clone(&reconciler);
                let client = Arc::clone(&client);
                let config = config.clone();
                async move {
                    run_sync(&reconciler, &client, &config).await;
                }
            },
            shutdown_signal(),
        )
        .await;

    log::info!(
        "Stopped after {} cycle(s), {} skipped trigger(s)",
        stats.started,
        stats.skipped
    );
}

/// Run a single sync cycle, logging its outcome. Returns whether it succeeded.
async fn run_sync(reconciler: &Reconciler, client: &MarketClient, config: &Config) -> bool {
    match reconciler.run_cycle(client).await {
        Ok(report) => {
            log_report(&report);
            log_currency_rates(reconciler, config);
            true
        }
        Err(e) => {
            log::error!("Sync cycle failed: {}", e);
            false
        }
    }
}

fn log_report(report: &CycleReport) {
    for (mode, stats) in [("PVP", &report.pvp), ("PVE", &report.pve)] {
        log::info!(
            "{}: {} new items, {} updated, {} new prices",
            mode,
            stats.inserted,
            stats.updated,
            stats.prices_inserted
        );
    }
    log::info!(
        "Slots updated: {}, keys inserted: {}, keys updated: {}",
        report.slots.updated,
        report.keys.inserted,
        report.keys.updated
    );
}

/// Valuation needs the currency basis items; report whether they are present
fn log_currency_rates(reconciler: &Reconciler, config: &Config) {
    match ItemValuer::load(reconciler.items(), config.valuation_policy) {
        Ok(valuer) => log::info!("Valuation ready ({:?})", valuer.policy()),
        Err(e) => log::warn!("Valuation unavailable: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
}
