//! Bourse - demo binary
//!
//! Runs a seeded simulation with every strategy trading one instrument and
//! prints a summary. Configuration comes from `MARKET__*` environment
//! variables (see [`bourse::config`]); log verbosity from `RUST_LOG`.

use std::error::Error;

use bourse::audit;
use bourse::config::{DriverConfig, EngineConfig};
use bourse::{Participant, ParticipantKind, Simulation};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let engine = EngineConfig::from_env().unwrap_or_else(|err| {
        info!(%err, "using default engine configuration");
        EngineConfig::default()
    });
    let driver = DriverConfig::from_env().unwrap_or_else(|err| {
        info!(%err, "using default driver configuration");
        DriverConfig::default()
    });

    info!(
        symbol = %driver.symbol,
        ticks = driver.ticks,
        seed = driver.seed,
        parallel = driver.parallel_decisions,
        "starting simulation"
    );

    let mut sim = Simulation::seeded(engine, driver)?;
    let traders = sim.traders();
    let funds_before = audit::total_funds(&traders, sim.book());
    let shares_before = audit::total_shares(&traders, sim.book());

    let summary = sim.run();

    println!("===========================================");
    println!("  Bourse - {} after {} ticks", sim.book().symbol(), summary.ticks);
    println!("===========================================");
    println!("Trades:      {}", summary.stats.trades);
    println!("Volume:      {}", summary.stats.volume);
    match summary.stats.vwap() {
        Some(vwap) => println!("VWAP:        {}", vwap.round_dp(4)),
        None => println!("VWAP:        -"),
    }
    println!("Last price:  {}", summary.last_price);
    println!("Best bid:    {}", fmt_price(summary.best_bid));
    println!("Best ask:    {}", fmt_price(summary.best_ask));
    println!();

    println!("{:<14} {:>8} {:>14} {:>10} {:>8}", "participant", "kind", "funds", "shares", "fills");
    for trader in &traders {
        println!(
            "{:<14} {:>8} {:>14} {:>10} {:>8}",
            trader.id().to_string(),
            short_kind(trader.kind()),
            trader.funds().round_dp(2),
            trader.shares(),
            trader.fill_count()
        );
    }
    println!();

    let funds_after = audit::total_funds(&traders, sim.book());
    let shares_after = audit::total_shares(&traders, sim.book());
    println!("Funds conserved:  {}", funds_before.is_some() && funds_before == funds_after);
    println!("Shares conserved: {}", shares_before == shares_after);
    println!("State root:       {}", summary.state_root_hex());

    Ok(())
}

fn fmt_price(price: Option<Decimal>) -> String {
    price.map_or_else(|| "-".to_string(), |p| p.to_string())
}

fn short_kind(kind: ParticipantKind) -> &'static str {
    match kind {
        ParticipantKind::MarketMaker => "mm",
        ParticipantKind::Momentum => "mom",
        ParticipantKind::Value => "value",
        ParticipantKind::Noise => "noise",
        ParticipantKind::Human => "human",
    }
}
