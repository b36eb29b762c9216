//! Tick scheduler.
//!
//! A [`Simulation`] owns the agents and a shared handle to the book. Each
//! tick runs every agent's decision logic, then exactly one match pass. With
//! `parallel_decisions` the decisions run on scoped threads and contend only
//! on the book lock; otherwise they run in registration order, which makes a
//! seeded run reproducible.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::account::Account;
use crate::config::{DriverConfig, EngineConfig};
use crate::error::InvalidConfig;
use crate::orderbook::{BookEvent, OrderBook, SubscriptionId};
use crate::participant::strategies::{
    Human, HumanDesk, MarketMaker, MarketMakerConfig, Momentum, MomentumConfig, NoiseTrader, NoiseTraderConfig,
    ValueConfig, ValueInvestor,
};
use crate::participant::{Agent, ParticipantKind, Trader};
use crate::types::price::notional;
use crate::types::{MatchReceipt, Stock};

/// Trade statistics accumulated from trade notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub trades: u64,
    pub volume: u64,
    /// Σ price × volume
    pub notional: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
}

impl StatsSnapshot {
    /// Volume-weighted average price, `None` before the first trade.
    pub fn vwap(&self) -> Option<Decimal> {
        if self.volume == 0 {
            return None;
        }
        Some(self.notional / Decimal::from(self.volume))
    }
}

/// Observer that subscribes to a book's trade notifications.
#[derive(Debug, Clone, Default)]
pub struct MarketStats {
    inner: Arc<Mutex<StatsSnapshot>>,
}

impl MarketStats {
    pub fn attach(book: &OrderBook) -> (Self, SubscriptionId) {
        let stats = Self::default();
        let observer = stats.clone();
        let subscription = book.subscribe(move |event| {
            if let BookEvent::TradeExecuted { price, volume, .. } = event {
                observer.record(*price, *volume);
            }
        });
        (stats, subscription)
    }

    pub fn record(&self, price: Decimal, volume: u64) {
        let mut stats = self.inner.lock();
        stats.trades += 1;
        stats.volume += volume;
        if let Some(value) = notional(price, volume) {
            stats.notional += value;
        }
        stats.high = Some(stats.high.map_or(price, |high| high.max(price)));
        stats.low = Some(stats.low.map_or(price, |low| low.min(price)));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().clone()
    }
}

/// Result of [`Simulation::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub stats: StatsSnapshot,
    pub last_price: Decimal,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub state_root: [u8; 32],
}

impl RunSummary {
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root)
    }
}

// Starting balances per strategy: (count, funds, shares)
const MARKET_MAKERS: (usize, i64, u64) = (2, 200_000, 4_000);
const MOMENTUM_TRADERS: (usize, i64, u64) = (2, 20_000, 400);
const VALUE_INVESTORS: (usize, i64, u64) = (2, 20_000, 400);
const NOISE_TRADERS: (usize, i64, u64) = (8, 10_000, 200);
const HUMAN: (i64, u64) = (10_000, 100);

pub struct Simulation {
    book: Arc<OrderBook>,
    agents: Vec<Box<dyn Agent>>,
    config: DriverConfig,
    stats: MarketStats,
    subscription: SubscriptionId,
    desk: Option<HumanDesk>,
    tick: u64,
}

impl Simulation {
    /// An empty simulation over `book`. Add agents with [`Simulation::add_agent`].
    ///
    /// The statistics listener is removed from the book when the simulation
    /// is dropped.
    pub fn new(book: Arc<OrderBook>, config: DriverConfig) -> Self {
        let (stats, subscription) = MarketStats::attach(&book);
        Self {
            book,
            agents: Vec::new(),
            config,
            stats,
            subscription,
            desk: None,
            tick: 0,
        }
    }

    /// A book plus the full strategy population, every RNG derived from
    /// `driver.seed`.
    pub fn seeded(engine: EngineConfig, driver: DriverConfig) -> Result<Self, InvalidConfig> {
        engine.validate()?;
        driver.validate()?;
        let stock = Stock::new(driver.symbol.clone(), driver.opening_price).ok_or_else(|| InvalidConfig {
            field: "opening_price",
            reason: format!("{} must be positive", driver.opening_price),
        })?;
        let opening = driver.opening_price;
        let seed = driver.seed;
        let mut sim = Self::new(Arc::new(OrderBook::new(stock, engine)), driver);

        let (count, funds, shares) = MARKET_MAKERS;
        for _ in 0..count {
            let trader = new_trader(ParticipantKind::MarketMaker, funds, shares)?;
            sim.add_agent(Box::new(MarketMaker::new(trader, MarketMakerConfig::default())));
        }
        let (count, funds, shares) = MOMENTUM_TRADERS;
        for _ in 0..count {
            let trader = new_trader(ParticipantKind::Momentum, funds, shares)?;
            sim.add_agent(Box::new(Momentum::new(trader, MomentumConfig::default())));
        }
        let (count, funds, shares) = VALUE_INVESTORS;
        for _ in 0..count {
            let trader = new_trader(ParticipantKind::Value, funds, shares)?;
            let config = ValueConfig {
                fair_value: opening,
                ..ValueConfig::default()
            };
            sim.add_agent(Box::new(ValueInvestor::new(trader, config)));
        }
        let (count, funds, shares) = NOISE_TRADERS;
        for i in 0..count {
            let trader = new_trader(ParticipantKind::Noise, funds, shares)?;
            let agent_seed = seed.wrapping_add(i as u64);
            sim.add_agent(Box::new(NoiseTrader::with_seed(trader, NoiseTraderConfig::default(), agent_seed)));
        }
        let (funds, shares) = HUMAN;
        let human = Human::new(new_trader(ParticipantKind::Human, funds, shares)?);
        sim.desk = Some(human.desk());
        sim.add_agent(Box::new(human));

        info!(
            symbol = %sim.book.symbol(),
            agents = sim.agents.len(),
            seed,
            "simulation ready"
        );
        Ok(sim)
    }

    pub fn add_agent(&mut self, agent: Box<dyn Agent>) {
        self.agents.push(agent);
    }

    pub fn book(&self) -> &Arc<OrderBook> {
        &self.book
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Command queue of the human participant, if the population has one.
    pub fn human_desk(&self) -> Option<HumanDesk> {
        self.desk.clone()
    }

    /// Ticks completed so far.
    pub fn ticks_run(&self) -> u64 {
        self.tick
    }

    /// Every agent's trader, in registration order.
    pub fn traders(&self) -> Vec<Arc<Trader>> {
        self.agents.iter().map(|agent| agent.trader().clone()).collect()
    }

    /// Run every agent's decision, then one match pass.
    pub fn run_tick(&mut self) -> MatchReceipt {
        let tick = self.tick;
        let book: &OrderBook = &self.book;

        if self.config.parallel_decisions {
            thread::scope(|scope| {
                for agent in self.agents.iter_mut() {
                    scope.spawn(move || agent.on_tick(book, tick));
                }
            });
        } else {
            for agent in self.agents.iter_mut() {
                agent.on_tick(book, tick);
            }
        }

        let receipt = book.process_orders();
        debug!(
            tick,
            trades = receipt.trades_executed,
            volume = receipt.volume_executed,
            state_root = %receipt.state_root_hex(),
            "tick complete"
        );
        self.tick += 1;
        receipt
    }

    /// Run `config.ticks` ticks.
    pub fn run(&mut self) -> RunSummary {
        for _ in 0..self.config.ticks {
            self.run_tick();
        }
        let summary = self.book.summary();
        let result = RunSummary {
            ticks: self.tick,
            stats: self.stats.snapshot(),
            last_price: summary.last_price,
            best_bid: summary.best_bid,
            best_ask: summary.best_ask,
            state_root: self.book.state_root(),
        };
        info!(
            ticks = result.ticks,
            trades = result.stats.trades,
            volume = result.stats.volume,
            last_price = %result.last_price,
            "simulation finished"
        );
        result
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.book.unsubscribe(self.subscription);
    }
}

fn new_trader(kind: ParticipantKind, funds: i64, shares: u64) -> Result<Arc<Trader>, InvalidConfig> {
    let account = Account::new(Decimal::from(funds), shares).map_err(|err| InvalidConfig {
        field: "population",
        reason: err.to_string(),
    })?;
    Ok(Arc::new(Trader::new(kind, account)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit;
    use crate::participant::strategies::Command;
    use crate::participant::Participant;
    use crate::types::{Order, Side};

    fn sequential(ticks: u64, seed: u64) -> DriverConfig {
        DriverConfig {
            ticks,
            seed,
            parallel_decisions: false,
            ..DriverConfig::default()
        }
    }

    #[test]
    fn test_stats_vwap() {
        let stats = MarketStats::default();
        assert_eq!(stats.snapshot().vwap(), None);

        stats.record(Decimal::from(10), 10);
        stats.record(Decimal::from(13), 20);

        let snap = stats.snapshot();
        assert_eq!(snap.trades, 2);
        assert_eq!(snap.volume, 30);
        assert_eq!(snap.vwap(), Some(Decimal::from(12)));
        assert_eq!(snap.high, Some(Decimal::from(13)));
        assert_eq!(snap.low, Some(Decimal::from(10)));
    }

    #[test]
    fn test_stats_follow_book_trades() {
        let book = OrderBook::new(Stock::new("TEST", Decimal::from(10)).unwrap(), EngineConfig::default());
        let (stats, _) = MarketStats::attach(&book);
        let buyer = new_trader(ParticipantKind::Human, 1_000, 0).unwrap();
        let seller = new_trader(ParticipantKind::Human, 0, 100).unwrap();

        book.submit_buy_order(Order::limit(Side::Buy, Decimal::from(10), 30, buyer).unwrap(), Decimal::from(10))
            .unwrap();
        book.submit_sell_order(Order::limit(Side::Sell, Decimal::from(10), 30, seller).unwrap(), Decimal::from(10))
            .unwrap();
        book.process_orders();

        let snap = stats.snapshot();
        assert_eq!(snap.trades, 1);
        assert_eq!(snap.volume, 30);
        assert_eq!(snap.vwap(), Some(Decimal::from(10)));
    }

    #[test]
    fn test_dropping_simulation_detaches_stats() {
        let book = Arc::new(OrderBook::new(
            Stock::new("TEST", Decimal::from(10)).unwrap(),
            EngineConfig::default(),
        ));

        let first = Simulation::new(book.clone(), sequential(1, 1));
        let second = Simulation::new(book.clone(), sequential(1, 2));
        assert_eq!(book.listener_count(), 2);

        drop(first);
        assert_eq!(book.listener_count(), 1);
        drop(second);
        assert_eq!(book.listener_count(), 0);
    }

    #[test]
    fn test_seeded_population() {
        let sim = Simulation::seeded(EngineConfig::default(), sequential(1, 1)).unwrap();
        let traders = sim.traders();

        assert_eq!(traders.len(), 15);
        assert_eq!(
            traders.iter().filter(|t| t.kind() == ParticipantKind::Noise).count(),
            NOISE_TRADERS.0
        );
        assert!(sim.human_desk().is_some());
    }

    #[test]
    fn test_run_conserves_balances() {
        let mut sim = Simulation::seeded(EngineConfig::default(), sequential(50, 9)).unwrap();
        let traders = sim.traders();
        let funds = audit::total_funds(&traders, sim.book());
        let shares = audit::total_shares(&traders, sim.book());

        let summary = sim.run();

        assert_eq!(summary.ticks, 50);
        assert_eq!(sim.ticks_run(), 50);
        assert_eq!(audit::total_funds(&traders, sim.book()), funds);
        assert_eq!(audit::total_shares(&traders, sim.book()), shares);
    }

    #[test]
    fn test_parallel_ticks_conserve_balances() {
        let config = DriverConfig {
            parallel_decisions: true,
            ..sequential(30, 5)
        };
        let mut sim = Simulation::seeded(EngineConfig::default(), config).unwrap();
        let traders = sim.traders();
        let funds = audit::total_funds(&traders, sim.book());
        let shares = audit::total_shares(&traders, sim.book());

        sim.run();

        assert_eq!(audit::total_funds(&traders, sim.book()), funds);
        assert_eq!(audit::total_shares(&traders, sim.book()), shares);
    }

    #[test]
    fn test_human_commands_run_on_tick() {
        let mut sim = Simulation::seeded(EngineConfig::default(), sequential(1, 3)).unwrap();
        let desk = sim.human_desk().unwrap();

        desk.submit(Command::Limit {
            side: Side::Buy,
            price: Decimal::from(40),
            volume: 1,
        });
        sim.run_tick();

        assert_eq!(desk.pending(), 0);
        assert_eq!(desk.take_results().len(), 1);
    }

    #[test]
    fn test_seeded_rejects_bad_config() {
        let config = DriverConfig {
            opening_price: Decimal::ZERO,
            ..DriverConfig::default()
        };
        assert!(Simulation::seeded(EngineConfig::default(), config).is_err());
    }
}
