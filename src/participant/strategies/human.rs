//! Human participant driven by queued commands.
//!
//! A [`HumanDesk`] is the handle an interactive front end keeps: it queues
//! [`Command`]s from any thread and reads back [`CommandResult`]s. The
//! matching [`Human`] agent drains the queue on each tick, so manual orders
//! enter the book at the same point in the tick as every other strategy's.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::SubmitError;
use crate::orderbook::{OrderBook, Placement};
use crate::participant::strategies::as_participant;
use crate::participant::{Agent, Participant, Trader};
use crate::types::{Order, OrderFlags, OrderId, Side};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Limit { side: Side, price: Decimal, volume: u64 },
    Market { side: Side, volume: u64 },
    FillOrKill { side: Side, price: Decimal, volume: u64 },
    Cancel(OrderId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Placed(Placement),
    Cancelled { order_id: OrderId, found: bool },
    Rejected(SubmitError),
}

#[derive(Default)]
struct Queues {
    commands: VecDeque<Command>,
    results: Vec<CommandResult>,
}

/// Cloneable command queue shared with a [`Human`].
#[derive(Clone, Default)]
pub struct HumanDesk {
    queues: Arc<Mutex<Queues>>,
}

impl HumanDesk {
    pub fn submit(&self, command: Command) {
        self.queues.lock().commands.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.queues.lock().commands.len()
    }

    /// Take every result produced since the last call.
    pub fn take_results(&self) -> Vec<CommandResult> {
        std::mem::take(&mut self.queues.lock().results)
    }
}

pub struct Human {
    trader: Arc<Trader>,
    desk: HumanDesk,
}

impl Human {
    pub fn new(trader: Arc<Trader>) -> Self {
        Self {
            trader,
            desk: HumanDesk::default(),
        }
    }

    pub fn desk(&self) -> HumanDesk {
        self.desk.clone()
    }

    fn execute(&self, book: &OrderBook, command: Command) -> CommandResult {
        let (side, price, volume, flags) = match command {
            Command::Cancel(order_id) => {
                let found = book.cancel_order(order_id);
                return CommandResult::Cancelled { order_id, found };
            }
            Command::Limit { side, price, volume } => (side, price, volume, OrderFlags::LIMIT),
            Command::Market { side, volume } => (side, Decimal::ZERO, volume, OrderFlags::MARKET),
            Command::FillOrKill { side, price, volume } => (side, price, volume, OrderFlags::FILL_OR_KILL),
        };
        let placed = Order::new(side, price, volume, as_participant(&self.trader), flags)
            .map_err(SubmitError::from)
            .and_then(|order| book.place(order, book.last_price()));
        match placed {
            Ok(placement) => CommandResult::Placed(placement),
            Err(err) => CommandResult::Rejected(err),
        }
    }
}

impl Agent for Human {
    fn trader(&self) -> &Arc<Trader> {
        &self.trader
    }

    fn on_tick(&mut self, book: &OrderBook, tick: u64) {
        // Release the desk lock before touching the book
        let commands: Vec<Command> = self.desk.queues.lock().commands.drain(..).collect();
        if commands.is_empty() {
            return;
        }
        let results: Vec<CommandResult> = commands
            .into_iter()
            .map(|command| {
                let result = self.execute(book, command);
                info!(owner = %self.trader.id(), tick, ?result, "manual command");
                result
            })
            .collect();
        self.desk.queues.lock().results.extend(results);
    }
}
