use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::account::Account;
use crate::participant::{Fill, Participant, ParticipantId, ParticipantKind};
use crate::types::Side;

/// A participant with a type tag, an account and a fill ledger.
#[derive(Debug)]
pub struct Trader {
    id: ParticipantId,
    kind: ParticipantKind,
    account: Mutex<Account>,
    fills: Mutex<Vec<Fill>>,
}

impl Trader {
    pub fn new(kind: ParticipantKind, account: Account) -> Self {
        Self {
            id: ParticipantId::next(),
            kind,
            account: Mutex::new(account),
            fills: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the account.
    pub fn balance(&self) -> Account {
        self.account.lock().clone()
    }

    pub fn funds(&self) -> Decimal {
        self.account.lock().available_funds()
    }

    pub fn shares(&self) -> u64 {
        self.account.lock().shares_held()
    }

    /// All fills received so far, oldest first.
    pub fn fills(&self) -> Vec<Fill> {
        self.fills.lock().clone()
    }

    pub fn fill_count(&self) -> usize {
        self.fills.lock().len()
    }

    /// Shares bought minus shares sold.
    pub fn net_position(&self) -> i64 {
        self.fills.lock().iter().fold(0i64, |acc, fill| {
            let volume = i64::try_from(fill.volume).unwrap_or(i64::MAX);
            match fill.side {
                Side::Buy => acc.saturating_add(volume),
                Side::Sell => acc.saturating_sub(volume),
            }
        })
    }

    /// Total volume filled on either side.
    pub fn traded_volume(&self) -> u64 {
        self.fills.lock().iter().map(|f| f.volume).sum()
    }
}

impl Participant for Trader {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn kind(&self) -> ParticipantKind {
        self.kind
    }

    fn account(&self) -> &Mutex<Account> {
        &self.account
    }

    fn on_filled(&self, fill: &Fill) {
        self.fills.lock().push(fill.clone());
    }
}
