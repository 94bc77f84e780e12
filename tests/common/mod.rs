#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use bank_ledger::db::MemoryStore;
use bank_ledger::ledger::{Account, AccountType, Clock, LedgerService, Limits};
use bank_ledger::notify::{Notification, Notifier};

/// Keeps every notification so tests can assert on them.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(|n| n.subject).collect()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        ManualClock { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct Fixture {
    pub store: MemoryStore,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<LedgerService>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(at(2025, 1, 1)));
        let ledger = LedgerService::new(Arc::new(store.clone()), notifier.clone(), Limits::default())
            .with_clock(clock.clone());
        Fixture {
            store,
            notifier,
            clock,
            ledger: Arc::new(ledger),
        }
    }

    /// Sets the clock and hands back the service.
    pub fn on(&self, now: DateTime<Utc>) -> &LedgerService {
        self.clock.set(now);
        &self.ledger
    }

    /// Opens an account and funds it with `balance`.
    pub async fn customer(&self, balance: i64) -> (Uuid, Account) {
        let owner = Uuid::new_v4();
        let ledger = self.on(at(2025, 1, 1));
        ledger.open_account(owner, AccountType::Savings).await.unwrap();
        if balance > 0 {
            ledger.deposit(owner, dec(balance)).await.unwrap();
        }
        let account = ledger.account(owner).await.unwrap();
        (owner, account)
    }

    pub async fn balance(&self, owner: Uuid) -> Decimal {
        self.ledger.account(owner).await.unwrap().balance
    }
}

pub fn dec(n: i64) -> Decimal {
    Decimal::from(n)
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}
