use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
    time::Duration,
};

use tokio::{
    task::AbortHandle,
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tracing::debug;

use crate::domain::ChatId;

/// Periods used when a destination ticker is created.
#[derive(Clone, Copy, Debug)]
pub struct TickerPeriods {
    /// Spacing for direct chats (1 msg/sec).
    pub direct: Duration,
    /// Spacing for groups and channels (20 msg/min).
    pub group: Duration,
    /// Lifetime of a ticker, counted from creation.
    pub ttl: Duration,
}

impl Default for TickerPeriods {
    fn default() -> Self {
        Self {
            direct: Duration::from_secs(1),
            group: Duration::from_secs(60) / 20,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Periodic gate for one destination.
///
/// The first tick fires one period after creation. Late ticks are delayed, not
/// bursted, so two ticks are never closer than `period`.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    created_at: Instant,
    interval: tokio::sync::Mutex<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let created_at = Instant::now();
        let mut interval = interval_at(created_at + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            period,
            created_at,
            interval: tokio::sync::Mutex::new(interval),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wait for the next firing.
    pub async fn tick(&self) -> Instant {
        self.interval.lock().await.tick().await
    }
}

struct Entry {
    ticker: Arc<Ticker>,
    expiry: Option<AbortHandle>,
}

/// Destination id → ticker map.
///
/// Tickers are created lazily and dropped `ttl` after creation regardless of
/// how busy the destination is; the next task for it gets a fresh ticker.
pub struct TickerStore {
    periods: TickerPeriods,
    tickers: Mutex<HashMap<String, Entry>>,
}

impl TickerStore {
    pub fn new(periods: TickerPeriods) -> Arc<Self> {
        Arc::new(Self {
            periods,
            tickers: Mutex::new(HashMap::new()),
        })
    }

    pub fn period_for(&self, id: &ChatId) -> Duration {
        if id.is_group_like() {
            self.periods.group
        } else {
            self.periods.direct
        }
    }

    /// Ticker for `id`, creating it (and scheduling its expiry) on a miss.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_create(self: &Arc<Self>, id: &ChatId) -> Arc<Ticker> {
        let key = id.to_string();
        let mut map = self.lock();

        if let Some(entry) = map.get(&key) {
            return entry.ticker.clone();
        }

        let period = self.period_for(id);
        let ticker = Arc::new(Ticker::new(period));
        let expiry = self.schedule_expiry(key.clone(), &ticker);
        debug!(chat_id = %key, ?period, "created destination ticker");

        map.insert(
            key,
            Entry {
                ticker: ticker.clone(),
                expiry: Some(expiry),
            },
        );
        ticker
    }

    /// Drop the ticker for `id`. No-op when absent.
    ///
    /// The timer itself is released once the last in-flight waiter lets go of it.
    pub fn remove(&self, id: &ChatId) {
        let removed = self.lock().remove(&id.to_string());
        if let Some(entry) = removed {
            if let Some(expiry) = entry.expiry {
                expiry.abort();
            }
        }
    }

    pub fn contains(&self, id: &ChatId) -> bool {
        self.lock().contains_key(&id.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn schedule_expiry(self: &Arc<Self>, key: String, ticker: &Arc<Ticker>) -> AbortHandle {
        let store: Weak<Self> = Arc::downgrade(self);
        let ticker = Arc::downgrade(ticker);
        let ttl = self.periods.ttl;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(store) = store.upgrade() {
                store.expire(&key, &ticker);
            }
        });
        handle.abort_handle()
    }

    /// Remove `key` only if it still maps to the ticker the expiry was armed for.
    fn expire(&self, key: &str, ticker: &Weak<Ticker>) {
        let mut map = self.lock();
        let current = map
            .get(key)
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(&entry.ticker), ticker.as_ptr()));
        if current {
            map.remove(key);
            debug!(chat_id = %key, "expired destination ticker");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.tickers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TickerStore {
    fn drop(&mut self) {
        let map = self.tickers.get_mut().unwrap_or_else(|e| e.into_inner());
        for entry in map.values_mut() {
            if let Some(expiry) = entry.expiry.take() {
                expiry.abort();
            }
        }
    }
}
