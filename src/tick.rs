use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

lazy_static! {
    static ref SHARED_SCHEDULER: TickScheduler = TickScheduler::new(DEFAULT_TICK_INTERVAL);
}

type TickCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_key: u64,
    callbacks: BTreeMap<u64, TickCallback>,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    interval: Duration,
    subscribers: Mutex<Subscribers>,
}

impl Inner {
    fn broadcast(&self) {
        let keys: Vec<u64> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers.callbacks.keys().copied().collect()
        };
        for key in keys {
            // A callback may unsubscribe others, so membership is checked right before each call
            let callback = self.subscribers.lock().unwrap().callbacks.get(&key).cloned();
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    fn unsubscribe(&self, key: u64) {
        let timer = {
            let mut subscribers = self.subscribers.lock().unwrap();
            if subscribers.callbacks.remove(&key).is_none() {
                return;
            }
            if subscribers.callbacks.is_empty() {
                subscribers.timer.take()
            } else {
                None
            }
        };
        if let Some(timer) = timer {
            timer.abort();
            log::debug!("Tick timer stopped, no subscribers left");
        }
    }
}

/// Broadcasts a tick to every subscriber once per interval.
///
/// One timer task serves all subscribers of a scheduler. It is spawned on the current tokio
/// runtime when the first subscriber arrives and aborted when the last one leaves. Without a
/// runtime no timer is started and ticks are only delivered through [TickScheduler::tick].
///
/// Clones share subscribers and timer.
#[derive(Clone)]
pub struct TickScheduler {
    inner: Arc<Inner>,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                interval,
                subscribers: Mutex::new(Subscribers::default()),
            }),
        }
    }

    /// Process-wide scheduler ticking every second
    pub fn shared() -> Self {
        SHARED_SCHEDULER.clone()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().unwrap().callbacks.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.subscribers.lock().unwrap().timer.is_some()
    }

    /// Registers `callback` for every future tick.
    ///
    /// The subscriber that brings the count from zero to one is called once before this returns,
    /// later subscribers wait for the next tick.
    pub fn subscribe<F>(&self, callback: F) -> TickSubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: TickCallback = Arc::new(callback);
        let (key, is_first) = {
            let mut subscribers = self.inner.subscribers.lock().unwrap();
            let key = subscribers.next_key;
            subscribers.next_key += 1;
            subscribers.callbacks.insert(key, Arc::clone(&callback));
            (key, subscribers.callbacks.len() == 1)
        };
        if is_first {
            callback();
            self.start_timer();
        }
        TickSubscription {
            inner: Arc::downgrade(&self.inner),
            key: Some(key),
        }
    }

    /// Delivers one tick to all current subscribers immediately
    pub fn tick(&self) {
        self.inner.broadcast();
    }

    fn start_timer(&self) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        if subscribers.timer.is_some() || subscribers.callbacks.is_empty() {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("No tokio runtime available, ticks must be delivered manually");
                return;
            }
        };
        let inner = Arc::downgrade(&self.inner);
        let interval = self.inner.interval;
        subscribers.timer = Some(runtime.spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match inner.upgrade() {
                    Some(inner) => inner.broadcast(),
                    None => break,
                }
            }
        }));
        log::debug!("Tick timer started with {interval:?} interval");
    }
}

/// Registration of one tick callback, released on [TickSubscription::unsubscribe] or drop
pub struct TickSubscription {
    inner: Weak<Inner>,
    key: Option<u64>,
}

impl TickSubscription {
    pub fn is_active(&self) -> bool {
        self.key.is_some() && self.inner.strong_count() > 0
    }

    /// No callback invocation happens after this returns. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        let key = match self.key.take() {
            Some(key) => key,
            None => return,
        };
        if let Some(inner) = self.inner.upgrade() {
            inner.unsubscribe(key);
        }
    }
}

impl Drop for TickSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
