use crate::rows::{Row, RowId};
use crate::tick::{TickScheduler, TickSubscription};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// 24-hour wall-clock time in `timezone`, e.g. "07:00:05"
pub fn format_time(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant.with_timezone(&timezone).format("%H:%M:%S").to_string()
}

/// Live local time for one timezone, refreshed on every scheduler tick.
///
/// Holds a tick subscription only while a recognised timezone is set.
pub struct RowClock {
    scheduler: TickScheduler,
    now: NowFn,
    timezone: Option<String>,
    time: Arc<Mutex<String>>,
    subscription: Option<TickSubscription>,
}

impl RowClock {
    pub fn new(scheduler: TickScheduler) -> Self {
        Self::with_now(scheduler, Arc::new(Utc::now))
    }

    pub fn with_now(scheduler: TickScheduler, now: NowFn) -> Self {
        Self {
            scheduler,
            now,
            timezone: None,
            time: Arc::new(Mutex::new(String::new())),
            subscription: None,
        }
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    /// Current display value, empty when no usable timezone is set
    pub fn time(&self) -> String {
        self.time.lock().unwrap().clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .map_or(false, TickSubscription::is_active)
    }

    pub fn set_timezone(&mut self, timezone: Option<&str>) {
        if self.timezone.as_deref() == timezone {
            return;
        }
        self.timezone = timezone.map(str::to_owned);
        self.restart();
    }

    fn restart(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        *self.time.lock().unwrap() = String::new();

        let timezone: Tz = match self.timezone.as_deref().map(str::parse::<Tz>) {
            None => return,
            Some(Ok(timezone)) => timezone,
            Some(Err(error)) => {
                log::debug!("Clock left blank: {error}");
                return;
            }
        };

        let time = Arc::clone(&self.time);
        let now = Arc::clone(&self.now);
        let refresh = move || {
            let formatted = format_time(now(), timezone);
            *time.lock().unwrap() = formatted;
        };
        // Only the first subscriber of a scheduler gets an immediate tick
        refresh();
        self.subscription = Some(self.scheduler.subscribe(refresh));
    }
}

impl Drop for RowClock {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

/// Keeps one [RowClock] per successfully looked-up row
pub struct RowClocks {
    scheduler: TickScheduler,
    now: NowFn,
    clocks: HashMap<RowId, RowClock>,
}

impl RowClocks {
    pub fn new(scheduler: TickScheduler) -> Self {
        Self::with_now(scheduler, Arc::new(Utc::now))
    }

    pub fn with_now(scheduler: TickScheduler, now: NowFn) -> Self {
        Self {
            scheduler,
            now,
            clocks: HashMap::new(),
        }
    }

    /// Creates, retargets and disposes clocks so that they follow `rows`
    pub fn sync(&mut self, rows: &[Row]) {
        self.clocks
            .retain(|id, _| rows.iter().any(|row| row.id() == *id));
        for row in rows {
            let timezone = row.result().map(|result| result.timezone.as_str());
            if let Some(clock) = self.clocks.get_mut(&row.id()) {
                clock.set_timezone(timezone);
            } else if let Some(timezone) = timezone {
                let mut clock = RowClock::with_now(self.scheduler.clone(), Arc::clone(&self.now));
                clock.set_timezone(Some(timezone));
                self.clocks.insert(row.id(), clock);
            }
        }
    }

    pub fn time(&self, id: RowId) -> String {
        self.clocks
            .get(&id)
            .map(RowClock::time)
            .unwrap_or_default()
    }
}
