use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall clock resolved in the configured timezone.
#[derive(Clone)]
pub struct Clock {
    timezone: Tz,
    now_provider: NowProvider,
}

impl Clock {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn local_now(&self) -> DateTime<Tz> {
        self.now().with_timezone(&self.timezone)
    }

    pub fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }
}

/// Millisecond-timestamp identifiers. Ids generated within the same
/// millisecond (or after the clock steps back) continue from the last one.
pub struct IdGenerator {
    clock: Clock,
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            last: AtomicI64::new(0),
        }
    }

    pub fn next_id(&self) -> String {
        let now = self.clock.now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => previous = actual,
            }
        }
    }

    /// Makes sure new ids sort after ids already present in storage.
    pub fn observe(&self, existing_id: &str) {
        if let Ok(value) = existing_id.parse::<i64>() {
            self.last.fetch_max(value, Ordering::Relaxed);
        }
    }
}
