use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Signal raised when a focus session completes. Implementations loop until
/// [`AlarmPlayer::stop`] is called.
#[async_trait]
pub trait AlarmPlayer: Send + Sync {
    async fn start(&self) -> Result<(), InfraError>;
    async fn stop(&self) -> Result<(), InfraError>;
    fn is_ringing(&self) -> bool;
}

/// Rings the terminal bell on stderr at a fixed interval.
#[derive(Debug)]
pub struct BellAlarm {
    period: Duration,
    ringer: Mutex<Option<JoinHandle<()>>>,
}

impl BellAlarm {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ringer: Mutex::new(None),
        }
    }

    fn lock_ringer(&self) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<()>>>, InfraError> {
        self.ringer
            .lock()
            .map_err(|error| InfraError::Alarm(format!("alarm lock poisoned: {error}")))
    }
}

impl Default for BellAlarm {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl AlarmPlayer for BellAlarm {
    async fn start(&self) -> Result<(), InfraError> {
        // Write once up front so an unusable stderr surfaces as a start failure.
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|error| InfraError::Alarm(error.to_string()))?;

        let period = self.period;
        let mut ringer = self.lock_ringer()?;
        if let Some(previous) = ringer.take() {
            previous.abort();
        }
        *ringer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let mut stderr = std::io::stderr();
                if stderr.write_all(b"\x07").and_then(|_| stderr.flush()).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn stop(&self) -> Result<(), InfraError> {
        if let Some(handle) = self.lock_ringer()?.take() {
            handle.abort();
        }
        Ok(())
    }

    fn is_ringing(&self) -> bool {
        self.ringer
            .lock()
            .map(|ringer| ringer.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

/// Alarm without output; only tracks whether it would be ringing.
#[derive(Debug, Default)]
pub struct SilentAlarm {
    ringing: AtomicBool,
}

#[async_trait]
impl AlarmPlayer for SilentAlarm {
    async fn start(&self) -> Result<(), InfraError> {
        self.ringing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), InfraError> {
        self.ringing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_ringing(&self) -> bool {
        self.ringing.load(Ordering::SeqCst)
    }
}
