use crate::application::clock::Clock;
use crate::application::collections::load_or_default;
use crate::domain::models::TimerStats;
use crate::domain::timer::{PomodoroTimer, TickOutcome, TimerPhase, TimerTone, ToggleOutcome};
use crate::infrastructure::alarm::AlarmPlayer;
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::TimerConfig;
use crate::infrastructure::error::InfraError;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const ALARM_FALLBACK_NOTICE: &str = "Timer complete!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub remaining_seconds: u32,
    pub clock_text: String,
    pub tone: TimerTone,
    pub hint: String,
    pub alarm_ringing: bool,
    pub notice: Option<String>,
    pub stats: TimerStats,
}

struct TimerRuntime {
    timer: PomodoroTimer,
    stats: TimerStats,
    // Set while `stats` holds sessions the store has not accepted yet.
    stats_unsaved: bool,
    ticker: Option<JoinHandle<()>>,
    ticker_generation: u64,
    notice: Option<String>,
}

struct PomodoroShared {
    runtime: Mutex<TimerRuntime>,
    store: CollectionStore,
    log: Arc<CommandLog>,
    clock: Clock,
    alarm: Arc<dyn AlarmPlayer>,
}

/// Countdown driven by one background tokio task ticking once per second.
/// At most one ticker exists; pausing, completing, resetting, shutting down
/// and dropping the service cancel it.
pub struct PomodoroService {
    shared: Arc<PomodoroShared>,
}

enum TickerControl {
    Continue,
    Stop,
}

impl PomodoroService {
    pub fn new(
        config: TimerConfig,
        store: CollectionStore,
        log: Arc<CommandLog>,
        clock: Clock,
        alarm: Arc<dyn AlarmPlayer>,
    ) -> Self {
        let stats = load_timer_stats(&store, &log, clock.today());
        Self {
            shared: Arc::new(PomodoroShared {
                runtime: Mutex::new(TimerRuntime {
                    timer: PomodoroTimer::new(
                        config.focus_seconds(),
                        config.warning_threshold_seconds,
                    ),
                    stats,
                    stats_unsaved: false,
                    ticker: None,
                    ticker_generation: 0,
                    notice: None,
                }),
                store,
                log,
                clock,
                alarm,
            }),
        }
    }

    pub fn snapshot(&self) -> Result<TimerSnapshot, InfraError> {
        let runtime = self.shared.lock_runtime()?;
        Ok(self.shared.snapshot_of(&runtime))
    }

    /// Start, pause/resume, or acknowledge a completed session, depending on
    /// the current phase.
    pub async fn toggle(&self) -> Result<TimerSnapshot, InfraError> {
        let outcome = {
            let mut runtime = self.shared.lock_runtime()?;
            let outcome = runtime.timer.toggle();
            match outcome {
                ToggleOutcome::Started => self.spawn_ticker(&mut runtime),
                ToggleOutcome::Paused => cancel_ticker(&mut runtime),
                ToggleOutcome::Acknowledged => {
                    cancel_ticker(&mut runtime);
                    runtime.notice = None;
                }
            }
            outcome
        };
        if outcome == ToggleOutcome::Acknowledged {
            self.shared.silence_alarm().await;
        }
        let snapshot = self.snapshot()?;
        self.shared.log.info(
            "toggle_timer",
            &format!(
                "outcome={outcome:?} phase={} remaining={}",
                snapshot.phase.as_str(),
                snapshot.remaining_seconds
            ),
        );
        Ok(snapshot)
    }

    /// Silences a completed session and rearms the full duration. Does
    /// nothing in other phases.
    pub async fn acknowledge(&self) -> Result<TimerSnapshot, InfraError> {
        let acknowledged = {
            let mut runtime = self.shared.lock_runtime()?;
            let acknowledged = runtime.timer.acknowledge();
            if acknowledged {
                runtime.notice = None;
            }
            acknowledged
        };
        if acknowledged {
            self.shared.silence_alarm().await;
            self.shared.log.info("acknowledge_timer", "alarm acknowledged");
        }
        self.snapshot()
    }

    /// Abandons the current countdown without recording a session.
    pub fn reset(&self) -> Result<TimerSnapshot, InfraError> {
        let mut runtime = self.shared.lock_runtime()?;
        if runtime.timer.reset() {
            cancel_ticker(&mut runtime);
            self.shared.log.info("reset_timer", "countdown reset");
        }
        Ok(self.shared.snapshot_of(&runtime))
    }

    /// Re-reads statistics from the store, applying the day rollover. While
    /// a completed session is still unsaved the in-memory copy is ahead of
    /// the store and is kept instead.
    pub fn reload_stats(&self) -> Result<TimerStats, InfraError> {
        let today = self.shared.clock.today();
        let mut runtime = self.shared.lock_runtime()?;
        if runtime.stats_unsaved {
            runtime.stats.roll_over(today);
        } else {
            runtime.stats = load_timer_stats(&self.shared.store, &self.shared.log, today);
        }
        Ok(runtime.stats.clone())
    }

    /// Zeroed statistics after a full store wipe.
    pub fn forget_stats(&self) -> Result<TimerStats, InfraError> {
        let mut runtime = self.shared.lock_runtime()?;
        runtime.stats = TimerStats::fresh(self.shared.clock.today());
        runtime.stats_unsaved = false;
        Ok(runtime.stats.clone())
    }

    /// Cancels the ticker and silences the alarm. Used on unmount.
    pub async fn shutdown(&self) {
        if let Ok(mut runtime) = self.shared.lock_runtime() {
            cancel_ticker(&mut runtime);
        }
        self.shared.silence_alarm().await;
    }

    pub fn has_active_ticker(&self) -> bool {
        self.shared
            .lock_runtime()
            .map(|runtime| {
                runtime
                    .ticker
                    .as_ref()
                    .is_some_and(|handle| !handle.is_finished())
            })
            .unwrap_or(false)
    }

    fn spawn_ticker(&self, runtime: &mut TimerRuntime) {
        cancel_ticker(runtime);
        runtime.ticker_generation += 1;
        let generation = runtime.ticker_generation;
        let shared = Arc::clone(&self.shared);
        runtime.ticker = Some(tokio::spawn(async move {
            let mut ticker = interval(TICK_PERIOD);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match shared.tick(generation).await {
                    TickerControl::Continue => {}
                    TickerControl::Stop => break,
                }
            }
        }));
    }
}

impl Drop for PomodoroService {
    fn drop(&mut self) {
        if let Ok(mut runtime) = self.shared.runtime.lock() {
            cancel_ticker(&mut runtime);
        }
    }
}

impl PomodoroShared {
    fn lock_runtime(&self) -> Result<MutexGuard<'_, TimerRuntime>, InfraError> {
        self.runtime
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("timer lock poisoned: {error}")))
    }

    fn snapshot_of(&self, runtime: &TimerRuntime) -> TimerSnapshot {
        let mut stats = runtime.stats.clone();
        stats.roll_over(self.clock.today());
        TimerSnapshot {
            phase: runtime.timer.phase(),
            remaining_seconds: runtime.timer.seconds(),
            clock_text: runtime.timer.clock_text(),
            tone: runtime.timer.tone(),
            hint: runtime.timer.hint().to_string(),
            alarm_ringing: self.alarm.is_ringing(),
            notice: runtime.notice.clone(),
            stats,
        }
    }

    async fn tick(&self, generation: u64) -> TickerControl {
        let completed = {
            let Ok(mut runtime) = self.lock_runtime() else {
                return TickerControl::Stop;
            };
            if runtime.ticker_generation != generation {
                return TickerControl::Stop;
            }
            match runtime.timer.tick() {
                TickOutcome::Counting(_) => return TickerControl::Continue,
                TickOutcome::Ignored => {
                    runtime.ticker = None;
                    return TickerControl::Stop;
                }
                TickOutcome::Completed => {
                    // The running task is this ticker; detach instead of aborting it.
                    runtime.ticker = None;
                    self.record_session(&mut runtime);
                    true
                }
            }
        };
        if completed {
            self.ring_alarm().await;
        }
        TickerControl::Stop
    }

    /// Credits one session to the in-memory stats and writes them back.
    /// A failed write keeps the session in memory for the next save.
    fn record_session(&self, runtime: &mut TimerRuntime) {
        let today = self.clock.today();
        let minutes = runtime.timer.session_minutes();
        let mut stats = runtime.stats.clone();
        stats.record_session(today, minutes);
        // Completion runs on the ticker, with no command caller to report to.
        match self.store.save(StorageKey::TimerStats, &stats) {
            Ok(()) => {
                runtime.stats_unsaved = false;
                self.log.info(
                    "complete_session",
                    &format!(
                        "recorded session minutes={minutes} today_sessions={}",
                        stats.today_sessions
                    ),
                );
            }
            Err(error) => {
                runtime.stats_unsaved = true;
                self.log.error("complete_session", &error.to_string());
            }
        }
        runtime.stats = stats;
    }

    async fn ring_alarm(&self) {
        if let Err(error) = self.alarm.start().await {
            self.log.error("alarm", &error.to_string());
            if let Ok(mut runtime) = self.lock_runtime() {
                if runtime.timer.phase() == TimerPhase::Completed {
                    runtime.notice = Some(ALARM_FALLBACK_NOTICE.to_string());
                }
            }
            return;
        }
        let still_completed = self
            .lock_runtime()
            .map(|runtime| runtime.timer.phase() == TimerPhase::Completed)
            .unwrap_or(false);
        if !still_completed {
            self.silence_alarm().await;
        }
    }

    async fn silence_alarm(&self) {
        if let Err(error) = self.alarm.stop().await {
            self.log.error("alarm", &error.to_string());
        }
    }
}

fn cancel_ticker(runtime: &mut TimerRuntime) {
    if let Some(handle) = runtime.ticker.take() {
        handle.abort();
    }
}

/// Stored statistics with the day rollover applied. Missing or unreadable
/// data yields zeroed stats for `today`.
pub fn load_timer_stats(
    store: &CollectionStore,
    log: &CommandLog,
    today: NaiveDate,
) -> TimerStats {
    let mut stats = load_or_default::<Option<TimerStats>>(store, log, StorageKey::TimerStats)
        .unwrap_or_else(|| TimerStats::fresh(today));
    stats.roll_over(today);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::test_support::ManualClock;
    use crate::application::collections::test_support::MemoryHarness;
    use crate::infrastructure::alarm::SilentAlarm;
    use async_trait::async_trait;
    use chrono_tz::Tz;

    struct BrokenAlarm;

    #[async_trait]
    impl AlarmPlayer for BrokenAlarm {
        async fn start(&self) -> Result<(), InfraError> {
            Err(InfraError::Alarm("no audio device".to_string()))
        }

        async fn stop(&self) -> Result<(), InfraError> {
            Ok(())
        }

        fn is_ringing(&self) -> bool {
            false
        }
    }

    fn short_config(focus_minutes: u32) -> TimerConfig {
        TimerConfig {
            focus_minutes,
            warning_threshold_seconds: 180,
        }
    }

    fn service(
        harness: &MemoryHarness,
        manual: &ManualClock,
        config: TimerConfig,
        alarm: Arc<dyn AlarmPlayer>,
    ) -> PomodoroService {
        PomodoroService::new(
            config,
            harness.store.clone(),
            harness.log.clone(),
            manual.clock(Tz::UTC),
            alarm,
        )
    }

    fn stored_stats(harness: &MemoryHarness) -> TimerStats {
        harness
            .store
            .load(StorageKey::TimerStats)
            .expect("load stats")
            .expect("stats present")
    }

    async fn run_for(seconds: u64) {
        tokio::time::sleep(Duration::from_secs(seconds) + Duration::from_millis(500)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_completes_and_records_stats() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let alarm = Arc::new(SilentAlarm::default());
        let timer = service(&harness, &manual, TimerConfig::default(), alarm.clone());

        let started = timer.toggle().await.expect("start");
        assert_eq!(started.phase, TimerPhase::Running);
        assert_eq!(started.clock_text, "25:00");

        run_for(1500).await;
        let done = timer.snapshot().expect("snapshot");
        assert_eq!(done.phase, TimerPhase::Completed);
        assert_eq!(done.remaining_seconds, 0);
        assert_eq!(done.tone, TimerTone::Alarm);
        assert!(done.alarm_ringing);
        assert!(!timer.has_active_ticker());

        let stats = stored_stats(&harness);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.today_minutes, 25);
        assert_eq!(stats.last_session_date, "2026-10-19");

        let rearmed = timer.toggle().await.expect("acknowledge");
        assert_eq!(rearmed.phase, TimerPhase::Idle);
        assert_eq!(rearmed.remaining_seconds, 1500);
        assert!(!alarm.is_ringing());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_continue_from_remaining_seconds() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(
            &harness,
            &manual,
            TimerConfig::default(),
            Arc::new(SilentAlarm::default()),
        );

        timer.toggle().await.expect("start");
        run_for(100).await;
        let paused = timer.toggle().await.expect("pause");
        assert_eq!(paused.phase, TimerPhase::Idle);
        assert_eq!(paused.remaining_seconds, 1400);
        assert!(!timer.has_active_ticker());

        run_for(60).await;
        assert_eq!(timer.snapshot().expect("snapshot").remaining_seconds, 1400);

        timer.toggle().await.expect("resume");
        run_for(10).await;
        assert_eq!(timer.snapshot().expect("snapshot").remaining_seconds, 1390);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_toggles_never_double_tick() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(
            &harness,
            &manual,
            TimerConfig::default(),
            Arc::new(SilentAlarm::default()),
        );

        for _ in 0..5 {
            timer.toggle().await.expect("start");
            timer.toggle().await.expect("pause");
        }
        timer.toggle().await.expect("start");
        run_for(30).await;
        assert_eq!(timer.snapshot().expect("snapshot").remaining_seconds, 1470);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_on_a_new_day_resets_today_counters() {
        let harness = MemoryHarness::new();
        harness
            .store
            .save(
                StorageKey::TimerStats,
                &TimerStats {
                    total_sessions: 7,
                    total_minutes: 175,
                    today_sessions: 3,
                    today_minutes: 75,
                    last_session_date: "2026-10-18".to_string(),
                },
            )
            .expect("seed stats");
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(&harness, &manual, short_config(1), Arc::new(SilentAlarm::default()));

        timer.toggle().await.expect("start");
        run_for(60).await;

        let stats = stored_stats(&harness);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.today_minutes, 1);
        assert_eq!(stats.total_sessions, 8);
        assert_eq!(stats.total_minutes, 176);
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_failure_still_records_session_and_sets_notice() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(&harness, &manual, short_config(1), Arc::new(BrokenAlarm));

        timer.toggle().await.expect("start");
        run_for(60).await;

        let snapshot = timer.snapshot().expect("snapshot");
        assert_eq!(snapshot.phase, TimerPhase::Completed);
        assert_eq!(snapshot.notice.as_deref(), Some("Timer complete!"));
        assert_eq!(stored_stats(&harness).total_sessions, 1);
        assert!(harness.log_text().contains("no audio device"));

        let cleared = timer.acknowledge().await.expect("acknowledge");
        assert!(cleared.notice.is_none());
        assert_eq!(cleared.remaining_seconds, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stats_write_does_not_block_completion() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(&harness, &manual, short_config(1), Arc::new(SilentAlarm::default()));
        harness.backend.set_fail_writes(true);

        timer.toggle().await.expect("start");
        run_for(60).await;

        let snapshot = timer.snapshot().expect("snapshot");
        assert_eq!(snapshot.phase, TimerPhase::Completed);
        assert_eq!(snapshot.stats.total_sessions, 1);
        assert!(harness.log_text().contains("complete_session"));
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_session_is_kept_until_the_next_successful_write() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(&harness, &manual, short_config(1), Arc::new(SilentAlarm::default()));

        harness.backend.set_fail_writes(true);
        timer.toggle().await.expect("start");
        run_for(60).await;
        timer.acknowledge().await.expect("acknowledge");
        assert_eq!(timer.reload_stats().expect("reload").total_sessions, 1);

        harness.backend.set_fail_writes(false);
        timer.toggle().await.expect("start again");
        run_for(60).await;

        let stored = stored_stats(&harness);
        assert_eq!(stored.total_sessions, 2);
        assert_eq!(stored.today_minutes, 2);
        assert_eq!(timer.snapshot().expect("snapshot").stats.total_sessions, 2);
        assert_eq!(timer.reload_stats().expect("reload").total_sessions, 2);
    }

    #[test]
    fn forget_stats_zeroes_the_in_memory_copy() {
        let harness = MemoryHarness::new();
        harness
            .store
            .save(
                StorageKey::TimerStats,
                &TimerStats {
                    total_sessions: 4,
                    total_minutes: 100,
                    today_sessions: 1,
                    today_minutes: 25,
                    last_session_date: "2026-10-19".to_string(),
                },
            )
            .expect("seed stats");
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(
            &harness,
            &manual,
            TimerConfig::default(),
            Arc::new(SilentAlarm::default()),
        );
        assert_eq!(timer.snapshot().expect("snapshot").stats.total_sessions, 4);

        let forgotten = timer.forget_stats().expect("forget");
        assert_eq!(forgotten, TimerStats::fresh(manual.clock(Tz::UTC).today()));
        assert_eq!(timer.snapshot().expect("snapshot").stats.total_sessions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_and_shutdown_cancel_the_ticker() {
        let harness = MemoryHarness::new();
        let manual = ManualClock::at("2026-10-19T09:00:00Z");
        let timer = service(
            &harness,
            &manual,
            TimerConfig::default(),
            Arc::new(SilentAlarm::default()),
        );

        timer.toggle().await.expect("start");
        run_for(5).await;
        let reset = timer.reset().expect("reset");
        assert_eq!(reset.remaining_seconds, 1500);
        assert!(!timer.has_active_ticker());

        timer.toggle().await.expect("start again");
        timer.shutdown().await;
        run_for(5).await;
        assert_eq!(timer.snapshot().expect("snapshot").remaining_seconds, 1500);
    }

    #[test]
    fn stored_stats_roll_over_on_load() {
        let harness = MemoryHarness::new();
        harness
            .store
            .save(
                StorageKey::TimerStats,
                &TimerStats {
                    total_sessions: 12,
                    total_minutes: 300,
                    today_sessions: 3,
                    today_minutes: 75,
                    last_session_date: "2026-10-18".to_string(),
                },
            )
            .expect("seed stats");
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");

        let stats = load_timer_stats(&harness.store, &harness.log, today);
        assert_eq!(stats.today_sessions, 0);
        assert_eq!(stats.today_minutes, 0);
        assert_eq!(stats.total_sessions, 12);
        assert_eq!(stats.last_session_date, "2026-10-19");
    }

    #[test]
    fn snapshot_rolls_over_when_the_day_changes() {
        let harness = MemoryHarness::new();
        harness
            .store
            .save(
                StorageKey::TimerStats,
                &TimerStats {
                    total_sessions: 2,
                    total_minutes: 50,
                    today_sessions: 2,
                    today_minutes: 50,
                    last_session_date: "2026-10-19".to_string(),
                },
            )
            .expect("seed stats");
        let manual = ManualClock::at("2026-10-19T23:00:00Z");
        let timer = service(
            &harness,
            &manual,
            TimerConfig::default(),
            Arc::new(SilentAlarm::default()),
        );
        assert_eq!(timer.snapshot().expect("snapshot").stats.today_sessions, 2);

        manual.advance_days(1);
        let snapshot = timer.snapshot().expect("snapshot");
        assert_eq!(snapshot.stats.today_sessions, 0);
        assert_eq!(snapshot.stats.total_sessions, 2);
    }
}
