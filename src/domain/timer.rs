use serde::Serialize;

pub const DEFAULT_FOCUS_SECONDS: u32 = 25 * 60;
pub const DEFAULT_WARNING_THRESHOLD_SECONDS: u32 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Completed,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

/// Visual state of the countdown. Only the thresholds are meaningful; the
/// concrete colours belong to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerTone {
    Neutral,
    Focus,
    Warning,
    Alarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started,
    Paused,
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Counting(u32),
    Completed,
}

/// Three-state countdown: idle, running, completed. Pausing is a toggle while
/// running and keeps the remaining seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroTimer {
    duration_seconds: u32,
    warning_threshold_seconds: u32,
    seconds: u32,
    active: bool,
    completed: bool,
}

impl PomodoroTimer {
    pub fn new(duration_seconds: u32, warning_threshold_seconds: u32) -> Self {
        let duration_seconds = duration_seconds.max(1);
        Self {
            duration_seconds,
            warning_threshold_seconds,
            seconds: duration_seconds,
            active: false,
            completed: false,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        if self.completed {
            TimerPhase::Completed
        } else if self.active {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    /// Whole minutes credited to the statistics for one finished session.
    pub fn session_minutes(&self) -> u32 {
        self.duration_seconds / 60
    }

    pub fn toggle(&mut self) -> ToggleOutcome {
        if self.completed {
            self.acknowledge();
            return ToggleOutcome::Acknowledged;
        }
        self.active = !self.active;
        if self.active {
            ToggleOutcome::Started
        } else {
            ToggleOutcome::Paused
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.active || self.completed {
            return TickOutcome::Ignored;
        }
        self.seconds = self.seconds.saturating_sub(1);
        if self.seconds == 0 {
            self.active = false;
            self.completed = true;
            return TickOutcome::Completed;
        }
        TickOutcome::Counting(self.seconds)
    }

    /// Leaves the completed state and rearms the full duration. Returns
    /// false when there was nothing to acknowledge.
    pub fn acknowledge(&mut self) -> bool {
        if !self.completed {
            return false;
        }
        self.completed = false;
        self.active = false;
        self.seconds = self.duration_seconds;
        true
    }

    /// Drops a running or paused countdown without recording a session.
    pub fn reset(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.active = false;
        self.seconds = self.duration_seconds;
        true
    }

    pub fn tone(&self) -> TimerTone {
        match self.phase() {
            TimerPhase::Completed => TimerTone::Alarm,
            TimerPhase::Running if self.seconds <= self.warning_threshold_seconds => {
                TimerTone::Warning
            }
            TimerPhase::Running => TimerTone::Focus,
            TimerPhase::Idle => TimerTone::Neutral,
        }
    }

    pub fn hint(&self) -> &'static str {
        match self.phase() {
            TimerPhase::Completed => "Tap to stop",
            TimerPhase::Running => "",
            TimerPhase::Idle => "Tap to start",
        }
    }

    pub fn clock_text(&self) -> String {
        format_clock(self.seconds)
    }
}

impl Default for PomodoroTimer {
    fn default() -> Self {
        Self::new(DEFAULT_FOCUS_SECONDS, DEFAULT_WARNING_THRESHOLD_SECONDS)
    }
}

pub fn format_clock(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
