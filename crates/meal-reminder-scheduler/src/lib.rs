//! Hourly meal and hydration reminders.
//!
//! Two independent timers tick once per period: one reminds the user to log
//! lunch when the local hour is the lunch hour, the other to drink water on
//! even hours. They start together and stop together. Nothing is persisted
//! and a missed reminder has no effect on anything else.

use chrono::Timelike;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub const LUNCH_MESSAGE: &str = "Don't forget to log your lunch 🍱";
pub const WATER_MESSAGE: &str = "Drink a glass of water 💧";

/// Scheduler timing.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Time between checks. The first check happens one period after start.
    pub interval: Duration,
    /// Local hour (0-23) at which the lunch reminder fires.
    pub lunch_hour: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            lunch_hour: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    Lunch,
    Water,
}

impl Reminder {
    pub fn message(&self) -> &'static str {
        match self {
            Reminder::Lunch => LUNCH_MESSAGE,
            Reminder::Water => WATER_MESSAGE,
        }
    }

    /// Whether this reminder is due at local `hour`.
    pub fn is_due(&self, hour: u32, config: &ReminderConfig) -> bool {
        match self {
            Reminder::Lunch => hour == config.lunch_hour,
            Reminder::Water => hour % 2 == 0,
        }
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Source of the current local hour.
pub trait Clock: Send + Sync {
    fn current_hour(&self) -> u32;
}

/// Wall clock in the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Delivers reminders to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, reminder: Reminder);
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, reminder: Reminder) {
        info!(reminder = ?reminder, "{}", reminder.message());
    }
}

pub struct ReminderScheduler;

impl ReminderScheduler {
    /// Spawn both timers on the current tokio runtime.
    pub fn start(
        config: ReminderConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> ReminderHandle {
        info!(
            interval_secs = config.interval.as_secs(),
            lunch_hour = config.lunch_hour,
            "Starting reminder timers"
        );

        let tasks = [Reminder::Lunch, Reminder::Water]
            .into_iter()
            .map(|reminder| {
                spawn_timer(reminder, config.clone(), clock.clone(), notifier.clone())
            })
            .collect();

        ReminderHandle { tasks }
    }
}

fn spawn_timer(
    reminder: Reminder,
    config: ReminderConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + config.interval, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let hour = clock.current_hour();
            if reminder.is_due(hour, &config) {
                debug!(reminder = ?reminder, hour, "Reminder due");
                notifier.notify(reminder);
            }
        }
    })
}

/// Running reminder timers. Dropping the handle stops them.
pub struct ReminderHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl ReminderHandle {
    /// Cancel both timers.
    pub fn shutdown(&self) {
        for task in &self.tasks {
            task.abort();
        }
        debug!("Reminder timers stopped");
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedClock(AtomicU32);

    impl FixedClock {
        fn at(hour: u32) -> Arc<Self> {
            Arc::new(Self(AtomicU32::new(hour)))
        }

        fn set(&self, hour: u32) {
            self.0.store(hour, Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn current_hour(&self) -> u32 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Reminder>>);

    impl Recorder {
        fn take(&self) -> Vec<Reminder> {
            let mut seen = std::mem::take(&mut *self.0.lock());
            seen.sort_by_key(|r| *r as u8);
            seen
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, reminder: Reminder) {
            self.0.lock().push(reminder);
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn due_rules() {
        let config = ReminderConfig::default();

        assert!(Reminder::Lunch.is_due(12, &config));
        assert!(!Reminder::Lunch.is_due(13, &config));
        assert!(Reminder::Water.is_due(0, &config));
        assert!(Reminder::Water.is_due(14, &config));
        assert!(!Reminder::Water.is_due(13, &config));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_first_period() {
        let clock = FixedClock::at(12);
        let recorder = Arc::new(Recorder::default());
        let _handle =
            ReminderScheduler::start(ReminderConfig::default(), clock, recorder.clone());

        tokio::time::sleep(HOUR - Duration::from_secs(1)).await;

        assert!(recorder.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_by_hour_each_period() {
        let clock = FixedClock::at(12);
        let recorder = Arc::new(Recorder::default());
        let _handle = ReminderScheduler::start(
            ReminderConfig::default(),
            clock.clone(),
            recorder.clone(),
        );

        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        assert_eq!(recorder.take(), vec![Reminder::Lunch, Reminder::Water]);

        clock.set(13);
        tokio::time::sleep(HOUR).await;
        assert!(recorder.take().is_empty());

        clock.set(14);
        tokio::time::sleep(HOUR).await;
        assert_eq!(recorder.take(), vec![Reminder::Water]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_both_timers() {
        let clock = FixedClock::at(12);
        let recorder = Arc::new(Recorder::default());
        let handle = ReminderScheduler::start(
            ReminderConfig::default(),
            clock,
            recorder.clone(),
        );
        assert!(handle.is_running());

        handle.shutdown();
        tokio::time::sleep(HOUR * 3).await;

        assert!(recorder.take().is_empty());
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_timers() {
        let clock = FixedClock::at(12);
        let recorder = Arc::new(Recorder::default());
        drop(ReminderScheduler::start(
            ReminderConfig::default(),
            clock,
            recorder.clone(),
        ));

        tokio::time::sleep(HOUR * 2).await;

        assert!(recorder.take().is_empty());
    }
}
