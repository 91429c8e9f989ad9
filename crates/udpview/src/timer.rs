//! Performance measurement tools.

use std::{
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Smoothing factor of the exponential moving average kept by [`Timer`].
const EMA_ALPHA: f32 = 0.3;

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are averaged and reset when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Exponential moving average of the measured durations, in seconds. `None` until the first
    /// measurement after a reset.
    avg: Option<f32>,
    /// The number of time measurements that contributed to the current `avg`.
    count: usize,
}

impl State {
    fn record(&mut self, secs: f32) {
        self.avg = Some(match self.avg {
            Some(avg) => EMA_ALPHA * secs + (1.0 - EMA_ALPHA) * avg,
            None => secs,
        });
        self.count += 1;
    }
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        self.record(start.elapsed());
    }

    fn record(&self, duration: Duration) {
        self.lock().record(duration.as_secs_f32());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave `State` inconsistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = std::mem::take(&mut *self.lock());
        let avg_ms = state.avg.unwrap_or(0.0) * 1000.0;
        write!(f, "{}: {}x{avg_ms:.01}ms", self.name, state.count)
    }
}

/// Cloning a timer resets its collected timings.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Logs frames per second with optional extra data.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.tick_with(std::iter::empty::<&Timer>());
    }

    /// Advances the frame counter by 1 and logs FPS and `extra` data if one second has passed.
    ///
    /// `extra` is only formatted (and, for [`Timer`]s, reset) when a line is actually logged.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) {
        self.frames += 1;
        if self.start.elapsed() > Duration::from_secs(1) {
            let extra = extra
                .into_iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>();
            if extra.is_empty() {
                log::debug!("{}: {} FPS", self.name, self.frames);
            } else {
                log::debug!("{}: {} FPS ({})", self.name, self.frames, extra.join(", "));
            }

            self.frames = 0;
            self.start = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reports_and_resets() {
        let timer = Timer::new("read");
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(10));
        assert_eq!(timer.to_string(), "read: 2x10.0ms");
        assert_eq!(timer.to_string(), "read: 0x0.0ms");
    }

    #[test]
    fn average_is_smoothed() {
        let timer = Timer::new("show");
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        // 0.3 * 20 + 0.7 * 10
        assert_eq!(timer.to_string(), "show: 2x13.0ms");
    }

    #[test]
    fn guard_records_on_drop() {
        let timer = Timer::new("op");
        let value = timer.time(|| 42);
        assert_eq!(value, 42);
        drop(timer.start());
        assert!(timer.to_string().starts_with("op: 2x"));
    }

    #[test]
    fn clone_resets() {
        let timer = Timer::new("op");
        timer.record(Duration::from_millis(5));
        assert_eq!(timer.clone().to_string(), "op: 0x0.0ms");
        assert_eq!(timer.name(), "op");
    }
}
