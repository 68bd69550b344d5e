//! Change detection for live shader reload.
//!
//! A [`ReloadMonitor`] is asked on every `apply_shader` whether any watched
//! file changed. Checks run on the caller's thread; nothing here spawns work
//! of its own.

mod notify_monitor;

pub use notify_monitor::NotifyMonitor;

use crate::config::{ShaderConfig, WatchMode};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// Last observed modification time per watched file. `None` if the file
/// could not be stat'ed.
pub type TimestampBaseline = BTreeMap<PathBuf, Option<SystemTime>>;

/// Decides when a shader must be rebuilt.
pub trait ReloadMonitor {
    /// Replaces the watched set and records its current state.
    fn rebaseline(&mut self, files: &[PathBuf]);

    /// Returns true if a watched file changed since the baseline.
    fn needs_reload(&mut self) -> bool;
}

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Current modification time of `path`.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            debug!("Cannot stat {:?}: {}", path, e);
            None
        }
    }
}

/// Tracks whether a fixed interval has passed since the last tick.
#[derive(Debug, Clone)]
struct IntervalTimer {
    last_time: Instant,
    interval: Duration,
}

impl IntervalTimer {
    fn new(now: Instant, interval: Duration) -> Self {
        Self {
            last_time: now,
            interval,
        }
    }

    /// Returns true and restarts the interval if it has elapsed.
    fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_time) >= self.interval {
            self.last_time = now;
            true
        } else {
            false
        }
    }
}

/// Compares modification times against a baseline, at most once per
/// interval.
#[derive(Debug)]
pub struct PollingMonitor<C: Clock = SystemClock> {
    clock: C,
    timer: IntervalTimer,
    baseline: TimestampBaseline,
}

impl PollingMonitor<SystemClock> {
    /// One-second polling on the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock, Duration::from_secs(1))
    }
}

impl Default for PollingMonitor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PollingMonitor<C> {
    pub fn with_clock(clock: C, interval: Duration) -> Self {
        let timer = IntervalTimer::new(clock.now(), interval);
        Self {
            clock,
            timer,
            baseline: TimestampBaseline::new(),
        }
    }

    pub fn baseline(&self) -> &TimestampBaseline {
        &self.baseline
    }
}

impl<C: Clock> ReloadMonitor for PollingMonitor<C> {
    fn rebaseline(&mut self, files: &[PathBuf]) {
        self.baseline = files
            .iter()
            .map(|path| (path.clone(), modified_time(path)))
            .collect();
        debug!("Watching {} shader files", self.baseline.len());
    }

    fn needs_reload(&mut self) -> bool {
        if !self.timer.tick(self.clock.now()) {
            return false;
        }
        for (path, seen) in &self.baseline {
            if modified_time(path) != *seen {
                info!("Shader file {:?} changed", path);
                return true;
            }
        }
        false
    }
}

/// Builds the monitor selected by `config`, or `None` when watching is off.
///
/// Falls back to polling if filesystem notifications are unavailable.
pub fn from_config(config: &ShaderConfig) -> Option<Box<dyn ReloadMonitor>> {
    match config.watch {
        WatchMode::Off => None,
        WatchMode::Poll => Some(Box::new(PollingMonitor::with_clock(SystemClock, config.reload_interval()))),
        WatchMode::Notify => match NotifyMonitor::new() {
            Ok(monitor) => Some(Box::new(monitor)),
            Err(e) => {
                warn!("Failed to create file watcher, polling instead: {}", e);
                Some(Box::new(PollingMonitor::with_clock(SystemClock, config.reload_interval())))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn temp_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("glint_monitor_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, "void main() {}").unwrap();
        path
    }

    fn touch(path: &Path, time: SystemTime) {
        File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
    }

    #[test]
    fn test_interval_gates_checks() {
        let path = temp_file("interval.frag");
        let clock = Rc::new(ManualClock::new());
        let mut monitor = PollingMonitor::with_clock(Rc::clone(&clock), Duration::from_secs(1));
        monitor.rebaseline(std::slice::from_ref(&path));

        touch(&path, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        clock.advance(Duration::from_millis(500));
        assert!(!monitor.needs_reload());
        clock.advance(Duration::from_millis(500));
        assert!(monitor.needs_reload());
    }

    #[test]
    fn test_unchanged_files_do_not_reload() {
        let path = temp_file("steady.frag");
        let clock = Rc::new(ManualClock::new());
        let mut monitor = PollingMonitor::with_clock(Rc::clone(&clock), Duration::from_secs(1));
        monitor.rebaseline(std::slice::from_ref(&path));
        let before = monitor.baseline().clone();

        clock.advance(Duration::from_secs(5));
        assert!(!monitor.needs_reload());
        assert_eq!(monitor.baseline(), &before);
    }

    #[test]
    fn test_rebaseline_captures_new_time() {
        let path = temp_file("rebase.frag");
        let clock = Rc::new(ManualClock::new());
        let mut monitor = PollingMonitor::with_clock(Rc::clone(&clock), Duration::from_secs(1));
        monitor.rebaseline(std::slice::from_ref(&path));

        let changed = SystemTime::UNIX_EPOCH + Duration::from_secs(2_000);
        touch(&path, changed);
        clock.advance(Duration::from_secs(1));
        assert!(monitor.needs_reload());

        monitor.rebaseline(std::slice::from_ref(&path));
        assert_eq!(monitor.baseline()[&path], Some(changed));
        clock.advance(Duration::from_secs(1));
        assert!(!monitor.needs_reload());
    }

    #[test]
    fn test_missing_file_appearing_triggers_reload() {
        let path = temp_file("appear.frag");
        fs::remove_file(&path).unwrap();
        let clock = Rc::new(ManualClock::new());
        let mut monitor = PollingMonitor::with_clock(Rc::clone(&clock), Duration::from_secs(1));
        monitor.rebaseline(std::slice::from_ref(&path));
        assert_eq!(monitor.baseline()[&path], None);

        fs::write(&path, "void main() {}").unwrap();
        clock.advance(Duration::from_secs(1));
        assert!(monitor.needs_reload());
    }

    #[test]
    fn test_watch_off_builds_nothing() {
        let config = ShaderConfig {
            watch: WatchMode::Off,
            ..Default::default()
        };
        assert!(from_config(&config).is_none());
        assert!(from_config(&ShaderConfig::default()).is_some());
    }
}
