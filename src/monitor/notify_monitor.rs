//! Filesystem-event monitor built on `notify`.

use super::ReloadMonitor;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use tracing::{debug, info, warn};

/// Reports a reload when a Modify or Create event names a watched file.
///
/// Parent directories are watched rather than the files themselves so that
/// editors replacing a file on save are still noticed. Events arrive on
/// notify's thread and are drained in [`ReloadMonitor::needs_reload`].
pub struct NotifyMonitor {
    watcher: RecommendedWatcher,
    rx: Receiver<Result<Event, notify::Error>>,
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

/// Canonical form of `path`. A file that does not exist yet is placed in
/// its canonical parent directory, which is what notify will report.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(path) = fs::canonicalize(path) {
        return path;
    }
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

impl NotifyMonitor {
    pub fn new() -> Result<Self, notify::Error> {
        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        Ok(Self {
            watcher,
            rx,
            files: BTreeSet::new(),
            dirs: BTreeSet::new(),
        })
    }

    pub fn watched_files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }
}

impl ReloadMonitor for NotifyMonitor {
    fn rebaseline(&mut self, files: &[PathBuf]) {
        for dir in std::mem::take(&mut self.dirs) {
            if let Err(e) = self.watcher.unwatch(&dir) {
                debug!("Failed to unwatch {:?}: {}", dir, e);
            }
        }
        self.files = files.iter().map(|p| normalize(p)).collect();

        let dirs: BTreeSet<PathBuf> = self
            .files
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();
        for dir in dirs {
            match self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    self.dirs.insert(dir);
                }
                Err(e) => warn!("Failed to watch {:?}: {}", dir, e),
            }
        }
        info!("Watching {} shader files in {} directories", self.files.len(), self.dirs.len());

        // Events from before the baseline are stale.
        while self.rx.try_recv().is_ok() {}
    }

    fn needs_reload(&mut self) -> bool {
        let mut changed = false;
        while let Ok(res) = self.rx.try_recv() {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, notify::EventKind::Modify(_) | notify::EventKind::Create(_)) {
                        continue;
                    }
                    if let Some(path) = event.paths.iter().find(|p| self.files.contains(&normalize(p))) {
                        info!("Shader file {:?} changed", path);
                        changed = true;
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            }
        }
        changed
    }
}
