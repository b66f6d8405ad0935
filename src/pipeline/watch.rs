use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use notify::event::{AccessKind, AccessMode};
#[cfg(not(target_os = "linux"))]
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::error::{Error, Result};

/// Pause between a save and the run it triggers. Some editors replace the
/// file with a new inode on every save.
const SETTLE: Duration = Duration::from_millis(100);

/// Whether an event marks a file as saved. Only inotify reports closes; on
/// other platforms content writes and creations stand in for them.
fn is_save(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        #[cfg(not(target_os = "linux"))]
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => true,
        _ => false,
    }
}

fn stopped() -> Error {
    Error::Watch(notify::Error::generic("watcher stopped"))
}

/// Reports files saved directly inside a directory. Hidden files and the
/// names in `ignored` never count.
pub struct Watcher {
    ignored: Vec<String>,
    events: Receiver<notify::Result<Event>>,
    // dropping it ends the watch
    _inner: RecommendedWatcher,
}

impl Watcher {
    pub fn new(root: &Path, ignored: &[&str]) -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let mut inner = notify::recommended_watcher(tx)?;
        inner.watch(root, RecursiveMode::NonRecursive)?;
        Ok(Self {
            ignored: ignored.iter().map(|name| name.to_string()).collect(),
            events,
            _inner: inner,
        })
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignored.iter().any(|ignored| ignored == name)
    }

    /// Files of `event` that count as saved.
    pub fn saved(&self, event: &Event) -> Vec<PathBuf> {
        if !is_save(&event.kind) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !name.starts_with('.') && !self.is_ignored(name))
            })
            .cloned()
            .collect()
    }

    /// Blocks until at least one file is saved.
    pub fn wait(&self) -> Result<Vec<PathBuf>> {
        loop {
            let event = self.events.recv().map_err(|_| stopped())?;
            let saved = self.saved(&event?);
            if !saved.is_empty() {
                return Ok(saved);
            }
        }
    }

    /// Like [`Watcher::wait`], but gives up after `timeout` with an empty list.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Vec<PathBuf>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.events.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(event) => {
                    let saved = self.saved(&event?);
                    if !saved.is_empty() {
                        return Ok(saved);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
                Err(RecvTimeoutError::Disconnected) => return Err(stopped()),
            }
        }
    }

    /// Discards pending events; returns how many there were.
    pub fn drain(&self) -> usize {
        self.events.try_iter().count()
    }
}

/// Re-runs `run` whenever a file of `project` is saved, until `run` fails.
/// Saves made by `run` itself do not trigger another run.
pub fn watch<F>(project: &Path, ignored: &[&str], mut run: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let watcher = Watcher::new(project, ignored)?;
    info!("watching {}", project.display());
    loop {
        for path in watcher.wait()? {
            println!("{} modified", path.display());
        }
        thread::sleep(SETTLE);
        run()?;
        thread::sleep(SETTLE);
        debug!("ignoring {} events caused by the run", watcher.drain());
    }
}
