//! Orchestrators driving the record and manifest layers against a project
//! directory: the manifest, its side-car files and the `location` symlink.
//!
//! Every entry point takes the project root explicitly and the resolved
//! [`Config`](crate::cli::config::Config) by reference.

pub mod build;
pub mod init;
pub mod inject;
pub mod unravel;
pub mod watch;

use std::path::Path;
use std::process::Command;

use log::{debug, warn};

use crate::error::{Error, Result};

/// Name of the symlink pointing at the directory of the last unravelled file.
pub const LOCATION_LINK: &str = "location";

pub use build::{build, render_document};
pub use init::init;
pub use inject::{ScriptSink, StatementSink, inject};
pub use unravel::{parse_document, unravel};
pub use watch::{Watcher, watch};

/// Runs `git` with `args` inside the project directory.
pub(crate) fn git(project: &Path, args: &[&str]) -> Result<()> {
    debug!("git {}", args.join(" "));
    let status = Command::new("git")
        .args(args)
        .current_dir(project)
        .status()
        .map_err(|e| Error::io("git", e))?;
    if !status.success() {
        return Err(Error::Command {
            program: format!("git {}", args.join(" ")),
            status,
        });
    }
    Ok(())
}

/// `git add . && git commit`. A commit with nothing to record is not an error.
pub(crate) fn commit_all(project: &Path, message: &str) -> Result<()> {
    git(project, &["add", "."])?;
    match git(project, &["commit", "--no-verify", "-m", message]) {
        Err(Error::Command { status, .. }) => {
            warn!("git commit exited with {}, nothing committed", status);
            Ok(())
        }
        other => other,
    }
}

/// Points `link` at `target`, replacing whatever link was there before.
pub(crate) fn relink(link: &Path, target: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link).map_err(|e| Error::io(link, e))?;
    }
    symlink_dir(target, link).map_err(|e| Error::io(link, e))
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
