use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::cli::config::Config;
use crate::error::{Error, Result};
use crate::manifest::MANIFEST_FILE;
use crate::pipeline::{LOCATION_LINK, commit_all, git, relink};

/// Manifest written by `init`, to be filled in by hand or by `unravel`.
pub const SKELETON_TEMPLATE: &str = "\
db: null
prefix: null
name: null
icon: null
sequence: 10
main_view: null
onchanges: []
views: []
styles: []
labels: []
params: []
";

/// Expands a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

/// Sets up a project directory: manifest template, `location` link,
/// `.gitignore` and, when configured, a git repository with a first commit.
/// An existing manifest or link is left alone.
pub fn init(project: &Path, config: &Config) -> Result<()> {
    let manifest_path = project.join(MANIFEST_FILE);
    if manifest_path.exists() {
        warn!("{} already exists, keeping it", manifest_path.display());
    } else {
        std::fs::write(&manifest_path, SKELETON_TEMPLATE)
            .map_err(|e| Error::io(&manifest_path, e))?;
    }

    let link = project.join(LOCATION_LINK);
    if link.symlink_metadata().is_ok() {
        warn!("{} already exists, keeping it", link.display());
    } else {
        relink(&link, &expand_home(&config.default_destination))?;
    }

    let gitignore = project.join(".gitignore");
    std::fs::write(&gitignore, format!("{}\n", config.build_name))
        .map_err(|e| Error::io(&gitignore, e))?;

    if config.git {
        git(project, &["init", "--quiet"])?;
        commit_all(project, "init")?;
    }

    info!("initialized project in {}", project.display());
    Ok(())
}
