use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cli::config::Config;
use crate::error::{Error, Result};
use crate::manifest::RecordSet;
use crate::pipeline::{self, inject::inject_project};

fn summary(records: &RecordSet) -> String {
    format!(
        "{} onchanges, {} views, {} stylesheets, {} labels, {} params",
        records.onchanges.len(),
        records.views.len(),
        records.styles.len(),
        records.labels.len(),
        records.params.len()
    )
}

fn watched<F>(project: &Path, config: &Config, watch: bool, mut run: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    run()?;
    if watch || config.watch {
        pipeline::watch(project, &[config.build_name.as_str()], run)?;
    }
    Ok(())
}

// ============================================================================
// init subcommand
// ============================================================================

pub fn cmd_init(project: &Path, config: &Config) -> Result<()> {
    pipeline::init(project, config)?;
    println!("Initialized project in {}", project.display());
    Ok(())
}

// ============================================================================
// unravel subcommand
// ============================================================================

pub fn cmd_unravel(project: &Path, file: &Path, config: &Config, watch: bool) -> Result<()> {
    watched(project, config, watch, || {
        let records = pipeline::unravel(project, file, config)?;
        println!(
            "Unravelled scenario {}: {}",
            records.scenario.xml_id,
            summary(&records)
        );
        Ok(())
    })
}

// ============================================================================
// build subcommand
// ============================================================================

pub fn cmd_build(project: &Path, config: &Config, watch: bool) -> Result<()> {
    watched(project, config, watch, || {
        let destination = pipeline::build(project, config)?;
        println!("Built {}", destination.display());
        Ok(())
    })
}

// ============================================================================
// inject subcommand
// ============================================================================

/// Writes the injection script to `output`, or stdout.
pub fn cmd_inject(project: &Path, config: &Config, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| Error::io(path, e))?;
            let count = inject_project(project, config, BufWriter::new(file), path)?;
            println!("Wrote {} statements to {}", count, path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            inject_project(project, config, &mut lock, "<stdout>")?;
            lock.flush().map_err(|e| Error::io("<stdout>", e))?;
        }
    }
    Ok(())
}
