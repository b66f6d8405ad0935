use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::Mapping;

use crate::cli::config::Config;
use crate::error::{Error, Result};
use crate::manifest::{self, MANIFEST_FILE, RecordSet};
use crate::pipeline::LOCATION_LINK;
use crate::record::ChildRecord;

fn render_all<R: ChildRecord>(records: &[R], scenario_id: &str) -> impl Iterator<Item = String> {
    records.iter().map(move |r| r.to_xml(scenario_id))
}

/// Renders the full data document. Records come in a fixed kind order:
/// onchanges, views, styles, the scenario, labels, params.
pub fn render_document(records: &RecordSet, surrounding_tag: &str) -> String {
    let scenario_id = records.scenario.xml_id.as_str();

    let body: Vec<String> = render_all(&records.onchanges, scenario_id)
        .chain(render_all(&records.views, scenario_id))
        .chain(render_all(&records.styles, scenario_id))
        .chain(std::iter::once(records.scenario.to_xml()))
        .chain(render_all(&records.labels, scenario_id))
        .chain(render_all(&records.params, scenario_id))
        .collect();

    [
        r#"<?xml version="1.0" encoding="utf-8"?>"#.to_string(),
        format!("<{}>", surrounding_tag),
        "<data>".to_string(),
        body.join("\n"),
        "</data>".to_string(),
        format!("</{}>\n", surrounding_tag),
    ]
    .join("\n")
}

/// Rebuilds the records of a manifest, reading side-car files from the
/// project directory.
pub fn load_records(project: &Path, manifest: &Mapping) -> Result<RecordSet> {
    manifest::rebuild_records(manifest, |file_name| {
        let path = project.join(file_name);
        debug!("reading {}", path.display());
        std::fs::read_to_string(&path).map_err(|source| Error::MissingSideCar { path, source })
    })
}

/// Moves `from` to `to`, copying across filesystems.
fn relocate(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to).map_err(|e| Error::io(to, e))?;
    std::fs::remove_file(from).map_err(|e| Error::io(from, e))
}

/// Rebuilds the data file, writes it as `build_name` and delivers it to
/// `location/data_{file_name}.xml`. Returns the delivered path.
pub fn build(project: &Path, config: &Config) -> Result<PathBuf> {
    let manifest = manifest::read_manifest(&project.join(MANIFEST_FILE))?;
    let records = load_records(project, &manifest)?;
    let document = render_document(&records, &config.surrounding_tag);

    let build_path = project.join(&config.build_name);
    std::fs::write(&build_path, document).map_err(|e| Error::io(&build_path, e))?;

    let destination = project
        .join(LOCATION_LINK)
        .join(format!("data_{}.xml", records.scenario.file_name));
    if config.keep_build {
        std::fs::copy(&build_path, &destination).map_err(|e| Error::io(&destination, e))?;
    } else {
        relocate(&build_path, &destination)?;
    }

    info!("built {}", destination.display());
    Ok(destination)
}
