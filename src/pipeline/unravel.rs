use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info, warn};
use roxmltree::{Document, Node};

use crate::cli::config::Config;
use crate::error::{Error, Result};
use crate::manifest::{self, MANIFEST_FILE, RecordSet};
use crate::pipeline::{LOCATION_LINK, commit_all, init, relink};
use crate::record::{ChildRecord, Label, Onchange, Param, RecordKind, Scenario, Style, View};

/// Records of one kind keyed by xml id. A later duplicate replaces the
/// earlier record but keeps its position.
struct Bucket<R> {
    records: IndexMap<String, R>,
}

impl<R> Default for Bucket<R> {
    fn default() -> Self {
        Self {
            records: IndexMap::new(),
        }
    }
}

impl<R> Bucket<R> {
    fn insert(&mut self, kind: RecordKind, xml_id: String, record: R) {
        if self.records.insert(xml_id.clone(), record).is_some() {
            warn!("{} \"{}\" is defined twice, keeping the last one", kind.label(), xml_id);
        }
    }

    fn into_vec(self) -> Vec<R> {
        self.records.into_values().collect()
    }
}

impl<R: ChildRecord> Bucket<R> {
    fn parse(&mut self, node: Node<'_, '_>, source: &str) -> Result<()> {
        let record = R::from_xml(node, source)?;
        debug!("parsed {} \"{}\"", R::KIND.label(), record.xml_id());
        self.insert(R::KIND, record.xml_id().to_string(), record);
        Ok(())
    }
}

/// Parses a data file into its records. Records of unknown models are
/// skipped; the file must define exactly one scenario.
pub fn parse_document(source: &str) -> Result<RecordSet> {
    let doc = Document::parse(source)?;

    let mut onchanges: Bucket<Onchange> = Bucket::default();
    let mut views: Bucket<View> = Bucket::default();
    let mut styles: Bucket<Style> = Bucket::default();
    let mut labels: Bucket<Label> = Bucket::default();
    let mut params: Bucket<Param> = Bucket::default();
    let mut scenarios: Bucket<Scenario> = Bucket::default();

    for node in doc.descendants().filter(|n| n.has_tag_name("record")) {
        let Some(kind) = node.attribute("model").and_then(RecordKind::from_model) else {
            debug!(
                "skipping record \"{}\" of model {:?}",
                node.attribute("id").unwrap_or_default(),
                node.attribute("model")
            );
            continue;
        };
        match kind {
            RecordKind::Onchange => onchanges.parse(node, source)?,
            RecordKind::View => views.parse(node, source)?,
            RecordKind::Style => styles.parse(node, source)?,
            RecordKind::Label => labels.parse(node, source)?,
            RecordKind::Param => params.parse(node, source)?,
            RecordKind::Scenario => {
                let scenario = Scenario::from_xml(node)?;
                scenarios.insert(kind, scenario.xml_id.clone(), scenario);
            }
        }
    }

    let mut scenarios = scenarios.into_vec();
    if scenarios.len() != 1 {
        return Err(Error::ScenarioCount {
            count: scenarios.len(),
        });
    }

    Ok(RecordSet {
        scenario: scenarios.remove(0),
        onchanges: onchanges.into_vec(),
        views: views.into_vec(),
        styles: styles.into_vec(),
        labels: labels.into_vec(),
        params: params.into_vec(),
    })
}

/// Decomposes `data_file` into the project: side-car files, the merged
/// manifest and a `location` link to the file's directory.
pub fn unravel(project: &Path, data_file: &Path, config: &Config) -> Result<RecordSet> {
    let content = std::fs::read_to_string(data_file).map_err(|e| Error::io(data_file, e))?;
    let records = parse_document(content.trim())?;

    let manifest_path = project.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        info!("no {} yet, initializing the project", MANIFEST_FILE);
        init(project, config)?;
    }

    let skeleton = manifest::build_manifest(&records);
    for side_car in &skeleton.side_cars {
        let path = project.join(&side_car.file_name);
        std::fs::write(&path, format!("{}\n", side_car.content)).map_err(|e| Error::io(&path, e))?;
        debug!("wrote {}", path.display());
    }

    let existing = manifest::read_manifest(&manifest_path)?;
    let merged = manifest::merge(existing, skeleton.manifest);
    manifest::write_manifest(&manifest_path, &merged)?;

    let data_file = data_file
        .canonicalize()
        .map_err(|e| Error::io(data_file, e))?;
    if let Some(destination) = data_file.parent() {
        relink(&project.join(LOCATION_LINK), destination)?;
        info!("{} now points at {}", LOCATION_LINK, destination.display());
    }

    if config.unravel_commit {
        commit_all(project, "Unravel")?;
    }

    info!(
        "unravelled scenario \"{}\" from {}",
        records.scenario.xml_id,
        data_file.display()
    );
    Ok(records)
}
