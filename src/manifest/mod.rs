//! The manifest ("skeleton"): one YAML document holding the scenario block
//! and the five child lists.

use std::path::Path;

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};
use crate::record::fields::Fields;
use crate::record::scenario::{OwnedIds, SCENARIO_KEYS};
use crate::record::{
    ChildRecord, Label, Onchange, Param, RecordKind, Scenario, SideCar, Style, View,
};

pub const MANIFEST_FILE: &str = "skeleton.yaml";

/// Keys placed first, in this order, when the manifest is written.
const FIRST_KEYS: [&str; 11] = [
    "db",
    "file_name",
    "prefix",
    "name",
    "deprecated",
    "icon",
    "sequence",
    "main_view",
    "quirky_main_view",
    "init_oc",
    "quirky_init_oc",
];

/// Keys placed last.
const LAST_KEYS: [&str; 1] = ["help"];

const CHILD_KINDS: [RecordKind; 5] = [
    RecordKind::Style,
    RecordKind::Onchange,
    RecordKind::View,
    RecordKind::Label,
    RecordKind::Param,
];

/// Everything one data file defines.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub scenario: Scenario,
    pub onchanges: Vec<Onchange>,
    pub views: Vec<View>,
    pub styles: Vec<Style>,
    pub labels: Vec<Label>,
    pub params: Vec<Param>,
}

/// A freshly built manifest and the side-car files it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub manifest: Mapping,
    pub side_cars: Vec<SideCar>,
}

fn xml_ids<R: ChildRecord>(records: &[R]) -> Vec<String> {
    records.iter().map(|r| r.xml_id().to_string()).collect()
}

fn push_children<R: ChildRecord>(
    manifest: &mut Mapping,
    side_cars: &mut Vec<SideCar>,
    records: &[R],
    prefix: &str,
) {
    let entries = records
        .iter()
        .map(|record| {
            let entry = record.to_manifest(Some(prefix));
            if entry.is_quirky() {
                warn!(
                    "{} \"{}\" does not carry the \"{}_\" prefix, keeping its full id",
                    R::KIND.label(),
                    record.xml_id(),
                    prefix
                );
            }
            side_cars.extend(entry.side_car);
            Value::Mapping(entry.fields)
        })
        .collect();
    manifest.insert(R::KIND.manifest_key().into(), Value::Sequence(entries));
}

/// Builds the manifest of a record set. The result still has to be merged
/// onto any existing manifest with [`merge`].
pub fn build_manifest(records: &RecordSet) -> Skeleton {
    let owned = OwnedIds {
        onchanges: xml_ids(&records.onchanges),
        views: xml_ids(&records.views),
        styles: xml_ids(&records.styles),
    };
    let mut manifest = records.scenario.to_manifest(&owned);
    let prefix = records.scenario.xml_id.as_str();
    let mut side_cars = Vec::new();

    push_children(&mut manifest, &mut side_cars, &records.styles, prefix);
    push_children(&mut manifest, &mut side_cars, &records.onchanges, prefix);
    push_children(&mut manifest, &mut side_cars, &records.views, prefix);
    push_children(&mut manifest, &mut side_cars, &records.labels, prefix);
    push_children(&mut manifest, &mut side_cars, &records.params, prefix);

    Skeleton {
        manifest,
        side_cars,
    }
}

/// Whether a top-level key is produced by the record model, as opposed to
/// one supplied by the operator (e.g. `db`).
pub fn is_model_key(key: &Value) -> bool {
    key.as_str().is_some_and(|key| {
        SCENARIO_KEYS.contains(&key) || CHILD_KINDS.iter().any(|kind| kind.manifest_key() == key)
    })
}

/// Lays `structure` over an existing manifest. Operator keys survive;
/// model keys the new structure no longer produces are dropped.
pub fn merge(existing: Mapping, structure: Mapping) -> Mapping {
    let mut merged: Mapping = existing
        .into_iter()
        .filter(|(key, _)| !is_model_key(key) || structure.contains_key(key))
        .collect();
    for (key, value) in structure {
        merged.insert(key, value);
    }
    reorder(merged)
}

/// Identity keys first, `help` last, everything else in encountered order.
pub fn reorder(mut manifest: Mapping) -> Mapping {
    let mut ordered = Mapping::new();
    for key in FIRST_KEYS {
        if let Some(value) = manifest.shift_remove(key) {
            ordered.insert(key.into(), value);
        }
    }
    let last: Vec<(Value, Value)> = LAST_KEYS
        .iter()
        .filter_map(|key| manifest.shift_remove(*key).map(|value| (Value::from(*key), value)))
        .collect();
    ordered.extend(manifest);
    ordered.extend(last);
    ordered
}

fn child_entries<'a>(manifest: &'a Mapping, kind: RecordKind) -> Result<Vec<&'a Mapping>> {
    match manifest.get(kind.manifest_key()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(entries)) => entries
            .iter()
            .map(|entry| {
                entry.as_mapping().ok_or_else(|| Error::ManifestShape {
                    reason: format!("entries of \"{}\" should be mappings", kind.manifest_key()),
                })
            })
            .collect(),
        Some(_) => Err(Error::ManifestShape {
            reason: format!("\"{}\" should be a list", kind.manifest_key()),
        }),
    }
}

fn recompose<R, F>(manifest: &Mapping, prefix: &str, load: &mut F) -> Result<Vec<R>>
where
    R: ChildRecord,
    F: FnMut(&str) -> Result<String>,
{
    let empty = Mapping::new();
    child_entries(manifest, R::KIND)?
        .into_iter()
        .map(|entry| {
            let code = match R::CODE_EXT {
                Some(ext) => {
                    let id = Fields::new(entry, &empty).id()?;
                    Some(load(&format!("{}.{}", id, ext))?)
                }
                None => None,
            };
            let record = R::from_manifest(entry, prefix, code)?;
            debug!("rebuilt {} \"{}\"", R::KIND.label(), record.xml_id());
            Ok(record)
        })
        .collect()
}

/// Rebuilds every record of a manifest. `load` returns the content of a
/// side-car file given its name.
pub fn rebuild_records<F>(manifest: &Mapping, mut load: F) -> Result<RecordSet>
where
    F: FnMut(&str) -> Result<String>,
{
    // Every child needs the scenario's id as prefix.
    let scenario = Scenario::from_manifest(manifest)?;
    let prefix = scenario.xml_id.clone();

    Ok(RecordSet {
        onchanges: recompose(manifest, &prefix, &mut load)?,
        views: recompose(manifest, &prefix, &mut load)?,
        styles: recompose(manifest, &prefix, &mut load)?,
        labels: recompose(manifest, &prefix, &mut load)?,
        params: recompose(manifest, &prefix, &mut load)?,
        scenario,
    })
}

/// Reads a manifest file. An empty document reads as an empty mapping.
pub fn read_manifest(path: &Path) -> Result<Mapping> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if content.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&content)? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(Error::ManifestShape {
            reason: "top level should be a mapping".into(),
        }),
    }
}

pub fn write_manifest(path: &Path, manifest: &Mapping) -> Result<()> {
    let yaml = serde_yaml::to_string(manifest)?;
    std::fs::write(path, yaml).map_err(|e| Error::io(path, e))
}
