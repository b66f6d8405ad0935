//! The six record kinds found in a data file and their round trip between
//! XML, memory and manifest entries.
//!
//! Child records (everything but the scenario) implement [`ChildRecord`].
//! Serialization is pure: code-bearing kinds hand their code back as a
//! [`SideCar`] and the pipeline decides where it gets written.

pub mod fields;
pub mod label;
pub mod onchange;
pub mod param;
pub mod scenario;
pub mod style;
pub mod view;
pub mod xml;

use roxmltree::Node;
use serde_yaml::Mapping;

use crate::error::Result;

pub use label::Label;
pub use onchange::Onchange;
pub use param::Param;
pub use scenario::Scenario;
pub use style::Style;
pub use view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Onchange,
    View,
    Style,
    Label,
    Param,
    Scenario,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Onchange,
        RecordKind::View,
        RecordKind::Style,
        RecordKind::Label,
        RecordKind::Param,
        RecordKind::Scenario,
    ];

    /// Value of the `model` attribute that tags this kind in a data file.
    pub fn model(self) -> &'static str {
        match self {
            RecordKind::Onchange => "manual.onchange",
            RecordKind::View => "ir.ui.view.ionic",
            RecordKind::Style => "ir.ui.css.ionic",
            RecordKind::Label => "ir.ui.menu.ionic.label",
            RecordKind::Param => "ir.ui.menu.ionic.param",
            RecordKind::Scenario => "ir.ui.menu.ionic",
        }
    }

    pub fn from_model(model: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.model() == model)
    }

    /// Human name, used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::Onchange => "onchange",
            RecordKind::View => "view",
            RecordKind::Style => "stylesheet",
            RecordKind::Label => "label",
            RecordKind::Param => "param",
            RecordKind::Scenario => "scenario",
        }
    }

    /// Manifest key of the list holding this kind's entries.
    pub fn manifest_key(self) -> &'static str {
        match self {
            RecordKind::Onchange => "onchanges",
            RecordKind::View => "views",
            RecordKind::Style => "styles",
            RecordKind::Label => "labels",
            RecordKind::Param => "params",
            RecordKind::Scenario => "prefix",
        }
    }
}

/// Code content externalized from a record, named after its short id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideCar {
    pub file_name: String,
    pub content: String,
}

/// A record's manifest representation plus the code it no longer holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub fields: Mapping,
    pub side_car: Option<SideCar>,
}

impl ManifestEntry {
    pub fn is_quirky(&self) -> bool {
        fields::is_quirky(&self.fields)
    }
}

/// Contract shared by the records a scenario owns.
pub trait ChildRecord: Sized {
    const KIND: RecordKind;

    /// Extension of the side-car file, for kinds that carry code.
    const CODE_EXT: Option<&'static str> = None;

    fn xml_id(&self) -> &str;

    /// `source` is the whole document text the node was parsed from.
    fn from_xml(node: Node<'_, '_>, source: &str) -> Result<Self>;

    /// `code` is the side-car content for kinds that have one.
    fn from_manifest(entry: &Mapping, prefix: &str, code: Option<String>) -> Result<Self>;

    /// `scenario_id` is the xml id of the owning scenario.
    fn to_xml(&self, scenario_id: &str) -> String;

    /// With `prefix` set, ids carrying it are shortened; the others are
    /// flagged quirky and kept whole.
    fn to_manifest(&self, prefix: Option<&str>) -> ManifestEntry;
}

/// Result of removing the scenario prefix from an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stripped {
    pub id: String,
    pub quirky: bool,
}

pub(crate) fn strip_prefix(xml_id: &str, prefix: Option<&str>) -> Stripped {
    let Some(prefix) = prefix else {
        return Stripped {
            id: xml_id.to_string(),
            quirky: false,
        };
    };
    match xml_id.strip_prefix(&format!("{}_", prefix)) {
        Some(short) => Stripped {
            id: short.to_string(),
            quirky: false,
        },
        None => Stripped {
            id: xml_id.to_string(),
            quirky: true,
        },
    }
}

pub(crate) fn restore_id(id: &str, prefix: &str, quirky: bool) -> String {
    if quirky || prefix.is_empty() {
        id.to_string()
    } else {
        format!("{}_{}", prefix, id)
    }
}
