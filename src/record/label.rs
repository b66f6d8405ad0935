use roxmltree::Node;
use serde_yaml::Mapping;

use crate::error::Result;
use crate::record::fields::{self, Fields};
use crate::record::param::{
    read_setting, render_setting, setting_defaults, setting_from_manifest, setting_snapshot,
};
use crate::record::xml::RecordNode;
use crate::record::{ChildRecord, ManifestEntry, RecordKind, strip_prefix};

/// A translatable text shown by the scenario. Same shape as a param,
/// minus the note.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub xml_id: String,
    pub name: String,
    pub value: String,
}

impl Label {
    fn defaults() -> Mapping {
        fields::table(setting_defaults())
    }
}

impl ChildRecord for Label {
    const KIND: RecordKind = RecordKind::Label;

    fn xml_id(&self) -> &str {
        &self.xml_id
    }

    fn from_xml(node: Node<'_, '_>, _source: &str) -> Result<Self> {
        let setting = read_setting(&RecordNode::new(node, Self::KIND))?;
        Ok(Label {
            xml_id: setting.xml_id,
            name: setting.name,
            value: setting.value,
        })
    }

    fn from_manifest(entry: &Mapping, prefix: &str, _code: Option<String>) -> Result<Self> {
        let defaults = Self::defaults();
        let setting = setting_from_manifest(&Fields::new(entry, &defaults), prefix)?;
        Ok(Label {
            xml_id: setting.xml_id,
            name: setting.name,
            value: setting.value,
        })
    }

    fn to_xml(&self, scenario_id: &str) -> String {
        render_setting(
            Self::KIND,
            (&self.xml_id, &self.name, &self.value),
            None,
            scenario_id,
        )
    }

    fn to_manifest(&self, prefix: Option<&str>) -> ManifestEntry {
        let stripped = strip_prefix(&self.xml_id, prefix);
        let snapshot = setting_snapshot(&stripped, &self.name, &self.value);
        fields::child_entry(&stripped, snapshot, &Self::defaults(), None)
    }
}
