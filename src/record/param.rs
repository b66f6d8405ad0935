use roxmltree::Node;
use serde_yaml::{Mapping, Value};

use crate::codec::escape;
use crate::error::Result;
use crate::record::fields::{self, Fields};
use crate::record::xml::{RecordNode, XmlLines};
use crate::record::{ChildRecord, ManifestEntry, RecordKind, Stripped, restore_id, strip_prefix};

/// A named value attached to the scenario menu.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub xml_id: String,
    /// Defaults to the short id.
    pub name: String,
    pub value: String,
    pub note: String,
}

/// Name/value pair shared by params and labels.
pub(crate) struct Setting {
    pub xml_id: String,
    pub name: String,
    pub value: String,
}

pub(crate) fn setting_defaults() -> Vec<(&'static str, Value)> {
    vec![("name", Value::Null)]
}

pub(crate) fn read_setting(rec: &RecordNode<'_, '_>) -> Result<Setting> {
    Ok(Setting {
        xml_id: rec.id().to_string(),
        name: rec.required_text("name")?.trim().to_string(),
        value: rec.required_text("value")?.trim().to_string(),
    })
}

pub(crate) fn setting_from_manifest(f: &Fields<'_>, prefix: &str) -> Result<Setting> {
    let id = f.id()?;
    Ok(Setting {
        xml_id: restore_id(&id, prefix, f.quirky()),
        name: f.opt_string("name")?.unwrap_or(id),
        value: f.opt_string("value")?.unwrap_or_default(),
    })
}

/// Snapshot of the shared fields. The name is left out when it matches the
/// short id it defaults to.
pub(crate) fn setting_snapshot(
    stripped: &Stripped,
    name: &str,
    value: &str,
) -> Vec<(&'static str, Value)> {
    let name = (name != stripped.id).then_some(name);
    vec![
        ("name", fields::opt_string(name)),
        ("value", value.into()),
    ]
}

pub(crate) fn render_setting(
    kind: RecordKind,
    setting: (&str, &str, &str),
    note: Option<&str>,
    scenario_id: &str,
) -> String {
    let (xml_id, name, value) = setting;
    XmlLines::default()
        .line(format!(r#"    <record id="{}" model="{}">"#, xml_id, kind.model()))
        .line(format!(r#"        <field name="name">{}</field>"#, escape(name)))
        .line(format!(
            r#"        <field name="ionic_menu_id" eval="ref('{}')"/>"#,
            scenario_id
        ))
        .line(format!(r#"        <field name="value">{}</field>"#, escape(value)))
        .line_if(note.is_some_and(|n| !n.is_empty()), || {
            format!(
                r#"        <field name="note">{}</field>"#,
                escape(note.unwrap_or_default())
            )
        })
        .line("    </record>")
        .finish()
}

impl Param {
    fn defaults() -> Mapping {
        let mut defaults = setting_defaults();
        defaults.push(("note", "".into()));
        fields::table(defaults)
    }
}

impl ChildRecord for Param {
    const KIND: RecordKind = RecordKind::Param;

    fn xml_id(&self) -> &str {
        &self.xml_id
    }

    fn from_xml(node: Node<'_, '_>, _source: &str) -> Result<Self> {
        let rec = RecordNode::new(node, Self::KIND);
        let setting = read_setting(&rec)?;

        Ok(Param {
            xml_id: setting.xml_id,
            name: setting.name,
            value: setting.value,
            note: rec.text("note").unwrap_or_default(),
        })
    }

    fn from_manifest(entry: &Mapping, prefix: &str, _code: Option<String>) -> Result<Self> {
        let defaults = Self::defaults();
        let f = Fields::new(entry, &defaults);
        let setting = setting_from_manifest(&f, prefix)?;

        Ok(Param {
            xml_id: setting.xml_id,
            name: setting.name,
            value: setting.value,
            note: f.opt_string("note")?.unwrap_or_default(),
        })
    }

    fn to_xml(&self, scenario_id: &str) -> String {
        render_setting(
            Self::KIND,
            (&self.xml_id, &self.name, &self.value),
            Some(&self.note),
            scenario_id,
        )
    }

    fn to_manifest(&self, prefix: Option<&str>) -> ManifestEntry {
        let stripped = strip_prefix(&self.xml_id, prefix);
        let mut snapshot = setting_snapshot(&stripped, &self.name, &self.value);
        snapshot.push(("note", self.note.as_str().into()));

        fields::child_entry(&stripped, snapshot, &Self::defaults(), None)
    }
}
