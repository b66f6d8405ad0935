use std::sync::LazyLock;

use regex::Regex;
use roxmltree::Node;
use serde_yaml::{Mapping, Value};

use crate::codec::escape;
use crate::error::{Error, Result};
use crate::record::fields::{self, Fields};
use crate::record::xml::{RecordNode, XmlLines, py_bool};
use crate::record::{ChildRecord, ManifestEntry, RecordKind, restore_id, strip_prefix};

pub const DEFAULT_MODEL: &str = "ir.ui.view.ionic";
pub const DEFAULT_NAME: &str = "Accueil";

static DATA_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<data\b[^>]*?(?:/>|>.*</data>)").expect("valid regex")
});

/// A screen architecture, stored as the raw `<data>` markup.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub xml_id: String,
    /// Secondary key; defaults to the xml id.
    pub identifier: String,
    pub name: String,
    /// Architecture lives in `raw_architecture` rather than `architecture`.
    pub raw: bool,
    pub arch: String,
    pub deprecated: bool,
    pub secure: bool,
    pub translatable: Option<bool>,
    pub model_id: String,
    pub inherit: Option<String>,
}

impl View {
    fn defaults() -> Mapping {
        fields::table([
            ("identifier", Value::Null),
            ("name", DEFAULT_NAME.into()),
            ("raw", true.into()),
            ("deprecated", false.into()),
            ("secure", true.into()),
            ("translatable", Value::Null),
            ("model_id", DEFAULT_MODEL.into()),
            ("inherit", Value::Null),
        ])
    }
}

/// The `<data>` block of an architecture field, copied byte for byte from
/// the document so that the markup keeps its formatting.
fn raw_data_block(field: Node<'_, '_>, source: &str) -> Option<String> {
    let span = source.get(field.range())?;
    DATA_BLOCK_RE.find(span).map(|m| m.as_str().to_string())
}

impl ChildRecord for View {
    const KIND: RecordKind = RecordKind::View;
    const CODE_EXT: Option<&'static str> = Some("xml");

    fn xml_id(&self) -> &str {
        &self.xml_id
    }

    fn from_xml(node: Node<'_, '_>, source: &str) -> Result<Self> {
        let rec = RecordNode::new(node, Self::KIND);

        let identifier = rec.required_text("identifier")?;
        let (raw, arch_name, arch_field) =
            match (rec.field("raw_architecture"), rec.field("architecture")) {
                (Some(field), _) => (true, "raw_architecture", field),
                (None, Some(field)) => (false, "architecture", field),
                (None, None) => return Err(rec.missing("architecture\" or \"raw_architecture")),
            };
        let arch = raw_data_block(arch_field, source).ok_or_else(|| rec.missing(arch_name))?;

        Ok(View {
            xml_id: rec.id().to_string(),
            identifier,
            name: rec.text("name").unwrap_or_else(|| DEFAULT_NAME.to_string()),
            raw,
            arch,
            deprecated: rec.flag("is_deprecated")?.unwrap_or(false),
            secure: rec.flag("is_security_check")?.unwrap_or(true),
            translatable: rec.tri_state("is_translatable_architecture")?.unwrap_or(None),
            model_id: rec.model("model_id")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            inherit: rec.reference("inherited_view_id")?,
        })
    }

    fn from_manifest(entry: &Mapping, prefix: &str, code: Option<String>) -> Result<Self> {
        let defaults = Self::defaults();
        let f = Fields::new(entry, &defaults);
        let xml_id = restore_id(&f.id()?, prefix, f.quirky());

        Ok(View {
            identifier: f.opt_string("identifier")?.unwrap_or_else(|| xml_id.clone()),
            name: f.string("name")?,
            raw: f.bool("raw")?,
            arch: code
                .map(|c| c.trim().to_string())
                .ok_or_else(|| Error::ManifestField { field: "arch".into() })?,
            deprecated: f.bool("deprecated")?,
            secure: f.bool("secure")?,
            translatable: f.opt_bool("translatable")?,
            model_id: f.string("model_id")?,
            inherit: f.opt_string("inherit")?.filter(|i| !i.is_empty()),
            xml_id,
        })
    }

    fn to_xml(&self, _scenario_id: &str) -> String {
        let arch_field = if self.raw { "raw_architecture" } else { "architecture" };
        XmlLines::default()
            .line(format!(r#"    <record id="{}" model="{}">"#, self.xml_id, Self::KIND.model()))
            .line(format!(r#"        <field name="identifier">{}</field>"#, escape(&self.identifier)))
            .line(format!(r#"        <field name="name">{}</field>"#, escape(&self.name)))
            .line_if(self.inherit.is_some(), || {
                format!(
                    r#"        <field name="inherited_view_id" ref="{}"/>"#,
                    self.inherit.as_deref().unwrap_or_default()
                )
            })
            .line(format!(
                r#"        <field name="model_id" search="[('model', '=', '{}')]"/>"#,
                self.model_id
            ))
            .line_if(self.translatable.is_some(), || {
                format!(
                    r#"        <field name="is_translatable_architecture" eval="{}"/>"#,
                    py_bool(self.translatable.unwrap_or_default())
                )
            })
            .line_if(!self.secure, || {
                r#"        <field name="is_security_check" eval="False"/>"#.to_string()
            })
            .line_if(self.deprecated, || {
                r#"        <field name="is_deprecated" eval="True"/>"#.to_string()
            })
            .line(format!(r#"        <field name="{}" type="xml">"#, arch_field))
            .line(self.arch.trim())
            .line("        </field>")
            .line("    </record>")
            .finish()
    }

    fn to_manifest(&self, prefix: Option<&str>) -> ManifestEntry {
        let stripped = strip_prefix(&self.xml_id, prefix);
        let identifier = (self.identifier != self.xml_id).then_some(self.identifier.as_str());

        fields::child_entry(
            &stripped,
            vec![
                ("identifier", fields::opt_string(identifier)),
                ("name", self.name.as_str().into()),
                ("raw", self.raw.into()),
                ("deprecated", self.deprecated.into()),
                ("secure", self.secure.into()),
                ("translatable", fields::opt_bool(self.translatable)),
                ("model_id", self.model_id.as_str().into()),
                ("inherit", fields::opt_string(self.inherit.as_deref())),
            ],
            &Self::defaults(),
            Self::CODE_EXT.map(|ext| (ext, self.arch.as_str())),
        )
    }
}
