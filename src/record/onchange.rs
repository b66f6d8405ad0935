use roxmltree::Node;
use serde_yaml::{Mapping, Value};

use crate::codec::escape;
use crate::error::{Error, Result};
use crate::record::fields::{self, Fields};
use crate::record::xml::{RecordNode, XmlLines, py_bool};
use crate::record::{ChildRecord, ManifestEntry, RecordKind, restore_id, strip_prefix};

pub const DEFAULT_MODEL: &str = "manual.onchange";

/// A server-side code snippet run when a scenario field changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Onchange {
    pub xml_id: String,
    /// Defaults to the xml id.
    pub name: String,
    /// Code lives in `raw_code` rather than `code`.
    pub raw: bool,
    pub code: String,
    pub deprecated: bool,
    pub secure: bool,
    /// `None` leaves the flag out of the XML entirely.
    pub translatable: Option<bool>,
    pub model_id: String,
}

impl Onchange {
    fn defaults() -> Mapping {
        fields::table([
            ("name", Value::Null),
            ("raw", true.into()),
            ("deprecated", false.into()),
            ("secure", true.into()),
            ("translatable", Value::Null),
            ("model_id", DEFAULT_MODEL.into()),
        ])
    }
}

impl ChildRecord for Onchange {
    const KIND: RecordKind = RecordKind::Onchange;
    const CODE_EXT: Option<&'static str> = Some("py");

    fn xml_id(&self) -> &str {
        &self.xml_id
    }

    fn from_xml(node: Node<'_, '_>, _source: &str) -> Result<Self> {
        let rec = RecordNode::new(node, Self::KIND);

        let (raw, code_field) = match (rec.field("raw_code"), rec.field("code")) {
            (Some(field), _) => (true, field),
            (None, Some(field)) => (false, field),
            (None, None) => return Err(rec.missing("code\" or \"raw_code")),
        };

        Ok(Onchange {
            xml_id: rec.id().to_string(),
            name: rec.text("name").unwrap_or_else(|| rec.id().to_string()),
            raw,
            code: code_field.text().unwrap_or_default().trim().to_string(),
            deprecated: rec.flag("is_deprecated")?.unwrap_or(false),
            secure: rec.flag("is_security_check")?.unwrap_or(true),
            translatable: rec.tri_state("is_translatable_code")?.unwrap_or(None),
            model_id: rec.model("model_id")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn from_manifest(entry: &Mapping, prefix: &str, code: Option<String>) -> Result<Self> {
        let defaults = Self::defaults();
        let f = Fields::new(entry, &defaults);
        let xml_id = restore_id(&f.id()?, prefix, f.quirky());

        Ok(Onchange {
            name: f.opt_string("name")?.unwrap_or_else(|| xml_id.clone()),
            raw: f.bool("raw")?,
            code: code
                .map(|c| c.trim().to_string())
                .ok_or_else(|| Error::ManifestField { field: "code".into() })?,
            deprecated: f.bool("deprecated")?,
            secure: f.bool("secure")?,
            translatable: f.opt_bool("translatable")?,
            model_id: f.string("model_id")?,
            xml_id,
        })
    }

    fn to_xml(&self, _scenario_id: &str) -> String {
        let code_field = if self.raw { "raw_code" } else { "code" };
        XmlLines::default()
            .line(format!(r#"    <record id="{}" model="{}">"#, self.xml_id, Self::KIND.model()))
            .line(format!(r#"        <field name="name">{}</field>"#, escape(&self.name)))
            .line(format!(
                r#"        <field name="model_id" search="[('model', '=', '{}')]"/>"#,
                self.model_id
            ))
            .line_if(self.deprecated, || {
                r#"        <field name="is_deprecated" eval="True"/>"#.to_string()
            })
            .line_if(self.translatable.is_some(), || {
                format!(
                    r#"        <field name="is_translatable_code" eval="{}"/>"#,
                    py_bool(self.translatable.unwrap_or_default())
                )
            })
            .line_if(!self.secure, || {
                r#"        <field name="is_security_check" eval="False"/>"#.to_string()
            })
            .line(format!(r#"        <field name="{}"><![CDATA["#, code_field))
            .line(self.code.trim())
            .line("        ]]></field>")
            .line("    </record>")
            .finish()
    }

    fn to_manifest(&self, prefix: Option<&str>) -> ManifestEntry {
        let stripped = strip_prefix(&self.xml_id, prefix);
        let name = (self.name != self.xml_id).then_some(self.name.as_str());

        fields::child_entry(
            &stripped,
            vec![
                ("name", fields::opt_string(name)),
                ("raw", self.raw.into()),
                ("deprecated", self.deprecated.into()),
                ("secure", self.secure.into()),
                ("translatable", fields::opt_bool(self.translatable)),
                ("model_id", self.model_id.as_str().into()),
            ],
            &Self::defaults(),
            Self::CODE_EXT.map(|ext| (ext, self.code.as_str())),
        )
    }
}
