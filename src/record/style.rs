use roxmltree::Node;
use serde_yaml::{Mapping, Value};

use crate::codec::{escape, replace_command, sanitize};
use crate::error::{Error, Result};
use crate::record::fields::{self, Fields};
use crate::record::xml::{RecordNode, XmlLines};
use crate::record::{ChildRecord, ManifestEntry, RecordKind, restore_id, strip_prefix};

/// A CSS sheet attached to scenario pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub xml_id: String,
    /// Defaults to the xml id.
    pub name: String,
    pub pages: Vec<String>,
    pub style: String,
}

impl Style {
    fn defaults() -> Mapping {
        fields::table([
            ("name", Value::Null),
            ("pages", Value::Sequence(Vec::new())),
        ])
    }
}

/// Stylesheet bodies outside a CDATA section are sometimes stored with
/// their entities escaped, or with an escaped CDATA wrapper that survives
/// parsing as plain text. Text read from a real CDATA section is literal.
fn unwrap_style(text: &str, in_cdata: bool) -> String {
    let body = text.trim();
    if in_cdata {
        return body.to_string();
    }
    match body.strip_prefix("<![CDATA[") {
        Some(inner) => inner.strip_suffix("]]>").unwrap_or(inner).trim().to_string(),
        None => sanitize(body, true, false),
    }
}

impl ChildRecord for Style {
    const KIND: RecordKind = RecordKind::Style;
    const CODE_EXT: Option<&'static str> = Some("css");

    fn xml_id(&self) -> &str {
        &self.xml_id
    }

    fn from_xml(node: Node<'_, '_>, source: &str) -> Result<Self> {
        let rec = RecordNode::new(node, Self::KIND);
        let field = rec.require("style")?;
        let in_cdata = source
            .get(field.range())
            .is_some_and(|markup| markup.contains("<![CDATA["));

        Ok(Style {
            xml_id: rec.id().to_string(),
            name: rec.required_text("name")?,
            pages: rec.references("page_ids"),
            style: unwrap_style(field.text().unwrap_or_default(), in_cdata),
        })
    }

    fn from_manifest(entry: &Mapping, prefix: &str, code: Option<String>) -> Result<Self> {
        let defaults = Self::defaults();
        let f = Fields::new(entry, &defaults);
        let xml_id = restore_id(&f.id()?, prefix, f.quirky());

        Ok(Style {
            name: f.opt_string("name")?.unwrap_or_else(|| xml_id.clone()),
            pages: f.string_list("pages")?,
            style: code
                .map(|c| c.trim().to_string())
                .ok_or_else(|| Error::ManifestField { field: "style".into() })?,
            xml_id,
        })
    }

    fn to_xml(&self, _scenario_id: &str) -> String {
        XmlLines::default()
            .line(format!(r#"    <record id="{}" model="{}">"#, self.xml_id, Self::KIND.model()))
            .line(format!(r#"        <field name="name">{}</field>"#, escape(&self.name)))
            .line_if(!self.pages.is_empty(), || {
                format!(
                    r#"        <field name="page_ids" eval="{}"/>"#,
                    replace_command(&self.pages)
                )
            })
            .line(r#"        <field name="style"><![CDATA["#)
            .line(self.style.trim())
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
                ("pages", fields::string_list(&self.pages)),
            ],
            &Self::defaults(),
            Self::CODE_EXT.map(|ext| (ext, self.style.as_str())),
        )
    }
}
