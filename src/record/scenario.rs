//! The scenario menu entry that owns every other record of a data file.
//!
//! Structural edits to scenarios defined elsewhere (adding onchanges or
//! views to them, changing their entry points) are not handled.

use std::collections::HashSet;

use roxmltree::Node;
use serde_yaml::{Mapping, Value};

use crate::codec::{escape, replace_command};
use crate::error::{Error, Result};
use crate::record::fields::{self, Fields};
use crate::record::xml::{RecordNode, XmlLines, py_bool};
use crate::record::{RecordKind, Stripped, restore_id, strip_prefix};

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub xml_id: String,
    /// Stem of the destination data file; usually the xml id.
    pub file_name: String,
    pub name: String,
    pub icon: String,
    pub sequence: i64,
    pub main_view: String,
    pub init_onchange: Option<String>,
    pub parent: Option<String>,
    pub no_cache: Option<bool>,
    pub deprecated: Option<bool>,
    pub help: Option<String>,
    pub onchanges: Vec<String>,
    pub views: Vec<String>,
    pub styles: Vec<String>,
}

/// Xml ids of the records defined next to the scenario in its data file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedIds {
    pub onchanges: Vec<String>,
    pub views: Vec<String>,
    pub styles: Vec<String>,
}

/// Manifest keys produced from a scenario. Anything else found in a
/// manifest belongs to the operator.
pub const SCENARIO_KEYS: [&str; 19] = [
    "prefix",
    "file_name",
    "name",
    "deprecated",
    "icon",
    "sequence",
    "main_view",
    "quirky_main_view",
    "init_oc",
    "quirky_init_oc",
    "no_cache",
    "parent",
    "other_onchanges",
    "other_views",
    "other_styles",
    "onchange_order",
    "view_order",
    "style_order",
    "help",
];

fn defaults() -> Mapping {
    fields::table([
        ("file_name", Value::Null),
        ("deprecated", Value::Null),
        ("init_oc", Value::Null),
        ("quirky_init_oc", Value::Null),
        ("quirky_main_view", Value::Null),
        ("main_view", Value::Null),
        ("no_cache", Value::Null),
        ("parent", Value::Null),
        ("help", Value::Null),
        ("other_onchanges", Value::Sequence(Vec::new())),
        ("other_views", Value::Sequence(Vec::new())),
        ("other_styles", Value::Sequence(Vec::new())),
        ("onchange_order", Value::Null),
        ("view_order", Value::Null),
        ("style_order", Value::Null),
    ])
}

/// References the scenario holds but does not define, in their original order.
fn others(refs: &[String], owned: &[String]) -> Vec<String> {
    let owned: HashSet<&str> = owned.iter().map(String::as_str).collect();
    refs.iter()
        .filter(|r| !owned.contains(r.as_str()))
        .cloned()
        .collect()
}

/// Splits a reference list into its `other_*` part and, when the owned ids
/// followed by the others would not give it back (external references
/// placed first, repeated ids), the list itself to store whole.
fn split_refs(refs: &[String], owned: &[String]) -> (Vec<String>, Option<Vec<String>>) {
    let others = others(refs, owned);
    if owned.iter().chain(&others).eq(refs.iter()) {
        (others, None)
    } else {
        (Vec::new(), Some(refs.to_vec()))
    }
}

/// Full ids of the child entries stored under `key`.
fn owned_ids(manifest: &Mapping, key: &str, prefix: &str) -> Result<Vec<String>> {
    let Some(entries) = manifest.get(key) else {
        return Ok(Vec::new());
    };
    let Value::Sequence(entries) = entries else {
        return match entries {
            Value::Null => Ok(Vec::new()),
            _ => Err(Error::ManifestShape {
                reason: format!("\"{}\" should be a list", key),
            }),
        };
    };

    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_mapping().ok_or_else(|| Error::ManifestShape {
                reason: format!("entries of \"{}\" should be mappings", key),
            })?;
            let empty = Mapping::new();
            let f = Fields::new(entry, &empty);
            Ok(restore_id(&f.id()?, prefix, f.quirky()))
        })
        .collect()
}

impl Scenario {
    pub const KIND: RecordKind = RecordKind::Scenario;

    pub fn from_xml(node: Node<'_, '_>) -> Result<Self> {
        let rec = RecordNode::new(node, Self::KIND);

        Ok(Scenario {
            xml_id: rec.id().to_string(),
            file_name: rec.id().to_string(),
            name: rec.required_text("name")?,
            icon: rec.required_text("icon")?,
            sequence: rec.int("sequence")?,
            main_view: rec.required_reference("view_id")?,
            init_onchange: rec.reference("initial_onchange_id")?,
            parent: rec.reference("parent_id")?,
            no_cache: rec.tri_state("is_always_new")?.unwrap_or(None),
            deprecated: rec.tri_state("is_deprecated")?.unwrap_or(None),
            help: rec.text("help"),
            onchanges: rec.references("onchange_ids"),
            views: rec.references("view_ids"),
            styles: rec.references("css_ids"),
        })
    }

    /// Rebuilds the scenario from the top level of a manifest. A `*_order`
    /// list is taken as is; otherwise owned references come from the child
    /// lists, followed by `other_*` ones.
    pub fn from_manifest(manifest: &Mapping) -> Result<Self> {
        let defaults = defaults();
        let f = Fields::new(manifest, &defaults);

        let xml_id = f.string("prefix")?;
        let main_view = match f.opt_string("quirky_main_view")? {
            Some(full) => full,
            None => format!("{}_{}", xml_id, f.string("main_view")?),
        };
        let init_onchange = match f.opt_string("quirky_init_oc")? {
            Some(full) => Some(full),
            None => f.opt_string("init_oc")?.map(|short| format!("{}_{}", xml_id, short)),
        };

        let refs = |kind: RecordKind, other_key: &str, order_key: &str| -> Result<Vec<String>> {
            if let Some(order) = f.opt_string_list(order_key)? {
                return Ok(order);
            }
            let mut refs = owned_ids(manifest, kind.manifest_key(), &xml_id)?;
            refs.extend(f.string_list(other_key)?);
            Ok(refs)
        };

        Ok(Scenario {
            file_name: f.opt_string("file_name")?.unwrap_or_else(|| xml_id.clone()),
            name: f.string("name")?,
            icon: f.string("icon")?,
            sequence: f.int("sequence")?,
            main_view,
            init_onchange,
            parent: f.opt_string("parent")?,
            no_cache: f.opt_bool("no_cache")?,
            deprecated: f.opt_bool("deprecated")?,
            help: f.opt_string("help")?,
            onchanges: refs(RecordKind::Onchange, "other_onchanges", "onchange_order")?,
            views: refs(RecordKind::View, "other_views", "view_order")?,
            styles: refs(RecordKind::Style, "other_styles", "style_order")?,
            xml_id,
        })
    }

    pub fn to_xml(&self) -> String {
        let refs_line = |field: &str, ids: &[String]| {
            format!(r#"        <field name="{}" eval="{}"/>"#, field, replace_command(ids))
        };

        XmlLines::default()
            .line(format!(r#"    <record id="{}" model="{}">"#, self.xml_id, Self::KIND.model()))
            .line(format!(r#"        <field name="name">{}</field>"#, escape(&self.name)))
            .line_if(self.parent.is_some(), || {
                format!(
                    r#"        <field name="parent_id" ref="{}"/>"#,
                    self.parent.as_deref().unwrap_or_default()
                )
            })
            .line_if(self.deprecated.is_some(), || {
                format!(
                    r#"        <field name="is_deprecated" eval="{}"/>"#,
                    py_bool(self.deprecated.unwrap_or_default())
                )
            })
            .line_if(self.no_cache.is_some(), || {
                format!(
                    r#"        <field name="is_always_new" eval="{}"/>"#,
                    py_bool(self.no_cache.unwrap_or_default())
                )
            })
            .line(format!(r#"        <field name="icon" type="char">{}</field>"#, escape(&self.icon)))
            .line(format!(r#"        <field name="sequence" eval="{}"/>"#, self.sequence))
            .line(format!(r#"        <field name="view_id" ref="{}"/>"#, self.main_view))
            .line_if(self.init_onchange.is_some(), || {
                format!(
                    r#"        <field name="initial_onchange_id" ref="{}"/>"#,
                    self.init_onchange.as_deref().unwrap_or_default()
                )
            })
            .line_if(!self.views.is_empty(), || refs_line("view_ids", &self.views))
            .line_if(!self.styles.is_empty(), || refs_line("css_ids", &self.styles))
            .line_if(!self.onchanges.is_empty(), || refs_line("onchange_ids", &self.onchanges))
            .line_if(self.help.is_some(), || {
                format!(
                    r#"        <field name="help">{}</field>"#,
                    escape(self.help.as_deref().unwrap_or_default())
                )
            })
            .line("    </record>")
            .finish()
    }

    /// Top-level manifest block for the scenario. References to `owned`
    /// records are left implicit; the rest go to the `other_*` lists, unless
    /// the order can only be kept by a `*_order` list.
    /// Entry points are shortened like child ids, or stored whole under a
    /// `quirky_*` key when they do not carry the prefix.
    pub fn to_manifest(&self, owned: &OwnedIds) -> Mapping {
        let main_view = strip_prefix(&self.main_view, Some(&self.xml_id));
        let init_onchange = self
            .init_onchange
            .as_deref()
            .map(|oc| strip_prefix(oc, Some(&self.xml_id)));

        let entry_point = |stripped: Option<&Stripped>, quirky: bool| {
            fields::opt_string(
                stripped
                    .filter(|s| s.quirky == quirky)
                    .map(|s| s.id.as_str()),
            )
        };

        let file_name = (self.file_name != self.xml_id).then_some(self.file_name.as_str());
        let (other_onchanges, onchange_order) = split_refs(&self.onchanges, &owned.onchanges);
        let (other_views, view_order) = split_refs(&self.views, &owned.views);
        let (other_styles, style_order) = split_refs(&self.styles, &owned.styles);
        let order =
            |ids: Option<Vec<String>>| ids.map_or(Value::Null, |ids| fields::string_list(&ids));

        let snapshot = fields::table([
            ("file_name", fields::opt_string(file_name)),
            ("name", self.name.as_str().into()),
            ("deprecated", fields::opt_bool(self.deprecated)),
            ("icon", self.icon.as_str().into()),
            ("sequence", self.sequence.into()),
            ("main_view", entry_point(Some(&main_view), false)),
            ("quirky_main_view", entry_point(Some(&main_view), true)),
            ("init_oc", entry_point(init_onchange.as_ref(), false)),
            ("quirky_init_oc", entry_point(init_onchange.as_ref(), true)),
            ("no_cache", fields::opt_bool(self.no_cache)),
            ("parent", fields::opt_string(self.parent.as_deref())),
            ("other_onchanges", fields::string_list(&other_onchanges)),
            ("other_views", fields::string_list(&other_views)),
            ("other_styles", fields::string_list(&other_styles)),
            ("onchange_order", order(onchange_order)),
            ("view_order", order(view_order)),
            ("style_order", order(style_order)),
            ("help", fields::opt_string(self.help.as_deref())),
        ]);

        let mut vals = Mapping::new();
        vals.insert("prefix".into(), self.xml_id.as_str().into());
        vals.extend(fields::prune(snapshot, &defaults()));
        vals
    }
}
