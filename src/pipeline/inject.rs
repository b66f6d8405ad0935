//! Pushes record content into an existing database.
//!
//! Records are never created here, only updated by name or identifier.
//! Statements go to a [`StatementSink`]; the shipped sink renders them as a
//! `psql` script, followed by a single `COMMIT`.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::Value;

use crate::cli::config::{Config, DbConfig};
use crate::error::{Error, Result};
use crate::manifest::{self, MANIFEST_FILE, RecordSet};
use crate::pipeline::build::load_records;
use crate::record::{Label, Onchange, Param, Style, View};

/// Receives the statements of one injection batch.
pub trait StatementSink {
    fn execute(&mut self, statement: &str) -> Result<()>;

    /// Ends the batch.
    fn commit(&mut self) -> Result<()>;
}

/// Writes statements as a SQL script.
pub struct ScriptSink<W: Write> {
    out: W,
    target: PathBuf,
}

impl<W: Write> ScriptSink<W> {
    /// Starts a script with a `\connect` line for `database`. Connection
    /// settings missing from `db` are left to psql's defaults.
    pub fn connect(
        mut out: W,
        target: impl Into<PathBuf>,
        database: &str,
        db: &DbConfig,
    ) -> Result<Self> {
        let target = target.into();
        let or_default = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "\\connect {} {} {} {}",
            database,
            or_default(db.user.clone()),
            or_default(db.host.clone()),
            or_default(db.port.map(|p| p.to_string())),
        )
        .map_err(|e| Error::io(&target, e))?;
        Ok(Self { out, target })
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatementSink for ScriptSink<W> {
    fn execute(&mut self, statement: &str) -> Result<()> {
        writeln!(self.out, "{}", statement).map_err(|e| Error::io(&self.target, e))
    }

    fn commit(&mut self) -> Result<()> {
        writeln!(self.out, "COMMIT;")
            .and_then(|_| self.out.flush())
            .map_err(|e| Error::io(&self.target, e))
    }
}

/// SQL string literal.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn sql_bool(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn onchange_statement(oc: &Onchange) -> String {
    format!(
        "UPDATE manual_onchange SET {}code = {}, is_translatable_code = {} WHERE name = {};",
        if oc.raw { "raw_" } else { "" },
        quote(&oc.code),
        sql_bool(oc.translatable.unwrap_or(false)),
        quote(&oc.name),
    )
}

fn view_statement(view: &View) -> String {
    format!(
        "UPDATE ir_ui_view_ionic SET {}architecture = {} WHERE identifier = {};",
        if view.raw { "raw_" } else { "" },
        quote(&view.arch),
        quote(&view.identifier),
    )
}

fn style_statement(style: &Style) -> String {
    format!(
        "UPDATE ir_ui_css_ionic SET style = {} WHERE name = {};",
        quote(&style.style),
        quote(&style.name),
    )
}

fn label_statement(label: &Label) -> String {
    format!(
        "UPDATE ir_ui_menu_ionic_label SET value = {} WHERE name = {};",
        quote(&label.value),
        quote(&label.name),
    )
}

// Params are matched on name only, so every param sharing it is updated.
fn param_statement(param: &Param) -> String {
    format!(
        "UPDATE ir_ui_menu_ionic_param SET value = {} WHERE name = {};",
        quote(&param.value),
        quote(&param.name),
    )
}

/// One `UPDATE` per child record, in onchange, view, style, label, param
/// order. The scenario itself is not injected.
pub fn statements(records: &RecordSet) -> Vec<String> {
    records
        .onchanges
        .iter()
        .map(onchange_statement)
        .chain(records.views.iter().map(view_statement))
        .chain(records.styles.iter().map(style_statement))
        .chain(records.labels.iter().map(label_statement))
        .chain(records.params.iter().map(param_statement))
        .collect()
}

/// Sends every statement of `records` to `sink`, then commits once.
/// Returns the number of statements sent.
pub fn inject<S: StatementSink>(records: &RecordSet, sink: &mut S) -> Result<usize> {
    let statements = statements(records);
    for statement in &statements {
        debug!("{}", statement);
        sink.execute(statement)?;
    }
    sink.commit()?;
    Ok(statements.len())
}

/// Renders the injection script of a project to `out`. The manifest must
/// name the database under `db`.
pub fn inject_project<W: Write>(
    project: &Path,
    config: &Config,
    out: W,
    target: impl Into<PathBuf>,
) -> Result<usize> {
    let manifest_path = project.join(MANIFEST_FILE);
    let manifest = manifest::read_manifest(&manifest_path)?;
    let database = match manifest.get("db") {
        Some(Value::String(db)) if !db.is_empty() => db.clone(),
        _ => {
            return Err(Error::ManifestField {
                field: "db".into(),
            });
        }
    };

    let records = load_records(project, &manifest)?;
    let mut sink = ScriptSink::connect(out, target, &database, &config.db)?;
    let count = inject(&records, &mut sink)?;
    info!("rendered {} statements for database \"{}\"", count, database);
    Ok(count)
}
